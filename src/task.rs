//! 任务列表：从 YAML 读取，按顺序交给各个操作执行

use crate::error::{Error, IoResultExt, Result};
use crate::ops::{Options, Registry};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// 单个任务
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub recipe: String,
    #[serde(default)]
    pub options: Options,
    #[serde(default)]
    pub names: Vec<String>,
}

/// 任务文件的内容
///
/// 顶层的 `names` 不为空时，会覆盖每个任务自己的 `names`。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskList {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub names: Vec<String>,
    #[serde(rename = "all-tasks", default)]
    pub all_tasks: Vec<Task>,
}

impl TaskList {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).at(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// 只包含一个任务，选项全部使用该操作的默认值
    pub fn from_recipe(registry: &Registry, recipe: &str) -> Result<Self> {
        let op = registry.create(recipe)?;
        Ok(Self {
            names: Vec::new(),
            all_tasks: vec![Task {
                recipe: recipe.to_string(),
                options: op.default_options(),
                names: Vec::new(),
            }],
        })
    }

    /// 命令行给出的 names 优先于任务文件顶层的 names，
    /// 顶层的 names 又优先于每个任务自己的 names。
    pub fn apply_names(&mut self, cli_names: Vec<String>) {
        if !cli_names.is_empty() {
            self.names = cli_names;
        }
        if self.names.is_empty() {
            return;
        }
        for task in &mut self.all_tasks {
            task.names = self.names.clone();
        }
    }

    /// 依次 configure、validate，`execute` 为 true 时再执行。
    /// 任何一个任务出错都会中止后续任务。
    pub fn exec_all(&self, registry: &Registry, execute: bool) -> Result<()> {
        if self.all_tasks.is_empty() {
            return Err(Error::NoTasks);
        }

        for (i, task) in self.all_tasks.iter().enumerate() {
            let wrap = |e: Error| Error::Task {
                index: i + 1,
                recipe: task.recipe.clone(),
                source: Box::new(e),
            };

            let mut op = registry.create(&task.recipe).map_err(wrap)?;
            op.configure(task.names.clone(), task.options.clone());
            op.validate().map_err(wrap)?;
            debug!("任务 #{} ({}) 检查通过", i + 1, task.recipe);

            if execute {
                op.execute().map_err(wrap)?;
            }
        }

        info!("all tasks are finished.");
        Ok(())
    }
}
