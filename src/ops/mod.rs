//! 可注册的文件维护操作（recipe）
//!
//! 每个操作都遵循 configure -> validate -> execute 的顺序。
//! 建议每个操作独立一个文件。

pub mod move_new_files;
pub mod one_way_sync;
pub mod swap;

use crate::error::{Error, Result};
use std::collections::BTreeMap;
use tracing::warn;

pub use move_new_files::MoveNewFiles;
pub use one_way_sync::OneWaySync;
pub use swap::Swap;

/// 所有选项都是字符串键值对，由各个操作自行解释（例如 "yes" / "no"）
pub type Options = BTreeMap<String, String>;

pub trait Operation {
    /// 便于命令行输入的名字，中间不要有空格
    fn name(&self) -> &'static str;

    /// 带注释的 YAML 用法示例，方便在命令行查看每个操作的用途
    fn help(&self) -> &'static str;

    /// 默认选项
    fn default_options(&self) -> Options;

    /// 清空之前的全部状态，再保存本次的参数。缺失的选项使用默认值。
    fn configure(&mut self, names: Vec<String>, options: Options);

    /// 必须先 configure 再 validate。
    /// validate 只能读取文件信息，不可修改文件（内容、日期、权限等都不允许）。
    fn validate(&mut self) -> Result<()>;

    /// 必须先 validate 成功后才能 execute
    fn execute(&mut self) -> Result<()>;
}

/// 在默认选项之上覆盖用户给出的选项，未知的选项只记录警告
pub fn merge_options(op: &str, defaults: Options, given: Options) -> Options {
    let mut merged = defaults;
    for (key, value) in given {
        if !merged.contains_key(&key) {
            warn!("{}: 未知选项 {} 已忽略", op, key);
            continue;
        }
        merged.insert(key, value);
    }
    merged
}

/// 把 "yes"/"no"（也接受 true/false）解析为 bool，其它值视为配置错误
pub fn parse_flag(options: &Options, key: &str) -> Result<bool> {
    let value = options.get(key).map(|v| v.trim().to_lowercase()).unwrap_or_default();
    match value.as_str() {
        "yes" | "true" => Ok(true),
        "no" | "false" => Ok(false),
        other => Err(Error::config(format!(
            "option \"{}\" should be \"yes\" or \"no\", got \"{}\"",
            key, other
        ))),
    }
}

/// 清除空白的文件名，并检查数量是否在 [min, max] 之内
pub fn names_limit(names: &[String], min: usize, max: usize) -> Result<Vec<String>> {
    let names: Vec<String> = names
        .iter()
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .collect();
    if names.len() < min || names.len() > max {
        let expected = if min == max {
            format!("{}", min)
        } else {
            format!("{} to {}", min, max)
        };
        return Err(Error::config(format!(
            "needs {} file/folder names, got {}",
            expected,
            names.len()
        )));
    }
    Ok(names)
}

pub type Factory = fn() -> Box<dyn Operation>;

/// 默认构造的工厂函数
pub fn boxed<T: Operation + Default + 'static>() -> Box<dyn Operation> {
    Box::new(T::default())
}

/// 操作名 -> 工厂函数。在进程启动时构造一次，每个任务都拿到一个全新的实例。
#[derive(Default)]
pub struct Registry {
    factories: BTreeMap<&'static str, Factory>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 内置的全部操作
    pub fn builtin() -> Result<Self> {
        let mut registry = Self::new();
        registry.register(boxed::<Swap>)?;
        registry.register(boxed::<OneWaySync>)?;
        registry.register(boxed::<MoveNewFiles>)?;
        Ok(registry)
    }

    pub fn register(&mut self, factory: Factory) -> Result<()> {
        let name = factory().name();
        if self.factories.contains_key(name) {
            return Err(Error::DuplicateOperation(name.to_string()));
        }
        self.factories.insert(name, factory);
        Ok(())
    }

    pub fn create(&self, name: &str) -> Result<Box<dyn Operation>> {
        self.factories
            .get(name)
            .map(|factory| factory())
            .ok_or_else(|| Error::UnknownOperation(name.to_string()))
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.factories.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(pairs: &[(&str, &str)]) -> Options {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_merge_options_keeps_known_keys() {
        let defaults = opts(&[("dry-run", "yes"), ("add", "yes")]);
        let merged = merge_options("x", defaults, opts(&[("dry-run", "no"), ("bogus", "1")]));
        assert_eq!(merged, opts(&[("dry-run", "no"), ("add", "yes")]));
    }

    #[test]
    fn test_parse_flag() {
        let o = opts(&[("a", "yes"), ("b", "No"), ("c", "true"), ("d", "maybe")]);
        assert!(parse_flag(&o, "a").unwrap());
        assert!(!parse_flag(&o, "b").unwrap());
        assert!(parse_flag(&o, "c").unwrap());
        assert!(matches!(parse_flag(&o, "d"), Err(Error::Config(_))));
        assert!(parse_flag(&o, "missing").is_err());
    }

    #[test]
    fn test_names_limit() {
        let names = vec![" a ".to_string(), "".to_string(), "b".to_string()];
        assert_eq!(names_limit(&names, 2, 2).unwrap(), vec!["a", "b"]);
        assert!(names_limit(&names, 3, 3).is_err());
        assert!(names_limit(&names, 1, 1).is_err());
    }

    #[test]
    fn test_registry() {
        let registry = Registry::builtin().unwrap();
        assert_eq!(registry.names(), vec!["move-new-files", "one-way-sync", "swap"]);
        assert_eq!(registry.create("swap").unwrap().name(), "swap");
        assert!(matches!(registry.create("nope"), Err(Error::UnknownOperation(_))));

        let mut registry = registry;
        let err = registry.register(boxed::<Swap>).unwrap_err();
        assert!(matches!(err, Error::DuplicateOperation(_)));
    }
}
