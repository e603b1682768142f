use super::{merge_options, parse_flag, Operation, Options};
use crate::core::engine::{check_paths, split_names, SyncConfig, SyncEngine, SyncReport};
use crate::core::{ComparePolicy, ScanConfig};
use crate::error::{Error, Result};
use tracing::warn;

/// 单向同步：把源头（文件和文件夹）同步到目标文件夹。
///
/// 目标里没有的就 add，已有的对比差异按需 update，多余的则 delete；
/// 三者可以单独开关。update 时可选择对比日期、对比内容（至少一项）。
#[derive(Default)]
pub struct OneWaySync {
    names: Vec<String>,
    options: Options,
    engine: Option<SyncEngine>,
    report: Option<SyncReport>,
}

impl OneWaySync {
    /// 最近一次 execute 的报告
    pub fn report(&self) -> Option<&SyncReport> {
        self.report.as_ref()
    }

    fn build_config(&self) -> Result<SyncConfig> {
        let options = &self.options;
        let (target_dir, source_roots) = split_names(&self.names)?;

        let policy = ComparePolicy {
            by_time: parse_flag(options, "by-date")?,
            by_content: parse_flag(options, "by-content")?,
        };
        if !policy.is_valid() {
            return Err(Error::config(format!(
                "{}: by-date and by-content cannot both be \"no\"",
                self.name()
            )));
        }

        check_paths(&target_dir, &source_roots)?;

        Ok(SyncConfig {
            target_dir,
            source_roots,
            dry_run: parse_flag(options, "dry-run")?,
            do_add: parse_flag(options, "add")?,
            do_update: parse_flag(options, "update")?,
            do_delete: parse_flag(options, "delete")?,
            policy,
            scan: ScanConfig::from_option(options.get("exclude").map(String::as_str).unwrap_or("")),
            verbose: parse_flag(options, "verbose")?,
        })
    }
}

impl Operation for OneWaySync {
    fn name(&self) -> &'static str {
        "one-way-sync"
    }

    fn help(&self) -> &'static str {
        r#"
- recipe: one-way-sync   # 单向同步，把源头同步到目标文件夹
  options:
    dry-run: "yes"       # 设为 yes 时只显示信息；设为 no 时才会实际执行
    add: "yes"           # 目标里没有的文件/文件夹，是否添加
    update: "yes"        # 目标里已有但内容不同的文件，是否更新
    delete: "no"         # 目标里多余的文件/文件夹，是否删除
    by-date: "no"        # 是否对比修改日期
    by-content: "yes"    # 是否对比文件内容（两项都开启时，两项都不同才更新）
    exclude: ""          # 排除规则，逗号分隔，例如 ".git/**, *.tmp"
    verbose: "no"        # 实际执行时也显示 ADD/UPDATE/DELETE 列表
  names:
  - ./dest/              # 第一个是目标文件夹
  - ./src/               # 其余是源头（文件或文件夹）
  - ./README.md

# 建议先 dry run，确认没问题后再把 dry-run 改为 no。
"#
    }

    fn default_options(&self) -> Options {
        [
            ("dry-run", "yes"),
            ("add", "yes"),
            ("update", "yes"),
            ("delete", "no"),
            ("by-date", "no"),
            ("by-content", "yes"),
            ("exclude", ""),
            ("verbose", "no"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    fn configure(&mut self, names: Vec<String>, options: Options) {
        let options = merge_options(self.name(), self.default_options(), options);
        *self = Self {
            names,
            options,
            ..Self::default()
        };
    }

    fn validate(&mut self) -> Result<()> {
        self.engine = None;
        let config = self.build_config()?;
        if !(config.do_add || config.do_update || config.do_delete) {
            warn!("{}: add, update, delete 全部为 no", self.name());
        }
        self.engine = Some(SyncEngine::new(config)?);
        Ok(())
    }

    fn execute(&mut self) -> Result<()> {
        let engine = self
            .engine
            .as_ref()
            .ok_or_else(|| Error::config(format!("{}: execute before validate", self.name())))?;

        let report = engine.run()?;
        if report.dry_run || engine.config().verbose {
            println!("{}", report.render());
        }
        self.report = Some(report);
        Ok(())
    }
}
