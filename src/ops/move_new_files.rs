use super::{merge_options, names_limit, parse_flag, Operation, Options};
use crate::core::paths::path_exists;
use crate::core::transfer;
use crate::error::{Error, IoResultExt, Result};
use std::path::PathBuf;
use std::time::SystemTime;
use tracing::debug;

/// 把一个文件夹内修改日期最新的 n 个文件移动到另一个文件夹。
/// 只处理第一层的普通文件，不递归子文件夹。
#[derive(Default)]
pub struct MoveNewFiles {
    names: Vec<String>,
    options: Options,
    plan: Option<MovePlan>,
}

#[derive(Debug)]
struct MovePlan {
    target_dir: PathBuf,
    source_dir: PathBuf,
    n: usize,
    /// 指定文件名的结尾（小写），空字符串表示不限
    suffix: String,
    dry_run: bool,
}

impl MovePlan {
    /// 符合条件的文件，按修改日期从新到旧，最多 n 个
    fn newest_files(&self) -> Result<Vec<(String, SystemTime)>> {
        let mut files = Vec::new();
        for dent in std::fs::read_dir(&self.source_dir).at(&self.source_dir)? {
            let dent = dent.at(&self.source_dir)?;
            let file_type = dent.file_type().at(dent.path())?;
            if !file_type.is_file() {
                continue;
            }
            let name = dent.file_name().to_string_lossy().into_owned();
            if !self.suffix.is_empty() && !name.to_lowercase().ends_with(&self.suffix) {
                continue;
            }
            let modified = dent.metadata().at(dent.path())?.modified().at(dent.path())?;
            files.push((name, modified));
        }
        // 新的在前，同一时间按名字排序保证结果稳定
        files.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        files.truncate(self.n);
        Ok(files)
    }
}

impl Operation for MoveNewFiles {
    fn name(&self) -> &'static str {
        "move-new-files"
    }

    fn help(&self) -> &'static str {
        r#"
- recipe: move-new-files # 移动 n 个(修改日期)最新的文件
  options:
    n: "1"               # 移动多少个文件
    suffix: ""           # 指定文件名的结尾，空字符串表示不限
    dry-run: "yes"       # 设为 yes 时只显示信息；设为 no 时才会实际执行
  names:
  - ./dest/              # 第一个是目标文件夹
  - ./src/               # 第二个是源头文件夹

# 建议先 dry run，如果有重名文件会提示 "skip"。
# 确认没问题后再把 dry-run 的值改为 no。
"#
    }

    fn default_options(&self) -> Options {
        [("n", "1"), ("suffix", ""), ("dry-run", "yes")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn configure(&mut self, names: Vec<String>, options: Options) {
        let options = merge_options(self.name(), self.default_options(), options);
        *self = Self {
            names,
            options,
            plan: None,
        };
    }

    fn validate(&mut self) -> Result<()> {
        self.plan = None;
        let raw_n = self.options.get("n").map(|s| s.trim()).unwrap_or("");
        let n: usize = raw_n
            .parse()
            .map_err(|_| Error::config(format!("\"n\" should be an integer, got \"{}\"", raw_n)))?;
        if n < 1 {
            return Err(Error::config("\"n\" should be 1 or larger"));
        }

        let names = names_limit(&self.names, 2, 2)
            .map_err(|e| Error::config(format!("{}: {}", self.name(), e)))?;
        let target_dir = PathBuf::from(&names[0]);
        let source_dir = PathBuf::from(&names[1]);
        for dir in [&target_dir, &source_dir] {
            let meta = std::fs::metadata(dir).map_err(|_| Error::PathNotFound(dir.clone()))?;
            if !meta.is_dir() {
                return Err(Error::NotADirectory(dir.clone()));
            }
        }

        self.plan = Some(MovePlan {
            target_dir,
            source_dir,
            n,
            suffix: self
                .options
                .get("suffix")
                .map(|s| s.to_lowercase())
                .unwrap_or_default(),
            dry_run: parse_flag(&self.options, "dry-run")?,
        });
        Ok(())
    }

    fn execute(&mut self) -> Result<()> {
        let plan = self
            .plan
            .as_ref()
            .ok_or_else(|| Error::config("move-new-files: execute before validate"))?;

        let files = plan.newest_files()?;
        if plan.dry_run {
            println!("\n**It's a dry run, not a real run.**");
        }
        println!(
            "\nMove files from [{}] to [{}]",
            plan.source_dir.display(),
            plan.target_dir.display()
        );

        for (name, _) in files {
            let target = plan.target_dir.join(&name);
            if path_exists(&target)? {
                println!("-- skip {}", name);
                continue;
            }
            println!("-- move {}", name);
            if plan.dry_run {
                continue;
            }

            let src = plan.source_dir.join(&name);
            if let Err(e) = std::fs::rename(&src, &target) {
                // 跨设备时 rename 会失败，改为复制后删除
                debug!("rename 失败，改为复制: {}", e);
                transfer::copy_file_with_mtime(&src, &target)?;
                std::fs::remove_file(&src).at(&src)?;
            }
        }
        Ok(())
    }
}
