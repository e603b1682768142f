use super::{merge_options, names_limit, parse_flag, Operation, Options};
use crate::core::paths::{canonical, find_file, path_not_exists};
use crate::error::{Error, IoResultExt, Result};
use std::path::{Path, PathBuf};
use tracing::info;

/// 用于临时文件名的后缀
const SWAP_SUFFIX: &str = "1";

/// 最多可连续添加多少次后缀，避免文件名无限变长
const SWAP_LIMIT: usize = 20;

/// 对调两个文件（或文件夹）的名字
#[derive(Default)]
pub struct Swap {
    names: Vec<String>,
    options: Options,
    pair: Option<(PathBuf, PathBuf)>,
    verbose: bool,
}

impl Operation for Swap {
    fn name(&self) -> &'static str {
        "swap"
    }

    fn help(&self) -> &'static str {
        r#"
- recipe: swap          # 对调两个文件的文件名
  options:
    verbose: "no"       # 设为 yes 时显示每一步重命名
  names:
  - ./file1.txt
  - ./file2.txt
"#
    }

    fn default_options(&self) -> Options {
        Options::from([("verbose".to_string(), "no".to_string())])
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
        self.pair = None;
        self.verbose = parse_flag(&self.options, "verbose")?;
        let names = names_limit(&self.names, 2, 2)
            .map_err(|e| Error::config(format!("{}: {}", self.name(), e)))?;

        let a = PathBuf::from(&names[0]);
        let b = PathBuf::from(&names[1]);
        find_file(&a)?;
        find_file(&b)?;
        if canonical(&a) == canonical(&b) {
            return Err(Error::config(format!(
                "{}: [{}] and [{}] are the same file",
                self.name(),
                a.display(),
                b.display()
            )));
        }
        self.pair = Some((a, b));
        Ok(())
    }

    fn execute(&mut self) -> Result<()> {
        let (a, b) = self
            .pair
            .as_ref()
            .ok_or_else(|| Error::config("swap: execute before validate"))?;

        if self.verbose {
            info!("start to swap [{}] and [{}]", a.display(), b.display());
        }
        let temp = temp_name(a)?;

        if self.verbose {
            info!("found a safe temp filename: {}", temp.display());
            info!("rename {} to {}", a.display(), temp.display());
        }
        std::fs::rename(a, &temp).at(a)?;

        if self.verbose {
            info!("rename {} to {}", b.display(), a.display());
        }
        std::fs::rename(b, a).at(b)?;

        if self.verbose {
            info!("rename {} to {}", temp.display(), b.display());
        }
        std::fs::rename(&temp, b).at(&temp)?;

        info!("swap files OK: {} and {}", a.display(), b.display());
        Ok(())
    }
}

/// 在扩展名前面加后缀，例如 abc.js -> abc1.js
fn add_suffix(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{}{}.{}", stem, SWAP_SUFFIX, ext.to_string_lossy()),
        None => format!("{}{}", stem, SWAP_SUFFIX),
    };
    path.with_file_name(name)
}

/// 找出一个可用的临时文件名
fn temp_name(path: &Path) -> Result<PathBuf> {
    let mut name = path.to_path_buf();
    for _ in 0..SWAP_LIMIT {
        name = add_suffix(&name);
        if path_not_exists(&name)? {
            return Ok(name);
        }
    }
    Err(Error::config(format!(
        "no proper temp filename, last try: {}",
        name.display()
    )))
}
