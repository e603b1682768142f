use crate::core::digest::Digest;
use crate::core::scanner::Entry;
use crate::error::{Error, Result};
use filetime::FileTime;
use std::io::ErrorKind;
use std::path::Path;
use tracing::debug;

/// 比较策略：至少开启其中一项
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComparePolicy {
    /// 对比修改时间
    pub by_time: bool,
    /// 对比内容摘要
    pub by_content: bool,
}

impl ComparePolicy {
    pub fn is_valid(&self) -> bool {
        self.by_time || self.by_content
    }
}

impl Default for ComparePolicy {
    fn default() -> Self {
        Self {
            by_time: false,
            by_content: true,
        }
    }
}

/// 比较结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// 目标不存在
    New,
    Unchanged,
    Modified,
}

/// 文件比较器
pub struct FileComparator {
    policy: ComparePolicy,
}

impl FileComparator {
    pub fn new(policy: ComparePolicy) -> Self {
        Self { policy }
    }

    /// 判断源头条目相对于目标路径是新增、未变还是已修改。
    ///
    /// 同时开启时间和内容对比时，只有两项都不同才算修改；
    /// 只改了时间（例如被 touch 过）或者时间相同的文件都视为未变。
    pub fn classify(&self, source: &Entry, target: &Path) -> Result<Classification> {
        let meta = match std::fs::symlink_metadata(target) {
            Ok(meta) => meta,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Classification::New),
            Err(e) => return Err(Error::io(target, e)),
        };

        if source.is_dir != meta.is_dir() {
            return Err(Error::KindConflict(target.to_path_buf()));
        }
        // 文件夹只会是新增或未变，其内容单独比较
        if source.is_dir {
            return Ok(Classification::Unchanged);
        }

        let time_differs = || source.mtime != FileTime::from_last_modification_time(&meta);
        let content_differs = || -> Result<bool> {
            Ok(source.digest()? != Digest::of_file(target)?)
        };

        let modified = match (self.policy.by_time, self.policy.by_content) {
            (true, false) => time_differs(),
            (false, true) => content_differs()?,
            // 先看时间，时间相同就不必读取文件内容
            (true, true) => time_differs() && content_differs()?,
            (false, false) => {
                return Err(Error::config("by-date 与 by-content 至少要开启一项"));
            }
        };

        if modified {
            debug!("文件已修改: {}", source.rel_path);
            Ok(Classification::Modified)
        } else {
            Ok(Classification::Unchanged)
        }
    }
}
