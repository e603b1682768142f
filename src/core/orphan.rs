//! 孤儿扫描：找出目标文件夹里已经没有任何源头对应的条目

use crate::core::engine::HandledDirs;
use crate::core::paths::{is_file_or_dir, normalize_rel};
use crate::core::scanner::ExcludeRules;
use crate::error::Result;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// 一个源头，以及它能产出哪些相对路径
#[derive(Debug, Clone)]
pub enum SourceRoot {
    /// 文件夹源头：产出其内部所有相对路径
    Dir(PathBuf),
    /// 文件源头：只产出它的文件名
    File { path: PathBuf, name: OsString },
}

impl SourceRoot {
    pub fn new(path: PathBuf, is_dir: bool) -> Self {
        if is_dir {
            SourceRoot::Dir(path)
        } else {
            let name = path.file_name().map(OsString::from).unwrap_or_default();
            SourceRoot::File { path, name }
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            SourceRoot::Dir(path) => path,
            SourceRoot::File { path, .. } => path,
        }
    }

    /// 该源头是否产出 rel 这个相对路径。
    /// 与遍历保持一致：文件夹源头里的符号链接和特殊文件不算产出。
    pub fn produces(&self, rel: &Path) -> Result<bool> {
        match self {
            SourceRoot::Dir(root) => is_file_or_dir(&root.join(rel)),
            SourceRoot::File { name, .. } => Ok(rel.as_os_str() == name.as_os_str()),
        }
    }
}

/// 待删除的条目
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Orphan {
    /// 显示形式，`/` 分隔
    pub rel_path: String,
    pub abs_path: PathBuf,
    pub is_dir: bool,
}

pub struct OrphanScanner<'a> {
    target_dir: &'a Path,
    sources: &'a [SourceRoot],
    excludes: &'a ExcludeRules,
}

impl<'a> OrphanScanner<'a> {
    pub fn new(target_dir: &'a Path, sources: &'a [SourceRoot], excludes: &'a ExcludeRules) -> Self {
        Self {
            target_dir,
            sources,
            excludes,
        }
    }

    /// 只读扫描，按遍历顺序返回孤儿条目。
    /// 被判定为孤儿的文件夹记入 handled，不会再进入其内部，其内容随文件夹一起删除。
    pub fn scan(&self, handled: &mut HandledDirs) -> Result<Vec<Orphan>> {
        let mut orphans = Vec::new();
        let mut walker = WalkDir::new(self.target_dir)
            .min_depth(1)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter();

        while let Some(dent) = walker.next() {
            let dent = dent?;
            let Ok(rel) = dent.path().strip_prefix(self.target_dir) else {
                continue;
            };
            let rel = rel.to_path_buf();
            let rel_path = normalize_rel(&rel);
            let is_dir = dent.file_type().is_dir();

            if handled.under_deleted(&rel) || self.excludes.is_excluded(&rel_path) {
                if is_dir {
                    walker.skip_current_dir();
                }
                continue;
            }

            if self.is_produced(&rel)? {
                continue;
            }

            debug!("孤儿条目: {}", rel_path);
            if is_dir {
                handled.mark_deleted(&rel);
                walker.skip_current_dir();
            }
            orphans.push(Orphan {
                rel_path,
                abs_path: dent.into_path(),
                is_dir,
            });
        }

        Ok(orphans)
    }

    fn is_produced(&self, rel: &Path) -> Result<bool> {
        for source in self.sources {
            if source.produces(rel)? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
