use crate::core::digest::Digest;
use crate::core::paths::normalize_rel;
use crate::error::{Error, Result};
use filetime::FileTime;
use regex::Regex;
use std::cell::OnceCell;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// 文件扫描器配置
#[derive(Debug, Clone, Default)]
pub struct ScanConfig {
    /// 排除规则（glob patterns），为空表示不排除任何文件
    pub exclude_patterns: Vec<String>,
}

impl ScanConfig {
    /// 从逗号分隔的字符串解析排除规则，例如 `".git/**, *.tmp"`
    pub fn from_option(value: &str) -> Self {
        Self {
            exclude_patterns: value
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(String::from)
                .collect(),
        }
    }
}

/// 一条排除规则
#[derive(Debug)]
enum Rule {
    /// 含 `**`：前缀/后缀匹配
    DoubleStar { prefix: String, suffix: String },
    /// 含 `*`：转换为正则
    Wildcard(Regex),
    /// 精确匹配（整个路径或最后几级路径）
    Exact(String),
}

/// 编译好的排除规则
#[derive(Debug, Default)]
pub struct ExcludeRules {
    rules: Vec<Rule>,
}

impl ExcludeRules {
    pub fn new(patterns: &[String]) -> Result<Self> {
        let mut rules = Vec::with_capacity(patterns.len());
        for pattern in patterns {
            let pattern = pattern.to_lowercase();
            let rule = if let Some((prefix, suffix)) = pattern.split_once("**") {
                Rule::DoubleStar {
                    prefix: prefix.trim_end_matches('/').to_string(),
                    suffix: suffix.trim_start_matches('/').to_string(),
                }
            } else if pattern.contains('*') {
                let regex_pattern = regex::escape(&pattern).replace("\\*", ".*");
                let re = Regex::new(&format!("^{}$", regex_pattern))
                    .map_err(|e| Error::config(format!("无效的排除规则 {}: {}", pattern, e)))?;
                Rule::Wildcard(re)
            } else {
                Rule::Exact(pattern.trim_matches('/').to_string())
            };
            rules.push(rule);
        }
        Ok(Self { rules })
    }

    /// 检查 `/` 分隔的相对路径是否应该被排除
    pub fn is_excluded(&self, rel: &str) -> bool {
        if self.rules.is_empty() {
            return false;
        }
        let path = rel.to_lowercase();
        let name = path.rsplit('/').next().unwrap_or(&path);

        self.rules.iter().any(|rule| match rule {
            Rule::DoubleStar { prefix, suffix } => {
                let prefix_ok = prefix.is_empty()
                    || path == *prefix
                    || path.starts_with(&format!("{}/", prefix));
                prefix_ok && (suffix.is_empty() || path.ends_with(suffix.as_str()))
            }
            Rule::Wildcard(re) => re.is_match(&path) || re.is_match(name),
            Rule::Exact(exact) => path == *exact || path.ends_with(&format!("/{}", exact)),
        })
    }
}

/// 遍历得到的一个条目，用完即丢
#[derive(Debug)]
pub struct Entry {
    pub abs_path: PathBuf,
    /// 相对于所属源头的路径，拼接目标路径时使用
    pub rel: PathBuf,
    /// rel 的显示形式，`/` 分隔
    pub rel_path: String,
    pub is_dir: bool,
    pub mtime: FileTime,
    digest: OnceCell<Digest>,
}

impl Entry {
    pub fn new(abs_path: PathBuf, rel: PathBuf, is_dir: bool, mtime: FileTime) -> Self {
        Self {
            abs_path,
            rel_path: normalize_rel(&rel),
            rel,
            is_dir,
            mtime,
            digest: OnceCell::new(),
        }
    }

    /// 内容摘要，第一次调用时才读取文件
    pub fn digest(&self) -> Result<Digest> {
        if let Some(digest) = self.digest.get() {
            return Ok(*digest);
        }
        let digest = Digest::of_file(&self.abs_path)?;
        let _ = self.digest.set(digest);
        Ok(digest)
    }
}

/// 文件扫描器：按文件名排序的深度优先遍历，文件夹总是先于其内容出现
pub struct FileScanner {
    excludes: ExcludeRules,
}

impl FileScanner {
    pub fn new(config: &ScanConfig) -> Result<Self> {
        Ok(Self {
            excludes: ExcludeRules::new(&config.exclude_patterns)?,
        })
    }

    pub fn excludes(&self) -> &ExcludeRules {
        &self.excludes
    }

    /// 遍历一个源头（文件或文件夹）。
    /// 源头是文件夹时不产出它自身，只产出其内容；源头是文件时产出一个以文件名为相对路径的条目。
    pub fn walk(&self, root: &Path) -> Result<SourceWalk<'_>> {
        let meta = std::fs::metadata(root).map_err(|e| Error::io(root, e))?;
        let root_is_dir = meta.is_dir();

        let mut walker = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name();
        if root_is_dir {
            walker = walker.min_depth(1);
        }

        debug!("开始扫描源头: {}", root.display());
        Ok(SourceWalk {
            inner: walker.into_iter(),
            root: root.to_path_buf(),
            root_is_dir,
            excludes: &self.excludes,
        })
    }
}

/// 惰性遍历器，遇到任何读取错误都直接返回错误
pub struct SourceWalk<'a> {
    inner: walkdir::IntoIter,
    root: PathBuf,
    root_is_dir: bool,
    excludes: &'a ExcludeRules,
}

impl Iterator for SourceWalk<'_> {
    type Item = Result<Entry>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let dent = match self.inner.next()? {
                Ok(dent) => dent,
                Err(e) => return Some(Err(e.into())),
            };

            let rel = if self.root_is_dir {
                match dent.path().strip_prefix(&self.root) {
                    Ok(rel) => rel.to_path_buf(),
                    Err(_) => continue,
                }
            } else {
                PathBuf::from(dent.file_name())
            };
            let rel_path = normalize_rel(&rel);

            let file_type = dent.file_type();
            let is_dir = file_type.is_dir();

            if self.excludes.is_excluded(&rel_path) {
                debug!("排除: {}", rel_path);
                if is_dir {
                    self.inner.skip_current_dir();
                }
                continue;
            }

            if !is_dir && !file_type.is_file() && self.root_is_dir {
                warn!("跳过非普通文件: {}", dent.path().display());
                continue;
            }

            let meta = match dent.metadata() {
                Ok(meta) => meta,
                Err(e) => return Some(Err(e.into())),
            };

            return Some(Ok(Entry {
                abs_path: dent.into_path(),
                rel,
                rel_path,
                is_dir,
                mtime: FileTime::from_last_modification_time(&meta),
                digest: OnceCell::new(),
            }));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn rules(patterns: &[&str]) -> ExcludeRules {
        let patterns: Vec<String> = patterns.iter().map(|s| s.to_string()).collect();
        ExcludeRules::new(&patterns).unwrap()
    }

    #[test]
    fn test_exclude_patterns() {
        let r = rules(&[".git/**", "*.tmp", "Thumbs.db"]);
        assert!(r.is_excluded(".git"));
        assert!(r.is_excluded(".git/objects/ab"));
        assert!(!r.is_excluded(".github/workflow.yml"));
        assert!(r.is_excluded("a.tmp"));
        assert!(r.is_excluded("sub/b.TMP"));
        assert!(r.is_excluded("sub/thumbs.db"));
        assert!(!r.is_excluded("sub/a.txt"));
        assert!(!ExcludeRules::default().is_excluded("anything"));
    }

    #[test]
    fn test_scan_config_from_option() {
        let config = ScanConfig::from_option(" *.tmp, ,node_modules/** ");
        assert_eq!(config.exclude_patterns, vec!["*.tmp", "node_modules/**"]);
        assert!(ScanConfig::from_option("").exclude_patterns.is_empty());
    }

    #[test]
    fn test_walk_order_dirs_first() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("b/inner")).unwrap();
        fs::write(root.join("c.txt"), b"c").unwrap();
        fs::write(root.join("a.txt"), b"a").unwrap();
        fs::write(root.join("b/inner/z.txt"), b"z").unwrap();
        fs::write(root.join("b/y.txt"), b"y").unwrap();

        let scanner = FileScanner::new(&ScanConfig::default()).unwrap();
        let rels: Vec<String> = scanner
            .walk(root)
            .unwrap()
            .map(|e| e.unwrap().rel_path)
            .collect();
        assert_eq!(
            rels,
            vec!["a.txt", "b", "b/inner", "b/inner/z.txt", "b/y.txt", "c.txt"]
        );
    }

    #[test]
    fn test_walk_file_root() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("only.txt");
        fs::write(&file, b"1").unwrap();

        let scanner = FileScanner::new(&ScanConfig::default()).unwrap();
        let entries: Vec<Entry> = scanner.walk(&file).unwrap().map(|e| e.unwrap()).collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].rel_path, "only.txt");
        assert!(!entries[0].is_dir);
        assert_eq!(entries[0].digest().unwrap(), Digest::of_bytes(b"1"));
    }

    #[test]
    fn test_walk_prunes_excluded_dir() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("node_modules/pkg")).unwrap();
        fs::write(root.join("node_modules/pkg/index.js"), b"").unwrap();
        fs::write(root.join("main.js"), b"").unwrap();

        let scanner = FileScanner::new(&ScanConfig::from_option("node_modules/**")).unwrap();
        let rels: Vec<String> = scanner
            .walk(root)
            .unwrap()
            .map(|e| e.unwrap().rel_path)
            .collect();
        assert_eq!(rels, vec!["main.js"]);
    }
}
