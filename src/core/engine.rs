use crate::core::comparator::{Classification, ComparePolicy, FileComparator};
use crate::core::orphan::{OrphanScanner, SourceRoot};
use crate::core::paths::{ancestors, canonical, find_file, overlaps};
use crate::core::scanner::{Entry, FileScanner, ScanConfig};
use crate::core::transfer;
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// 单次同步的配置，validate 通过后才会构造
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub target_dir: PathBuf,
    /// 按顺序处理的源头（文件或文件夹）
    pub source_roots: Vec<PathBuf>,
    /// 为 true 时只显示信息，不实际执行
    pub dry_run: bool,
    pub do_add: bool,
    pub do_update: bool,
    pub do_delete: bool,
    pub policy: ComparePolicy,
    pub scan: ScanConfig,
    /// 非 dry run 时也打印动作列表
    pub verbose: bool,
}

impl SyncConfig {
    pub fn new(target_dir: impl Into<PathBuf>, source_roots: Vec<PathBuf>) -> Self {
        Self {
            target_dir: target_dir.into(),
            source_roots,
            dry_run: true,
            do_add: true,
            do_update: true,
            do_delete: false,
            policy: ComparePolicy::default(),
            scan: ScanConfig::default(),
            verbose: false,
        }
    }
}

/// 清除空字符串后拆分路径参数：第一个是目标文件夹，其余是源头（至少一个）
pub fn split_names(names: &[String]) -> Result<(PathBuf, Vec<PathBuf>)> {
    let names: Vec<&str> = names
        .iter()
        .map(|n| n.trim())
        .filter(|n| !n.is_empty())
        .collect();

    if names.len() < 2 {
        debug!("file/folder names: {:?}", names);
        return Err(Error::config(
            "one-way-sync: needs at least two file/folder names (target + sources)",
        ));
    }

    let target = PathBuf::from(names[0]);
    let sources = names[1..].iter().map(PathBuf::from).collect();
    Ok((target, sources))
}

/// 检查路径：目标必须是文件夹，每个路径都必须存在，目标与源头不能互相包含。
/// 只读取文件信息，不修改任何文件。
pub fn check_paths(target: &Path, sources: &[PathBuf]) -> Result<()> {
    // 目标存在但不是文件夹
    if let Ok(meta) = std::fs::metadata(target) {
        if !meta.is_dir() {
            return Err(Error::NotADirectory(target.to_path_buf()));
        }
    }

    // 确保每个文件/文件夹都真实存在
    find_file(target)?;
    for source in sources {
        find_file(source)?;
    }

    let target_canon = canonical(target);
    for source in sources {
        if overlaps(&target_canon, &canonical(source)) {
            return Err(Error::config(format!(
                "target and source must not contain each other: {} / {}",
                target.display(),
                source.display()
            )));
        }
    }
    Ok(())
}

/// 三个动作列表，路径均为相对于目标文件夹、以 `/` 分隔
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActionList {
    pub to_add: Vec<String>,
    pub to_update: Vec<String>,
    pub to_delete: Vec<String>,
}

impl ActionList {
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_update.is_empty() && self.to_delete.is_empty()
    }
}

/// 本次同步中已经整体处理过的文件夹
#[derive(Debug, Default)]
pub struct HandledDirs {
    /// 整个文件夹都是新增的，其内容不再单独比较和记录
    new: HashSet<PathBuf>,
    /// 整个文件夹将被删除，孤儿扫描不再进入
    deleted: HashSet<PathBuf>,
}

impl HandledDirs {
    pub fn mark_new(&mut self, rel: &Path) {
        self.new.insert(rel.to_path_buf());
    }

    pub fn mark_deleted(&mut self, rel: &Path) {
        self.deleted.insert(rel.to_path_buf());
    }

    /// rel 是否位于某个新增文件夹之内
    pub fn under_new(&self, rel: &Path) -> bool {
        ancestors(rel).any(|a| self.new.contains(a))
    }

    /// rel 是否位于某个待删除文件夹之内
    pub fn under_deleted(&self, rel: &Path) -> bool {
        ancestors(rel).any(|a| self.deleted.contains(a))
    }
}

/// 实际执行的文件操作统计（dry run 时全为 0）
#[derive(Debug, Clone, Default, Serialize)]
pub struct TransferStats {
    pub files_copied: u64,
    pub dirs_created: u64,
    pub entries_deleted: u64,
    pub bytes_copied: u64,
}

/// 同步报告
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub target_dir: PathBuf,
    pub dry_run: bool,
    pub do_add: bool,
    pub do_update: bool,
    pub do_delete: bool,
    pub actions: ActionList,
    pub stats: TransferStats,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl SyncReport {
    /// 控制台输出：ADD / UPDATE / DELETE 三段，每段显示开关和路径列表
    pub fn render(&self) -> String {
        let mut out = String::new();
        if self.dry_run {
            out.push_str("\n**It's a dry run, not a real run.**\n");
        }
        let _ = writeln!(out, "\nSync to [{}]", self.target_dir.display());

        let sections = [
            ("ADD", self.do_add, &self.actions.to_add),
            ("UPDATE", self.do_update, &self.actions.to_update),
            ("DELETE", self.do_delete, &self.actions.to_delete),
        ];
        for (label, enabled, paths) in sections {
            let _ = writeln!(out, "\n{} ({}: {})", label, label.to_lowercase(), yes_no(enabled));
            if paths.is_empty() {
                out.push_str("  (none)\n");
            }
            for path in paths {
                let _ = writeln!(out, "  {}", path);
            }
        }
        out
    }
}

fn yes_no(v: bool) -> &'static str {
    if v {
        "yes"
    } else {
        "no"
    }
}

/// 单次运行的可变状态，只属于一次 run 调用
#[derive(Default)]
struct RunState {
    actions: ActionList,
    handled: HandledDirs,
    stats: TransferStats,
    /// 已处理过的相对路径及其是否为文件夹，多个源头重复时以第一个为准
    seen: HashMap<PathBuf, bool>,
}

/// 单向同步引擎
pub struct SyncEngine {
    config: SyncConfig,
    comparator: FileComparator,
    scanner: FileScanner,
    sources: Vec<SourceRoot>,
}

impl SyncEngine {
    pub fn new(config: SyncConfig) -> Result<Self> {
        if !config.policy.is_valid() {
            return Err(Error::config("by-date 与 by-content 至少要开启一项"));
        }
        let scanner = FileScanner::new(&config.scan)?;
        let mut sources = Vec::with_capacity(config.source_roots.len());
        for root in &config.source_roots {
            let meta = std::fs::metadata(root).map_err(|e| Error::io(root, e))?;
            sources.push(SourceRoot::new(root.clone(), meta.is_dir()));
        }
        Ok(Self {
            comparator: FileComparator::new(config.policy),
            scanner,
            sources,
            config,
        })
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// 执行同步：先完成新增/更新，再处理删除
    pub fn run(&self) -> Result<SyncReport> {
        let started_at = Utc::now();
        let mut run = RunState::default();

        info!(
            "开始同步: {:?} -> {} (dry_run={})",
            self.config.source_roots,
            self.config.target_dir.display(),
            self.config.dry_run
        );
        if !(self.config.do_add || self.config.do_update || self.config.do_delete) {
            warn!("add, update, delete 全部关闭，本次同步不会有任何动作");
        }

        for source in &self.sources {
            self.sync_source(source, &mut run)?;
        }

        if self.config.do_delete {
            self.prune_orphans(&mut run)?;
        }

        let finished_at = Utc::now();
        info!(
            "同步完成: 新增 {}, 更新 {}, 删除 {} (复制 {} 个文件, {} 字节)",
            run.actions.to_add.len(),
            run.actions.to_update.len(),
            run.actions.to_delete.len(),
            run.stats.files_copied,
            run.stats.bytes_copied
        );

        Ok(SyncReport {
            target_dir: self.config.target_dir.clone(),
            dry_run: self.config.dry_run,
            do_add: self.config.do_add,
            do_update: self.config.do_update,
            do_delete: self.config.do_delete,
            actions: run.actions,
            stats: run.stats,
            started_at,
            finished_at,
        })
    }

    fn sync_source(&self, source: &SourceRoot, run: &mut RunState) -> Result<()> {
        for entry in self.scanner.walk(source.path())? {
            let entry = entry?;

            if let Some(&seen_dir) = run.seen.get(&entry.rel) {
                if seen_dir != entry.is_dir {
                    return Err(Error::KindConflict(entry.abs_path));
                }
                // 文件夹在多个源头里出现是正常的合并
                if !entry.is_dir {
                    warn!("多个源头包含同一文件，使用第一个: {}", entry.rel_path);
                }
                continue;
            }
            run.seen.insert(entry.rel.clone(), entry.is_dir);

            let target = self.config.target_dir.join(&entry.rel);

            // 位于新增文件夹内：不再单独比较，只跟随文件夹一起复制
            if run.handled.under_new(&entry.rel) {
                self.apply_add(&entry, &target, run)?;
                continue;
            }

            match self.comparator.classify(&entry, &target)? {
                Classification::New => {
                    run.actions.to_add.push(entry.rel_path.clone());
                    if entry.is_dir {
                        run.handled.mark_new(&entry.rel);
                    }
                    self.apply_add(&entry, &target, run)?;
                }
                Classification::Modified => {
                    run.actions.to_update.push(entry.rel_path.clone());
                    if !self.config.dry_run && self.config.do_update {
                        self.copy(&entry, &target, run)?;
                    }
                }
                Classification::Unchanged => {}
            }
        }
        Ok(())
    }

    /// 新增：文件夹必须先于其内容创建
    fn apply_add(&self, entry: &Entry, target: &Path, run: &mut RunState) -> Result<()> {
        if self.config.dry_run || !self.config.do_add {
            return Ok(());
        }
        if entry.is_dir {
            transfer::create_dir(target)?;
            run.stats.dirs_created += 1;
            Ok(())
        } else {
            self.copy(entry, target, run)
        }
    }

    fn copy(&self, entry: &Entry, target: &Path, run: &mut RunState) -> Result<()> {
        let bytes = transfer::copy_file_with_mtime(&entry.abs_path, target)?;
        run.stats.files_copied += 1;
        run.stats.bytes_copied += bytes;
        Ok(())
    }

    fn prune_orphans(&self, run: &mut RunState) -> Result<()> {
        let orphans = OrphanScanner::new(
            &self.config.target_dir,
            &self.sources,
            self.scanner.excludes(),
        )
        .scan(&mut run.handled)?;

        for orphan in orphans {
            run.actions.to_delete.push(orphan.rel_path);
            if !self.config.dry_run {
                transfer::remove_entry(&orphan.abs_path)?;
                run.stats.entries_deleted += 1;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_handled_dirs() {
        let mut handled = HandledDirs::default();
        handled.mark_new(Path::new("sub"));
        assert!(handled.under_new(&Path::new("sub").join("a.txt")));
        assert!(handled.under_new(&Path::new("sub").join("deep").join("b.txt")));
        assert!(!handled.under_new(Path::new("sub")));
        assert!(!handled.under_new(&Path::new("subway").join("a.txt")));
        handled.mark_deleted(Path::new("old"));
        assert!(handled.under_deleted(&Path::new("old").join("x")));
        assert!(!handled.under_deleted(&Path::new("sub").join("a.txt")));
    }

    #[test]
    fn test_split_names_counts_non_empty() {
        let names = vec![String::new(), "only".to_string(), "  ".to_string()];
        assert!(matches!(split_names(&names), Err(Error::Config(_))));

        let names = vec!["dst".to_string(), "".to_string(), "a".to_string(), "b".to_string()];
        let (target, sources) = split_names(&names).unwrap();
        assert_eq!(target, PathBuf::from("dst"));
        assert_eq!(sources, vec![PathBuf::from("a"), PathBuf::from("b")]);
    }

    #[test]
    fn test_check_paths_target_is_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("f.txt");
        fs::write(&file, b"x").unwrap();
        let sources = vec![dir.path().to_path_buf()];
        assert!(matches!(check_paths(&file, &sources), Err(Error::NotADirectory(_))));
    }

    #[test]
    fn test_check_paths_missing() {
        let dir = tempfile::tempdir().unwrap();
        let sources = vec![dir.path().join("missing")];
        assert!(matches!(check_paths(dir.path(), &sources), Err(Error::PathNotFound(_))));
    }

    #[test]
    fn test_check_paths_nested() {
        let dir = tempfile::tempdir().unwrap();
        let inner = dir.path().join("inner");
        fs::create_dir(&inner).unwrap();
        let sources = vec![dir.path().to_path_buf()];
        assert!(matches!(check_paths(&inner, &sources), Err(Error::Config(_))));
    }

    #[test]
    fn test_render_sections() {
        let now = Utc::now();
        let report = SyncReport {
            target_dir: PathBuf::from("dst"),
            dry_run: true,
            do_add: true,
            do_update: true,
            do_delete: false,
            actions: ActionList {
                to_add: vec!["a.txt".into()],
                ..Default::default()
            },
            stats: TransferStats::default(),
            started_at: now,
            finished_at: now,
        };
        let text = report.render();
        assert!(text.contains("dry run"));
        assert!(text.contains("ADD (add: yes)\n  a.txt\n"));
        assert!(text.contains("UPDATE (update: yes)\n  (none)\n"));
        assert!(text.contains("DELETE (delete: no)\n  (none)\n"));
    }

    /// 把日志收集到内存里
    #[derive(Clone, Default)]
    struct Captured(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_shared_dirs_merge_without_warning() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        let dst = dir.path().join("dst");
        fs::create_dir_all(a.join("shared/deep")).unwrap();
        fs::create_dir_all(b.join("shared/deep")).unwrap();
        fs::create_dir(&dst).unwrap();
        fs::write(a.join("shared/x.txt"), b"x").unwrap();
        fs::write(b.join("shared/deep/y.txt"), b"y").unwrap();
        fs::write(a.join("same.txt"), b"from a").unwrap();
        fs::write(b.join("same.txt"), b"from b").unwrap();

        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish();

        let mut config = SyncConfig::new(&dst, vec![a, b]);
        config.dry_run = false;
        let report = tracing::subscriber::with_default(subscriber, || {
            SyncEngine::new(config).unwrap().run().unwrap()
        });

        assert_eq!(report.actions.to_add, vec!["same.txt", "shared"]);
        assert_eq!(fs::read(dst.join("shared/deep/y.txt")).unwrap(), b"y");

        let logs = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        let warnings: Vec<&str> = logs.lines().filter(|l| l.contains("WARN")).collect();
        assert_eq!(warnings.len(), 1, "{}", logs);
        assert!(warnings[0].contains("same.txt"));
    }

    #[test]
    fn test_duplicate_path_first_source_wins() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        let dst = dir.path().join("dst");
        for d in [&a, &b, &dst] {
            fs::create_dir(d).unwrap();
        }
        fs::write(a.join("same.txt"), b"from a").unwrap();
        fs::write(b.join("same.txt"), b"from b").unwrap();

        let mut config = SyncConfig::new(&dst, vec![a, b]);
        config.dry_run = false;
        let report = SyncEngine::new(config).unwrap().run().unwrap();
        assert_eq!(report.actions.to_add, vec!["same.txt"]);
        assert_eq!(fs::read(dst.join("same.txt")).unwrap(), b"from a");
    }
}
