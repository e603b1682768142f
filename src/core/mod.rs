pub mod comparator;
pub mod digest;
pub mod engine;
pub mod orphan;
pub mod paths;
pub mod scanner;
pub mod transfer;

pub use comparator::{Classification, ComparePolicy, FileComparator};
pub use digest::Digest;
pub use engine::{
    check_paths, split_names, ActionList, HandledDirs, SyncConfig, SyncEngine, SyncReport,
    TransferStats,
};
pub use orphan::{Orphan, OrphanScanner, SourceRoot};
pub use scanner::{Entry, ExcludeRules, FileScanner, ScanConfig};
