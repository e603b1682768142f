pub mod config;
pub mod core;
pub mod error;
pub mod logging;
pub mod ops;
pub mod task;

pub use core::{SyncConfig, SyncEngine, SyncReport};
pub use error::{Error, Result};
pub use ops::{Operation, Options, Registry};
pub use task::{Task, TaskList};

/// 各平台的配置目录
pub mod dirs {
    use std::path::PathBuf;

    pub fn config_dir() -> Option<PathBuf> {
        if cfg!(target_os = "windows") {
            std::env::var("APPDATA").ok().map(PathBuf::from)
        } else if cfg!(target_os = "macos") {
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join("Library").join("Application Support"))
        } else {
            std::env::var_os("XDG_CONFIG_HOME")
                .map(PathBuf::from)
                .or_else(|| {
                    std::env::var("HOME")
                        .ok()
                        .map(|h| PathBuf::from(h).join(".config"))
                })
        }
    }
}
