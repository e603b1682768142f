//! 应用配置模块
//!
//! 配置保存在数据目录下的 `config.json`，缺失或格式错误时使用默认值。

use crate::logging::LogConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// 配置目录下的子目录名
pub const APP_DIR: &str = "gofer";

/// 指定数据目录的环境变量，优先于 config.json 的 data_path
pub const HOME_ENV: &str = "GOFER_HOME";

pub const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// 自定义数据路径（只在默认配置目录的 config.json 里生效）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_path: Option<PathBuf>,
    #[serde(default)]
    pub log: LogConfig,
}

impl AppConfig {
    /// 从目录下的 config.json 加载
    pub fn load(config_dir: &Path) -> Self {
        fs::read_to_string(config_dir.join(CONFIG_FILE))
            .ok()
            .and_then(|content| serde_json::from_str::<AppConfig>(&content).ok())
            .unwrap_or_default()
    }
}

/// 默认配置目录
pub fn default_config_dir() -> PathBuf {
    crate::dirs::config_dir()
        .map(|p| p.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from(".gofer"))
}

/// 数据目录：GOFER_HOME > config.json 的 data_path > 默认配置目录
pub fn data_dir() -> PathBuf {
    resolve_data_dir(std::env::var_os(HOME_ENV).map(PathBuf::from), default_config_dir())
}

fn resolve_data_dir(env_home: Option<PathBuf>, default_dir: PathBuf) -> PathBuf {
    if let Some(home) = env_home.filter(|p| !p.as_os_str().is_empty()) {
        return home;
    }
    AppConfig::load(&default_dir)
        .data_path
        .filter(|p| p.is_dir())
        .inspect(|p| tracing::debug!("使用自定义数据路径: {:?}", p))
        .unwrap_or(default_dir)
}
