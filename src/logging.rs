//! 日志模块 - 提供文件日志和大小管理功能

use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing_subscriber::fmt::MakeWriter;

pub const LOG_FILE: &str = "gofer.log";

/// 日志配置，对应 config.json 里的 `log`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogConfig {
    /// 是否写日志文件（控制台输出不受影响）
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// 最大日志文件大小（MB）
    #[serde(default = "default_max_size_mb")]
    pub max_size_mb: u32,
    /// 日志级别: "error", "warn", "info", "debug", "trace"
    #[serde(default = "default_level")]
    pub level: String,
}

fn default_enabled() -> bool {
    true
}

fn default_max_size_mb() -> u32 {
    5 // 默认 5MB
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            max_size_mb: default_max_size_mb(),
            level: default_level(),
        }
    }
}

impl LogConfig {
    /// 将配置的日志级别转换为 tracing Level
    pub fn tracing_level(&self) -> tracing::Level {
        match self.level.to_lowercase().as_str() {
            "error" => tracing::Level::ERROR,
            "warn" => tracing::Level::WARN,
            "debug" => tracing::Level::DEBUG,
            "trace" => tracing::Level::TRACE,
            _ => tracing::Level::INFO,
        }
    }
}

/// 当前日志文件，超过大小后改名为 `.old` 并重新打开
struct LogFile {
    path: PathBuf,
    max_size: u64,
    writer: Option<BufWriter<File>>,
}

impl LogFile {
    fn open(path: PathBuf, max_size: u64) -> io::Result<Self> {
        let mut file = Self {
            path,
            max_size,
            writer: None,
        };
        file.rotate_if_needed()?;
        file.writer = Some(Self::append(&file.path)?);
        Ok(file)
    }

    fn append(path: &Path) -> io::Result<BufWriter<File>> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(BufWriter::new(file))
    }

    fn backup_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".old");
        PathBuf::from(name)
    }

    fn rotate_if_needed(&mut self) -> io::Result<()> {
        let len = match fs::metadata(&self.path) {
            Ok(meta) => meta.len(),
            Err(_) => return Ok(()),
        };
        if len <= self.max_size {
            return Ok(());
        }

        if let Some(mut w) = self.writer.take() {
            let _ = w.flush();
        }
        let backup = self.backup_path();
        if backup.exists() {
            fs::remove_file(&backup)?;
        }
        fs::rename(&self.path, &backup)?;
        self.writer = Some(Self::append(&self.path)?);
        Ok(())
    }
}

/// 带大小限制的日志写入器
#[derive(Clone)]
pub struct SizeRotatingWriter {
    inner: Arc<Mutex<LogFile>>,
}

impl SizeRotatingWriter {
    pub fn new(log_dir: &Path, max_size_mb: u32) -> io::Result<Self> {
        Self::with_max_bytes(log_dir, u64::from(max_size_mb) * 1024 * 1024)
    }

    pub fn with_max_bytes(log_dir: &Path, max_size: u64) -> io::Result<Self> {
        fs::create_dir_all(log_dir)?;
        let file = LogFile::open(log_dir.join(LOG_FILE), max_size)?;
        Ok(Self {
            inner: Arc::new(Mutex::new(file)),
        })
    }
}

fn lock(inner: &Mutex<LogFile>) -> MutexGuard<'_, LogFile> {
    // 写日志时 panic 不应该让后续日志全部失败
    inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// 日志写入器包装
pub struct LogWriter {
    inner: Arc<Mutex<LogFile>>,
}

impl Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut file = lock(&self.inner);
        let writer = file
            .writer
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "Writer not available"))?;
        writer.write_all(buf)?;
        writer.flush()?;
        file.rotate_if_needed()?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        match lock(&self.inner).writer.as_mut() {
            Some(writer) => writer.flush(),
            None => Ok(()),
        }
    }
}

impl<'a> MakeWriter<'a> for SizeRotatingWriter {
    type Writer = LogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LogWriter {
            inner: self.inner.clone(),
        }
    }
}

/// 获取日志目录路径（跟随数据目录）
pub fn get_log_dir() -> PathBuf {
    crate::config::data_dir()
}
