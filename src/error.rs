//! 错误类型

use std::path::{Path, PathBuf};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// 参数缺失或互相矛盾，只在 validate 阶段产生，不会修改磁盘
    #[error("配置错误: {0}")]
    Config(String),

    #[error("找不到文件或文件夹: {}", .0.display())]
    PathNotFound(PathBuf),

    #[error("目标不是文件夹: {}", .0.display())]
    NotADirectory(PathBuf),

    /// 同一相对路径在源头和目标里一个是文件、一个是文件夹
    #[error("类型冲突（文件/文件夹不一致）: {}", .0.display())]
    KindConflict(PathBuf),

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("遍历目录失败: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("读取任务文件失败: {0}")]
    TaskFile(#[from] serde_yaml::Error),

    #[error("not found recipe: {0} (use --list to list out all registered recipes)")]
    UnknownOperation(String),

    #[error("{0} already exists")]
    DuplicateOperation(String),

    #[error("no task")]
    NoTasks,

    #[error("task #{index} ({recipe}): {source}")]
    Task {
        index: usize,
        recipe: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// 附带路径信息的 IO 错误
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

/// 给 `std::io::Result` 补上出错的路径
pub trait IoResultExt<T> {
    fn at(self, path: impl AsRef<Path>) -> Result<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn at(self, path: impl AsRef<Path>) -> Result<T> {
        self.map_err(|e| Error::io(path, e))
    }
}
