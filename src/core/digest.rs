//! 文件内容摘要 - 用于判断文件内容是否变化

use crate::error::{IoResultExt, Result};
use std::fmt;
use std::path::Path;

/// BLAKE3 摘要（完整 256 位）
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Digest(blake3::Hash);

impl Digest {
    /// 计算内存数据的摘要
    pub fn of_bytes(data: &[u8]) -> Self {
        Digest(blake3::hash(data))
    }

    /// 读取整个文件并计算摘要
    pub fn of_file(path: &Path) -> Result<Self> {
        let data = std::fs::read(path).at(path)?;
        Ok(Self::of_bytes(&data))
    }

    pub fn to_hex(&self) -> String {
        self.0.to_hex().to_string()
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", &self.to_hex()[..16])
    }
}
