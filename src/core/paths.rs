//! 路径工具：存在性判断、相对路径规范化、祖先目录判断

use crate::error::{Error, Result};
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

/// 找不到 path 时返回 true。只看路径本身（不跟随符号链接），断开的链接也算存在。
pub fn path_not_exists(path: &Path) -> Result<bool> {
    match std::fs::symlink_metadata(path) {
        Ok(_) => Ok(false),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(true),
        Err(e) => Err(Error::io(path, e)),
    }
}

/// 找到 path 时返回 true
pub fn path_exists(path: &Path) -> Result<bool> {
    path_not_exists(path).map(|missing| !missing)
}

/// 确保文件/文件夹真实存在，否则返回 PathNotFound
pub fn find_file(path: &Path) -> Result<()> {
    if path_not_exists(path)? {
        return Err(Error::PathNotFound(path.to_path_buf()));
    }
    Ok(())
}

/// 相对路径的显示形式，统一使用 `/` 分隔。
/// 非 UTF-8 的名字会被替换字符代替，只能用于显示和排除规则匹配，不能再拼回路径。
pub fn normalize_rel(rel: &Path) -> String {
    let parts: Vec<_> = rel
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy()),
            _ => None,
        })
        .collect();
    parts.join("/")
}

/// 依次返回 rel 的所有真祖先（由近到远），例如 `a/b/c` -> `a/b`, `a`
pub fn ancestors(rel: &Path) -> impl Iterator<Item = &Path> {
    rel.ancestors()
        .skip(1)
        .filter(|a| !a.as_os_str().is_empty())
}

/// 只看路径本身：是普通文件或文件夹时返回 true，符号链接和特殊文件返回 false
pub fn is_file_or_dir(path: &Path) -> Result<bool> {
    match std::fs::symlink_metadata(path) {
        Ok(meta) => Ok(meta.is_file() || meta.is_dir()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(Error::io(path, e)),
    }
}

/// 两个路径（已规范化）是否相同或其中一个包含另一个
pub fn overlaps(a: &Path, b: &Path) -> bool {
    a.starts_with(b) || b.starts_with(a)
}

/// 尽量取得绝对规范路径，失败时退回原路径
pub fn canonical(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
