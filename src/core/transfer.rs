//! 本地文件传输：复制（保留修改时间）、创建文件夹、删除

use crate::error::{Error, IoResultExt, Result};
use filetime::FileTime;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// 复制 src 到 dest，并把 dest 的修改时间设置为 src 的修改时间。
///
/// 先写入同目录下的临时文件，设置好时间后再原子重命名；失败时临时文件会被清理。
/// 返回复制的字节数。
pub fn copy_file_with_mtime(src: &Path, dest: &Path) -> Result<u64> {
    let meta = fs::metadata(src).at(src)?;
    let mtime = FileTime::from_last_modification_time(&meta);

    let temp = temp_path_for(dest);
    let guard = scopeguard::guard(temp, |temp| {
        let _ = fs::remove_file(&temp);
    });

    let bytes = fs::copy(src, &*guard).map_err(|e| Error::io(src, e))?;
    filetime::set_file_mtime(&*guard, mtime).at(&*guard)?;
    fs::rename(&*guard, dest).at(dest)?;

    // 重命名成功，临时文件已不存在
    scopeguard::ScopeGuard::into_inner(guard);
    debug!("复制: {} -> {} ({} 字节)", src.display(), dest.display(), bytes);
    Ok(bytes)
}

pub fn create_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).at(path)?;
    debug!("创建文件夹: {}", path.display());
    Ok(())
}

/// 删除文件或文件夹（文件夹递归删除）。不跟随符号链接。
pub fn remove_entry(path: &Path) -> Result<()> {
    let meta = fs::symlink_metadata(path).at(path)?;
    if meta.is_dir() {
        fs::remove_dir_all(path).at(path)?;
    } else {
        fs::remove_file(path).at(path)?;
    }
    debug!("删除: {}", path.display());
    Ok(())
}

/// 与 dest 同目录的临时文件名：`.<name>.<uuid>.tmp`
fn temp_path_for(dest: &Path) -> PathBuf {
    let name = dest
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp_name = format!(".{}.{}.tmp", name, uuid::Uuid::new_v4().simple());
    dest.with_file_name(temp_name)
}
