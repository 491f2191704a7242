// SPDX-License-Identifier: AGPL-3.0-or-later
//! Blocking tree walks, run on tokio's blocking pool

use fsgate_core::{digest, FsError, FsResult};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Run `f` on the blocking pool and flatten the join error.
pub(crate) async fn blocking<T, F>(f: F) -> FsResult<T>
where
    F: FnOnce() -> FsResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| FsError::Other(format!("blocking task failed: {e}")))?
}

/// True when the OS error means "nothing there".
///
/// A path whose parent is a regular file reports ENOTDIR rather than ENOENT.
pub(crate) fn is_absent(err: &std::io::Error) -> bool {
    if err.kind() == std::io::ErrorKind::NotFound {
        return true;
    }
    #[cfg(unix)]
    {
        if err.raw_os_error() == Some(libc::ENOTDIR) {
            return true;
        }
    }
    false
}

fn walk_error(root: &Path, err: walkdir::Error) -> FsError {
    let path = err
        .path()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| root.to_path_buf());
    FsError::io(path, err.into())
}

/// Copy a directory tree. Symlinks are recreated, not followed.
pub(crate) fn copy_tree(src: &Path, dst: &Path) -> FsResult<u64> {
    let mut copied = 0u64;
    for entry in WalkDir::new(src).follow_links(false) {
        let entry = entry.map_err(|e| walk_error(src, e))?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(|_| FsError::Other(format!("{} escaped copy root", entry.path().display())))?;
        let target = dst.join(relative);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            std::fs::create_dir_all(&target).map_err(|e| FsError::io(&target, e))?;
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &target)?;
        } else {
            copied += std::fs::copy(entry.path(), &target).map_err(|e| FsError::io(&target, e))?;
        }
    }
    Ok(copied)
}

#[cfg(unix)]
fn copy_symlink(src: &Path, dst: &Path) -> FsResult<()> {
    let link = std::fs::read_link(src).map_err(|e| FsError::io(src, e))?;
    std::os::unix::fs::symlink(&link, dst).map_err(|e| FsError::io(dst, e))
}

#[cfg(not(unix))]
fn copy_symlink(src: &Path, dst: &Path) -> FsResult<()> {
    std::fs::copy(src, dst)
        .map(|_| ())
        .map_err(|e| FsError::io(dst, e))
}

/// Sum of regular file sizes under `root`. Unreadable entries are skipped.
pub(crate) fn dir_size(root: &Path) -> u64 {
    WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.metadata().ok())
        .map(|m| m.len())
        .sum()
}

/// Remove whatever is at `path`, file or tree.
pub(crate) fn remove_any(path: &Path) -> FsResult<()> {
    let meta = std::fs::symlink_metadata(path).map_err(|e| FsError::io(path, e))?;
    let result = if meta.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    };
    result.map_err(|e| FsError::io(path, e))
}

pub(crate) fn file_md5(path: PathBuf) -> FsResult<String> {
    let file = std::fs::File::open(&path).map_err(|e| FsError::io(&path, e))?;
    digest::md5_reader(std::io::BufReader::new(file)).map_err(|e| FsError::io(&path, e))
}
