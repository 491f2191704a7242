// SPDX-License-Identifier: AGPL-3.0-or-later
//! Volume space queries

use fsgate_core::{FsError, FsResult};
use std::path::Path;

/// Space information for the volume holding a path
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpaceInfo {
    pub total: u64,
    pub available: u64,
}

#[cfg(unix)]
pub(crate) fn space_info(path: &Path) -> FsResult<SpaceInfo> {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let c_path = CString::new(path.as_os_str().as_bytes())
        .map_err(|_| FsError::InvalidUri(path.display().to_string()))?;

    // SAFETY: statvfs only writes into the zeroed struct we own, and c_path
    // is a valid NUL-terminated string for the duration of the call.
    let mut stat: libc::statvfs = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::statvfs(c_path.as_ptr(), &mut stat) };
    if rc != 0 {
        return Err(FsError::io(path, std::io::Error::last_os_error()));
    }

    let block = stat.f_frsize as u64;
    Ok(SpaceInfo {
        total: (stat.f_blocks as u64).saturating_mul(block),
        available: (stat.f_bavail as u64).saturating_mul(block),
    })
}

#[cfg(not(unix))]
pub(crate) fn space_info(_path: &Path) -> FsResult<SpaceInfo> {
    Err(FsError::Unsupported("disk space query on this platform".into()))
}
