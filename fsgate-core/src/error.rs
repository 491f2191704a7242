// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for fsgate

use crate::permissions::PermissionFlags;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias
pub type FsResult<T> = Result<T, FsError>;

/// Main error type
#[derive(Error, Debug)]
pub enum FsError {
    #[error("Path not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Permission denied: {} requires {required:?}", .path.display())]
    PermissionDenied {
        path: PathBuf,
        required: PermissionFlags,
    },

    #[error("Not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("Is a directory: {}", .0.display())]
    IsADirectory(PathBuf),

    #[error("Already exists: {}", .0.display())]
    AlreadyExists(PathBuf),

    #[error("Invalid URI: {0}")]
    InvalidUri(String),

    #[error("Unsupported: {0}")]
    Unsupported(String),

    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    RawIo(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl FsError {
    /// Wrap an OS error with the path it happened on.
    ///
    /// `NotFound` from the OS is surfaced as [`FsError::NotFound`] so callers
    /// can match on a single variant.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::NotFound => FsError::NotFound(path),
            _ => FsError::Io { path, source },
        }
    }

    /// Stable code reported to hosts alongside the message.
    pub fn code(&self) -> &'static str {
        match self {
            FsError::NotFound(_) => "E_NOT_FOUND",
            FsError::PermissionDenied { .. } => "E_PERMISSION_DENIED",
            FsError::NotADirectory(_) => "E_NOT_A_DIRECTORY",
            FsError::IsADirectory(_) => "E_IS_A_DIRECTORY",
            FsError::AlreadyExists(_) => "E_ALREADY_EXISTS",
            FsError::InvalidUri(_) => "E_INVALID_URI",
            FsError::Unsupported(_) => "E_UNSUPPORTED",
            FsError::Encoding(_) => "E_ENCODING",
            FsError::Io { .. } | FsError::RawIo(_) => "E_IO",
            FsError::Config(_) => "E_CONFIG",
            FsError::Other(_) => "E_UNKNOWN",
        }
    }

    /// OS error number, when the failure came from the OS.
    pub fn os_code(&self) -> Option<i32> {
        match self {
            FsError::Io { source, .. } | FsError::RawIo(source) => source.raw_os_error(),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        match self {
            FsError::NotFound(_) => true,
            FsError::RawIo(e) => e.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}
