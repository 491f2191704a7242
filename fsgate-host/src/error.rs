// SPDX-License-Identifier: AGPL-3.0-or-later
//! Host-boundary error types

use crate::registry::ApiVersion;
use fsgate_core::FsError;
use thiserror::Error;

/// Errors surfaced at the host boundary
#[derive(Debug, Error)]
pub enum HostError {
    #[error(transparent)]
    Fs(#[from] FsError),

    #[error("Module not registered: {name}@{version}")]
    UnknownModule { name: String, version: ApiVersion },

    #[error("Module {module} does not export {method}")]
    UnknownMethod { module: String, method: String },

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Runtime not initialized")]
    NotInitialized,

    #[error("FFI error: {0}")]
    Ffi(String),
}

/// Host result type
pub type HostResult<T> = Result<T, HostError>;

impl HostError {
    /// Stable code string passed to the reject continuation.
    pub fn code(&self) -> &'static str {
        match self {
            HostError::Fs(e) => e.code(),
            HostError::UnknownModule { .. } => "E_UNKNOWN_MODULE",
            HostError::UnknownMethod { .. } => "E_UNKNOWN_METHOD",
            HostError::InvalidArguments(_) => "E_INVALID_ARGUMENTS",
            HostError::NotInitialized => "E_NOT_INITIALIZED",
            HostError::Ffi(_) => "E_FFI",
        }
    }

    pub fn os_code(&self) -> Option<i32> {
        match self {
            HostError::Fs(e) => e.os_code(),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for HostError {
    fn from(err: serde_json::Error) -> Self {
        HostError::InvalidArguments(err.to_string())
    }
}

/// Status codes returned by the C ABI
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiStatus {
    Success = 0,
    NotFound = -1,
    PermissionDenied = -2,
    InvalidArgument = -3,
    Io = -4,
    NotInitialized = -5,
    UnknownModule = -6,
    AlreadyExists = -7,
    NotADirectory = -8,
    IsADirectory = -9,
    Encoding = -10,
    Unsupported = -11,
    Unknown = -99,
}

impl From<&HostError> for FfiStatus {
    fn from(err: &HostError) -> Self {
        match err {
            HostError::Fs(FsError::PermissionDenied { .. }) => FfiStatus::PermissionDenied,
            HostError::Fs(e) if e.is_not_found() => FfiStatus::NotFound,
            HostError::Fs(FsError::Io { .. } | FsError::RawIo(_)) => FfiStatus::Io,
            HostError::Fs(FsError::InvalidUri(_)) | HostError::InvalidArguments(_) => {
                FfiStatus::InvalidArgument
            }
            HostError::Fs(FsError::AlreadyExists(_)) => FfiStatus::AlreadyExists,
            HostError::Fs(FsError::NotADirectory(_)) => FfiStatus::NotADirectory,
            HostError::Fs(FsError::IsADirectory(_)) => FfiStatus::IsADirectory,
            HostError::Fs(FsError::Encoding(_)) => FfiStatus::Encoding,
            HostError::Fs(FsError::Unsupported(_)) => FfiStatus::Unsupported,
            HostError::NotInitialized => FfiStatus::NotInitialized,
            HostError::UnknownModule { .. } | HostError::UnknownMethod { .. } => {
                FfiStatus::UnknownModule
            }
            _ => FfiStatus::Unknown,
        }
    }
}
