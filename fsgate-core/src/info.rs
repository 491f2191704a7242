// SPDX-License-Identifier: AGPL-3.0-or-later
//! File info results

use crate::uri::FileUri;
use serde::{Deserialize, Serialize};

/// Result of a `get_info` query
///
/// Absence is a normal result: `exists` is false and the optional fields
/// are omitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    pub exists: bool,
    pub is_directory: bool,
    pub uri: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// Seconds since the Unix epoch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modification_time: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub md5: Option<String>,
}

impl FileInfo {
    pub fn missing(uri: &FileUri) -> Self {
        Self {
            exists: false,
            is_directory: false,
            uri: uri.to_uri(),
            size: None,
            modification_time: None,
            md5: None,
        }
    }

    pub fn file(uri: &FileUri, size: u64) -> Self {
        Self {
            exists: true,
            is_directory: false,
            uri: uri.to_uri(),
            size: Some(size),
            modification_time: None,
            md5: None,
        }
    }

    pub fn directory(uri: &FileUri, size: u64) -> Self {
        Self {
            is_directory: true,
            ..Self::file(uri, size)
        }
    }

    pub fn with_modification_time(mut self, secs: f64) -> Self {
        self.modification_time = Some(secs);
        self
    }

    pub fn with_md5(mut self, md5: String) -> Self {
        self.md5 = Some(md5);
        self
    }
}
