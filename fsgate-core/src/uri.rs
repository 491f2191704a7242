// SPDX-License-Identifier: AGPL-3.0-or-later
//! Local file URIs
//!
//! Hosts hand the facade either `file://` URIs or absolute paths. Both are
//! reduced to a lexically normalised absolute [`PathBuf`] before anything
//! else looks at them.

use crate::error::{FsError, FsResult};
use std::fmt;
use std::path::{Component, Path, PathBuf};
use url::Url;

/// A parsed local file location
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileUri {
    path: PathBuf,
}

impl FileUri {
    /// Parse a `file://` URI or an absolute path.
    pub fn parse(input: &str) -> FsResult<Self> {
        if input.trim().is_empty() {
            return Err(FsError::InvalidUri("empty URI".into()));
        }

        if Path::new(input).is_absolute() {
            return Ok(Self::from_path(input));
        }

        let url = Url::parse(input).map_err(|e| FsError::InvalidUri(format!("{input}: {e}")))?;
        if url.scheme() != "file" {
            return Err(FsError::Unsupported(format!(
                "URI scheme '{}' is not a local file",
                url.scheme()
            )));
        }
        if url.host_str().is_some_and(|h| !h.is_empty() && h != "localhost") {
            return Err(FsError::InvalidUri(format!("{input}: remote host")));
        }

        let path = url
            .to_file_path()
            .map_err(|_| FsError::InvalidUri(input.to_string()))?;
        Ok(Self::from_path(path))
    }

    /// Build from a path that is already known to be absolute.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        Self {
            path: normalize(path.as_ref()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn into_path(self) -> PathBuf {
        self.path
    }

    pub fn join(&self, name: impl AsRef<Path>) -> Self {
        Self::from_path(self.path.join(name))
    }

    pub fn parent(&self) -> Option<Self> {
        self.path.parent().map(Self::from_path)
    }

    pub fn name(&self) -> Option<&str> {
        self.path.file_name().and_then(|n| n.to_str())
    }

    pub fn extension(&self) -> Option<&str> {
        self.path.extension().and_then(|e| e.to_str())
    }

    pub fn to_uri(&self) -> String {
        Url::from_file_path(&self.path)
            .map(|u| u.to_string())
            .unwrap_or_else(|_| format!("file://{}", self.path.display()))
    }
}

impl fmt::Display for FileUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_uri())
    }
}

impl AsRef<Path> for FileUri {
    fn as_ref(&self) -> &Path {
        &self.path
    }
}

/// Resolve `.` and `..` without touching the filesystem.
///
/// `..` never climbs above the root.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(p) => out.push(p.as_os_str()),
            Component::RootDir => out.push(Component::RootDir.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(part) => out.push(part),
        }
    }
    out
}
