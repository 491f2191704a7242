// SPDX-License-Identifier: AGPL-3.0-or-later
//! Facade configuration
//!
//! ```toml
//! [roots]
//! document = "/var/app/Documents"
//! caches = "/var/app/Library/Caches"
//! bundle = "/opt/app/App.app"
//!
//! [permissions]
//! external_access = "deny"   # or "os"
//! ```

use crate::error::{FsError, FsResult};
use crate::roots::RootDirectories;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// How paths outside the three roots are treated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExternalAccess {
    /// No access outside the roots
    #[default]
    Deny,
    /// Ask the OS whether the path is readable or writable
    Os,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RootsConfig {
    pub document: Option<PathBuf>,
    pub caches: Option<PathBuf>,
    pub bundle: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PermissionsConfig {
    pub external_access: ExternalAccess,
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FacadeConfig {
    pub roots: RootsConfig,
    pub permissions: PermissionsConfig,
}

impl FacadeConfig {
    pub fn from_toml(text: &str) -> FsResult<Self> {
        toml::from_str(text).map_err(|e| FsError::Config(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> FsResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| FsError::io(path, e))?;
        Self::from_toml(&text)
    }

    /// Resolve the roots, filling unset ones from platform directories.
    pub fn root_directories(&self) -> FsResult<RootDirectories> {
        let r = &self.roots;
        if let (Some(document), Some(caches), Some(bundle)) = (&r.document, &r.caches, &r.bundle) {
            return RootDirectories::new(document, caches, bundle);
        }

        let defaults = DefaultRoots::detect()?;
        RootDirectories::new(
            self.roots.document.clone().unwrap_or(defaults.document),
            self.roots.caches.clone().unwrap_or(defaults.caches),
            self.roots.bundle.clone().unwrap_or(defaults.bundle),
        )
    }
}

struct DefaultRoots {
    document: PathBuf,
    caches: PathBuf,
    bundle: PathBuf,
}

impl DefaultRoots {
    fn detect() -> FsResult<Self> {
        let dirs = directories::ProjectDirs::from("com", "hyperpolymath", "fsgate")
            .ok_or_else(|| FsError::Config("no home directory to derive roots from".into()))?;

        let bundle = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| dirs.data_dir().join("bundle"));

        Ok(Self {
            document: dirs.data_dir().join("documents"),
            caches: dirs.cache_dir().to_path_buf(),
            bundle,
        })
    }
}
