// SPDX-License-Identifier: AGPL-3.0-or-later
//! Root directories and permission zones
//!
//! The host hands the facade three roots. Every path either falls under one
//! of them or is external. Classification is purely lexical: nothing here
//! touches the disk, follows symlinks or folds case.

use crate::error::{FsError, FsResult};
use crate::permissions::PermissionFlags;
use crate::uri::normalize;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Which root a path falls under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RootKind {
    Document,
    Caches,
    Bundle,
}

impl RootKind {
    /// Permissions granted to everything under this root.
    pub fn permissions(self) -> PermissionFlags {
        match self {
            RootKind::Document | RootKind::Caches => PermissionFlags::read_write(),
            RootKind::Bundle => PermissionFlags::READ,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RootKind::Document => "document",
            RootKind::Caches => "caches",
            RootKind::Bundle => "bundle",
        }
    }
}

/// The three host-provided roots
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootDirectories {
    document: PathBuf,
    caches: PathBuf,
    bundle: PathBuf,
}

impl RootDirectories {
    /// Build from three absolute paths.
    pub fn new(
        document: impl AsRef<Path>,
        caches: impl AsRef<Path>,
        bundle: impl AsRef<Path>,
    ) -> FsResult<Self> {
        Ok(Self {
            document: absolute_root("document", document.as_ref())?,
            caches: absolute_root("caches", caches.as_ref())?,
            bundle: absolute_root("bundle", bundle.as_ref())?,
        })
    }

    pub fn document(&self) -> &Path {
        &self.document
    }

    pub fn caches(&self) -> &Path {
        &self.caches
    }

    pub fn bundle(&self) -> &Path {
        &self.bundle
    }

    pub fn get(&self, kind: RootKind) -> &Path {
        match kind {
            RootKind::Document => &self.document,
            RootKind::Caches => &self.caches,
            RootKind::Bundle => &self.bundle,
        }
    }

    /// Find the root containing `path`.
    ///
    /// When roots nest (a caches dir inside the bundle, say) the deepest
    /// root wins.
    pub fn classify(&self, path: &Path) -> Option<RootKind> {
        let path = normalize(path);
        [RootKind::Document, RootKind::Caches, RootKind::Bundle]
            .into_iter()
            .filter(|kind| path.starts_with(self.get(*kind)))
            .max_by_key(|kind| self.get(*kind).components().count())
    }

    /// Permissions implied by root membership alone.
    pub fn permissions_for_path(&self, path: &Path) -> PermissionFlags {
        self.classify(path)
            .map(RootKind::permissions)
            .unwrap_or_else(PermissionFlags::empty)
    }
}

fn absolute_root(name: &str, path: &Path) -> FsResult<PathBuf> {
    if !path.is_absolute() {
        return Err(FsError::Config(format!(
            "{name} directory must be absolute: {}",
            path.display()
        )));
    }
    Ok(normalize(path))
}
