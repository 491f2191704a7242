// SPDX-License-Identifier: AGPL-3.0-or-later
//! fsgate Core
//!
//! Types and pure logic for the root-scoped filesystem facade: root
//! directories, permission classification, URI handling, operation options,
//! file info and content digests.

pub mod config;
pub mod digest;
pub mod error;
pub mod info;
pub mod options;
pub mod permissions;
pub mod roots;
pub mod uri;

pub use config::{ExternalAccess, FacadeConfig};
pub use digest::{md5_hex, Md5Digest};
pub use error::{FsError, FsResult};
pub use info::FileInfo;
pub use permissions::PermissionFlags;
pub use roots::{RootDirectories, RootKind};
pub use uri::FileUri;
