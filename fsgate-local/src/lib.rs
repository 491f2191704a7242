// SPDX-License-Identifier: AGPL-3.0-or-later
//! Local filesystem facade for fsgate
//!
//! [`FileSystem`] answers permission queries against the three configured
//! roots and runs the file operations a host runtime exposes to scripts.

mod disk;
mod local;
mod tree;

pub use disk::SpaceInfo;
pub use local::FileSystem;
