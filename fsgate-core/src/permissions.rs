// SPDX-License-Identifier: AGPL-3.0-or-later
//! Permission flags

use bitflags::bitflags;

bitflags! {
    /// Access a caller has to a path.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct PermissionFlags: u8 {
        const READ = 1 << 0;
        const WRITE = 1 << 1;
    }
}

impl PermissionFlags {
    pub fn read_write() -> Self {
        Self::READ | Self::WRITE
    }

    pub fn can_read(&self) -> bool {
        self.contains(Self::READ)
    }

    pub fn can_write(&self) -> bool {
        self.contains(Self::WRITE)
    }

    /// Render as `rw`, `r-`, `-w` or `--`.
    pub fn to_mode_string(&self) -> String {
        let r = if self.can_read() { 'r' } else { '-' };
        let w = if self.can_write() { 'w' } else { '-' };
        format!("{r}{w}")
    }
}
