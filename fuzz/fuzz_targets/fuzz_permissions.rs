// SPDX-License-Identifier: AGPL-3.0-or-later
//! Fuzz target for root classification

#![no_main]

use arbitrary::Arbitrary;
use fsgate_core::{PermissionFlags, RootDirectories};
use libfuzzer_sys::fuzz_target;
use std::path::Path;

#[derive(Debug, Arbitrary)]
struct Input {
    suffix: String,
}

fuzz_target!(|input: Input| {
    let Ok(roots) = RootDirectories::new("/app/Documents", "/app/Caches", "/app/App.app") else {
        return;
    };

    let path = Path::new("/app/Documents").join(&input.suffix);
    let flags = roots.permissions_for_path(&path);

    // Anything granted must come from a root that lexically contains the path
    if !flags.is_empty() {
        assert!(roots.classify(&path).is_some());
    }
    if flags.contains(PermissionFlags::WRITE) {
        assert!(flags.contains(PermissionFlags::READ));
    }
});
