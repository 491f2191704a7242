// SPDX-License-Identifier: AGPL-3.0-or-later
//! Fuzz target for URI parsing and lexical normalisation

#![no_main]

use fsgate_core::uri::normalize;
use fsgate_core::FileUri;
use libfuzzer_sys::fuzz_target;
use std::path::{Component, Path};

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(uri) = FileUri::parse(input) {
        let path = uri.path();
        assert!(path.is_absolute());
        assert!(!path
            .components()
            .any(|c| matches!(c, Component::CurDir | Component::ParentDir)));

        let _ = uri.to_uri();
        let _ = uri.name();
        let _ = uri.extension();
        let _ = uri.parent();
    }

    // Normalising twice changes nothing
    let once = normalize(Path::new(input));
    assert_eq!(normalize(&once), once);
});
