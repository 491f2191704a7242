// SPDX-License-Identifier: AGPL-3.0-or-later
//! Content digests
//!
//! MD5 is used as a content fingerprint for caching, not for security.

use std::io::Read;

const CHUNK_SIZE: usize = 64 * 1024;

/// MD5 of `data` as 32 lowercase hex characters.
pub fn md5_hex(data: &[u8]) -> String {
    format!("{:x}", md5::compute(data))
}

/// MD5 of everything `reader` yields, read in fixed-size chunks.
pub fn md5_reader<R: Read>(mut reader: R) -> std::io::Result<String> {
    let mut context = md5::Context::new();
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        context.consume(&buf[..n]);
    }
    Ok(format!("{:x}", context.compute()))
}

/// MD5 helper on raw binary data
pub trait Md5Digest {
    fn md5_string(&self) -> String;
}

impl Md5Digest for [u8] {
    fn md5_string(&self) -> String {
        md5_hex(self)
    }
}

impl Md5Digest for Vec<u8> {
    fn md5_string(&self) -> String {
        md5_hex(self)
    }
}
