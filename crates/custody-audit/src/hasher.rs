// hasher.rs — SHA-256 hashing utilities.
//
// All digests in Custody are SHA-256, hex-encoded: a 32-byte digest rendered
// as a 64-character lowercase hex string, which is what the manifest stores.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::AuditError;

const READ_CHUNK: usize = 64 * 1024;

/// Hash arbitrary bytes, returning a lowercase hex-encoded SHA-256 string.
///
/// This is deterministic: the same input always produces the same output.
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// Hash a UTF-8 string, returning a lowercase hex-encoded SHA-256 string.
pub fn hash_str(s: &str) -> String {
    hash_bytes(s.as_bytes())
}

/// Hash everything a reader yields until EOF.
pub fn hash_reader<R: Read>(mut reader: R) -> std::io::Result<String> {
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; READ_CHUNK];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// Hash the contents of a file on disk.
///
/// The file is streamed in fixed-size chunks, so evidence files larger than
/// memory are fine.
pub fn hash_file(path: &Path) -> Result<String, AuditError> {
    let wrap = |source| AuditError::HashFileFailed {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(wrap)?;
    hash_reader(BufReader::new(file)).map_err(wrap)
}
