//! Blake3 fingerprints for published artifacts

use std::io;
use std::path::Path;

/// Hash a file's contents with blake3.
pub fn hash_file(path: &Path) -> io::Result<blake3::Hash> {
    let mut hasher = blake3::Hasher::new();
    hasher.update_mmap(path)?;
    Ok(hasher.finalize())
}

/// Return the first 8 hex characters of a blake3 hash.
pub fn short_hash(hash: &blake3::Hash) -> String {
    hash.to_hex()[..8].to_string()
}

/// Short fingerprint of a file, or `None` if it does not exist.
pub fn file_fingerprint(path: &Path) -> io::Result<Option<String>> {
    match hash_file(path) {
        Ok(h) => Ok(Some(short_hash(&h))),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}
