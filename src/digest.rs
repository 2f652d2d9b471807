//! Content digesting for sync decisions.
//!
//! Hashes are md5 over file bytes, rendered as 32 lowercase hex characters
//! so they line up with what object stores report for whole-file uploads.
//! The digest depends only on content bytes, never on file metadata.

use md5::{Digest, Md5};
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::SyncError;
use crate::gzip;

/// A content digest as 32 lowercase hex characters.
///
/// Equality is byte-exact on the token. Producers hand over canonical
/// lowercase hex; nothing normalizes case or framing at comparison time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentHash(String);

impl ContentHash {
    /// Wrap an already-rendered hex token
    pub fn from_hex(hex: impl Into<String>) -> Self {
        ContentHash(hex.into())
    }

    /// Render raw digest bytes as lowercase hex
    pub fn from_digest(bytes: &[u8]) -> Self {
        ContentHash(bytes_to_hex(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Digest a byte slice
pub fn digest_bytes(data: &[u8]) -> ContentHash {
    let mut hasher = Md5::new();
    hasher.update(data);
    ContentHash::from_digest(hasher.finalize().as_slice())
}

/// Digest a file with a buffered read, without loading it whole
pub fn hash_file(path: &Path) -> Result<ContentHash, SyncError> {
    let mut file = File::open(path)
        .map_err(|e| SyncError::local_read(e, "opening", path.to_path_buf()))?;

    let mut hasher = Md5::new();
    let mut buffer = [0u8; 65536]; // 64KB buffer

    loop {
        let bytes_read = file
            .read(&mut buffer)
            .map_err(|e| SyncError::local_read(e, "reading", path.to_path_buf()))?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(ContentHash::from_digest(hasher.finalize().as_slice()))
}

/// Digest a file the way it would land remotely when gzip is enabled.
///
/// Compressible files are gzipped with the deterministic settings from the
/// gzip module before digesting, since that is the content the remote
/// stores. Files outside the compressible set digest verbatim.
pub fn hash_file_gzipped(path: &Path) -> Result<ContentHash, SyncError> {
    if !gzip::is_compressible(path) {
        return hash_file(path);
    }

    let contents = std::fs::read(path)
        .map_err(|e| SyncError::local_read(e, "reading", path.to_path_buf()))?;
    let compressed = gzip::compress(&contents)
        .map_err(|e| SyncError::local_read(e, "gzipping", path.to_path_buf()))?;

    Ok(digest_bytes(&compressed))
}

/// Async wrapper moving the digest work onto the blocking pool
pub async fn hash_file_async(path: &Path, gzipped: bool) -> Result<ContentHash, SyncError> {
    let path = path.to_path_buf();
    let task_path = path.clone();
    let handle = tokio::task::spawn_blocking(move || {
        if gzipped {
            hash_file_gzipped(&task_path)
        } else {
            hash_file(&task_path)
        }
    });

    match handle.await {
        Ok(result) => result,
        Err(e) => Err(SyncError::local_read(
            std::io::Error::other(e),
            "hashing",
            path,
        )),
    }
}

fn bytes_to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
