//! Lookup cache mapping remote keys to last-uploaded content hashes.
//!
//! The cache memoizes remote-hash lookups across runs so unchanged files
//! skip the network round trip entirely. Entries are written only after a
//! real upload, never on a plain lookup, which keeps every cached value
//! causally tied to bytes that actually landed on the remote. Entries have
//! no expiry; overwriting is the only invalidation.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

use crate::digest::ContentHash;
use crate::error::SyncError;

/// Key-to-hash store shared by all workers of a run.
///
/// Implementations synchronize internally; once `set` returns, a `get` for
/// the same key from any worker observes the new value.
pub trait LookupCache: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<ContentHash>, SyncError>;
    fn set(&self, key: &str, hash: &ContentHash) -> Result<(), SyncError>;
}

/// Process-local cache for a single run
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, ContentHash>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LookupCache for MemoryCache {
    fn get(&self, key: &str) -> Result<Option<ContentHash>, SyncError> {
        let entries = self.entries.read().map_err(|_| SyncError::Cache {
            message: "cache lock poisoned".to_string(),
        })?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, hash: &ContentHash) -> Result<(), SyncError> {
        let mut entries = self.entries.write().map_err(|_| SyncError::Cache {
            message: "cache lock poisoned".to_string(),
        })?;
        entries.insert(key.to_string(), hash.clone());
        Ok(())
    }
}

/// Cache persisted as plain text, one `<hash>  <key>` line per entry
/// (two spaces between fields). The whole file is loaded at open and new
/// entries are appended on `set`, so a key written twice resolves to the
/// later line on the next load.
pub struct FileCache {
    path: PathBuf,
    inner: Mutex<FileCacheInner>,
}

struct FileCacheInner {
    entries: HashMap<String, ContentHash>,
    writer: File,
}

impl FileCache {
    /// Open or create the cache file and load every existing entry
    pub fn open(path: &Path) -> Result<Self, SyncError> {
        let mut entries = HashMap::new();

        if path.exists() {
            let file = File::open(path).map_err(|e| SyncError::Cache {
                message: format!("could not open cache file {}: {}", path.display(), e),
            })?;

            for (line_num, line_result) in BufReader::new(file).lines().enumerate() {
                let line = line_result.map_err(|e| SyncError::Cache {
                    message: format!("could not read cache file {}: {}", path.display(), e),
                })?;

                if line.trim().is_empty() {
                    continue;
                }

                match Self::parse_line(&line) {
                    Some((key, hash)) => {
                        entries.insert(key, hash);
                    }
                    None => {
                        tracing::warn!(
                            line = line_num + 1,
                            file = %path.display(),
                            "skipping malformed cache line"
                        );
                    }
                }
            }
        }

        let writer = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| SyncError::Cache {
                message: format!("could not open cache file {} for append: {}", path.display(), e),
            })?;

        Ok(Self {
            path: path.to_path_buf(),
            inner: Mutex::new(FileCacheInner { entries, writer }),
        })
    }

    /// Parse one `<hash>  <key>` line. Keys may themselves contain double
    /// spaces, so only the first delimiter splits.
    fn parse_line(line: &str) -> Option<(String, ContentHash)> {
        let (hash, key) = line.split_once("  ")?;
        let hash = hash.trim();
        let key = key.trim();

        if hash.is_empty() || key.is_empty() {
            return None;
        }

        Some((key.to_string(), ContentHash::from_hex(hash)))
    }
}

impl LookupCache for FileCache {
    fn get(&self, key: &str) -> Result<Option<ContentHash>, SyncError> {
        let inner = self.inner.lock().map_err(|_| SyncError::Cache {
            message: "cache lock poisoned".to_string(),
        })?;
        Ok(inner.entries.get(key).cloned())
    }

    fn set(&self, key: &str, hash: &ContentHash) -> Result<(), SyncError> {
        let mut inner = self.inner.lock().map_err(|_| SyncError::Cache {
            message: "cache lock poisoned".to_string(),
        })?;

        writeln!(inner.writer, "{}  {}", hash.as_str(), key).map_err(|e| SyncError::Cache {
            message: format!("could not append to cache file {}: {}", self.path.display(), e),
        })?;
        inner.writer.flush().map_err(|e| SyncError::Cache {
            message: format!("could not flush cache file {}: {}", self.path.display(), e),
        })?;

        inner.entries.insert(key.to_string(), hash.clone());
        Ok(())
    }
}
