//! Copy-or-skip policies, one per remote technology.
//!
//! A strategy pairs local content digesting with a backend-specific way of
//! learning what the remote already holds, and exposes the lifecycle hooks
//! the engine fires around each file. Variants are selected by name at
//! startup; the caching decorator composes over any of them.

mod caching;
mod etag;
mod metadata;
mod mirror;

pub use caching::CachingStrategy;
pub use etag::EtagStrategy;
pub use metadata::MetadataStrategy;
pub use mirror::MirrorStrategy;

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

use crate::cache::LookupCache;
use crate::config::{CacheKind, StrategyKind};
use crate::digest::{self, ContentHash};
use crate::error::SyncError;
use crate::store::ObjectStore;

/// Outcome of comparing local content against remote state for one file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyDecision {
    Copy,
    Skip,
}

/// Per-file policy deciding whether an upload is needed.
///
/// `should_copy_file` is the decision procedure; the hooks bracket what the
/// engine then does with it. An absent remote object always decides `Copy`,
/// and equal hashes always decide `Skip`.
#[async_trait]
pub trait HashStrategy: Send + Sync {
    /// Whether local hashing digests the gzipped form of compressible files
    fn hashes_gzipped_content(&self) -> bool {
        false
    }

    /// Digest the local file exactly as its uploaded bytes would digest
    async fn get_local_file_hash(&self, local_path: &Path) -> Result<ContentHash, SyncError> {
        digest::hash_file_async(local_path, self.hashes_gzipped_content()).await
    }

    /// Fetch or derive the remote hash for a key.
    ///
    /// `Ok(None)` means no object exists there. Transport or auth trouble
    /// is an error, never silently treated as absent.
    async fn get_remote_file_hash(&self, remote_key: &str)
        -> Result<Option<ContentHash>, SyncError>;

    /// Decide whether the file needs uploading.
    ///
    /// The hash comparison is case-sensitive and byte-exact on the tokens;
    /// producers are responsible for canonical hex, nothing is normalized
    /// here.
    async fn should_copy_file(
        &self,
        local_path: &Path,
        remote_key: &str,
    ) -> Result<CopyDecision, SyncError> {
        let local_hash = self.get_local_file_hash(local_path).await?;

        let decision = match self.get_remote_file_hash(remote_key).await? {
            Some(remote_hash) if remote_hash == local_hash => CopyDecision::Skip,
            _ => CopyDecision::Copy,
        };

        Ok(decision)
    }

    /// Runs exactly once per successfully copied file, after the transfer.
    ///
    /// A failure here surfaces as a warning and never rolls back the copy.
    async fn post_copy_hook(&self, _local_path: &Path, _remote_key: &str) -> Result<(), SyncError> {
        Ok(())
    }

    /// Runs exactly once per skipped file. Purely observational; nothing
    /// may depend on it for correctness.
    async fn on_skip_hook(&self, _local_path: &Path, _remote_key: &str) {}
}

/// Build the configured strategy over a store, wrapping it with the cache
/// decorator unless caching is disabled.
pub fn build_strategy(
    kind: StrategyKind,
    cache_kind: &CacheKind,
    store: Arc<dyn ObjectStore>,
    gzip: bool,
) -> Result<Arc<dyn HashStrategy>, SyncError> {
    let base: Arc<dyn HashStrategy> = match kind {
        StrategyKind::Etag => Arc::new(EtagStrategy::new(store, gzip)),
        StrategyKind::Metadata => Arc::new(MetadataStrategy::new(store, gzip)),
        StrategyKind::Mirror => Arc::new(MirrorStrategy::new(store, gzip)),
    };

    let cache: Option<Arc<dyn LookupCache>> = match cache_kind {
        CacheKind::None => None,
        CacheKind::Memory => Some(Arc::new(crate::cache::MemoryCache::new())),
        CacheKind::File { path } => {
            // An unusable cache at selection time is a configuration
            // problem, not a per-entry warning
            let cache = crate::cache::FileCache::open(path).map_err(|e| {
                SyncError::Configuration {
                    message: format!("lookup cache unavailable: {}", e),
                }
            })?;
            Some(Arc::new(cache))
        }
    };

    Ok(match cache {
        Some(cache) => Arc::new(CachingStrategy::new(base, cache)),
        None => base,
    })
}
