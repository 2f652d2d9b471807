use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

use crate::cache::LookupCache;
use crate::digest::ContentHash;
use crate::error::SyncError;
use crate::strategy::HashStrategy;

/// Wraps any strategy with a lookup cache consulted before the backend.
///
/// A cache hit answers the remote-hash question without touching the
/// wrapped strategy at all. A miss delegates and leaves the cache alone;
/// the only writer is `post_copy_hook`, which records the hash of content
/// that verifiably just landed on the remote. That write-after-upload rule
/// is what makes a later cache hit trustworthy: the cache can only ever
/// confirm a state some earlier copy established.
pub struct CachingStrategy {
    inner: Arc<dyn HashStrategy>,
    cache: Arc<dyn LookupCache>,
}

impl CachingStrategy {
    pub fn new(inner: Arc<dyn HashStrategy>, cache: Arc<dyn LookupCache>) -> Self {
        Self { inner, cache }
    }
}

#[async_trait]
impl HashStrategy for CachingStrategy {
    fn hashes_gzipped_content(&self) -> bool {
        self.inner.hashes_gzipped_content()
    }

    async fn get_local_file_hash(&self, local_path: &Path) -> Result<ContentHash, SyncError> {
        self.inner.get_local_file_hash(local_path).await
    }

    async fn get_remote_file_hash(
        &self,
        remote_key: &str,
    ) -> Result<Option<ContentHash>, SyncError> {
        match self.cache.get(remote_key) {
            Ok(Some(hash)) => {
                tracing::debug!(key = remote_key, "remote hash served from cache");
                return Ok(Some(hash));
            }
            Ok(None) => {}
            Err(e) => {
                // A broken cache degrades to a plain lookup, never fails
                // the entry
                tracing::warn!(key = remote_key, error = %e, "cache read failed");
            }
        }

        self.inner.get_remote_file_hash(remote_key).await
    }

    async fn post_copy_hook(&self, local_path: &Path, remote_key: &str) -> Result<(), SyncError> {
        // Record the just-uploaded hash before chaining, so the wrapped
        // hook observes the cache the next lookup will see
        let cache_outcome = match self.inner.get_local_file_hash(local_path).await {
            Ok(hash) => self.cache.set(remote_key, &hash),
            Err(e) => Err(SyncError::Cache {
                message: format!("could not digest {} for caching: {}", local_path.display(), e),
            }),
        };

        self.inner.post_copy_hook(local_path, remote_key).await?;

        cache_outcome
    }

    async fn on_skip_hook(&self, local_path: &Path, remote_key: &str) {
        self.inner.on_skip_hook(local_path, remote_key).await;
    }
}
