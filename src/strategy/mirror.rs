use async_trait::async_trait;
use std::sync::Arc;

use crate::digest::{self, ContentHash};
use crate::error::SyncError;
use crate::store::ObjectStore;
use crate::strategy::HashStrategy;

/// Digests the mirrored object's bytes directly.
///
/// Filesystem mirrors record no digest metadata, so the remote hash is
/// another digest-of-bytes computation over whatever sits at the key.
/// Reading the object back costs more than a metadata probe, which is why
/// this variant gains the most from the caching decorator.
pub struct MirrorStrategy {
    store: Arc<dyn ObjectStore>,
    gzip: bool,
}

impl MirrorStrategy {
    pub fn new(store: Arc<dyn ObjectStore>, gzip: bool) -> Self {
        Self { store, gzip }
    }
}

#[async_trait]
impl HashStrategy for MirrorStrategy {
    fn hashes_gzipped_content(&self) -> bool {
        self.gzip
    }

    async fn get_remote_file_hash(
        &self,
        remote_key: &str,
    ) -> Result<Option<ContentHash>, SyncError> {
        match self.store.read_bytes(remote_key).await? {
            Some(data) => Ok(Some(digest::digest_bytes(&data))),
            None => Ok(None),
        }
    }
}
