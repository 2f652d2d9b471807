use async_trait::async_trait;
use std::sync::Arc;

use crate::digest::ContentHash;
use crate::error::SyncError;
use crate::store::ObjectStore;
use crate::strategy::HashStrategy;

/// Derives the remote hash from the entity tag a metadata probe returns.
///
/// Objects written with single-part uploads carry an entity tag equal to
/// their content md5, framed in double quotes on the wire. Stripping the
/// framing leaves the hex token local digesting produces. Multi-part
/// uploads tag objects with a composite value (`<hex>-<parts>`) that never
/// matches a whole-file digest, so such objects simply re-upload.
pub struct EtagStrategy {
    store: Arc<dyn ObjectStore>,
    gzip: bool,
}

impl EtagStrategy {
    pub fn new(store: Arc<dyn ObjectStore>, gzip: bool) -> Self {
        Self { store, gzip }
    }

    fn clean_etag(etag: &str) -> ContentHash {
        ContentHash::from_hex(etag.trim_matches('"'))
    }
}

#[async_trait]
impl HashStrategy for EtagStrategy {
    fn hashes_gzipped_content(&self) -> bool {
        self.gzip
    }

    async fn get_remote_file_hash(
        &self,
        remote_key: &str,
    ) -> Result<Option<ContentHash>, SyncError> {
        let meta = self.store.metadata(remote_key).await?;

        let hash = meta.and_then(|m| {
            tracing::debug!(key = remote_key, size = m.size, "probed remote object");
            m.etag.map(|etag| Self::clean_etag(&etag))
        });

        Ok(hash)
    }
}
