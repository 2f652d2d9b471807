use async_trait::async_trait;
use std::path::PathBuf;

use crate::error::SyncError;
use crate::store::{ObjectMeta, ObjectStore, StoreKind};

/// Filesystem mirror playing the remote role.
///
/// Keys resolve to paths under a second local root. The mirror records no
/// digest metadata, so strategies that need a remote hash read the file
/// back and digest it.
pub struct MirrorStore {
    root: PathBuf,
}

impl MirrorStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn full_path(&self, key: &str) -> PathBuf {
        self.root.join(key.trim_start_matches('/'))
    }
}

#[async_trait]
impl ObjectStore for MirrorStore {
    async fn metadata(&self, key: &str) -> Result<Option<ObjectMeta>, SyncError> {
        let path = self.full_path(key);

        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_dir() => Ok(None),
            Ok(meta) => Ok(Some(ObjectMeta {
                etag: None,
                content_md5: None,
                size: meta.len(),
            })),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SyncError::RemoteLookup {
                key: key.to_string(),
                reason: format!("could not stat {}: {}", path.display(), e),
            }),
        }
    }

    async fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>, SyncError> {
        let path = self.full_path(key);

        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SyncError::RemoteLookup {
                key: key.to_string(),
                reason: format!("could not read {}: {}", path.display(), e),
            }),
        }
    }

    async fn write_bytes(&self, key: &str, data: Vec<u8>) -> Result<(), SyncError> {
        let path = self.full_path(key);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| SyncError::Transfer {
                    key: key.to_string(),
                    reason: format!("could not create {}: {}", parent.display(), e),
                })?;
        }

        tokio::fs::write(&path, data)
            .await
            .map_err(|e| SyncError::Transfer {
                key: key.to_string(),
                reason: format!("could not write {}: {}", path.display(), e),
            })?;

        Ok(())
    }

    fn kind(&self) -> StoreKind {
        StoreKind::Mirror {
            root: self.root.clone(),
        }
    }
}
