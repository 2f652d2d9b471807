use async_trait::async_trait;
use opendal::{services::Gcs, Operator};

use crate::error::SyncError;
use crate::store::{ObjectMeta, ObjectStore, StoreKind};

/// Google Cloud Storage store using OpenDAL.
///
/// GCS records an md5 for every non-composite object in its metadata,
/// base64-encoded; the metadata strategy decodes it for comparison.
pub struct GcsStore {
    operator: Operator,
    bucket: String,
}

impl GcsStore {
    /// Create a store using the Google credential chain
    ///
    /// Resolution order: GOOGLE_APPLICATION_CREDENTIALS, well-known
    /// gcloud credentials file, metadata server / workload identity.
    /// An explicit service-account JSON string overrides the chain.
    pub fn new(bucket: &str, credential: Option<&str>) -> Result<Self, SyncError> {
        let mut builder = Gcs::default().bucket(bucket);

        if let Some(cred) = credential {
            builder = builder.credential(cred);
        }

        let operator = Operator::new(builder)
            .map_err(|e| SyncError::Configuration {
                message: format!("could not configure GCS store for bucket '{}': {}", bucket, e),
            })?
            .finish();

        Ok(Self {
            operator,
            bucket: bucket.to_string(),
        })
    }

    /// Create a store from a service-account JSON file on disk
    pub fn from_service_account(bucket: &str, service_account_path: &str) -> Result<Self, SyncError> {
        let credential = std::fs::read_to_string(service_account_path).map_err(|e| {
            SyncError::Configuration {
                message: format!(
                    "could not read service account file {}: {}",
                    service_account_path, e
                ),
            }
        })?;

        Self::new(bucket, Some(&credential))
    }
}

#[async_trait]
impl ObjectStore for GcsStore {
    async fn metadata(&self, key: &str) -> Result<Option<ObjectMeta>, SyncError> {
        let key = key.trim_start_matches('/');

        match self.operator.stat(key).await {
            Ok(meta) => Ok(Some(ObjectMeta {
                etag: meta.etag().map(|s| s.to_string()),
                content_md5: meta.content_md5().map(|s| s.to_string()),
                size: meta.content_length(),
            })),
            Err(e) if e.kind() == opendal::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SyncError::RemoteLookup {
                key: key.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    async fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>, SyncError> {
        let key = key.trim_start_matches('/');

        match self.operator.read(key).await {
            Ok(buffer) => Ok(Some(buffer.to_vec())),
            Err(e) if e.kind() == opendal::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SyncError::RemoteLookup {
                key: key.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    async fn write_bytes(&self, key: &str, data: Vec<u8>) -> Result<(), SyncError> {
        let key = key.trim_start_matches('/');

        self.operator
            .write(key, data)
            .await
            .map_err(|e| SyncError::Transfer {
                key: key.to_string(),
                reason: e.to_string(),
            })?;

        Ok(())
    }

    fn kind(&self) -> StoreKind {
        StoreKind::Gcs {
            bucket: self.bucket.clone(),
        }
    }
}
