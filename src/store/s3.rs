use async_trait::async_trait;
use opendal::{services::S3, Operator};

use crate::error::SyncError;
use crate::store::{ObjectMeta, ObjectStore, StoreKind};

/// S3 and S3-compatible object store using OpenDAL.
///
/// Entity tags on objects written with single-part uploads are the content
/// md5 in quoted hex, which is what the etag strategy relies on.
pub struct S3Store {
    operator: Operator,
    bucket: String,
    region: String,
}

impl S3Store {
    /// Create a store using the standard AWS credential chain
    ///
    /// Credentials resolve in the usual order: environment variables,
    /// shared credentials file, then instance/task roles. A custom endpoint
    /// points the store at an S3-compatible service.
    pub fn new(bucket: &str, region: &str, endpoint: Option<&str>) -> Result<Self, SyncError> {
        let mut builder = S3::default().bucket(bucket).region(region);

        if let Some(endpoint) = endpoint {
            builder = builder.endpoint(endpoint);
        }

        let operator = Operator::new(builder)
            .map_err(|e| SyncError::Configuration {
                message: format!("could not configure S3 store for bucket '{}': {}", bucket, e),
            })?
            .finish();

        Ok(Self {
            operator,
            bucket: bucket.to_string(),
            region: region.to_string(),
        })
    }

    /// Create a store with explicit credentials
    pub fn with_credentials(
        bucket: &str,
        region: &str,
        access_key: &str,
        secret_key: &str,
        endpoint: Option<&str>,
    ) -> Result<Self, SyncError> {
        let mut builder = S3::default()
            .bucket(bucket)
            .region(region)
            .access_key_id(access_key)
            .secret_access_key(secret_key);

        if let Some(endpoint) = endpoint {
            builder = builder.endpoint(endpoint);
        }

        let operator = Operator::new(builder)
            .map_err(|e| SyncError::Configuration {
                message: format!("could not configure S3 store for bucket '{}': {}", bucket, e),
            })?
            .finish();

        Ok(Self {
            operator,
            bucket: bucket.to_string(),
            region: region.to_string(),
        })
    }
}

#[async_trait]
impl ObjectStore for S3Store {
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
        StoreKind::S3 {
            bucket: self.bucket.clone(),
            region: self.region.clone(),
        }
    }
}
