//! Object stores the sync engine probes and uploads to.
//!
//! Each store exposes the same small capability set: a metadata probe for
//! cheap remote-hash derivation, whole-object reads for stores that carry
//! no usable digest metadata, and whole-object writes for the upload path.
//! "Nothing at this key" is `Ok(None)` on the read side, never an error;
//! transport and auth trouble is.

mod gcs;
mod local;
mod s3;

pub use gcs::GcsStore;
pub use local::MirrorStore;
pub use s3::S3Store;

use async_trait::async_trait;
use std::path::PathBuf;

use crate::error::SyncError;

/// Metadata from a stat probe against one key
#[derive(Debug, Clone)]
pub struct ObjectMeta {
    /// Entity tag exactly as the backend frames it, quote characters included
    pub etag: Option<String>,
    /// Base64-encoded content md5 recorded in object metadata, when present
    pub content_md5: Option<String>,
    /// Object size in bytes
    pub size: u64,
}

/// Store identity for selection and display
#[derive(Debug, Clone, PartialEq)]
pub enum StoreKind {
    S3 { bucket: String, region: String },
    Gcs { bucket: String },
    Mirror { root: PathBuf },
    Memory,
}

impl StoreKind {
    /// Short display name for the store
    pub fn short_name(&self) -> &'static str {
        match self {
            StoreKind::S3 { .. } => "S3",
            StoreKind::Gcs { .. } => "GCS",
            StoreKind::Mirror { .. } => "Mirror",
            StoreKind::Memory => "Memory",
        }
    }

    /// Human-readable target location
    pub fn display(&self) -> String {
        match self {
            StoreKind::S3 { bucket, .. } => format!("s3://{}", bucket),
            StoreKind::Gcs { bucket } => format!("gs://{}", bucket),
            StoreKind::Mirror { root } => root.display().to_string(),
            StoreKind::Memory => "memory".to_string(),
        }
    }
}

/// Unified store interface over cloud object storage and filesystem mirrors
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Probe metadata at a key; `Ok(None)` when no object exists there
    async fn metadata(&self, key: &str) -> Result<Option<ObjectMeta>, SyncError>;

    /// Read full object bytes; `Ok(None)` when no object exists there
    async fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>, SyncError>;

    /// Write full object bytes at a key, replacing any existing object
    async fn write_bytes(&self, key: &str, data: Vec<u8>) -> Result<(), SyncError>;

    /// Which backend this store talks to
    fn kind(&self) -> StoreKind;
}
