//! The seam between the adapter and an object store.
//!
//! The adapter only needs three operations. Production code talks to S3
//! through [`S3ObjectClient`](crate::services::s3_client::S3ObjectClient);
//! [`DiskObjectStore`](crate::services::disk_store::DiskObjectStore) keeps
//! objects in a local directory.

use crate::{config::UploadParams, errors::ClientError, models::object::ObjectMetadata};
use async_trait::async_trait;
use tokio::fs::File;

/// Everything needed to store one object.
#[derive(Debug)]
pub struct PutObjectRequest {
    pub bucket: String,
    pub key: String,
    /// Open handle on the source bytes, read as a stream.
    pub body: File,
    pub content_type: String,
    pub content_length: u64,
    /// Extra store parameters; never contains adapter-managed names.
    pub params: UploadParams,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PutObjectOutput {
    pub etag: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteObjectOutput {
    /// HTTP status the store answered with.
    pub status: u16,
}

#[async_trait]
pub trait ObjectStoreClient: Send + Sync {
    async fn put_object(&self, request: PutObjectRequest) -> Result<PutObjectOutput, ClientError>;

    async fn delete_object(&self, bucket: &str, key: &str)
    -> Result<DeleteObjectOutput, ClientError>;

    /// Metadata of an object; [`ClientError::NotFound`] when it does not exist.
    async fn head_object(&self, bucket: &str, key: &str) -> Result<ObjectMetadata, ClientError>;
}
