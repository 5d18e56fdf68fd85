/// Object storage for uploaded profile pictures
///
/// This module provides:
/// - `ObjectStore`, the bucket/object operations of an S3-compatible store
/// - `S3ObjectStore`, the AWS SDK implementation (works against MinIO)
/// - `ObjectStoreClient`, which names objects, streams uploads and builds URLs

pub mod client;
pub mod s3_client;

pub use client::{object_name, ObjectStoreClient};
pub use s3_client::S3ObjectStore;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub type StorageResult<T> = Result<T, StorageError>;

/// Storage error types
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to check bucket {bucket}: {source}")]
    BucketCheck {
        bucket: String,
        #[source]
        source: BoxError,
    },

    #[error("Failed to create bucket {bucket}: {source}")]
    BucketCreate {
        bucket: String,
        #[source]
        source: BoxError,
    },

    #[error("Failed to upload {bucket}/{key}: {source}")]
    Upload {
        bucket: String,
        key: String,
        #[source]
        source: BoxError,
    },

    #[error("Failed to read upload stream: {0}")]
    Read(#[from] std::io::Error),
}

impl StorageError {
    pub fn upload(bucket: &str, key: &str, source: impl Into<BoxError>) -> Self {
        StorageError::Upload {
            bucket: bucket.to_string(),
            key: key.to_string(),
            source: source.into(),
        }
    }
}

/// A part accepted by the store during a multipart upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedPart {
    pub part_number: i32,
    pub e_tag: Option<String>,
}

/// Bucket and object operations of an S3-compatible store.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn bucket_exists(&self, bucket: &str) -> StorageResult<bool>;

    /// Create a bucket. Creating a bucket that already exists is not an error.
    async fn make_bucket(&self, bucket: &str) -> StorageResult<()>;

    /// Store a complete object in one request.
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: Option<String>,
    ) -> StorageResult<()>;

    /// Start a multipart upload and return its upload id.
    async fn create_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        content_type: Option<String>,
    ) -> StorageResult<String>;

    async fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: i32,
        body: Bytes,
    ) -> StorageResult<UploadedPart>;

    async fn complete_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: Vec<UploadedPart>,
    ) -> StorageResult<()>;
}
