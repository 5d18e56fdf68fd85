use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use super::{ObjectStore, StorageResult};
use crate::config::StorageConfig;

/// Uploads files to an object store under generated names and returns
/// directly accessible URLs for them.
pub struct ObjectStoreClient {
    store: Arc<dyn ObjectStore>,
    config: StorageConfig,
    // buckets this client has already seen exist or created
    known_buckets: RwLock<HashSet<String>>,
}

impl ObjectStoreClient {
    pub fn new(store: Arc<dyn ObjectStore>, config: StorageConfig) -> Self {
        info!(
            "Object store client using endpoint {} (default bucket: {})",
            config.endpoint_url(),
            config.default_bucket
        );

        Self {
            store,
            config,
            known_buckets: RwLock::new(HashSet::new()),
        }
    }

    pub fn default_bucket(&self) -> &str {
        &self.config.default_bucket
    }

    /// Make sure `bucket` exists, creating it if needed.
    ///
    /// Each bucket is checked against the store at most once per client.
    pub async fn ensure_bucket(&self, bucket: &str) -> StorageResult<()> {
        if self.known_buckets.read().await.contains(bucket) {
            return Ok(());
        }

        // Held across the store calls: first-time checks run one at a time
        let mut known = self.known_buckets.write().await;
        if known.contains(bucket) {
            return Ok(());
        }

        if !self.store.bucket_exists(bucket).await? {
            self.store.make_bucket(bucket).await?;
            info!(bucket, "Bucket created");
        }

        known.insert(bucket.to_string());
        Ok(())
    }

    /// Stream `reader` into `bucket` (or the default bucket) under a fresh
    /// object name and return the object's URL.
    ///
    /// The reader is consumed once, front to back. Nothing is retried and a
    /// failed multipart upload is left as is.
    pub async fn upload<R>(
        &self,
        mut reader: R,
        original_filename: Option<&str>,
        content_type: Option<String>,
        bucket: Option<&str>,
    ) -> StorageResult<String>
    where
        R: AsyncRead + Unpin + Send,
    {
        let bucket = bucket.unwrap_or(self.config.default_bucket.as_str());
        self.ensure_bucket(bucket).await?;

        let key = object_name(original_filename);
        let size = self
            .stream_object(bucket, &key, &mut reader, content_type)
            .await?;

        info!(bucket, key = %key, size, "Object uploaded");
        Ok(self.object_url(bucket, &key))
    }

    pub fn object_url(&self, bucket: &str, key: &str) -> String {
        format!("{}/{}/{}", self.config.endpoint_url(), bucket, key)
    }

    async fn stream_object<R>(
        &self,
        bucket: &str,
        key: &str,
        reader: &mut R,
        content_type: Option<String>,
    ) -> StorageResult<u64>
    where
        R: AsyncRead + Unpin + Send,
    {
        let part_size = self.config.part_size_bytes;

        let first = read_part(reader, part_size).await?;
        if first.len() < part_size {
            let size = first.len() as u64;
            self.store.put_object(bucket, key, first, content_type).await?;
            return Ok(size);
        }

        let upload_id = self
            .store
            .create_multipart_upload(bucket, key, content_type)
            .await?;
        debug!(bucket, key, upload_id = %upload_id, "Multipart upload started");

        let mut parts = Vec::new();
        let mut total = 0u64;
        let mut chunk = first;
        loop {
            let part_number = parts.len() as i32 + 1;
            let is_full = chunk.len() == part_size;
            total += chunk.len() as u64;

            let part = self
                .store
                .upload_part(bucket, key, &upload_id, part_number, chunk)
                .await?;
            parts.push(part);

            if !is_full {
                break;
            }
            chunk = read_part(reader, part_size).await?;
            if chunk.is_empty() {
                break;
            }
        }

        debug!(bucket, key, parts = parts.len(), "Completing multipart upload");
        self.store
            .complete_multipart_upload(bucket, key, &upload_id, parts)
            .await?;

        Ok(total)
    }
}

/// Generate a unique object name, keeping the original file extension.
///
/// Names without a usable extension (none at all, a trailing dot, a dotfile
/// such as `.profile`, or non-alphanumeric characters) get a bare UUID.
pub fn object_name(original_filename: Option<&str>) -> String {
    let id = Uuid::new_v4();
    match original_filename.and_then(extension_of) {
        Some(ext) => format!("{}.{}", id, ext),
        None => id.to_string(),
    }
}

fn extension_of(filename: &str) -> Option<&str> {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
}

/// Read up to `part_size` bytes, stopping early only at end of stream.
async fn read_part<R>(reader: &mut R, part_size: usize) -> std::io::Result<Bytes>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    (&mut *reader)
        .take(part_size as u64)
        .read_to_end(&mut buf)
        .await?;
    Ok(Bytes::from(buf))
}
