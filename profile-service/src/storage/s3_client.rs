// S3/MinIO implementation of the object store operations

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{
    BucketLocationConstraint, CompletedMultipartUpload, CompletedPart, CreateBucketConfiguration,
};
use aws_sdk_s3::Client;
use bytes::Bytes;
use tracing::{debug, info};

use super::{ObjectStore, StorageError, StorageResult, UploadedPart};
use crate::config::StorageConfig;

/// us-east-1 is the only region that rejects an explicit location constraint.
const DEFAULT_REGION: &str = "us-east-1";

pub struct S3ObjectStore {
    client: Client,
    region: String,
}

impl S3ObjectStore {
    /// Build an S3 client with static credentials and path-style addressing,
    /// which MinIO requires.
    pub async fn connect(config: &StorageConfig) -> Self {
        info!("Initializing S3 client for endpoint: {}", config.endpoint_url());

        let credentials = Credentials::new(
            config.access_key.clone(),
            config.secret_key.clone(),
            None,
            None,
            "profile-service",
        );

        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .endpoint_url(config.endpoint_url())
            .credentials_provider(credentials)
            .load()
            .await;

        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(true)
            .build();

        Self {
            client: Client::from_conf(s3_config),
            region: config.region.clone(),
        }
    }

    fn bucket_configuration(&self) -> Option<CreateBucketConfiguration> {
        if self.region == DEFAULT_REGION {
            return None;
        }

        Some(
            CreateBucketConfiguration::builder()
                .location_constraint(BucketLocationConstraint::from(self.region.as_str()))
                .build(),
        )
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn bucket_exists(&self, bucket: &str) -> StorageResult<bool> {
        match self.client.head_bucket().bucket(bucket).send().await {
            Ok(_) => Ok(true),
            Err(err) => {
                if err.as_service_error().is_some_and(|e| e.is_not_found()) {
                    Ok(false)
                } else {
                    Err(StorageError::BucketCheck {
                        bucket: bucket.to_string(),
                        source: err.into(),
                    })
                }
            }
        }
    }

    async fn make_bucket(&self, bucket: &str) -> StorageResult<()> {
        let result = self
            .client
            .create_bucket()
            .bucket(bucket)
            .set_create_bucket_configuration(self.bucket_configuration())
            .send()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(err) => {
                // Another request created it first; any ownership problem
                // shows up on the following put.
                let already_exists = err.as_service_error().is_some_and(|e| {
                    e.is_bucket_already_owned_by_you() || e.is_bucket_already_exists()
                });
                if already_exists {
                    debug!(bucket, "Bucket already exists");
                    Ok(())
                } else {
                    Err(StorageError::BucketCreate {
                        bucket: bucket.to_string(),
                        source: err.into(),
                    })
                }
            }
        }
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: Option<String>,
    ) -> StorageResult<()> {
        debug!(bucket, key, size = body.len(), "Putting object");

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .set_content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| StorageError::upload(bucket, key, e))?;

        Ok(())
    }

    async fn create_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        content_type: Option<String>,
    ) -> StorageResult<String> {
        let output = self
            .client
            .create_multipart_upload()
            .bucket(bucket)
            .key(key)
            .set_content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::upload(bucket, key, e))?;

        output
            .upload_id()
            .map(str::to_string)
            .ok_or_else(|| StorageError::upload(bucket, key, "store returned no upload id"))
    }

    async fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: i32,
        body: Bytes,
    ) -> StorageResult<UploadedPart> {
        debug!(bucket, key, part_number, size = body.len(), "Uploading part");

        let output = self
            .client
            .upload_part()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .part_number(part_number)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| StorageError::upload(bucket, key, e))?;

        Ok(UploadedPart {
            part_number,
            e_tag: output.e_tag().map(str::to_string),
        })
    }

    async fn complete_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: Vec<UploadedPart>,
    ) -> StorageResult<()> {
        let completed_parts = parts
            .into_iter()
            .map(|part| {
                CompletedPart::builder()
                    .part_number(part.part_number)
                    .set_e_tag(part.e_tag)
                    .build()
            })
            .collect::<Vec<_>>();

        let completed = CompletedMultipartUpload::builder()
            .set_parts(Some(completed_parts))
            .build();

        self.client
            .complete_multipart_upload()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .multipart_upload(completed)
            .send()
            .await
            .map_err(|e| StorageError::upload(bucket, key, e))?;

        Ok(())
    }
}
