use super::{public_read_policy, public_url, BucketSpec, ObjectStorage};
use crate::error::StorageError;
use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::PublicAccessBlockConfiguration;
use aws_sdk_s3::Client;
use std::sync::Arc;

const CACHE_CONTROL: &str = "max-age=3600";

/// S3-compatible object storage
#[derive(Clone)]
pub struct S3ObjectStorage {
    client: Arc<Client>,
    public_base_url: String,
}

impl S3ObjectStorage {
    pub fn new(client: Client, public_base_url: impl Into<String>) -> Self {
        Self {
            client: Arc::new(client),
            public_base_url: public_base_url.into(),
        }
    }

    /// Build a client from the standard AWS environment
    pub async fn from_env(public_base_url: impl Into<String>) -> Self {
        let aws_config = aws_config::load_from_env().await;
        Self::new(Client::new(&aws_config), public_base_url)
    }

    /// Open the bucket for anonymous reads.
    async fn make_public(&self, bucket: &str) -> Result<(), StorageError> {
        // New AWS buckets block public policies. MinIO has no such API.
        let unblock = PublicAccessBlockConfiguration::builder()
            .block_public_acls(false)
            .ignore_public_acls(false)
            .block_public_policy(false)
            .restrict_public_buckets(false)
            .build();
        if let Err(e) = self
            .client
            .put_public_access_block()
            .bucket(bucket)
            .public_access_block_configuration(unblock)
            .send()
            .await
        {
            let error = e.into_service_error();
            tracing::debug!(bucket, %error, "public access block not updated");
        }

        self.client
            .put_bucket_policy()
            .bucket(bucket)
            .policy(public_read_policy(bucket))
            .send()
            .await
            .map_err(|e| {
                StorageError::Backend(format!(
                    "failed to make bucket {} public: {}",
                    bucket,
                    e.into_service_error()
                ))
            })?;
        Ok(())
    }
}

#[async_trait]
impl ObjectStorage for S3ObjectStorage {
    async fn create_bucket(&self, spec: &BucketSpec) -> Result<(), StorageError> {
        match self.client.create_bucket().bucket(spec.name).send().await {
            Ok(_) => {
                if spec.public {
                    self.make_public(spec.name).await?;
                }
                tracing::info!(bucket = spec.name, public = spec.public, "bucket created");
                Ok(())
            }
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_bucket_already_exists()
                    || service_err.is_bucket_already_owned_by_you()
                {
                    Err(StorageError::BucketAlreadyExists(spec.name.to_string()))
                } else {
                    Err(StorageError::Backend(format!(
                        "failed to create bucket {}: {}",
                        spec.name, service_err
                    )))
                }
            }
        }
    }

    async fn put_object(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError> {
        self.client
            .put_object()
            .bucket(bucket)
            .key(path)
            .content_type(content_type)
            .cache_control(CACHE_CONTROL)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| {
                StorageError::Backend(format!(
                    "failed to upload {}/{}: {}",
                    bucket,
                    path,
                    e.into_service_error()
                ))
            })?;

        Ok(public_url(&self.public_base_url, bucket, path))
    }
}
