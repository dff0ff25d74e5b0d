//! Object storage for uploaded media.
//!
//! Buckets are created on first use. A bucket that already exists is a
//! successful provisioning, never a failure.
use crate::error::StorageError;
use async_trait::async_trait;

pub mod memory;
pub mod s3;

pub use memory::MemoryObjectStorage;
pub use s3::S3ObjectStorage;

const MIB: usize = 1024 * 1024;

/// Bucket provisioning parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketSpec {
    pub name: &'static str,
    pub max_bytes: usize,
    /// Accepted content types, matched by prefix
    pub content_type_prefix: &'static str,
    /// Objects are readable by anyone through `public_url`
    pub public: bool,
}

pub const POST_IMAGES: BucketSpec = BucketSpec {
    name: "post-images",
    max_bytes: 5 * MIB,
    content_type_prefix: "image/",
    public: true,
};

pub const POST_VIDEOS: BucketSpec = BucketSpec {
    name: "post-videos",
    max_bytes: 50 * MIB,
    content_type_prefix: "video/",
    public: true,
};

pub const PROFILE_IMAGES: BucketSpec = BucketSpec {
    name: "profile-images",
    max_bytes: 5 * MIB,
    content_type_prefix: "image/",
    public: true,
};

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Fails with `StorageError::BucketAlreadyExists` when the bucket is there.
    async fn create_bucket(&self, spec: &BucketSpec) -> Result<(), StorageError>;

    /// Store `bytes` under `bucket/path` and return the public URL.
    async fn put_object(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError>;
}

/// Public URL of an object in a public bucket.
pub fn public_url(base_url: &str, bucket: &str, path: &str) -> String {
    format!("{}/{}/{}", base_url.trim_end_matches('/'), bucket, path)
}

/// Bucket policy granting anonymous `s3:GetObject` on every object.
pub fn public_read_policy(bucket: &str) -> String {
    serde_json::json!({
        "Version": "2012-10-17",
        "Statement": [{
            "Sid": "PublicRead",
            "Effect": "Allow",
            "Principal": "*",
            "Action": ["s3:GetObject"],
            "Resource": [format!("arn:aws:s3:::{}/*", bucket)],
        }]
    })
    .to_string()
}
