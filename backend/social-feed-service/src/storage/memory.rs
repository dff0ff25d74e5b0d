use super::{public_url, BucketSpec, ObjectStorage};
use crate::error::StorageError;
use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Stored object payload
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Object storage kept in process memory, for local runs and tests.
pub struct MemoryObjectStorage {
    public_base_url: String,
    buckets: DashSet<String>,
    public_buckets: DashSet<String>,
    objects: DashMap<(String, String), StoredObject>,
    create_calls: AtomicUsize,
}

impl MemoryObjectStorage {
    pub fn new(public_base_url: impl Into<String>) -> Self {
        Self {
            public_base_url: public_base_url.into(),
            buckets: DashSet::new(),
            public_buckets: DashSet::new(),
            objects: DashMap::new(),
            create_calls: AtomicUsize::new(0),
        }
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn has_bucket(&self, bucket: &str) -> bool {
        self.buckets.contains(bucket)
    }

    pub fn is_public(&self, bucket: &str) -> bool {
        self.public_buckets.contains(bucket)
    }

    pub fn object(&self, bucket: &str, path: &str) -> Option<StoredObject> {
        self.objects
            .get(&(bucket.to_string(), path.to_string()))
            .map(|o| o.clone())
    }
}

#[async_trait]
impl ObjectStorage for MemoryObjectStorage {
    async fn create_bucket(&self, spec: &BucketSpec) -> Result<(), StorageError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if self.buckets.insert(spec.name.to_string()) {
            if spec.public {
                self.public_buckets.insert(spec.name.to_string());
            }
            Ok(())
        } else {
            Err(StorageError::BucketAlreadyExists(spec.name.to_string()))
        }
    }

    async fn put_object(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError> {
        if !self.buckets.contains(bucket) {
            return Err(StorageError::Backend(format!("no such bucket: {}", bucket)));
        }

        self.objects.insert(
            (bucket.to_string(), path.to_string()),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(public_url(&self.public_base_url, bucket, path))
    }
}
