use std::{
    collections::{BTreeMap, HashSet},
    sync::Mutex,
};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use bytes::Bytes;
use data_model::{BucketSpec, BucketState};

use super::ObjectStoreClient;

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub bytes: Bytes,
    pub content_type: String,
}

#[derive(Default)]
struct Inner {
    buckets: BTreeMap<String, BucketState>,
    objects: BTreeMap<(String, String), StoredObject>,
    upload_calls: usize,
    update_calls: usize,
    create_calls: usize,
    fail_buckets: HashSet<String>,
    fail_listing: bool,
}

/// In-memory store used by tests and local development. Counts every
/// mutating call so tests can assert exactly how many side effects a
/// reconciliation or migration run produced, and supports injecting
/// per-bucket and listing failures.
pub struct InMemoryStorageClient {
    inner: Mutex<Inner>,
    host: String,
}

impl Default for InMemoryStorageClient {
    fn default() -> Self {
        Self::new("storage.test.local")
    }
}

impl InMemoryStorageClient {
    pub fn new(host: &str) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            host: host.to_string(),
        }
    }

    /// Make create/update calls for this bucket fail until cleared.
    pub fn fail_bucket(&self, name: &str) {
        self.inner
            .lock()
            .unwrap()
            .fail_buckets
            .insert(name.to_string());
    }

    pub fn clear_failures(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_buckets.clear();
        inner.fail_listing = false;
    }

    /// Make the next listing calls fail, simulating an unreachable store.
    pub fn fail_listing(&self) {
        self.inner.lock().unwrap().fail_listing = true;
    }

    pub fn upload_calls(&self) -> usize {
        self.inner.lock().unwrap().upload_calls
    }

    pub fn update_calls(&self) -> usize {
        self.inner.lock().unwrap().update_calls
    }

    pub fn create_calls(&self) -> usize {
        self.inner.lock().unwrap().create_calls
    }

    pub fn object(&self, bucket: &str, path: &str) -> Option<StoredObject> {
        self.inner
            .lock()
            .unwrap()
            .objects
            .get(&(bucket.to_string(), path.to_string()))
            .cloned()
    }

    pub fn bucket(&self, name: &str) -> Option<BucketState> {
        self.inner.lock().unwrap().buckets.get(name).cloned()
    }
}

#[async_trait]
impl ObjectStoreClient for InMemoryStorageClient {
    async fn list_buckets(&self) -> Result<Vec<BucketState>> {
        let inner = self.inner.lock().unwrap();
        if inner.fail_listing {
            return Err(anyhow!("injected listing failure"));
        }
        Ok(inner.buckets.values().cloned().collect())
    }

    async fn get_bucket(&self, name: &str) -> Result<Option<BucketState>> {
        Ok(self.inner.lock().unwrap().buckets.get(name).cloned())
    }

    async fn create_bucket(&self, spec: &BucketSpec) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_buckets.contains(&spec.name) {
            return Err(anyhow!("injected create failure for {}", spec.name));
        }
        if inner.buckets.contains_key(&spec.name) {
            return Err(anyhow!("bucket {} already exists", spec.name));
        }
        inner.create_calls += 1;
        inner.buckets.insert(
            spec.name.clone(),
            BucketState {
                name: spec.name.clone(),
                public: spec.public,
                file_size_limit_bytes: spec.file_size_limit_bytes,
                allowed_mime_types: spec.allowed_mime_types.clone(),
            },
        );
        Ok(())
    }

    async fn update_bucket(&self, spec: &BucketSpec) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_buckets.contains(&spec.name) {
            return Err(anyhow!("injected update failure for {}", spec.name));
        }
        inner.update_calls += 1;
        let bucket = inner
            .buckets
            .get_mut(&spec.name)
            .ok_or_else(|| anyhow!("bucket {} not found", spec.name))?;
        bucket.public = spec.public;
        bucket.file_size_limit_bytes = spec.file_size_limit_bytes;
        bucket.allowed_mime_types = spec.allowed_mime_types.clone();
        Ok(())
    }

    async fn upload_object(
        &self,
        bucket: &str,
        path: &str,
        bytes: Bytes,
        content_type: &str,
        overwrite: bool,
    ) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let key = (bucket.to_string(), path.to_string());
        if !overwrite && inner.objects.contains_key(&key) {
            return Err(anyhow!("object {}/{} already exists", bucket, path));
        }
        inner.upload_calls += 1;
        inner.objects.insert(
            key,
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!(
            "https://{}/storage/v1/object/public/{}/{}",
            self.host, bucket, path
        )
    }

    fn host(&self) -> Option<String> {
        Some(self.host.clone())
    }
}
