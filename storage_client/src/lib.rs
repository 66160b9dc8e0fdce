pub mod http;
pub mod memory;

use std::env;

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use data_model::{BucketSpec, BucketState};
use serde::{Deserialize, Serialize};

pub use http::HttpStorageClient;
pub use memory::InMemoryStorageClient;

pub const STORAGE_API_URL_VAR: &str = "STORAGE_API_URL";
pub const STORAGE_SERVICE_KEY_VAR: &str = "STORAGE_SERVICE_KEY";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    pub endpoint: Option<String>,
    #[serde(skip_serializing)]
    pub service_key: Option<String>,
}

impl StorageConfig {
    /// Credentials come from the process environment, never from config
    /// files on disk.
    pub fn from_env() -> Self {
        Self {
            endpoint: env::var(STORAGE_API_URL_VAR).ok(),
            service_key: env::var(STORAGE_SERVICE_KEY_VAR).ok(),
        }
    }

    /// Names of required variables that are absent. Values are never
    /// included, only names, so the result is safe to log.
    pub fn missing_credentials(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.endpoint.is_none() {
            missing.push(STORAGE_API_URL_VAR);
        }
        if self.service_key.is_none() {
            missing.push(STORAGE_SERVICE_KEY_VAR);
        }
        missing
    }
}

/// The managed object store, as consumed by this service. Buckets carry a
/// visibility flag plus size/MIME limits; object uploads support overwrite
/// (upsert) semantics so re-uploading to the same path is safe.
#[async_trait]
pub trait ObjectStoreClient: Send + Sync {
    async fn list_buckets(&self) -> Result<Vec<BucketState>>;

    async fn get_bucket(&self, name: &str) -> Result<Option<BucketState>>;

    async fn create_bucket(&self, spec: &BucketSpec) -> Result<()>;

    /// Updates policy fields only; a bucket's name is its identity and is
    /// never changed.
    async fn update_bucket(&self, spec: &BucketSpec) -> Result<()>;

    async fn upload_object(
        &self,
        bucket: &str,
        path: &str,
        bytes: Bytes,
        content_type: &str,
        overwrite: bool,
    ) -> Result<()>;

    fn public_url(&self, bucket: &str, path: &str) -> String;

    /// Host serving managed public URLs, used to recognize references that
    /// already live in the store.
    fn host(&self) -> Option<String>;
}
