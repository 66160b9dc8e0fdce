use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use data_model::{BucketSpec, BucketState};
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION},
    StatusCode,
};
use serde::{Deserialize, Serialize};
use url::Url;

use super::{ObjectStoreClient, StorageConfig};

/// Bucket record as the hosted storage API serializes it. The API reports
/// no size limit as null; we normalize that to zero so policy comparison
/// stays a plain field-by-field equality.
#[derive(Debug, Deserialize)]
struct BucketPayload {
    id: String,
    public: bool,
    file_size_limit: Option<u64>,
    allowed_mime_types: Option<Vec<String>>,
}

impl From<BucketPayload> for BucketState {
    fn from(payload: BucketPayload) -> Self {
        BucketState {
            name: payload.id,
            public: payload.public,
            file_size_limit_bytes: payload.file_size_limit.unwrap_or(0),
            allowed_mime_types: payload.allowed_mime_types.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Serialize)]
struct BucketPolicyPayload<'a> {
    public: bool,
    file_size_limit: u64,
    allowed_mime_types: &'a [String],
}

pub struct HttpStorageClient {
    client: reqwest::Client,
    endpoint: String,
    host: Option<String>,
}

impl HttpStorageClient {
    pub fn new(config: &StorageConfig) -> Result<Self> {
        let endpoint = config
            .endpoint
            .as_deref()
            .ok_or_else(|| anyhow!("{} is not set", super::STORAGE_API_URL_VAR))?
            .trim_end_matches('/')
            .to_string();
        let service_key = config
            .service_key
            .as_deref()
            .ok_or_else(|| anyhow!("{} is not set", super::STORAGE_SERVICE_KEY_VAR))?;

        let host = endpoint
            .parse::<Url>()
            .context("invalid storage endpoint url")?
            .host_str()
            .map(|h| h.to_string());

        let mut auth = HeaderValue::from_str(&format!("Bearer {}", service_key))
            .context("storage service key is not a valid header value")?;
        auth.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;
        Ok(Self {
            client,
            endpoint,
            host,
        })
    }

    fn bucket_url(&self, name: Option<&str>) -> String {
        match name {
            Some(name) => format!("{}/storage/v1/bucket/{}", self.endpoint, name),
            None => format!("{}/storage/v1/bucket", self.endpoint),
        }
    }

    async fn check(response: reqwest::Response, action: &str) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(anyhow!("{} failed with {}: {}", action, status, body))
    }
}

#[async_trait]
impl ObjectStoreClient for HttpStorageClient {
    async fn list_buckets(&self) -> Result<Vec<BucketState>> {
        let response = self.client.get(self.bucket_url(None)).send().await?;
        let response = Self::check(response, "listing buckets").await?;
        let buckets: Vec<BucketPayload> = response.json().await?;
        Ok(buckets.into_iter().map(BucketState::from).collect())
    }

    async fn get_bucket(&self, name: &str) -> Result<Option<BucketState>> {
        let response = self.client.get(self.bucket_url(Some(name))).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = Self::check(response, "fetching bucket").await?;
        let bucket: BucketPayload = response.json().await?;
        Ok(Some(bucket.into()))
    }

    async fn create_bucket(&self, spec: &BucketSpec) -> Result<()> {
        let body = serde_json::json!({
            "id": spec.name,
            "name": spec.name,
            "public": spec.public,
            "file_size_limit": spec.file_size_limit_bytes,
            "allowed_mime_types": spec.allowed_mime_types,
        });
        let response = self
            .client
            .post(self.bucket_url(None))
            .json(&body)
            .send()
            .await?;
        Self::check(response, "creating bucket").await?;
        Ok(())
    }

    async fn update_bucket(&self, spec: &BucketSpec) -> Result<()> {
        let body = BucketPolicyPayload {
            public: spec.public,
            file_size_limit: spec.file_size_limit_bytes,
            allowed_mime_types: &spec.allowed_mime_types,
        };
        let response = self
            .client
            .put(self.bucket_url(Some(&spec.name)))
            .json(&body)
            .send()
            .await?;
        Self::check(response, "updating bucket").await?;
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
        let url = format!("{}/storage/v1/object/{}/{}", self.endpoint, bucket, path);
        let response = self
            .client
            .post(&url)
            .header("x-upsert", if overwrite { "true" } else { "false" })
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await?;
        Self::check(response, "uploading object").await?;
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.endpoint, bucket, path
        )
    }

    fn host(&self) -> Option<String> {
        self.host.clone()
    }
}
