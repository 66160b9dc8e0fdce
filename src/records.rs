use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use data_model::Destination;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use storage_client::StorageConfig;

/// The destination collection, as consumed by the migrator. The collection
/// itself is owned by the site's data API; this service only reads rows and
/// writes the managed hero URL, never anything else.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn list_destinations(&self) -> Result<Vec<Destination>>;

    async fn update_managed_url(&self, id: i64, url: &str) -> Result<()>;
}

/// Production impl over the hosted data API (PostgREST-style REST).
pub struct HttpRecordStore {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpRecordStore {
    pub fn new(config: &StorageConfig) -> Result<Self> {
        let endpoint = config
            .endpoint
            .as_deref()
            .ok_or_else(|| anyhow!("{} is not set", storage_client::STORAGE_API_URL_VAR))?
            .trim_end_matches('/')
            .to_string();
        let service_key = config
            .service_key
            .as_deref()
            .ok_or_else(|| anyhow!("{} is not set", storage_client::STORAGE_SERVICE_KEY_VAR))?;

        let mut auth = HeaderValue::from_str(&format!("Bearer {}", service_key))
            .context("storage service key is not a valid header value")?;
        auth.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;
        Ok(Self { client, endpoint })
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/destinations", self.endpoint)
    }
}

#[async_trait]
impl RecordStore for HttpRecordStore {
    async fn list_destinations(&self) -> Result<Vec<Destination>> {
        let response = self
            .client
            .get(self.table_url())
            .query(&[("select", "id,slug,hero_image_url,managed_hero_url")])
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("listing destinations failed with {}: {}", status, body));
        }
        Ok(response.json().await?)
    }

    async fn update_managed_url(&self, id: i64, url: &str) -> Result<()> {
        let response = self
            .client
            .patch(self.table_url())
            .query(&[("id", format!("eq.{}", id))])
            .header("Prefer", "return=minimal")
            .json(&serde_json::json!({ "managed_hero_url": url }))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!(
                "updating destination {} failed with {}: {}",
                id,
                status,
                body
            ));
        }
        Ok(())
    }
}

