use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use data_model::{Destination, MigrationReport, RecordResult};
use storage_client::ObjectStoreClient;
use tracing::{info, warn};
use url::Url;

use crate::{provision::ASSETS_BUCKET, records::RecordStore};

const HERO_FOLDER: &str = "hero";
const DEFAULT_EXTENSION: &str = "jpg";

/// Destination path for a migrated hero image. Deterministic in the slug
/// and the source URL's extension so a re-run after a partial failure
/// re-uses the same path, which together with upsert uploads makes
/// re-migration safe. Sources without a usable extension default to jpg.
pub fn hero_object_path(slug: &str, source_url: &str) -> String {
    let extension = Url::parse(source_url)
        .ok()
        .and_then(|url| {
            url.path_segments()?
                .next_back()?
                .rsplit_once('.')
                .map(|(_, ext)| ext.to_ascii_lowercase())
        })
        .filter(|ext| !ext.is_empty() && ext.len() <= 4 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string());
    format!("{}/{}_hero.{}", HERO_FOLDER, slug, extension)
}

fn content_type_for(path: &str) -> &'static str {
    match path.rsplit_once('.').map(|(_, ext)| ext) {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "image/jpeg",
    }
}

/// Downloads image bytes from an external host. Split out behind a trait so
/// the migrator can be exercised without a network.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<(Bytes, Option<String>)>;
}

pub struct HttpImageFetcher {
    client: reqwest::Client,
}

impl HttpImageFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpImageFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, url: &str) -> Result<(Bytes, Option<String>)> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("download of {} failed with {}", url, status));
        }
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());
        let bytes = response.bytes().await?;
        Ok((bytes, content_type))
    }
}

/// Moves externally-hosted hero images into the managed store: download,
/// upsert upload under a deterministic path, then rewrite the record's
/// managed URL. Records are processed sequentially and independently;
/// this is an operator-triggered batch, not a request-path operation.
pub struct Migrator {
    storage: Arc<dyn ObjectStoreClient>,
    records: Arc<dyn RecordStore>,
    fetcher: Arc<dyn ImageFetcher>,
}

impl Migrator {
    pub fn new(
        storage: Arc<dyn ObjectStoreClient>,
        records: Arc<dyn RecordStore>,
        fetcher: Arc<dyn ImageFetcher>,
    ) -> Self {
        Self {
            storage,
            records,
            fetcher,
        }
    }

    /// One migration pass over every destination row. Eligibility is
    /// re-evaluated from current record state on every run, so the call is
    /// idempotent; a failing record is recorded and never stops the batch.
    /// Only the initial listing is fatal.
    pub async fn migrate_all(&self) -> Result<MigrationReport> {
        let managed_host = self.storage.host();
        let records = self
            .records
            .list_destinations()
            .await
            .context("listing destinations")?;

        let mut report = MigrationReport::default();
        for record in &records {
            let result = match record.migration_source(managed_host.as_deref()) {
                None => RecordResult::skipped(record),
                Some(source) => match self.migrate_record(record, source).await {
                    Ok(url) => {
                        info!(slug = record.slug, url, "migrated hero image");
                        RecordResult::migrated(record, &url)
                    }
                    Err(e) => {
                        warn!(slug = record.slug, "hero image migration failed: {:#}", e);
                        RecordResult::failed(record, format!("{:#}", e))
                    }
                },
            };
            report.results.push(result);
        }
        info!("migration finished: {}", report.summary());
        Ok(report)
    }

    async fn migrate_record(&self, record: &Destination, source: &str) -> Result<String> {
        let (bytes, content_type) = self
            .fetcher
            .fetch(source)
            .await
            .context("downloading source image")?;
        let path = hero_object_path(&record.slug, source);
        let content_type = content_type.unwrap_or_else(|| content_type_for(&path).to_string());

        self.storage
            .upload_object(ASSETS_BUCKET, &path, bytes, &content_type, true)
            .await
            .context("uploading to managed store")?;
        let url = self.storage.public_url(ASSETS_BUCKET, &path);

        // Only rewrite the record once the object is known to exist; a
        // dangling managed reference must never be written.
        self.records
            .update_managed_url(record.id, &url)
            .await
            .context("updating destination record")?;
        Ok(url)
    }
}
