use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use bytes::Bytes;
use data_model::Destination;
use storage_client::{InMemoryStorageClient, StorageConfig};
use tracing::subscriber;
use tracing_subscriber::{layer::SubscriberExt, Layer};

use crate::{
    config::ServerConfig,
    migration::ImageFetcher,
    records::RecordStore,
    service::Service,
};

pub struct TestService {
    pub service: Service,
    pub storage: Arc<InMemoryStorageClient>,
}

impl TestService {
    pub fn new() -> Result<Self> {
        let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("trace"));
        let _ = subscriber::set_global_default(
            tracing_subscriber::registry()
                .with(tracing_subscriber::fmt::layer().with_filter(env_filter)),
        );

        let cfg = ServerConfig {
            storage: StorageConfig::default(),
            ..Default::default()
        };
        let storage = Arc::new(InMemoryStorageClient::default());
        let service = Service::with_storage(cfg, storage.clone());

        Ok(Self { service, storage })
    }
}

/// Canned downloads keyed by URL, with injectable failures and a fetch
/// counter so tests can prove how many network attempts a run made.
#[derive(Default)]
pub struct StubFetcher {
    responses: Mutex<HashMap<String, (Bytes, Option<String>)>>,
    failures: Mutex<Vec<String>>,
    fetch_calls: Mutex<usize>,
}

impl StubFetcher {
    pub fn respond(&self, url: &str, bytes: &[u8], content_type: Option<&str>) {
        self.responses.lock().unwrap().insert(
            url.to_string(),
            (
                Bytes::copy_from_slice(bytes),
                content_type.map(|s| s.to_string()),
            ),
        );
    }

    pub fn fail(&self, url: &str) {
        self.failures.lock().unwrap().push(url.to_string());
    }

    pub fn fetch_calls(&self) -> usize {
        *self.fetch_calls.lock().unwrap()
    }
}

#[async_trait]
impl ImageFetcher for StubFetcher {
    async fn fetch(&self, url: &str) -> Result<(Bytes, Option<String>)> {
        *self.fetch_calls.lock().unwrap() += 1;
        if self.failures.lock().unwrap().iter().any(|u| u == url) {
            return Err(anyhow!("injected download failure for {}", url));
        }
        self.responses
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow!("no canned response for {}", url))
    }
}

/// In-memory record collection; mirrors the fault-injection and
/// call-counting style of `InMemoryStorageClient`.
#[derive(Default)]
pub struct InMemoryRecordStore {
    records: Mutex<Vec<Destination>>,
    update_calls: Mutex<usize>,
    fail_updates: Mutex<bool>,
}

impl InMemoryRecordStore {
    pub fn new(records: Vec<Destination>) -> Self {
        Self {
            records: Mutex::new(records),
            ..Default::default()
        }
    }

    pub fn fail_updates(&self, fail: bool) {
        *self.fail_updates.lock().unwrap() = fail;
    }

    pub fn update_calls(&self) -> usize {
        *self.update_calls.lock().unwrap()
    }

    pub fn get(&self, id: i64) -> Option<Destination> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id == id)
            .cloned()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn list_destinations(&self) -> Result<Vec<Destination>> {
        Ok(self.records.lock().unwrap().clone())
    }

    async fn update_managed_url(&self, id: i64, url: &str) -> Result<()> {
        if *self.fail_updates.lock().unwrap() {
            return Err(anyhow!("injected update failure for record {}", id));
        }
        *self.update_calls.lock().unwrap() += 1;
        let mut records = self.records.lock().unwrap();
        let record = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| anyhow!("destination {} not found", id))?;
        record.managed_hero_url = Some(url.to_string());
        Ok(())
    }
}
