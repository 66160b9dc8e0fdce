use std::{collections::HashMap, sync::Arc};

use anyhow::{Context, Result};
use data_model::{BucketResult, BucketSpec, BucketState};
use storage_client::ObjectStoreClient;
use tracing::{info, warn};

/// Bucket that migrated hero images are uploaded into.
pub const ASSETS_BUCKET: &str = "site-assets";

const IMAGE_MIME_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp"];

/// The authoritative bucket policy table. A correct deployment matches this
/// exactly; reconciliation converges the store towards it on every run.
pub fn required_buckets() -> Vec<BucketSpec> {
    vec![
        BucketSpec::new(ASSETS_BUCKET, true, 10 * 1024 * 1024, IMAGE_MIME_TYPES),
        BucketSpec::new("destination-images", true, 5 * 1024 * 1024, IMAGE_MIME_TYPES),
        BucketSpec::new(
            "documents",
            false,
            20 * 1024 * 1024,
            &["application/pdf", "application/msword"],
        ),
    ]
}

pub struct BucketProvisioner {
    storage: Arc<dyn ObjectStoreClient>,
}

impl BucketProvisioner {
    pub fn new(storage: Arc<dyn ObjectStoreClient>) -> Self {
        Self { storage }
    }

    /// Reconciles actual bucket state against the declared specs. The
    /// listing is the baseline for diffing, so a listing failure fails the
    /// whole call; after that, every spec is processed independently and a
    /// failing bucket only shows up as a `failed` entry in its own result.
    /// Specs are handled in declaration order for deterministic reporting.
    pub async fn reconcile(&self, specs: &[BucketSpec]) -> Result<Vec<BucketResult>> {
        let existing = self
            .storage
            .list_buckets()
            .await
            .context("listing existing buckets")?;
        let existing: HashMap<String, BucketState> = existing
            .into_iter()
            .map(|state| (state.name.clone(), state))
            .collect();

        let mut results = Vec::with_capacity(specs.len());
        for spec in specs {
            let result = self.reconcile_bucket(spec, existing.get(&spec.name)).await;
            match &result.outcome {
                data_model::BucketOutcome::Failed => {
                    warn!(
                        bucket = spec.name,
                        detail = result.detail.as_deref().unwrap_or(""),
                        "bucket reconciliation failed"
                    );
                }
                outcome => {
                    info!(bucket = spec.name, outcome = outcome.as_ref(), "bucket reconciled");
                }
            }
            results.push(result);
        }
        Ok(results)
    }

    async fn reconcile_bucket(
        &self,
        spec: &BucketSpec,
        current: Option<&BucketState>,
    ) -> BucketResult {
        match current {
            None => match self.storage.create_bucket(spec).await {
                Ok(()) => BucketResult::created(&spec.name),
                Err(e) => BucketResult::failed(&spec.name, format!("{:#}", e)),
            },
            Some(state) if spec.matches(state) => BucketResult::unchanged(&spec.name),
            Some(_) => match self.storage.update_bucket(spec).await {
                Ok(()) => BucketResult::updated(&spec.name),
                Err(e) => BucketResult::failed(&spec.name, format!("{:#}", e)),
            },
        }
    }
}
