pub mod image_fallback;
pub mod test_objects;

use serde::{Deserialize, Serialize};
use strum::AsRefStr;
use url::Url;

/// Declared policy for a managed storage bucket. The set of specs compiled
/// into the server is the authoritative description of what a correct
/// deployment must look like; specs are never mutated at runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketSpec {
    pub name: String,
    pub public: bool,
    pub file_size_limit_bytes: u64,
    pub allowed_mime_types: Vec<String>,
}

impl BucketSpec {
    pub fn new(
        name: &str,
        public: bool,
        file_size_limit_bytes: u64,
        allowed_mime_types: &[&str],
    ) -> Self {
        Self {
            name: name.to_string(),
            public,
            file_size_limit_bytes,
            allowed_mime_types: allowed_mime_types.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// True when an observed bucket already satisfies this policy. Only
    /// visibility and the size/type limits are comparable; bucket identity
    /// is the name and is never updated.
    pub fn matches(&self, state: &BucketState) -> bool {
        if self.public != state.public ||
            self.file_size_limit_bytes != state.file_size_limit_bytes
        {
            return false;
        }
        // The MIME list is a set; the store does not guarantee a stable
        // order when reporting it back.
        let mut declared = self.allowed_mime_types.clone();
        let mut observed = state.allowed_mime_types.clone();
        declared.sort_unstable();
        observed.sort_unstable();
        declared == observed
    }
}

/// Bucket configuration as observed from the store. Fetched fresh on every
/// reconciliation run, never cached across runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketState {
    pub name: String,
    pub public: bool,
    pub file_size_limit_bytes: u64,
    pub allowed_mime_types: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BucketOutcome {
    Created,
    Updated,
    Unchanged,
    Failed,
}

/// Per-bucket reconciliation outcome. One of these is produced for every
/// declared spec on every run; a failed bucket never hides the others.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketResult {
    pub name: String,
    pub outcome: BucketOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl BucketResult {
    pub fn created(name: &str) -> Self {
        Self {
            name: name.to_string(),
            outcome: BucketOutcome::Created,
            detail: None,
        }
    }

    pub fn updated(name: &str) -> Self {
        Self {
            name: name.to_string(),
            outcome: BucketOutcome::Updated,
            detail: None,
        }
    }

    pub fn unchanged(name: &str) -> Self {
        Self {
            name: name.to_string(),
            outcome: BucketOutcome::Unchanged,
            detail: None,
        }
    }

    pub fn failed(name: &str, detail: String) -> Self {
        Self {
            name: name.to_string(),
            outcome: BucketOutcome::Failed,
            detail: Some(detail),
        }
    }
}

/// A destination page row as seen by the migrator. Owned by the site's data
/// API; the migrator only ever writes `managed_hero_url` and never deletes
/// the row. A non-null `managed_hero_url` marks the row as migrated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Destination {
    pub id: i64,
    pub slug: String,
    pub hero_image_url: Option<String>,
    pub managed_hero_url: Option<String>,
}

impl Destination {
    /// Returns the external URL to migrate, or None when the row is not
    /// eligible: already migrated, no external reference, or the reference
    /// already points at the managed store's host. Evaluated fresh per run;
    /// there is no separate migration ledger.
    pub fn migration_source(&self, managed_host: Option<&str>) -> Option<&str> {
        if self.managed_hero_url.is_some() {
            return None;
        }
        let source = self.hero_image_url.as_deref()?;
        if let (Some(managed_host), Ok(url)) = (managed_host, Url::parse(source)) {
            if url.host_str() == Some(managed_host) {
                return None;
            }
        }
        Some(source)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MigrationOutcome {
    Skipped,
    Migrated,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordResult {
    pub id: i64,
    pub slug: String,
    pub outcome: MigrationOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl RecordResult {
    pub fn skipped(record: &Destination) -> Self {
        Self {
            id: record.id,
            slug: record.slug.clone(),
            outcome: MigrationOutcome::Skipped,
            detail: None,
        }
    }

    pub fn migrated(record: &Destination, url: &str) -> Self {
        Self {
            id: record.id,
            slug: record.slug.clone(),
            outcome: MigrationOutcome::Migrated,
            detail: Some(url.to_string()),
        }
    }

    pub fn failed(record: &Destination, detail: String) -> Self {
        Self {
            id: record.id,
            slug: record.slug.clone(),
            outcome: MigrationOutcome::Failed,
            detail: Some(detail),
        }
    }
}

/// Structured result of one `migrate_all` run, one entry per record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MigrationReport {
    pub results: Vec<RecordResult>,
}

impl MigrationReport {
    pub fn count(&self, outcome: MigrationOutcome) -> usize {
        self.results.iter().filter(|r| r.outcome == outcome).count()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} migrated, {} skipped, {} failed",
            self.count(MigrationOutcome::Migrated),
            self.count(MigrationOutcome::Skipped),
            self.count(MigrationOutcome::Failed),
        )
    }
}
