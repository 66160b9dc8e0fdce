use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use data_model::BucketOutcome;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::provision::{required_buckets, BucketProvisioner};

/// Fires bucket reconciliation exactly once per service instance, before
/// the HTTP listener accepts traffic. The guard is the attempt itself, not
/// its result: a failed boot-time reconcile is logged and never retried
/// within the process (buckets usually already exist from a previous
/// deployment, and the endpoint stays available to operators).
pub struct BootReconciler {
    provisioner: Arc<BucketProvisioner>,
    attempted: AtomicBool,
}

impl BootReconciler {
    pub fn new(provisioner: Arc<BucketProvisioner>) -> Self {
        Self {
            provisioner,
            attempted: AtomicBool::new(false),
        }
    }

    /// Spawns the one-shot reconcile and returns its join handle, or None
    /// when an attempt was already made. Fire-and-forget: callers on the
    /// serving path never await the handle.
    pub fn trigger(&self) -> Option<JoinHandle<()>> {
        if self.attempted.swap(true, Ordering::SeqCst) {
            return None;
        }
        let provisioner = self.provisioner.clone();
        Some(tokio::spawn(async move {
            match provisioner.reconcile(&required_buckets()).await {
                Ok(results) => {
                    let failed = results
                        .iter()
                        .filter(|r| r.outcome == BucketOutcome::Failed)
                        .count();
                    info!(
                        buckets = results.len(),
                        failed, "boot-time storage reconciliation finished"
                    );
                }
                Err(e) => {
                    error!("boot-time storage reconciliation failed: {:#}", e);
                }
            }
        }))
    }

    pub fn attempted(&self) -> bool {
        self.attempted.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use storage_client::InMemoryStorageClient;

    use super::*;

    #[tokio::test]
    async fn test_trigger_fires_once_per_instance() -> Result<()> {
        let storage = Arc::new(InMemoryStorageClient::default());
        let provisioner = Arc::new(BucketProvisioner::new(storage.clone()));
        let boot = BootReconciler::new(provisioner);

        let first = boot.trigger();
        assert!(first.is_some());
        first.unwrap().await?;
        assert_eq!(storage.create_calls(), required_buckets().len());

        // second mount within the same process lifetime is a no-op
        assert!(boot.trigger().is_none());
        assert!(boot.attempted());
        assert_eq!(storage.create_calls(), required_buckets().len());
        Ok(())
    }

    #[tokio::test]
    async fn test_failure_does_not_rearm_the_guard() -> Result<()> {
        let storage = Arc::new(InMemoryStorageClient::default());
        storage.fail_listing();
        let provisioner = Arc::new(BucketProvisioner::new(storage.clone()));
        let boot = BootReconciler::new(provisioner);

        boot.trigger().unwrap().await?;
        storage.clear_failures();
        assert!(boot.trigger().is_none());
        Ok(())
    }
}
