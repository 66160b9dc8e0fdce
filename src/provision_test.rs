#[cfg(test)]
mod tests {
    use anyhow::Result;
    use data_model::{test_objects::tests::test_bucket_specs, BucketOutcome, BucketSpec};
    use storage_client::ObjectStoreClient;

    use crate::{provision::required_buckets, testing::TestService};

    #[tokio::test]
    async fn test_empty_store_creates_declared_bucket() -> Result<()> {
        let test_srv = TestService::new()?;
        let specs = vec![BucketSpec::new(
            "site-assets",
            true,
            10 * 1024 * 1024,
            &["image/jpeg", "image/png", "image/webp"],
        )];

        let results = test_srv.service.provisioner.reconcile(&specs).await?;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name, "site-assets");
        assert_eq!(results[0].outcome, BucketOutcome::Created);

        let created = test_srv.storage.get_bucket("site-assets").await?.unwrap();
        assert!(created.public);
        assert_eq!(created.file_size_limit_bytes, 10 * 1024 * 1024);
        Ok(())
    }

    #[tokio::test]
    async fn test_reconcile_is_idempotent() -> Result<()> {
        let test_srv = TestService::new()?;
        let specs = test_bucket_specs();

        let first = test_srv.service.provisioner.reconcile(&specs).await?;
        assert!(first.iter().all(|r| r.outcome == BucketOutcome::Created));

        let second = test_srv.service.provisioner.reconcile(&specs).await?;
        assert!(second.iter().all(|r| r.outcome == BucketOutcome::Unchanged));

        assert_eq!(test_srv.storage.create_calls(), specs.len());
        assert_eq!(test_srv.storage.update_calls(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_policy_drift_issues_exactly_one_update() -> Result<()> {
        let test_srv = TestService::new()?;
        let mut specs = test_bucket_specs();

        test_srv.service.provisioner.reconcile(&specs).await?;

        // the deployed bucket is now out of line with a new declared policy
        specs[0].public = false;
        let results = test_srv.service.provisioner.reconcile(&specs).await?;
        assert_eq!(results[0].outcome, BucketOutcome::Updated);
        assert!(results[1..]
            .iter()
            .all(|r| r.outcome == BucketOutcome::Unchanged));
        assert_eq!(test_srv.storage.update_calls(), 1);
        assert!(!test_srv.storage.bucket(&specs[0].name).unwrap().public);
        Ok(())
    }

    #[tokio::test]
    async fn test_one_failing_bucket_never_aborts_the_others() -> Result<()> {
        let test_srv = TestService::new()?;
        let specs = test_bucket_specs();
        test_srv.storage.fail_bucket(&specs[1].name);

        let results = test_srv.service.provisioner.reconcile(&specs).await?;
        assert_eq!(results[0].outcome, BucketOutcome::Created);
        assert_eq!(results[1].outcome, BucketOutcome::Failed);
        assert!(results[1].detail.is_some());
        assert_eq!(results[2].outcome, BucketOutcome::Created);

        // once the store recovers, the next run converges the failed bucket
        test_srv.storage.clear_failures();
        let results = test_srv.service.provisioner.reconcile(&specs).await?;
        assert_eq!(results[1].outcome, BucketOutcome::Created);
        assert_eq!(results[0].outcome, BucketOutcome::Unchanged);
        Ok(())
    }

    #[tokio::test]
    async fn test_listing_failure_fails_the_whole_call() -> Result<()> {
        let test_srv = TestService::new()?;
        test_srv.storage.fail_listing();

        let err = test_srv
            .service
            .provisioner
            .reconcile(&required_buckets())
            .await;
        assert!(err.is_err());
        assert_eq!(test_srv.storage.create_calls(), 0);
        Ok(())
    }
}
