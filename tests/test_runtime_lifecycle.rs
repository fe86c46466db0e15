//! Integration tests for the runtime lifecycle
//!
//! Mirrors what `nameops_runtime` does: open the store through a slot, run the
//! scheduler with the mock scanner, then tear everything down.

#[cfg(test)]
mod runtime_lifecycle_tests {
    use nameops::backend::SqliteBackend;
    use nameops::retry::RetryPolicy;
    use nameops::shutdown::teardown;
    use nameops::{
        DocumentBackend, MockScanner, PageRequest, Scheduler, SchedulerConfig, StoreOptions,
        StoreSlot,
    };
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::tempdir;
    use tokio_util::sync::CancellationToken;

    #[tokio::test]
    async fn test_scheduler_ingests_until_teardown() {
        let dir = tempdir().unwrap();
        let backend: Arc<dyn DocumentBackend> =
            Arc::new(SqliteBackend::new(dir.path().join("nameops.db")).unwrap());

        let slot = StoreSlot::new();
        let store = slot
            .get_or_open(backend, StoreOptions::new("nameops", "relay"))
            .await
            .unwrap();

        let cancel = CancellationToken::new();
        let handle = Scheduler::new(
            Arc::new(MockScanner::new(5, 10)),
            store.clone(),
            SchedulerConfig {
                interval: Duration::from_millis(20),
                retry: RetryPolicy::none(),
            },
        )
        .spawn(cancel.clone());

        tokio::time::timeout(Duration::from_secs(10), async {
            loop {
                if store.stats().await.map(|s| s.name_ops > 0).unwrap_or(false) {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();

        let errors = teardown(&cancel, handle, &slot).await;
        assert!(errors.is_empty());
        assert!(slot.get().await.is_none());

        // The handle still exists but the backend behind it is closed
        assert!(store.query(PageRequest::default(), None).await.is_err());
    }

    #[tokio::test]
    async fn test_mock_scans_collapse_into_one_daily_document() {
        let dir = tempdir().unwrap();
        let backend: Arc<dyn DocumentBackend> =
            Arc::new(SqliteBackend::new(dir.path().join("nameops.db")).unwrap());
        let slot = StoreSlot::new();
        let store = slot
            .get_or_open(backend, StoreOptions::new("nameops", "relay"))
            .await
            .unwrap();

        let scheduler = Scheduler::new(
            Arc::new(MockScanner::new(20, 20)),
            store.clone(),
            SchedulerConfig {
                interval: Duration::from_millis(1),
                retry: RetryPolicy::none(),
            },
        );

        let cancel = CancellationToken::new();
        let first = scheduler.run_cycle(&cancel).await.unwrap();
        let second = scheduler.run_cycle(&cancel).await.unwrap();

        let stats = store.stats().await.unwrap();
        // Both cycles ran on the same UTC day unless the test straddles midnight
        if first.doc_id == second.doc_id {
            assert_eq!(stats.documents, 1);
            // Each scan contributes at most 20 new keys
            assert!(stats.name_ops >= 20 && stats.name_ops <= 40);
        }

        slot.shutdown().await.unwrap();
    }
}
