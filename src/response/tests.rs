//! Response Collector Tests
//!
//! Covers report acceptance (current attempt only, once), result recording
//! (per attempt, retried after a failed write) and the notifications a runner
//! report queues.

#[cfg(test)]
mod tests {
    use crate::config::AttemptPolicy;
    use crate::dispatch::store::ItemStore;
    use crate::dispatch::types::*;
    use crate::dispatch::work::{Work, WorkItem, enqueue};
    use crate::dispatch::notification::{NotifyConfig, NotifyOn};
    use crate::error::StoreError;
    use crate::response::collector::Outcome;
    use crate::response::results::{MemoryResultStore, ResultStore};
    use crate::response::types::*;
    use crate::testing::{FlakyResultStore, Harness, announce_pair};

    use chrono::{TimeDelta, Utc};

    fn work() -> Work {
        Work {
            revision: "4f2a9c1".to_string(),
            import_path: "example.org/project".to_string(),
            subpackages: false,
            vcs_hint: "git".to_string(),
        }
    }

    fn passing(path: &str) -> TestOutput {
        TestOutput {
            import_path: path.to_string(),
            output: "=== RUN TestThing\n--- PASS: TestThing\nPASS\n".to_string(),
            kind: OutputKind::Success,
            notify: None,
        }
    }

    fn runner_response(key: &ItemId, attempt_id: &AttemptId, tests: Vec<TestOutput>) -> RunnerResponse {
        RunnerResponse {
            key: key.clone(),
            attempt_id: attempt_id.clone(),
            revision: "4f2a9c1".to_string(),
            rev_date: Some(Utc::now()),
            build_output: String::new(),
            tests,
        }
    }

    /// Enqueues one item and claims it; returns the item id and its attempt id.
    async fn claimed(harness: &Harness) -> (ItemId, AttemptId) {
        announce_pair(&harness.leases, "linux", "amd64", "w1").await;
        let id = enqueue(&harness.work, work(), serde_json::Value::Null)
            .await
            .unwrap();
        harness.work.reconcile().await.unwrap();
        let attempt = current_attempt(harness, &id).await;
        (id, attempt)
    }

    async fn current_attempt(harness: &Harness, id: &ItemId) -> AttemptId {
        let item: WorkItem = harness.work_store.find_by_id(id).await.unwrap().unwrap();
        item.claim.latest_attempt().unwrap().id.clone()
    }

    // ============================================================
    // TEST 1: Output classification
    // ============================================================

    #[test]
    fn test_output_status_classification() {
        let mut out = passing("example.org/a");
        assert_eq!(out.status(), TestStatus::Pass);

        out.output = "--- FAIL: TestThing\nFAIL\n".to_string();
        assert_eq!(out.status(), TestStatus::Fail);

        out.output = "PASS".to_string();
        assert_eq!(out.status(), TestStatus::Fail);

        out.kind = OutputKind::WontBuild;
        assert_eq!(out.status(), TestStatus::WontBuild);

        out.kind = OutputKind::Error;
        assert_eq!(out.status(), TestStatus::Error);
    }

    // ============================================================
    // TEST 2: Acceptance
    // ============================================================

    #[tokio::test]
    async fn test_example_scenario_completes_once() {
        // ARRANGE: W1 waiting, one matching builder/runner pair
        let harness = Harness::new(AttemptPolicy::work());
        announce_pair(&harness.leases, "linux", "amd64", "w1").await;
        let id = enqueue(&harness.work, work(), serde_json::Value::Null)
            .await
            .unwrap();
        let initial = harness.work_store.find_by_id(&id).await.unwrap().unwrap();

        // ACT: Claim
        harness.work.reconcile().await.unwrap();
        let processing = harness.work_store.find_by_id(&id).await.unwrap().unwrap();

        // ASSERT
        assert_eq!(processing.claim.status, ItemStatus::Processing);
        assert_eq!(processing.claim.attempt_log.len(), 1);

        // ACT: Two identical passing reports
        let attempt = current_attempt(&harness, &id).await;
        let response = runner_response(&id, &attempt, vec![passing("example.org/project")]);
        let first = harness.collector.post(response.clone()).await.unwrap();
        let second = harness.collector.post(response).await.unwrap();

        // ASSERT: Completed exactly once, revision advanced by two
        assert_eq!(first, Outcome::Accepted);
        assert_eq!(second, Outcome::Ignored);

        let done = harness.work_store.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(done.claim.status, ItemStatus::Completed);
        assert_eq!(done.claim.revision, initial.claim.revision + 2);
        assert_eq!(harness.results.work_results().len(), 1);
        assert_eq!(harness.results.test_results().len(), 1);
    }

    #[tokio::test]
    async fn test_report_for_stale_attempt_is_ignored() {
        // ARRANGE: Claimed once, then reclaimed after the timeout
        let harness = Harness::new(AttemptPolicy {
            max_attempts: 5,
            attempt_timeout_secs: 60,
        });
        let (id, old_attempt) = claimed(&harness).await;
        harness
            .work
            .reconcile_at(Utc::now() + TimeDelta::seconds(120))
            .await
            .unwrap();
        let new_attempt = current_attempt(&harness, &id).await;
        assert_ne!(old_attempt, new_attempt);

        // ACT
        let late = harness
            .collector
            .post(runner_response(&id, &old_attempt, vec![]))
            .await
            .unwrap();
        let current = harness
            .collector
            .post(runner_response(&id, &new_attempt, vec![]))
            .await
            .unwrap();

        // ASSERT
        assert_eq!(late, Outcome::Ignored);
        assert_eq!(current, Outcome::Accepted);
        assert_eq!(harness.results.work_results().len(), 1);
    }

    #[tokio::test]
    async fn test_report_for_waiting_item_is_ignored() {
        let harness = Harness::new(AttemptPolicy::work());
        let id = enqueue(&harness.work, work(), serde_json::Value::Null)
            .await
            .unwrap();

        let outcome = harness
            .collector
            .post(runner_response(&id, &AttemptId::new(), vec![]))
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::Ignored);
        assert!(harness.results.work_results().is_empty());
    }

    #[tokio::test]
    async fn test_report_for_unknown_item_is_not_found() {
        let harness = Harness::new(AttemptPolicy::work());

        let result = harness
            .collector
            .post(runner_response(&ItemId::new(), &AttemptId::new(), vec![]))
            .await;

        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_builder_error_records_failed_work_result() {
        // ARRANGE
        let harness = Harness::new(AttemptPolicy::work());
        let (id, attempt) = claimed(&harness).await;

        // ACT
        let outcome = harness
            .collector
            .error(BuilderResponse {
                key: id.clone(),
                attempt_id: attempt,
                revision: "4f2a9c1".to_string(),
                rev_date: None,
                error: "clone failed: repository not found".to_string(),
            })
            .await
            .unwrap();

        // ASSERT
        assert_eq!(outcome, Outcome::Accepted);
        let results = harness.results.work_results();
        assert_eq!(results.len(), 1);
        assert!(!results[0].success);
        assert_eq!(
            results[0].error.as_deref(),
            Some("clone failed: repository not found")
        );
        let item = harness.work_store.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(item.claim.status, ItemStatus::Completed);
    }

    // ============================================================
    // TEST 3: Results and notifications
    // ============================================================

    #[tokio::test]
    async fn test_runner_report_queues_notifications_with_previous_status() {
        // ARRANGE: An earlier passing result for the same package
        let harness = Harness::new(AttemptPolicy::work());
        harness
            .results
            .record_test(TestResult {
                work_id: ItemId::new(),
                attempt_id: AttemptId::new(),
                import_path: "example.org/a".to_string(),
                revision: "0000001".to_string(),
                rev_date: None,
                when: Utc::now() - TimeDelta::hours(1),
                output: String::new(),
                status: TestStatus::Pass,
            })
            .await
            .unwrap();
        let (id, attempt) = claimed(&harness).await;

        let mut failing = passing("example.org/a");
        failing.output = "FAIL\n".to_string();
        failing.notify = Some(NotifyConfig {
            notify_url: "http://hook".to_string(),
            notify_chat: String::new(),
            notify_on: NotifyOn::Change,
        });
        let quiet = passing("example.org/b");

        // ACT
        harness
            .collector
            .post(runner_response(&id, &attempt, vec![failing, quiet]))
            .await
            .unwrap();

        // ASSERT: Both results stored, one notification queued
        let tests = harness.results.test_results();
        assert_eq!(tests.len(), 3);
        assert_eq!(
            harness
                .results
                .previous_status("example.org/a", &AttemptId::new())
                .await
                .unwrap(),
            Some(TestStatus::Fail)
        );

        let queued = harness.notification_store.all();
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].previous, Some(TestStatus::Pass));
        assert_eq!(queued[0].test.status, TestStatus::Fail);
        assert_eq!(queued[0].claim.status, ItemStatus::Waiting);

        // ACT: Deliver it
        harness.notifications.reconcile().await.unwrap();

        // ASSERT
        let sent = harness.sender.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "http://hook");
        assert_eq!(sent[0].1.import_path, "example.org/a");
    }

    fn notifying(path: &str) -> TestOutput {
        let mut out = passing(path);
        out.notify = Some(NotifyConfig {
            notify_url: "http://hook".to_string(),
            notify_chat: String::new(),
            notify_on: NotifyOn::Always,
        });
        out
    }

    // ============================================================
    // TEST 4: Failed writes and retried reports
    // ============================================================

    #[tokio::test]
    async fn test_failed_work_write_leaves_item_open_for_retry() {
        // ARRANGE: The result store rejects the first work result
        let harness = Harness::new(AttemptPolicy::work());
        let results = FlakyResultStore::new();
        let collector = harness.collector_with(results.clone());
        let (id, attempt) = claimed(&harness).await;
        results.fail_next_work();
        let response = runner_response(&id, &attempt, vec![notifying("example.org/project")]);

        // ACT
        let first = collector.post(response.clone()).await;

        // ASSERT: The worker sees an error and the item is still open
        assert!(matches!(first, Err(StoreError::Backend(_))));
        let open = harness.work_store.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(open.claim.status, ItemStatus::Processing);
        assert!(results.inner().work_results().is_empty());
        assert!(harness.notification_store.is_empty());

        // ACT: The worker retries the same report
        let retry = collector.post(response).await.unwrap();

        // ASSERT
        assert_eq!(retry, Outcome::Accepted);
        let done = harness.work_store.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(done.claim.status, ItemStatus::Completed);
        assert_eq!(results.inner().work_results().len(), 1);
        assert_eq!(results.inner().test_results().len(), 1);
        assert_eq!(harness.notification_store.len(), 1);
    }

    #[tokio::test]
    async fn test_partial_test_write_is_completed_by_retry_without_duplicates() {
        // ARRANGE: The second package's result fails once
        let harness = Harness::new(AttemptPolicy::work());
        let results = FlakyResultStore::new();
        let collector = harness.collector_with(results.clone());
        let (id, attempt) = claimed(&harness).await;
        results.fail_next_test("example.org/b");
        let response = runner_response(
            &id,
            &attempt,
            vec![notifying("example.org/a"), notifying("example.org/b")],
        );

        // ACT
        let first = collector.post(response.clone()).await;
        let retry = collector.post(response).await.unwrap();

        // ASSERT: One copy of each result, notifications queued once
        assert!(first.is_err());
        assert_eq!(retry, Outcome::Accepted);
        assert_eq!(results.inner().work_results().len(), 1);

        let mut paths: Vec<String> = results
            .inner()
            .test_results()
            .into_iter()
            .map(|t| t.import_path)
            .collect();
        paths.sort();
        assert_eq!(paths, vec!["example.org/a", "example.org/b"]);

        let queued = harness.notification_store.all();
        assert_eq!(queued.len(), 2);
        assert!(queued.iter().all(|n| n.previous.is_none()));
    }

    #[tokio::test]
    async fn test_failed_builder_error_write_can_be_retried() {
        // ARRANGE
        let harness = Harness::new(AttemptPolicy::work());
        let results = FlakyResultStore::new();
        let collector = harness.collector_with(results.clone());
        let (id, attempt) = claimed(&harness).await;
        results.fail_next_work();
        let response = BuilderResponse {
            key: id.clone(),
            attempt_id: attempt,
            revision: "4f2a9c1".to_string(),
            rev_date: None,
            error: "clone failed".to_string(),
        };

        // ACT
        let first = collector.error(response.clone()).await;
        let retry = collector.error(response).await.unwrap();

        // ASSERT
        assert!(first.is_err());
        assert_eq!(retry, Outcome::Accepted);
        let results = results.inner().work_results();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].error.as_deref(), Some("clone failed"));
        let done = harness.work_store.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(done.claim.status, ItemStatus::Completed);
    }

    #[tokio::test]
    async fn test_results_are_keyed_by_attempt() {
        // ARRANGE
        let store = MemoryResultStore::new();
        let work_id = ItemId::new();
        let attempt = AttemptId::new();
        let result = |attempt_id: Option<AttemptId>, success: bool| WorkResult {
            work_id: work_id.clone(),
            attempt_id,
            success,
            revision: "4f2a9c1".to_string(),
            rev_date: None,
            when: Utc::now(),
            error: None,
        };

        // ACT: The same attempt twice, then a different attempt
        store.record_work(result(Some(attempt.clone()), false)).await.unwrap();
        store.record_work(result(Some(attempt.clone()), true)).await.unwrap();
        store.record_work(result(Some(AttemptId::new()), true)).await.unwrap();

        // ASSERT: The rewrite replaced the first entry
        let stored = store.work_results();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].attempt_id, Some(attempt));
        assert!(stored[0].success);
    }
}
