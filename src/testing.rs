//! Test doubles shared by the module test suites.

use crate::config::AttemptPolicy;
use crate::dispatch::notification::{Notification, NotificationDispatcher, NotificationSender};
use crate::dispatch::types::{AttemptId, Claimable, ItemId, Mutation};
use crate::dispatch::work::{WorkDispatcher, WorkItem};
use crate::dispatch::{ItemStore, MemoryItemStore, ReconcileEngine};
use crate::error::{RpcError, StoreError};
use crate::queue::BuilderTask;
use crate::response::types::{TestResult, TestStatus, WorkResult};
use crate::response::{MemoryResultStore, ResponseCollector, ResultStore};
use crate::rpc::WorkerClient;
use crate::tracker::types::{Platform, WorkerKind};
use crate::tracker::{LeaseManager, directory::MemoryDirectory, registry::ServiceRegistry};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Records pushes instead of sending them; pings fail for marked URLs.
#[derive(Default)]
pub struct FakeWorkerClient {
    unreachable: Mutex<HashSet<String>>,
    fail_pushes: AtomicBool,
    pushes: Mutex<Vec<(String, BuilderTask)>>,
}

impl FakeWorkerClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn mark_unreachable(&self, url: &str) {
        self.unreachable.lock().unwrap().insert(url.to_string());
    }

    pub fn fail_pushes(&self, fail: bool) {
        self.fail_pushes.store(fail, Ordering::SeqCst);
    }

    pub fn pushes(&self) -> Vec<(String, BuilderTask)> {
        self.pushes.lock().unwrap().clone()
    }
}

#[async_trait]
impl WorkerClient for FakeWorkerClient {
    async fn ping(&self, url: &str) -> Result<(), RpcError> {
        if self.unreachable.lock().unwrap().contains(url) {
            return Err(RpcError::Remote(format!("{} refused connection", url)));
        }
        Ok(())
    }

    async fn push_builder_task(&self, url: &str, task: &BuilderTask) -> Result<(), RpcError> {
        if self.fail_pushes.load(Ordering::SeqCst) {
            return Err(RpcError::Status(503));
        }
        self.pushes
            .lock()
            .unwrap()
            .push((url.to_string(), task.clone()));
        Ok(())
    }
}

/// A lease manager over an empty in-memory directory.
pub fn lease_manager(client: Arc<FakeWorkerClient>) -> (Arc<LeaseManager>, Arc<MemoryDirectory>) {
    let directory = Arc::new(MemoryDirectory::new());
    let manager = LeaseManager::new(directory.clone(), ServiceRegistry::new(), client);
    (manager, directory)
}

/// Announces one builder and one runner on `os/arch`.
pub async fn announce_pair(manager: &LeaseManager, os: &str, arch: &str, name: &str) {
    let platform = Platform::new(os, arch);
    manager
        .announce(platform.clone(), WorkerKind::Builder, &format!("http://{}-builder", name))
        .await
        .unwrap();
    manager
        .announce(platform, WorkerKind::Runner, &format!("http://{}-runner", name))
        .await
        .unwrap();
}

/// Records sends; URLs or chat addresses marked as failing return an error.
#[derive(Default)]
pub struct RecordingSender {
    failing: Mutex<HashSet<String>>,
    sent: Mutex<Vec<(String, TestResult)>>,
}

impl RecordingSender {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_target(&self, target: &str) {
        self.failing.lock().unwrap().insert(target.to_string());
    }

    pub fn sent(&self) -> Vec<(String, TestResult)> {
        self.sent.lock().unwrap().clone()
    }

    fn record(&self, target: &str, test: &TestResult) -> Result<(), String> {
        if self.failing.lock().unwrap().contains(target) {
            return Err(format!("{} rejected the notification", target));
        }
        self.sent
            .lock()
            .unwrap()
            .push((target.to_string(), test.clone()));
        Ok(())
    }
}

#[async_trait]
impl NotificationSender for RecordingSender {
    async fn send_url(&self, url: &str, test: &TestResult) -> Result<(), String> {
        self.record(url, test)
    }

    async fn send_chat(&self, address: &str, test: &TestResult) -> Result<(), String> {
        self.record(address, test)
    }
}

/// An item store where a rival writer lands one mutation right before the
/// next caller's update, at the revision that caller read.
pub struct RivalStore<T: Claimable> {
    inner: Arc<MemoryItemStore<T>>,
    rival: Mutex<Option<Mutation<T::Attempt>>>,
}

impl<T: Claimable> RivalStore<T> {
    pub fn new(inner: Arc<MemoryItemStore<T>>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            rival: Mutex::new(None),
        })
    }

    pub fn rival_next_update(&self, mutation: Mutation<T::Attempt>) {
        *self.rival.lock().unwrap() = Some(mutation);
    }
}

#[async_trait]
impl<T: Claimable> ItemStore<T> for RivalStore<T> {
    async fn insert(&self, item: T) -> Result<(), StoreError> {
        self.inner.insert(item).await
    }

    async fn find_by_id(&self, id: &ItemId) -> Result<Option<T>, StoreError> {
        self.inner.find_by_id(id).await
    }

    async fn find_due(&self, stale_before: DateTime<Utc>) -> Result<Vec<T>, StoreError> {
        self.inner.find_due(stale_before).await
    }

    async fn update(
        &self,
        id: &ItemId,
        expected_revision: u64,
        mutation: Mutation<T::Attempt>,
    ) -> Result<bool, StoreError> {
        let rival = self.rival.lock().unwrap().take();
        if let Some(rival) = rival {
            assert!(self.inner.update(id, expected_revision, rival).await?);
        }
        self.inner.update(id, expected_revision, mutation).await
    }
}

/// A result store whose next writes fail on demand, then recover.
#[derive(Default)]
pub struct FlakyResultStore {
    inner: MemoryResultStore,
    fail_work: AtomicBool,
    failing_tests: Mutex<HashSet<String>>,
}

impl FlakyResultStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn inner(&self) -> &MemoryResultStore {
        &self.inner
    }

    pub fn fail_next_work(&self) {
        self.fail_work.store(true, Ordering::SeqCst);
    }

    /// Fails the next test result recorded for `import_path`.
    pub fn fail_next_test(&self, import_path: &str) {
        self.failing_tests
            .lock()
            .unwrap()
            .insert(import_path.to_string());
    }
}

#[async_trait]
impl ResultStore for FlakyResultStore {
    async fn record_work(&self, result: WorkResult) -> Result<(), StoreError> {
        if self.fail_work.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Backend("results unavailable".to_string()));
        }
        self.inner.record_work(result).await
    }

    async fn record_test(&self, result: TestResult) -> Result<(), StoreError> {
        let failing = self
            .failing_tests
            .lock()
            .unwrap()
            .remove(&result.import_path);
        if failing {
            return Err(StoreError::Backend("results unavailable".to_string()));
        }
        self.inner.record_test(result).await
    }

    async fn previous_status(
        &self,
        import_path: &str,
        excluding: &AttemptId,
    ) -> Result<Option<TestStatus>, StoreError> {
        self.inner.previous_status(import_path, excluding).await
    }
}

pub const RESPONSE_URL: &str = "http://orchestrator/response/post";

/// The orchestrator's components wired over in-memory stores and fakes.
pub struct Harness {
    pub client: Arc<FakeWorkerClient>,
    pub sender: Arc<RecordingSender>,
    pub leases: Arc<LeaseManager>,
    pub work_store: Arc<MemoryItemStore<WorkItem>>,
    pub work: Arc<ReconcileEngine<WorkItem>>,
    pub notification_store: Arc<MemoryItemStore<Notification>>,
    pub notifications: Arc<ReconcileEngine<Notification>>,
    pub results: Arc<MemoryResultStore>,
    pub collector: Arc<ResponseCollector>,
}

impl Harness {
    pub fn new(work_policy: AttemptPolicy) -> Self {
        let client = FakeWorkerClient::new();
        let sender = RecordingSender::new();
        let (leases, _) = lease_manager(client.clone());
        let results = Arc::new(MemoryResultStore::new());

        let work_store = Arc::new(MemoryItemStore::new());
        let work = ReconcileEngine::<WorkItem>::new(
            "work",
            work_store.clone(),
            WorkDispatcher::new(leases.clone(), client.clone(), results.clone(), RESPONSE_URL),
            work_policy,
        );

        let notification_store = Arc::new(MemoryItemStore::new());
        let notifications = ReconcileEngine::<Notification>::new(
            "notification",
            notification_store.clone(),
            NotificationDispatcher::new(sender.clone()),
            AttemptPolicy::notifications(),
        );

        let collector =
            ResponseCollector::new(work_store.clone(), notifications.clone(), results.clone());

        Self {
            client,
            sender,
            leases,
            work_store,
            work,
            notification_store,
            notifications,
            results,
            collector,
        }
    }

    /// A collector over the harness stores that records into `results`.
    pub fn collector_with(&self, results: Arc<dyn ResultStore>) -> Arc<ResponseCollector> {
        ResponseCollector::new(self.work_store.clone(), self.notifications.clone(), results)
    }

    /// A work engine over `store` sharing the harness leases, client and results.
    pub fn work_engine_over(
        &self,
        store: Arc<dyn ItemStore<WorkItem>>,
        policy: AttemptPolicy,
    ) -> Arc<ReconcileEngine<WorkItem>> {
        ReconcileEngine::<WorkItem>::new(
            "work",
            store,
            WorkDispatcher::new(
                self.leases.clone(),
                self.client.clone(),
                self.results.clone(),
                RESPONSE_URL,
            ),
            policy,
        )
    }
}
