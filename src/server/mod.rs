//! Process Wiring
//!
//! Builds the orchestrator's components over in-memory stores and exposes the
//! HTTP routers of both process kinds. The binaries and the end-to-end tests
//! share this wiring.

use crate::config::OrchestratorConfig;
use crate::dispatch::handlers::*;
use crate::dispatch::notification::{Notification, NotificationDispatcher, NotificationSender};
use crate::dispatch::protocol::*;
use crate::dispatch::work::{WorkDispatcher, WorkItem};
use crate::dispatch::{MemoryItemStore, ReconcileEngine};
use crate::queue::WorkerQueues;
use crate::queue::handlers::*;
use crate::queue::protocol::*;
use crate::response::handlers::{handle_error, handle_post};
use crate::response::protocol::{ENDPOINT_RESPONSE_ERROR, ENDPOINT_RESPONSE_POST};
use crate::response::{MemoryResultStore, ResponseCollector, ResultStore};
use crate::rpc::handlers::handle_ping;
use crate::rpc::protocol::{ENDPOINT_PING, endpoint_url};
use crate::rpc::{HttpRpcClient, WorkerClient};
use crate::tracker::LeaseManager;
use crate::tracker::directory::MemoryDirectory;
use crate::tracker::handlers::{handle_announce, handle_lease, handle_remove};
use crate::tracker::protocol::{ENDPOINT_ANNOUNCE, ENDPOINT_LEASE, ENDPOINT_REMOVE};
use crate::tracker::registry::ServiceRegistry;

use axum::{
    Router,
    extract::Extension,
    routing::{get, post},
};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

pub struct Orchestrator {
    pub leases: Arc<LeaseManager>,
    pub work: Arc<ReconcileEngine<WorkItem>>,
    pub notifications: Arc<ReconcileEngine<Notification>>,
    pub collector: Arc<ResponseCollector>,
    pub results: Arc<dyn ResultStore>,
}

impl Orchestrator {
    /// Wires every component over in-memory stores.
    pub fn in_memory(config: &OrchestratorConfig, sender: Arc<dyn NotificationSender>) -> Self {
        let client: Arc<dyn WorkerClient> = Arc::new(HttpRpcClient::new(&config.rpc));
        let leases = LeaseManager::new(
            Arc::new(MemoryDirectory::new()),
            ServiceRegistry::new(),
            client.clone(),
        );
        let results: Arc<dyn ResultStore> = Arc::new(MemoryResultStore::new());

        let work_store = Arc::new(MemoryItemStore::<WorkItem>::new());
        let work = ReconcileEngine::<WorkItem>::new(
            "work",
            work_store.clone(),
            WorkDispatcher::new(
                leases.clone(),
                client,
                results.clone(),
                endpoint_url(&config.public_url, ENDPOINT_RESPONSE_POST),
            ),
            config.work.clone(),
        );

        let notifications = ReconcileEngine::<Notification>::new(
            "notification",
            Arc::new(MemoryItemStore::<Notification>::new()),
            NotificationDispatcher::new(sender),
            config.notifications.clone(),
        );

        let collector = ResponseCollector::new(work_store, notifications.clone(), results.clone());

        Self {
            leases,
            work,
            notifications,
            collector,
            results,
        }
    }

    /// Spawns both reconciliation loops.
    pub fn start(&self, interval: Duration) -> Vec<JoinHandle<()>> {
        vec![
            self.work.clone().start(interval),
            self.notifications.clone().start(interval),
        ]
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route(ENDPOINT_PING, post(handle_ping))
            .route(ENDPOINT_ANNOUNCE, post(handle_announce))
            .route(ENDPOINT_REMOVE, post(handle_remove))
            .route(ENDPOINT_LEASE, post(handle_lease))
            .route(ENDPOINT_WORK, post(handle_enqueue))
            .route(ENDPOINT_WORK_STATUS, get(handle_work_status))
            .route(ENDPOINT_DISPATCH_WORK, post(handle_dispatch_work))
            .route(
                ENDPOINT_DISPATCH_NOTIFICATIONS,
                post(handle_dispatch_notifications),
            )
            .route(ENDPOINT_RESPONSE_POST, post(handle_post))
            .route(ENDPOINT_RESPONSE_ERROR, post(handle_error))
            .layer(Extension(self.leases.clone()))
            .layer(Extension(self.work.clone()))
            .layer(Extension(self.notifications.clone()))
            .layer(Extension(self.collector.clone()))
    }
}

/// Routes of a worker process: its two queues and the liveness check.
pub fn worker_router(queues: Arc<WorkerQueues>) -> Router {
    Router::new()
        .route(ENDPOINT_PING, post(handle_ping))
        .route(ENDPOINT_BUILDER_PUSH, post(handle_builder_push))
        .route(ENDPOINT_BUILDER_POP, post(handle_builder_pop))
        .route(ENDPOINT_RUNNER_PUSH, post(handle_runner_push))
        .route(ENDPOINT_RUNNER_POP, post(handle_runner_pop))
        .layer(Extension(queues))
}
