//! Work Items
//!
//! A work item asks for one source revision to be built and tested. Dispatching
//! it leases a builder/runner pair, records the attempt and pushes a
//! [`BuilderTask`] to the builder's queue; completion arrives later through the
//! response collector.

use super::engine::{Delivery, Dispatcher, ReconcileEngine};
use super::types::*;
use crate::error::{DispatchError, StoreError};
use crate::queue::BuilderTask;
use crate::response::results::ResultStore;
use crate::response::types::WorkResult;
use crate::rpc::WorkerClient;
use crate::tracker::LeaseManager;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// What to build and test.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Work {
    pub revision: String,
    pub import_path: String,
    /// Also test every package below `import_path`.
    #[serde(default)]
    pub subpackages: bool,
    /// Version control system to fetch with; empty means detect.
    #[serde(default)]
    pub vcs_hint: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkAttempt {
    pub id: AttemptId,
    pub started_at: DateTime<Utc>,
    /// Base URL of the leased builder.
    pub builder: String,
    pub runner: String,
}

impl AttemptRecord for WorkAttempt {
    fn attempt_id(&self) -> &AttemptId {
        &self.id
    }

    fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkItem {
    pub id: ItemId,
    pub work: Work,
    /// The submission as received, kept for debugging.
    pub raw_data: serde_json::Value,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub claim: ClaimState<WorkAttempt>,
}

impl WorkItem {
    pub fn new(work: Work, raw_data: serde_json::Value) -> Self {
        Self {
            id: ItemId::new(),
            work,
            raw_data,
            created_at: Utc::now(),
            claim: ClaimState::waiting(),
        }
    }
}

impl Claimable for WorkItem {
    type Attempt = WorkAttempt;

    fn id(&self) -> &ItemId {
        &self.id
    }

    fn claim(&self) -> &ClaimState<WorkAttempt> {
        &self.claim
    }

    fn claim_mut(&mut self) -> &mut ClaimState<WorkAttempt> {
        &mut self.claim
    }
}

/// Stores a new `Waiting` item and wakes the reconciliation loop.
pub async fn enqueue(
    engine: &ReconcileEngine<WorkItem>,
    work: Work,
    raw_data: serde_json::Value,
) -> Result<ItemId, StoreError> {
    let item = WorkItem::new(work, raw_data);
    let id = item.id.clone();

    engine.store().insert(item).await?;
    tracing::info!("Enqueued work item {}", id);

    engine.trigger();
    Ok(id)
}

pub struct WorkDispatcher {
    leases: Arc<LeaseManager>,
    client: Arc<dyn WorkerClient>,
    results: Arc<dyn ResultStore>,
    /// Callback address handed to workers.
    response_url: String,
}

impl WorkDispatcher {
    pub fn new(
        leases: Arc<LeaseManager>,
        client: Arc<dyn WorkerClient>,
        results: Arc<dyn ResultStore>,
        response_url: impl Into<String>,
    ) -> Arc<Self> {
        Arc::new(Self {
            leases,
            client,
            results,
            response_url: response_url.into(),
        })
    }
}

#[async_trait]
impl Dispatcher<WorkItem> for WorkDispatcher {
    async fn prepare(
        &self,
        _item: &WorkItem,
        now: DateTime<Utc>,
    ) -> Result<WorkAttempt, DispatchError> {
        let pair = self.leases.lease_pair().await?;

        Ok(WorkAttempt {
            id: AttemptId::new(),
            started_at: now,
            builder: pair.builder.url,
            runner: pair.runner.url,
        })
    }

    async fn deliver(
        &self,
        item: &WorkItem,
        attempt: &WorkAttempt,
    ) -> Result<Delivery, DispatchError> {
        let task = BuilderTask {
            work: item.work.clone(),
            key: item.id.clone(),
            attempt_id: attempt.id.clone(),
            runner: attempt.runner.clone(),
            response: self.response_url.clone(),
        };

        self.client
            .push_builder_task(&attempt.builder, &task)
            .await?;

        tracing::info!(
            "Dispatched work item {} to builder {}",
            item.id,
            attempt.builder
        );
        Ok(Delivery::Handed)
    }

    fn exhausted_message(&self, _item: &WorkItem, max_attempts: usize) -> String {
        format!("unable to complete work item after {} attempts", max_attempts)
    }

    async fn exhausted(&self, item: &WorkItem, message: &str) {
        let result = WorkResult {
            work_id: item.id.clone(),
            attempt_id: item.claim.latest_attempt().map(|a| a.id.clone()),
            success: false,
            revision: item.work.revision.clone(),
            rev_date: None,
            when: Utc::now(),
            error: Some(message.to_string()),
        };

        if let Err(e) = self.results.record_work(result).await {
            tracing::error!("Failed to record exhaustion of {}: {}", item.id, e);
        }
    }
}
