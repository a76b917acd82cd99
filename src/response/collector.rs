//! Response Collector
//!
//! Closes out work items when a worker reports back. A report is accepted only
//! while the item is `Processing` under the reported attempt; anything else (a
//! duplicate post, a late report from a reclaimed attempt) is ignored without
//! error. Results are written before the item is completed, so a failed write
//! leaves the item `Processing` and the worker's retry can finish the job.
//! Notifications are queued only by the report that wins the revision race.

use super::results::ResultStore;
use super::types::*;
use crate::dispatch::engine::ReconcileEngine;
use crate::dispatch::notification::Notification;
use crate::dispatch::store::ItemStore;
use crate::dispatch::types::{AttemptId, ItemId, ItemStatus, Mutation};
use crate::dispatch::work::WorkItem;
use crate::error::StoreError;

use chrono::Utc;
use std::sync::Arc;

/// What happened to a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The report completed the item.
    Accepted,
    /// Duplicate, late or stale; nothing changed.
    Ignored,
}

pub struct ResponseCollector {
    work: Arc<dyn ItemStore<WorkItem>>,
    notifications: Arc<ReconcileEngine<Notification>>,
    results: Arc<dyn ResultStore>,
}

impl ResponseCollector {
    pub fn new(
        work: Arc<dyn ItemStore<WorkItem>>,
        notifications: Arc<ReconcileEngine<Notification>>,
        results: Arc<dyn ResultStore>,
    ) -> Arc<Self> {
        Arc::new(Self {
            work,
            notifications,
            results,
        })
    }

    /// Records a runner's test outputs.
    pub async fn post(&self, response: RunnerResponse) -> Result<Outcome, StoreError> {
        let Some(item) = self.eligible(&response.key, &response.attempt_id).await? else {
            return Ok(Outcome::Ignored);
        };

        let when = Utc::now();
        self.results
            .record_work(WorkResult {
                work_id: response.key.clone(),
                attempt_id: Some(response.attempt_id.clone()),
                success: true,
                revision: response.revision.clone(),
                rev_date: response.rev_date,
                when,
                error: None,
            })
            .await?;

        let mut pending = Vec::new();
        for out in response.tests {
            let previous = self
                .results
                .previous_status(&out.import_path, &response.attempt_id)
                .await?;
            let test = TestResult {
                work_id: response.key.clone(),
                attempt_id: response.attempt_id.clone(),
                status: out.status(),
                import_path: out.import_path,
                revision: response.revision.clone(),
                rev_date: response.rev_date,
                when,
                output: out.output,
            };
            self.results.record_test(test.clone()).await?;

            if let Some(config) = out.notify {
                pending.push(Notification::new(test, previous, config));
            }
        }

        if self.complete(&item).await? == Outcome::Ignored {
            return Ok(Outcome::Ignored);
        }

        if !pending.is_empty() {
            let queued = pending.len();
            for notification in pending {
                let id = notification.id.clone();
                if let Err(e) = self.notifications.store().insert(notification).await {
                    tracing::error!("Failed to queue notification {}: {}", id, e);
                }
            }
            tracing::debug!("Queued {} notifications for {}", queued, response.key);
            self.notifications.trigger();
        }

        Ok(Outcome::Accepted)
    }

    /// Records a builder's tool-level failure.
    pub async fn error(&self, response: BuilderResponse) -> Result<Outcome, StoreError> {
        let Some(item) = self.eligible(&response.key, &response.attempt_id).await? else {
            return Ok(Outcome::Ignored);
        };

        tracing::warn!("Work item {} failed to build: {}", response.key, response.error);

        self.results
            .record_work(WorkResult {
                work_id: response.key,
                attempt_id: Some(response.attempt_id),
                success: false,
                revision: response.revision,
                rev_date: response.rev_date,
                when: Utc::now(),
                error: Some(response.error),
            })
            .await?;

        self.complete(&item).await
    }

    /// Returns the item when `attempt_id` is its live attempt.
    async fn eligible(
        &self,
        key: &ItemId,
        attempt_id: &AttemptId,
    ) -> Result<Option<WorkItem>, StoreError> {
        let item = self
            .work
            .find_by_id(key)
            .await?
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;

        if item.claim.status != ItemStatus::Processing {
            tracing::info!("Got a late response for {} ({:?})", key, item.claim.status);
            return Ok(None);
        }

        let current = item.claim.latest_attempt().map(|a| &a.id);
        if current != Some(attempt_id) {
            tracing::info!("Got a response for stale attempt {} of {}", attempt_id, key);
            return Ok(None);
        }

        Ok(Some(item))
    }

    async fn complete(&self, item: &WorkItem) -> Result<Outcome, StoreError> {
        if !self
            .work
            .update(&item.id, item.claim.revision, Mutation::Complete)
            .await?
        {
            tracing::info!("Lost the race completing {}", item.id);
            return Ok(Outcome::Ignored);
        }

        if let Some(attempt) = item.claim.latest_attempt() {
            tracing::info!("Work item {} completed by attempt {}", item.id, attempt.id);
        }
        Ok(Outcome::Accepted)
    }
}
