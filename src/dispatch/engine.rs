//! Reconciliation Engine
//!
//! Moves claimable items through `Waiting -> Processing -> Completed/Error`.
//! A pass scans the store for due items and, for each one, either retires it
//! (attempts exhausted) or claims it with a revision-guarded update before handing
//! it to its [`Dispatcher`].
//!
//! ## Concurrency
//! Passes may overlap: timer ticks, explicit triggers and other orchestrator
//! processes all run the same loop. No lock is taken. Two passes racing on one
//! item both issue `update(id, revision, ..)` and exactly one of them wins; the
//! loser drops its attempt record and moves on.
//!
//! ## Failure handling
//! - A failure on one candidate never aborts the pass; it is logged and kept in
//!   the [`ReconcileReport`].
//! - A failure to query the store aborts the pass; the next tick retries.
//! - A failed handoff after a successful claim leaves the item `Processing`. The
//!   attempt timeout is the only recovery path.

use super::store::ItemStore;
use super::types::*;
use crate::config::AttemptPolicy;
use crate::error::{DispatchError, StoreError};

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

/// How a dispatcher finished handing off a claimed item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Handed to a remote worker; completion arrives later via a response.
    Handed,
    /// The work is already done; the engine completes the item in this pass.
    Finished,
}

/// Entity-specific half of the engine.
#[async_trait]
pub trait Dispatcher<T: Claimable>: Send + Sync {
    /// Picks resources for a new attempt starting at `now`. Must not touch the store.
    async fn prepare(&self, item: &T, now: DateTime<Utc>) -> Result<T::Attempt, DispatchError>;

    /// Hands off an item this pass has just claimed under `attempt`.
    async fn deliver(&self, item: &T, attempt: &T::Attempt) -> Result<Delivery, DispatchError>;

    /// Message stored on an item that ran out of attempts.
    fn exhausted_message(&self, item: &T, max_attempts: usize) -> String;

    /// Called exactly once per item, by the pass that moved it to `Error`.
    async fn exhausted(&self, item: &T, message: &str);
}

/// Outcome of a single reconciliation pass.
#[derive(Debug, Default)]
pub struct ReconcileReport {
    pub claimed: Vec<ItemId>,
    pub completed: Vec<ItemId>,
    pub exhausted: Vec<ItemId>,
    /// Candidates another writer changed first.
    pub contended: usize,
    pub failures: Vec<(ItemId, DispatchError)>,
}

impl ReconcileReport {
    /// The first candidate failure of the pass, in scan order.
    pub fn first_error(&self) -> Option<&DispatchError> {
        self.failures.first().map(|(_, error)| error)
    }

    pub fn is_idle(&self) -> bool {
        self.claimed.is_empty()
            && self.completed.is_empty()
            && self.exhausted.is_empty()
            && self.failures.is_empty()
            && self.contended == 0
    }
}

enum ClaimOutcome {
    Claimed,
    Finished,
    Contended,
}

pub struct ReconcileEngine<T: Claimable> {
    name: &'static str,
    store: Arc<dyn ItemStore<T>>,
    dispatcher: Arc<dyn Dispatcher<T>>,
    policy: AttemptPolicy,
    wake: Notify,
}

impl<T: Claimable> ReconcileEngine<T> {
    pub fn new(
        name: &'static str,
        store: Arc<dyn ItemStore<T>>,
        dispatcher: Arc<dyn Dispatcher<T>>,
        policy: AttemptPolicy,
    ) -> Arc<Self> {
        Arc::new(Self {
            name,
            store,
            dispatcher,
            policy,
            wake: Notify::new(),
        })
    }

    pub fn store(&self) -> &Arc<dyn ItemStore<T>> {
        &self.store
    }

    /// Asks the background loop for an early pass. Safe to call any number of times.
    pub fn trigger(&self) {
        self.wake.notify_one();
    }

    /// Spawns the background loop: one pass per `interval` tick or trigger.
    pub fn start(self: Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        tracing::info!(
            "Starting {} reconciliation every {:?}",
            self.name,
            interval
        );

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = self.wake.notified() => {}
                }

                match self.reconcile().await {
                    Ok(report) if report.is_idle() => {
                        tracing::trace!("{} pass found nothing to do", self.name);
                    }
                    Ok(report) => {
                        tracing::info!(
                            "{} pass: {} claimed, {} completed, {} exhausted, {} contended, {} failed",
                            self.name,
                            report.claimed.len(),
                            report.completed.len(),
                            report.exhausted.len(),
                            report.contended,
                            report.failures.len()
                        );
                    }
                    Err(e) => {
                        tracing::error!("{} pass aborted: {}", self.name, e);
                    }
                }
            }
        })
    }

    pub async fn reconcile(&self) -> Result<ReconcileReport, StoreError> {
        self.reconcile_at(Utc::now()).await
    }

    /// Runs one pass as if the clock read `now`.
    pub async fn reconcile_at(&self, now: DateTime<Utc>) -> Result<ReconcileReport, StoreError> {
        let timeout = TimeDelta::from_std(self.policy.attempt_timeout()).unwrap_or(TimeDelta::MAX);
        let stale_before = now.checked_sub_signed(timeout).unwrap_or(DateTime::<Utc>::MIN_UTC);

        let candidates = self.store.find_due(stale_before).await?;
        let mut report = ReconcileReport::default();

        for item in candidates {
            let id = item.id().clone();

            if item.claim().attempt_log.len() >= self.policy.max_attempts {
                match self.retire(&item).await {
                    Ok(true) => report.exhausted.push(id),
                    Ok(false) => report.contended += 1,
                    Err(e) => {
                        tracing::warn!("Failed to retire {} {}: {}", self.name, id, e);
                        report.failures.push((id, e));
                    }
                }
                continue;
            }

            match self.dispatch_item(&item, now).await {
                Ok(ClaimOutcome::Claimed) => report.claimed.push(id),
                Ok(ClaimOutcome::Finished) => {
                    report.claimed.push(id.clone());
                    report.completed.push(id);
                }
                Ok(ClaimOutcome::Contended) => report.contended += 1,
                Err(e) => {
                    tracing::warn!("Error dispatching {} {}: {}", self.name, id, e);
                    report.failures.push((id, e));
                }
            }
        }

        Ok(report)
    }

    /// Moves an exhausted item to `Error`. Only the winner of the revision race
    /// reports the failure outward.
    async fn retire(&self, item: &T) -> Result<bool, DispatchError> {
        let message = self
            .dispatcher
            .exhausted_message(item, self.policy.max_attempts);

        tracing::info!("{} {} had too many attempts", self.name, item.id());

        let applied = self
            .store
            .update(
                item.id(),
                item.claim().revision,
                Mutation::Fail {
                    message: message.clone(),
                },
            )
            .await?;

        if !applied {
            tracing::info!("Lost race retiring {} {}", self.name, item.id());
            return Ok(false);
        }

        self.dispatcher.exhausted(item, &message).await;
        Ok(true)
    }

    async fn dispatch_item(
        &self,
        item: &T,
        now: DateTime<Utc>,
    ) -> Result<ClaimOutcome, DispatchError> {
        // Nothing is written until resources are secured.
        let attempt = self.dispatcher.prepare(item, now).await?;

        let claim = Mutation::Claim {
            attempt: attempt.clone(),
        };
        let applied = self
            .store
            .update(item.id(), item.claim().revision, claim.clone())
            .await?;

        if !applied {
            tracing::info!("Lost the race dispatching {} {}", self.name, item.id());
            return Ok(ClaimOutcome::Contended);
        }

        let mut claimed = item.clone();
        claimed.claim_mut().apply(claim);

        tracing::debug!(
            "Claimed {} {} with attempt {} (revision {})",
            self.name,
            item.id(),
            attempt.attempt_id(),
            claimed.claim().revision
        );

        match self.dispatcher.deliver(&claimed, &attempt).await? {
            Delivery::Handed => Ok(ClaimOutcome::Claimed),
            Delivery::Finished => {
                let applied = self
                    .store
                    .update(item.id(), claimed.claim().revision, Mutation::Complete)
                    .await?;
                if applied {
                    Ok(ClaimOutcome::Finished)
                } else {
                    tracing::info!(
                        "Lost the race setting {} {} to complete",
                        self.name,
                        item.id()
                    );
                    Ok(ClaimOutcome::Claimed)
                }
            }
        }
    }
}
