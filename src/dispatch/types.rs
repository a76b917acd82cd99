use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier of a claimable item (work item or notification).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ItemId(pub String);

impl ItemId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Random identifier of one dispatch attempt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct AttemptId(pub String);

impl AttemptId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for AttemptId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AttemptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle of a claimable item.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    /// Enqueued, never claimed.
    Waiting,
    /// Claimed by an attempt; reclaimable once that attempt times out.
    Processing,
    /// Terminal: a worker reported back (or delivery finished).
    Completed,
    /// Terminal: dispatch attempts were exhausted.
    Error,
}

impl ItemStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, ItemStatus::Completed | ItemStatus::Error)
    }
}

/// One recorded try at dispatching an item.
pub trait AttemptRecord: Clone + Send + Sync + 'static {
    fn attempt_id(&self) -> &AttemptId;
    fn started_at(&self) -> DateTime<Utc>;
}

/// The fields every claimable item shares, guarded by the `revision` fence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClaimState<A> {
    pub status: ItemStatus,
    /// Most recent attempt first.
    pub attempt_log: Vec<A>,
    /// Fencing token: every applied mutation increments it by one.
    pub revision: u64,
    /// Set when the item ends in `Error`.
    pub error: Option<String>,
}

impl<A: AttemptRecord> ClaimState<A> {
    pub fn waiting() -> Self {
        Self {
            status: ItemStatus::Waiting,
            attempt_log: Vec::new(),
            revision: 0,
            error: None,
        }
    }

    pub fn latest_attempt(&self) -> Option<&A> {
        self.attempt_log.first()
    }

    /// Waiting items are always due; processing items are due once their latest
    /// attempt started before `stale_before`.
    pub fn is_due(&self, stale_before: DateTime<Utc>) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        if self.status == ItemStatus::Waiting {
            return true;
        }
        self.latest_attempt()
            .map(|attempt| attempt.started_at() < stale_before)
            .unwrap_or(true)
    }

    /// Applies a mutation and advances the revision. Callers must have checked
    /// the expected revision first.
    pub fn apply(&mut self, mutation: Mutation<A>) {
        match mutation {
            Mutation::Claim { attempt } => {
                self.attempt_log.insert(0, attempt);
                self.status = ItemStatus::Processing;
            }
            Mutation::Complete => {
                self.status = ItemStatus::Completed;
            }
            Mutation::Fail { message } => {
                self.status = ItemStatus::Error;
                self.error = Some(message);
            }
        }
        self.revision += 1;
    }
}

/// A revision-guarded state change, as sent to the item store.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation<A> {
    /// Prepend `attempt` to the log and move to `Processing`.
    Claim { attempt: A },
    /// Move to `Completed`.
    Complete,
    /// Move to `Error` with a message.
    Fail { message: String },
}

/// An entity the reconciliation engine can claim, dispatch and retire.
pub trait Claimable: Clone + Send + Sync + 'static {
    type Attempt: AttemptRecord;

    fn id(&self) -> &ItemId;
    fn claim(&self) -> &ClaimState<Self::Attempt>;
    fn claim_mut(&mut self) -> &mut ClaimState<Self::Attempt>;
}
