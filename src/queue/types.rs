use super::handoff::HandoffQueue;
use crate::dispatch::types::{AttemptId, ItemId};
use crate::dispatch::work::Work;
use serde::{Deserialize, Serialize};

/// What the orchestrator hands a builder for one attempt. Immutable once built.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BuilderTask {
    pub work: Work,
    /// Work item the attempt belongs to; forwarded to the runner.
    pub key: ItemId,
    pub attempt_id: AttemptId,
    /// Base URL of the runner leased together with this builder.
    pub runner: String,
    /// Where the runner (or the builder, on failure) posts its report.
    pub response: String,
}

/// What a builder hands its paired runner once binaries are packaged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunnerTask {
    pub key: ItemId,
    pub attempt_id: AttemptId,
    pub import_path: String,
    /// Where the runner downloads the compiled test binaries.
    pub artifact_url: String,
    pub response: String,
}

pub type BuilderQueue = HandoffQueue<BuilderTask>;
pub type RunnerQueue = HandoffQueue<RunnerTask>;

/// Body of a pop request.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PopRequest {
    /// Overrides the server's default wait, in seconds.
    pub wait_secs: Option<u64>,
}

/// The two queues a worker process hosts, shared with the RPC handlers.
pub struct WorkerQueues {
    pub builder: BuilderQueue,
    pub runner: RunnerQueue,
    /// Default wait for pop requests that do not name one.
    pub pop_wait: std::time::Duration,
}

impl WorkerQueues {
    pub fn new(pop_wait: std::time::Duration) -> std::sync::Arc<Self> {
        std::sync::Arc::new(Self {
            builder: HandoffQueue::new(),
            runner: HandoffQueue::new(),
            pop_wait,
        })
    }
}
