//! Worker Handoff Queues
//!
//! Decouples "the orchestrator handed this attempt to a worker" from "the worker
//! picked it up". Every worker process hosts one [`BuilderQueue`] and one
//! [`RunnerQueue`] and exposes them as push/pop RPC endpoints:
//! - the dispatch engine pushes builder tasks,
//! - builders pop them, build, and push runner tasks to their paired runner,
//! - runners pop those and post results back to the orchestrator.
//!
//! Contents are not persisted. A lost task is recovered by the orchestrator's
//! attempt timeout.

pub mod handoff;
pub mod types;
pub mod protocol;
pub mod handlers;

pub use handoff::HandoffQueue;
pub use types::{BuilderQueue, BuilderTask, RunnerQueue, RunnerTask, WorkerQueues};
