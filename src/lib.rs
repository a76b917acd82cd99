//! CI Dispatch Orchestrator Library
//!
//! Hands build-and-test work items to a changing pool of remote builders and
//! runners, with at most one active attempt per item, bounded retries and load
//! spread across workers of the same platform.
//!
//! ## Architecture Modules
//! - **`dispatch`**: the reconciliation engine. Claims due items with
//!   revision-guarded updates and hands them off; retires items that ran out of
//!   attempts. Drives both work items and notifications.
//! - **`tracker`**: the worker pool. Announce, remove and round-robin leasing of
//!   platform-matched builder/runner pairs.
//! - **`queue`**: the unbounded handoff queues every worker hosts, reachable over RPC.
//! - **`response`**: closes out work items when workers report back and records results.
//! - **`rpc`**: JSON-over-HTTP transport shared by all of the above.
//! - **`server`**: process wiring and routers for both binaries.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod queue;
pub mod response;
pub mod rpc;
pub mod server;
pub mod tracker;

#[cfg(test)]
pub(crate) mod testing;
