//! Error Taxonomy
//!
//! Typed errors for the orchestrator's failure classes. Contention (a lost revision
//! race) has no variant: store updates report it as `Ok(false)`.
//!
//! - **Validation**: bad announce arguments, rejected before any state changes.
//! - **Unreachable**: a worker failed a ping or push round-trip.
//! - **Unavailable**: no worker matches a lease request.
//!
//! Exhaustion is not an error value either: the engine records it as the item's
//! terminal `Error` status and message.

use thiserror::Error;

/// Failures raised by the tracker (announce, remove, lease).
#[derive(Debug, Error)]
pub enum LeaseError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("worker at {url} is unreachable: {source}")]
    Unreachable {
        url: String,
        #[source]
        source: RpcError,
    },

    #[error("no such worker: {0}")]
    NotFound(String),

    #[error("no services available")]
    NoneAvailable,

    #[error("worker directory failure: {0}")]
    Directory(String),
}

/// Failures of the durable item store, other than revision mismatches.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("item {0} not found")]
    NotFound(String),

    #[error("store backend failure: {0}")]
    Backend(String),
}

/// Failures of a single RPC round-trip.
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("remote returned status {0}")]
    Status(u16),

    #[error("remote error: {0}")]
    Remote(String),
}

/// Failures while dispatching one claimable item.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Lease(#[from] LeaseError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("handoff failed: {0}")]
    Handoff(#[from] RpcError),

    #[error("delivery failed: {0}")]
    Delivery(String),
}
