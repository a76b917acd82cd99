//! Dispatch Module
//!
//! Reliable handoff of claimable items to workers without locks.
//!
//! ## Architecture Overview
//! 1. **Enqueue**: clients store a `Waiting` work item and wake the engine.
//! 2. **Reconcile**: a pass finds due items (waiting, or processing with a stale
//!    latest attempt).
//! 3. **Claim**: the engine prepares an attempt, then moves the item to
//!    `Processing` with a revision-guarded update. Losing the race is not an error.
//! 4. **Deliver**: work items are pushed to the leased builder; notifications are
//!    sent in place.
//! 5. **Retire**: an item that already used every attempt is moved to `Error`.
//!
//! ## Submodules
//! - **`types`**: ids, statuses, the shared claim state and the `Claimable` trait.
//! - **`store`**: the durable item store contract with its in-memory backend.
//! - **`engine`**: the generic reconciliation engine.
//! - **`work`** / **`notification`**: the two claimable entities and their dispatchers.

pub mod types;
pub mod protocol;
pub mod store;
pub mod engine;
pub mod work;
pub mod notification;
pub mod handlers;

pub use engine::{Delivery, Dispatcher, ReconcileEngine, ReconcileReport};
pub use store::{ItemStore, MemoryItemStore};
