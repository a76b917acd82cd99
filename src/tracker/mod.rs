//! Tracker
//!
//! Keeps the pool of announced builders and runners and leases platform-matched
//! pairs of them to the dispatch engine.
//!
//! ## Submodules
//! - **`directory`**: storage contract for worker records, with an in-memory backend.
//! - **`registry`**: per-query lease cursors, advisory only.
//! - **`manager`**: announce, remove and the pairing algorithm.
//! - **`protocol`** / **`handlers`**: the tracker's RPC surface.

pub mod types;
pub mod protocol;
pub mod directory;
pub mod registry;
pub mod manager;
pub mod handlers;

pub use manager::LeaseManager;
