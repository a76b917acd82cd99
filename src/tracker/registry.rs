//! Lease Cursor Registry
//!
//! Remembers, per `(platform, kind)` query, the seed of the worker handed out
//! last so the next lease starts after it. The cursor is a hint only: two
//! concurrent leases may read the same value and pick the same worker, which
//! costs load spread but never correctness.

use super::types::{CursorKey, Platform, WorkerKind};

use dashmap::DashMap;
use std::sync::Arc;

pub struct ServiceRegistry {
    cursors: DashMap<CursorKey, i64>,
}

impl ServiceRegistry {
    /// Creates an empty registry. One per process, shared by handle.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Last seed leased for this query, or zero if none yet.
    pub fn cursor(&self, platform: &Platform, kind: WorkerKind) -> i64 {
        self.cursors
            .get(&CursorKey::new(platform, kind))
            .map(|seed| *seed)
            .unwrap_or(0)
    }

    pub fn advance(&self, platform: &Platform, kind: WorkerKind, seed: i64) {
        self.cursors.insert(CursorKey::new(platform, kind), seed);
        tracing::trace!("Cursor {}/{} now at {}", kind, platform, seed);
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self {
            cursors: DashMap::new(),
        }
    }
}
