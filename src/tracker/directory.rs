//! Worker Directory
//!
//! Durable storage of announced workers. The lease manager only needs three
//! operations, the last being the ordered "next seed" query that drives
//! round-robin selection.

use super::types::*;
use crate::error::LeaseError;

use async_trait::async_trait;
use dashmap::DashMap;

#[async_trait]
pub trait WorkerDirectory: Send + Sync {
    async fn insert(&self, record: WorkerRecord) -> Result<(), LeaseError>;

    /// Deletes the record with `key` if it exists and is of `kind`.
    /// Returns whether a record was removed.
    async fn remove(&self, key: &LeaseKey, kind: WorkerKind) -> Result<bool, LeaseError>;

    /// The worker of `kind` admitted by `platform` with the smallest seed strictly
    /// greater than `after_seed`.
    async fn next_after(
        &self,
        kind: WorkerKind,
        platform: &Platform,
        after_seed: i64,
    ) -> Result<Option<WorkerRecord>, LeaseError>;
}

pub struct MemoryDirectory {
    workers: DashMap<LeaseKey, WorkerRecord>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self {
            workers: DashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    pub fn get(&self, key: &LeaseKey) -> Option<WorkerRecord> {
        self.workers.get(key).map(|entry| entry.value().clone())
    }
}

impl Default for MemoryDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WorkerDirectory for MemoryDirectory {
    async fn insert(&self, record: WorkerRecord) -> Result<(), LeaseError> {
        self.workers.insert(record.key.clone(), record);
        Ok(())
    }

    async fn remove(&self, key: &LeaseKey, kind: WorkerKind) -> Result<bool, LeaseError> {
        Ok(self
            .workers
            .remove_if(key, |_, record| record.kind == kind)
            .is_some())
    }

    async fn next_after(
        &self,
        kind: WorkerKind,
        platform: &Platform,
        after_seed: i64,
    ) -> Result<Option<WorkerRecord>, LeaseError> {
        Ok(self
            .workers
            .iter()
            .filter(|entry| {
                let record = entry.value();
                record.kind == kind && record.seed > after_seed && platform.admits(&record.platform)
            })
            .min_by_key(|entry| entry.value().seed)
            .map(|entry| entry.value().clone()))
    }
}
