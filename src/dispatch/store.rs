//! Durable Item Store Contract
//!
//! The orchestrator never locks items. Every state change goes through
//! [`ItemStore::update`], which applies a [`Mutation`] only if the stored revision
//! still equals the caller's expectation, the equivalent of
//! `UPDATE ... WHERE id = ? AND revision = ?`.
//!
//! [`MemoryItemStore`] is the in-process implementation used by the binaries and
//! the tests; a database-backed store implements the same trait.

use super::types::*;
use crate::error::StoreError;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;

#[async_trait]
pub trait ItemStore<T: Claimable>: Send + Sync {
    async fn insert(&self, item: T) -> Result<(), StoreError>;

    async fn find_by_id(&self, id: &ItemId) -> Result<Option<T>, StoreError>;

    /// Items that are `Waiting`, or `Processing` with a latest attempt that
    /// started before `stale_before`.
    async fn find_due(&self, stale_before: DateTime<Utc>) -> Result<Vec<T>, StoreError>;

    /// Applies `mutation` if the stored revision equals `expected_revision`.
    ///
    /// Returns `Ok(false)` when another writer advanced the revision first.
    /// That is contention, not a failure.
    async fn update(
        &self,
        id: &ItemId,
        expected_revision: u64,
        mutation: Mutation<T::Attempt>,
    ) -> Result<bool, StoreError>;
}

pub struct MemoryItemStore<T> {
    items: Arc<DashMap<ItemId, T>>,
}

impl<T: Claimable> MemoryItemStore<T> {
    pub fn new() -> Self {
        Self {
            items: Arc::new(DashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Snapshot of every stored item, for status pages and tests.
    pub fn all(&self) -> Vec<T> {
        self.items.iter().map(|entry| entry.value().clone()).collect()
    }
}

impl<T: Claimable> Default for MemoryItemStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: Claimable> ItemStore<T> for MemoryItemStore<T> {
    async fn insert(&self, item: T) -> Result<(), StoreError> {
        let id = item.id().clone();
        if self.items.contains_key(&id) {
            return Err(StoreError::Backend(format!("duplicate item id {}", id)));
        }
        self.items.insert(id, item);
        Ok(())
    }

    async fn find_by_id(&self, id: &ItemId) -> Result<Option<T>, StoreError> {
        Ok(self.items.get(id).map(|entry| entry.value().clone()))
    }

    async fn find_due(&self, stale_before: DateTime<Utc>) -> Result<Vec<T>, StoreError> {
        Ok(self
            .items
            .iter()
            .filter(|entry| entry.value().claim().is_due(stale_before))
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn update(
        &self,
        id: &ItemId,
        expected_revision: u64,
        mutation: Mutation<T::Attempt>,
    ) -> Result<bool, StoreError> {
        // The shard write lock makes check-and-apply atomic per item.
        let mut entry = self
            .items
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        let claim = entry.claim_mut();
        if claim.revision != expected_revision {
            tracing::trace!(
                "Revision mismatch on {}: expected {}, found {}",
                id,
                expected_revision,
                claim.revision
            );
            return Ok(false);
        }

        claim.apply(mutation);
        Ok(true)
    }
}
