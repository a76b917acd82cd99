//! Result Storage Contract
//!
//! Where finished work and test outcomes end up. Recording is idempotent per
//! attempt: a retried report overwrites what the same attempt wrote before.

use super::types::*;
use crate::dispatch::types::AttemptId;
use crate::error::StoreError;

use async_trait::async_trait;
use std::sync::RwLock;

#[async_trait]
pub trait ResultStore: Send + Sync {
    async fn record_work(&self, result: WorkResult) -> Result<(), StoreError>;

    async fn record_test(&self, result: TestResult) -> Result<(), StoreError>;

    /// Status of the most recent test result for `import_path` written by any
    /// attempt other than `excluding`.
    async fn previous_status(
        &self,
        import_path: &str,
        excluding: &AttemptId,
    ) -> Result<Option<TestStatus>, StoreError>;
}

#[derive(Default)]
pub struct MemoryResultStore {
    work: RwLock<Vec<WorkResult>>,
    tests: RwLock<Vec<TestResult>>,
}

impl MemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn work_results(&self) -> Vec<WorkResult> {
        self.work.read().map(|w| w.clone()).unwrap_or_default()
    }

    pub fn test_results(&self) -> Vec<TestResult> {
        self.tests.read().map(|t| t.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ResultStore for MemoryResultStore {
    async fn record_work(&self, result: WorkResult) -> Result<(), StoreError> {
        let mut work = self
            .work
            .write()
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        let existing = work.iter_mut().find(|w| {
            w.work_id == result.work_id
                && w.attempt_id.is_some()
                && w.attempt_id == result.attempt_id
        });
        match existing {
            Some(slot) => *slot = result,
            None => work.push(result),
        }
        Ok(())
    }

    async fn record_test(&self, result: TestResult) -> Result<(), StoreError> {
        let mut tests = self
            .tests
            .write()
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        let existing = tests
            .iter_mut()
            .find(|t| t.attempt_id == result.attempt_id && t.import_path == result.import_path);
        match existing {
            Some(slot) => *slot = result,
            None => tests.push(result),
        }
        Ok(())
    }

    async fn previous_status(
        &self,
        import_path: &str,
        excluding: &AttemptId,
    ) -> Result<Option<TestStatus>, StoreError> {
        let tests = self
            .tests
            .read()
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(tests
            .iter()
            .filter(|t| t.import_path == import_path && &t.attempt_id != excluding)
            .max_by_key(|t| t.when)
            .map(|t| t.status))
    }
}
