//! Lease Manager
//!
//! Service discovery for builders and runners plus the pairing algorithm used by
//! dispatch. Selection walks workers in ascending seed order starting after the
//! last seed handed out for the same query, wrapping to the start once, so
//! repeated leases visit every matching worker before repeating one.

use super::directory::WorkerDirectory;
use super::registry::ServiceRegistry;
use super::types::*;
use crate::error::LeaseError;
use crate::rpc::WorkerClient;

use rand::Rng;
use std::sync::Arc;

pub struct LeaseManager {
    directory: Arc<dyn WorkerDirectory>,
    registry: Arc<ServiceRegistry>,
    client: Arc<dyn WorkerClient>,
}

impl LeaseManager {
    pub fn new(
        directory: Arc<dyn WorkerDirectory>,
        registry: Arc<ServiceRegistry>,
        client: Arc<dyn WorkerClient>,
    ) -> Arc<Self> {
        Arc::new(Self {
            directory,
            registry,
            client,
        })
    }

    /// Registers a worker after checking it answers a ping.
    pub async fn announce(
        &self,
        platform: Platform,
        kind: WorkerKind,
        url: &str,
    ) -> Result<LeaseKey, LeaseError> {
        if platform.os.is_empty() {
            return Err(LeaseError::Validation("missing operating system".to_string()));
        }
        if platform.arch.is_empty() {
            return Err(LeaseError::Validation("missing architecture".to_string()));
        }
        if url.is_empty() {
            return Err(LeaseError::Validation("missing url".to_string()));
        }

        if let Err(e) = self.client.ping(url).await {
            tracing::warn!("Rejected {} announce from {}: {}", kind, url, e);
            return Err(LeaseError::Unreachable {
                url: url.to_string(),
                source: e,
            });
        }

        let record = WorkerRecord {
            key: LeaseKey::new(),
            kind,
            platform,
            url: url.to_string(),
            seed: rand::thread_rng().gen_range(1..=i64::MAX),
        };
        let key = record.key.clone();

        tracing::info!(
            "Announced {} {} on {} at {}",
            kind,
            key,
            record.platform,
            record.url
        );
        self.directory.insert(record).await?;

        Ok(key)
    }

    /// Removes a worker. A second removal of the same key is `NotFound`.
    pub async fn remove(&self, key: &LeaseKey, kind: WorkerKind) -> Result<(), LeaseError> {
        if !self.directory.remove(key, kind).await? {
            return Err(LeaseError::NotFound(format!("{} {}", kind, key)));
        }

        tracing::info!("Removed {} {}", kind, key);
        Ok(())
    }

    /// Picks a runner on any platform, then a builder on the runner's platform.
    ///
    /// When no builder matches, the runner cursor stays advanced.
    pub async fn lease_pair(&self) -> Result<WorkerPair, LeaseError> {
        let runner = self
            .next_service(WorkerKind::Runner, &Platform::any())
            .await?;
        let builder = self
            .next_service(WorkerKind::Builder, &runner.platform)
            .await?;

        tracing::debug!(
            "Leased builder {} and runner {} on {}",
            builder.url,
            runner.url,
            runner.platform
        );

        Ok(WorkerPair { builder, runner })
    }

    async fn next_service(
        &self,
        kind: WorkerKind,
        platform: &Platform,
    ) -> Result<WorkerRecord, LeaseError> {
        let cursor = self.registry.cursor(platform, kind);

        let mut found = self.directory.next_after(kind, platform, cursor).await?;
        if found.is_none() && cursor != 0 {
            // Wrap around to the lowest seed.
            found = self.directory.next_after(kind, platform, 0).await?;
        }

        let record = found.ok_or(LeaseError::NoneAvailable)?;
        self.registry.advance(platform, kind, record.seed);
        Ok(record)
    }
}
