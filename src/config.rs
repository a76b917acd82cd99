//! Orchestrator Configuration
//!
//! Settings are read from an optional TOML file; every field has a default so an
//! empty (or absent) file yields a working single-node setup. Command-line flags
//! in the binaries override the file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

/// Retry and timeout policy for one class of claimable items.
///
/// A section in the file must give both fields; an omitted section takes the
/// defaults of its item class.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AttemptPolicy {
    /// Attempts recorded before an item is moved to `Error`.
    pub max_attempts: usize,
    /// Age of the latest attempt after which a `Processing` item is reclaimed.
    pub attempt_timeout_secs: u64,
}

impl AttemptPolicy {
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.attempt_timeout_secs)
    }

    pub fn work() -> Self {
        Self {
            max_attempts: 5,
            attempt_timeout_secs: 10 * 60,
        }
    }

    pub fn notifications() -> Self {
        Self {
            max_attempts: 2,
            attempt_timeout_secs: 60,
        }
    }
}

/// Transport tuning for outgoing RPC calls.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RpcConfig {
    pub timeout_ms: u64,
    pub retries: usize,
    /// How long a pop request waits for a task before answering empty.
    pub pop_wait_secs: u64,
}

impl RpcConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn pop_wait(&self) -> Duration {
        Duration::from_secs(self.pop_wait_secs)
    }
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 500,
            retries: 3,
            pop_wait_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OrchestratorConfig {
    pub bind: SocketAddr,
    /// Externally reachable base URL; workers post responses here.
    pub public_url: String,
    pub poll_interval_secs: u64,
    #[serde(default = "AttemptPolicy::work")]
    pub work: AttemptPolicy,
    #[serde(default = "AttemptPolicy::notifications")]
    pub notifications: AttemptPolicy,
    pub rpc: RpcConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 8080)),
            public_url: "http://127.0.0.1:8080".to_string(),
            poll_interval_secs: 30,
            work: AttemptPolicy::work(),
            notifications: AttemptPolicy::notifications(),
            rpc: RpcConfig::default(),
        }
    }
}

impl OrchestratorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Loads the file at `path`, or defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("reading config {}", path.display()))?;
                Self::from_toml(&raw)
            }
            None => Ok(Self::default()),
        }
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw).context("parsing orchestrator config")?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings the reconcile loops cannot run with.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.poll_interval_secs > 0,
            "poll_interval_secs must be at least 1"
        );
        anyhow::ensure!(
            self.work.max_attempts > 0,
            "work.max_attempts must be at least 1"
        );
        anyhow::ensure!(
            self.notifications.max_attempts > 0,
            "notifications.max_attempts must be at least 1"
        );
        Ok(())
    }
}

/// Settings for a worker process hosting builder and runner queues.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorkerConfig {
    pub bind: SocketAddr,
    pub public_url: String,
    pub tracker_url: String,
    pub os: String,
    pub arch: String,
    pub rpc: RpcConfig,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 9090)),
            public_url: "http://127.0.0.1:9090".to_string(),
            tracker_url: "http://127.0.0.1:8080".to_string(),
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            rpc: RpcConfig::default(),
        }
    }
}

impl WorkerConfig {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("reading config {}", path.display()))?;
                toml::from_str(&raw).context("parsing worker config")
            }
            None => Ok(Self::default()),
        }
    }
}
