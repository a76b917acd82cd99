use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Operating system and architecture a worker builds for or runs on.
///
/// Empty fields in a query mean "any".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub struct Platform {
    pub os: String,
    pub arch: String,
}

impl Platform {
    pub fn new(os: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            arch: arch.into(),
        }
    }

    /// The unconstrained query platform.
    pub fn any() -> Self {
        Self::default()
    }

    /// Whether a worker on `worker` satisfies this (possibly partial) constraint.
    pub fn admits(&self, worker: &Platform) -> bool {
        (self.os.is_empty() || self.os == worker.os)
            && (self.arch.is_empty() || self.arch == worker.arch)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.os, self.arch)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum WorkerKind {
    Builder,
    Runner,
}

impl WorkerKind {
    pub fn as_str(self) -> &'static str {
        match self {
            WorkerKind::Builder => "Builder",
            WorkerKind::Runner => "Runner",
        }
    }
}

impl fmt::Display for WorkerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Builder" => Ok(WorkerKind::Builder),
            "Runner" => Ok(WorkerKind::Runner),
            other => Err(format!("unknown worker kind: {}", other)),
        }
    }
}

/// Key handed back by `announce`; the worker uses it to remove itself.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct LeaseKey(pub String);

impl LeaseKey {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for LeaseKey {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LeaseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A registered builder or runner.
///
/// Records are never updated in place: re-announcing creates a new record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkerRecord {
    pub key: LeaseKey,
    pub kind: WorkerKind,
    pub platform: Platform,
    /// Base URL of the worker's RPC endpoints.
    pub url: String,
    /// Random nonzero ordinal. Only used to order workers for round-robin leasing.
    pub seed: i64,
}

/// A platform-compatible builder/runner pair for one dispatch attempt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkerPair {
    pub builder: WorkerRecord,
    pub runner: WorkerRecord,
}

/// Load-spreading cursor key: query platform plus worker kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CursorKey {
    pub platform: Platform,
    pub kind: WorkerKind,
}

impl CursorKey {
    pub fn new(platform: &Platform, kind: WorkerKind) -> Self {
        Self {
            platform: platform.clone(),
            kind,
        }
    }
}
