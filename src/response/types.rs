use crate::dispatch::notification::NotifyConfig;
use crate::dispatch::types::{AttemptId, ItemId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a runner classified one test binary's output.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum OutputKind {
    Success,
    WontBuild,
    Error,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TestStatus {
    Pass,
    Fail,
    WontBuild,
    Error,
}

impl TestStatus {
    pub fn is_problem(self) -> bool {
        !matches!(self, TestStatus::Pass)
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TestStatus::Pass => "Pass",
            TestStatus::Fail => "Fail",
            TestStatus::WontBuild => "WontBuild",
            TestStatus::Error => "Error",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TestOutput {
    pub import_path: String,
    pub output: String,
    pub kind: OutputKind,
    /// Who to tell about this result, if anyone.
    #[serde(default)]
    pub notify: Option<NotifyConfig>,
}

impl TestOutput {
    /// A successful run only passes if the test binary printed `PASS` last.
    pub fn status(&self) -> TestStatus {
        match self.kind {
            OutputKind::Success if self.output.ends_with("\nPASS\n") => TestStatus::Pass,
            OutputKind::Success => TestStatus::Fail,
            OutputKind::WontBuild => TestStatus::WontBuild,
            OutputKind::Error => TestStatus::Error,
        }
    }
}

/// Posted by a runner once every test of an attempt has run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunnerResponse {
    pub key: ItemId,
    pub attempt_id: AttemptId,
    pub revision: String,
    pub rev_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub build_output: String,
    pub tests: Vec<TestOutput>,
}

/// Posted instead of a runner response when the tooling failed outright.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BuilderResponse {
    pub key: ItemId,
    pub attempt_id: AttemptId,
    pub revision: String,
    pub rev_date: Option<DateTime<Utc>>,
    pub error: String,
}

/// Outcome of a work item as a whole.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkResult {
    pub work_id: ItemId,
    /// Attempt that produced the result; re-recording the same attempt replaces it.
    pub attempt_id: Option<AttemptId>,
    pub success: bool,
    pub revision: String,
    pub rev_date: Option<DateTime<Utc>>,
    pub when: DateTime<Utc>,
    /// Set when nothing could be built or the item ran out of attempts.
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TestResult {
    pub work_id: ItemId,
    pub attempt_id: AttemptId,
    pub import_path: String,
    pub revision: String,
    pub rev_date: Option<DateTime<Utc>>,
    pub when: DateTime<Utc>,
    pub output: String,
    pub status: TestStatus,
}
