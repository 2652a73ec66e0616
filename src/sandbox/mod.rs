//! Sandboxed execution of assembled test scripts.
//!
//! Scripts run in an interpreter subprocess; results come back through a
//! machine-readable report file rather than stdout scraping.

mod pytest;

pub use pytest::PytestRunner;

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SandboxError;

/// Outcome of a single test case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Passed,
    Failed,
    /// Any other reported outcome (skipped, xfailed, error, ...).
    Other(String),
}

impl Outcome {
    pub fn from_report(outcome: &str) -> Self {
        match outcome {
            "passed" => Outcome::Passed,
            "failed" => Outcome::Failed,
            other => Outcome::Other(other.to_string()),
        }
    }
}

/// Interpreter exit status, decoded from the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Ok,
    TestsFailed,
    InternalError,
    UsageError,
    NoTestsCollected,
    Unknown(i64),
}

impl From<i64> for ExitStatus {
    fn from(code: i64) -> Self {
        match code {
            0 => ExitStatus::Ok,
            1 => ExitStatus::TestsFailed,
            3 => ExitStatus::InternalError,
            4 => ExitStatus::UsageError,
            5 => ExitStatus::NoTestsCollected,
            other => ExitStatus::Unknown(other),
        }
    }
}

/// One test case from the run report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCaseReport {
    /// Runner-assigned identifier (pytest nodeid).
    pub id: String,
    pub outcome: Outcome,
    /// Failure representation, when the runner captured one.
    pub detail: Option<String>,
}

/// Decoded run report for one script execution.
#[derive(Debug, Clone)]
pub struct Report {
    pub cases: Vec<TestCaseReport>,
    pub status: ExitStatus,
}

impl Report {
    /// An execution counts as passed only on a clean exit with no
    /// non-passing cases.
    pub fn passed(&self) -> bool {
        self.status == ExitStatus::Ok && self.n_failures() == 0
    }

    pub fn n_failures(&self) -> usize {
        self.failures().count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &TestCaseReport> {
        self.cases.iter().filter(|c| c.outcome != Outcome::Passed)
    }
}

/// Executes a test script and decodes its report.
#[async_trait]
pub trait TestRunner: Send + Sync {
    async fn run(&self, script_path: &Path) -> Result<Report, SandboxError>;
}
