//! Pytest subprocess runner.
//!
//! Runs `python -m pytest <script> --json-report` and decodes the JSON
//! report written next to the script. Requires the `pytest-json-report`
//! plugin in the target interpreter.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;

use crate::error::SandboxError;
use crate::sandbox::{Outcome, Report, TestCaseReport, TestRunner};

const REPORT_FILE: &str = "test_report.json";

/// Runs scripts under an external Python interpreter.
#[derive(Debug, Clone)]
pub struct PytestRunner {
    python: String,
}

impl PytestRunner {
    pub fn new(python: impl Into<String>) -> Self {
        Self {
            python: python.into(),
        }
    }

    fn report_path(script_path: &Path) -> PathBuf {
        match script_path.parent() {
            Some(parent) => parent.join(REPORT_FILE),
            None => PathBuf::from(REPORT_FILE),
        }
    }
}

#[async_trait]
impl TestRunner for PytestRunner {
    async fn run(&self, script_path: &Path) -> Result<Report, SandboxError> {
        let report_path = Self::report_path(script_path);

        // A stale report from an earlier iteration must not be mistaken
        // for this run's output.
        match tokio::fs::remove_file(&report_path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        let mut command = Command::new(&self.python);
        command
            .arg("-m")
            .arg("pytest")
            .arg(script_path)
            .arg("--json-report")
            .arg(format!("--json-report-file={}", report_path.display()))
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        tracing::debug!(script = %script_path.display(), "running test script");
        let mut child = command.spawn().map_err(|e| SandboxError::Spawn {
            reason: e.to_string(),
        })?;
        child.wait().await?;

        // The exit code comes from the report, not the process: plugin
        // failures leave no report, which is an environment error.
        if !report_path.exists() {
            return Err(SandboxError::ReportMissing {
                expected: report_path,
            });
        }

        let raw = tokio::fs::read(&report_path).await?;
        parse_report(&raw)
    }
}

#[derive(Debug, Deserialize)]
struct RawReport {
    exitcode: i64,
    #[serde(default)]
    tests: Vec<RawTest>,
}

#[derive(Debug, Deserialize)]
struct RawTest {
    nodeid: String,
    outcome: String,
    longrepr: Option<String>,
    call: Option<RawPhase>,
}

#[derive(Debug, Deserialize)]
struct RawPhase {
    longrepr: Option<String>,
}

fn parse_report(raw: &[u8]) -> Result<Report, SandboxError> {
    let raw: RawReport =
        serde_json::from_slice(raw).map_err(|e| SandboxError::ReportMalformed {
            reason: e.to_string(),
        })?;

    let cases = raw
        .tests
        .into_iter()
        .map(|test| {
            let detail = test.call.and_then(|c| c.longrepr).or(test.longrepr);
            TestCaseReport {
                id: test.nodeid,
                outcome: Outcome::from_report(&test.outcome),
                detail,
            }
        })
        .collect();

    Ok(Report {
        cases,
        status: raw.exitcode.into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::ExitStatus;
    use pretty_assertions::assert_eq;

    #[test]
    fn report_path_is_sibling_of_script() {
        let path = PytestRunner::report_path(Path::new("/tmp/run/script_iter_0.py"));
        assert_eq!(path, PathBuf::from("/tmp/run/test_report.json"));
    }

    #[test]
    fn decodes_passing_report() {
        let raw = br#"{
            "exitcode": 0,
            "tests": [
                {"nodeid": "s.py::test_zero", "outcome": "passed"}
            ]
        }"#;
        let report = parse_report(raw).unwrap();
        assert_eq!(report.status, ExitStatus::Ok);
        assert!(report.passed());
        assert_eq!(report.cases[0].id, "s.py::test_zero");
    }

    #[test]
    fn decodes_failure_detail_from_call_phase() {
        let raw = br#"{
            "exitcode": 1,
            "tests": [
                {
                    "nodeid": "s.py::test_zero",
                    "outcome": "failed",
                    "call": {"longrepr": "assert 0 == 1"}
                }
            ]
        }"#;
        let report = parse_report(raw).unwrap();
        assert_eq!(report.status, ExitStatus::TestsFailed);
        assert_eq!(report.n_failures(), 1);
        let failure = report.failures().next().unwrap();
        assert_eq!(failure.detail.as_deref(), Some("assert 0 == 1"));
    }

    #[test]
    fn falls_back_to_top_level_longrepr() {
        let raw = br#"{
            "exitcode": 1,
            "tests": [
                {"nodeid": "s.py::test_a", "outcome": "failed", "longrepr": "boom"}
            ]
        }"#;
        let report = parse_report(raw).unwrap();
        assert_eq!(
            report.failures().next().unwrap().detail.as_deref(),
            Some("boom")
        );
    }

    #[test]
    fn empty_collection_decodes() {
        let raw = br#"{"exitcode": 5}"#;
        let report = parse_report(raw).unwrap();
        assert_eq!(report.status, ExitStatus::NoTestsCollected);
        assert!(report.cases.is_empty());
        assert!(!report.passed());
    }

    #[test]
    fn malformed_report_is_an_error() {
        let err = parse_report(b"not json").unwrap_err();
        assert!(matches!(err, SandboxError::ReportMalformed { .. }));
    }

    #[tokio::test]
    async fn stale_report_is_not_reused() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("script_iter_1.py");
        std::fs::write(&script, "def test_noop():\n    pass\n").unwrap();

        // Leftover report from a previous iteration. The runner command
        // exits without writing a new one, so the run must surface a
        // missing report rather than decode this.
        std::fs::write(
            dir.path().join(REPORT_FILE),
            r#"{"exitcode": 0, "tests": [{"nodeid": "s.py::test_old", "outcome": "passed"}]}"#,
        )
        .unwrap();

        let runner = PytestRunner::new("true");
        let err = runner.run(&script).await.unwrap_err();
        assert!(matches!(err, SandboxError::ReportMissing { .. }));
    }
}
