//! End-to-end generation pipeline for a single task.
//!
//! Chains the three role agents over one [`CodeContext`], then drives the
//! verify-and-repair loop: assemble a script, persist it as an audit
//! artifact, run it in the sandbox, and feed failures back to the
//! Developer until the suite passes or the iteration budget runs out.

use std::path::PathBuf;
use std::sync::Arc;

use uuid::Uuid;

use crate::agents::{Agent, Developer, Navigator, TestDesigner};
use crate::analyzer::{CodeContext, SymbolTable, Task};
use crate::config::Settings;
use crate::error::PipelineError;
use crate::llm::{CompletionBackend, GenerationParams};
use crate::sandbox::{Report, TestRunner};
use crate::store::HistoryStore;
use crate::validate::{compile_tests, ModuleIndex};

/// Shared collaborators, cheap to clone across pipelines.
#[derive(Clone)]
pub struct Services {
    pub backend: Arc<dyn CompletionBackend>,
    pub store: Arc<dyn HistoryStore>,
    pub runner: Arc<dyn TestRunner>,
    pub index: Arc<ModuleIndex>,
}

/// Where the pipeline is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    ContextBuilt,
    NavDone,
    TestDone,
    DevDone,
    Testing(usize),
    Passed,
    Exhausted,
}

/// An implementation attempt and its observed failure count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub code: String,
    pub failures: usize,
}

pub struct Pipeline {
    id: String,
    context: Arc<CodeContext>,
    services: Services,
    params: GenerationParams,
    artifact_root: PathBuf,
    max_iter: usize,
    state: PipelineState,
    best: Option<Candidate>,
}

impl Pipeline {
    /// Build a pipeline for one task. Context construction failure is
    /// fatal here and never retried.
    pub fn new(
        task: &Task,
        defined: &SymbolTable,
        services: Services,
        settings: &Settings,
    ) -> Result<Self, PipelineError> {
        Self::with_id(task, defined, services, settings, Uuid::new_v4().to_string())
    }

    /// Like [`Pipeline::new`] with an explicit id, which allows resuming
    /// persisted conversations from an earlier run.
    pub fn with_id(
        task: &Task,
        defined: &SymbolTable,
        services: Services,
        settings: &Settings,
        id: impl Into<String>,
    ) -> Result<Self, PipelineError> {
        let context = Arc::new(CodeContext::build(task, defined)?);
        Ok(Self {
            id: id.into(),
            context,
            services,
            params: GenerationParams {
                model: Some(settings.model.clone()),
                temperature: settings.temperature,
                max_tokens: settings.max_tokens,
            },
            artifact_root: settings.artifact_root.clone(),
            max_iter: settings.max_iter,
            state: PipelineState::ContextBuilt,
            best: None,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Best implementation seen so far, with its failure count.
    pub fn best_candidate(&self) -> Option<&Candidate> {
        self.best.as_ref()
    }

    /// Run the full pipeline and return the final implementation.
    ///
    /// With `no_test` the Developer's first candidate is returned without
    /// verification. Otherwise the verify-and-repair loop runs; an
    /// exhausted budget still returns the best candidate seen, and errors
    /// after the Developer phase degrade to that candidate rather than
    /// aborting.
    pub async fn run(&mut self, no_test: bool) -> Result<String, PipelineError> {
        let mut nav = Agent::new(
            Navigator::new(self.context.clone()),
            self.id.clone(),
            self.services.backend.clone(),
            self.services.store.clone(),
            self.max_iter,
            self.params.clone(),
        )
        .await?;
        let nav_reply = nav.initial_generation().await?;
        self.state = PipelineState::NavDone;
        tracing::info!(pipeline = %self.id, "navigator analysis complete");

        let mut designer = Agent::new(
            TestDesigner::new(
                self.context.clone(),
                nav_reply.content.clone(),
                self.services.index.clone(),
            ),
            self.id.clone(),
            self.services.backend.clone(),
            self.services.store.clone(),
            self.max_iter,
            self.params.clone(),
        )
        .await?;
        designer.initial_generation().await?;
        let tests = designer.policy().test_sources();
        let imports = designer.policy().imports().to_vec();
        let suite = compile_tests(&tests, &[], Some(&imports))?;
        self.state = PipelineState::TestDone;
        tracing::info!(pipeline = %self.id, tests = tests.len(), "test suite accepted");

        let mut dev = Agent::new(
            Developer::new(self.context.clone(), &suite),
            self.id.clone(),
            self.services.backend.clone(),
            self.services.store.clone(),
            self.max_iter,
            self.params.clone(),
        )
        .await?;
        let first = dev.initial_generation().await?.content;
        self.state = PipelineState::DevDone;
        tracing::info!(pipeline = %self.id, "first implementation candidate produced");

        if no_test {
            return Ok(first);
        }

        match self.verify(&mut dev, &tests, &imports, first.clone()).await {
            Ok(solution) => Ok(solution),
            Err(e) => {
                // Post-Developer failures must not abort a batch; fall
                // back to the best candidate observed.
                tracing::error!(pipeline = %self.id, error = %e, "verification aborted, returning best candidate");
                self.state = PipelineState::Exhausted;
                Ok(self
                    .best
                    .as_ref()
                    .map(|c| c.code.clone())
                    .unwrap_or(first))
            }
        }
    }

    async fn verify(
        &mut self,
        dev: &mut Agent<Developer>,
        tests: &[String],
        imports: &[String],
        first: String,
    ) -> Result<String, PipelineError> {
        let artifact_dir = self.artifact_root.join(&self.id);
        tokio::fs::create_dir_all(&artifact_dir).await?;

        let mut all_tests: Vec<String> = tests.to_vec();
        all_tests.push(self.context.test_source());

        let mut candidate = first;
        for depth in 0..=self.max_iter {
            self.state = PipelineState::Testing(depth);

            let script = compile_tests(&all_tests, &[candidate.clone()], Some(imports))?;

            // Persisted before execution so a crashing run still leaves
            // the script behind for inspection.
            let script_path = artifact_dir.join(format!("script_iter_{depth}.py"));
            tokio::fs::write(&script_path, &script).await?;

            let report = self.services.runner.run(&script_path).await?;
            let failures = report.n_failures();
            tracing::info!(pipeline = %self.id, depth, failures, "verification iteration complete");

            let improved = self.best.as_ref().map_or(true, |b| failures < b.failures);
            if improved {
                self.best = Some(Candidate {
                    code: candidate.clone(),
                    failures,
                });
            }

            if report.passed() {
                self.state = PipelineState::Passed;
                tracing::info!(pipeline = %self.id, depth, "test suite passed");
                return Ok(candidate);
            }

            if depth == self.max_iter {
                break;
            }

            candidate = dev.generate(corrective_message(&report)).await?.content;
        }

        self.state = PipelineState::Exhausted;
        tracing::warn!(pipeline = %self.id, "iteration budget exhausted");
        Ok(self
            .best
            .as_ref()
            .map(|c| c.code.clone())
            .unwrap_or(candidate))
    }
}

/// Corrective follow-up enumerating each failing test with its detail.
fn corrective_message(report: &Report) -> String {
    const SEP: &str = "-----";
    let mut lines =
        vec!["Your implementation failed the test suite with the following errors:".to_string()];
    for failure in report.failures() {
        lines.push(format!(
            "{}: {}",
            failure.id,
            failure.detail.as_deref().unwrap_or("no detail captured")
        ));
        lines.push(SEP.to_string());
    }
    lines.push("Please fix your implementation.".to_string());
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::{ExitStatus, Outcome, TestCaseReport};
    use pretty_assertions::assert_eq;

    #[test]
    fn corrective_message_enumerates_failures() {
        let report = Report {
            cases: vec![
                TestCaseReport {
                    id: "s.py::test_zero".to_string(),
                    outcome: Outcome::Failed,
                    detail: Some("assert 1 == 0".to_string()),
                },
                TestCaseReport {
                    id: "s.py::test_one".to_string(),
                    outcome: Outcome::Passed,
                    detail: None,
                },
                TestCaseReport {
                    id: "s.py::test_two".to_string(),
                    outcome: Outcome::Failed,
                    detail: None,
                },
            ],
            status: ExitStatus::TestsFailed,
        };

        let message = corrective_message(&report);
        assert_eq!(
            message,
            "Your implementation failed the test suite with the following errors:\n\
             s.py::test_zero: assert 1 == 0\n\
             -----\n\
             s.py::test_two: no detail captured\n\
             -----\n\
             Please fix your implementation."
        );
        assert!(!message.contains("test_one"));
    }
}
