//! Error types for the generation pipeline.

use std::path::PathBuf;

/// A located syntax problem in a piece of Python source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxIssue {
    /// 1-based line of the first offending node.
    pub line: usize,
    /// 0-based column of the first offending node.
    pub column: usize,
    /// Short description, usually including the offending snippet.
    pub message: String,
}

impl std::fmt::Display for SyntaxIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}: {}", self.line, self.column, self.message)
    }
}

/// Errors from the LLM completion backend.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// Authentication with the backend failed.
    #[error("authentication failed for {provider}")]
    AuthFailed { provider: String },

    /// The backend rate-limited the request.
    #[error("rate limited by {provider}")]
    RateLimited {
        provider: String,
        retry_after: Option<std::time::Duration>,
    },

    /// The request could not be completed.
    #[error("request to {provider} failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    /// The backend returned something we could not interpret.
    #[error("invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    /// The backend returned zero candidate choices.
    #[error("no completion choices returned by {provider}")]
    NoChoices { provider: String },
}

/// Errors from task source analysis (context construction).
#[derive(Debug, thiserror::Error)]
pub enum AnalyzerError {
    /// The grammar could not be loaded into the parser.
    #[error("parser initialization failed: {reason}")]
    ParserInit { reason: String },

    /// The parser produced no tree at all.
    #[error("parse failed")]
    ParseFailed,

    /// The task source is not valid Python.
    #[error("task source has a syntax error: {0}")]
    Syntax(SyntaxIssue),

    /// The task source does not contain a test function to analyze.
    #[error("task source contains no test function definition")]
    NoTestFunction,
}

/// Errors from validating and assembling generated code.
#[derive(Debug, thiserror::Error)]
pub enum ValidateError {
    /// Model output was not valid Python. Carries the original text so the
    /// corrective message can quote it.
    #[error("invalid generated code: {issue}")]
    InvalidGenerated { issue: SyntaxIssue, original: String },

    /// An assembled script failed to re-parse. Hard error: the fragments were
    /// individually valid, so concatenation itself went wrong.
    #[error("assembled script failed to parse: {issue}")]
    Compile { issue: SyntaxIssue },
}

/// Errors from the conversation history store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// I/O error reading or writing a record.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A record failed to serialize or deserialize.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Errors from sandboxed test execution.
#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    /// The test runner subprocess could not be spawned.
    #[error("failed to spawn test runner: {reason}")]
    Spawn { reason: String },

    /// The structured report never materialized. This is an environment
    /// failure, never an ordinary test failure.
    #[error("test report not found, expected at {expected}")]
    ReportMissing { expected: PathBuf },

    /// The report existed but could not be parsed.
    #[error("test report was malformed: {reason}")]
    ReportMalformed { reason: String },

    /// I/O error writing the script or reading the report.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from a role agent's generate loop.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// The conversation ceiling was reached without an accepted reply.
    /// Terminal for this agent.
    #[error("max iterations reached without a valid response (message ceiling {ceiling})")]
    MaxIterations { ceiling: usize },

    /// Completion backend failure.
    #[error(transparent)]
    Llm(#[from] LlmError),

    /// History persistence failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Non-recoverable validation failure.
    #[error(transparent)]
    Validate(#[from] ValidateError),
}

/// Errors from the pipeline controller.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Context construction failed. Fatal for the pipeline, never retried.
    #[error("failed to build code context: {0}")]
    Context(#[from] AnalyzerError),

    /// A role agent failed terminally.
    #[error(transparent)]
    Agent(#[from] AgentError),

    /// Sandbox environment failure.
    #[error(transparent)]
    Sandbox(#[from] SandboxError),

    /// Script assembly failure.
    #[error(transparent)]
    Validate(#[from] ValidateError),

    /// Audit artifact could not be written.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
