//! specsmith - test-driven Python code generation.
//!
//! Takes a Python test function whose docstring carries a signature block,
//! analyzes it, and drives three cooperating role agents (Navigator, Test
//! Designer, Developer) against a completion backend to produce an
//! implementation that passes both the generated and the original tests.
//!
//! Entry points: [`pipeline::Pipeline`] for a single task,
//! [`generator::Generator`] for a batch.

pub mod agents;
pub mod analyzer;
pub mod config;
pub mod error;
pub mod generator;
pub mod llm;
pub mod pipeline;
pub mod sandbox;
pub mod store;
pub mod validate;

pub use analyzer::{CodeContext, SymbolTable, Task};
pub use config::Settings;
pub use error::PipelineError;
pub use generator::Generator;
pub use pipeline::{Candidate, Pipeline, PipelineState, Services};

/// Install the default tracing subscriber, honoring `RUST_LOG`.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
}
