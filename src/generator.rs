//! Batch fan-out over many pipelines.

use futures::future::join_all;

use crate::analyzer::{SymbolTable, Task};
use crate::config::Settings;
use crate::error::PipelineError;
use crate::pipeline::{Pipeline, Services};

/// Runs one pipeline per task concurrently.
///
/// Per-task failures are isolated: a pipeline that errors contributes a
/// `None` result instead of aborting the batch.
pub struct Generator {
    pipelines: Vec<Pipeline>,
}

impl Generator {
    pub fn new(
        tasks: &[Task],
        defined: &SymbolTable,
        services: Services,
        settings: &Settings,
    ) -> Result<Self, PipelineError> {
        let pipelines = tasks
            .iter()
            .map(|task| Pipeline::new(task, defined, services.clone(), settings))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { pipelines })
    }

    pub fn pipelines(&self) -> &[Pipeline] {
        &self.pipelines
    }

    /// Run every pipeline to completion and collect `(id, implementation)`
    /// pairs in task order.
    pub async fn generate_all(&mut self, no_test: bool) -> Vec<(String, Option<String>)> {
        let runs = self.pipelines.iter_mut().map(|pipeline| async move {
            let id = pipeline.id().to_string();
            match pipeline.run(no_test).await {
                Ok(solution) => (id, Some(solution)),
                Err(e) => {
                    tracing::error!(pipeline = %id, error = %e, "pipeline failed");
                    (id, None)
                }
            }
        });
        join_all(runs).await
    }
}
