use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::BootstrapError;
use crate::step::{Phase, Step, StepCtx, Tally};

/// Execution order of the bootstrap phases
const PHASE_ORDER: &[Phase] = &[
    Phase::Authenticated,     // Credential must be proven first
    Phase::DatabasesSelected, // Explicit collections
    Phase::DataSeeded,        // Sample documents
    Phase::IndexesBuilt,      // Declarative indexes
    Phase::PrincipalsCreated, // Scoped read-write users
];

/// Outcome of a completed run
#[derive(Debug, Clone)]
pub struct BootstrapReport {
    pub phase: Phase,
    pub tally: Tally,
    pub elapsed: Duration,
}

/// Ordered collection of steps run as one sequential pass
pub struct Pipeline {
    steps: Vec<Arc<dyn Step>>,
}

impl Pipeline {
    /// Create an empty pipeline
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    /// Register a step; execution order comes from its phase, not registration order
    pub fn register(&mut self, step: Arc<dyn Step>) {
        self.steps.push(step);
    }

    /// Builder form of [`Pipeline::register`]
    pub fn with_step(mut self, step: Arc<dyn Step>) -> Self {
        self.register(step);
        self
    }

    /// Get all registered steps in execution order
    pub fn steps(&self) -> Vec<&Arc<dyn Step>> {
        PHASE_ORDER
            .iter()
            .flat_map(|phase| self.steps.iter().filter(move |s| s.phase() == *phase))
            .collect()
    }

    /// Get a step by name
    pub fn get_step(&self, name: &str) -> Option<&Arc<dyn Step>> {
        self.steps.iter().find(|step| step.name() == name)
    }

    /// Get the number of registered steps
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Run every step in phase order, stopping at the first error
    pub async fn run(&self, ctx: &StepCtx<'_>) -> Result<BootstrapReport, BootstrapError> {
        let started = Instant::now();
        let mut reached = Phase::Pending;
        let mut tally = Tally::default();

        tracing::info!(
            backend = ctx.store.backend(),
            steps = self.steps.len(),
            "running bootstrap steps in order: {:?}",
            PHASE_ORDER
        );

        for step in self.steps() {
            tracing::info!(step = step.name(), phase = %step.phase(), "running step");

            match step.run(ctx).await {
                Ok(step_tally) => {
                    tally += step_tally;
                    reached = step.phase();
                    tracing::info!(step = step.name(), phase = %reached, "step complete");
                }
                Err(source) => {
                    tracing::error!(
                        step = step.name(),
                        reached = %reached,
                        error_code = source.code(),
                        error = %source,
                        "step failed, aborting bootstrap"
                    );
                    return Err(BootstrapError::Step {
                        step: step.name(),
                        reached,
                        source,
                    });
                }
            }
        }

        Ok(BootstrapReport {
            phase: reached,
            tally,
            elapsed: started.elapsed(),
        })
    }

    /// Run with an overall deadline
    pub async fn run_with_timeout(
        &self,
        ctx: &StepCtx<'_>,
        timeout: Duration,
    ) -> Result<BootstrapReport, BootstrapError> {
        match tokio::time::timeout(timeout, self.run(ctx)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::error!(timeout = ?timeout, "bootstrap timed out");
                Err(BootstrapError::TimedOut(timeout))
            }
        }
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}
