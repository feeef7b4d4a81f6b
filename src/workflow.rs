//! Sequential multi-step workflows over a store with no transactions.
//!
//! Each step is classified as fatal or best-effort. A fatal failure stops the
//! workflow with a [`WorkflowError`]; a best-effort failure is logged and
//! recorded in the [`WorkflowReport`] and the next step runs. Nothing is
//! rolled back.

use std::fmt::Display;

use tracing::{error, warn};

use crate::error::WorkflowError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepPolicy {
    Fatal,
    BestEffort,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepFailure {
    pub step: &'static str,
    pub message: String,
}

/// What a finished workflow did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowReport {
    pub workflow: &'static str,
    pub completed: Vec<&'static str>,
    pub skipped: Vec<&'static str>,
    pub failures: Vec<StepFailure>,
}

impl WorkflowReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failed(&self, step: &str) -> bool {
        self.failures.iter().any(|f| f.step == step)
    }

    pub fn completed(&self, step: &str) -> bool {
        self.completed.iter().any(|s| *s == step)
    }

    pub fn skipped(&self, step: &str) -> bool {
        self.skipped.iter().any(|s| *s == step)
    }
}

pub struct Workflow {
    report: WorkflowReport,
}

impl Workflow {
    pub fn new(name: &'static str) -> Self {
        Self {
            report: WorkflowReport {
                workflow: name,
                completed: Vec::new(),
                skipped: Vec::new(),
                failures: Vec::new(),
            },
        }
    }

    /// Records the outcome of one step according to `policy`.
    ///
    /// Returns `Ok(Some(value))` on success, `Ok(None)` for a tolerated
    /// best-effort failure and `Err` for a fatal one.
    pub fn record<T, E: Display>(
        &mut self,
        step: &'static str,
        policy: StepPolicy,
        outcome: Result<T, E>,
    ) -> Result<Option<T>, WorkflowError> {
        match outcome {
            Ok(value) => {
                self.report.completed.push(step);
                Ok(Some(value))
            }
            Err(e) => {
                let message = e.to_string();
                match policy {
                    StepPolicy::Fatal => {
                        error!(workflow = self.report.workflow, step, error = %message, "Workflow step failed");
                        Err(WorkflowError {
                            workflow: self.report.workflow,
                            step,
                            message,
                        })
                    }
                    StepPolicy::BestEffort => {
                        warn!(workflow = self.report.workflow, step, error = %message, "Best-effort step failed, continuing");
                        self.report.failures.push(StepFailure { step, message });
                        Ok(None)
                    }
                }
            }
        }
    }

    pub fn fatal<T, E: Display>(&mut self, step: &'static str, outcome: Result<T, E>) -> Result<T, WorkflowError> {
        self.record(step, StepPolicy::Fatal, outcome)?
            .ok_or_else(|| WorkflowError {
                workflow: self.report.workflow,
                step,
                message: "step produced no value".to_string(),
            })
    }

    pub fn best_effort<T, E: Display>(&mut self, step: &'static str, outcome: Result<T, E>) -> Option<T> {
        self.record(step, StepPolicy::BestEffort, outcome).ok().flatten()
    }

    /// Marks a step that was skipped on purpose, e.g. a refund notice for
    /// cash on delivery.
    pub fn skip(&mut self, step: &'static str) {
        tracing::debug!(workflow = self.report.workflow, step, "Step skipped");
        self.report.skipped.push(step);
    }

    pub fn finish(self) -> WorkflowReport {
        self.report
    }
}
