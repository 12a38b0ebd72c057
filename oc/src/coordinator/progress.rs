//! Per-expression progress tracking

use tracing::warn;

use crate::domain::{ExpressionStatus, TaskOutcome};

/// Status change to write after recording an outcome
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Transition {
    None,
    Started,
    Completed(f64),
    Failed(String),
}

/// Outstanding count and per-seq values of one expression
#[derive(Debug, Clone)]
pub(crate) struct ExpressionProgress {
    outstanding: usize,
    values: Vec<Option<f64>>,
    status: ExpressionStatus,
}

impl ExpressionProgress {
    pub fn new(task_count: usize) -> Self {
        Self {
            outstanding: task_count,
            values: vec![None; task_count],
            status: ExpressionStatus::Pending,
        }
    }

    pub fn status(&self) -> ExpressionStatus {
        self.status
    }

    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    /// Record the first outcome of task `seq`
    pub fn record(&mut self, seq: usize, outcome: &TaskOutcome) -> Transition {
        if self.status.is_terminal() {
            return Transition::None;
        }

        match outcome {
            TaskOutcome::Failed(error) => {
                self.status = ExpressionStatus::Failed;
                Transition::Failed(error.clone())
            }
            TaskOutcome::Value(value) => {
                let Some(slot) = self.values.get_mut(seq) else {
                    warn!(seq, "ExpressionProgress::record: seq out of range");
                    return Transition::None;
                };
                if slot.is_some() {
                    return Transition::None;
                }
                *slot = Some(*value);
                self.outstanding -= 1;

                if self.outstanding == 0 {
                    // Value of the last operation in decomposition order
                    let result = self.values.last().copied().flatten().unwrap_or(*value);
                    self.status = ExpressionStatus::Completed;
                    Transition::Completed(result)
                } else if self.status == ExpressionStatus::Pending {
                    self.status = ExpressionStatus::Processing;
                    Transition::Started
                } else {
                    Transition::None
                }
            }
        }
    }
}
