//! Task domain type
//!
//! A Task is one decomposed operation handed to a worker.

use serde::{Deserialize, Serialize};

use super::id::new_id;
use super::operation::{Operation, Operator};

/// Unit of work pulled by a worker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique task identifier
    pub id: String,

    /// Owning expression
    pub expression_id: String,

    /// Position in decomposition order (0-based)
    pub seq: usize,

    pub operand1: f64,
    pub operand2: f64,
    pub operator: Operator,

    /// Artificial compute delay the worker applies before computing
    pub operation_time_ms: i64,
}

impl Task {
    /// Create a task for one operation of an expression
    pub fn new(expression_id: impl Into<String>, seq: usize, operation: Operation, operation_time_ms: i64) -> Self {
        Self {
            id: new_id(),
            expression_id: expression_id.into(),
            seq,
            operand1: operation.operand1,
            operand2: operation.operand2,
            operator: operation.operator,
            operation_time_ms,
        }
    }

    /// The operation this task computes
    pub fn operation(&self) -> Operation {
        Operation::new(self.operator, self.operand1, self.operand2)
    }
}

/// Terminal outcome a worker reports for a task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskOutcome {
    Value(f64),
    Failed(String),
}
