//! Arithmetic evaluation of one operation

use orchestrator::domain::{Operation, Operator};
use thiserror::Error;

/// Failures while computing an operation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComputeError {
    #[error("division by zero")]
    DivisionByZero,

    #[error("result is not finite: {0}")]
    NonFinite(String),
}

/// Apply the operator to both operands
pub fn compute(operation: &Operation) -> Result<f64, ComputeError> {
    let Operation {
        operator,
        operand1: a,
        operand2: b,
    } = *operation;

    let value = match operator {
        Operator::Add => a + b,
        Operator::Subtract => a - b,
        Operator::Multiply => a * b,
        Operator::Divide => {
            if b == 0.0 {
                return Err(ComputeError::DivisionByZero);
            }
            a / b
        }
    };

    if !value.is_finite() {
        return Err(ComputeError::NonFinite(operation.to_string()));
    }
    Ok(value)
}
