//! Decomposition errors

use thiserror::Error;

/// Errors from decomposing an expression
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("Empty expression")]
    Empty,

    #[error("Invalid character '{ch}' at position {position}")]
    InvalidCharacter { ch: char, position: usize },

    #[error("Invalid number: {0}")]
    InvalidNumber(String),

    #[error("Missing operand at position {position}")]
    MissingOperand { position: usize },

    #[error("Missing operator at position {position}")]
    MissingOperator { position: usize },

    #[error("No operator found")]
    NoOperator,

    #[error("Unsupported expression: {0}")]
    Unsupported(String),
}
