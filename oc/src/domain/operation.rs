//! Binary operations produced by decomposition

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Arithmetic operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Subtract,
    #[serde(rename = "*")]
    Multiply,
    #[serde(rename = "/")]
    Divide,
}

/// Operation class used to pick the artificial compute delay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationClass {
    Addition,
    Subtraction,
    Multiplication,
    Division,
}

impl Operator {
    /// Map a character to an operator
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '+' => Some(Self::Add),
            '-' => Some(Self::Subtract),
            '*' => Some(Self::Multiply),
            '/' => Some(Self::Divide),
            _ => None,
        }
    }

    /// The operator's symbol
    pub fn as_char(&self) -> char {
        match self {
            Self::Add => '+',
            Self::Subtract => '-',
            Self::Multiply => '*',
            Self::Divide => '/',
        }
    }

    /// `*` and `/` bind tighter than `+` and `-`
    pub fn binds_tight(&self) -> bool {
        matches!(self, Self::Multiply | Self::Divide)
    }

    pub fn class(&self) -> OperationClass {
        match self {
            Self::Add => OperationClass::Addition,
            Self::Subtract => OperationClass::Subtraction,
            Self::Multiply => OperationClass::Multiplication,
            Self::Divide => OperationClass::Division,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

impl FromStr for Operator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Self::from_char(c).ok_or_else(|| format!("Unknown operator: {}", s)),
            _ => Err(format!("Unknown operator: {}", s)),
        }
    }
}

/// One binary operation: `operand1 operator operand2`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub operator: Operator,
    pub operand1: f64,
    pub operand2: f64,
}

impl Operation {
    pub fn new(operator: Operator, operand1: f64, operand2: f64) -> Self {
        Self {
            operator,
            operand1,
            operand2,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.operand1, self.operator, self.operand2)
    }
}
