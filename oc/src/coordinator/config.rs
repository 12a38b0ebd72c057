//! Coordinator configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::{OperationClass, Operator};

/// Artificial compute delay per operation class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperationTimings {
    #[serde(rename = "addition-ms")]
    pub addition_ms: i64,

    #[serde(rename = "subtraction-ms")]
    pub subtraction_ms: i64,

    #[serde(rename = "multiplication-ms")]
    pub multiplication_ms: i64,

    #[serde(rename = "division-ms")]
    pub division_ms: i64,
}

impl Default for OperationTimings {
    fn default() -> Self {
        Self {
            addition_ms: 1000,
            subtraction_ms: 1000,
            multiplication_ms: 2000,
            division_ms: 2000,
        }
    }
}

impl OperationTimings {
    /// No delay for any operator
    pub fn zero() -> Self {
        Self {
            addition_ms: 0,
            subtraction_ms: 0,
            multiplication_ms: 0,
            division_ms: 0,
        }
    }

    /// Delay stamped on tasks for the given operator
    pub fn for_operator(&self, operator: Operator) -> i64 {
        match operator.class() {
            OperationClass::Addition => self.addition_ms,
            OperationClass::Subtraction => self.subtraction_ms,
            OperationClass::Multiplication => self.multiplication_ms,
            OperationClass::Division => self.division_ms,
        }
    }
}

/// Coordinator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Maximum number of queued tasks
    #[serde(rename = "queue-capacity")]
    pub queue_capacity: usize,

    /// Seconds an issued task may go without an outcome before it is failed
    #[serde(rename = "task-timeout-secs")]
    pub task_timeout_secs: u64,

    /// Interval of the stale-task sweep
    #[serde(rename = "sweep-interval-secs")]
    pub sweep_interval_secs: u64,

    /// Seconds a resolved task stays in the issued table after its
    /// expression turns terminal. Duplicate submissions inside this window
    /// are acknowledged; later ones are reported as unknown tasks.
    #[serde(rename = "task-retention-secs")]
    pub task_retention_secs: u64,

    pub timings: OperationTimings,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 100,
            task_timeout_secs: 300,
            sweep_interval_secs: 10,
            task_retention_secs: 300,
            timings: OperationTimings::default(),
        }
    }
}

impl CoordinatorConfig {
    pub fn task_timeout(&self) -> Duration {
        Duration::from_secs(self.task_timeout_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }

    pub fn task_retention(&self) -> Duration {
        Duration::from_secs(self.task_retention_secs)
    }
}
