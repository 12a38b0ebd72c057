//! Coordinator for task distribution and result reconciliation
//!
//! Owns the task queue, the issued-task table and per-expression progress.
//! Callers submit expressions and query them; workers pull tasks and submit
//! outcomes. Each outcome is matched to its expression by the task's
//! `expression_id`.

mod config;
mod core;
mod progress;
mod types;

pub use self::core::Coordinator;
pub use config::{CoordinatorConfig, OperationTimings};
pub use types::{CoordinatorError, CoordinatorMetrics};
