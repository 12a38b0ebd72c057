//! Coordinator error and metrics types

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::decomposer::ParseError;
use crate::queue::QueueError;
use crate::store::StoreError;

/// Errors surfaced by coordinator operations
#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error(transparent)]
    QueueFull(#[from] QueueError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] StoreError),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Expression not found: {0}")]
    NotFound(String),
}

/// Coordinator counters for observability
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinatorMetrics {
    pub queue_capacity: usize,
    pub queue_available: usize,
    /// Highest queue depth seen since startup
    pub queue_peak_depth: usize,
    pub tasks_queued: usize,
    /// Issued tasks still held in the issued table
    pub tasks_issued: usize,
    pub tasks_unresolved: usize,
    pub tasks_resolved: usize,
    pub tasks_failed: usize,
    pub tasks_expired: u64,
    /// Resolved tasks dropped from the issued table after retention
    pub tasks_pruned: u64,
    pub expressions_submitted: u64,
    pub expressions_completed: u64,
    pub expressions_failed: u64,
    pub submissions_rejected: u64,
}
