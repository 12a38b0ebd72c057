//! Queue types

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from the task queue
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    #[error("Queue full: capacity {capacity}, available {available}, requested {requested}")]
    QueueFull {
        capacity: usize,
        available: usize,
        requested: usize,
    },
}

/// Snapshot of queue occupancy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueState {
    pub capacity: usize,
    pub queued: usize,
    pub peak_depth: usize,
}

impl QueueState {
    pub fn available(&self) -> usize {
        self.capacity.saturating_sub(self.queued)
    }
}
