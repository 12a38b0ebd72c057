//! Task queue implementation

use std::collections::VecDeque;

use tokio::sync::Mutex;
use tracing::debug;

use super::types::{QueueError, QueueState};
use crate::domain::Task;

/// Internal state protected by mutex
struct QueueInner {
    tasks: VecDeque<Task>,
    peak_depth: usize,
}

/// Bounded, multi-consumer FIFO of tasks
pub struct TaskQueue {
    capacity: usize,
    inner: Mutex<QueueInner>,
}

impl TaskQueue {
    /// Create an empty queue holding at most `capacity` tasks
    pub fn new(capacity: usize) -> Self {
        debug!(%capacity, "TaskQueue::new: called");
        Self {
            capacity,
            inner: Mutex::new(QueueInner {
                tasks: VecDeque::new(),
                peak_depth: 0,
            }),
        }
    }

    /// Enqueue all tasks or none of them
    pub async fn push_batch(&self, batch: Vec<Task>) -> Result<(), QueueError> {
        debug!(requested = batch.len(), "TaskQueue::push_batch: called");
        let mut inner = self.inner.lock().await;

        let available = self.capacity.saturating_sub(inner.tasks.len());
        if batch.len() > available {
            debug!(%available, "TaskQueue::push_batch: batch does not fit, rejecting");
            return Err(QueueError::QueueFull {
                capacity: self.capacity,
                available,
                requested: batch.len(),
            });
        }

        inner.tasks.extend(batch);
        inner.peak_depth = inner.peak_depth.max(inner.tasks.len());
        debug!(queued = inner.tasks.len(), "TaskQueue::push_batch: enqueued");
        Ok(())
    }

    /// Take the oldest task, if any. Never waits for tasks to arrive.
    pub async fn pop(&self) -> Option<Task> {
        debug!("TaskQueue::pop: called");
        let mut inner = self.inner.lock().await;
        let task = inner.tasks.pop_front();
        if let Some(task) = &task {
            debug!(task_id = %task.id, "TaskQueue::pop: dequeued");
        }
        task
    }

    /// Remove still-queued tasks of one expression, returning how many were removed
    pub async fn retract(&self, expression_id: &str) -> usize {
        debug!(%expression_id, "TaskQueue::retract: called");
        let mut inner = self.inner.lock().await;
        let before = inner.tasks.len();
        inner.tasks.retain(|t| t.expression_id != expression_id);
        let removed = before - inner.tasks.len();
        debug!(%removed, "TaskQueue::retract: done");
        removed
    }

    /// Current occupancy snapshot
    pub async fn state(&self) -> QueueState {
        let inner = self.inner.lock().await;
        QueueState {
            capacity: self.capacity,
            queued: inner.tasks.len(),
            peak_depth: inner.peak_depth,
        }
    }
}
