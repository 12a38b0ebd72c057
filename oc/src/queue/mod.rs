//! Bounded FIFO of pending tasks
//!
//! An expression's tasks enter the queue as one batch or not at all.
//! Each task is handed out to at most one consumer.

mod core;
mod types;

pub use self::core::TaskQueue;
pub use types::{QueueError, QueueState};
