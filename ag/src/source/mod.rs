//! Task sources
//!
//! A `TaskSource` is the worker's view of the coordinator: pull one task,
//! report a value or a failure. Implementations exist for the HTTP API, the
//! RPC listener and an in-process `Coordinator`.

use std::sync::Arc;

use async_trait::async_trait;
use orchestrator::domain::Task;
use thiserror::Error;
use tracing::debug;

mod http;
mod local;
mod rpc;

pub use http::HttpSource;
pub use local::LocalSource;
pub use rpc::RpcSource;

use crate::config::{AgentConfig, Transport};

/// Errors from a task source
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Transport error: {message}")]
    Transport { message: String, retryable: bool },

    #[error("Failed to create source: {0}")]
    Setup(String),
}

impl SourceError {
    pub(crate) fn transport(message: impl ToString, retryable: bool) -> Self {
        SourceError::Transport {
            message: message.to_string(),
            retryable,
        }
    }

    /// Check if the coordinator did not recognise the task
    pub fn is_not_found(&self) -> bool {
        matches!(self, SourceError::TaskNotFound(_))
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            SourceError::Transport { retryable, .. } => *retryable,
            SourceError::TaskNotFound(_) | SourceError::Setup(_) => false,
        }
    }
}

/// Worker-facing half of the coordinator protocol
#[async_trait]
pub trait TaskSource: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &str;

    /// Pull one task; `None` when nothing is queued
    async fn pull_task(&self) -> Result<Option<Task>, SourceError>;

    async fn submit_result(&self, task_id: &str, value: f64) -> Result<(), SourceError>;

    async fn submit_failure(&self, task_id: &str, error: &str) -> Result<(), SourceError>;
}

/// Create a task source for the configured transport
pub fn create_source(config: &AgentConfig) -> Result<Arc<dyn TaskSource>, SourceError> {
    debug!(transport = %config.transport, "create_source: called");
    match config.transport {
        Transport::Http => {
            debug!(url = %config.http_url, "create_source: creating HTTP source");
            Ok(Arc::new(HttpSource::new(&config.http_url, config.timeout())?))
        }
        Transport::Rpc => {
            debug!(addr = %config.rpc_addr, "create_source: creating RPC source");
            Ok(Arc::new(RpcSource::new(&config.rpc_addr, config.timeout())))
        }
    }
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

    /// Outcome recorded by `MockSource`
    #[derive(Debug, Clone, PartialEq)]
    pub enum Submitted {
        Value(String, f64),
        Failure(String, String),
    }

    /// Scripted task source for unit tests
    #[derive(Default)]
    pub struct MockSource {
        tasks: Mutex<VecDeque<Task>>,
        submitted: Mutex<Vec<Submitted>>,
        transient_failures: AtomicU32,
        reject_all: bool,
        pull_count: AtomicUsize,
        submit_count: AtomicUsize,
    }

    impl MockSource {
        pub fn new(tasks: Vec<Task>) -> Self {
            debug!(task_count = %tasks.len(), "MockSource::new: called");
            Self {
                tasks: Mutex::new(tasks.into()),
                ..Default::default()
            }
        }

        /// Fail the next `count` submissions with a retryable error
        pub fn with_transient_failures(self, count: u32) -> Self {
            self.transient_failures.store(count, Ordering::SeqCst);
            self
        }

        /// Fail every submission with a non-retryable error
        pub fn rejecting(mut self) -> Self {
            self.reject_all = true;
            self
        }

        pub fn submitted(&self) -> Vec<Submitted> {
            self.submitted.lock().map(|s| s.clone()).unwrap_or_default()
        }

        pub fn pull_count(&self) -> usize {
            self.pull_count.load(Ordering::SeqCst)
        }

        pub fn submit_count(&self) -> usize {
            self.submit_count.load(Ordering::SeqCst)
        }

        fn record(&self, outcome: Submitted) -> Result<(), SourceError> {
            self.submit_count.fetch_add(1, Ordering::SeqCst);
            if self.reject_all {
                return Err(SourceError::transport("rejected", false));
            }
            let remaining = self.transient_failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.transient_failures.store(remaining - 1, Ordering::SeqCst);
                return Err(SourceError::transport("connection reset", true));
            }
            if let Ok(mut submitted) = self.submitted.lock() {
                submitted.push(outcome);
            }
            Ok(())
        }
    }

    #[async_trait]
    impl TaskSource for MockSource {
        fn name(&self) -> &str {
            "mock"
        }

        async fn pull_task(&self) -> Result<Option<Task>, SourceError> {
            self.pull_count.fetch_add(1, Ordering::SeqCst);
            Ok(self.tasks.lock().ok().and_then(|mut tasks| tasks.pop_front()))
        }

        async fn submit_result(&self, task_id: &str, value: f64) -> Result<(), SourceError> {
            self.record(Submitted::Value(task_id.to_string(), value))
        }

        async fn submit_failure(&self, task_id: &str, error: &str) -> Result<(), SourceError> {
            self.record(Submitted::Failure(task_id.to_string(), error.to_string()))
        }
    }
}
