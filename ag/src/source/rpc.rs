//! Task source over the orchestrator RPC listener

use std::time::Duration;

use async_trait::async_trait;
use orchestrator::domain::Task;
use orchestrator::transport::rpc::{RpcClient, RpcError};

use super::{SourceError, TaskSource};

impl From<RpcError> for SourceError {
    fn from(e: RpcError) -> Self {
        match e {
            RpcError::Rejected(message) if message.starts_with("Task not found") => SourceError::TaskNotFound(message),
            other => {
                let retryable = other.is_retryable();
                SourceError::transport(other, retryable)
            }
        }
    }
}

/// Keeps one connection to the RPC listener per worker
pub struct RpcSource {
    client: RpcClient,
}

impl RpcSource {
    pub fn new(addr: &str, timeout: Duration) -> Self {
        Self {
            client: RpcClient::new(addr).with_timeout(timeout),
        }
    }
}

#[async_trait]
impl TaskSource for RpcSource {
    fn name(&self) -> &str {
        "rpc"
    }

    async fn pull_task(&self) -> Result<Option<Task>, SourceError> {
        Ok(self.client.pull_task().await?)
    }

    async fn submit_result(&self, task_id: &str, value: f64) -> Result<(), SourceError> {
        Ok(self.client.submit_result(task_id, value).await?)
    }

    async fn submit_failure(&self, task_id: &str, error: &str) -> Result<(), SourceError> {
        Ok(self.client.submit_failure(task_id, error).await?)
    }
}
