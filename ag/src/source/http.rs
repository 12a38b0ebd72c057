//! Task source over the orchestrator HTTP API

use std::time::Duration;

use async_trait::async_trait;
use orchestrator::domain::Task;
use orchestrator::transport::{ApiClient, ApiClientError};

use super::{SourceError, TaskSource};

impl From<ApiClientError> for SourceError {
    fn from(e: ApiClientError) -> Self {
        match e {
            ApiClientError::Status { status: 404, message } => SourceError::TaskNotFound(message),
            other => {
                let retryable = other.is_retryable();
                SourceError::transport(other, retryable)
            }
        }
    }
}

/// Polls `/internal/task` and posts outcomes back
pub struct HttpSource {
    client: ApiClient,
}

impl HttpSource {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, SourceError> {
        let client = ApiClient::with_timeout(base_url, timeout).map_err(|e| SourceError::Setup(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl TaskSource for HttpSource {
    fn name(&self) -> &str {
        "http"
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
