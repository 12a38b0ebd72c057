//! In-process task source

use std::sync::Arc;

use async_trait::async_trait;
use orchestrator::coordinator::{Coordinator, CoordinatorError};
use orchestrator::domain::Task;

use super::{SourceError, TaskSource};

impl From<CoordinatorError> for SourceError {
    fn from(e: CoordinatorError) -> Self {
        match e {
            CoordinatorError::TaskNotFound(id) => SourceError::TaskNotFound(id),
            CoordinatorError::Persistence(_) => SourceError::transport(e, true),
            other => SourceError::transport(other, false),
        }
    }
}

/// Calls a shared `Coordinator` directly
pub struct LocalSource {
    coordinator: Arc<Coordinator>,
}

impl LocalSource {
    pub fn new(coordinator: Arc<Coordinator>) -> Self {
        Self { coordinator }
    }
}

#[async_trait]
impl TaskSource for LocalSource {
    fn name(&self) -> &str {
        "local"
    }

    async fn pull_task(&self) -> Result<Option<Task>, SourceError> {
        Ok(self.coordinator.pull_task().await)
    }

    async fn submit_result(&self, task_id: &str, value: f64) -> Result<(), SourceError> {
        Ok(self.coordinator.submit_result(task_id, value).await?)
    }

    async fn submit_failure(&self, task_id: &str, error: &str) -> Result<(), SourceError> {
        Ok(self.coordinator.submit_failure(task_id, error).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orchestrator::coordinator::CoordinatorConfig;
    use orchestrator::store::MemoryStore;

    fn source() -> (Arc<Coordinator>, LocalSource) {
        let coordinator = Arc::new(Coordinator::new(CoordinatorConfig::default(), Arc::new(MemoryStore::new())));
        (coordinator.clone(), LocalSource::new(coordinator))
    }

    #[tokio::test]
    async fn test_pull_and_submit() {
        let (coordinator, source) = source();
        let id = coordinator.submit("4 * 5", "u1").await.unwrap();

        let task = source.pull_task().await.unwrap().unwrap();
        source.submit_result(&task.id, 20.0).await.unwrap();

        let expression = coordinator.get_expression(&id, "u1").await.unwrap();
        assert_eq!(expression.result, Some(20.0));
    }

    #[tokio::test]
    async fn test_empty_queue_returns_none() {
        let (_coordinator, source) = source();
        assert!(source.pull_task().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unknown_task_is_not_found() {
        let (_coordinator, source) = source();
        let err = source.submit_failure("nope", "boom").await.unwrap_err();
        assert!(err.is_not_found());
    }
}
