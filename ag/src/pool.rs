//! Worker pool
//!
//! Spawns N independent workers, each on its own tokio task, and joins them
//! when the stop signal fires.

use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::watch;
use tracing::{debug, error, info};

use crate::source::{SourceError, TaskSource};
use crate::worker::{Worker, WorkerConfig, WorkerStats};

/// N workers sharing one stop signal
pub struct WorkerPool {
    workers: Vec<Worker>,
}

impl WorkerPool {
    /// Build `size` workers, asking `make_source` for each worker's source
    ///
    /// Per-worker sources keep one RPC connection per worker.
    pub fn new<F>(size: usize, config: WorkerConfig, mut make_source: F) -> Result<Self, SourceError>
    where
        F: FnMut(usize) -> Result<Arc<dyn TaskSource>, SourceError>,
    {
        debug!(%size, "WorkerPool::new: called");
        let workers = (0..size)
            .map(|id| Ok(Worker::new(id, make_source(id)?, config.clone())))
            .collect::<Result<Vec<_>, SourceError>>()?;
        Ok(Self { workers })
    }

    /// Every worker uses the same source
    pub fn shared(size: usize, config: WorkerConfig, source: Arc<dyn TaskSource>) -> Self {
        debug!(%size, "WorkerPool::shared: called");
        let workers = (0..size)
            .map(|id| Worker::new(id, source.clone(), config.clone()))
            .collect();
        Self { workers }
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Run all workers until `stop` turns true and return the summed counters
    pub async fn run(self, stop: watch::Receiver<bool>) -> WorkerStats {
        info!(workers = self.workers.len(), "Worker pool starting");

        let handles: Vec<_> = self
            .workers
            .into_iter()
            .map(|worker| tokio::spawn(worker.run(stop.clone())))
            .collect();

        let mut total = WorkerStats::default();
        for (id, joined) in join_all(handles).await.into_iter().enumerate() {
            match joined {
                Ok(stats) => total.merge(&stats),
                Err(e) => error!(worker = id, error = %e, "Worker task panicked"),
            }
        }

        info!(stats = ?total, "Worker pool stopped");
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::mock::MockSource;
    use orchestrator::domain::{Operation, Operator, Task};
    use std::time::Duration;

    fn fast_config() -> WorkerConfig {
        WorkerConfig {
            poll_backoff: Duration::from_millis(5),
            submit_retries: 1,
            retry_backoff: Duration::from_millis(1),
        }
    }

    #[test]
    fn test_new_builds_one_source_per_worker() {
        let mut made = Vec::new();
        let pool = WorkerPool::new(3, fast_config(), |id| {
            made.push(id);
            Ok(Arc::new(MockSource::new(vec![])) as Arc<dyn TaskSource>)
        })
        .unwrap();

        assert_eq!(pool.len(), 3);
        assert_eq!(made, vec![0, 1, 2]);
    }

    #[test]
    fn test_new_propagates_source_errors() {
        let result = WorkerPool::new(2, fast_config(), |_| Err(SourceError::Setup("bad url".to_string())));
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_pool_processes_all_tasks() {
        let tasks: Vec<Task> = (0..20)
            .map(|i| Task::new("expr-1", i, Operation::new(Operator::Add, i as f64, 1.0), 1))
            .collect();
        let source = Arc::new(MockSource::new(tasks));
        let pool = WorkerPool::shared(4, fast_config(), source.clone());
        let (tx, rx) = watch::channel(false);

        let handle = tokio::spawn(pool.run(rx));
        for _ in 0..200 {
            if source.submitted().len() == 20 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        tx.send(true).unwrap();

        let stats = tokio::time::timeout(Duration::from_secs(2), handle).await.unwrap().unwrap();
        assert_eq!(stats.tasks_completed, 20);
        assert_eq!(source.submitted().len(), 20);
    }

    #[tokio::test]
    async fn test_empty_pool_returns_immediately() {
        let pool = WorkerPool::shared(0, fast_config(), Arc::new(MockSource::new(vec![])));
        assert!(pool.is_empty());
        let (_tx, rx) = watch::channel(false);
        assert_eq!(pool.run(rx).await, WorkerStats::default());
    }
}
