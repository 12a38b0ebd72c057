//! Coordinator implementation

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::config::CoordinatorConfig;
use super::progress::{ExpressionProgress, Transition};
use super::types::{CoordinatorError, CoordinatorMetrics};
use crate::decomposer::decompose;
use crate::domain::{Expression, Task, TaskOutcome};
use crate::queue::TaskQueue;
use crate::store::{ExpressionStore, RetryPolicy, StoreError};

/// Error recorded for tasks failed by the stale-task sweep
pub const TIMEOUT_ERROR: &str = "task timed out";

/// A task handed to a worker
struct IssuedTask {
    task: Task,
    issued_at: Instant,
    outcome: Option<TaskOutcome>,
    resolved_at: Option<Instant>,
}

impl IssuedTask {
    fn resolve(&mut self, outcome: TaskOutcome) {
        self.outcome = Some(outcome);
        self.resolved_at.get_or_insert_with(Instant::now);
    }

    fn reopen(&mut self) {
        self.outcome = None;
        self.resolved_at = None;
    }
}

/// Expression-level counters
#[derive(Debug, Default)]
struct CoordinatorStats {
    expressions_submitted: u64,
    expressions_completed: u64,
    expressions_failed: u64,
    submissions_rejected: u64,
    tasks_expired: u64,
    tasks_pruned: u64,
}

/// Internal state protected by mutex
struct CoordinatorInner {
    /// Progress of non-terminal expressions
    progress: HashMap<String, ExpressionProgress>,
    stats: CoordinatorStats,
}

/// Arbitrates task pulls and result submissions
///
/// Lock order is `inner` then `issued`. `pull_task` only takes the queue
/// and `issued` locks.
pub struct Coordinator {
    config: CoordinatorConfig,
    queue: TaskQueue,
    issued: Mutex<HashMap<String, IssuedTask>>,
    inner: Mutex<CoordinatorInner>,
    store: Arc<dyn ExpressionStore>,
    retry: RetryPolicy,
}

impl Coordinator {
    /// Create a new coordinator persisting expressions to `store`
    pub fn new(config: CoordinatorConfig, store: Arc<dyn ExpressionStore>) -> Self {
        debug!(?config, "Coordinator::new: called");
        Self {
            queue: TaskQueue::new(config.queue_capacity),
            config,
            issued: Mutex::new(HashMap::new()),
            inner: Mutex::new(CoordinatorInner {
                progress: HashMap::new(),
                stats: CoordinatorStats::default(),
            }),
            store,
            retry: RetryPolicy::default(),
        }
    }

    /// Override the persistence retry policy
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Decompose, enqueue and persist an expression, returning its id
    pub async fn submit(&self, text: &str, owner: &str) -> Result<String, CoordinatorError> {
        debug!(%text, %owner, "Coordinator::submit: called");

        let operations = match decompose(text) {
            Ok(operations) => operations,
            Err(e) => {
                debug!(error = %e, "Coordinator::submit: decomposition failed");
                self.inner.lock().await.stats.submissions_rejected += 1;
                return Err(e.into());
            }
        };

        let expression = Expression::new(text, owner);
        let tasks: Vec<Task> = operations
            .into_iter()
            .enumerate()
            .map(|(seq, op)| Task::new(&expression.id, seq, op, self.config.timings.for_operator(op.operator)))
            .collect();
        let task_count = tasks.len();

        let mut inner = self.inner.lock().await;

        if let Err(e) = self.queue.push_batch(tasks).await {
            warn!(id = %expression.id, error = %e, "Rejecting expression, queue full");
            inner.stats.submissions_rejected += 1;
            return Err(e.into());
        }

        let store = &self.store;
        let inserted = self
            .retry
            .run("insert", || store.insert(expression.clone()))
            .await;
        if let Err(e) = inserted {
            warn!(id = %expression.id, error = %e, "Failed to persist expression, retracting tasks");
            self.queue.retract(&expression.id).await;
            inner.stats.submissions_rejected += 1;
            return Err(e.into());
        }

        inner
            .progress
            .insert(expression.id.clone(), ExpressionProgress::new(task_count));
        inner.stats.expressions_submitted += 1;

        info!(id = %expression.id, %owner, tasks = task_count, "Expression submitted");
        Ok(expression.id)
    }

    /// Read one expression visible to `owner`
    pub async fn get_expression(&self, id: &str, owner: &str) -> Result<Expression, CoordinatorError> {
        debug!(%id, %owner, "Coordinator::get_expression: called");
        match self.store.get(id).await? {
            Some(expression) if expression.owner == owner => Ok(expression),
            Some(_) => {
                debug!(%id, "Coordinator::get_expression: foreign owner");
                Err(CoordinatorError::NotFound(id.to_string()))
            }
            None => Err(CoordinatorError::NotFound(id.to_string())),
        }
    }

    /// All expressions of `owner`, oldest first
    pub async fn list_expressions(&self, owner: &str) -> Result<Vec<Expression>, CoordinatorError> {
        debug!(%owner, "Coordinator::list_expressions: called");
        Ok(self.store.list_by_owner(owner).await?)
    }

    /// Hand out the next queued task without waiting
    pub async fn pull_task(&self) -> Option<Task> {
        debug!("Coordinator::pull_task: called");
        let task = self.queue.pop().await?;

        self.issued.lock().await.insert(
            task.id.clone(),
            IssuedTask {
                task: task.clone(),
                issued_at: Instant::now(),
                outcome: None,
                resolved_at: None,
            },
        );

        debug!(task_id = %task.id, expression_id = %task.expression_id, "Coordinator::pull_task: issued");
        Some(task)
    }

    /// Record a computed value for an issued task
    pub async fn submit_result(&self, task_id: &str, value: f64) -> Result<(), CoordinatorError> {
        debug!(%task_id, %value, "Coordinator::submit_result: called");
        self.submit_outcome(task_id, TaskOutcome::Value(value)).await
    }

    /// Record an explicit failure for an issued task
    pub async fn submit_failure(&self, task_id: &str, error: &str) -> Result<(), CoordinatorError> {
        debug!(%task_id, %error, "Coordinator::submit_failure: called");
        self.submit_outcome(task_id, TaskOutcome::Failed(error.to_string())).await
    }

    async fn submit_outcome(&self, task_id: &str, outcome: TaskOutcome) -> Result<(), CoordinatorError> {
        let mut inner = self.inner.lock().await;

        let task = {
            let mut issued = self.issued.lock().await;
            let entry = issued
                .get_mut(task_id)
                .ok_or_else(|| CoordinatorError::TaskNotFound(task_id.to_string()))?;
            let first = entry.outcome.is_none();
            entry.resolve(outcome.clone());
            if !first {
                debug!(%task_id, "Coordinator::submit_outcome: duplicate outcome, overwritten");
                return Ok(());
            }
            entry.task.clone()
        };

        if let Err(e) = self.reconcile(&mut inner, &task, &outcome).await {
            // Let the worker's retry count as the first outcome again
            if let Some(entry) = self.issued.lock().await.get_mut(task_id) {
                entry.reopen();
            }
            return Err(e);
        }
        Ok(())
    }

    /// Apply a first outcome to the owning expression
    async fn reconcile(
        &self,
        inner: &mut CoordinatorInner,
        task: &Task,
        outcome: &TaskOutcome,
    ) -> Result<(), CoordinatorError> {
        debug!(task_id = %task.id, expression_id = %task.expression_id, seq = task.seq, "Coordinator::reconcile: called");

        let Some(progress) = inner.progress.get_mut(&task.expression_id) else {
            debug!(expression_id = %task.expression_id, "Coordinator::reconcile: expression already terminal");
            return Ok(());
        };

        let before = progress.clone();
        let transition = progress.record(task.seq, outcome);
        let terminal = progress.status().is_terminal();

        if let Err(e) = self.apply(&task.expression_id, &transition).await {
            warn!(expression_id = %task.expression_id, error = %e, "Failed to persist expression transition");
            inner.progress.insert(task.expression_id.clone(), before);
            return Err(e.into());
        }

        match &transition {
            Transition::Completed(value) => {
                inner.stats.expressions_completed += 1;
                info!(expression_id = %task.expression_id, %value, "Expression completed");
            }
            Transition::Failed(error) => {
                inner.stats.expressions_failed += 1;
                info!(expression_id = %task.expression_id, %error, "Expression failed");
            }
            Transition::Started | Transition::None => {}
        }

        if terminal {
            inner.progress.remove(&task.expression_id);
        }
        Ok(())
    }

    /// Write a transition with compare-and-swap against the stored status
    async fn apply(&self, expression_id: &str, transition: &Transition) -> Result<(), StoreError> {
        if *transition == Transition::None {
            return Ok(());
        }
        debug!(%expression_id, ?transition, "Coordinator::apply: called");

        let store = &self.store;
        let current = self
            .retry
            .run("get", || store.get(expression_id))
            .await?
            .ok_or_else(|| StoreError::NotFound(expression_id.to_string()))?;

        if current.is_terminal() {
            warn!(%expression_id, status = %current.status, "Coordinator::apply: stored expression already terminal");
            return Ok(());
        }

        let next = match transition {
            Transition::Started => current.processing(),
            Transition::Completed(value) => current.completed(*value),
            Transition::Failed(error) => current.failed(error.as_str()),
            Transition::None => return Ok(()),
        };

        let expected = current.status;
        self.retry
            .run("compare_and_swap", || store.compare_and_swap(expected, next.clone()))
            .await
    }

    /// Fail issued tasks that have gone without an outcome past the timeout
    ///
    /// Also drops resolved tasks of terminal expressions once they are older
    /// than the retention window. Returns the number of tasks expired.
    pub async fn expire_stale_tasks(&self) -> Result<usize, CoordinatorError> {
        debug!("Coordinator::expire_stale_tasks: called");
        let timeout = self.config.task_timeout();
        let outcome = TaskOutcome::Failed(TIMEOUT_ERROR.to_string());
        let mut inner = self.inner.lock().await;

        let stale: Vec<Task> = {
            let mut issued = self.issued.lock().await;
            issued
                .values_mut()
                .filter(|entry| entry.outcome.is_none() && entry.issued_at.elapsed() >= timeout)
                .map(|entry| {
                    entry.resolve(outcome.clone());
                    entry.task.clone()
                })
                .collect()
        };

        let mut first_error = None;
        for task in &stale {
            warn!(task_id = %task.id, expression_id = %task.expression_id, "Expiring stale task");
            match self.reconcile(&mut inner, task, &outcome).await {
                Ok(()) => inner.stats.tasks_expired += 1,
                Err(e) => {
                    if let Some(entry) = self.issued.lock().await.get_mut(&task.id) {
                        entry.reopen();
                    }
                    first_error.get_or_insert(e);
                }
            }
        }

        let pruned = self.prune_resolved(&inner).await;
        inner.stats.tasks_pruned += pruned as u64;

        match first_error {
            Some(e) => Err(e),
            None => Ok(stale.len()),
        }
    }

    /// Remove resolved tasks whose expression is terminal and whose
    /// retention window has passed
    async fn prune_resolved(&self, inner: &CoordinatorInner) -> usize {
        let retention = self.config.task_retention();
        let mut issued = self.issued.lock().await;
        let before = issued.len();
        issued.retain(|_, entry| match entry.resolved_at {
            Some(at) => at.elapsed() < retention || inner.progress.contains_key(&entry.task.expression_id),
            None => true,
        });
        let pruned = before - issued.len();
        if pruned > 0 {
            debug!(%pruned, retained = issued.len(), "Coordinator::prune_resolved: dropped resolved tasks");
        }
        pruned
    }

    /// Current counters
    pub async fn metrics(&self) -> CoordinatorMetrics {
        debug!("Coordinator::metrics: called");
        let inner = self.inner.lock().await;
        let issued = self.issued.lock().await;

        let queue = self.queue.state().await;

        let mut metrics = CoordinatorMetrics {
            queue_capacity: queue.capacity,
            queue_available: queue.available(),
            queue_peak_depth: queue.peak_depth,
            tasks_queued: queue.queued,
            tasks_issued: issued.len(),
            tasks_expired: inner.stats.tasks_expired,
            tasks_pruned: inner.stats.tasks_pruned,
            expressions_submitted: inner.stats.expressions_submitted,
            expressions_completed: inner.stats.expressions_completed,
            expressions_failed: inner.stats.expressions_failed,
            submissions_rejected: inner.stats.submissions_rejected,
            ..Default::default()
        };
        for entry in issued.values() {
            match &entry.outcome {
                None => metrics.tasks_unresolved += 1,
                Some(TaskOutcome::Value(_)) => metrics.tasks_resolved += 1,
                Some(TaskOutcome::Failed(_)) => metrics.tasks_failed += 1,
            }
        }
        metrics
    }
}
