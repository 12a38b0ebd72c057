//! Worker unit
//!
//! Each worker cycles `Idle → Fetching → Computing → Submitting → Idle`.
//! The stop signal is checked between states and interrupts the poll
//! backoff and the computation delay.

use std::sync::Arc;
use std::time::Duration;

use orchestrator::domain::Task;
use orchestrator::transport::wait_for_shutdown;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::compute::compute;
use crate::config::AgentConfig;
use crate::source::TaskSource;

/// Error submitted for a task abandoned because the worker was stopped
pub const STOPPED_ERROR: &str = "worker stopped";

/// Worker lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    Fetching,
    Computing,
    Submitting,
    Stopped,
}

impl std::fmt::Display for WorkerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Fetching => write!(f, "fetching"),
            Self::Computing => write!(f, "computing"),
            Self::Submitting => write!(f, "submitting"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

/// Timing and retry settings for one worker
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Sleep after an empty or failed pull
    pub poll_backoff: Duration,

    /// Attempts per submission
    pub submit_retries: u32,

    /// Attempt n waits `retry_backoff * n` before the next one
    pub retry_backoff: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self::from(&AgentConfig::default())
    }
}

impl From<&AgentConfig> for WorkerConfig {
    fn from(config: &AgentConfig) -> Self {
        Self {
            poll_backoff: config.poll_backoff(),
            submit_retries: config.submit_retries.max(1),
            retry_backoff: config.retry_backoff(),
        }
    }
}

/// Per-worker counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    /// Values delivered
    pub tasks_completed: u64,

    /// Failures delivered (division by zero, stopped mid-task)
    pub tasks_failed: u64,

    /// Outcomes abandoned after the last submission attempt
    pub submissions_dropped: u64,

    pub pull_errors: u64,
}

impl WorkerStats {
    pub fn merge(&mut self, other: &WorkerStats) {
        self.tasks_completed += other.tasks_completed;
        self.tasks_failed += other.tasks_failed;
        self.submissions_dropped += other.submissions_dropped;
        self.pull_errors += other.pull_errors;
    }
}

/// Result of one fetch/compute/submit cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// A task was pulled and its outcome handled
    Processed,
    /// Nothing to do; caller should back off
    Empty,
    /// Stop signal observed
    Stopped,
}

/// One independent compute unit
pub struct Worker {
    id: usize,
    source: Arc<dyn TaskSource>,
    config: WorkerConfig,
    state: WorkerState,
    stats: WorkerStats,
}

impl Worker {
    pub fn new(id: usize, source: Arc<dyn TaskSource>, config: WorkerConfig) -> Self {
        debug!(%id, source = source.name(), "Worker::new: called");
        Self {
            id,
            source,
            config,
            state: WorkerState::Idle,
            stats: WorkerStats::default(),
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    pub fn stats(&self) -> WorkerStats {
        self.stats
    }

    /// Loop until `stop` turns true, returning the final counters
    pub async fn run(mut self, stop: watch::Receiver<bool>) -> WorkerStats {
        info!(worker = self.id, source = self.source.name(), "Worker started");

        while !*stop.borrow() {
            match self.step(&stop).await {
                Step::Processed => {}
                Step::Empty => {
                    if !sleep_or_stop(self.config.poll_backoff, &stop).await {
                        break;
                    }
                }
                Step::Stopped => break,
            }
        }

        self.state = WorkerState::Stopped;
        info!(worker = self.id, stats = ?self.stats, "Worker stopped");
        self.stats
    }

    /// Run one `Idle → Fetching → Computing → Submitting → Idle` cycle
    pub async fn step(&mut self, stop: &watch::Receiver<bool>) -> Step {
        self.state = WorkerState::Fetching;
        let task = match self.source.pull_task().await {
            Ok(Some(task)) => task,
            Ok(None) => {
                self.state = WorkerState::Idle;
                return Step::Empty;
            }
            Err(e) => {
                warn!(worker = self.id, error = %e, "Failed to pull task");
                self.stats.pull_errors += 1;
                self.state = WorkerState::Idle;
                return Step::Empty;
            }
        };
        debug!(worker = self.id, task_id = %task.id, operation = %task.operation(), "Worker::step: pulled task");

        self.state = WorkerState::Computing;
        let delay = Duration::from_millis(task.operation_time_ms.max(0) as u64);
        if !sleep_or_stop(delay, stop).await {
            warn!(worker = self.id, task_id = %task.id, "Stopped mid-task, reporting failure");
            self.state = WorkerState::Submitting;
            self.deliver(&task, Err(STOPPED_ERROR.to_string())).await;
            self.state = WorkerState::Idle;
            return Step::Stopped;
        }

        let outcome = compute(&task.operation()).map_err(|e| {
            warn!(worker = self.id, task_id = %task.id, error = %e, "Computation failed");
            e.to_string()
        });

        self.state = WorkerState::Submitting;
        self.deliver(&task, outcome).await;
        self.state = WorkerState::Idle;
        Step::Processed
    }

    /// Submit a value or failure with bounded retry
    async fn deliver(&mut self, task: &Task, outcome: Result<f64, String>) {
        let attempts = self.config.submit_retries.max(1);
        for attempt in 1..=attempts {
            let result = match &outcome {
                Ok(value) => self.source.submit_result(&task.id, *value).await,
                Err(error) => self.source.submit_failure(&task.id, error).await,
            };

            match result {
                Ok(()) => {
                    match &outcome {
                        Ok(value) => {
                            debug!(worker = self.id, task_id = %task.id, %value, "Worker::deliver: result accepted");
                            self.stats.tasks_completed += 1;
                        }
                        Err(error) => {
                            debug!(worker = self.id, task_id = %task.id, %error, "Worker::deliver: failure accepted");
                            self.stats.tasks_failed += 1;
                        }
                    }
                    return;
                }
                Err(e) if e.is_retryable() && attempt < attempts => {
                    let delay = self.config.retry_backoff * attempt;
                    warn!(
                        worker = self.id,
                        task_id = %task.id,
                        attempt,
                        error = %e,
                        "Submission failed, retrying in {:?}",
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    warn!(worker = self.id, task_id = %task.id, attempt, error = %e, "Giving up on submission");
                    self.stats.submissions_dropped += 1;
                    return;
                }
            }
        }
    }
}

/// Sleep for `duration` unless `stop` turns true first; false means stopped
async fn sleep_or_stop(duration: Duration, stop: &watch::Receiver<bool>) -> bool {
    if *stop.borrow() {
        return false;
    }
    if duration.is_zero() {
        return true;
    }
    tokio::select! {
        _ = tokio::time::sleep(duration) => true,
        _ = wait_for_shutdown(stop.clone()) => false,
    }
}
