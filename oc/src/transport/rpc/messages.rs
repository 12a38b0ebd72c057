//! RPC message types

use serde::{Deserialize, Serialize};

use crate::coordinator::CoordinatorMetrics;
use crate::domain::Task;

/// Requests from worker to coordinator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RpcRequest {
    /// Take the next queued task, if any
    PullTask,

    /// Report a computed value
    SubmitResult { task_id: String, value: f64 },

    /// Report that a task could not be computed
    SubmitFailure { task_id: String, error: String },

    Metrics,

    Ping,
}

/// Responses from coordinator to worker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RpcResponse {
    Task {
        has_task: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        task: Option<Task>,
    },

    Submitted {
        ok: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },

    Metrics(CoordinatorMetrics),

    Pong { version: String },

    Error { message: String },
}
