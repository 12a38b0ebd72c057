//! Expression domain type
//!
//! Tracks a submitted arithmetic problem through pending → processing →
//! completed (or failed).

use serde::{Deserialize, Serialize};

use super::id::{new_id, now_ms};

/// Expression lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExpressionStatus {
    /// Tasks enqueued, no result yet
    #[default]
    Pending,
    /// At least one task resolved
    Processing,
    /// All tasks resolved, result set
    Completed,
    /// A task failed or timed out, error set
    Failed,
}

impl ExpressionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl std::fmt::Display for ExpressionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Processing => write!(f, "processing"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// A submitted expression and its aggregate state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expression {
    /// Unique identifier
    pub id: String,

    /// Raw expression text as submitted
    pub expression: String,

    pub status: ExpressionStatus,

    /// Final value, set iff status is completed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<f64>,

    /// Failure reason, set iff status is failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Submitting principal
    pub owner: String,

    /// Creation timestamp (unix ms)
    pub created_at: i64,

    /// Last update timestamp (unix ms)
    pub updated_at: i64,
}

impl Expression {
    /// Create a new pending expression
    pub fn new(expression: impl Into<String>, owner: impl Into<String>) -> Self {
        let now = now_ms();
        Self {
            id: new_id(),
            expression: expression.into(),
            status: ExpressionStatus::Pending,
            result: None,
            error: None,
            owner: owner.into(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Copy advanced to processing
    pub fn processing(&self) -> Self {
        Self {
            status: ExpressionStatus::Processing,
            updated_at: now_ms(),
            ..self.clone()
        }
    }

    /// Copy advanced to completed with a result
    pub fn completed(&self, result: f64) -> Self {
        Self {
            status: ExpressionStatus::Completed,
            result: Some(result),
            error: None,
            updated_at: now_ms(),
            ..self.clone()
        }
    }

    /// Copy advanced to failed with a reason
    pub fn failed(&self, error: impl Into<String>) -> Self {
        Self {
            status: ExpressionStatus::Failed,
            result: None,
            error: Some(error.into()),
            updated_at: now_ms(),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_expression_is_pending() {
        let expr = Expression::new("10 - 5", "u1");
        assert_eq!(expr.status, ExpressionStatus::Pending);
        assert!(expr.result.is_none());
        assert!(expr.error.is_none());
        assert_eq!(expr.owner, "u1");
    }

    #[test]
    fn test_result_set_only_when_completed() {
        let expr = Expression::new("10 - 5", "u1");
        let processing = expr.processing();
        assert_eq!(processing.status, ExpressionStatus::Processing);
        assert!(processing.result.is_none());

        let done = processing.completed(5.0);
        assert_eq!(done.status, ExpressionStatus::Completed);
        assert_eq!(done.result, Some(5.0));
        assert!(done.is_terminal());
        assert_eq!(done.id, expr.id);
    }

    #[test]
    fn test_failed_clears_result() {
        let expr = Expression::new("1 / 0", "u1");
        let failed = expr.failed("division by zero");
        assert_eq!(failed.status, ExpressionStatus::Failed);
        assert!(failed.result.is_none());
        assert_eq!(failed.error.as_deref(), Some("division by zero"));
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&ExpressionStatus::Processing).unwrap();
        assert_eq!(json, r#""processing""#);
        assert_eq!(ExpressionStatus::Completed.to_string(), "completed");
    }

    #[test]
    fn test_pending_expression_omits_result() {
        let expr = Expression::new("2 + 2", "u1");
        let json = serde_json::to_value(&expr).unwrap();
        assert!(json.get("result").is_none());
        assert_eq!(json["status"], "pending");
    }
}
