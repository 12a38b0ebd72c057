//! HTTP request and response bodies

use serde::{Deserialize, Serialize};

use crate::domain::{Expression, Task};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculateRequest {
    pub expression: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculateResponse {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpressionsResponse {
    pub expressions: Vec<Expression>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpressionResponse {
    pub expression: Expression,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResponse {
    pub task: Task,
}

/// Worker-reported value for an issued task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResultRequest {
    pub task_id: String,
    pub value: f64,
}

/// Worker-reported failure for an issued task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskFailureRequest {
    pub task_id: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_request_field_names() {
        let req: TaskResultRequest = serde_json::from_str(r#"{"task_id":"t1","value":5.0}"#).unwrap();
        assert_eq!(req.task_id, "t1");
        assert_eq!(req.value, 5.0);
    }

    #[test]
    fn test_error_response_shape() {
        let json = serde_json::to_string(&ErrorResponse {
            error: "boom".to_string(),
        })
        .unwrap();
        assert_eq!(json, r#"{"error":"boom"}"#);
    }
}
