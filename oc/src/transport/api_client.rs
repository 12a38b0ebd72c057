//! HTTP client for the orchestrator API
//!
//! Used by the `oc` client commands and by workers polling over HTTP.

use std::time::Duration;

use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

use super::dto::{
    CalculateRequest, CalculateResponse, ErrorResponse, ExpressionResponse, ExpressionsResponse, TaskFailureRequest,
    TaskResponse, TaskResultRequest,
};
use crate::coordinator::CoordinatorMetrics;
use crate::domain::{Expression, Task};

/// Default request timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors from API calls
#[derive(Debug, Error)]
pub enum ApiClientError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("API error {status}: {message}")]
    Status { status: u16, message: String },
}

impl ApiClientError {
    /// Check if the server reported the resource as unknown
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiClientError::Status { status: 404, .. })
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiClientError::Network(_) => true,
            ApiClientError::Status { status, .. } => *status >= 500,
        }
    }
}

/// Client for the orchestrator HTTP API
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    token: Option<String>,
    http: reqwest::Client,
}

impl ApiClient {
    /// Create a client for `base_url` (e.g. `http://localhost:8080`)
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiClientError> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ApiClientError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
            http,
        })
    }

    /// Bearer token sent on caller routes
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Submit an expression, returning its id
    pub async fn submit(&self, expression: &str) -> Result<String, ApiClientError> {
        debug!(%expression, "ApiClient::submit: called");
        let request = self.authed(self.http.post(self.url("/api/v1/calculate"))).json(&CalculateRequest {
            expression: expression.to_string(),
        });
        let response: CalculateResponse = json(request.send().await?).await?;
        Ok(response.id)
    }

    pub async fn get_expression(&self, id: &str) -> Result<Expression, ApiClientError> {
        debug!(%id, "ApiClient::get_expression: called");
        let request = self.authed(self.http.get(self.url(&format!("/api/v1/expressions/{}", id))));
        let response: ExpressionResponse = json(request.send().await?).await?;
        Ok(response.expression)
    }

    pub async fn list_expressions(&self) -> Result<Vec<Expression>, ApiClientError> {
        debug!("ApiClient::list_expressions: called");
        let request = self.authed(self.http.get(self.url("/api/v1/expressions")));
        let response: ExpressionsResponse = json(request.send().await?).await?;
        Ok(response.expressions)
    }

    pub async fn metrics(&self) -> Result<CoordinatorMetrics, ApiClientError> {
        debug!("ApiClient::metrics: called");
        json(self.http.get(self.url("/internal/metrics")).send().await?).await
    }

    /// Pull one task; `None` when the queue is empty
    pub async fn pull_task(&self) -> Result<Option<Task>, ApiClientError> {
        debug!("ApiClient::pull_task: called");
        let response = self.http.get(self.url("/internal/task")).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body: TaskResponse = json(response).await?;
        Ok(Some(body.task))
    }

    pub async fn submit_result(&self, task_id: &str, value: f64) -> Result<(), ApiClientError> {
        debug!(%task_id, %value, "ApiClient::submit_result: called");
        let response = self
            .http
            .post(self.url("/internal/task"))
            .json(&TaskResultRequest {
                task_id: task_id.to_string(),
                value,
            })
            .send()
            .await?;
        check(response).await.map(|_| ())
    }

    pub async fn submit_failure(&self, task_id: &str, error: &str) -> Result<(), ApiClientError> {
        debug!(%task_id, %error, "ApiClient::submit_failure: called");
        let response = self
            .http
            .post(self.url("/internal/task/failure"))
            .json(&TaskFailureRequest {
                task_id: task_id.to_string(),
                error: error.to_string(),
            })
            .send()
            .await?;
        check(response).await.map(|_| ())
    }
}

/// Turn a non-success response into `ApiClientError::Status`
async fn check(response: Response) -> Result<Response, ApiClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorResponse>(&text)
        .map(|e| e.error)
        .unwrap_or(text);
    Err(ApiClientError::Status {
        status: status.as_u16(),
        message,
    })
}

async fn json<T: DeserializeOwned>(response: Response) -> Result<T, ApiClientError> {
    Ok(check(response).await?.json().await?)
}
