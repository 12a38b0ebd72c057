//! HTTP API
//!
//! Caller routes under `/api/v1` require `Authorization: Bearer <token>`.
//! Worker routes under `/internal` are unauthenticated.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use eyre::Context;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::auth::{Authenticator, parse_bearer};
use super::dto::{
    CalculateRequest, CalculateResponse, ErrorResponse, ExpressionResponse, ExpressionsResponse, TaskFailureRequest,
    TaskResponse, TaskResultRequest,
};
use super::wait_for_shutdown;
use crate::coordinator::{Coordinator, CoordinatorError, CoordinatorMetrics};

/// Shared handler state
pub struct AppState {
    pub coordinator: Arc<Coordinator>,
    pub auth: Arc<dyn Authenticator>,
}

/// JSON error with a status code
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "missing or invalid bearer token")
    }
}

impl From<CoordinatorError> for ApiError {
    fn from(e: CoordinatorError) -> Self {
        let status = match &e {
            CoordinatorError::Parse(_) => StatusCode::UNPROCESSABLE_ENTITY,
            CoordinatorError::QueueFull(_) => StatusCode::SERVICE_UNAVAILABLE,
            CoordinatorError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
            CoordinatorError::TaskNotFound(_) | CoordinatorError::NotFound(_) => StatusCode::NOT_FOUND,
        };
        if status.is_server_error() {
            warn!(error = %e, "Request failed");
        }
        Self::new(status, e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorResponse { error: self.message })).into_response()
    }
}

/// Resolve the caller's owner id from the Authorization header
fn authorize(state: &AppState, headers: &HeaderMap) -> Result<String, ApiError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(ApiError::unauthorized)?;
    let bearer = parse_bearer(value).ok_or_else(ApiError::unauthorized)?;
    state.auth.authenticate(bearer).ok_or_else(ApiError::unauthorized)
}

/// Build the router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/calculate", post(calculate))
        .route("/api/v1/expressions", get(list_expressions))
        .route("/api/v1/expressions/{id}", get(get_expression))
        .route("/internal/task", get(pull_task).post(submit_result))
        .route("/internal/task/failure", post(submit_failure))
        .route("/internal/metrics", get(metrics))
        .with_state(state)
}

/// Serve the router on `listener` until shutdown
pub async fn serve(listener: TcpListener, state: Arc<AppState>, shutdown: watch::Receiver<bool>) -> eyre::Result<()> {
    let addr = listener.local_addr().context("Failed to read HTTP listener address")?;
    info!(%addr, "HTTP server listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(wait_for_shutdown(shutdown))
        .await
        .context("HTTP server failed")?;
    info!("HTTP server stopped");
    Ok(())
}

async fn calculate(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<CalculateRequest>,
) -> Result<(StatusCode, Json<CalculateResponse>), ApiError> {
    let owner = authorize(&state, &headers)?;
    debug!(%owner, expression = %request.expression, "calculate: called");
    let id = state.coordinator.submit(&request.expression, &owner).await?;
    Ok((StatusCode::CREATED, Json(CalculateResponse { id })))
}

async fn list_expressions(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<ExpressionsResponse>, ApiError> {
    let owner = authorize(&state, &headers)?;
    debug!(%owner, "list_expressions: called");
    let expressions = state.coordinator.list_expressions(&owner).await?;
    Ok(Json(ExpressionsResponse { expressions }))
}

async fn get_expression(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<ExpressionResponse>, ApiError> {
    let owner = authorize(&state, &headers)?;
    debug!(%owner, %id, "get_expression: called");
    let expression = state.coordinator.get_expression(&id, &owner).await?;
    Ok(Json(ExpressionResponse { expression }))
}

async fn pull_task(State(state): State<Arc<AppState>>) -> Result<Json<TaskResponse>, ApiError> {
    match state.coordinator.pull_task().await {
        Some(task) => Ok(Json(TaskResponse { task })),
        None => Err(ApiError::new(StatusCode::NOT_FOUND, "no task available")),
    }
}

async fn submit_result(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TaskResultRequest>,
) -> Result<StatusCode, ApiError> {
    debug!(task_id = %request.task_id, value = request.value, "submit_result: called");
    state
        .coordinator
        .submit_result(&request.task_id, request.value)
        .await?;
    Ok(StatusCode::OK)
}

async fn submit_failure(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TaskFailureRequest>,
) -> Result<StatusCode, ApiError> {
    debug!(task_id = %request.task_id, error = %request.error, "submit_failure: called");
    state
        .coordinator
        .submit_failure(&request.task_id, &request.error)
        .await?;
    Ok(StatusCode::OK)
}

async fn metrics(State(state): State<Arc<AppState>>) -> Json<CoordinatorMetrics> {
    Json(state.coordinator.metrics().await)
}
