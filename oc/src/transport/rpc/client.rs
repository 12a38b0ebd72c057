//! RPC client for workers
//!
//! Keeps one connection open and reconnects after any transport failure.

use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::Mutex;
use tracing::debug;

use super::MAX_LINE_SIZE;
use super::messages::{RpcRequest, RpcResponse};
use crate::coordinator::CoordinatorMetrics;
use crate::domain::Task;

/// Default timeout for connect and for each request
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors from RPC calls
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("Failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Server error: {0}")]
    Remote(String),

    #[error("Rejected: {0}")]
    Rejected(String),
}

impl RpcError {
    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            RpcError::Connect { .. } | RpcError::Io(_) | RpcError::Timeout(_) => true,
            RpcError::Rejected(message) => !message.starts_with("Task not found"),
            RpcError::Protocol(_) | RpcError::Remote(_) => false,
        }
    }

    /// Check if the coordinator did not recognise the task
    pub fn is_not_found(&self) -> bool {
        matches!(self, RpcError::Rejected(message) if message.starts_with("Task not found"))
    }
}

struct Connection {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

/// Client for the coordinator's RPC listener
pub struct RpcClient {
    addr: String,
    timeout: Duration,
    conn: Mutex<Option<Connection>>,
}

impl RpcClient {
    /// Create a client for `addr` (e.g. `127.0.0.1:8082`); connects lazily
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            timeout: DEFAULT_TIMEOUT,
            conn: Mutex::new(None),
        }
    }

    /// Set a custom timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Pull one task; `None` when the queue is empty
    pub async fn pull_task(&self) -> Result<Option<Task>, RpcError> {
        match self.call(RpcRequest::PullTask).await? {
            RpcResponse::Task { has_task: true, task: Some(task) } => Ok(Some(task)),
            RpcResponse::Task { has_task: true, task: None } => {
                Err(RpcError::Protocol("has_task set without a task".to_string()))
            }
            RpcResponse::Task { has_task: false, .. } => Ok(None),
            other => unexpected(other),
        }
    }

    pub async fn submit_result(&self, task_id: &str, value: f64) -> Result<(), RpcError> {
        let request = RpcRequest::SubmitResult {
            task_id: task_id.to_string(),
            value,
        };
        submitted(self.call(request).await?)
    }

    pub async fn submit_failure(&self, task_id: &str, error: &str) -> Result<(), RpcError> {
        let request = RpcRequest::SubmitFailure {
            task_id: task_id.to_string(),
            error: error.to_string(),
        };
        submitted(self.call(request).await?)
    }

    pub async fn metrics(&self) -> Result<CoordinatorMetrics, RpcError> {
        match self.call(RpcRequest::Metrics).await? {
            RpcResponse::Metrics(metrics) => Ok(metrics),
            other => unexpected(other),
        }
    }

    /// Check the coordinator is alive and get its version
    pub async fn ping(&self) -> Result<String, RpcError> {
        match self.call(RpcRequest::Ping).await? {
            RpcResponse::Pong { version } => Ok(version),
            other => unexpected(other),
        }
    }

    /// Send one request and wait for its response line
    async fn call(&self, request: RpcRequest) -> Result<RpcResponse, RpcError> {
        debug!(addr = %self.addr, ?request, "RpcClient::call: called");
        let json = serde_json::to_string(&request).map_err(|e| RpcError::Protocol(e.to_string()))?;
        if json.len() > MAX_LINE_SIZE {
            return Err(RpcError::Protocol(format!("Message too large: {} bytes", json.len())));
        }

        let mut guard = self.conn.lock().await;
        if guard.is_none() {
            *guard = Some(self.connect().await?);
        }
        let Some(conn) = guard.as_mut() else {
            return Err(RpcError::Protocol("connection unavailable".to_string()));
        };

        let result = tokio::time::timeout(self.timeout, exchange(conn, &json))
            .await
            .unwrap_or(Err(RpcError::Timeout(self.timeout)));

        if result.is_err() {
            // Response stream state is unknown; start fresh next call
            *guard = None;
        }

        let response = result?;
        if let RpcResponse::Error { message } = response {
            return Err(RpcError::Remote(message));
        }
        Ok(response)
    }

    async fn connect(&self) -> Result<Connection, RpcError> {
        debug!(addr = %self.addr, "RpcClient::connect: called");
        let stream = tokio::time::timeout(self.timeout, TcpStream::connect(&self.addr))
            .await
            .map_err(|_| RpcError::Timeout(self.timeout))?
            .map_err(|source| RpcError::Connect {
                addr: self.addr.clone(),
                source,
            })?;
        let (read_half, writer) = stream.into_split();
        Ok(Connection {
            reader: BufReader::new(read_half),
            writer,
        })
    }
}

async fn exchange(conn: &mut Connection, json: &str) -> Result<RpcResponse, RpcError> {
    conn.writer.write_all(json.as_bytes()).await?;
    conn.writer.write_all(b"\n").await?;
    conn.writer.flush().await?;

    let mut line = String::new();
    let bytes_read = (&mut conn.reader)
        .take(MAX_LINE_SIZE as u64 + 1)
        .read_line(&mut line)
        .await?;
    if bytes_read == 0 {
        return Err(RpcError::Io(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "connection closed by server",
        )));
    }
    if bytes_read > MAX_LINE_SIZE {
        return Err(RpcError::Protocol(format!("Response too large: {} bytes", bytes_read)));
    }
    serde_json::from_str(line.trim()).map_err(|e| RpcError::Protocol(format!("Invalid response: {}", e)))
}

fn submitted(response: RpcResponse) -> Result<(), RpcError> {
    match response {
        RpcResponse::Submitted { ok: true, .. } => Ok(()),
        RpcResponse::Submitted { ok: false, error } => {
            Err(RpcError::Rejected(error.unwrap_or_else(|| "unknown error".to_string())))
        }
        other => unexpected(other),
    }
}

fn unexpected<T>(response: RpcResponse) -> Result<T, RpcError> {
    Err(RpcError::Protocol(format!("Unexpected response: {:?}", response)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::{Coordinator, CoordinatorConfig, OperationTimings};
    use crate::store::MemoryStore;
    use crate::transport::rpc::serve;
    use std::sync::Arc;
    use tokio::net::TcpListener;
    use tokio::sync::watch;

    async fn start() -> (RpcClient, Arc<Coordinator>, watch::Sender<bool>) {
        let coordinator = Arc::new(Coordinator::new(
            CoordinatorConfig {
                timings: OperationTimings::zero(),
                ..Default::default()
            },
            Arc::new(MemoryStore::new()),
        ));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let (tx, rx) = watch::channel(false);
        tokio::spawn(serve(listener, coordinator.clone(), rx));
        (RpcClient::new(addr), coordinator, tx)
    }

    #[tokio::test]
    async fn test_round_trip() {
        let (client, coordinator, _tx) = start().await;
        assert_eq!(client.ping().await.unwrap(), env!("CARGO_PKG_VERSION"));
        assert!(client.pull_task().await.unwrap().is_none());

        let id = coordinator.submit("9 / 3", "u1").await.unwrap();
        let task = client.pull_task().await.unwrap().unwrap();
        assert_eq!(task.expression_id, id);

        client.submit_result(&task.id, 3.0).await.unwrap();
        let expr = coordinator.get_expression(&id, "u1").await.unwrap();
        assert_eq!(expr.result, Some(3.0));

        let metrics = client.metrics().await.unwrap();
        assert_eq!(metrics.expressions_completed, 1);
    }

    #[tokio::test]
    async fn test_unknown_task_is_rejected() {
        let (client, _coordinator, _tx) = start().await;
        let err = client.submit_failure("missing", "boom").await.unwrap_err();
        assert!(err.is_not_found());
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_connect_failure_is_retryable() {
        // Bind then drop to get a port with nothing listening
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().to_string()
        };
        let client = RpcClient::new(addr).with_timeout(Duration::from_millis(500));
        let err = client.ping().await.unwrap_err();
        assert!(err.is_retryable());
    }

    #[test]
    fn test_rejected_classification() {
        assert!(RpcError::Rejected("Persistence error: I/O error: disk".to_string()).is_retryable());
        assert!(!RpcError::Rejected("Task not found: t1".to_string()).is_retryable());
    }
}
