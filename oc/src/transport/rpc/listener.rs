//! RPC server side

use std::sync::Arc;

use eyre::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::MAX_LINE_SIZE;
use super::messages::{RpcRequest, RpcResponse};
use crate::coordinator::Coordinator;
use crate::transport::wait_for_shutdown;

/// Accept connections until shutdown, serving each on its own task
pub async fn serve(listener: TcpListener, coordinator: Arc<Coordinator>, shutdown: watch::Receiver<bool>) -> Result<()> {
    let addr = listener.local_addr().context("Failed to read RPC listener address")?;
    info!(%addr, "RPC server listening");

    let stop = wait_for_shutdown(shutdown);
    tokio::pin!(stop);

    loop {
        tokio::select! {
            _ = &mut stop => {
                info!("RPC server stopped");
                return Ok(());
            }
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, peer)) => {
                        debug!(%peer, "serve: accepted connection");
                        let coordinator = coordinator.clone();
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(stream, &coordinator).await {
                                debug!(%peer, error = %e, "serve: connection closed with error");
                            }
                        });
                    }
                    Err(e) => warn!(error = %e, "Failed to accept RPC connection"),
                }
            }
        }
    }
}

/// Serve requests on one connection until the peer closes it
async fn handle_connection(stream: TcpStream, coordinator: &Coordinator) -> Result<()> {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    let mut line = String::new();

    loop {
        line.clear();
        let bytes_read = (&mut reader)
            .take(MAX_LINE_SIZE as u64 + 1)
            .read_line(&mut line)
            .await
            .context("Failed to read RPC request")?;

        if bytes_read == 0 {
            debug!("handle_connection: peer closed");
            return Ok(());
        }

        if bytes_read > MAX_LINE_SIZE {
            if !line.ends_with('\n') {
                discard_line(&mut reader).await.context("Failed to skip oversized request")?;
            }
            let response = RpcResponse::Error {
                message: format!("Message too large: more than {} bytes", MAX_LINE_SIZE),
            };
            send_response(&mut write_half, &response).await?;
            continue;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<RpcRequest>(trimmed) {
            Ok(request) => dispatch(coordinator, request).await,
            Err(e) => RpcResponse::Error {
                message: format!("Invalid request: {}", e),
            },
        };
        send_response(&mut write_half, &response).await?;
    }
}

/// Consume input up to and including the next newline
async fn discard_line<R: AsyncBufRead + Unpin>(reader: &mut R) -> std::io::Result<()> {
    loop {
        let buf = reader.fill_buf().await?;
        if buf.is_empty() {
            return Ok(());
        }
        match buf.iter().position(|b| *b == b'\n') {
            Some(pos) => {
                reader.consume(pos + 1);
                return Ok(());
            }
            None => {
                let len = buf.len();
                reader.consume(len);
            }
        }
    }
}

/// Apply one request to the coordinator
pub async fn dispatch(coordinator: &Coordinator, request: RpcRequest) -> RpcResponse {
    debug!(?request, "dispatch: called");
    match request {
        RpcRequest::PullTask => {
            let task = coordinator.pull_task().await;
            RpcResponse::Task {
                has_task: task.is_some(),
                task,
            }
        }
        RpcRequest::SubmitResult { task_id, value } => submitted(coordinator.submit_result(&task_id, value).await),
        RpcRequest::SubmitFailure { task_id, error } => submitted(coordinator.submit_failure(&task_id, &error).await),
        RpcRequest::Metrics => RpcResponse::Metrics(coordinator.metrics().await),
        RpcRequest::Ping => RpcResponse::Pong {
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
    }
}

fn submitted<E: std::fmt::Display>(result: std::result::Result<(), E>) -> RpcResponse {
    match result {
        Ok(()) => RpcResponse::Submitted { ok: true, error: None },
        Err(e) => RpcResponse::Submitted {
            ok: false,
            error: Some(e.to_string()),
        },
    }
}

async fn send_response<W: AsyncWriteExt + Unpin>(writer: &mut W, response: &RpcResponse) -> Result<()> {
    let json = serde_json::to_string(response).context("Failed to serialize response")?;
    writer
        .write_all(json.as_bytes())
        .await
        .context("Failed to write response")?;
    writer.write_all(b"\n").await.context("Failed to write newline")?;
    writer.flush().await.context("Failed to flush response")?;
    debug!(?response, "send_response: sent response");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::{CoordinatorConfig, OperationTimings};
    use crate::store::MemoryStore;

    fn coordinator() -> Arc<Coordinator> {
        Arc::new(Coordinator::new(
            CoordinatorConfig {
                timings: OperationTimings::zero(),
                ..Default::default()
            },
            Arc::new(MemoryStore::new()),
        ))
    }

    #[tokio::test]
    async fn test_dispatch_pull_empty() {
        let coord = coordinator();
        assert_eq!(
            dispatch(&coord, RpcRequest::PullTask).await,
            RpcResponse::Task {
                has_task: false,
                task: None
            }
        );
    }

    #[tokio::test]
    async fn test_dispatch_unknown_task() {
        let coord = coordinator();
        let response = dispatch(
            &coord,
            RpcRequest::SubmitResult {
                task_id: "nope".to_string(),
                value: 1.0,
            },
        )
        .await;
        match response {
            RpcResponse::Submitted { ok, error } => {
                assert!(!ok);
                assert!(error.unwrap().contains("Task not found"));
            }
            other => panic!("unexpected response: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_raw_lines_over_socket() {
        let coord = coordinator();
        coord.submit("7 + 8", "u1").await.unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (_tx, rx) = watch::channel(false);
        tokio::spawn(serve(listener, coord.clone(), rx));

        let stream = TcpStream::connect(addr).await.unwrap();
        let (read_half, mut write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);

        write_half.write_all(b"{\"type\":\"Ping\"}\n").await.unwrap();
        write_half.write_all(b"not json\n").await.unwrap();
        write_half.write_all(b"{\"type\":\"PullTask\"}\n").await.unwrap();

        let mut line = String::new();
        reader.read_line(&mut line).await.unwrap();
        assert!(line.contains("\"Pong\""));

        line.clear();
        reader.read_line(&mut line).await.unwrap();
        assert!(line.contains("\"Error\""));

        line.clear();
        reader.read_line(&mut line).await.unwrap();
        let response: RpcResponse = serde_json::from_str(line.trim()).unwrap();
        match response {
            RpcResponse::Task { has_task, task } => {
                assert!(has_task);
                assert_eq!(task.unwrap().operand2, 8.0);
            }
            other => panic!("unexpected response: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_oversized_line_is_rejected() {
        let coord = coordinator();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (_tx, rx) = watch::channel(false);
        tokio::spawn(serve(listener, coord, rx));

        let stream = TcpStream::connect(addr).await.unwrap();
        let (read_half, mut write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);

        let big = vec![b'x'; MAX_LINE_SIZE + 10];
        write_half.write_all(&big).await.unwrap();
        write_half.write_all(b"\n").await.unwrap();

        let mut line = String::new();
        reader.read_line(&mut line).await.unwrap();
        assert!(line.contains("too large"));

        // The connection stays usable
        write_half.write_all(b"{\"type\":\"Ping\"}\n").await.unwrap();
        line.clear();
        reader.read_line(&mut line).await.unwrap();
        assert!(line.contains("\"Pong\""));
    }

    #[tokio::test]
    async fn test_serve_stops_on_shutdown() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(serve(listener, coordinator(), rx));
        tx.send(true).unwrap();
        let result = tokio::time::timeout(std::time::Duration::from_secs(2), handle).await;
        assert!(result.unwrap().unwrap().is_ok());
    }
}
