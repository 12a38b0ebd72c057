//! Integration tests for calcagent
//!
//! Worker pools run against a real orchestrator over each transport.

use std::sync::Arc;
use std::time::Duration;

use assert_cmd::Command;
use predicates::prelude::*;
use tokio::sync::watch;

use calcagent::config::{AgentConfig, Transport};
use calcagent::pool::WorkerPool;
use calcagent::source::{LocalSource, TaskSource, create_source};
use calcagent::worker::WorkerConfig;
use orchestrator::config::Config;
use orchestrator::coordinator::{Coordinator, CoordinatorConfig, OperationTimings};
use orchestrator::domain::{Expression, ExpressionStatus};
use orchestrator::server::Server;
use orchestrator::store::MemoryStore;
use orchestrator::transport::ApiClient;

fn fast_workers() -> WorkerConfig {
    WorkerConfig {
        poll_backoff: Duration::from_millis(10),
        submit_retries: 3,
        retry_backoff: Duration::from_millis(5),
    }
}

fn server_config() -> Config {
    let mut config = Config::default();
    config.server.http_addr = "127.0.0.1:0".to_string();
    config.server.rpc_addr = "127.0.0.1:0".to_string();
    config.coordinator.timings = OperationTimings {
        addition_ms: 5,
        subtraction_ms: 5,
        multiplication_ms: 10,
        division_ms: 10,
    };
    config
}

async fn wait_terminal(api: &ApiClient, id: &str) -> Expression {
    for _ in 0..400 {
        let expression = api.get_expression(id).await.unwrap();
        if expression.is_terminal() {
            return expression;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("expression {} never reached a terminal state", id);
}

async fn run_against_server(transport: Transport) {
    let server = Server::bind(&server_config()).await.unwrap();
    let http_url = format!("http://{}", server.http_addr().unwrap());
    let rpc_addr = server.rpc_addr().unwrap().to_string();
    let (server_stop, server_rx) = watch::channel(false);
    let server_handle = tokio::spawn(server.run(server_rx));

    let agent = AgentConfig {
        transport,
        http_url: http_url.clone(),
        rpc_addr,
        ..Default::default()
    };
    let pool = WorkerPool::new(3, fast_workers(), |_| create_source(&agent)).unwrap();
    let (pool_stop, pool_rx) = watch::channel(false);
    let pool_handle = tokio::spawn(pool.run(pool_rx));

    let api = ApiClient::new(&http_url).unwrap().with_token("u1");
    let subtract = api.submit("10 - 5").await.unwrap();
    let multiply = api.submit("6 * 7").await.unwrap();
    let divide_by_zero = api.submit("1 / 0").await.unwrap();

    let done = wait_terminal(&api, &subtract).await;
    assert_eq!(done.status, ExpressionStatus::Completed);
    assert_eq!(done.result, Some(5.0));

    let done = wait_terminal(&api, &multiply).await;
    assert_eq!(done.result, Some(42.0));

    let failed = wait_terminal(&api, &divide_by_zero).await;
    assert_eq!(failed.status, ExpressionStatus::Failed);
    assert_eq!(failed.error.as_deref(), Some("division by zero"));

    pool_stop.send(true).unwrap();
    let stats = tokio::time::timeout(Duration::from_secs(5), pool_handle).await.unwrap().unwrap();
    assert_eq!(stats.tasks_completed, 2);
    assert_eq!(stats.tasks_failed, 1);

    server_stop.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(5), server_handle)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
}

// =============================================================================
// Transport Tests
// =============================================================================

#[tokio::test]
async fn test_pool_over_http() {
    run_against_server(Transport::Http).await;
}

#[tokio::test]
async fn test_pool_over_rpc() {
    run_against_server(Transport::Rpc).await;
}

#[tokio::test]
async fn test_pool_with_in_process_coordinator() {
    let mut config = CoordinatorConfig::default();
    config.timings = OperationTimings::zero();
    let coordinator = Arc::new(Coordinator::new(config, Arc::new(MemoryStore::new())));

    let source: Arc<dyn TaskSource> = Arc::new(LocalSource::new(coordinator.clone()));
    let pool = WorkerPool::shared(4, fast_workers(), source);
    let (stop, rx) = watch::channel(false);
    let handle = tokio::spawn(pool.run(rx));

    let mut ids = Vec::new();
    for i in 0..25 {
        ids.push(coordinator.submit(&format!("{} + {}", i, i), "u1").await.unwrap());
    }

    for (i, id) in ids.iter().enumerate() {
        let mut expression = coordinator.get_expression(id, "u1").await.unwrap();
        for _ in 0..200 {
            if expression.is_terminal() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
            expression = coordinator.get_expression(id, "u1").await.unwrap();
        }
        assert_eq!(expression.status, ExpressionStatus::Completed);
        assert_eq!(expression.result, Some((2 * i) as f64));
    }

    stop.send(true).unwrap();
    let stats = tokio::time::timeout(Duration::from_secs(5), handle).await.unwrap().unwrap();
    assert_eq!(stats.tasks_completed, 25);
    assert_eq!(coordinator.metrics().await.tasks_unresolved, 0);
}

#[tokio::test]
async fn test_pool_survives_unreachable_orchestrator() {
    let agent = AgentConfig {
        transport: Transport::Rpc,
        rpc_addr: "127.0.0.1:1".to_string(),
        timeout_ms: 200,
        ..Default::default()
    };
    let pool = WorkerPool::new(2, fast_workers(), |_| create_source(&agent)).unwrap();
    let (stop, rx) = watch::channel(false);
    let handle = tokio::spawn(pool.run(rx));

    tokio::time::sleep(Duration::from_millis(100)).await;
    stop.send(true).unwrap();

    let stats = tokio::time::timeout(Duration::from_secs(5), handle).await.unwrap().unwrap();
    assert!(stats.pull_errors > 0);
    assert_eq!(stats.tasks_completed, 0);
}

// =============================================================================
// CLI Tests
// =============================================================================

#[test]
fn test_cli_help_lists_run() {
    Command::cargo_bin("ag")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"));
}

#[test]
fn test_cli_run_rejects_zero_workers() {
    Command::cargo_bin("ag")
        .unwrap()
        .args(["run", "--workers", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("computing-power"));
}
