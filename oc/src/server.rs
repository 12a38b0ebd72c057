//! Server assembly
//!
//! Builds the store and coordinator from `Config`, binds both listeners and
//! runs them alongside the stale-task sweep until shutdown.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use eyre::{Context, Result};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::config::{Backend, Config, PersistenceConfig};
use crate::coordinator::Coordinator;
use crate::store::{ExpressionStore, FileStore, MemoryStore};
use crate::transport::{self, AppState, Authenticator, TokenAuthenticator, rpc};

/// Open the configured expression store
pub async fn build_store(config: &PersistenceConfig) -> Result<Arc<dyn ExpressionStore>> {
    debug!(backend = ?config.backend, "build_store: called");
    match config.backend {
        Backend::Memory => Ok(Arc::new(MemoryStore::new())),
        Backend::File => {
            let store = FileStore::open(&config.path)
                .await
                .context(format!("Failed to open expression log {}", config.path.display()))?;
            info!(path = %config.path.display(), "Using file-backed expression store");
            Ok(Arc::new(store))
        }
    }
}

/// Bound listeners plus the shared coordinator
pub struct Server {
    coordinator: Arc<Coordinator>,
    auth: Arc<dyn Authenticator>,
    http_listener: TcpListener,
    rpc_listener: TcpListener,
    sweep_interval: Duration,
}

impl Server {
    /// Validate `config`, open the store and bind both listeners
    pub async fn bind(config: &Config) -> Result<Self> {
        debug!("Server::bind: called");
        config.validate()?;

        let store = build_store(&config.persistence).await?;
        let coordinator = Coordinator::new(config.coordinator.clone(), store)
            .with_retry(config.persistence.retry_policy());

        let auth = TokenAuthenticator::new(config.auth.tokens.clone());
        if auth.is_open() {
            warn!("No auth tokens configured, bearer token is used as the owner id");
        }

        let http_addr = config.server.http_socket_addr()?;
        let http_listener = TcpListener::bind(http_addr)
            .await
            .context(format!("Failed to bind HTTP listener on {}", http_addr))?;

        let rpc_addr = config.server.rpc_socket_addr()?;
        let rpc_listener = TcpListener::bind(rpc_addr)
            .await
            .context(format!("Failed to bind RPC listener on {}", rpc_addr))?;

        Ok(Self {
            coordinator: Arc::new(coordinator),
            auth: Arc::new(auth),
            http_listener,
            rpc_listener,
            sweep_interval: config.coordinator.sweep_interval(),
        })
    }

    pub fn http_addr(&self) -> Result<SocketAddr> {
        self.http_listener
            .local_addr()
            .context("Failed to read HTTP listener address")
    }

    pub fn rpc_addr(&self) -> Result<SocketAddr> {
        self.rpc_listener
            .local_addr()
            .context("Failed to read RPC listener address")
    }

    pub fn coordinator(&self) -> Arc<Coordinator> {
        self.coordinator.clone()
    }

    /// Serve HTTP, RPC and the sweep until `shutdown` flips
    pub async fn run(self, shutdown: watch::Receiver<bool>) -> Result<()> {
        info!(
            http = ?self.http_listener.local_addr().ok(),
            rpc = ?self.rpc_listener.local_addr().ok(),
            "Server starting"
        );

        let state = Arc::new(AppState {
            coordinator: self.coordinator.clone(),
            auth: self.auth,
        });

        let http_handle = tokio::spawn(transport::http::serve(self.http_listener, state, shutdown.clone()));
        let rpc_handle = tokio::spawn(rpc::serve(self.rpc_listener, self.coordinator.clone(), shutdown.clone()));
        let sweep_handle = tokio::spawn(run_sweeper(self.coordinator, self.sweep_interval, shutdown));

        let (http, rpc, sweep) = tokio::join!(http_handle, rpc_handle, sweep_handle);
        sweep.context("Sweep task panicked")?;
        http.context("HTTP server task panicked")??;
        rpc.context("RPC server task panicked")??;

        info!("Server stopped");
        Ok(())
    }
}

/// Periodically fail issued tasks that outlived the task timeout
pub async fn run_sweeper(coordinator: Arc<Coordinator>, interval: Duration, shutdown: watch::Receiver<bool>) {
    debug!(?interval, "run_sweeper: called");
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let stop = transport::wait_for_shutdown(shutdown);
    tokio::pin!(stop);

    loop {
        tokio::select! {
            _ = &mut stop => {
                debug!("run_sweeper: shutdown");
                return;
            }
            _ = ticker.tick() => {
                match coordinator.expire_stale_tasks().await {
                    Ok(0) => {}
                    Ok(count) => info!(count, "Expired stale tasks"),
                    Err(e) => error!(error = %e, "Stale-task sweep failed"),
                }
            }
        }
    }
}
