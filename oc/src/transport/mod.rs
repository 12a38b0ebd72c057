//! Transport adapters
//!
//! HTTP (axum) serves callers and polling workers; the RPC listener serves
//! workers over newline-delimited JSON on TCP. Both delegate to the same
//! `Coordinator`.

pub mod api_client;
pub mod auth;
pub mod dto;
pub mod http;
pub mod rpc;

pub use api_client::{ApiClient, ApiClientError};
pub use auth::{Authenticator, TokenAuthenticator};
pub use http::{AppState, router};

use tokio::sync::watch;

/// Resolve once the shutdown flag turns true or its sender is dropped
pub async fn wait_for_shutdown(mut shutdown: watch::Receiver<bool>) {
    while !*shutdown.borrow_and_update() {
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}
