//! Worker RPC over TCP
//!
//! Newline-delimited JSON: each request is one line of JSON followed by
//! `\n` and gets exactly one response line. A connection carries any number
//! of requests.

pub mod client;
pub mod listener;
pub mod messages;

pub use client::{RpcClient, RpcError};
pub use listener::{dispatch, serve};
pub use messages::{RpcRequest, RpcResponse};

/// Maximum size of one request or response line
pub const MAX_LINE_SIZE: usize = 64 * 1024;
