//! Calcagent - arithmetic worker agent
//!
//! Runs a pool of independent workers against an orchestrator. Each worker
//! pulls one task at a time, waits the task's operation delay, computes it and
//! reports a value or an explicit failure.
//!
//! # Modules
//!
//! - [`worker`] - Single worker state machine
//! - [`pool`] - N workers on their own tokio tasks
//! - [`source`] - HTTP, RPC and in-process task sources
//! - [`compute`] - Operator evaluation
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod cli;
pub mod compute;
pub mod config;
pub mod pool;
pub mod source;
pub mod worker;

// Re-export commonly used types
pub use compute::{ComputeError, compute};
pub use config::{AgentConfig, Transport};
pub use pool::WorkerPool;
pub use source::{HttpSource, LocalSource, RpcSource, SourceError, TaskSource, create_source};
pub use worker::{Step, Worker, WorkerConfig, WorkerState, WorkerStats};
