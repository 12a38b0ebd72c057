//! Orchestrator - distributed arithmetic expression coordinator
//!
//! Callers submit expressions such as `10 - 5` over HTTP. Each expression is
//! decomposed into binary-operation tasks that wait in a bounded queue until
//! workers pull them over HTTP or RPC. Results flow back through the
//! coordinator, which reconciles them into the stored expression exactly once.
//!
//! # Modules
//!
//! - [`decomposer`] - Tokenizer and two-pass operation extraction
//! - [`queue`] - Bounded FIFO of pending tasks
//! - [`coordinator`] - Pull/submit arbitration and result reconciliation
//! - [`store`] - Expression persistence (memory or JSONL file)
//! - [`transport`] - HTTP API, RPC listener and their clients
//! - [`server`] - Wiring of the above into a running service
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod cli;
pub mod config;
pub mod coordinator;
pub mod decomposer;
pub mod domain;
pub mod queue;
pub mod server;
pub mod store;
pub mod transport;

// Re-export commonly used types
pub use config::Config;
pub use coordinator::{Coordinator, CoordinatorConfig, CoordinatorError, CoordinatorMetrics, OperationTimings};
pub use decomposer::{ParseError, decompose};
pub use domain::{Expression, ExpressionStatus, Operation, OperationClass, Operator, Task, TaskOutcome};
pub use queue::{QueueError, QueueState, TaskQueue};
pub use server::Server;
pub use store::{ExpressionStore, FileStore, MemoryStore, RetryPolicy, StoreError};
pub use transport::rpc::{RpcClient, RpcError};
pub use transport::{ApiClient, ApiClientError};
