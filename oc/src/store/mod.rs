//! Expression persistence
//!
//! The coordinator is the only writer. Status transitions go through
//! `compare_and_swap` so a terminal state is written exactly once.

mod error;
mod file;
mod memory;
mod retry;

use async_trait::async_trait;

use crate::domain::{Expression, ExpressionStatus};

pub use error::StoreError;
pub use file::FileStore;
pub use memory::MemoryStore;
pub use retry::RetryPolicy;

/// Storage for expression rows
#[async_trait]
pub trait ExpressionStore: Send + Sync {
    /// Insert a new expression; fails if the id already exists
    async fn insert(&self, expression: Expression) -> Result<(), StoreError>;

    async fn get(&self, id: &str) -> Result<Option<Expression>, StoreError>;

    /// All expressions submitted by `owner`, oldest first
    async fn list_by_owner(&self, owner: &str) -> Result<Vec<Expression>, StoreError>;

    /// Replace the row for `next.id` only if its current status is `expected`
    async fn compare_and_swap(&self, expected: ExpressionStatus, next: Expression) -> Result<(), StoreError>;
}
