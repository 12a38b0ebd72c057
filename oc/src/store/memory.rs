//! In-memory expression store

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::{ExpressionStore, StoreError};
use crate::domain::{Expression, ExpressionStatus};

/// Expression rows held in a map; lost on restart
#[derive(Default)]
pub struct MemoryStore {
    rows: RwLock<HashMap<String, Expression>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ExpressionStore for MemoryStore {
    async fn insert(&self, expression: Expression) -> Result<(), StoreError> {
        debug!(id = %expression.id, "MemoryStore::insert: called");
        let mut rows = self.rows.write().await;
        if rows.contains_key(&expression.id) {
            return Err(StoreError::AlreadyExists(expression.id));
        }
        rows.insert(expression.id.clone(), expression);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Expression>, StoreError> {
        debug!(%id, "MemoryStore::get: called");
        Ok(self.rows.read().await.get(id).cloned())
    }

    async fn list_by_owner(&self, owner: &str) -> Result<Vec<Expression>, StoreError> {
        debug!(%owner, "MemoryStore::list_by_owner: called");
        let rows = self.rows.read().await;
        let mut list: Vec<_> = rows.values().filter(|e| e.owner == owner).cloned().collect();
        list.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(list)
    }

    async fn compare_and_swap(&self, expected: ExpressionStatus, next: Expression) -> Result<(), StoreError> {
        debug!(id = %next.id, %expected, next_status = %next.status, "MemoryStore::compare_and_swap: called");
        let mut rows = self.rows.write().await;
        let current = rows
            .get_mut(&next.id)
            .ok_or_else(|| StoreError::NotFound(next.id.clone()))?;
        if current.status != expected {
            return Err(StoreError::Conflict {
                id: next.id,
                expected,
                actual: current.status,
            });
        }
        *current = next;
        Ok(())
    }
}
