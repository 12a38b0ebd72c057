//! Append-only JSONL expression store
//!
//! Every insert and transition appends the full row as one JSON line. On
//! open the log is replayed and the last record per id wins.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::{ExpressionStore, StoreError};
use crate::domain::{Expression, ExpressionStatus};

/// Durable store backed by a JSONL log file
pub struct FileStore {
    path: PathBuf,
    rows: RwLock<HashMap<String, Expression>>,
}

impl FileStore {
    /// Open (or create) the log at `path` and replay it
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        debug!(?path, "FileStore::open: called");

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await?;
        }

        let rows = if fs::try_exists(&path).await? {
            let content = fs::read_to_string(&path).await?;
            replay(&content)
        } else {
            debug!("FileStore::open: log does not exist yet");
            HashMap::new()
        };

        info!(path = %path.display(), rows = rows.len(), "Opened expression log");
        Ok(Self {
            path,
            rows: RwLock::new(rows),
        })
    }

    async fn append(&self, expression: &Expression) -> Result<(), StoreError> {
        let line = serde_json::to_string(expression)? + "\n";
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

/// Rebuild rows from log content, skipping lines that do not parse
fn replay(content: &str) -> HashMap<String, Expression> {
    let mut rows = HashMap::new();
    for (index, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Expression>(line) {
            Ok(expression) => {
                rows.insert(expression.id.clone(), expression);
            }
            Err(e) => warn!(line = index + 1, error = %e, "Skipping unreadable expression record"),
        }
    }
    rows
}

#[async_trait]
impl ExpressionStore for FileStore {
    async fn insert(&self, expression: Expression) -> Result<(), StoreError> {
        debug!(id = %expression.id, "FileStore::insert: called");
        let mut rows = self.rows.write().await;
        if rows.contains_key(&expression.id) {
            return Err(StoreError::AlreadyExists(expression.id));
        }
        self.append(&expression).await?;
        rows.insert(expression.id.clone(), expression);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Expression>, StoreError> {
        debug!(%id, "FileStore::get: called");
        Ok(self.rows.read().await.get(id).cloned())
    }

    async fn list_by_owner(&self, owner: &str) -> Result<Vec<Expression>, StoreError> {
        debug!(%owner, "FileStore::list_by_owner: called");
        let rows = self.rows.read().await;
        let mut list: Vec<_> = rows.values().filter(|e| e.owner == owner).cloned().collect();
        list.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(list)
    }

    async fn compare_and_swap(&self, expected: ExpressionStatus, next: Expression) -> Result<(), StoreError> {
        debug!(id = %next.id, %expected, next_status = %next.status, "FileStore::compare_and_swap: called");
        let mut rows = self.rows.write().await;
        let actual = rows
            .get(&next.id)
            .map(|e| e.status)
            .ok_or_else(|| StoreError::NotFound(next.id.clone()))?;
        if actual != expected {
            return Err(StoreError::Conflict {
                id: next.id,
                expected,
                actual,
            });
        }
        self.append(&next).await?;
        rows.insert(next.id.clone(), next);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_survives_reopen() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("expressions.jsonl");

        let expr = Expression::new("10 - 5", "u1");
        {
            let store = FileStore::open(&path).await.unwrap();
            store.insert(expr.clone()).await.unwrap();
            store
                .compare_and_swap(ExpressionStatus::Pending, expr.processing())
                .await
                .unwrap();
            store
                .compare_and_swap(ExpressionStatus::Processing, expr.completed(5.0))
                .await
                .unwrap();
        }

        let reopened = FileStore::open(&path).await.unwrap();
        let stored = reopened.get(&expr.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ExpressionStatus::Completed);
        assert_eq!(stored.result, Some(5.0));
        assert_eq!(reopened.list_by_owner("u1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_creates_parent_directory() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("nested").join("dir").join("log.jsonl");
        let store = FileStore::open(&path).await.unwrap();
        store.insert(Expression::new("1 + 1", "u1")).await.unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_replay_skips_garbage_lines() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("log.jsonl");
        let expr = Expression::new("1 + 1", "u1");
        let content = format!("not json\n{}\n\n", serde_json::to_string(&expr).unwrap());
        std::fs::write(&path, content).unwrap();

        let store = FileStore::open(&path).await.unwrap();
        assert_eq!(store.get(&expr.id).await.unwrap(), Some(expr));
    }

    #[tokio::test]
    async fn test_conflict_is_not_written() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("log.jsonl");
        let store = FileStore::open(&path).await.unwrap();
        let expr = Expression::new("1 / 0", "u1");
        store.insert(expr.clone()).await.unwrap();
        store
            .compare_and_swap(ExpressionStatus::Pending, expr.failed("division by zero"))
            .await
            .unwrap();

        assert!(
            store
                .compare_and_swap(ExpressionStatus::Pending, expr.completed(1.0))
                .await
                .is_err()
        );

        let lines = std::fs::read_to_string(&path).unwrap().lines().count();
        assert_eq!(lines, 2);
    }
}
