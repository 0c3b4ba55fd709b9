// Driven port - Key-value store (output port)

use async_trait::async_trait;
use thiserror::Error;

#[cfg(test)]
use mockall::automock;

#[derive(Debug, Error)]
#[error("key-value store error: {0}")]
pub struct StoreError(pub String);

/// One write inside an atomic batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp {
    Set { key: String, value: String },
    Delete { key: String },
}

impl StoreOp {
    pub fn set(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Set {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn delete(key: impl Into<String>) -> Self {
        Self::Delete { key: key.into() }
    }
}

/// Single flat string namespace. A missing key is `Ok(None)`, never an error.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    async fn set_with_ttl(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), StoreError>;
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
    /// Glob pattern, `*` matches any run of characters. No pagination.
    async fn list_keys(&self, pattern: &str) -> Result<Vec<String>, StoreError>;
    /// Applies every op or none of them.
    async fn apply(&self, ops: Vec<StoreOp>) -> Result<(), StoreError>;
}
