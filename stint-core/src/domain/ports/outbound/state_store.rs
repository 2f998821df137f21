//! Persistent state store port (outbound).
//!
//! A small key-value store scoped to one workspace, used to survive process
//! restarts.

use async_trait::async_trait;

use crate::domain::StoreError;

#[async_trait]
pub trait StateStore: Send + Sync + 'static {
    /// Get the value stored under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Store `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: String) -> Result<(), StoreError>;

    /// Remove `key`. Removing a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}
