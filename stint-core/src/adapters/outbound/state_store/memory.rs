use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, RwLock,
    },
};

use async_trait::async_trait;

use crate::domain::{ports::outbound::StateStore, StoreError};

/// State store backed by an in-memory HashMap.
///
/// Clones share the same map, which lets a test drop an engine and build a
/// new one over the same store to simulate a restart.
#[derive(Clone, Default)]
pub struct MemoryStateStore {
    values: Arc<RwLock<HashMap<String, String>>>,
    writes: Arc<AtomicUsize>,
    failing: Arc<AtomicBool>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a stored value without going through the async port.
    pub fn value(&self, key: &str) -> Option<String> {
        self.values
            .read()
            .expect("state store lock poisoned")
            .get(key)
            .cloned()
    }

    pub fn insert(&self, key: &str, value: impl Into<String>) {
        self.values
            .write()
            .expect("state store lock poisoned")
            .insert(key.to_string(), value.into());
    }

    /// Number of successful `set` calls.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Make every operation fail until turned back off.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::unavailable("injected failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.check()?;
        Ok(self.value(key))
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        self.check()?;
        self.insert(key, value);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.check()?;
        self.values
            .write()
            .expect("state store lock poisoned")
            .remove(key);
        Ok(())
    }
}
