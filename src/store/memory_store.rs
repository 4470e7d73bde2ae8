use crate::store::Store;
use crate::Result;
use anyhow::bail;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::trace;

/// An implementation of the `Store` trait that holds everything in memory. It can be told to fail
/// or to be slow, and it remembers every successful save, which is what the tests use to observe
/// the persistence layer.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: Mutex<HashMap<String, serde_json::Value>>,
    saves: Mutex<Vec<(String, serde_json::Value)>>,
    behavior: Mutex<Behavior>,
}

#[derive(Debug, Default, Clone, Copy)]
struct Behavior {
    failing: bool,
    latency: Duration,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that already holds `data`.
    pub fn with_data<K>(data: impl IntoIterator<Item = (K, serde_json::Value)>) -> Self
    where
        K: Into<String>,
    {
        let store = Self::new();
        lock(&store.data).extend(data.into_iter().map(|(k, v)| (k.into(), v)));
        store
    }

    /// The document currently stored under `key`.
    pub fn get(&self, key: &str) -> Option<serde_json::Value> {
        lock(&self.data).get(key).cloned()
    }

    /// Every successful save so far, oldest first.
    pub fn saves(&self) -> Vec<(String, serde_json::Value)> {
        lock(&self.saves).clone()
    }

    /// The number of successful saves of `key`.
    pub fn save_count(&self, key: &str) -> usize {
        lock(&self.saves).iter().filter(|(k, _)| k == key).count()
    }

    /// While `failing` is true every save returns an error and stores nothing.
    pub fn set_failing(&self, failing: bool) {
        lock(&self.behavior).failing = failing;
    }

    /// Makes every save take `latency` before it completes.
    pub fn set_latency(&self, latency: Duration) {
        lock(&self.behavior).latency = latency;
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait::async_trait]
impl Store for MemoryStore {
    async fn load(&self, key: &str) -> Result<Option<serde_json::Value>> {
        Ok(self.get(key))
    }

    async fn save(&self, key: &str, value: &serde_json::Value) -> Result<()> {
        let behavior = *lock(&self.behavior);
        if !behavior.latency.is_zero() {
            tokio::time::sleep(behavior.latency).await;
        }
        if behavior.failing {
            bail!("The memory store is set to fail saves");
        }
        trace!("Saving '{key}' in memory");
        lock(&self.data).insert(key.to_string(), value.clone());
        lock(&self.saves).push((key.to_string(), value.clone()));
        Ok(())
    }
}
