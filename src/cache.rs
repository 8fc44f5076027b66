use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::sweeper::Sweep;
use crate::ttl::{is_idle, TtlIndex};

/// Read-through cache for records resolved from the chat client.
///
/// Entries expire `ttl` after they were stored; reads do not extend them.
/// Values are handed out as clones.
pub struct LookupCache<V> {
    name: &'static str,
    ttl: Duration,
    index: Mutex<TtlIndex<V>>,
}

impl<V: Clone + Send> LookupCache<V> {
    pub fn new(name: &'static str, ttl: Duration) -> Self {
        Self {
            name,
            ttl,
            index: Mutex::new(TtlIndex::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cached value for `key`, unless it has expired.
    pub async fn get(&self, key: &str) -> Option<V> {
        self.get_at(key, Instant::now()).await
    }

    pub async fn get_at(&self, key: &str, now: Instant) -> Option<V> {
        let index = self.index.lock().await;
        let touched = index.touched_at(key)?;
        if is_idle(touched, now, self.ttl) {
            return None;
        }
        index.get(key).cloned()
    }

    pub async fn insert(&self, key: impl Into<String>, value: V) {
        self.index.lock().await.put(key, value);
    }

    /// Return the cached value or resolve, store and return a fresh one.
    ///
    /// The lock is not held while `resolve` runs. Resolver errors are
    /// returned and nothing is cached.
    pub async fn get_or_try_insert_with<F, Fut, E>(&self, key: &str, resolve: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get(key).await {
            return Ok(value);
        }

        let value = resolve().await?;
        self.insert(key, value.clone()).await;
        Ok(value)
    }

    pub async fn invalidate(&self, key: &str) {
        self.index.lock().await.remove(key);
    }

    pub async fn len(&self) -> usize {
        self.index.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.index.lock().await.is_empty()
    }

    pub async fn sweep_at(&self, now: Instant) -> usize {
        self.index.lock().await.sweep(now, self.ttl).len()
    }
}

#[async_trait]
impl<V: Clone + Send + Sync> Sweep for LookupCache<V> {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn sweep(&self) -> usize {
        self.sweep_at(Instant::now()).await
    }
}
