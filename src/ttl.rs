//! Identifier-keyed index with idle-time eviction.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug, Clone)]
struct Stamped<V> {
    value: V,
    touched: Instant,
}

/// Map from opaque string keys to values plus a last-touched stamp.
///
/// Reads never refresh the stamp. The index is not synchronized; shared
/// owners wrap it in a mutex so sweeps cannot interleave with writes.
#[derive(Debug, Clone)]
pub struct TtlIndex<V> {
    entries: HashMap<String, Stamped<V>>,
}

impl<V> Default for TtlIndex<V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

/// Whether an entry stamped at `touched` has been idle longer than `max_idle`.
///
/// An entry idle for exactly `max_idle` is still live.
pub fn is_idle(touched: Instant, now: Instant, max_idle: Duration) -> bool {
    now.saturating_duration_since(touched) > max_idle
}

impl<V> TtlIndex<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite `key`, stamping the current time.
    pub fn put(&mut self, key: impl Into<String>, value: V) -> Option<V> {
        self.put_at(key, value, Instant::now())
    }

    pub fn put_at(&mut self, key: impl Into<String>, value: V, at: Instant) -> Option<V> {
        self.entries
            .insert(key.into(), Stamped { value, touched: at })
            .map(|previous| previous.value)
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.entries.get(key).map(|entry| &entry.value)
    }

    pub fn touched_at(&self, key: &str) -> Option<Instant> {
        self.entries.get(key).map(|entry| entry.touched)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<V> {
        self.entries.remove(key).map(|entry| entry.value)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys of every entry idle longer than `max_idle` at `now`.
    pub fn expired_keys(&self, now: Instant, max_idle: Duration) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(_, entry)| is_idle(entry.touched, now, max_idle))
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Remove and return every entry idle longer than `max_idle`.
    ///
    /// Callers that own external resources per entry release them from the
    /// returned pairs.
    pub fn sweep(&mut self, now: Instant, max_idle: Duration) -> Vec<(String, V)> {
        self.expired_keys(now, max_idle)
            .into_iter()
            .filter_map(|key| {
                let entry = self.entries.remove(&key)?;
                Some((key, entry.value))
            })
            .collect()
    }
}
