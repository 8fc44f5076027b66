use reqwest::Url;
use tokio::sync::RwLock;
use tracing::info;

use crate::error::RegistryError;
use crate::telemetry::metric_add;
use crate::types::{Listener, ListenerId};

#[derive(Debug)]
struct RegistryState {
    listeners: Vec<Listener>,
    next_id: u64,
}

/// Set of subscribed webhook listeners and their failure counts.
///
/// The dispatcher reads snapshots through [`list`](Self::list) and reports
/// outcomes back; it never touches the collection directly.
#[derive(Debug)]
pub struct ListenerRegistry {
    state: RwLock<RegistryState>,
    failure_threshold: u32,
}

impl Default for ListenerRegistry {
    fn default() -> Self {
        Self::new(3)
    }
}

impl ListenerRegistry {
    /// Registry that prunes listeners after `failure_threshold` consecutive
    /// failures. A threshold of 0 is raised to 1.
    pub fn new(failure_threshold: u32) -> Self {
        Self {
            state: RwLock::new(RegistryState {
                listeners: Vec::new(),
                next_id: 1,
            }),
            failure_threshold: failure_threshold.max(1),
        }
    }

    pub fn failure_threshold(&self) -> u32 {
        self.failure_threshold
    }

    pub async fn has(&self, url: &str) -> bool {
        let guard = self.state.read().await;
        guard.listeners.iter().any(|l| l.url == url)
    }

    /// Subscribe `url` and return its new id.
    pub async fn add(&self, url: &str) -> Result<ListenerId, RegistryError> {
        if !is_webhook_url(url) {
            return Err(RegistryError::InvalidUrl {
                url: url.to_string(),
            });
        }

        let mut guard = self.state.write().await;
        if let Some(existing) = guard.listeners.iter().find(|l| l.url == url) {
            return Err(RegistryError::AlreadyRegistered {
                url: url.to_string(),
                id: existing.id,
            });
        }

        let id = ListenerId(guard.next_id);
        guard.next_id += 1;
        guard.listeners.push(Listener::new(id, url));

        info!(listener_id = %id, url, "webhook listener registered");
        Ok(id)
    }

    /// Unsubscribe `id`. Unknown ids are not an error.
    pub async fn remove(&self, id: ListenerId) -> bool {
        let mut guard = self.state.write().await;
        let before = guard.listeners.len();
        guard.listeners.retain(|l| l.id != id);
        let removed = guard.listeners.len() != before;
        if removed {
            info!(listener_id = %id, "webhook listener removed");
        }
        removed
    }

    pub async fn get(&self, id: ListenerId) -> Option<Listener> {
        let guard = self.state.read().await;
        guard.listeners.iter().find(|l| l.id == id).cloned()
    }

    /// Listeners in subscription order.
    pub async fn list(&self) -> Vec<Listener> {
        self.state.read().await.listeners.clone()
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.listeners.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.listeners.is_empty()
    }

    pub async fn record_success(&self, id: ListenerId) {
        let mut guard = self.state.write().await;
        if let Some(listener) = guard.listeners.iter_mut().find(|l| l.id == id) {
            listener.consecutive_failures = 0;
        }
    }

    /// Count a failed delivery; returns the new count if `id` is still subscribed.
    pub async fn record_failure(&self, id: ListenerId) -> Option<u32> {
        let mut guard = self.state.write().await;
        let listener = guard.listeners.iter_mut().find(|l| l.id == id)?;
        listener.consecutive_failures = listener.consecutive_failures.saturating_add(1);
        Some(listener.consecutive_failures)
    }

    /// Drop every listener at or over the failure threshold.
    pub async fn prune(&self) -> Vec<Listener> {
        let mut guard = self.state.write().await;
        let threshold = self.failure_threshold;
        let (pruned, kept): (Vec<_>, Vec<_>) = guard
            .listeners
            .drain(..)
            .partition(|l| l.consecutive_failures >= threshold);
        guard.listeners = kept;

        for listener in &pruned {
            info!(
                listener_id = %listener.id,
                url = %listener.url,
                failures = listener.consecutive_failures,
                "webhook listener deregistered after repeated failures"
            );
        }
        if !pruned.is_empty() {
            metric_add("bridge.listener.pruned", pruned.len() as u64);
        }
        pruned
    }
}

fn is_webhook_url(url: &str) -> bool {
    match Url::parse(url) {
        Ok(parsed) => matches!(parsed.scheme(), "http" | "https") && parsed.has_host(),
        Err(_) => false,
    }
}
