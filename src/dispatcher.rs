use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use bytes::Bytes;
use futures::future::join_all;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::DispatcherConfig;
use crate::error::{DispatchError, FailureReason};
use crate::registry::ListenerRegistry;
use crate::telemetry::metric_inc;
use crate::transport::Transport;
use crate::types::{DomainEvent, Listener, ListenerId};

/// Outcome of one dispatch round.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Listeners that accepted the event.
    pub delivered: Vec<ListenerId>,

    /// Listeners whose attempt failed, with the reason.
    pub failed: Vec<(ListenerId, FailureReason)>,

    /// Listeners deregistered at the end of the round.
    pub pruned: Vec<Listener>,
}

impl DispatchReport {
    pub fn attempted(&self) -> usize {
        self.delivered.len() + self.failed.len()
    }

    /// Whether every attempted delivery succeeded.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Fans events out to every registered listener.
///
/// Each round makes exactly one attempt per listener, all bounded by a single
/// shared deadline. Failure counts are updated as attempts settle and the
/// registry is pruned once the round is over. Rounds never overlap.
pub struct EventDispatcher {
    registry: Arc<ListenerRegistry>,
    transport: Arc<dyn Transport>,
    config: DispatcherConfig,
    round: Mutex<()>,
    is_running: AtomicBool,
}

impl EventDispatcher {
    pub fn new(
        registry: Arc<ListenerRegistry>,
        transport: Arc<dyn Transport>,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            registry,
            transport,
            config,
            round: Mutex::new(()),
            is_running: AtomicBool::new(true),
        }
    }

    pub fn registry(&self) -> &Arc<ListenerRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Deliver `event` to every current listener.
    pub async fn dispatch<T: Serialize>(
        &self,
        event: &DomainEvent<T>,
    ) -> Result<DispatchReport, DispatchError> {
        if !self.is_running() {
            return Err(DispatchError::Shutdown);
        }

        let body = serde_json::to_vec(event)
            .map(Bytes::from)
            .map_err(|e| DispatchError::Serialization(e.to_string()))?;

        let _round = self.round.lock().await;
        metric_inc("bridge.dispatch.rounds");

        let listeners = self.registry.list().await;
        if listeners.is_empty() {
            debug!(kind = %event.kind, "no listeners registered, skipping delivery");
            let pruned = self.registry.prune().await;
            return Ok(DispatchReport {
                pruned,
                ..Default::default()
            });
        }

        let deadline = CancellationToken::new();
        let timer = {
            let deadline = deadline.clone();
            let timeout = self.config.delivery_timeout;
            tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                deadline.cancel();
            })
        };

        let attempts = listeners
            .iter()
            .map(|listener| self.attempt(listener, body.clone(), &deadline));
        let outcomes = join_all(attempts).await;
        timer.abort();

        let mut report = DispatchReport::default();
        for (id, outcome) in outcomes {
            match outcome {
                Ok(()) => report.delivered.push(id),
                Err(reason) => report.failed.push((id, reason)),
            }
        }
        report.pruned = self.registry.prune().await;

        debug!(
            kind = %event.kind,
            delivered = report.delivered.len(),
            failed = report.failed.len(),
            pruned = report.pruned.len(),
            "dispatch round completed"
        );
        Ok(report)
    }

    async fn attempt(
        &self,
        listener: &Listener,
        body: Bytes,
        deadline: &CancellationToken,
    ) -> (ListenerId, Result<(), FailureReason>) {
        let result = tokio::select! {
            result = self.transport.post(&listener.url, body) => result,
            _ = deadline.cancelled() => Err(FailureReason::Timeout),
        };

        match result {
            Ok(()) => {
                metric_inc("bridge.delivery.success");
                self.registry.record_success(listener.id).await;
            }
            Err(reason) => {
                metric_inc("bridge.delivery.failure");
                let failures = self.registry.record_failure(listener.id).await;
                warn!(
                    listener_id = %listener.id,
                    url = %listener.url,
                    reason = %reason,
                    failures,
                    "webhook delivery failed"
                );
            }
        }

        (listener.id, result)
    }

    /// Refuse further rounds. A round already in flight runs to completion.
    pub fn shutdown(&self) {
        self.is_running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::SeqCst)
    }
}
