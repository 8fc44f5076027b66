use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// A store whose idle entries can be evicted in one pass.
#[async_trait]
pub trait Sweep: Send + Sync {
    /// Short label used in logs.
    fn name(&self) -> &'static str;

    /// Evict idle entries; returns how many were removed.
    async fn sweep(&self) -> usize;
}

/// Periodic background sweep over a fixed set of stores.
pub struct Sweeper;

impl Sweeper {
    /// Spawn the sweep loop on the current runtime.
    ///
    /// The first pass runs one `interval` after spawning.
    pub fn spawn(targets: Vec<Arc<dyn Sweep>>, interval: Duration) -> SweeperHandle {
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(sweep_loop(targets, interval, shutdown.clone()));
        SweeperHandle {
            shutdown,
            handle: Some(handle),
        }
    }
}

/// Owner of a running sweep loop. Dropping it stops the loop.
pub struct SweeperHandle {
    shutdown: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl SweeperHandle {
    /// Stop the loop and wait for it to exit.
    pub async fn shutdown(mut self) {
        self.shutdown.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn sweep_loop(
    targets: Vec<Arc<dyn Sweep>>,
    period: Duration,
    shutdown: CancellationToken,
) {
    let mut ticker = tokio::time::interval(period.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {}
        }

        for target in &targets {
            let evicted = target.sweep().await;
            if evicted > 0 {
                debug!(store = target.name(), evicted, "sweep evicted idle entries");
            }
        }
    }

    debug!("sweeper stopped");
}
