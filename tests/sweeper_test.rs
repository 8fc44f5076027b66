use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use webhook_bridge::{Sweep, Sweeper};

#[derive(Default)]
struct CountingStore {
    passes: AtomicUsize,
}

#[async_trait]
impl Sweep for CountingStore {
    fn name(&self) -> &'static str {
        "counting"
    }

    async fn sweep(&self) -> usize {
        self.passes.fetch_add(1, Ordering::SeqCst);
        0
    }
}

fn targets(store: &Arc<CountingStore>) -> Vec<Arc<dyn Sweep>> {
    vec![store.clone()]
}

#[tokio::test(start_paused = true)]
async fn test_sweeps_once_per_interval() {
    let store = Arc::new(CountingStore::default());
    let handle = Sweeper::spawn(targets(&store), Duration::from_secs(10));

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(store.passes.load(Ordering::SeqCst), 0);

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(store.passes.load(Ordering::SeqCst), 3);
    assert!(handle.is_running());

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_stops_sweeping() {
    let store = Arc::new(CountingStore::default());
    let handle = Sweeper::spawn(targets(&store), Duration::from_secs(10));

    tokio::time::sleep(Duration::from_secs(15)).await;
    handle.shutdown().await;
    let passes = store.passes.load(Ordering::SeqCst);

    tokio::time::sleep(Duration::from_secs(100)).await;
    assert_eq!(passes, 1);
    assert_eq!(store.passes.load(Ordering::SeqCst), passes);
}

#[tokio::test(start_paused = true)]
async fn test_dropping_handle_stops_sweeping() {
    let store = Arc::new(CountingStore::default());
    let handle = Sweeper::spawn(targets(&store), Duration::from_secs(10));
    drop(handle);

    tokio::time::sleep(Duration::from_secs(100)).await;
    assert_eq!(store.passes.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_every_target_is_swept() {
    let first = Arc::new(CountingStore::default());
    let second = Arc::new(CountingStore::default());
    let targets: Vec<Arc<dyn Sweep>> = vec![first.clone(), second.clone()];
    let handle = Sweeper::spawn(targets, Duration::from_secs(1));

    tokio::time::sleep(Duration::from_millis(2500)).await;

    assert_eq!(first.passes.load(Ordering::SeqCst), 2);
    assert_eq!(second.passes.load(Ordering::SeqCst), 2);
    handle.shutdown().await;
}
