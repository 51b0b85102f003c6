use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::MetricsCollector;

/// Background task that re-trims the collector's buffers on a fixed interval.
///
/// Dropping the handle without calling [`EvictionTask::stop`] also ends the
/// loop, because the shutdown sender is dropped with it.
pub struct EvictionTask {
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl EvictionTask {
    /// Spawn the loop on the current Tokio runtime. `every` must be non-zero.
    pub fn spawn(metrics: Arc<MetricsCollector>, every: Duration) -> Self {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let handle = tokio::spawn(run(metrics, every, shutdown_rx));

        Self {
            shutdown_tx: Some(shutdown_tx),
            handle,
        }
    }

    /// Signal the loop to exit and wait until it has.
    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        // The task may have already finished
        let _ = self.handle.await;
        info!("metrics eviction task stopped");
    }
}

async fn run(metrics: Arc<MetricsCollector>, every: Duration, mut shutdown_rx: oneshot::Receiver<()>) {
    let mut interval = tokio::time::interval(every);
    // The first tick completes immediately; nothing to trim yet
    interval.tick().await;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let dropped = metrics.evict();
                debug!(dropped, "metrics eviction tick");
            }
            _ = &mut shutdown_rx => break,
        }
    }
}
