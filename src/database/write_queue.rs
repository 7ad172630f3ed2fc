use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::database::store::UsageStore;
use crate::tracker::sink::UsageSink;

#[derive(Debug, Clone, PartialEq)]
pub enum StoreWrite {
    Scroll { package: String, distance_meters: f64 },
    Usage { package: String, elapsed_millis: i64 },
    TrackingApp(Option<String>),
}

/// Fire-and-forget writes into the store, applied one at a time by a
/// background task. A failed write is logged and does not stop the queue.
#[derive(Clone)]
pub struct WriteQueue {
    tx: mpsc::UnboundedSender<StoreWrite>,
}

impl WriteQueue {
    /// The task drains remaining writes and exits once every queue clone is dropped.
    pub fn spawn(store: Arc<UsageStore>) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<StoreWrite>();
        let task = tokio::spawn(async move {
            while let Some(write) = rx.recv().await {
                if let Err(e) = apply(&store, &write).await {
                    log::error!("Failed to store {:?}: {}", write, e);
                }
            }
            log::debug!("Write queue drained");
        });
        (Self { tx }, task)
    }

    pub fn push(&self, write: StoreWrite) {
        if self.tx.send(write).is_err() {
            log::error!("Write queue is closed, dropping write");
        }
    }
}

async fn apply(store: &UsageStore, write: &StoreWrite) -> anyhow::Result<()> {
    match write {
        StoreWrite::Scroll { package, distance_meters } => {
            store.record_scroll(package, *distance_meters).await?;
        }
        StoreWrite::Usage { package, elapsed_millis } => {
            store.record_usage(package, *elapsed_millis).await?;
        }
        StoreWrite::TrackingApp(package) => {
            store.set_current_tracking_app(package.as_deref()).await?;
        }
    }
    Ok(())
}

impl UsageSink for WriteQueue {
    fn record_scroll(&self, package: &str, distance_meters: f64) {
        self.push(StoreWrite::Scroll {
            package: package.to_string(),
            distance_meters,
        });
    }

    fn record_usage(&self, package: &str, elapsed_millis: i64) {
        self.push(StoreWrite::Usage {
            package: package.to_string(),
            elapsed_millis,
        });
    }

    fn record_tracking_app(&self, package: Option<&str>) {
        self.push(StoreWrite::TrackingApp(package.map(str::to_string)));
    }
}
