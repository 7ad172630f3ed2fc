use anyhow::Result;
use dotenvy::dotenv;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

use life_waste_meter::config::settings::debug_logs_enabled;
use life_waste_meter::config::{init_logging, Settings};
use life_waste_meter::database::{Database, UsageStore, WriteQueue};
use life_waste_meter::tracker::{spawn_observer, Observer, SnapshotInspector};

/// How often settings written by the dashboard process are picked up.
const STORE_RESYNC_INTERVAL: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    init_logging("daemon.log", debug_logs_enabled())?;

    log::info!("Starting Life Waste Meter daemon");
    let settings = Settings::new()?;
    log::info!("Connecting to database...");
    let database = Database::new(&settings.database_url).await?;
    let store = Arc::new(UsageStore::open(database).await?);
    log::info!("Store ready. Display metrics: {:?}", settings.display);

    let (queue, writer_task) = WriteQueue::spawn(Arc::clone(&store));
    let observer = Observer::new(
        queue,
        SnapshotInspector::default(),
        store.subscribe_settings(),
        settings.display,
    );
    let (handle, observer_task) = spawn_observer(observer);

    let shutdown_flag = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGTERM, Arc::clone(&shutdown_flag))?;
    signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&shutdown_flag))?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut shutdown_check = tokio::time::interval(Duration::from_millis(100));
    let mut resync = tokio::time::interval(STORE_RESYNC_INTERVAL);

    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    if !handle.forward_line(&line) {
                        log::info!("Host requested shutdown");
                        break;
                    }
                }
                Ok(None) => {
                    log::info!("Host closed the event stream");
                    break;
                }
                Err(e) => {
                    log::error!("Failed to read event stream: {}", e);
                    break;
                }
            },
            _ = shutdown_check.tick() => {
                if shutdown_flag.load(Ordering::Relaxed) {
                    log::info!("Received shutdown signal, flushing and exiting...");
                    break;
                }
            }
            _ = resync.tick() => {
                if let Err(e) = store.reload().await {
                    log::warn!("Store re-sync failed: {}", e);
                }
            }
        }
    }

    // Fails harmlessly if the host already sent its own shutdown
    let _ = handle.on_shutdown();
    drop(handle);
    observer_task.await?;
    // The observer owned the last queue sender, so the writer drains and stops
    writer_task.await?;
    store.close().await;

    log::info!("Daemon stopped");
    Ok(())
}
