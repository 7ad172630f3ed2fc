use std::sync::Arc;

use crate::database::{Database, UsageStore, WriteQueue};
use crate::models::settings::{INSTAGRAM, TIKTOK, YOUTUBE};
use crate::tracker::{spawn_observer, HostMessage, Observer, SnapshotInspector, UiEvent, UiEventKind};
use crate::util::conversion::{pixels_to_meters, DisplayMetrics};

const METRICS: DisplayMetrics = DisplayMetrics { xdpi: 420.0, ydpi: 420.0, height_pixels: 2400 };
const T0: i64 = 1_700_000_000_300;

async fn memory_store() -> Arc<UsageStore> {
    let db = Database::new("sqlite::memory:").await.unwrap();
    Arc::new(UsageStore::open(db).await.unwrap())
}

/// Host lines go through the actor and the write queue into the store.
#[tokio::test]
async fn test_host_session_is_persisted() {
    let store = memory_store().await;
    let (queue, writer_task) = WriteQueue::spawn(Arc::clone(&store));
    let observer = Observer::new(queue, SnapshotInspector::default(), store.subscribe_settings(), METRICS);
    let (handle, observer_task) = spawn_observer(observer);

    let messages = vec![
        HostMessage::Event(UiEvent::window_state(INSTAGRAM, T0)),
        HostMessage::Event(UiEvent::scrolled(INSTAGRAM, T0 + 100, -1, -1).with_delta(0, 420)),
        HostMessage::Event(UiEvent::scrolled(INSTAGRAM, T0 + 120, -1, -1).with_delta(0, 420)), // debounced
        HostMessage::Event(UiEvent::scrolled(INSTAGRAM, T0 + 200, -1, -1).with_delta(252, 336)),
        HostMessage::Event(UiEvent::window_state(YOUTUBE, T0 + 10_000)),
        HostMessage::Event(UiEvent::new(UiEventKind::GestureStart, YOUTUBE, T0 + 10_500)),
        HostMessage::Event(UiEvent::window_state("com.android.launcher", T0 + 15_000)),
        HostMessage::Event(UiEvent::window_state(TIKTOK, T0 + 20_000)),
        HostMessage::Interrupt { timestamp_ms: T0 + 21_000 },
        HostMessage::Shutdown { timestamp_ms: T0 + 24_000 },
    ];
    for message in messages {
        handle.send(message).unwrap();
    }
    observer_task.await.unwrap();
    writer_task.await.unwrap();

    let today = store.today_usage().await.unwrap();
    // 10s Instagram + 5s YouTube + 4s TikTok, launcher time excluded
    assert_eq!(today.total_usage_time_millis, 19_000);
    assert_eq!(today.app_usages[INSTAGRAM].usage_time_millis, 10_000);
    assert_eq!(today.app_usages[YOUTUBE].usage_time_millis, 5_000);
    assert_eq!(today.app_usages[TIKTOK].usage_time_millis, 4_000);

    assert_eq!(today.total_scroll_count, 3);
    assert_eq!(today.app_usages[INSTAGRAM].scroll_count, 2);
    assert_eq!(today.app_usages[YOUTUBE].scroll_count, 1);

    // 420px and 420px (252/336/420 triangle) at 420 dpi, plus a third of the screen
    let expected = 2.0 * 0.0254 + pixels_to_meters(800, &METRICS);
    assert!((today.total_scroll_distance_meters - expected).abs() < 1e-9);

    assert_eq!(store.current_tracking_app().await.unwrap(), None);
}

/// Apps added through the store reach an already running observer.
#[tokio::test]
async fn test_tracked_apps_follow_store_settings() {
    let store = memory_store().await;
    let (queue, writer_task) = WriteQueue::spawn(Arc::clone(&store));
    let observer = Observer::new(queue, SnapshotInspector::default(), store.subscribe_settings(), METRICS);
    let (handle, observer_task) = spawn_observer(observer);

    let reddit = "com.reddit.frontpage";
    let mut apps = store.selected_apps();
    apps.insert(reddit.to_string());
    store.update_selected_apps(&apps).await.unwrap();

    // Lands in the refresh window (t % 5000 < 100)
    let at = 1_700_000_005_000;
    handle.on_event(UiEvent::window_state(reddit, at)).unwrap();
    handle.send(HostMessage::Shutdown { timestamp_ms: at + 3_000 }).unwrap();
    observer_task.await.unwrap();
    writer_task.await.unwrap();

    let today = store.today_usage().await.unwrap();
    assert_eq!(today.app_usages[reddit].usage_time_millis, 3_000);
    assert_eq!(today.total_usage_time_millis, 3_000);
}
