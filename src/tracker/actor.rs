use anyhow::{anyhow, Result};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::tracker::event::{now_millis, HostMessage, UiEvent};
use crate::tracker::inspector::WindowInspector;
use crate::tracker::observer::Observer;
use crate::tracker::sink::UsageSink;

/// Cheap, cloneable way to feed the observer task. Messages are handled
/// strictly in send order.
#[derive(Clone)]
pub struct ObserverHandle {
    tx: mpsc::UnboundedSender<HostMessage>,
}

impl ObserverHandle {
    pub fn send(&self, message: HostMessage) -> Result<()> {
        self.tx
            .send(message)
            .map_err(|_| anyhow!("Observer task is no longer running"))
    }

    pub fn on_event(&self, event: UiEvent) -> Result<()> {
        self.send(HostMessage::Event(event))
    }

    pub fn on_interrupt(&self) -> Result<()> {
        self.send(HostMessage::Interrupt { timestamp_ms: now_millis() })
    }

    pub fn on_shutdown(&self) -> Result<()> {
        self.send(HostMessage::Shutdown { timestamp_ms: now_millis() })
    }

    /// Parses one line of the host bridge and forwards it. Malformed lines
    /// are skipped. Returns false once nothing more should be forwarded.
    pub fn forward_line(&self, line: &str) -> bool {
        let line = line.trim();
        if line.is_empty() {
            return true;
        }
        let message = match HostMessage::parse_line(line) {
            Ok(message) => message,
            Err(e) => {
                log::warn!("Skipping malformed host message: {}", e);
                return true;
            }
        };
        let is_shutdown = matches!(message, HostMessage::Shutdown { .. });
        if let Err(e) = self.send(message) {
            log::warn!("{}", e);
            return false;
        }
        !is_shutdown
    }
}

/// Moves the observer onto its own task. The task ends after a shutdown
/// message, or flushes and ends when every handle is dropped.
pub fn spawn_observer<K, W>(observer: Observer<K, W>) -> (ObserverHandle, JoinHandle<()>)
where
    K: UsageSink + 'static,
    W: WindowInspector + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(run(observer, rx));
    (ObserverHandle { tx }, task)
}

async fn run<K, W>(mut observer: Observer<K, W>, mut rx: mpsc::UnboundedReceiver<HostMessage>)
where
    K: UsageSink,
    W: WindowInspector,
{
    while let Some(message) = rx.recv().await {
        match message {
            HostMessage::Event(event) => observer.on_event(&event),
            HostMessage::ActiveWindow(root) => observer.inspector_mut().replace_active_window(root),
            HostMessage::Interrupt { timestamp_ms } => observer.on_interrupt(timestamp_ms),
            HostMessage::Shutdown { timestamp_ms } => {
                observer.on_shutdown(timestamp_ms);
                return;
            }
        }
    }
    log::warn!("Observer channel closed without shutdown, flushing");
    observer.on_shutdown(now_millis());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::settings::{INSTAGRAM, YOUTUBE};
    use crate::models::UserSettings;
    use crate::tracker::event::UiEventKind;
    use crate::tracker::inspector::{SnapshotInspector, UiNode};
    use crate::tracker::sink::recording::{Recorded, RecordingSink};
    use crate::util::conversion::DisplayMetrics;
    use tokio::sync::watch;

    fn spawn(sink: &RecordingSink) -> (ObserverHandle, JoinHandle<()>, watch::Sender<UserSettings>) {
        let (tx, rx) = watch::channel(UserSettings::default());
        let observer = Observer::new(sink.clone(), SnapshotInspector::default(), rx, DisplayMetrics::default());
        let (handle, task) = spawn_observer(observer);
        (handle, task, tx)
    }

    #[tokio::test]
    async fn test_messages_are_applied_in_order() {
        let sink = RecordingSink::default();
        let (handle, task, _tx) = spawn(&sink);

        handle.on_event(UiEvent::window_state(INSTAGRAM, 1_000_000_200)).unwrap();
        handle
            .send(HostMessage::ActiveWindow(Some(UiNode::leaf(true))))
            .unwrap();
        handle
            .on_event(UiEvent::new(UiEventKind::GestureStart, INSTAGRAM, 1_000_000_300))
            .unwrap();
        handle
            .send(HostMessage::Interrupt { timestamp_ms: 1_000_001_200 })
            .unwrap();
        handle
            .send(HostMessage::Shutdown { timestamp_ms: 1_000_001_700 })
            .unwrap();
        task.await.unwrap();

        assert_eq!(
            sink.calls(),
            vec![
                Recorded::TrackingApp(Some(INSTAGRAM.to_string())),
                Recorded::Scroll(INSTAGRAM.to_string(), 0.1),
                Recorded::Usage(INSTAGRAM.to_string(), 1_000),
                Recorded::Usage(INSTAGRAM.to_string(), 500),
                Recorded::TrackingApp(None),
            ]
        );
        assert!(handle.on_interrupt().is_err());
    }

    #[tokio::test]
    async fn test_forward_line_skips_garbage_and_stops_on_shutdown() {
        let sink = RecordingSink::default();
        let (handle, task, _tx) = spawn(&sink);

        assert!(handle.forward_line(""));
        assert!(handle.forward_line("not json"));
        assert!(handle.forward_line(r#"{"event":{"type":"pinch","timestamp_ms":1}}"#));
        assert!(handle.forward_line(
            r#"{"event":{"type":"window_state_changed","package":"com.instagram.android","timestamp_ms":1000000200}}"#
        ));
        assert!(!handle.forward_line(r#"{"shutdown":{"timestamp_ms":1000000700}}"#));
        task.await.unwrap();

        assert_eq!(sink.usages(), vec![(INSTAGRAM.to_string(), 500)]);
        assert!(!handle.forward_line(r#"{"interrupt":{}}"#));
    }

    #[tokio::test]
    async fn test_dropping_handles_flushes_open_session() {
        let sink = RecordingSink::default();
        let (handle, task, _tx) = spawn(&sink);
        handle
            .on_event(UiEvent::window_state(YOUTUBE, now_millis() - 2_000))
            .unwrap();
        drop(handle);
        task.await.unwrap();

        let usages = sink.usages();
        assert_eq!(usages.len(), 1);
        assert!(usages[0].1 >= 2_000);
        assert_eq!(sink.calls().last(), Some(&Recorded::TrackingApp(None)));
    }
}
