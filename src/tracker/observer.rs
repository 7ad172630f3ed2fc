use std::collections::BTreeSet;
use tokio::sync::watch;

use crate::models::UserSettings;
use crate::tracker::event::{UiEvent, UiEventKind};
use crate::tracker::inspector::WindowInspector;
use crate::tracker::policy::{
    policy_for, swipe_distance_meters, CONTENT_CHANGED_COOLDOWN_MS, NOMINAL_SCROLL_METERS,
    TOUCH_START_COOLDOWN_MS,
};
use crate::tracker::sink::UsageSink;
use crate::util::conversion::{pixels_to_meters, DisplayMetrics};

/// Tracked apps are re-read from settings when an event lands in the first
/// `REFRESH_WINDOW_MS` of every `REFRESH_PERIOD_MS`.
pub const REFRESH_PERIOD_MS: i64 = 5_000;
pub const REFRESH_WINDOW_MS: i64 = 100;

/// Foreground period of one tracked app.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub package: String,
    pub started_at_ms: i64,
    pub scroll_count: u32,
    pub last_scroll_at_ms: Option<i64>,
    pub last_scroll_x: i32,
    pub last_scroll_y: i32,
}

impl Session {
    fn start(package: &str, at_ms: i64) -> Self {
        Self {
            package: package.to_string(),
            started_at_ms: at_ms,
            scroll_count: 0,
            last_scroll_at_ms: None,
            last_scroll_x: 0,
            last_scroll_y: 0,
        }
    }

    fn since_last_scroll(&self, at_ms: i64) -> Option<i64> {
        self.last_scroll_at_ms.map(|last| at_ms - last)
    }

    fn count_scroll(&mut self, at_ms: i64) {
        self.scroll_count += 1;
        self.last_scroll_at_ms = Some(at_ms);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Idle,
    Tracking(Session),
}

/// Turns the host's event stream into scroll counts, distances and
/// per-app foreground time. Owned by a single task; see `tracker::actor`.
pub struct Observer<K, W> {
    sink: K,
    inspector: W,
    settings: watch::Receiver<UserSettings>,
    metrics: DisplayMetrics,
    tracked_apps: BTreeSet<String>,
    state: SessionState,
}

impl<K: UsageSink, W: WindowInspector> Observer<K, W> {
    pub fn new(
        sink: K,
        inspector: W,
        settings: watch::Receiver<UserSettings>,
        metrics: DisplayMetrics,
    ) -> Self {
        let tracked_apps = settings.borrow().selected_apps.clone();
        log::info!("Observer started, tracking {:?}", tracked_apps);
        Self {
            sink,
            inspector,
            settings,
            metrics,
            tracked_apps,
            state: SessionState::Idle,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn current_app(&self) -> Option<&str> {
        match &self.state {
            SessionState::Tracking(session) => Some(session.package.as_str()),
            SessionState::Idle => None,
        }
    }

    pub fn tracked_apps(&self) -> &BTreeSet<String> {
        &self.tracked_apps
    }

    pub fn inspector_mut(&mut self) -> &mut W {
        &mut self.inspector
    }

    pub fn on_event(&mut self, event: &UiEvent) {
        if event.timestamp_ms.rem_euclid(REFRESH_PERIOD_MS) < REFRESH_WINDOW_MS {
            self.refresh_tracked_apps();
        }

        match event.kind {
            UiEventKind::WindowStateChanged => self.handle_window_state_changed(event),
            UiEventKind::ScrollPositionChanged => self.handle_scroll(event),
            UiEventKind::GestureStart => self.handle_gesture_start(event),
            UiEventKind::ContentChanged => self.handle_content_changed(event),
            UiEventKind::TouchStart => self.handle_touch_start(event),
        }
    }

    /// Host paused delivery: attribute time so far, keep the session open.
    pub fn on_interrupt(&mut self, at_ms: i64) {
        if let SessionState::Tracking(session) = &mut self.state {
            let elapsed = at_ms - session.started_at_ms;
            if elapsed > 0 {
                self.sink.record_usage(&session.package, elapsed);
                session.started_at_ms = at_ms;
            }
            log::info!("Observer interrupted, checkpointed {} ({}ms)", session.package, elapsed.max(0));
        }
    }

    pub fn on_shutdown(&mut self, at_ms: i64) {
        if self.end_session(at_ms) {
            self.sink.record_tracking_app(None);
        }
        log::info!("Observer shut down");
    }

    fn refresh_tracked_apps(&mut self) {
        let latest = self.settings.borrow_and_update().selected_apps.clone();
        if latest != self.tracked_apps {
            log::info!("Tracked apps changed: {:?}", latest);
            self.tracked_apps = latest;
        }
    }

    /// Flushes the open session, if any, and goes idle.
    fn end_session(&mut self, at_ms: i64) -> bool {
        match std::mem::replace(&mut self.state, SessionState::Idle) {
            SessionState::Tracking(session) => {
                let elapsed = at_ms - session.started_at_ms;
                if elapsed > 0 {
                    self.sink.record_usage(&session.package, elapsed);
                }
                log::info!(
                    "Session ended: {} after {}ms with {} scrolls",
                    session.package,
                    elapsed.max(0),
                    session.scroll_count
                );
                true
            }
            SessionState::Idle => false,
        }
    }

    fn handle_window_state_changed(&mut self, event: &UiEvent) {
        let tracked = event.package().filter(|p| self.tracked_apps.contains(*p));
        log::debug!("Window state changed: {:?}, tracked={}", event.package(), tracked.is_some());

        match tracked {
            Some(package) => {
                if self.current_app() != Some(package) {
                    self.end_session(event.timestamp_ms);
                    self.state = SessionState::Tracking(Session::start(package, event.timestamp_ms));
                    self.sink.record_tracking_app(Some(package));
                    log::info!("Started tracking: {}", package);
                }
            }
            None => {
                if self.end_session(event.timestamp_ms) {
                    self.sink.record_tracking_app(None);
                    log::info!("Stopped tracking");
                }
            }
        }
    }

    fn handle_scroll(&mut self, event: &UiEvent) {
        let Some(session) = active_session(&self.tracked_apps, &mut self.state, event) else {
            log::debug!("Scroll ignored: {:?} is not the tracked foreground app", event.package());
            return;
        };
        if let Some(distance) = recognize_scroll(session, event, &self.metrics) {
            self.sink.record_scroll(&session.package, distance);
        }
    }

    fn handle_gesture_start(&mut self, event: &UiEvent) {
        let Some(session) = active_session(&self.tracked_apps, &mut self.state, event) else {
            return;
        };
        let policy = policy_for(&session.package);
        if let Some(elapsed) = session.since_last_scroll(event.timestamp_ms) {
            if elapsed < policy.gesture_debounce_ms {
                log::debug!(
                    "Gesture debounced: elapsed={}ms threshold={}ms",
                    elapsed,
                    policy.gesture_debounce_ms
                );
                return;
            }
        }

        // Apps without scroll positions get every gesture; others need a scrollable view
        let accepted = policy.high_priority || scan_for_scrollable(&self.inspector);
        if !accepted {
            log::debug!("Gesture in {} not counted: no scrollable node", session.package);
            return;
        }

        session.count_scroll(event.timestamp_ms);
        let distance = swipe_distance_meters(&policy, &self.metrics);
        log::debug!("Gesture counted as scroll: {} {:.3}m", session.package, distance);
        self.sink.record_scroll(&session.package, distance);
    }

    fn handle_content_changed(&mut self, event: &UiEvent) {
        let Some(session) = active_session(&self.tracked_apps, &mut self.state, event) else {
            return;
        };
        let policy = policy_for(&session.package);
        if !policy.high_priority {
            return;
        }
        if session
            .since_last_scroll(event.timestamp_ms)
            .is_some_and(|elapsed| elapsed <= CONTENT_CHANGED_COOLDOWN_MS)
        {
            log::debug!("Content change within cooldown, ignored");
            return;
        }

        session.count_scroll(event.timestamp_ms);
        let distance = swipe_distance_meters(&policy, &self.metrics);
        log::debug!("Content change counted as scroll: {} {:.3}m", session.package, distance);
        self.sink.record_scroll(&session.package, distance);
    }

    fn handle_touch_start(&mut self, event: &UiEvent) {
        let Some(session) = active_session(&self.tracked_apps, &mut self.state, event) else {
            return;
        };
        let policy = policy_for(&session.package);
        if !policy.high_priority {
            return;
        }
        if session
            .since_last_scroll(event.timestamp_ms)
            .is_some_and(|elapsed| elapsed <= TOUCH_START_COOLDOWN_MS)
        {
            log::debug!("Touch within cooldown, ignored");
            return;
        }
        // A touch may just as well be a tap
        if !scan_for_scrollable(&self.inspector) {
            log::debug!("Touch in {} not counted: no scrollable node", session.package);
            return;
        }

        session.count_scroll(event.timestamp_ms);
        let distance = swipe_distance_meters(&policy, &self.metrics);
        log::debug!("Touch counted as scroll: {} {:.3}m", session.package, distance);
        self.sink.record_scroll(&session.package, distance);
    }
}

/// The open session, if `event` comes from the tracked app that owns it.
fn active_session<'a>(
    tracked_apps: &BTreeSet<String>,
    state: &'a mut SessionState,
    event: &UiEvent,
) -> Option<&'a mut Session> {
    let package = event.package()?;
    if !tracked_apps.contains(package) {
        return None;
    }
    match state {
        SessionState::Tracking(session) if session.package == package => Some(session),
        _ => None,
    }
}

fn scan_for_scrollable<W: WindowInspector>(inspector: &W) -> bool {
    match inspector.active_window_has_scrollable() {
        Ok(found) => found,
        Err(e) => {
            log::error!("Failed to inspect active window: {}", e);
            false
        }
    }
}

/// Pixel delta of a scroll-position event: explicit deltas first, then the
/// change against the last known non-zero offsets, then a nominal (1, 1)
/// when the event carries no position at all.
fn scroll_delta(session: &Session, event: &UiEvent) -> (i64, i64) {
    let explicit = (
        event.scroll_delta_x.map_or(0, |d| (d as i64).abs()),
        event.scroll_delta_y.map_or(0, |d| (d as i64).abs()),
    );
    if explicit != (0, 0) {
        return explicit;
    }

    let offset_change = |last: i32, current: i32| -> i64 {
        if last != 0 && current >= 0 {
            (current as i64 - last as i64).abs()
        } else {
            0
        }
    };
    let dx = offset_change(session.last_scroll_x, event.scroll_x);
    let dy = offset_change(session.last_scroll_y, event.scroll_y);
    if dx == 0 && dy == 0 && event.scroll_x <= 0 && event.scroll_y <= 0 {
        return (1, 1);
    }
    (dx, dy)
}

/// Applies debounce and thresholds; on recognition updates the session and
/// returns the distance in meters.
fn recognize_scroll(session: &mut Session, event: &UiEvent, metrics: &DisplayMetrics) -> Option<f64> {
    let policy = policy_for(&session.package);
    let at = event.timestamp_ms;
    if let Some(elapsed) = session.since_last_scroll(at) {
        if elapsed < policy.scroll_debounce_ms {
            log::debug!(
                "Scroll debounced: {} elapsed={}ms threshold={}ms",
                session.package,
                elapsed,
                policy.scroll_debounce_ms
            );
            return None;
        }
    }

    let (dx, dy) = scroll_delta(session, event);
    let magnitude = (dx as f64).hypot(dy as f64);
    let first_move = (session.last_scroll_y == 0 && event.scroll_y > 0)
        || (session.last_scroll_x == 0 && event.scroll_x > 0);
    if magnitude < policy.min_scroll_delta_px && !first_move {
        log::debug!("Scroll too small: dx={} dy={}", dx, dy);
        return None;
    }

    session.count_scroll(at);
    if event.scroll_x >= 0 {
        session.last_scroll_x = event.scroll_x;
    }
    if event.scroll_y >= 0 {
        session.last_scroll_y = event.scroll_y;
    }

    let pixels = magnitude.round() as i64;
    let distance = if pixels > 0 {
        pixels_to_meters(pixels, metrics)
    } else {
        NOMINAL_SCROLL_METERS
    };
    log::debug!(
        "Scroll counted: {} dx={} dy={} pixels={} distance={:.4}m",
        session.package,
        dx,
        dy,
        pixels,
        distance
    );
    Some(distance)
}
