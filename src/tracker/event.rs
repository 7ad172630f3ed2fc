use serde::{Deserialize, Serialize};

use crate::tracker::inspector::UiNode;

/// Offset value the host reports when a view has no scroll position.
pub const UNKNOWN_OFFSET: i32 = -1;

fn unknown_offset() -> i32 {
    UNKNOWN_OFFSET
}

pub fn now_millis() -> i64 {
    chrono::Local::now().timestamp_millis()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UiEventKind {
    WindowStateChanged,
    ScrollPositionChanged,
    GestureStart,
    ContentChanged,
    TouchStart,
}

/// One accessibility event as delivered by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiEvent {
    #[serde(rename = "type")]
    pub kind: UiEventKind,
    #[serde(default)]
    pub package: Option<String>,
    pub timestamp_ms: i64,
    #[serde(default = "unknown_offset")]
    pub scroll_x: i32,
    #[serde(default = "unknown_offset")]
    pub scroll_y: i32,
    /// Only reported by newer hosts.
    #[serde(default)]
    pub scroll_delta_x: Option<i32>,
    #[serde(default)]
    pub scroll_delta_y: Option<i32>,
}

impl UiEvent {
    pub fn new(kind: UiEventKind, package: &str, timestamp_ms: i64) -> Self {
        Self {
            kind,
            package: Some(package.to_string()),
            timestamp_ms,
            scroll_x: UNKNOWN_OFFSET,
            scroll_y: UNKNOWN_OFFSET,
            scroll_delta_x: None,
            scroll_delta_y: None,
        }
    }

    pub fn window_state(package: &str, timestamp_ms: i64) -> Self {
        Self::new(UiEventKind::WindowStateChanged, package, timestamp_ms)
    }

    pub fn scrolled(package: &str, timestamp_ms: i64, scroll_x: i32, scroll_y: i32) -> Self {
        Self {
            scroll_x,
            scroll_y,
            ..Self::new(UiEventKind::ScrollPositionChanged, package, timestamp_ms)
        }
    }

    pub fn with_delta(mut self, delta_x: i32, delta_y: i32) -> Self {
        self.scroll_delta_x = Some(delta_x);
        self.scroll_delta_y = Some(delta_y);
        self
    }

    pub fn package(&self) -> Option<&str> {
        self.package.as_deref()
    }
}

/// Everything the host bridge can send to the observer, one JSON object per line:
/// `{"event": {...}}`, `{"active_window": {...}}`, `{"interrupt": {}}`, `{"shutdown": {}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostMessage {
    Event(UiEvent),
    /// Replaces the snapshot of the active window's node tree.
    ActiveWindow(Option<UiNode>),
    Interrupt {
        #[serde(default = "now_millis")]
        timestamp_ms: i64,
    },
    Shutdown {
        #[serde(default = "now_millis")]
        timestamp_ms: i64,
    },
}

impl HostMessage {
    pub fn parse_line(line: &str) -> serde_json::Result<Self> {
        serde_json::from_str(line)
    }
}
