use crate::models::settings::{INSTAGRAM, YOUTUBE};
use crate::util::conversion::{pixels_to_meters, DisplayMetrics};

/// Content-changed events count only this long after the last recognized scroll.
pub const CONTENT_CHANGED_COOLDOWN_MS: i64 = 300;
/// Touch-start events count only this long after the last recognized scroll.
pub const TOUCH_START_COOLDOWN_MS: i64 = 200;

/// Distance credited for a scroll event whose pixel delta rounds to zero.
pub const NOMINAL_SCROLL_METERS: f64 = 0.05;
/// Swipe distance for the high-priority app when the screen height is unknown.
pub const FALLBACK_SWIPE_METERS: f64 = 0.2;
/// Swipe distance for a gesture in any other app.
pub const DEFAULT_GESTURE_METERS: f64 = 0.1;

/// Classification thresholds for one app.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AppPolicy {
    /// Minimum spacing between recognized scroll-position events.
    pub scroll_debounce_ms: i64,
    /// Minimum time after the last recognized scroll before a gesture counts.
    pub gesture_debounce_ms: i64,
    pub min_scroll_delta_px: f64,
    /// Emits no scroll positions at all, so gestures, content changes and
    /// touches stand in for scrolls.
    pub high_priority: bool,
}

pub fn policy_for(package: &str) -> AppPolicy {
    match package {
        YOUTUBE => AppPolicy {
            scroll_debounce_ms: 100,
            gesture_debounce_ms: 200,
            min_scroll_delta_px: 1.0,
            high_priority: true,
        },
        INSTAGRAM => AppPolicy {
            scroll_debounce_ms: 50,
            gesture_debounce_ms: 150,
            min_scroll_delta_px: 1.0,
            high_priority: false,
        },
        _ => AppPolicy {
            scroll_debounce_ms: 50,
            gesture_debounce_ms: 150,
            min_scroll_delta_px: 1.0,
            high_priority: false,
        },
    }
}

/// Estimated distance of a swipe that carried no pixel delta.
pub fn swipe_distance_meters(policy: &AppPolicy, metrics: &DisplayMetrics) -> f64 {
    if !policy.high_priority {
        return DEFAULT_GESTURE_METERS;
    }
    if metrics.height_pixels == 0 {
        return FALLBACK_SWIPE_METERS;
    }
    // An average swipe covers about a third of the screen
    pixels_to_meters(metrics.height_pixels as i64 / 3, metrics)
}
