use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::settings::app_display_name;

/// Per-app aggregate for one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppUsageData {
    pub package_name: String,
    pub app_name: String,
    pub scroll_count: i64,
    pub usage_time_millis: i64,
    pub date: i64, // local midnight, epoch millis
}

impl AppUsageData {
    pub fn new(package_name: &str, scroll_count: i64, usage_time_millis: i64, date: i64) -> Self {
        Self {
            package_name: package_name.to_string(),
            app_name: app_display_name(package_name).to_string(),
            scroll_count,
            usage_time_millis,
            date,
        }
    }
}

/// Day-wide aggregate. `date` is the local midnight of the day in epoch millis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyUsageData {
    pub date: i64,
    pub total_scroll_count: i64,
    pub total_scroll_distance_meters: f64,
    pub total_usage_time_millis: i64,
    pub app_usages: BTreeMap<String, AppUsageData>,
}

impl DailyUsageData {
    pub fn empty(date: i64) -> Self {
        Self {
            date,
            total_scroll_count: 0,
            total_scroll_distance_meters: 0.0,
            total_usage_time_millis: 0,
            app_usages: BTreeMap::new(),
        }
    }
}

/// Increment applied to one usage row.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct UsageDelta {
    pub scroll_count: i64,
    pub scroll_distance_meters: f64,
    pub usage_time_millis: i64,
}

impl UsageDelta {
    pub fn scrolls(count: i64) -> Self {
        Self { scroll_count: count, ..Default::default() }
    }

    pub fn distance(meters: f64) -> Self {
        Self { scroll_distance_meters: meters, ..Default::default() }
    }

    pub fn usage(millis: i64) -> Self {
        Self { usage_time_millis: millis, ..Default::default() }
    }
}

/// Composite storage key: a day, optionally narrowed to one app.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UsageKey {
    pub day: i64,
    pub package: Option<String>,
}

impl UsageKey {
    pub fn day(day: i64) -> Self {
        Self { day, package: None }
    }

    pub fn app(day: i64, package: &str) -> Self {
        Self { day, package: Some(package.to_string()) }
    }

    /// Column value for the package part; day-wide rows use the empty string.
    pub fn package_column(&self) -> &str {
        self.package.as_deref().unwrap_or("")
    }
}
