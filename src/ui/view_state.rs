use std::collections::BTreeMap;

use crate::models::{app_display_name, DailyUsageData, DisplayMode, UserSettings};
use crate::util::conversion::mode_message;

/// Days shown in the distance chart.
pub const CHART_DAYS: usize = 7;
pub const CHART_MAX_METERS: f64 = 10_000.0;
const CHART_STEP_METERS: f64 = 250.0;

/// Everything the home tab shows.
#[derive(Debug, Clone, PartialEq)]
pub struct HomeViewState {
    pub nickname: String,
    pub scroll_count: i64,
    pub scroll_distance_meters: f64,
    pub usage_time_millis: i64,
    pub display_mode: DisplayMode,
    pub message: String,
    pub fact: String,
    /// Display name of the app being tracked right now, if any.
    pub current_tracking_app: Option<String>,
}

impl HomeViewState {
    pub fn derive(
        settings: &UserSettings,
        today: &DailyUsageData,
        tracking_app: Option<&str>,
        fact: &str,
    ) -> Self {
        Self {
            nickname: settings.nickname.clone(),
            scroll_count: today.total_scroll_count,
            scroll_distance_meters: today.total_scroll_distance_meters,
            usage_time_millis: today.total_usage_time_millis,
            display_mode: settings.current_mode,
            message: mode_message(today.total_scroll_distance_meters, settings.current_mode),
            fact: fact.to_string(),
            current_tracking_app: tracking_app
                .filter(|p| !p.is_empty())
                .map(|p| app_display_name(p).to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartDay {
    pub date: i64,
    pub distance_meters: f64,
}

/// Statistics over the loaded history (oldest day first).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StatsViewState {
    pub total_scroll_count: i64,
    pub total_scroll_distance_meters: f64,
    /// Today's usage per app, keyed by display name.
    pub today_app_usage: BTreeMap<String, i64>,
    pub today_usage_millis: i64,
    pub chart: Vec<ChartDay>,
    pub chart_max_meters: f64,
}

impl StatsViewState {
    pub fn derive(history: &[DailyUsageData]) -> Self {
        let total_scroll_count = history.iter().map(|d| d.total_scroll_count).sum();
        let total_scroll_distance_meters = history.iter().map(|d| d.total_scroll_distance_meters).sum();

        let mut today_app_usage = BTreeMap::new();
        if let Some(today) = history.last() {
            for (package, usage) in &today.app_usages {
                *today_app_usage
                    .entry(app_display_name(package).to_string())
                    .or_insert(0) += usage.usage_time_millis;
            }
        }
        let today_usage_millis = today_app_usage.values().sum();

        let chart: Vec<ChartDay> = history
            .iter()
            .skip(history.len().saturating_sub(CHART_DAYS))
            .map(|d| ChartDay {
                date: d.date,
                distance_meters: d.total_scroll_distance_meters,
            })
            .collect();
        let max_distance = history
            .iter()
            .map(|d| d.total_scroll_distance_meters)
            .fold(0.0, f64::max);

        Self {
            total_scroll_count,
            total_scroll_distance_meters,
            today_app_usage,
            today_usage_millis,
            chart,
            chart_max_meters: chart_max_distance(max_distance),
        }
    }
}

/// Upper bound of the distance chart: whole 250 m steps, at least one step,
/// never more than [`CHART_MAX_METERS`].
pub fn chart_max_distance(max_distance_meters: f64) -> f64 {
    if max_distance_meters <= CHART_STEP_METERS {
        return CHART_STEP_METERS;
    }
    ((max_distance_meters / CHART_STEP_METERS).ceil() * CHART_STEP_METERS).min(CHART_MAX_METERS)
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankingEntry {
    pub rank: u32,
    pub nickname: &'static str,
    pub distance_meters: f64,
}

/// There is no ranking server; these numbers are for display only.
pub const MOCK_RANKING: [RankingEntry; 5] = [
    RankingEntry { rank: 1, nickname: "ThumbOlympian", distance_meters: 1204.5 },
    RankingEntry { rank: 2, nickname: "InfiniteFeed", distance_meters: 987.2 },
    RankingEntry { rank: 3, nickname: "ShortsSurfer", distance_meters: 811.0 },
    RankingEntry { rank: 4, nickname: "ReelRunner", distance_meters: 640.8 },
    RankingEntry { rank: 5, nickname: "JustOneMore", distance_meters: 402.3 },
];
