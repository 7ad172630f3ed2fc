use anyhow::Result;
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::usage_stats::source::{TransitionEvent, TransitionKind, UsageEventSource};
use crate::util::day::{day_window, trailing_days};

/// Per-app foreground durations computed from the host's transition log.
pub struct UsageStatsReader<S> {
    source: S,
}

impl<S: UsageEventSource> UsageStatsReader<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn is_permission_granted(&self) -> bool {
        self.source.is_permission_granted()
    }

    /// Foreground time per tracked app for one local calendar day.
    /// Returns an empty map when the usage permission is missing.
    pub fn app_usage_time_for_date(
        &self,
        packages: &BTreeSet<String>,
        date: NaiveDate,
    ) -> HashMap<String, i64> {
        if !self.source.is_permission_granted() {
            log::debug!("Usage access not granted, skipping usage stats for {}", date);
            return HashMap::new();
        }
        match self.usage_in_window(packages, day_window(date)) {
            Ok(usage) => usage,
            Err(e) => {
                log::warn!("Failed to query usage events for {}: {}", date, e);
                HashMap::new()
            }
        }
    }

    /// Same as [`Self::app_usage_time_for_date`] for the `days` days ending at
    /// `today`, keyed by each day's local-midnight millis. Each day is queried
    /// on its own.
    pub fn app_usage_time_for_dates(
        &self,
        packages: &BTreeSet<String>,
        days: u32,
        today: NaiveDate,
    ) -> BTreeMap<i64, HashMap<String, i64>> {
        let mut result = BTreeMap::new();
        if !self.source.is_permission_granted() {
            return result;
        }
        for date in trailing_days(today, days) {
            let window = day_window(date);
            match self.usage_in_window(packages, window) {
                Ok(usage) => {
                    result.insert(window.0, usage);
                }
                Err(e) => log::warn!("Failed to query usage events for {}: {}", date, e),
            }
        }
        result
    }

    fn usage_in_window(
        &self,
        packages: &BTreeSet<String>,
        (start, end): (i64, i64),
    ) -> Result<HashMap<String, i64>> {
        let events = self.source.query_events(start, end)?;
        Ok(foreground_durations(packages, &events, start, end))
    }
}

/// Pairs each foreground transition with the next background transition of
/// the same app and sums the overlap with `[window_start, window_end)`. An app
/// still in the foreground at the end is credited up to `window_end`.
pub fn foreground_durations(
    packages: &BTreeSet<String>,
    events: &[TransitionEvent],
    window_start: i64,
    window_end: i64,
) -> HashMap<String, i64> {
    let mut result: HashMap<String, i64> = packages.iter().map(|p| (p.clone(), 0)).collect();
    let mut foreground_since: HashMap<&str, i64> = HashMap::new();

    let overlap = |from: i64, to: i64| -> i64 {
        let start = from.max(window_start);
        let end = to.min(window_end);
        if start < end { end - start } else { 0 }
    };

    for event in events {
        if !packages.contains(&event.package) {
            continue;
        }
        match event.kind {
            TransitionKind::Foreground => {
                foreground_since.insert(event.package.as_str(), event.timestamp_ms);
            }
            TransitionKind::Background => {
                if let Some(since) = foreground_since.remove(event.package.as_str()) {
                    *result.entry(event.package.clone()).or_insert(0) += overlap(since, event.timestamp_ms);
                }
            }
        }
    }

    for (package, since) in foreground_since {
        *result.entry(package.to_string()).or_insert(0) += overlap(since, window_end);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usage_stats::source::{MemoryUsageLog, NoUsageAccess};
    use crate::util::day::day_start_millis;

    fn apps(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn fg(package: &str, at: i64) -> TransitionEvent {
        TransitionEvent { package: package.to_string(), kind: TransitionKind::Foreground, timestamp_ms: at }
    }

    fn bg(package: &str, at: i64) -> TransitionEvent {
        TransitionEvent { package: package.to_string(), kind: TransitionKind::Background, timestamp_ms: at }
    }

    #[test]
    fn test_pairs_foreground_with_next_background() {
        let events = vec![
            fg("a", 100),
            fg("b", 150),
            bg("a", 400),
            bg("b", 200),
            fg("a", 1000),
            bg("a", 1500),
            fg("ignored", 0),
            bg("ignored", 900),
        ];
        let usage = foreground_durations(&apps(&["a", "b", "c"]), &events, 0, 10_000);
        assert_eq!(usage["a"], 300 + 500);
        assert_eq!(usage["b"], 50);
        assert_eq!(usage["c"], 0);
        assert!(!usage.contains_key("ignored"));
    }

    #[test]
    fn test_open_interval_is_closed_at_window_end() {
        let events = vec![fg("a", 9_000)];
        let usage = foreground_durations(&apps(&["a"]), &events, 0, 10_000);
        assert_eq!(usage["a"], 1_000);
    }

    #[test]
    fn test_intervals_are_clipped_to_window() {
        let events = vec![fg("a", -500), bg("a", 500), bg("a", 700)];
        let usage = foreground_durations(&apps(&["a"]), &events, 0, 10_000);
        assert_eq!(usage["a"], 500);
    }

    #[test]
    fn test_missing_permission_yields_empty() {
        let reader = UsageStatsReader::new(NoUsageAccess);
        let date = NaiveDate::from_ymd_opt(2026, 5, 1).unwrap();
        assert!(reader.app_usage_time_for_date(&apps(&["a"]), date).is_empty());
        assert!(reader.app_usage_time_for_dates(&apps(&["a"]), 7, date).is_empty());
    }

    #[test]
    fn test_batch_variant_queries_each_day() {
        let today = NaiveDate::from_ymd_opt(2026, 5, 3).unwrap();
        let yesterday = NaiveDate::from_ymd_opt(2026, 5, 2).unwrap();
        let y_start = day_start_millis(yesterday);
        let t_start = day_start_millis(today);
        let log = MemoryUsageLog::new(vec![
            fg("a", y_start + 1_000),
            bg("a", y_start + 61_000),
            fg("a", t_start + 5_000),
            bg("a", t_start + 10_000),
        ]);
        let reader = UsageStatsReader::new(log);
        let by_day = reader.app_usage_time_for_dates(&apps(&["a"]), 3, today);
        assert_eq!(by_day.len(), 3);
        assert_eq!(by_day[&y_start]["a"], 60_000);
        assert_eq!(by_day[&t_start]["a"], 5_000);
        let first_day = *by_day.keys().next().unwrap();
        assert_eq!(by_day[&first_day]["a"], 0);
    }
}
