use anyhow::Result;
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tokio::sync::watch;

use crate::database::connection::Database;
use crate::models::{AppUsageData, DailyUsageData, DisplayMode, UsageDelta, UsageKey, UserSettings};
use crate::models::settings::default_tracked_apps;
use crate::usage_stats::{UsageEventSource, UsageStatsReader};
use crate::util::day::{day_start_millis, today, trailing_days};

const NICKNAME_KEY: &str = "nickname";
const SELECTED_APPS_KEY: &str = "selected_apps";
const CURRENT_MODE_KEY: &str = "current_mode";
const IS_FIRST_LAUNCH_KEY: &str = "is_first_launch";
const CURRENT_TRACKING_APP_KEY: &str = "current_tracking_app";

/// Settings and per-day counters, with watch channels republished on every write.
pub struct UsageStore {
    database: Database,
    settings_tx: watch::Sender<UserSettings>,
    today_tx: watch::Sender<DailyUsageData>,
    tracking_app_tx: watch::Sender<Option<String>>,
}

impl UsageStore {
    pub async fn open(database: Database) -> Result<Self> {
        database.create_table().await?;
        let settings = load_settings(&database).await?;
        let today_usage = read_day(&database, today(), &settings.selected_apps).await?;
        let tracking_app = load_tracking_app(&database).await?;
        Ok(Self {
            database,
            settings_tx: watch::Sender::new(settings),
            today_tx: watch::Sender::new(today_usage),
            tracking_app_tx: watch::Sender::new(tracking_app),
        })
    }

    pub fn subscribe_settings(&self) -> watch::Receiver<UserSettings> {
        self.settings_tx.subscribe()
    }

    pub fn subscribe_today(&self) -> watch::Receiver<DailyUsageData> {
        self.today_tx.subscribe()
    }

    pub fn subscribe_tracking_app(&self) -> watch::Receiver<Option<String>> {
        self.tracking_app_tx.subscribe()
    }

    /// Latest published settings.
    pub fn settings(&self) -> UserSettings {
        self.settings_tx.borrow().clone()
    }

    pub fn selected_apps(&self) -> BTreeSet<String> {
        self.settings_tx.borrow().selected_apps.clone()
    }

    /// Re-reads everything from disk, picking up writes made by other processes.
    pub async fn reload(&self) -> Result<()> {
        let settings = load_settings(&self.database).await?;
        let tracking_app = load_tracking_app(&self.database).await?;
        self.settings_tx.send_if_modified(|current| replace_if_changed(current, settings));
        self.tracking_app_tx.send_if_modified(|current| replace_if_changed(current, tracking_app));
        self.publish_today().await
    }

    pub async fn close(&self) {
        self.database.close().await;
    }

    pub async fn update_nickname(&self, nickname: &str) -> Result<()> {
        self.database.put_setting(NICKNAME_KEY, nickname).await?;
        self.settings_tx.send_modify(|s| s.nickname = nickname.to_string());
        Ok(())
    }

    pub async fn update_selected_apps(&self, apps: &BTreeSet<String>) -> Result<()> {
        self.database
            .put_setting(SELECTED_APPS_KEY, &serde_json::to_string(apps)?)
            .await?;
        self.settings_tx.send_modify(|s| s.selected_apps = apps.clone());
        self.publish_today().await
    }

    pub async fn update_display_mode(&self, mode: DisplayMode) -> Result<()> {
        self.database.put_setting(CURRENT_MODE_KEY, mode.as_str()).await?;
        self.settings_tx.send_modify(|s| s.current_mode = mode);
        Ok(())
    }

    pub async fn set_first_launch_complete(&self) -> Result<()> {
        self.database.put_setting(IS_FIRST_LAUNCH_KEY, "false").await?;
        self.settings_tx.send_modify(|s| s.is_first_launch = false);
        Ok(())
    }

    pub async fn set_current_tracking_app(&self, package: Option<&str>) -> Result<()> {
        self.database
            .put_setting(CURRENT_TRACKING_APP_KEY, package.unwrap_or(""))
            .await?;
        self.tracking_app_tx.send_replace(package.map(str::to_string));
        Ok(())
    }

    pub async fn current_tracking_app(&self) -> Result<Option<String>> {
        load_tracking_app(&self.database).await
    }

    pub async fn add_scroll_count(&self, count: i64) -> Result<()> {
        self.increment_on(today(), None, UsageDelta::scrolls(count)).await
    }

    pub async fn add_scroll_distance(&self, distance_meters: f64) -> Result<()> {
        self.increment_on(today(), None, UsageDelta::distance(distance_meters)).await
    }

    pub async fn add_usage_time(&self, time_millis: i64) -> Result<()> {
        self.increment_on(today(), None, UsageDelta::usage(time_millis)).await
    }

    pub async fn add_app_usage_time(&self, package: &str, time_millis: i64) -> Result<()> {
        self.increment_on(today(), Some(package), UsageDelta::usage(time_millis)).await
    }

    pub async fn add_app_scroll_count(&self, package: &str, count: i64) -> Result<()> {
        self.increment_on(today(), Some(package), UsageDelta::scrolls(count)).await
    }

    pub async fn increment_on(&self, date: NaiveDate, package: Option<&str>, delta: UsageDelta) -> Result<()> {
        let day = day_start_millis(date);
        let key = match package {
            Some(p) => UsageKey::app(day, p),
            None => UsageKey::day(day),
        };
        self.database.increment(&key, delta).await?;
        self.publish_today().await
    }

    /// One recognized scroll: distance and count on the day row plus the
    /// app's count, committed together and published once.
    pub async fn record_scroll(&self, package: &str, distance_meters: f64) -> Result<()> {
        let day = day_start_millis(today());
        let day_delta = UsageDelta {
            scroll_count: 1,
            ..UsageDelta::distance(distance_meters)
        };
        self.database
            .increment_all(&[
                (UsageKey::day(day), day_delta),
                (UsageKey::app(day, package), UsageDelta::scrolls(1)),
            ])
            .await?;
        self.publish_today().await
    }

    /// Flushed session time, added to the day total and the app together.
    pub async fn record_usage(&self, package: &str, elapsed_millis: i64) -> Result<()> {
        let day = day_start_millis(today());
        let delta = UsageDelta::usage(elapsed_millis);
        self.database
            .increment_all(&[(UsageKey::day(day), delta), (UsageKey::app(day, package), delta)])
            .await?;
        self.publish_today().await
    }

    pub async fn today_usage(&self) -> Result<DailyUsageData> {
        self.daily_usage(today()).await
    }

    /// Stored aggregates for `date`; a day without any writes reads as zeros.
    pub async fn daily_usage(&self, date: NaiveDate) -> Result<DailyUsageData> {
        read_day(&self.database, date, &self.selected_apps()).await
    }

    /// The last `days` days (oldest first) ending today. Days are probed one
    /// key at a time. When the reader has usage-stats for a day, its per-app
    /// times replace the locally accumulated ones and the day total becomes
    /// their sum.
    pub async fn daily_usage_history<S: UsageEventSource>(
        &self,
        days: u32,
        reader: &UsageStatsReader<S>,
    ) -> Result<Vec<DailyUsageData>> {
        let selected_apps = self.selected_apps();
        let last = today();
        let usage_stats = reader.app_usage_time_for_dates(&selected_apps, days, last);

        let mut history = Vec::with_capacity(days as usize);
        for date in trailing_days(last, days) {
            let mut data = read_day(&self.database, date, &selected_apps).await?;
            if let Some(day_stats) = usage_stats.get(&data.date) {
                merge_usage_stats(&mut data, day_stats);
            }
            history.push(data);
        }
        Ok(history)
    }

    async fn publish_today(&self) -> Result<()> {
        let data = read_day(&self.database, today(), &self.selected_apps()).await?;
        self.today_tx.send_if_modified(|current| replace_if_changed(current, data));
        Ok(())
    }
}

fn replace_if_changed<T: PartialEq>(current: &mut T, next: T) -> bool {
    if *current == next {
        false
    } else {
        *current = next;
        true
    }
}

fn merge_usage_stats(data: &mut DailyUsageData, day_stats: &HashMap<String, i64>) {
    for (package, usage) in data.app_usages.iter_mut() {
        if let Some(millis) = day_stats.get(package) {
            usage.usage_time_millis = *millis;
        }
    }
    if !day_stats.is_empty() {
        data.total_usage_time_millis = day_stats.values().sum();
    }
}

async fn read_day(database: &Database, date: NaiveDate, apps: &BTreeSet<String>) -> Result<DailyUsageData> {
    let day = day_start_millis(date);
    let totals = database.get_usage(&UsageKey::day(day)).await?;
    let mut app_usages = BTreeMap::new();
    for package in apps {
        let usage = database.get_usage(&UsageKey::app(day, package)).await?;
        app_usages.insert(
            package.clone(),
            AppUsageData::new(package, usage.scroll_count, usage.usage_time_millis, day),
        );
    }
    Ok(DailyUsageData {
        date: day,
        total_scroll_count: totals.scroll_count,
        total_scroll_distance_meters: totals.scroll_distance_meters,
        total_usage_time_millis: totals.usage_time_millis,
        app_usages,
    })
}

async fn load_settings(database: &Database) -> Result<UserSettings> {
    let stored = database.get_all_settings().await?;
    let mut settings = UserSettings::default();

    if let Some(nickname) = stored.get(NICKNAME_KEY) {
        settings.nickname = nickname.clone();
    }
    if let Some(raw) = stored.get(SELECTED_APPS_KEY) {
        settings.selected_apps = match serde_json::from_str(raw) {
            Ok(apps) => apps,
            Err(e) => {
                log::warn!("Ignoring unreadable selected apps setting: {}", e);
                default_tracked_apps()
            }
        };
    }
    if let Some(raw) = stored.get(CURRENT_MODE_KEY) {
        match raw.parse::<DisplayMode>() {
            Ok(mode) => settings.current_mode = mode,
            Err(e) => log::warn!("Ignoring stored display mode: {}", e),
        }
    }
    if let Some(raw) = stored.get(IS_FIRST_LAUNCH_KEY) {
        settings.is_first_launch = raw != "false";
    }
    Ok(settings)
}

async fn load_tracking_app(database: &Database) -> Result<Option<String>> {
    Ok(database
        .get_setting(CURRENT_TRACKING_APP_KEY)
        .await?
        .filter(|p| !p.is_empty()))
}
