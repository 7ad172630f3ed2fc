use anyhow::Result;
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::Sqlite;
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use crate::models::{UsageDelta, UsageKey};

/// Key-value persistence: settings as string pairs, usage counters as rows
/// keyed by `(day, package)`.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self> {
        let in_memory = database_url.contains(":memory:");
        let mut options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5));
        if !in_memory {
            // Daemon and dashboard share the file from separate processes
            options = options.journal_mode(SqliteJournalMode::Wal);
        }

        // Every connection to :memory: opens its own database, so keep exactly one alive.
        let pool = SqlitePoolOptions::new()
            .max_connections(if in_memory { 1 } else { 4 })
            .min_connections(if in_memory { 1 } else { 0 })
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        Ok(Self { pool })
    }

    pub async fn create_table(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // package = '' holds the day-wide totals
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS daily_usage (
                day INTEGER NOT NULL,
                package TEXT NOT NULL DEFAULT '',
                scroll_count INTEGER NOT NULL DEFAULT 0,
                scroll_distance_meters REAL NOT NULL DEFAULT 0.0,
                usage_time_millis INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (day, package)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.0))
    }

    pub async fn get_all_settings(&self) -> Result<HashMap<String, String>> {
        let rows: Vec<(String, String)> = sqlx::query_as("SELECT key, value FROM settings")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().collect())
    }

    pub async fn put_setting(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO settings (key, value) VALUES (?, ?) ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Adds `delta` to the row at `key` in a single statement, creating the row if needed.
    pub async fn increment(&self, key: &UsageKey, delta: UsageDelta) -> Result<()> {
        increment_query(key, delta).execute(&self.pool).await?;
        Ok(())
    }

    /// Applies every increment in one transaction: all land or none do.
    pub async fn increment_all(&self, increments: &[(UsageKey, UsageDelta)]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for (key, delta) in increments {
            increment_query(key, *delta).execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Counters stored at `key`; a key never written reads as all zeros.
    pub async fn get_usage(&self, key: &UsageKey) -> Result<UsageDelta> {
        let row: Option<(i64, f64, i64)> = sqlx::query_as(
            "SELECT scroll_count, scroll_distance_meters, usage_time_millis FROM daily_usage WHERE day = ? AND package = ?",
        )
        .bind(key.day)
        .bind(key.package_column())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row
            .map(|(scroll_count, scroll_distance_meters, usage_time_millis)| UsageDelta {
                scroll_count,
                scroll_distance_meters,
                usage_time_millis,
            })
            .unwrap_or_default())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn increment_query(key: &UsageKey, delta: UsageDelta) -> Query<'_, Sqlite, SqliteArguments<'_>> {
    sqlx::query(
        r#"
        INSERT INTO daily_usage (day, package, scroll_count, scroll_distance_meters, usage_time_millis)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(day, package) DO UPDATE SET
            scroll_count = scroll_count + excluded.scroll_count,
            scroll_distance_meters = scroll_distance_meters + excluded.scroll_distance_meters,
            usage_time_millis = usage_time_millis + excluded.usage_time_millis
        "#,
    )
    .bind(key.day)
    .bind(key.package_column())
    .bind(delta.scroll_count)
    .bind(delta.scroll_distance_meters)
    .bind(delta.usage_time_millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_db() -> Database {
        let db = Database::new("sqlite::memory:").await.unwrap();
        db.create_table().await.unwrap();
        db
    }

    #[tokio::test]
    async fn test_unwritten_key_reads_zero() {
        let db = memory_db().await;
        let usage = db.get_usage(&UsageKey::day(42)).await.unwrap();
        assert_eq!(usage, UsageDelta::default());
    }

    #[tokio::test]
    async fn test_increment_accumulates_per_key() {
        let db = memory_db().await;
        let day = UsageKey::day(1_000);
        let app = UsageKey::app(1_000, "com.instagram.android");

        db.increment(&day, UsageDelta::distance(0.5)).await.unwrap();
        db.increment(&day, UsageDelta::scrolls(2)).await.unwrap();
        db.increment(&app, UsageDelta::usage(700)).await.unwrap();
        db.increment(&app, UsageDelta::usage(300)).await.unwrap();

        let totals = db.get_usage(&day).await.unwrap();
        assert_eq!(totals.scroll_count, 2);
        assert!((totals.scroll_distance_meters - 0.5).abs() < 1e-12);
        assert_eq!(totals.usage_time_millis, 0);

        let per_app = db.get_usage(&app).await.unwrap();
        assert_eq!(per_app.usage_time_millis, 1_000);
        assert_eq!(db.get_usage(&UsageKey::app(2_000, "com.instagram.android")).await.unwrap(), UsageDelta::default());
    }

    #[tokio::test]
    async fn test_increment_all_is_all_or_nothing() {
        let db = memory_db().await;
        sqlx::query(
            "CREATE TRIGGER reject_package BEFORE INSERT ON daily_usage \
             WHEN NEW.package = 'rejected' BEGIN SELECT RAISE(ABORT, 'rejected'); END",
        )
        .execute(&db.pool)
        .await
        .unwrap();

        let day = UsageKey::day(1_000);
        let failing = [
            (day.clone(), UsageDelta::distance(0.5)),
            (day.clone(), UsageDelta::scrolls(1)),
            (UsageKey::app(1_000, "rejected"), UsageDelta::scrolls(1)),
        ];
        assert!(db.increment_all(&failing).await.is_err());
        assert_eq!(db.get_usage(&day).await.unwrap(), UsageDelta::default());

        let app = UsageKey::app(1_000, "com.instagram.android");
        db.increment_all(&[(day.clone(), UsageDelta::distance(0.5)), (app.clone(), UsageDelta::scrolls(1))])
            .await
            .unwrap();
        assert!((db.get_usage(&day).await.unwrap().scroll_distance_meters - 0.5).abs() < 1e-12);
        assert_eq!(db.get_usage(&app).await.unwrap().scroll_count, 1);
    }

    #[tokio::test]
    async fn test_settings_upsert() {
        let db = memory_db().await;
        assert_eq!(db.get_setting("nickname").await.unwrap(), None);
        db.put_setting("nickname", "first").await.unwrap();
        db.put_setting("nickname", "second").await.unwrap();
        assert_eq!(db.get_setting("nickname").await.unwrap().as_deref(), Some("second"));
        assert_eq!(db.get_all_settings().await.unwrap().len(), 1);
    }
}
