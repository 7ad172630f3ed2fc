use anyhow::{Context, Result};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::util::conversion::DisplayMetrics;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://life_waste_meter.db";
pub const DEFAULT_HISTORY_DAYS: u32 = 30;

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub database_url: String,
    pub debug_logs_enabled: bool,
    pub display: DisplayMetrics,
    /// JSON-lines log of app foreground/background transitions. Without it
    /// usage-stats access counts as not granted.
    pub usage_log_path: Option<PathBuf>,
    pub history_days: u32,
}

impl Settings {
    fn get_env_path() -> Result<PathBuf> {
        Ok(env::current_dir()
            .context("Cannot determine working directory")?
            .join(".env"))
    }

    pub fn new() -> Result<Self> {
        let env_path = Self::get_env_path()?;
        if !env_path.exists() {
            log::info!("No .env found. Writing defaults to {}", env_path.display());
            Self::generate_default_env(&env_path)?;
        }
        dotenvy::from_path(&env_path).ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds settings from any key lookup; unset or empty keys take defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let database_url = get("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());
        let debug_logs_enabled = parse_or(get("DEBUG_LOGS_ENABLED"), "DEBUG_LOGS_ENABLED", false)?;

        let defaults = DisplayMetrics::default();
        let display = DisplayMetrics {
            xdpi: parse_or(get("DISPLAY_XDPI"), "DISPLAY_XDPI", defaults.xdpi)?,
            ydpi: parse_or(get("DISPLAY_YDPI"), "DISPLAY_YDPI", defaults.ydpi)?,
            height_pixels: parse_or(get("SCREEN_HEIGHT_PX"), "SCREEN_HEIGHT_PX", defaults.height_pixels)?,
        };

        let history_days = parse_or(get("HISTORY_DAYS"), "HISTORY_DAYS", DEFAULT_HISTORY_DAYS)?;
        if history_days == 0 {
            anyhow::bail!("HISTORY_DAYS must be at least 1");
        }

        Ok(Self {
            database_url,
            debug_logs_enabled,
            display,
            usage_log_path: get("USAGE_LOG_PATH").map(PathBuf::from),
            history_days,
        })
    }

    fn generate_default_env(env_path: &Path) -> Result<()> {
        let env_content = format!(
            "# Auto-generated configuration for Life Waste Meter.\n\
             # Delete this file to regenerate the defaults on next run.\n\
             \n\
             DATABASE_URL={}\n\
             DEBUG_LOGS_ENABLED=false\n\
             \n\
             # Screen density and height of the observed device, used to\n\
             # turn scroll pixels into meters.\n\
             DISPLAY_XDPI=160\n\
             DISPLAY_YDPI=160\n\
             SCREEN_HEIGHT_PX=0\n\
             \n\
             # Foreground/background transition log (JSON lines).\n\
             USAGE_LOG_PATH=\n\
             HISTORY_DAYS={}\n",
            DEFAULT_DATABASE_URL, DEFAULT_HISTORY_DAYS
        );
        fs::write(env_path, env_content)
            .with_context(|| format!("Failed to write {}", env_path.display()))?;
        log::info!("✓ Generated default configuration in .env");
        Ok(())
    }
}

/// Reads `DEBUG_LOGS_ENABLED` straight from the environment, for use before
/// logging (and thus `Settings::new`) is set up.
pub fn debug_logs_enabled() -> bool {
    env::var("DEBUG_LOGS_ENABLED")
        .ok()
        .and_then(|v| v.trim().parse::<bool>().ok())
        .unwrap_or(false)
}

fn parse_or<T>(raw: Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw {
        Some(value) => value
            .parse()
            .with_context(|| format!("Invalid value for {}: {:?}", key, value)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_nothing_is_set() {
        let settings = Settings::from_lookup(lookup(&[])).unwrap();
        assert_eq!(settings.database_url, DEFAULT_DATABASE_URL);
        assert!(!settings.debug_logs_enabled);
        assert_eq!(settings.display, DisplayMetrics::default());
        assert_eq!(settings.usage_log_path, None);
        assert_eq!(settings.history_days, DEFAULT_HISTORY_DAYS);
    }

    #[test]
    fn test_values_are_parsed() {
        let settings = Settings::from_lookup(lookup(&[
            ("DATABASE_URL", "sqlite://other.db"),
            ("DEBUG_LOGS_ENABLED", "true"),
            ("DISPLAY_XDPI", "420.5"),
            ("DISPLAY_YDPI", " 440 "),
            ("SCREEN_HEIGHT_PX", "2400"),
            ("USAGE_LOG_PATH", "/tmp/usage.jsonl"),
            ("HISTORY_DAYS", "7"),
        ]))
        .unwrap();
        assert_eq!(settings.database_url, "sqlite://other.db");
        assert!(settings.debug_logs_enabled);
        assert_eq!(settings.display.xdpi, 420.5);
        assert_eq!(settings.display.ydpi, 440.0);
        assert_eq!(settings.display.height_pixels, 2400);
        assert_eq!(settings.usage_log_path, Some(PathBuf::from("/tmp/usage.jsonl")));
        assert_eq!(settings.history_days, 7);
    }

    #[test]
    fn test_empty_values_fall_back_to_defaults() {
        let settings = Settings::from_lookup(lookup(&[("USAGE_LOG_PATH", ""), ("DATABASE_URL", "  ")])).unwrap();
        assert_eq!(settings.usage_log_path, None);
        assert_eq!(settings.database_url, DEFAULT_DATABASE_URL);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let err = Settings::from_lookup(lookup(&[("SCREEN_HEIGHT_PX", "tall")])).unwrap_err();
        assert!(err.to_string().contains("SCREEN_HEIGHT_PX"));
        assert!(Settings::from_lookup(lookup(&[("HISTORY_DAYS", "0")])).is_err());
        assert!(Settings::from_lookup(lookup(&[("DEBUG_LOGS_ENABLED", "yes")])).is_err());
    }
}
