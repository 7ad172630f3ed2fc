use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

pub const YOUTUBE: &str = "com.google.android.youtube";
pub const INSTAGRAM: &str = "com.instagram.android";
pub const TIKTOK: &str = "com.zhiliaoapp.musically";
pub const TIKTOK_GLOBAL: &str = "com.ss.android.ugc.trill";

pub const DEFAULT_TRACKED_APPS: [&str; 3] = [YOUTUBE, INSTAGRAM, TIKTOK];

/// How accumulated scroll distance is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DisplayMode {
    #[default]
    Climbing,
    ToiletPaper,
}

impl DisplayMode {
    /// Name persisted in the settings table.
    pub fn as_str(&self) -> &'static str {
        match self {
            DisplayMode::Climbing => "CLIMBING",
            DisplayMode::ToiletPaper => "TOILET_PAPER",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            DisplayMode::Climbing => DisplayMode::ToiletPaper,
            DisplayMode::ToiletPaper => DisplayMode::Climbing,
        }
    }
}

impl fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DisplayMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "CLIMBING" => Ok(DisplayMode::Climbing),
            "TOILET_PAPER" => Ok(DisplayMode::ToiletPaper),
            other => Err(anyhow::anyhow!("Unknown display mode: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSettings {
    pub nickname: String,
    pub selected_apps: BTreeSet<String>,
    pub current_mode: DisplayMode,
    pub is_first_launch: bool,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            nickname: String::new(),
            selected_apps: default_tracked_apps(),
            current_mode: DisplayMode::Climbing,
            is_first_launch: true,
        }
    }
}

pub fn default_tracked_apps() -> BTreeSet<String> {
    DEFAULT_TRACKED_APPS.iter().map(|p| p.to_string()).collect()
}

/// Human-readable name for a package; unknown packages keep their identifier.
pub fn app_display_name(package_name: &str) -> &str {
    match package_name {
        YOUTUBE => "YouTube",
        INSTAGRAM => "Instagram",
        TIKTOK | TIKTOK_GLOBAL => "TikTok",
        other => other,
    }
}
