pub mod settings;
pub mod usage;

pub use settings::{app_display_name, DisplayMode, UserSettings};
pub use usage::{AppUsageData, DailyUsageData, UsageDelta, UsageKey};
