use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::models::DisplayMode;

const METERS_PER_INCH: f64 = 0.0254;
pub const DEFAULT_DPI: f64 = 160.0;

pub const TOILET_PAPER_SHEET_METERS: f64 = 0.114;
pub const SHEETS_PER_TREE: f64 = 6480.0;

pub const EVEREST_HEIGHT_METERS: f64 = 8848.0;
pub const BUILDING_63_HEIGHT_METERS: f64 = 264.0;
pub const SEOUL_BUSAN_METERS: f64 = 325_000.0;

/// Screen properties used to turn pixels into physical length.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplayMetrics {
    pub xdpi: f64,
    pub ydpi: f64,
    pub height_pixels: u32,
}

impl Default for DisplayMetrics {
    fn default() -> Self {
        Self {
            xdpi: DEFAULT_DPI,
            ydpi: DEFAULT_DPI,
            height_pixels: 0,
        }
    }
}

impl DisplayMetrics {
    pub fn effective_dpi(&self) -> f64 {
        let dpi = (self.xdpi + self.ydpi) / 2.0;
        if dpi > 0.0 { dpi } else { DEFAULT_DPI }
    }
}

pub fn pixels_to_meters(pixels: i64, metrics: &DisplayMetrics) -> f64 {
    (pixels as f64 / metrics.effective_dpi()) * METERS_PER_INCH
}

pub fn toilet_paper_sheets(distance_meters: f64) -> i64 {
    (distance_meters / TOILET_PAPER_SHEET_METERS).floor() as i64
}

/// Milestone message for climbing mode. Everest and the 63 Building win over
/// the long-distance and kilometre lines, so those two never show up.
pub fn climbing_message(distance_meters: f64) -> String {
    let distance = distance_meters;
    if distance >= EVEREST_HEIGHT_METERS {
        let times = (distance / EVEREST_HEIGHT_METERS) as i64;
        format!("Today you scrolled the height of Mount Everest ({}x)!", times)
    } else if distance >= BUILDING_63_HEIGHT_METERS {
        let times = (distance / BUILDING_63_HEIGHT_METERS) as i64;
        format!("Today you scrolled the height of the 63 Building ({}x)!", times)
    } else if distance >= SEOUL_BUSAN_METERS {
        "Your thumb has walked all the way from Seoul to Busan!".to_string()
    } else if distance >= 1000.0 {
        format!("Today you scrolled {:.1}km!", distance / 1000.0)
    } else {
        format!("Today you scrolled {:.1}m!", distance)
    }
}

pub fn toilet_paper_message(distance_meters: f64) -> String {
    let sheets = toilet_paper_sheets(distance_meters);
    let trees = sheets as f64 / SHEETS_PER_TREE;
    if trees >= 1.0 {
        format!(
            "Toilet paper wasted today: {} sheets\n(that is about {:.1} trees gone)",
            sheets, trees
        )
    } else {
        format!("Toilet paper wasted today: {} sheets", sheets)
    }
}

pub fn mode_message(distance_meters: f64, mode: DisplayMode) -> String {
    match mode {
        DisplayMode::Climbing => climbing_message(distance_meters),
        DisplayMode::ToiletPaper => toilet_paper_message(distance_meters),
    }
}

const CLIMBING_FACTS: [&str; 4] = [
    "That is like going up and down stairs all day long.",
    "Your thumb got a full workout today.",
    "With this much scrolling you could have climbed a small mountain.",
    "Walk this distance and your daily exercise is covered.",
];

const TOILET_PAPER_FACTS: [&str; 4] = [
    "That much paper takes a small tree.",
    "If you care about the planet, today was plenty.",
    "You used a month of toilet paper in a single day.",
    "For the planet's sake, try scrolling a little less.",
];

pub fn random_fact<R: Rng + ?Sized>(mode: DisplayMode, rng: &mut R) -> &'static str {
    let pool: &[&'static str] = match mode {
        DisplayMode::Climbing => &CLIMBING_FACTS,
        DisplayMode::ToiletPaper => &TOILET_PAPER_FACTS,
    };
    pool.choose(rng).copied().unwrap_or_default()
}

pub fn format_duration(millis: i64) -> String {
    let total_seconds = millis.max(0) / 1000;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else {
        format!("{}m {}s", minutes, seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_pixels_to_meters_uses_average_dpi() {
        let metrics = DisplayMetrics { xdpi: 400.0, ydpi: 440.0, height_pixels: 2400 };
        let meters = pixels_to_meters(420, &metrics);
        assert!((meters - 0.0254).abs() < 1e-12);
    }

    #[test]
    fn test_pixels_to_meters_falls_back_to_default_dpi() {
        let broken = DisplayMetrics { xdpi: 0.0, ydpi: -3.0, height_pixels: 0 };
        assert_eq!(broken.effective_dpi(), DEFAULT_DPI);
        assert!((pixels_to_meters(160, &broken) - 0.0254).abs() < 1e-12);
    }

    #[test]
    fn test_toilet_paper_sheets_floor() {
        assert_eq!(toilet_paper_sheets(0.0), 0);
        assert_eq!(toilet_paper_sheets(0.113), 0);
        assert_eq!(toilet_paper_sheets(1.14), 10);
    }

    #[test]
    fn test_climbing_message_ladder() {
        assert_eq!(climbing_message(12.34), "Today you scrolled 12.3m!");
        assert_eq!(climbing_message(263.9), "Today you scrolled 263.9m!");
        assert!(climbing_message(600.0).contains("63 Building (2x)"));
        // 1km sits under the 63 Building threshold, so the building wins.
        assert!(climbing_message(1500.0).contains("63 Building (5x)"));
        assert!(climbing_message(20_000.0).contains("Mount Everest (2x)"));
        assert_eq!(
            climbing_message(400_000.0),
            "Today you scrolled the height of Mount Everest (45x)!"
        );
        assert!(!climbing_message(1_000_000.0).contains("Seoul to Busan"));
    }

    #[test]
    fn test_toilet_paper_message_trees() {
        assert_eq!(toilet_paper_message(1.14), "Toilet paper wasted today: 10 sheets");
        let long = toilet_paper_message(6480.0 * TOILET_PAPER_SHEET_METERS * 2.0 + 0.01);
        assert!(long.contains("2.0 trees"), "{}", long);
    }

    #[test]
    fn test_random_fact_is_deterministic_with_seed() {
        let mut a = StdRng::seed_from_u64(7);
        let mut b = StdRng::seed_from_u64(7);
        for _ in 0..5 {
            let fact = random_fact(DisplayMode::ToiletPaper, &mut a);
            assert_eq!(fact, random_fact(DisplayMode::ToiletPaper, &mut b));
            assert!(TOILET_PAPER_FACTS.contains(&fact));
        }
        let climbing = random_fact(DisplayMode::Climbing, &mut a);
        assert!(CLIMBING_FACTS.contains(&climbing));
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "0m 0s");
        assert_eq!(format_duration(61_500), "1m 1s");
        assert_eq!(format_duration(3_723_000), "1h 2m");
        assert_eq!(format_duration(-5), "0m 0s");
    }
}
