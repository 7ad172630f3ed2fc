use anyhow::Result;
use clap::{Arg, ArgAction, ArgMatches, Command};
use dotenvy::dotenv;
use std::sync::Arc;

use life_waste_meter::config::settings::debug_logs_enabled;
use life_waste_meter::config::{init_logging, Settings};
use life_waste_meter::database::{Database, UsageStore};
use life_waste_meter::models::DisplayMode;
use life_waste_meter::ui::App;
use life_waste_meter::usage_stats::{source_for, UsageStatsReader};
use life_waste_meter::util::conversion::{format_duration, mode_message};
use life_waste_meter::util::day::date_of_millis;

fn cli() -> Command {
    Command::new("Life Waste Meter")
        .version(env!("CARGO_PKG_VERSION"))
        .about("See how far your thumb scrolled today")
        .arg(
            Arg::new("history")
                .long("history")
                .value_name("DAYS")
                .num_args(0..=1)
                .default_missing_value("0")
                .value_parser(clap::value_parser!(u32))
                .help("Print daily totals for the last DAYS days (default: HISTORY_DAYS)"),
        )
        .arg(
            Arg::new("nickname")
                .long("nickname")
                .value_name("NAME")
                .help("Set the nickname shown on the dashboard"),
        )
        .arg(
            Arg::new("mode")
                .long("mode")
                .value_name("MODE")
                .value_parser(["climbing", "toilet-paper"])
                .help("Set how scroll distance is presented"),
        )
        .arg(
            Arg::new("track")
                .long("track")
                .value_name("PACKAGE")
                .action(ArgAction::Append)
                .help("Start tracking an app"),
        )
        .arg(
            Arg::new("untrack")
                .long("untrack")
                .value_name("PACKAGE")
                .action(ArgAction::Append)
                .help("Stop tracking an app"),
        )
        .arg(
            Arg::new("onboarded")
                .long("onboarded")
                .help("Mark first launch as complete")
                .action(ArgAction::SetTrue),
        )
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();

    dotenv().ok();
    let debug_enabled = debug_logs_enabled();
    init_logging("app.log", debug_enabled)?;

    log::info!("Starting Life Waste Meter");
    let settings = Settings::new()?;
    log::info!("Database URL: {}", settings.database_url);
    let database = match Database::new(&settings.database_url).await {
        Ok(db) => db,
        Err(e) => {
            if debug_enabled {
                log::error!("Database connection failed: {:?}", e);
            }
            eprintln!("❌ Failed to open the database. Please check DATABASE_URL in .env");
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    let store = Arc::new(UsageStore::open(database).await?);
    let reader = UsageStatsReader::new(source_for(settings.usage_log_path.as_deref()));

    let handled = apply_setting_flags(&store, &matches).await?;
    if let Some(days) = matches.get_one::<u32>("history") {
        let days = if *days == 0 { settings.history_days } else { *days };
        print_history(&store, &reader, days).await?;
        return Ok(());
    }
    if handled {
        return Ok(());
    }

    if store.settings().is_first_launch {
        println!("Welcome to Life Waste Meter!");
        println!("Pick a nickname with --nickname and choose apps with --track / --untrack.");
        store.set_first_launch_complete().await?;
    }

    let mut app = App::new(Arc::clone(&store), reader, settings.history_days);
    let result = app.run().await;
    store.close().await;
    result
}

/// Applies every settings flag given. Returns true if any was present.
async fn apply_setting_flags(store: &UsageStore, matches: &ArgMatches) -> Result<bool> {
    let mut handled = false;

    if let Some(nickname) = matches.get_one::<String>("nickname") {
        store.update_nickname(nickname.trim()).await?;
        println!("✓ Nickname set to {}", nickname.trim());
        handled = true;
    }
    if let Some(mode) = matches.get_one::<String>("mode") {
        let mode: DisplayMode = mode.parse()?;
        store.update_display_mode(mode).await?;
        println!("✓ Display mode set to {}", mode);
        handled = true;
    }

    let track: Vec<&String> = matches.get_many::<String>("track").map(|v| v.collect()).unwrap_or_default();
    let untrack: Vec<&String> = matches.get_many::<String>("untrack").map(|v| v.collect()).unwrap_or_default();
    if !track.is_empty() || !untrack.is_empty() {
        let mut apps = store.selected_apps();
        for package in track {
            apps.insert(package.clone());
        }
        for package in untrack {
            apps.remove(package);
        }
        store.update_selected_apps(&apps).await?;
        println!("✓ Tracking: {}", apps.iter().cloned().collect::<Vec<_>>().join(", "));
        handled = true;
    }

    if matches.get_flag("onboarded") {
        store.set_first_launch_complete().await?;
        println!("✓ First launch complete");
        handled = true;
    }
    Ok(handled)
}

async fn print_history<S>(store: &UsageStore, reader: &UsageStatsReader<S>, days: u32) -> Result<()>
where
    S: life_waste_meter::usage_stats::UsageEventSource,
{
    let history = store.daily_usage_history(days, reader).await?;
    let mode = store.settings().current_mode;
    if !reader.is_permission_granted() {
        println!("(usage access not granted, times are from local tracking)");
    }
    println!("{:<12} {:>8} {:>10} {:>10}", "Date", "Scrolls", "Distance", "Time");
    for day in &history {
        println!(
            "{:<12} {:>8} {:>9.1}m {:>10}",
            date_of_millis(day.date).format("%Y-%m-%d"),
            day.total_scroll_count,
            day.total_scroll_distance_meters,
            format_duration(day.total_usage_time_millis)
        );
    }
    let total: f64 = history.iter().map(|d| d.total_scroll_distance_meters).sum();
    println!();
    println!("{}", mode_message(total, mode));
    Ok(())
}
