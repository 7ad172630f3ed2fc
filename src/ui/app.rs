use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use rand::rngs::StdRng;
use rand::SeedableRng;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;

use crate::database::store::UsageStore;
use crate::models::{DailyUsageData, UserSettings};
use crate::ui::view_state::{HomeViewState, StatsViewState};
use crate::usage_stats::{UsageEventSource, UsageStatsReader};
use crate::util::conversion::random_fact;

const DATA_REFRESH_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Home,
    History,
    Ranking,
}

impl Tab {
    pub const ALL: [Tab; 3] = [Tab::Home, Tab::History, Tab::Ranking];

    pub fn next(self) -> Self {
        match self {
            Tab::Home => Tab::History,
            Tab::History => Tab::Ranking,
            Tab::Ranking => Tab::Home,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Tab::Home => "Home",
            Tab::History => "History",
            Tab::Ranking => "Ranking",
        }
    }

    pub fn index(self) -> usize {
        match self {
            Tab::Home => 0,
            Tab::History => 1,
            Tab::Ranking => 2,
        }
    }
}

pub struct App<S> {
    store: Arc<UsageStore>,
    reader: UsageStatsReader<S>,
    history_days: u32,
    settings_rx: watch::Receiver<UserSettings>,
    today_rx: watch::Receiver<DailyUsageData>,
    tracking_rx: watch::Receiver<Option<String>>,
    rng: StdRng,
    fact: &'static str,
    pub tab: Tab,
    pub home: HomeViewState,
    pub stats: StatsViewState,
    pub permission_granted: bool,
}

impl<S: UsageEventSource> App<S> {
    pub fn new(store: Arc<UsageStore>, reader: UsageStatsReader<S>, history_days: u32) -> Self {
        Self::with_rng(store, reader, history_days, StdRng::from_entropy())
    }

    pub fn with_rng(store: Arc<UsageStore>, reader: UsageStatsReader<S>, history_days: u32, mut rng: StdRng) -> Self {
        let mut settings_rx = store.subscribe_settings();
        let mut today_rx = store.subscribe_today();
        let mut tracking_rx = store.subscribe_tracking_app();
        let settings = settings_rx.borrow_and_update().clone();
        let fact = random_fact(settings.current_mode, &mut rng);
        let home = HomeViewState::derive(
            &settings,
            &today_rx.borrow_and_update(),
            tracking_rx.borrow_and_update().as_deref(),
            fact,
        );
        let permission_granted = reader.is_permission_granted();
        Self {
            store,
            reader,
            history_days,
            settings_rx,
            today_rx,
            tracking_rx,
            rng,
            fact,
            tab: Tab::Home,
            home,
            stats: StatsViewState::default(),
            permission_granted,
        }
    }

    /// Rebuilds the home view from the latest published values. A new fact
    /// is drawn whenever any of them changed.
    pub fn update_home(&mut self) {
        let changed = self.settings_rx.has_changed().unwrap_or(false)
            || self.today_rx.has_changed().unwrap_or(false)
            || self.tracking_rx.has_changed().unwrap_or(false);
        let settings = self.settings_rx.borrow_and_update().clone();
        if changed {
            self.fact = random_fact(settings.current_mode, &mut self.rng);
        }
        self.home = HomeViewState::derive(
            &settings,
            &self.today_rx.borrow_and_update(),
            self.tracking_rx.borrow_and_update().as_deref(),
            self.fact,
        );
    }

    /// Pulls in writes made by the daemon and reloads the history tab.
    pub async fn refresh(&mut self) -> Result<()> {
        self.store.reload().await?;
        let history = self.store.daily_usage_history(self.history_days, &self.reader).await?;
        self.stats = StatsViewState::derive(&history);
        self.permission_granted = self.reader.is_permission_granted();
        self.update_home();
        Ok(())
    }

    pub async fn toggle_mode(&mut self) -> Result<()> {
        let mode = self.home.display_mode.toggled();
        log::info!("Switching display mode to {}", mode);
        self.store.update_display_mode(mode).await?;
        self.update_home();
        Ok(())
    }

    pub fn reroll_fact(&mut self) {
        self.fact = random_fact(self.home.display_mode, &mut self.rng);
        self.home.fact = self.fact.to_string();
    }

    pub async fn run(&mut self) -> Result<()> {
        log::info!("Starting UI...");

        let shutdown_flag = Arc::new(AtomicBool::new(false));
        signal_hook::flag::register(signal_hook::consts::SIGTERM, Arc::clone(&shutdown_flag))?;
        signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&shutdown_flag))?;

        if let Err(e) = self.refresh().await {
            log::warn!("Initial data load failed: {}", e);
        }

        if let Err(e) = enable_raw_mode() {
            eprintln!("Failed to enable raw mode: {}. A real terminal is required to show the dashboard.", e);
            return Err(anyhow::anyhow!("Terminal raw mode not supported: {}", e));
        }
        let mut stdout = io::stdout();
        if let Err(e) = execute!(stdout, EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(anyhow::anyhow!("Failed to setup terminal: {}", e));
        }
        let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

        let result = self.event_loop(&mut terminal, &shutdown_flag).await;

        if let Err(e) = disable_raw_mode() {
            log::warn!("Failed to disable raw mode: {}", e);
        }
        if let Err(e) = execute!(terminal.backend_mut(), LeaveAlternateScreen) {
            log::warn!("Failed to leave alternate screen: {}", e);
        }
        result
    }

    async fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
        shutdown_flag: &AtomicBool,
    ) -> Result<()> {
        let mut last_data_refresh = Instant::now();

        loop {
            terminal.draw(|f| crate::ui::render::draw(self, f))?;

            if shutdown_flag.load(Ordering::Relaxed) {
                log::info!("Received shutdown signal, exiting...");
                return Ok(());
            }

            if last_data_refresh.elapsed() >= DATA_REFRESH_INTERVAL {
                if let Err(e) = self.refresh().await {
                    log::warn!("Dashboard refresh failed: {}", e);
                }
                last_data_refresh = Instant::now();
                log::debug!("Dashboard data refreshed");
            }

            if !event::poll(Duration::from_millis(100))? {
                continue;
            }
            let Event::Key(key) = event::read()? else { continue };
            if key.kind != KeyEventKind::Press {
                continue;
            }
            log::debug!("Key pressed: {:?} on tab {:?}", key.code, self.tab);
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                KeyCode::Tab => self.tab = self.tab.next(),
                KeyCode::Char('m') => {
                    if let Err(e) = self.toggle_mode().await {
                        log::error!("Failed to change display mode: {}", e);
                    }
                }
                KeyCode::Char('f') => self.reroll_fact(),
                KeyCode::Char('r') => {
                    if let Err(e) = self.refresh().await {
                        log::warn!("Dashboard refresh failed: {}", e);
                    }
                    last_data_refresh = Instant::now();
                }
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::connection::Database;
    use crate::models::DisplayMode;
    use crate::models::settings::INSTAGRAM;
    use crate::usage_stats::NoUsageAccess;

    async fn app() -> App<NoUsageAccess> {
        let db = Database::new("sqlite::memory:").await.unwrap();
        let store = Arc::new(UsageStore::open(db).await.unwrap());
        App::with_rng(store, UsageStatsReader::new(NoUsageAccess), 7, StdRng::seed_from_u64(7))
    }

    #[test]
    fn test_tabs_cycle() {
        assert_eq!(Tab::Home.next().next().next(), Tab::Home);
        for (i, tab) in Tab::ALL.iter().enumerate() {
            assert_eq!(tab.index(), i);
        }
    }

    #[tokio::test]
    async fn test_home_tracks_store_writes() {
        let mut app = app().await;
        assert_eq!(app.home.scroll_count, 0);

        app.store.add_scroll_count(3).await.unwrap();
        app.store.add_scroll_distance(12.0).await.unwrap();
        app.store.set_current_tracking_app(Some(INSTAGRAM)).await.unwrap();
        app.update_home();

        assert_eq!(app.home.scroll_count, 3);
        assert_eq!(app.home.message, "Today you scrolled 12.0m!");
        assert_eq!(app.home.current_tracking_app.as_deref(), Some("Instagram"));
    }

    #[tokio::test]
    async fn test_toggle_mode_persists_and_refresh_loads_history() {
        let mut app = app().await;
        app.toggle_mode().await.unwrap();
        assert_eq!(app.home.display_mode, DisplayMode::ToiletPaper);
        assert_eq!(app.store.settings().current_mode, DisplayMode::ToiletPaper);
        assert!(app.home.message.starts_with("Toilet paper wasted today"));

        app.store.add_scroll_distance(300.0).await.unwrap();
        app.refresh().await.unwrap();
        assert_eq!(app.stats.chart.len(), 7);
        assert_eq!(app.stats.chart_max_meters, 500.0);
        assert!(!app.permission_granted);
    }
}
