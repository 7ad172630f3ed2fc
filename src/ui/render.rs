use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::{Bar, BarChart, BarGroup, Block, Borders, List, ListItem, Paragraph, Tabs, Wrap};
use ratatui::Frame;

use crate::models::DisplayMode;
use crate::ui::app::{App, Tab};
use crate::ui::view_state::MOCK_RANKING;
use crate::util::conversion::{format_duration, toilet_paper_sheets};
use crate::util::day::date_of_millis;

pub fn draw<S>(app: &App<S>, f: &mut Frame) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(1), Constraint::Length(3)])
        .split(f.area());

    let titles: Vec<&str> = Tab::ALL.iter().map(|t| t.title()).collect();
    let tabs = Tabs::new(titles)
        .select(app.tab.index())
        .block(Block::default().borders(Borders::ALL).title("Life Waste Meter"))
        .highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));
    f.render_widget(tabs, chunks[0]);

    match app.tab {
        Tab::Home => draw_home(app, f, chunks[1]),
        Tab::History => draw_history(app, f, chunks[1]),
        Tab::Ranking => draw_ranking(app, f, chunks[1]),
    }

    let status = match &app.home.current_tracking_app {
        Some(name) => format!("Tracking: {} | [Tab] Switch | [m] Mode | [f] Fact | [q] Quit", name),
        None => "Not tracking | [Tab] Switch | [m] Mode | [f] Fact | [q] Quit".to_string(),
    };
    let status_widget = Paragraph::new(status).block(Block::default().borders(Borders::ALL).title("Status"));
    f.render_widget(status_widget, chunks[2]);
}

fn mode_label(mode: DisplayMode) -> &'static str {
    match mode {
        DisplayMode::Climbing => "🧗 Climbing",
        DisplayMode::ToiletPaper => "🧻 Toilet paper",
    }
}

pub fn draw_home<S>(app: &App<S>, f: &mut Frame, area: Rect) {
    let home = &app.home;
    let greeting = if home.nickname.is_empty() {
        "Today so far".to_string()
    } else {
        format!("{}, today so far", home.nickname)
    };

    let mut lines = vec![
        Line::from(greeting).style(Style::default().add_modifier(Modifier::BOLD)),
        Line::from(""),
        Line::from(format!("  Scrolls:   {}", home.scroll_count)),
        Line::from(format!("  Distance:  {:.1}m", home.scroll_distance_meters)),
        Line::from(format!("  Time:      {}", format_duration(home.usage_time_millis))),
        Line::from(format!("  Mode:      {}", mode_label(home.display_mode))),
        Line::from(""),
    ];
    lines.extend(
        home.message
            .lines()
            .map(|l| Line::from(l.to_string()).style(Style::default().fg(Color::Cyan))),
    );
    lines.push(Line::from(""));
    lines.push(Line::from(format!("💡 {}", home.fact)).style(Style::default().fg(Color::Gray)));

    let widget = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title("🏠 Home"));
    f.render_widget(widget, area);
}

pub fn draw_history<S>(app: &App<S>, f: &mut Frame, area: Rect) {
    let stats = &app.stats;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(5), Constraint::Min(8), Constraint::Length(7)])
        .split(area);

    let summary = vec![
        Line::from(format!("  Scrolls:  {}", stats.total_scroll_count)),
        Line::from(format!(
            "  Distance: {:.1}m ({} sheets of toilet paper)",
            stats.total_scroll_distance_meters,
            toilet_paper_sheets(stats.total_scroll_distance_meters)
        )),
        Line::from(format!("  Time today: {}", format_duration(stats.today_usage_millis))),
    ];
    f.render_widget(
        Paragraph::new(summary).block(Block::default().borders(Borders::ALL).title("📈 All Statistics")),
        chunks[0],
    );

    draw_distance_chart(app, f, chunks[1]);

    let mut app_items: Vec<ListItem> = stats
        .today_app_usage
        .iter()
        .map(|(name, millis)| ListItem::new(Line::from(format!("  {:<12} {}", name, format_duration(*millis)))))
        .collect();
    if !app.permission_granted {
        app_items.push(ListItem::new(
            Line::from("  Usage access not granted: showing locally tracked time")
                .style(Style::default().fg(Color::DarkGray)),
        ));
    }
    f.render_widget(
        List::new(app_items).block(Block::default().borders(Borders::ALL).title("⏱ Usage Time Per App (today)")),
        chunks[2],
    );
}

fn draw_distance_chart<S>(app: &App<S>, f: &mut Frame, area: Rect) {
    let stats = &app.stats;
    let title = format!("Daily Scroll Distance (scale: 0-{:.0}m)", stats.chart_max_meters);
    if stats.chart.is_empty() {
        let empty_msg = Paragraph::new("No data available yet. Start scrolling!")
            .block(Block::default().borders(Borders::ALL).title(title));
        f.render_widget(empty_msg, area);
        return;
    }

    let bar_width = if area.width < 60 { 5 } else { 7 };
    let bars: Vec<Bar> = stats
        .chart
        .iter()
        .map(|day| {
            let meters = day.distance_meters.min(stats.chart_max_meters);
            Bar::default()
                .value(meters.round() as u64)
                .label(Line::from(date_of_millis(day.date).format("%m/%d").to_string()))
                .text_value(format!("{:.0}m", day.distance_meters))
                .style(Style::default().fg(Color::Cyan))
                .value_style(Style::default().fg(Color::White))
        })
        .collect();

    let chart = BarChart::default()
        .block(Block::default().borders(Borders::ALL).title(title))
        .bar_width(bar_width)
        .bar_gap(1)
        .max(stats.chart_max_meters as u64)
        .data(BarGroup::default().bars(&bars));
    f.render_widget(chart, area);
}

pub fn draw_ranking<S>(app: &App<S>, f: &mut Frame, area: Rect) {
    let mut items: Vec<ListItem> = MOCK_RANKING
        .iter()
        .map(|entry| {
            ListItem::new(Line::from(format!(
                "  #{:<3} {:<16} {:>8.1}m",
                entry.rank, entry.nickname, entry.distance_meters
            )))
        })
        .collect();

    let me = if app.home.nickname.is_empty() { "You" } else { app.home.nickname.as_str() };
    items.push(ListItem::new(Line::from("")));
    items.push(
        ListItem::new(Line::from(format!(
            "  #-   {:<16} {:>8.1}m",
            me, app.home.scroll_distance_meters
        )))
        .style(Style::default().fg(Color::Yellow)),
    );

    f.render_widget(
        List::new(items).block(Block::default().borders(Borders::ALL).title("🏆 Ranking (sample data)")),
        area,
    );
}
