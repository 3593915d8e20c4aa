use anyhow::Result;
use chrono::Local;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use log::{debug, error, info};
use ratatui::{
    Frame, Terminal,
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Direction as LayoutDirection, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph, Sparkline},
};
use std::{collections::VecDeque, io, sync::Arc, time::Duration};
use tokio::sync::mpsc::UnboundedReceiver;

use kaipo_meter::collectors::TrafficReport;
use kaipo_meter::display::{ThroughputText, UnitMode, format_rate};
use kaipo_meter::monitor::{ChannelObserver, Level, MonitorEvent, ObserverRef, TrafficMonitor};
use kaipo_meter::settings::MonitorSettings;

/// Number of ticks kept for the sparklines
const HISTORY_LEN: usize = 50;

/// Real-time terminal dashboard driven by monitor events
pub struct Dashboard {
    monitor: TrafficMonitor,
    observer: ObserverRef,
    events: UnboundedReceiver<MonitorEvent>,
    text: ThroughputText,
    unit: UnitMode,
    level: Level,
    level_changes: u64,
    latest: Option<TrafficReport>,
    download_history: VecDeque<u64>,
    upload_history: VecDeque<u64>,
}

impl Dashboard {
    pub fn new(monitor: TrafficMonitor, settings: &MonitorSettings) -> Self {
        let (observer, events) = ChannelObserver::new();
        Self {
            monitor,
            observer: Arc::new(observer),
            events,
            text: ThroughputText::from_settings(settings),
            unit: settings.unit,
            level: Level::ZERO,
            level_changes: 0,
            latest: None,
            download_history: VecDeque::with_capacity(HISTORY_LEN),
            upload_history: VecDeque::with_capacity(HISTORY_LEN),
        }
    }

    /// Sets up the terminal, runs the UI loop and restores the terminal
    pub async fn run(&mut self) -> Result<()> {
        info!(
            "Starting live dashboard (interval={}ms)",
            self.monitor.interval().as_millis()
        );

        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        self.monitor.add_observer(self.observer.clone());
        let res = self.run_app(&mut terminal).await;
        self.monitor.remove_observer(&self.observer);

        debug!("Cleaning up terminal state");
        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        terminal.show_cursor()?;

        if let Err(err) = res {
            error!("Dashboard error: {err:?}");
            eprintln!("Error: {err:?}");
        } else {
            info!("Dashboard exited normally");
        }

        Ok(())
    }

    async fn run_app<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()>
    where
        B::Error: Send + Sync + 'static,
    {
        loop {
            self.drain_events();
            terminal.draw(|f| self.ui(f))?;

            if event::poll(Duration::from_millis(100))? {
                if let Event::Key(key) = event::read()? {
                    match key.code {
                        KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                        _ => {}
                    }
                }
            }
            tokio::task::yield_now().await;
        }
    }

    fn drain_events(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            self.apply(event);
        }
    }

    fn apply(&mut self, event: MonitorEvent) {
        match event {
            MonitorEvent::Level(level) => {
                self.level = level;
                self.level_changes += 1;
            }
            MonitorEvent::Report(report) => {
                push_bounded(
                    &mut self.download_history,
                    report.download.rate_bytes_per_sec / 1024,
                );
                push_bounded(
                    &mut self.upload_history,
                    report.upload.rate_bytes_per_sec / 1024,
                );
                self.latest = Some(report);
            }
        }
    }

    fn ui(&self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(LayoutDirection::Vertical)
            .margin(1)
            .constraints(
                [
                    Constraint::Length(3),
                    Constraint::Length(3),
                    Constraint::Length(4),
                    Constraint::Min(5),
                    Constraint::Length(3),
                ]
                .as_ref(),
            )
            .split(frame.area());

        self.render_header(frame, chunks[0]);
        self.render_gauge(frame, chunks[1]);
        self.render_throughput(frame, chunks[2]);
        self.render_sparklines(frame, chunks[3]);
        self.render_footer(frame, chunks[4]);
    }

    fn render_header(&self, frame: &mut Frame, area: Rect) {
        let header = vec![Line::from(vec![
            Span::raw("Kaipo Meter - Live Activity"),
            Span::raw("    "),
            Span::styled(
                Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
                Style::default().fg(Color::Yellow),
            ),
        ])];

        let block = Block::default()
            .borders(Borders::ALL)
            .style(Style::default().fg(Color::White));

        let paragraph = Paragraph::new(header).block(block);
        frame.render_widget(paragraph, area);
    }

    fn render_gauge(&self, frame: &mut Frame, area: Rect) {
        let max_level = self.monitor.quantizer().max_level();
        let ratio = level_ratio(self.level, max_level);

        let gauge = Gauge::default()
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!("Activity Level ({} changes)", self.level_changes)),
            )
            .gauge_style(
                Style::default()
                    .fg(level_color(ratio))
                    .add_modifier(Modifier::BOLD),
            )
            .ratio(ratio)
            .label(format!("{} / {}", self.level, max_level));

        frame.render_widget(gauge, area);
    }

    fn render_throughput(&self, frame: &mut Frame, area: Rect) {
        let lines: Vec<Line> = match &self.latest {
            Some(report) => {
                let text = self
                    .text
                    .render(report)
                    .unwrap_or_else(|| "(hidden)".to_string());
                text.lines().map(|line| Line::from(line.to_string())).collect()
            }
            None => vec![Line::from(Span::styled(
                "Waiting for the first measurement...",
                Style::default().fg(Color::DarkGray),
            ))],
        };

        let block = Block::default()
            .borders(Borders::ALL)
            .title("Throughput")
            .style(Style::default().fg(Color::White));

        frame.render_widget(Paragraph::new(lines).block(block), area);
    }

    fn render_sparklines(&self, frame: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(LayoutDirection::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)].as_ref())
            .split(area);

        let download_data: Vec<u64> = self.download_history.iter().copied().collect();
        let upload_data: Vec<u64> = self.upload_history.iter().copied().collect();

        let download_title = match &self.latest {
            Some(report) => format!(
                "Download (Current: {})",
                format_rate(report.download.rate_bytes_per_sec, self.unit)
            ),
            None => "Download (No data)".to_string(),
        };
        let upload_title = match &self.latest {
            Some(report) => format!(
                "Upload (Current: {})",
                format_rate(report.upload.rate_bytes_per_sec, self.unit)
            ),
            None => "Upload (No data)".to_string(),
        };

        let download_sparkline = Sparkline::default()
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(download_title)
                    .title_style(Style::default().fg(Color::Green)),
            )
            .data(&download_data)
            .max(download_data.iter().max().copied().unwrap_or(1).max(1))
            .style(Style::default().fg(Color::Green));

        let upload_sparkline = Sparkline::default()
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(upload_title)
                    .title_style(Style::default().fg(Color::Blue)),
            )
            .data(&upload_data)
            .max(upload_data.iter().max().copied().unwrap_or(1).max(1))
            .style(Style::default().fg(Color::Blue));

        frame.render_widget(download_sparkline, chunks[0]);
        frame.render_widget(upload_sparkline, chunks[1]);
    }

    fn render_footer(&self, frame: &mut Frame, area: Rect) {
        let footer = Paragraph::new("Press 'q' or ESC to quit")
            .style(Style::default().fg(Color::DarkGray))
            .block(Block::default().borders(Borders::TOP));

        frame.render_widget(footer, area);
    }
}

fn push_bounded(history: &mut VecDeque<u64>, value: u64) {
    history.push_back(value);
    if history.len() > HISTORY_LEN {
        history.pop_front();
    }
}

/// Fraction of the gauge filled by `level`, in `0.0..=1.0`
fn level_ratio(level: Level, max_level: Level) -> f64 {
    if max_level == Level::ZERO {
        return 0.0;
    }
    (f64::from(level.value()) / f64::from(max_level.value())).clamp(0.0, 1.0)
}

fn level_color(ratio: f64) -> Color {
    if ratio < 0.34 {
        Color::Green
    } else if ratio < 0.67 {
        Color::Yellow
    } else {
        Color::Red
    }
}
