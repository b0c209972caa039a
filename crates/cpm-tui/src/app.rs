//! Dashboard state and main event loop

use std::io;
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::backend::CrosstermBackend;
use tracing::{info, warn};

use cpm_core::{build_team_report, HistoryIndex, Syncer, TeamReport};
use cpm_db::{Database, SnapshotRepository};
use cpm_types::{MetricSnapshot, PeriodFilter, ALL_ORGANIZATION};

use crate::ui;

pub type Tui = ratatui::Terminal<CrosstermBackend<io::Stdout>>;

/// Switch the terminal to raw mode on the alternate screen.
pub fn init_terminal() -> Result<Tui> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    Ok(ratatui::Terminal::new(CrosstermBackend::new(stdout))?)
}

pub fn restore_terminal(terminal: &mut Tui) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

/// Which list the arrow keys move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Focus {
    #[default]
    Teams,
    Periods,
}

/// Granularity of the period selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PeriodMode {
    All,
    #[default]
    Month,
    Day,
}

impl PeriodMode {
    pub const ALL: [PeriodMode; 3] = [PeriodMode::All, PeriodMode::Month, PeriodMode::Day];

    pub fn label(self) -> &'static str {
        match self {
            PeriodMode::All => "All",
            PeriodMode::Month => "Month",
            PeriodMode::Day => "Day",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Status {
    Ready(String),
    Busy(String),
    Failed(String),
}

/// What the event loop should do after a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    None,
    Refresh,
    Quit,
}

pub struct Dashboard {
    pub(crate) org: String,
    pub(crate) history: Vec<MetricSnapshot>,
    pub(crate) index: HistoryIndex,
    pub(crate) team_cursor: usize,
    pub(crate) period_mode: PeriodMode,
    pub(crate) period_cursor: usize,
    pub(crate) focus: Focus,
    pub(crate) report: Option<TeamReport>,
    pub(crate) status: Status,
}

impl Dashboard {
    pub fn new(org: impl Into<String>) -> Self {
        Self {
            org: org.into(),
            history: Vec::new(),
            index: HistoryIndex::default(),
            team_cursor: 0,
            period_mode: PeriodMode::default(),
            period_cursor: 0,
            focus: Focus::default(),
            report: None,
            status: Status::Ready("Press r to fetch the latest metrics".to_string()),
        }
    }

    /// Replace the loaded history, keeping the selected team when it still
    /// exists.
    pub fn set_history(&mut self, history: Option<Vec<MetricSnapshot>>) {
        let previous = self.selected_team().map(str::to_owned);

        self.history = history.unwrap_or_default();
        self.index = HistoryIndex::from_history(&self.history);

        let teams = &self.index.teams;
        self.team_cursor = previous
            .and_then(|team| teams.iter().position(|t| *t == team))
            .or_else(|| teams.iter().position(|t| t == ALL_ORGANIZATION))
            .unwrap_or(0);
        self.period_cursor = self
            .period_cursor
            .min(self.period_values().len().saturating_sub(1));

        self.rebuild_report();
    }

    pub fn has_history(&self) -> bool {
        !self.history.is_empty()
    }

    pub fn selected_team(&self) -> Option<&str> {
        self.index.teams.get(self.team_cursor).map(String::as_str)
    }

    /// Values the period selector offers for the current mode.
    pub fn period_values(&self) -> &[String] {
        match self.period_mode {
            PeriodMode::All => &[],
            PeriodMode::Month => &self.index.months,
            PeriodMode::Day => &self.index.dates,
        }
    }

    pub fn period(&self) -> PeriodFilter {
        let value = self.period_values().get(self.period_cursor).cloned();
        match (self.period_mode, value) {
            (PeriodMode::Month, Some(month)) => PeriodFilter::Month(month),
            (PeriodMode::Day, Some(day)) => PeriodFilter::Day(day),
            _ => PeriodFilter::All,
        }
    }

    pub fn report(&self) -> Option<&TeamReport> {
        self.report.as_ref()
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    fn rebuild_report(&mut self) {
        self.report = self
            .selected_team()
            .and_then(|team| build_team_report(&self.history, team, &self.period()));
    }

    fn set_mode(&mut self, mode: PeriodMode) {
        if self.period_mode != mode {
            self.period_mode = mode;
            self.period_cursor = 0;
            self.rebuild_report();
        }
    }

    fn move_selection(&mut self, down: bool) {
        let periods = self.period_values().len();
        let (cursor, len) = match self.focus {
            Focus::Teams => (&mut self.team_cursor, self.index.teams.len()),
            Focus::Periods => (&mut self.period_cursor, periods),
        };
        if len == 0 {
            return;
        }
        *cursor = if down {
            (*cursor + 1).min(len - 1)
        } else {
            cursor.saturating_sub(1)
        };
        self.rebuild_report();
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Action {
        if key.kind != KeyEventKind::Press {
            return Action::None;
        }

        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                return Action::Quit
            }
            KeyCode::Char('q') | KeyCode::Esc => return Action::Quit,
            KeyCode::Char('r') => return Action::Refresh,
            KeyCode::Tab | KeyCode::BackTab => {
                self.focus = match self.focus {
                    Focus::Teams => Focus::Periods,
                    Focus::Periods => Focus::Teams,
                };
            }
            KeyCode::Up | KeyCode::Char('k') => self.move_selection(false),
            KeyCode::Down | KeyCode::Char('j') => self.move_selection(true),
            KeyCode::Char('a') => self.set_mode(PeriodMode::All),
            KeyCode::Char('m') => self.set_mode(PeriodMode::Month),
            KeyCode::Char('d') => self.set_mode(PeriodMode::Day),
            _ => {}
        }
        Action::None
    }

    /// Sync from the API, then reload the stored history.
    pub async fn refresh(&mut self, syncer: &Syncer, db: &Database) {
        let report = match syncer.sync().await {
            Ok(report) => report,
            Err(e) => {
                warn!(error = %e, "Dashboard refresh failed");
                self.status = Status::Failed(format!("Sync failed: {e}"));
                return;
            }
        };

        match SnapshotRepository::new(db).load_all().await {
            Ok(history) => self.set_history(history),
            Err(e) => {
                self.status = Status::Failed(format!("Reload failed: {e}"));
                return;
            }
        }

        let failed: Vec<&str> = report.failures().map(|s| s.team.as_str()).collect();
        self.status = if failed.is_empty() {
            Status::Ready(format!(
                "Synced {} teams, {} new snapshots",
                report.teams_listed,
                report.inserted_total()
            ))
        } else {
            Status::Failed(format!(
                "Synced with errors, {} new snapshots; failed: {}",
                report.inserted_total(),
                failed.join(", ")
            ))
        };
        info!(inserted = report.inserted_total(), "Dashboard refreshed");
    }

    pub async fn run(&mut self, terminal: &mut Tui, syncer: &Syncer, db: &Database) -> Result<()> {
        loop {
            terminal.draw(|f| ui::draw(f, self))?;

            if event::poll(Duration::from_millis(250))? {
                if let Event::Key(key) = event::read()? {
                    match self.handle_key(key) {
                        Action::Quit => break,
                        Action::Refresh => {
                            self.status = Status::Busy(format!("Syncing {} ...", self.org));
                            terminal.draw(|f| ui::draw(f, self))?;
                            self.refresh(syncer, db).await;
                        }
                        Action::None => {}
                    }
                }
            }
        }
        Ok(())
    }
}
