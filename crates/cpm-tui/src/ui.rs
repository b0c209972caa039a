//! Rendering of the dashboard.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    symbols,
    text::{Line, Span},
    widgets::{
        Axis, BarChart, Block, Borders, Cell, Chart, Dataset, GraphType, List, ListItem,
        ListState, Paragraph, Row, Table, Tabs, Wrap,
    },
    Frame,
};

use cpm_core::TeamReport;

use crate::app::{Dashboard, Focus, PeriodMode, Status};

const ACCENT: Color = Color::Cyan;
const IDE_COLOR: Color = Color::LightGreen;
const WEB_COLOR: Color = Color::LightMagenta;
const MAX_BARS: usize = 12;

pub fn draw(f: &mut Frame, app: &Dashboard) {
    // Header(3) + Body(*) + Status(1)
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(f.area());

    draw_header(f, app, chunks[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(30), Constraint::Min(0)])
        .split(chunks[1]);
    draw_filters(f, app, body[0]);
    draw_results(f, app, body[1]);

    draw_status(f, app, chunks[2]);
}

fn draw_header(f: &mut Frame, app: &Dashboard, area: Rect) {
    let team = app.selected_team().unwrap_or("-");
    let text = format!(" org: {}  ◆  team: {}  ◆  {} ", app.org, team, app.period());
    let block = Block::new()
        .borders(Borders::ALL)
        .title(" Copilot Pulse ")
        .title_style(Style::default().fg(ACCENT));
    f.render_widget(Paragraph::new(text).block(block), area);
}

fn focus_block(title: &str, focused: bool) -> Block<'_> {
    let border = if focused { ACCENT } else { Color::DarkGray };
    Block::new()
        .borders(Borders::ALL)
        .title(title)
        .border_style(Style::default().fg(border))
}

fn selectable_list<'a>(items: &'a [String], title: &'a str, focused: bool) -> List<'a> {
    List::new(items.iter().map(|i| ListItem::new(i.as_str())))
        .block(focus_block(title, focused))
        .highlight_style(Style::default().fg(ACCENT).add_modifier(Modifier::BOLD))
        .highlight_symbol("▸ ")
}

fn draw_filters(f: &mut Frame, app: &Dashboard, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(45),
            Constraint::Length(3),
            Constraint::Min(0),
        ])
        .split(area);

    let mut teams = ListState::default().with_selected(app.selected_team().map(|_| app.team_cursor));
    f.render_stateful_widget(
        selectable_list(&app.index.teams, " Teams ", app.focus == Focus::Teams),
        chunks[0],
        &mut teams,
    );

    let selected_mode = PeriodMode::ALL
        .iter()
        .position(|m| *m == app.period_mode)
        .unwrap_or(0);
    let tabs = Tabs::new(PeriodMode::ALL.iter().map(|m| m.label()))
        .block(Block::new().borders(Borders::ALL).title(" a / m / d "))
        .select(selected_mode)
        .highlight_style(Style::default().fg(ACCENT).add_modifier(Modifier::BOLD));
    f.render_widget(tabs, chunks[1]);

    let values = app.period_values();
    if values.is_empty() {
        let hint = Paragraph::new(" All stored days")
            .block(focus_block(" Period ", app.focus == Focus::Periods))
            .style(Style::default().dim());
        f.render_widget(hint, chunks[2]);
    } else {
        let mut periods = ListState::default().with_selected(Some(app.period_cursor));
        f.render_stateful_widget(
            selectable_list(values, " Period ", app.focus == Focus::Periods),
            chunks[2],
            &mut periods,
        );
    }
}

fn draw_results(f: &mut Frame, app: &Dashboard, area: Rect) {
    let Some(report) = app.report() else {
        let message = match app.selected_team() {
            None => " No metrics stored yet.\n\n Press r to fetch them from GitHub.".to_string(),
            Some(team) => format!(
                " No data available for {team} on the selected {}.\n\n Pick another period or press r to refresh.",
                app.period_mode.label().to_lowercase()
            ),
        };
        let paragraph = Paragraph::new(message)
            .block(Block::new().borders(Borders::ALL).title(" Results "))
            .wrap(Wrap { trim: false })
            .style(Style::default().dim());
        f.render_widget(paragraph, area);
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),
            Constraint::Percentage(40),
            Constraint::Min(0),
        ])
        .split(area);

    draw_summary(f, report, chunks[0]);

    let charts = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[1]);
    draw_chat_trend(f, report, charts[0]);
    draw_acceptance(f, report, charts[1]);

    let tables = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(chunks[2]);
    draw_languages(f, report, tables[0]);
    draw_editors(f, report, tables[1]);
}

fn metric<'a>(label: &'a str, value: String) -> [Span<'a>; 2] {
    [
        Span::styled(format!("{label} "), Style::default().fg(Color::DarkGray)),
        Span::styled(format!("{value}   "), Style::default().bold()),
    ]
}

fn draw_summary(f: &mut Frame, report: &TeamReport, area: Rect) {
    let s = &report.summary;
    let pr_summaries = report.pr_summaries_created();

    let usage: Vec<Span> = [
        metric("Days", s.days.to_string()),
        metric("Active users", format!("{:.1}", s.avg_active_users)),
        metric("Engaged users", format!("{:.1}", s.avg_engaged_users)),
        metric("Acceptance", format!("{:.2}%", report.acceptance.average)),
        metric("PR summaries", pr_summaries.to_string()),
    ]
    .into_iter()
    .flatten()
    .collect();
    let chat: Vec<Span> = [
        metric("IDE chat users", format!("{:.1}", s.avg_ide_chat_users)),
        metric("IDE chats", format!("{:.1}", s.avg_ide_chats)),
        metric("chats/user", format!("{:.2}", s.avg_ide_chats_per_user)),
        metric("Web chat users", format!("{:.1}", s.avg_dotcom_chat_users)),
        metric("Web chats", format!("{:.1}", s.avg_dotcom_chats)),
    ]
    .into_iter()
    .flatten()
    .collect();

    let paragraph = Paragraph::new(vec![Line::from(usage), Line::from(chat)])
        .block(Block::new().borders(Borders::ALL).title(" Daily averages "));
    f.render_widget(paragraph, area);
}

fn date_labels<'a>(first: Option<&'a str>, last: Option<&'a str>) -> Vec<Span<'a>> {
    [first, last].into_iter().flatten().map(Span::raw).collect()
}

fn y_bound(max: f64) -> f64 {
    if max > 0.0 {
        (max * 1.1).ceil()
    } else {
        1.0
    }
}

fn draw_chat_trend(f: &mut Frame, report: &TeamReport, area: Rect) {
    let block = Block::new().borders(Borders::ALL).title(" Daily chats ");
    if !report.has_trend() {
        let note = Paragraph::new(" Trends need more than one day.")
            .block(block)
            .style(Style::default().dim());
        f.render_widget(note, area);
        return;
    }

    let ide: Vec<(f64, f64)> = report
        .chat_trend
        .iter()
        .enumerate()
        .map(|(i, c)| (i as f64, c.ide_chat_total_chats as f64))
        .collect();
    let web: Vec<(f64, f64)> = report
        .chat_trend
        .iter()
        .enumerate()
        .map(|(i, c)| (i as f64, c.dotcom_chat_total_chats as f64))
        .collect();
    let max = ide.iter().chain(&web).map(|(_, y)| *y).fold(0.0, f64::max);
    let top = y_bound(max);

    let datasets = vec![
        Dataset::default()
            .name("IDE")
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(IDE_COLOR))
            .data(&ide),
        Dataset::default()
            .name("Web")
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(WEB_COLOR))
            .data(&web),
    ];

    let chart = Chart::new(datasets)
        .block(block)
        .x_axis(
            Axis::default()
                .bounds([0.0, (ide.len() - 1) as f64])
                .labels(date_labels(
                    report.chat_trend.first().map(|c| c.date.as_str()),
                    report.chat_trend.last().map(|c| c.date.as_str()),
                )),
        )
        .y_axis(
            Axis::default()
                .bounds([0.0, top])
                .labels(["0".to_string(), format!("{top:.0}")]),
        );
    f.render_widget(chart, area);
}

fn draw_acceptance(f: &mut Frame, report: &TeamReport, area: Rect) {
    let title = format!(" Acceptance rate (avg {:.2}%) ", report.acceptance.average);
    let block = Block::new().borders(Borders::ALL).title(title);
    let points = &report.acceptance.points;
    if points.len() < 2 {
        let note = Paragraph::new(" Trends need more than one day with suggestions.")
            .block(block)
            .style(Style::default().dim());
        f.render_widget(note, area);
        return;
    }

    let daily: Vec<(f64, f64)> = points
        .iter()
        .enumerate()
        .map(|(i, p)| (i as f64, p.acceptance_rate))
        .collect();
    let last_x = (points.len() - 1) as f64;
    let average = [(0.0, report.acceptance.average), (last_x, report.acceptance.average)];

    let datasets = vec![
        Dataset::default()
            .name("Daily")
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(IDE_COLOR))
            .data(&daily),
        Dataset::default()
            .name("Average")
            .marker(symbols::Marker::Dot)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::Yellow))
            .data(&average),
    ];

    let chart = Chart::new(datasets)
        .block(block)
        .x_axis(Axis::default().bounds([0.0, last_x]).labels(date_labels(
            points.first().map(|p| p.date.as_str()),
            points.last().map(|p| p.date.as_str()),
        )))
        .y_axis(Axis::default().bounds([0.0, 100.0]).labels(["0", "50", "100"]));
    f.render_widget(chart, area);
}

fn split_table_and_bars(area: Rect) -> std::rc::Rc<[Rect]> {
    Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(area)
}

fn header_row(cells: &[&'static str]) -> Row<'static> {
    Row::new(cells.iter().copied().map(Cell::from)).style(Style::default().fg(ACCENT).bold())
}

fn draw_languages(f: &mut Frame, report: &TeamReport, area: Rect) {
    let chunks = split_table_and_bars(area);

    let rows = report.languages.iter().map(|l| {
        Row::new(vec![
            Cell::from(l.name.clone()),
            Cell::from(l.total_engaged_users.to_string()),
            Cell::from(l.total_code_suggestions.to_string()),
            Cell::from(l.total_code_acceptances.to_string()),
            Cell::from(format!("{:.2}", l.acceptance_rate)),
            Cell::from(l.total_code_lines_accepted.to_string()),
            Cell::from(format!("{:.2}", l.lines_accepted_per_user)),
        ])
    });
    let table = Table::new(
        rows,
        [
            Constraint::Min(12),
            Constraint::Length(6),
            Constraint::Length(8),
            Constraint::Length(8),
            Constraint::Length(7),
            Constraint::Length(9),
            Constraint::Length(9),
        ],
    )
    .header(header_row(&[
        "Language", "Users", "Sugg", "Accept", "Rate%", "Lines acc", "Lines/usr",
    ]))
    .block(Block::new().borders(Borders::ALL).title(" Languages "));
    f.render_widget(table, chunks[0]);

    let mut by_acceptances: Vec<_> = report.languages.iter().collect();
    by_acceptances.sort_by(|a, b| b.total_code_acceptances.cmp(&a.total_code_acceptances));
    let bars: Vec<(&str, u64)> = by_acceptances
        .iter()
        .take(MAX_BARS)
        .map(|l| (l.name.as_str(), l.total_code_acceptances.max(0) as u64))
        .collect();
    let chart = BarChart::default()
        .block(Block::new().borders(Borders::ALL).title(" Acceptances by language "))
        .data(bars.as_slice())
        .bar_width(6)
        .bar_gap(1)
        .bar_style(Style::default().fg(IDE_COLOR))
        .value_style(Style::default().fg(Color::Black).bg(IDE_COLOR));
    f.render_widget(chart, chunks[1]);
}

fn draw_editors(f: &mut Frame, report: &TeamReport, area: Rect) {
    let chunks = split_table_and_bars(area);

    let rows = report.editors.iter().map(|e| {
        Row::new(vec![
            Cell::from(e.name.clone()),
            Cell::from(e.total_engaged_users.to_string()),
            Cell::from(e.total_chats.to_string()),
        ])
    });
    let table = Table::new(
        rows,
        [Constraint::Min(12), Constraint::Length(7), Constraint::Length(7)],
    )
    .header(header_row(&["Editor", "Users", "Chats"]))
    .block(Block::new().borders(Borders::ALL).title(" IDE chat by editor "));
    f.render_widget(table, chunks[0]);

    let bars: Vec<(&str, u64)> = report
        .editors
        .iter()
        .take(MAX_BARS)
        .map(|e| (e.name.as_str(), e.total_engaged_users.max(0) as u64))
        .collect();
    let chart = BarChart::default()
        .block(Block::new().borders(Borders::ALL).title(" Engaged users by editor "))
        .data(bars.as_slice())
        .bar_width(6)
        .bar_gap(1)
        .bar_style(Style::default().fg(WEB_COLOR))
        .value_style(Style::default().fg(Color::Black).bg(WEB_COLOR));
    f.render_widget(chart, chunks[1]);
}

fn draw_status(f: &mut Frame, app: &Dashboard, area: Rect) {
    let (text, color) = match app.status() {
        Status::Ready(msg) => (msg.as_str(), Color::DarkGray),
        Status::Busy(msg) => (msg.as_str(), Color::Yellow),
        Status::Failed(msg) => (msg.as_str(), Color::Red),
    };
    let line = format!(" {text} | tab focus | ↑↓ select | a/m/d period | r refresh | q quit ");
    f.render_widget(Paragraph::new(line).style(Style::default().fg(color)), area);
}
