//! Plain-text rendering for the non-interactive commands.

use std::fmt::Write;

use cpm_core::{HistoryIndex, ScopeStatus, SyncReport, TeamReport};

pub fn render_sync(report: &SyncReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Teams listed: {}", report.teams_listed);
    for scope in &report.scopes {
        let _ = match &scope.status {
            ScopeStatus::Stored { received, inserted } => writeln!(
                out,
                "  {:<24} {inserted} new of {received} received",
                scope.team
            ),
            ScopeStatus::NoData => writeln!(out, "  {:<24} no data", scope.team),
            ScopeStatus::Failed { error } => writeln!(out, "  {:<24} FAILED: {error}", scope.team),
        };
    }
    let _ = writeln!(out, "Inserted: {}", report.inserted_total());
    out
}

pub fn render_history(index: &HistoryIndex) -> String {
    if index.teams.is_empty() {
        return "No metrics stored yet; run `cpm sync` first\n".to_string();
    }
    let mut out = String::new();
    let _ = writeln!(out, "Teams:  {}", index.teams.join(", "));
    let _ = writeln!(out, "Months: {}", index.months.join(", "));
    let _ = writeln!(
        out,
        "Dates:  {} days, {} .. {}",
        index.dates.len(),
        index.dates.last().map(String::as_str).unwrap_or("-"),
        index.dates.first().map(String::as_str).unwrap_or("-"),
    );
    out
}

pub fn render_report(report: &TeamReport) -> String {
    let s = &report.summary;
    let mut out = String::new();

    let _ = writeln!(out, "{} ({}, {} days)", report.team, report.period, s.days);
    let _ = writeln!(
        out,
        "  Active users {:.1}  Engaged users {:.1}  Acceptance {:.2}%",
        s.avg_active_users, s.avg_engaged_users, report.acceptance.average
    );
    let _ = writeln!(
        out,
        "  IDE chat users {:.1}  IDE chats {:.1}  Chats/user {:.2}",
        s.avg_ide_chat_users, s.avg_ide_chats, s.avg_ide_chats_per_user
    );
    let _ = writeln!(
        out,
        "  Web chat users {:.1}  Web chats {:.1}",
        s.avg_dotcom_chat_users, s.avg_dotcom_chats
    );

    if !report.languages.is_empty() {
        let _ = writeln!(out, "\nLanguages");
        let _ = writeln!(
            out,
            "  {:<20} {:>6} {:>8} {:>8} {:>7} {:>10}",
            "name", "users", "sugg", "accept", "rate%", "lines acc"
        );
        for l in &report.languages {
            let _ = writeln!(
                out,
                "  {:<20} {:>6} {:>8} {:>8} {:>7.2} {:>10}",
                l.name,
                l.total_engaged_users,
                l.total_code_suggestions,
                l.total_code_acceptances,
                l.acceptance_rate,
                l.total_code_lines_accepted
            );
        }
    }

    if !report.editors.is_empty() {
        let _ = writeln!(out, "\nIDE chat editors");
        for e in &report.editors {
            let _ = writeln!(
                out,
                "  {:<20} {:>6} users {:>8} chats",
                e.name, e.total_engaged_users, e.total_chats
            );
        }
    }

    let pr_summaries = report.pr_summaries_created();
    if pr_summaries > 0 {
        let _ = writeln!(out, "\nPull request summaries created: {pr_summaries}");
    }
    out
}

#[cfg(test)]
mod tests {
    use cpm_core::{build_team_report, ScopeOutcome};
    use cpm_types::{MetricSnapshot, PeriodFilter};

    use super::*;

    #[test]
    fn sync_summary_lists_every_scope() {
        let report = SyncReport {
            teams_listed: 2,
            scopes: vec![
                ScopeOutcome {
                    team: "All Organization".into(),
                    status: ScopeStatus::Stored {
                        received: 28,
                        inserted: 1,
                    },
                },
                ScopeOutcome {
                    team: "tiny".into(),
                    status: ScopeStatus::NoData,
                },
                ScopeOutcome {
                    team: "broken".into(),
                    status: ScopeStatus::Failed {
                        error: "database error".into(),
                    },
                },
            ],
        };
        let text = render_sync(&report);
        assert!(text.contains("1 new of 28 received"));
        assert!(text.contains("no data"));
        assert!(text.contains("FAILED: database error"));
        assert!(text.ends_with("Inserted: 1\n"));
    }

    #[test]
    fn history_of_empty_store() {
        let text = render_history(&HistoryIndex::default());
        assert!(text.contains("cpm sync"));
    }

    #[test]
    fn history_range() {
        let index = HistoryIndex {
            teams: vec!["core".into()],
            months: vec!["2024-11".into()],
            dates: vec!["2024-11-02".into(), "2024-11-01".into()],
        };
        let text = render_history(&index);
        assert!(text.contains("2 days, 2024-11-01 .. 2024-11-02"));
    }

    #[test]
    fn report_text() {
        let snapshot = MetricSnapshot {
            team: "core".into(),
            date: "2024-11-01".into(),
            month: "2024-11".into(),
            timestamp: "2024-12-01 09:00:00".into(),
            total_active_users: 4,
            total_engaged_users: 2,
            copilot_ide_chat: None,
            copilot_dotcom_chat: None,
            copilot_dotcom_pull_requests: None,
            copilot_ide_code_completions: Some(
                r#"{"editors": [{"name": "vscode", "models": [{"languages": [
                    {"name": "python", "total_engaged_users": 2,
                     "total_code_suggestions": 100, "total_code_acceptances": 80}]}]}]}"#
                    .into(),
            ),
        };
        let report = build_team_report(&[snapshot], "core", &PeriodFilter::All).unwrap();
        let text = render_report(&report);

        assert!(text.starts_with("core (all time, 1 days)"));
        assert!(text.contains("python"));
        assert!(text.contains("80.00"));
        assert!(!text.contains("IDE chat editors"));
    }
}
