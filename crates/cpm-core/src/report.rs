//! View-specific tables for one team over one period.

use std::collections::BTreeSet;

use serde::Serialize;

use cpm_types::{
    saturating_sum, ChatStat, EditorSummary, LanguageSummary, MetricSnapshot, PeriodFilter,
    PullRequestStat,
};

use crate::aggregate::{
    acceptance_series, aggregate_editors, aggregate_languages, summarize_period,
    AcceptanceSeries, PeriodSummary,
};
use crate::flatten::{
    extract_chat_summary, extract_daily_acceptance, extract_editors, extract_languages,
    extract_pull_request_summary,
};

/// Everything the dashboard shows for one team and period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamReport {
    pub team: String,
    pub period: PeriodFilter,
    pub summary: PeriodSummary,
    /// Daily chat counts, oldest first.
    pub chat_trend: Vec<ChatStat>,
    pub acceptance: AcceptanceSeries,
    /// Sorted by name, descending.
    pub languages: Vec<LanguageSummary>,
    /// Sorted by engaged users, descending.
    pub editors: Vec<EditorSummary>,
    pub pull_requests: Vec<PullRequestStat>,
}

impl TeamReport {
    /// Trend charts only make sense with more than one day.
    pub fn has_trend(&self) -> bool {
        self.chat_trend.len() > 1
    }

    pub fn pr_summaries_created(&self) -> i64 {
        saturating_sum(self.pull_requests.iter().map(|p| p.total_pr_summaries_created))
    }
}

/// Build the report for `team` restricted to `period`.
///
/// Returns `None` when no stored snapshot matches.
pub fn build_team_report(
    history: &[MetricSnapshot],
    team: &str,
    period: &PeriodFilter,
) -> Option<TeamReport> {
    let mut selected: Vec<&MetricSnapshot> = history
        .iter()
        .filter(|s| s.team == team && period.matches(s))
        .collect();
    if selected.is_empty() {
        return None;
    }
    selected.sort_by(|a, b| a.date.cmp(&b.date));

    let chat_trend: Vec<ChatStat> = selected.iter().map(|s| extract_chat_summary(s)).collect();
    let summary = summarize_period(&selected, &chat_trend);

    let acceptance = acceptance_series(
        selected
            .iter()
            .map(|s| extract_daily_acceptance(s))
            .collect(),
    );

    let language_rows: Vec<_> = selected.iter().flat_map(|s| extract_languages(s)).collect();
    let mut languages = aggregate_languages(&language_rows);
    languages.sort_by(|a, b| b.name.cmp(&a.name));

    let editor_rows: Vec<_> = selected.iter().flat_map(|s| extract_editors(s)).collect();
    let mut editors = aggregate_editors(&editor_rows);
    editors.sort_by(|a, b| {
        b.total_engaged_users
            .cmp(&a.total_engaged_users)
            .then_with(|| a.name.cmp(&b.name))
    });

    let pull_requests = selected
        .iter()
        .map(|s| extract_pull_request_summary(s))
        .collect();

    Some(TeamReport {
        team: team.to_string(),
        period: period.clone(),
        summary,
        chat_trend,
        acceptance,
        languages,
        editors,
        pull_requests,
    })
}

/// Selector values derived from the stored history.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HistoryIndex {
    /// Ascending.
    pub teams: Vec<String>,
    /// Most recent first.
    pub months: Vec<String>,
    /// Most recent first.
    pub dates: Vec<String>,
}

impl HistoryIndex {
    pub fn from_history(history: &[MetricSnapshot]) -> Self {
        let teams: BTreeSet<&str> = history.iter().map(|s| s.team.as_str()).collect();
        let months: BTreeSet<&str> = history.iter().map(|s| s.month.as_str()).collect();
        let dates: BTreeSet<&str> = history.iter().map(|s| s.date.as_str()).collect();

        Self {
            teams: teams.into_iter().map(String::from).collect(),
            months: months.into_iter().rev().map(String::from).collect(),
            dates: dates.into_iter().rev().map(String::from).collect(),
        }
    }
}
