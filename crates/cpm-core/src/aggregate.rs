//! Grouping of flattened rows and the derived ratios shown on the dashboard.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use cpm_types::{
    ChatStat, DailyAcceptance, EditorStat, EditorSummary, LanguageStat, LanguageSummary,
    MetricSnapshot,
};

/// `numerator / denominator`, or 0 when the denominator is not positive.
pub fn safe_ratio(numerator: i64, denominator: i64) -> f64 {
    if denominator > 0 {
        numerator as f64 / denominator as f64
    } else {
        0.0
    }
}

/// Round to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}

/// Sum language rows by name and derive the per-period ratios.
///
/// Output is sorted by name, so permuting the input yields identical output.
pub fn aggregate_languages(rows: &[LanguageStat]) -> Vec<LanguageSummary> {
    let mut groups: BTreeMap<&str, LanguageStat> = BTreeMap::new();
    for row in rows {
        let acc = groups.entry(row.name.as_str()).or_default();
        acc.total_engaged_users =
            acc.total_engaged_users.saturating_add(row.total_engaged_users);
        acc.total_code_acceptances =
            acc.total_code_acceptances.saturating_add(row.total_code_acceptances);
        acc.total_code_suggestions =
            acc.total_code_suggestions.saturating_add(row.total_code_suggestions);
        acc.total_code_lines_suggested =
            acc.total_code_lines_suggested.saturating_add(row.total_code_lines_suggested);
        acc.total_code_lines_accepted =
            acc.total_code_lines_accepted.saturating_add(row.total_code_lines_accepted);
    }

    groups
        .into_iter()
        .map(|(name, s)| LanguageSummary {
            name: name.to_string(),
            total_engaged_users: s.total_engaged_users,
            total_code_acceptances: s.total_code_acceptances,
            total_code_suggestions: s.total_code_suggestions,
            total_code_lines_accepted: s.total_code_lines_accepted,
            total_code_lines_suggested: s.total_code_lines_suggested,
            acceptance_rate: round2(
                safe_ratio(s.total_code_acceptances, s.total_code_suggestions) * 100.0,
            ),
            lines_accepted_per_user: round2(safe_ratio(
                s.total_code_lines_accepted,
                s.total_engaged_users,
            )),
            suggestions_per_user: round2(safe_ratio(
                s.total_code_suggestions,
                s.total_engaged_users,
            )),
            lines_suggested_per_user: round2(safe_ratio(
                s.total_code_lines_suggested,
                s.total_engaged_users,
            )),
            lines_accepted_per_suggestion: round2(safe_ratio(
                s.total_code_lines_accepted,
                s.total_code_suggestions,
            )),
            acceptances_per_user: round2(safe_ratio(
                s.total_code_acceptances,
                s.total_engaged_users,
            )),
        })
        .collect()
}

/// Sum editor rows by name. Output is sorted by name.
pub fn aggregate_editors(rows: &[EditorStat]) -> Vec<EditorSummary> {
    let mut groups: BTreeMap<&str, (i64, i64)> = BTreeMap::new();
    for row in rows {
        let acc = groups.entry(row.name.as_str()).or_default();
        acc.0 = acc.0.saturating_add(row.total_engaged_users);
        acc.1 = acc.1.saturating_add(row.total_chats);
    }

    groups
        .into_iter()
        .map(|(name, (users, chats))| EditorSummary {
            name: name.to_string(),
            total_engaged_users: users,
            total_chats: chats,
        })
        .collect()
}

/// Per-day averages over a period.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeriodSummary {
    pub days: usize,
    pub avg_active_users: f64,
    pub avg_engaged_users: f64,
    pub avg_ide_chat_users: f64,
    pub avg_ide_chats: f64,
    pub avg_ide_chats_per_user: f64,
    pub avg_dotcom_chat_users: f64,
    pub avg_dotcom_chats: f64,
}

pub fn summarize_period(snapshots: &[&MetricSnapshot], chats: &[ChatStat]) -> PeriodSummary {
    PeriodSummary {
        days: snapshots.len(),
        avg_active_users: mean(snapshots.iter().map(|s| s.total_active_users as f64)),
        avg_engaged_users: mean(snapshots.iter().map(|s| s.total_engaged_users as f64)),
        avg_ide_chat_users: mean(chats.iter().map(|c| c.ide_chat_engaged_users as f64)),
        avg_ide_chats: mean(chats.iter().map(|c| c.ide_chat_total_chats as f64)),
        avg_ide_chats_per_user: mean(chats.iter().map(|c| c.ide_chat_avg_chats_per_user)),
        avg_dotcom_chat_users: mean(chats.iter().map(|c| c.dotcom_chat_engaged_users as f64)),
        avg_dotcom_chats: mean(chats.iter().map(|c| c.dotcom_chat_total_chats as f64)),
    }
}

/// Daily acceptance rates worth charting, with their mean.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AcceptanceSeries {
    pub points: Vec<DailyAcceptance>,
    pub average: f64,
}

/// Drop days without suggestions and order the rest by date.
pub fn acceptance_series(daily: Vec<DailyAcceptance>) -> AcceptanceSeries {
    let mut points: Vec<DailyAcceptance> = daily
        .into_iter()
        .filter(|d| d.total_suggestions > 0)
        .collect();
    points.sort_by(|a, b| a.date.cmp(&b.date));
    let average = round2(mean(points.iter().map(|p| p.acceptance_rate)));
    AcceptanceSeries { points, average }
}
