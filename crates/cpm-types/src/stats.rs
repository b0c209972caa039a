use serde::{Deserialize, Serialize};

use crate::documents::LanguageEntry;

/// Sum counts, clamping at the `i64` bounds instead of overflowing.
pub fn saturating_sum(values: impl IntoIterator<Item = i64>) -> i64 {
    values.into_iter().fold(0, i64::saturating_add)
}

/// One language mention for one day (not pre-summed).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LanguageStat {
    pub name: String,
    pub total_engaged_users: i64,
    pub total_code_acceptances: i64,
    pub total_code_suggestions: i64,
    pub total_code_lines_suggested: i64,
    pub total_code_lines_accepted: i64,
}

impl From<&LanguageEntry> for LanguageStat {
    fn from(entry: &LanguageEntry) -> Self {
        Self {
            name: entry.name.clone(),
            total_engaged_users: entry.total_engaged_users,
            total_code_acceptances: entry.total_code_acceptances,
            total_code_suggestions: entry.total_code_suggestions,
            total_code_lines_suggested: entry.total_code_lines_suggested,
            total_code_lines_accepted: entry.total_code_lines_accepted,
        }
    }
}

/// Chat usage of one editor for one day.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EditorStat {
    pub name: String,
    pub total_engaged_users: i64,
    pub total_chats: i64,
}

/// Per-day chat counts for in-editor and web chat.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatStat {
    pub date: String,
    pub ide_chat_engaged_users: i64,
    pub ide_chat_total_chats: i64,
    pub ide_chat_avg_chats_per_user: f64,
    pub dotcom_chat_engaged_users: i64,
    pub dotcom_chat_total_chats: i64,
    pub dotcom_chat_avg_chats_per_user: f64,
}

/// Day-level acceptance across every language mention.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyAcceptance {
    pub date: String,
    /// Percentage in `[0, 100]`, 0 when no suggestions were made.
    pub acceptance_rate: f64,
    pub total_acceptances: i64,
    pub total_suggestions: i64,
}

/// Pull request summary usage for one day.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PullRequestStat {
    pub date: String,
    pub total_engaged_users: i64,
    pub total_pr_summaries_created: i64,
}

/// Language stats summed over a period, with derived ratios.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LanguageSummary {
    pub name: String,
    pub total_engaged_users: i64,
    pub total_code_acceptances: i64,
    pub total_code_suggestions: i64,
    pub total_code_lines_accepted: i64,
    pub total_code_lines_suggested: i64,
    pub acceptance_rate: f64,
    pub lines_accepted_per_user: f64,
    pub suggestions_per_user: f64,
    pub lines_suggested_per_user: f64,
    pub lines_accepted_per_suggestion: f64,
    pub acceptances_per_user: f64,
}

/// Editor stats summed over a period.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EditorSummary {
    pub name: String,
    pub total_engaged_users: i64,
    pub total_chats: i64,
}
