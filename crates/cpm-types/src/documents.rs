//! Default-filled shapes of the nested Copilot metrics documents.
//!
//! Every numeric field tolerates absence, `null` and floats (counted as 0 or
//! truncated), every name falls back to `"unknown"` and every list to empty,
//! so downstream aggregation never has to deal with a missing key.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::stats::saturating_sum;

/// `copilot_ide_code_completions`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CodeCompletionsDoc {
    #[serde(default, deserialize_with = "lenient_count")]
    pub total_engaged_users: i64,
    #[serde(default, deserialize_with = "lenient_list")]
    pub languages: Vec<LanguageEntry>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub editors: Vec<CompletionEditor>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionEditor {
    #[serde(default = "unknown_name", deserialize_with = "lenient_name")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_count")]
    pub total_engaged_users: i64,
    #[serde(default, deserialize_with = "lenient_list")]
    pub models: Vec<CompletionModel>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionModel {
    #[serde(default = "unknown_name", deserialize_with = "lenient_name")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_count")]
    pub total_engaged_users: i64,
    #[serde(default, deserialize_with = "lenient_list")]
    pub languages: Vec<LanguageEntry>,
}

/// A language mention, either top-level or under an editor model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageEntry {
    #[serde(default = "unknown_name", deserialize_with = "lenient_name")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_count")]
    pub total_engaged_users: i64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub total_code_acceptances: i64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub total_code_suggestions: i64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub total_code_lines_suggested: i64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub total_code_lines_accepted: i64,
}

impl Default for LanguageEntry {
    fn default() -> Self {
        Self {
            name: unknown_name(),
            total_engaged_users: 0,
            total_code_acceptances: 0,
            total_code_suggestions: 0,
            total_code_lines_suggested: 0,
            total_code_lines_accepted: 0,
        }
    }
}

/// `copilot_ide_chat`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IdeChatDoc {
    #[serde(default, deserialize_with = "lenient_count")]
    pub total_engaged_users: i64,
    #[serde(default, deserialize_with = "lenient_list")]
    pub editors: Vec<IdeChatEditor>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IdeChatEditor {
    #[serde(default = "unknown_name", deserialize_with = "lenient_name")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_count")]
    pub total_engaged_users: i64,
    #[serde(default, deserialize_with = "lenient_list")]
    pub models: Vec<IdeChatModel>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IdeChatModel {
    #[serde(default = "unknown_name", deserialize_with = "lenient_name")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_count")]
    pub total_engaged_users: i64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub total_chats: i64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub total_chat_insertion_events: i64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub total_chat_copy_events: i64,
}

impl IdeChatEditor {
    /// Chats summed over every model of this editor.
    pub fn total_chats(&self) -> i64 {
        saturating_sum(self.models.iter().map(|m| m.total_chats))
    }
}

/// `copilot_dotcom_chat`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DotcomChatDoc {
    #[serde(default, deserialize_with = "lenient_count")]
    pub total_engaged_users: i64,
    /// Present in some exports; the API itself reports chats per model.
    #[serde(default, deserialize_with = "lenient_opt_count")]
    pub total_chats: Option<i64>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub models: Vec<IdeChatModel>,
}

impl DotcomChatDoc {
    pub fn total_chats(&self) -> i64 {
        self.total_chats
            .unwrap_or_else(|| saturating_sum(self.models.iter().map(|m| m.total_chats)))
    }
}

/// `copilot_dotcom_pull_requests`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PullRequestsDoc {
    #[serde(default, deserialize_with = "lenient_count")]
    pub total_engaged_users: i64,
    #[serde(default, deserialize_with = "lenient_list")]
    pub repositories: Vec<PullRequestRepository>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PullRequestRepository {
    #[serde(default = "unknown_name", deserialize_with = "lenient_name")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_count")]
    pub total_engaged_users: i64,
    #[serde(default, deserialize_with = "lenient_list")]
    pub models: Vec<PullRequestModel>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PullRequestModel {
    #[serde(default = "unknown_name", deserialize_with = "lenient_name")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_count")]
    pub total_engaged_users: i64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub total_pr_summaries_created: i64,
}

fn unknown_name() -> String {
    "unknown".to_string()
}

fn count_from(value: Option<Value>) -> Option<i64> {
    match value {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        _ => None,
    }
}

fn lenient_count<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(count_from(value).unwrap_or(0))
}

fn lenient_opt_count<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(count_from(value))
}

fn lenient_name<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) if !s.is_empty() => s,
        _ => unknown_name(),
    })
}

fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
