use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{PulseError, Result};

/// Synthetic team label under which organization-wide metrics are stored.
pub const ALL_ORGANIZATION: &str = "All Organization";

/// One per-day metrics document as returned by the Copilot metrics API.
///
/// Nested sub-documents are kept as opaque JSON so that storage stays
/// schema-on-read; they are decoded lazily by the flattener.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricRecord {
    pub date: String,
    #[serde(default)]
    pub total_active_users: i64,
    #[serde(default)]
    pub total_engaged_users: i64,
    #[serde(default)]
    pub copilot_ide_chat: Option<serde_json::Value>,
    #[serde(default)]
    pub copilot_dotcom_chat: Option<serde_json::Value>,
    #[serde(default)]
    pub copilot_dotcom_pull_requests: Option<serde_json::Value>,
    #[serde(default)]
    pub copilot_ide_code_completions: Option<serde_json::Value>,
}

/// A stored snapshot: one row per `(team, date)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSnapshot {
    pub team: String,
    pub date: String,
    pub month: String,
    pub timestamp: String,
    pub total_active_users: i64,
    pub total_engaged_users: i64,
    #[serde(default)]
    pub copilot_ide_chat: Option<String>,
    #[serde(default)]
    pub copilot_dotcom_chat: Option<String>,
    #[serde(default)]
    pub copilot_dotcom_pull_requests: Option<String>,
    #[serde(default)]
    pub copilot_ide_code_completions: Option<String>,
}

/// A team as listed by `GET /orgs/{org}/teams`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub slug: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Derive the `YYYY-MM` month key of a `YYYY-MM-DD` date.
pub fn month_of(date: &str) -> Result<String> {
    let day = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|e| PulseError::Validation(format!("Invalid date '{date}': {e}")))?;
    Ok(day.format("%Y-%m").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_of_valid_date() {
        assert_eq!(month_of("2024-11-03").unwrap(), "2024-11");
        assert_eq!(month_of("2025-01-31").unwrap(), "2025-01");
    }

    #[test]
    fn month_of_rejects_garbage() {
        assert!(month_of("yesterday").is_err());
        assert!(month_of("2024-02-30").is_err());
        assert!(month_of("").is_err());
    }

    #[test]
    fn record_defaults() {
        let json = r#"{"date": "2024-11-03"}"#;
        let record: MetricRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.total_active_users, 0);
        assert!(record.copilot_ide_chat.is_none());
        assert!(record.copilot_ide_code_completions.is_none());
    }

    #[test]
    fn record_keeps_nested_documents_opaque() {
        let json = r#"{
            "date": "2024-11-03",
            "total_active_users": 12,
            "total_engaged_users": 9,
            "copilot_ide_chat": {"total_engaged_users": 4, "editors": []},
            "copilot_dotcom_chat": {"total_engaged_users": 1}
        }"#;
        let record: MetricRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.total_active_users, 12);
        let chat = record.copilot_ide_chat.unwrap();
        assert_eq!(chat["total_engaged_users"], 4);
    }

    #[test]
    fn team_without_name() {
        let team: Team = serde_json::from_str(r#"{"slug": "platform"}"#).unwrap();
        assert_eq!(team.slug, "platform");
        assert!(team.name.is_none());
    }
}
