//! Flattening of one snapshot's nested documents into tabular rows.
//!
//! Every extractor degrades to "no data" (empty rows or zero counts) when its
//! document is absent or unparseable.

use cpm_types::{
    ChatStat, CodeCompletionsDoc, DailyAcceptance, DotcomChatDoc, EditorStat, IdeChatDoc,
    LanguageEntry, LanguageStat, MetricSnapshot, PullRequestStat, PullRequestsDoc,
    saturating_sum,
};

use crate::aggregate::safe_ratio;
use crate::document::decode_as;

/// Every language mention in a completions document: the top-level list
/// followed by `editors[].models[].languages[]`.
pub fn language_mentions(doc: &CodeCompletionsDoc) -> impl Iterator<Item = &LanguageEntry> {
    doc.languages.iter().chain(
        doc.editors
            .iter()
            .flat_map(|e| e.models.iter())
            .flat_map(|m| m.languages.iter()),
    )
}

/// One row per language mention of the day, not pre-summed.
pub fn extract_languages(snapshot: &MetricSnapshot) -> Vec<LanguageStat> {
    let Some(doc) =
        decode_as::<CodeCompletionsDoc>(snapshot.copilot_ide_code_completions.as_deref())
    else {
        return Vec::new();
    };
    language_mentions(&doc).map(LanguageStat::from).collect()
}

/// One row per editor of the IDE chat document, chats summed over models.
pub fn extract_editors(snapshot: &MetricSnapshot) -> Vec<EditorStat> {
    let Some(doc) = decode_as::<IdeChatDoc>(snapshot.copilot_ide_chat.as_deref()) else {
        return Vec::new();
    };
    doc.editors
        .iter()
        .map(|editor| EditorStat {
            name: editor.name.clone(),
            total_engaged_users: editor.total_engaged_users,
            total_chats: editor.total_chats(),
        })
        .collect()
}

/// Day-level IDE and web chat counts.
pub fn extract_chat_summary(snapshot: &MetricSnapshot) -> ChatStat {
    let mut stat = ChatStat {
        date: snapshot.date.clone(),
        ..Default::default()
    };

    if let Some(ide) = decode_as::<IdeChatDoc>(snapshot.copilot_ide_chat.as_deref()) {
        stat.ide_chat_engaged_users = ide.total_engaged_users;
        stat.ide_chat_total_chats = saturating_sum(ide.editors.iter().map(|e| e.total_chats()));
        stat.ide_chat_avg_chats_per_user =
            safe_ratio(stat.ide_chat_total_chats, stat.ide_chat_engaged_users);
    }

    if let Some(web) = decode_as::<DotcomChatDoc>(snapshot.copilot_dotcom_chat.as_deref()) {
        stat.dotcom_chat_engaged_users = web.total_engaged_users;
        stat.dotcom_chat_total_chats = web.total_chats();
        stat.dotcom_chat_avg_chats_per_user =
            safe_ratio(stat.dotcom_chat_total_chats, stat.dotcom_chat_engaged_users);
    }

    stat
}

/// Acceptance percentage across every language mention of the day.
pub fn extract_daily_acceptance(snapshot: &MetricSnapshot) -> DailyAcceptance {
    let (acceptances, suggestions) =
        decode_as::<CodeCompletionsDoc>(snapshot.copilot_ide_code_completions.as_deref())
            .map(|doc| {
                language_mentions(&doc).fold((0i64, 0i64), |(a, s), lang| {
                    (
                        a.saturating_add(lang.total_code_acceptances),
                        s.saturating_add(lang.total_code_suggestions),
                    )
                })
            })
            .unwrap_or((0, 0));

    DailyAcceptance {
        date: snapshot.date.clone(),
        acceptance_rate: safe_ratio(acceptances, suggestions) * 100.0,
        total_acceptances: acceptances,
        total_suggestions: suggestions,
    }
}

/// Pull request summaries created across repositories and models.
pub fn extract_pull_request_summary(snapshot: &MetricSnapshot) -> PullRequestStat {
    let doc = decode_as::<PullRequestsDoc>(snapshot.copilot_dotcom_pull_requests.as_deref())
        .unwrap_or_default();

    PullRequestStat {
        date: snapshot.date.clone(),
        total_engaged_users: doc.total_engaged_users,
        total_pr_summaries_created: saturating_sum(
            doc.repositories
                .iter()
                .flat_map(|r| r.models.iter())
                .map(|m| m.total_pr_summaries_created),
        ),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn snapshot() -> MetricSnapshot {
        MetricSnapshot {
            team: "core".to_string(),
            date: "2024-11-01".to_string(),
            month: "2024-11".to_string(),
            timestamp: "2024-11-02 08:00:00".to_string(),
            total_active_users: 10,
            total_engaged_users: 8,
            copilot_ide_chat: None,
            copilot_dotcom_chat: None,
            copilot_dotcom_pull_requests: None,
            copilot_ide_code_completions: None,
        }
    }

    fn completions() -> String {
        json!({
            "total_engaged_users": 6,
            "languages": [{"name": "python", "total_engaged_users": 4}],
            "editors": [{
                "name": "vscode",
                "models": [{
                    "name": "default",
                    "languages": [
                        {"name": "python", "total_engaged_users": 4,
                         "total_code_suggestions": 100, "total_code_acceptances": 80,
                         "total_code_lines_suggested": 300, "total_code_lines_accepted": 200},
                        {"name": "rust", "total_code_suggestions": 20,
                         "total_code_acceptances": 5}
                    ]
                }]
            }, {
                "name": "neovim",
                "models": [{"languages": [{"total_code_suggestions": 10}]}]
            }]
        })
        .to_string()
    }

    #[test]
    fn languages_one_row_per_mention() {
        let mut snap = snapshot();
        snap.copilot_ide_code_completions = Some(completions());

        let rows = extract_languages(&snap);
        let names: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["python", "python", "rust", "unknown"]);

        // Top-level mention carries only engaged users.
        assert_eq!(rows[0].total_code_suggestions, 0);
        assert_eq!(rows[1].total_code_lines_accepted, 200);
        assert_eq!(rows[2].total_engaged_users, 0);
    }

    #[test]
    fn languages_from_literal_text() {
        let mut snap = snapshot();
        snap.copilot_ide_code_completions = Some(
            "{'languages': [{'name': 'go', 'total_code_suggestions': 3}], 'editors': None}"
                .to_string(),
        );

        let rows = extract_languages(&snap);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "go");
        assert_eq!(rows[0].total_code_suggestions, 3);
    }

    #[test]
    fn corrupt_document_degrades_to_no_rows() {
        let mut snap = snapshot();
        snap.copilot_ide_code_completions = Some("{broken".to_string());
        snap.copilot_ide_chat = Some("{broken".to_string());

        assert!(extract_languages(&snap).is_empty());
        assert!(extract_editors(&snap).is_empty());
        let chat = extract_chat_summary(&snap);
        assert_eq!(chat.ide_chat_total_chats, 0);
        assert_eq!(extract_daily_acceptance(&snap).acceptance_rate, 0.0);
    }

    #[test]
    fn editors_sum_model_chats() {
        let mut snap = snapshot();
        snap.copilot_ide_chat = Some(
            json!({
                "total_engaged_users": 5,
                "editors": [
                    {"name": "vscode", "total_engaged_users": 4,
                     "models": [{"total_chats": 10}, {"total_chats": 5}]},
                    {"name": "jetbrains", "total_engaged_users": 1, "models": []}
                ]
            })
            .to_string(),
        );

        let rows = extract_editors(&snap);
        assert_eq!(
            rows,
            vec![
                EditorStat {
                    name: "vscode".to_string(),
                    total_engaged_users: 4,
                    total_chats: 15,
                },
                EditorStat {
                    name: "jetbrains".to_string(),
                    total_engaged_users: 1,
                    total_chats: 0,
                },
            ]
        );

        let chat = extract_chat_summary(&snap);
        assert_eq!(chat.ide_chat_engaged_users, 5);
        assert_eq!(chat.ide_chat_total_chats, 15);
        assert_eq!(chat.ide_chat_avg_chats_per_user, 3.0);
    }

    #[test]
    fn chat_summary_with_no_engaged_users() {
        let mut snap = snapshot();
        snap.copilot_ide_chat = Some(r#"{"total_engaged_users": 0, "editors": []}"#.to_string());

        let chat = extract_chat_summary(&snap);
        assert_eq!(chat.ide_chat_total_chats, 0);
        assert_eq!(chat.ide_chat_avg_chats_per_user, 0.0);
        assert!(extract_editors(&snap).is_empty());
    }

    #[test]
    fn dotcom_chat_summary() {
        let mut snap = snapshot();
        snap.copilot_dotcom_chat = Some(
            r#"{"total_engaged_users": 2, "models": [{"name": "default", "total_chats": 9}]}"#
                .to_string(),
        );

        let chat = extract_chat_summary(&snap);
        assert_eq!(chat.dotcom_chat_engaged_users, 2);
        assert_eq!(chat.dotcom_chat_total_chats, 9);
        assert_eq!(chat.dotcom_chat_avg_chats_per_user, 4.5);
        assert_eq!(chat.ide_chat_engaged_users, 0);
    }

    #[test]
    fn daily_acceptance_sums_all_mentions() {
        let mut snap = snapshot();
        snap.copilot_ide_code_completions = Some(completions());

        let daily = extract_daily_acceptance(&snap);
        assert_eq!(daily.total_suggestions, 130);
        assert_eq!(daily.total_acceptances, 85);
        assert!((daily.acceptance_rate - 85.0 / 130.0 * 100.0).abs() < 1e-9);
    }

    #[test]
    fn daily_acceptance_zero_suggestions() {
        let daily = extract_daily_acceptance(&snapshot());
        assert_eq!(daily.total_suggestions, 0);
        assert_eq!(daily.acceptance_rate, 0.0);
    }

    #[test]
    fn pull_request_summary() {
        let mut snap = snapshot();
        snap.copilot_dotcom_pull_requests = Some(
            json!({
                "total_engaged_users": 3,
                "repositories": [
                    {"name": "acme/api", "models": [{"total_pr_summaries_created": 4}]},
                    {"name": "acme/web", "models": [{"total_pr_summaries_created": 2}]}
                ]
            })
            .to_string(),
        );

        let pr = extract_pull_request_summary(&snap);
        assert_eq!(pr.total_engaged_users, 3);
        assert_eq!(pr.total_pr_summaries_created, 6);
    }

    #[test]
    fn huge_counts_saturate_instead_of_overflowing() {
        let mut snap = snapshot();
        snap.copilot_ide_code_completions = Some(
            json!({"languages": [
                {"name": "py", "total_code_suggestions": 1e19},
                {"name": "py", "total_code_suggestions": 1e19}
            ]})
            .to_string(),
        );

        let daily = extract_daily_acceptance(&snap);
        assert_eq!(daily.total_suggestions, i64::MAX);
        assert_eq!(daily.acceptance_rate, 0.0);

        let langs = crate::aggregate::aggregate_languages(&extract_languages(&snap));
        assert_eq!(langs[0].total_code_suggestions, i64::MAX);
    }
}
