use std::collections::HashSet;

use chrono::Local;
use tracing::{debug, info, warn};

use cpm_types::snapshot::month_of;
use cpm_types::{MetricRecord, MetricSnapshot, PulseError, Result};

use crate::connection::Database;

/// Repository for per-team daily metric snapshots.
pub struct SnapshotRepository<'a> {
    db: &'a Database,
}

impl<'a> SnapshotRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Store the records of one team, skipping dates already present.
    ///
    /// Returns the snapshots actually inserted; an empty or fully duplicate
    /// batch writes nothing and returns an empty vector.
    pub async fn upsert(&self, team: &str, records: &[MetricRecord]) -> Result<Vec<MetricSnapshot>> {
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let snapshots = records
            .iter()
            .map(|r| to_snapshot(team, r, &timestamp))
            .collect::<Result<Vec<_>>>()?;

        let mut seen: HashSet<String> = self.existing_dates(team).await?.into_iter().collect();
        let fresh: Vec<MetricSnapshot> = snapshots
            .into_iter()
            .filter(|s| seen.insert(s.date.clone()))
            .collect();

        if fresh.is_empty() {
            debug!(team, incoming = records.len(), "No new dates to store");
            return Ok(fresh);
        }

        let mut tx = self
            .db
            .pool()
            .begin()
            .await
            .map_err(|e| PulseError::Database(format!("Begin upsert: {e}")))?;

        for snap in &fresh {
            sqlx::query(
                "INSERT OR IGNORE INTO metrics
                 (date, copilot_ide_chat, total_active_users, copilot_dotcom_chat,
                  total_engaged_users, copilot_dotcom_pull_requests,
                  copilot_ide_code_completions, team, timestamp, month)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&snap.date)
            .bind(&snap.copilot_ide_chat)
            .bind(snap.total_active_users)
            .bind(&snap.copilot_dotcom_chat)
            .bind(snap.total_engaged_users)
            .bind(&snap.copilot_dotcom_pull_requests)
            .bind(&snap.copilot_ide_code_completions)
            .bind(&snap.team)
            .bind(&snap.timestamp)
            .bind(&snap.month)
            .execute(&mut *tx)
            .await
            .map_err(|e| PulseError::Database(format!("Insert snapshot: {e}")))?;
        }

        tx.commit()
            .await
            .map_err(|e| PulseError::Database(format!("Commit upsert: {e}")))?;

        info!(
            team,
            incoming = records.len(),
            inserted = fresh.len(),
            "Stored metric snapshots"
        );
        Ok(fresh)
    }

    /// Dates already stored for a team.
    pub async fn existing_dates(&self, team: &str) -> Result<Vec<String>> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT date FROM metrics WHERE team = ? AND date IS NOT NULL")
                .bind(team)
                .fetch_all(self.db.pool())
                .await
                .map_err(|e| PulseError::Database(format!("Get existing dates: {e}")))?;

        Ok(rows.into_iter().map(|(d,)| d).collect())
    }

    /// Every stored snapshot, or `None` when nothing was ever ingested.
    pub async fn load_all(&self) -> Result<Option<Vec<MetricSnapshot>>> {
        let rows: Vec<SnapshotRow> = sqlx::query_as(
            "SELECT team, date, month, timestamp, total_active_users, total_engaged_users,
                    copilot_ide_chat, copilot_dotcom_chat, copilot_dotcom_pull_requests,
                    copilot_ide_code_completions
             FROM metrics ORDER BY team ASC, date ASC",
        )
        .fetch_all(self.db.pool())
        .await
        .map_err(|e| PulseError::Database(format!("Load all snapshots: {e}")))?;

        let total = rows.len();
        let snapshots: Vec<MetricSnapshot> = rows.into_iter().filter_map(row_to_snapshot).collect();
        if snapshots.len() < total {
            warn!(
                skipped = total - snapshots.len(),
                "Skipped stored rows without team or date"
            );
        }

        if snapshots.is_empty() {
            return Ok(None);
        }
        Ok(Some(snapshots))
    }

    /// Distinct team labels, ascending.
    pub async fn teams(&self) -> Result<Vec<String>> {
        self.distinct("SELECT DISTINCT team FROM metrics WHERE team IS NOT NULL ORDER BY team ASC")
            .await
    }

    /// Distinct months, most recent first.
    pub async fn months(&self) -> Result<Vec<String>> {
        self.distinct(
            "SELECT DISTINCT month FROM metrics WHERE month IS NOT NULL ORDER BY month DESC",
        )
        .await
    }

    /// Distinct dates, most recent first.
    pub async fn dates(&self) -> Result<Vec<String>> {
        self.distinct("SELECT DISTINCT date FROM metrics WHERE date IS NOT NULL ORDER BY date DESC")
            .await
    }

    /// Number of stored snapshots.
    pub async fn count(&self) -> Result<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM metrics")
            .fetch_one(self.db.pool())
            .await
            .map_err(|e| PulseError::Database(format!("Count snapshots: {e}")))?;
        Ok(row.0)
    }

    async fn distinct(&self, query: &str) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(query)
            .fetch_all(self.db.pool())
            .await
            .map_err(|e| PulseError::Database(format!("Distinct query: {e}")))?;
        Ok(rows.into_iter().map(|(v,)| v).collect())
    }
}

/// Stamp a raw API record for storage, encoding nested documents as JSON text.
fn to_snapshot(team: &str, record: &MetricRecord, timestamp: &str) -> Result<MetricSnapshot> {
    Ok(MetricSnapshot {
        team: team.to_string(),
        date: record.date.clone(),
        month: month_of(&record.date)?,
        timestamp: timestamp.to_string(),
        total_active_users: record.total_active_users,
        total_engaged_users: record.total_engaged_users,
        copilot_ide_chat: encode(&record.copilot_ide_chat)?,
        copilot_dotcom_chat: encode(&record.copilot_dotcom_chat)?,
        copilot_dotcom_pull_requests: encode(&record.copilot_dotcom_pull_requests)?,
        copilot_ide_code_completions: encode(&record.copilot_ide_code_completions)?,
    })
}

fn encode(doc: &Option<serde_json::Value>) -> Result<Option<String>> {
    match doc {
        None | Some(serde_json::Value::Null) => Ok(None),
        // Already text (e.g. re-imported data): keep as is.
        Some(serde_json::Value::String(s)) => Ok(Some(s.clone())),
        Some(value) => Ok(Some(serde_json::to_string(value)?)),
    }
}

#[derive(sqlx::FromRow)]
struct SnapshotRow {
    team: Option<String>,
    date: Option<String>,
    month: Option<String>,
    timestamp: Option<String>,
    total_active_users: Option<i64>,
    total_engaged_users: Option<i64>,
    copilot_ide_chat: Option<String>,
    copilot_dotcom_chat: Option<String>,
    copilot_dotcom_pull_requests: Option<String>,
    copilot_ide_code_completions: Option<String>,
}

/// `None` for rows missing part of their key.
fn row_to_snapshot(row: SnapshotRow) -> Option<MetricSnapshot> {
    let (team, date) = (row.team?, row.date?);
    let month = row
        .month
        .or_else(|| month_of(&date).ok())
        .unwrap_or_default();

    Some(MetricSnapshot {
        team,
        date,
        month,
        timestamp: row.timestamp.unwrap_or_default(),
        total_active_users: row.total_active_users.unwrap_or(0),
        total_engaged_users: row.total_engaged_users.unwrap_or(0),
        copilot_ide_chat: row.copilot_ide_chat,
        copilot_dotcom_chat: row.copilot_dotcom_chat,
        copilot_dotcom_pull_requests: row.copilot_dotcom_pull_requests,
        copilot_ide_code_completions: row.copilot_ide_code_completions,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::connection::Database;

    async fn setup() -> Database {
        let db = Database::in_memory().await.unwrap();
        db.initialize().await.unwrap();
        db
    }

    fn make_record(date: &str) -> MetricRecord {
        MetricRecord {
            date: date.to_string(),
            total_active_users: 10,
            total_engaged_users: 7,
            copilot_ide_chat: Some(json!({"total_engaged_users": 3, "editors": []})),
            copilot_dotcom_chat: None,
            copilot_dotcom_pull_requests: None,
            copilot_ide_code_completions: Some(json!({"languages": [{"name": "rust"}]})),
        }
    }

    #[tokio::test]
    async fn upsert_and_load() {
        let db = setup().await;
        let repo = SnapshotRepository::new(&db);

        let inserted = repo
            .upsert("core", &[make_record("2024-11-01"), make_record("2024-11-02")])
            .await
            .unwrap();
        assert_eq!(inserted.len(), 2);

        let all = repo.load_all().await.unwrap().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].team, "core");
        assert_eq!(all[0].date, "2024-11-01");
        assert_eq!(all[0].month, "2024-11");
        assert_eq!(all[0].total_active_users, 10);
        assert!(all[0].copilot_dotcom_chat.is_none());

        let chat: serde_json::Value =
            serde_json::from_str(all[0].copilot_ide_chat.as_deref().unwrap()).unwrap();
        assert_eq!(chat["total_engaged_users"], 3);
    }

    #[tokio::test]
    async fn upsert_same_key_twice_keeps_one_row() {
        let db = setup().await;
        let repo = SnapshotRepository::new(&db);

        repo.upsert("core", &[make_record("2024-11-01")]).await.unwrap();
        let second = repo.upsert("core", &[make_record("2024-11-01")]).await.unwrap();

        assert!(second.is_empty());
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn upsert_stores_only_new_dates() {
        let db = setup().await;
        let repo = SnapshotRepository::new(&db);

        repo.upsert("core", &[make_record("2024-11-01"), make_record("2024-11-02")])
            .await
            .unwrap();
        let before = repo.count().await.unwrap();

        let inserted = repo
            .upsert(
                "core",
                &[
                    make_record("2024-11-02"),
                    make_record("2024-11-03"),
                    make_record("2024-11-04"),
                ],
            )
            .await
            .unwrap();

        let dates: Vec<&str> = inserted.iter().map(|s| s.date.as_str()).collect();
        assert_eq!(dates, vec!["2024-11-03", "2024-11-04"]);
        assert_eq!(repo.count().await.unwrap(), before + 2);
    }

    #[tokio::test]
    async fn upsert_dedups_within_batch() {
        let db = setup().await;
        let repo = SnapshotRepository::new(&db);

        let inserted = repo
            .upsert("core", &[make_record("2024-11-01"), make_record("2024-11-01")])
            .await
            .unwrap();
        assert_eq!(inserted.len(), 1);
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn same_date_different_teams() {
        let db = setup().await;
        let repo = SnapshotRepository::new(&db);

        repo.upsert("core", &[make_record("2024-11-01")]).await.unwrap();
        repo.upsert("web", &[make_record("2024-11-01")]).await.unwrap();

        assert_eq!(repo.count().await.unwrap(), 2);
        assert_eq!(repo.teams().await.unwrap(), vec!["core", "web"]);
    }

    #[tokio::test]
    async fn upsert_empty_batch_is_noop() {
        let db = setup().await;
        let repo = SnapshotRepository::new(&db);

        let inserted = repo.upsert("core", &[]).await.unwrap();
        assert!(inserted.is_empty());
        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn upsert_rejects_invalid_date() {
        let db = setup().await;
        let repo = SnapshotRepository::new(&db);

        let result = repo
            .upsert("core", &[make_record("2024-11-01"), make_record("not-a-date")])
            .await;
        assert!(matches!(result, Err(PulseError::Validation(_))));
        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn load_all_empty_signals_no_data() {
        let db = setup().await;
        let repo = SnapshotRepository::new(&db);

        assert!(repo.load_all().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn load_all_skips_rows_with_null_key() {
        let db = setup().await;
        let repo = SnapshotRepository::new(&db);
        repo.upsert("core", &[make_record("2024-11-01")])
            .await
            .unwrap();

        sqlx::query("INSERT INTO metrics (team, date, total_active_users) VALUES (NULL, ?, 1)")
            .bind("2024-11-02")
            .execute(db.pool())
            .await
            .unwrap();
        sqlx::query("INSERT INTO metrics (team, date) VALUES ('web', NULL)")
            .execute(db.pool())
            .await
            .unwrap();

        let all = repo.load_all().await.unwrap().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].team, "core");
        assert_eq!(repo.existing_dates("web").await.unwrap(), Vec::<String>::new());
    }

    #[tokio::test]
    async fn load_all_only_null_keys_is_no_data() {
        let db = setup().await;
        sqlx::query("INSERT INTO metrics (team, date) VALUES (NULL, NULL)")
            .execute(db.pool())
            .await
            .unwrap();

        assert!(SnapshotRepository::new(&db).load_all().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn months_and_dates_descending() {
        let db = setup().await;
        let repo = SnapshotRepository::new(&db);

        repo.upsert(
            "core",
            &[
                make_record("2024-10-30"),
                make_record("2024-11-02"),
                make_record("2024-11-01"),
            ],
        )
        .await
        .unwrap();

        assert_eq!(repo.months().await.unwrap(), vec!["2024-11", "2024-10"]);
        assert_eq!(
            repo.dates().await.unwrap(),
            vec!["2024-11-02", "2024-11-01", "2024-10-30"]
        );
    }

    #[test]
    fn encode_keeps_text_documents() {
        let text = Some(serde_json::Value::String("{'a': 1}".to_string()));
        assert_eq!(encode(&text).unwrap().as_deref(), Some("{'a': 1}"));
        assert_eq!(encode(&Some(serde_json::Value::Null)).unwrap(), None);
    }
}
