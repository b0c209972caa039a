use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use cpm_db::{Database, SnapshotRepository};
use cpm_types::{Result, ALL_ORGANIZATION};

use crate::fetcher::MetricsSource;

/// Result of syncing one scope (the organization or one team).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScopeStatus {
    Stored { received: usize, inserted: usize },
    NoData,
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScopeOutcome {
    pub team: String,
    #[serde(flatten)]
    pub status: ScopeStatus,
}

/// Summary of one sync run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SyncReport {
    pub teams_listed: usize,
    pub scopes: Vec<ScopeOutcome>,
}

impl SyncReport {
    /// Snapshots newly written across every scope.
    pub fn inserted_total(&self) -> usize {
        self.scopes
            .iter()
            .map(|s| match s.status {
                ScopeStatus::Stored { inserted, .. } => inserted,
                _ => 0,
            })
            .sum()
    }

    pub fn failures(&self) -> impl Iterator<Item = &ScopeOutcome> {
        self.scopes
            .iter()
            .filter(|s| matches!(s.status, ScopeStatus::Failed { .. }))
    }

    fn push(&mut self, team: &str, status: ScopeStatus) {
        self.scopes.push(ScopeOutcome {
            team: team.to_string(),
            status,
        });
    }
}

/// Pulls metrics for an organization and all its teams into the store.
pub struct Syncer {
    source: Arc<dyn MetricsSource>,
    db: Arc<Database>,
    org: String,
}

impl Syncer {
    pub fn new(source: Arc<dyn MetricsSource>, db: Arc<Database>, org: impl Into<String>) -> Self {
        Self {
            source,
            db,
            org: org.into(),
        }
    }

    /// Fetch and store organization-wide metrics, then every team's.
    ///
    /// Fails only when the teams listing fails; any single scope failing is
    /// recorded in the report and the remaining scopes still run.
    pub async fn sync(&self) -> Result<SyncReport> {
        info!(org = %self.org, "Sync started");

        let teams = self.source.list_teams(&self.org).await?;
        let mut report = SyncReport {
            teams_listed: teams.len(),
            scopes: Vec::with_capacity(teams.len() + 1),
        };

        let status = self.sync_scope(None, ALL_ORGANIZATION).await;
        report.push(ALL_ORGANIZATION, status);

        for team in &teams {
            let status = self.sync_scope(Some(&team.slug), &team.slug).await;
            report.push(&team.slug, status);
        }

        let failed = report.failures().count();
        info!(
            org = %self.org,
            teams = report.teams_listed,
            inserted = report.inserted_total(),
            failed,
            "Sync finished"
        );
        Ok(report)
    }

    async fn sync_scope(&self, slug: Option<&str>, label: &str) -> ScopeStatus {
        let records = match self.source.fetch_metrics(&self.org, slug).await {
            Ok(Some(records)) => records,
            Ok(None) => {
                debug!(team = label, "Skipping scope without metrics");
                return ScopeStatus::NoData;
            }
            Err(e) => {
                warn!(team = label, error = %e, "Fetch failed, skipping scope");
                return ScopeStatus::Failed {
                    error: e.to_string(),
                };
            }
        };

        let repo = SnapshotRepository::new(&self.db);
        match repo.upsert(label, &records).await {
            Ok(inserted) => ScopeStatus::Stored {
                received: records.len(),
                inserted: inserted.len(),
            },
            Err(e) => {
                warn!(team = label, error = %e, "Store failed, skipping scope");
                ScopeStatus::Failed {
                    error: e.to_string(),
                }
            }
        }
    }
}
