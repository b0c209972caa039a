use std::path::Path;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::info;

use cpm_types::{PulseError, Result};

/// Async SQLite database connection manager.
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Create a new database connection from file path.
    pub async fn new(path: &Path) -> Result<Self> {
        let opts = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .busy_timeout(std::time::Duration::from_millis(5000));

        // Single writer, single reader.
        let pool = SqlitePoolOptions::new()
            .max_connections(2)
            .connect_with(opts)
            .await
            .map_err(|e| PulseError::Database(format!("Failed to connect: {e}")))?;

        Ok(Self { pool })
    }

    /// Create a new in-memory database (for testing).
    pub async fn in_memory() -> Result<Self> {
        let opts = SqliteConnectOptions::new().filename(":memory:");

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(opts)
            .await
            .map_err(|e| PulseError::Database(format!("Failed to connect: {e}")))?;

        Ok(Self { pool })
    }

    /// Create the snapshot table and its index if absent. Safe to call on
    /// every startup.
    pub async fn initialize(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS metrics (
                date TEXT,
                copilot_ide_chat TEXT,
                total_active_users INTEGER,
                copilot_dotcom_chat TEXT,
                total_engaged_users INTEGER,
                copilot_dotcom_pull_requests TEXT,
                copilot_ide_code_completions TEXT,
                team TEXT,
                timestamp TEXT,
                month TEXT,
                PRIMARY KEY (team, date)
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| PulseError::Database(format!("Create metrics table: {e}")))?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_metrics_month ON metrics(month)")
            .execute(&self.pool)
            .await
            .map_err(|e| PulseError::Database(format!("Create metrics month index: {e}")))?;

        info!("Database schema initialized");
        Ok(())
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the database.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Database connection closed");
    }
}
