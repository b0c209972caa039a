use std::path::PathBuf;
use std::time::Duration;

use cpm_types::{PulseError, Result};

/// File name of the SQLite store inside `DB_PATH`.
pub const DB_FILE_NAME: &str = "copilot_metrics.db";

/// Application configuration.
///
/// Loaded once at startup and passed by value or reference to every component
/// that needs it.
#[derive(Debug, Clone)]
pub struct Config {
    // GitHub
    pub github_token: String,
    pub org_slug: String,
    pub api_url: String,
    pub api_version: String,
    /// Unset leaves the HTTP client without a request timeout.
    pub http_timeout: Option<Duration>,

    // Storage
    pub db_dir: PathBuf,
    pub db_path: PathBuf,

    // Logging
    pub log_level: String,
    pub log_file: Option<PathBuf>,
    pub log_json: bool,
}

impl Config {
    /// Load configuration from environment variables (with dotenvy).
    pub fn load() -> Result<Self> {
        // Load .env file if it exists (ignore errors, the file is optional)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// `GITHUB_TOKEN` and `ORG_SLUG` are required; everything else has a
    /// default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let env = Env(&lookup);

        let github_token = env
            .opt("GITHUB_TOKEN")
            .ok_or_else(|| PulseError::Config("GITHUB_TOKEN is not set".to_string()))?;
        let org_slug = env
            .opt("ORG_SLUG")
            .ok_or_else(|| PulseError::Config("ORG_SLUG is not set".to_string()))?;

        let db_dir = env
            .opt("DB_PATH")
            .map(|p| match p.trim_end_matches('/') {
                "" => PathBuf::from("/"),
                trimmed => PathBuf::from(trimmed),
            })
            .unwrap_or_else(|| PathBuf::from("."));
        let db_path = db_dir.join(DB_FILE_NAME);

        Ok(Config {
            github_token,
            org_slug,
            api_url: env
                .or("GITHUB_API_URL", || "https://api.github.com".to_string())
                .trim_end_matches('/')
                .to_string(),
            api_version: env.or("GITHUB_API_VERSION", || "2022-11-28".to_string()),
            http_timeout: env.u64("HTTP_TIMEOUT").map(Duration::from_secs),

            db_dir,
            db_path,

            log_level: env.or("LOG_LEVEL", || "info".to_string()),
            log_file: env.opt("LOG_FILE").map(PathBuf::from),
            log_json: env.bool("LOG_JSON", false),
        })
    }

    /// Create the directory holding the database file.
    pub fn create_directories(&self) -> Result<()> {
        std::fs::create_dir_all(&self.db_dir).map_err(|e| {
            PulseError::Config(format!(
                "Failed to create directory {}: {e}",
                self.db_dir.display()
            ))
        })?;
        tracing::debug!(dir = %self.db_dir.display(), "Storage directory ready");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Env helpers
// ---------------------------------------------------------------------------

struct Env<'a, F: Fn(&str) -> Option<String>>(&'a F);

impl<F: Fn(&str) -> Option<String>> Env<'_, F> {
    fn opt(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|s| !s.trim().is_empty())
    }

    fn or(&self, key: &str, default: impl FnOnce() -> String) -> String {
        self.opt(key).unwrap_or_else(default)
    }

    fn bool(&self, key: &str, default: bool) -> bool {
        self.opt(key)
            .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
            .unwrap_or(default)
    }

    fn u64(&self, key: &str) -> Option<u64> {
        self.opt(key).and_then(|v| v.parse().ok())
    }
}
