use std::sync::Arc;

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use cpm_config::Config;
use cpm_core::{build_team_report, init_logging, HistoryIndex, MetricsClient, Syncer};
use cpm_db::{Database, SnapshotRepository};
use cpm_tui::Dashboard;
use cpm_types::PeriodFilter;
use tracing::info;

mod output;

#[derive(Parser)]
#[command(name = "cpm", about = "Copilot Pulse - GitHub Copilot metrics poller", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch organization and team metrics into the local store
    Sync {
        /// Print the sync summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the report for one team
    Report {
        /// Team slug, or "All Organization"
        #[arg(long)]
        team: String,
        /// Restrict to one month (YYYY-MM)
        #[arg(long, conflicts_with = "date")]
        month: Option<String>,
        /// Restrict to one day (YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// List stored teams, months and dates
    History {
        #[arg(long)]
        json: bool,
    },
    /// Open the interactive dashboard
    Dashboard,
}

struct App {
    config: Config,
    db: Arc<Database>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 1. Load config
    let config = Config::load().context("Failed to load configuration")?;

    // 2. Init logging; the dashboard owns the terminal, so it logs to file only
    let console = !matches!(cli.command, Commands::Dashboard);
    init_logging(
        &config.log_level,
        config.log_file.as_deref(),
        config.log_json,
        console,
    );
    info!(org = %config.org_slug, db = %config.db_path.display(), "Configuration loaded");

    // 3. Init database
    let app = open_store(config).await?;

    let result = match cli.command {
        Commands::Sync { json } => sync(&app, json).await,
        Commands::Report {
            team,
            month,
            date,
            json,
        } => {
            let period = match (month, date) {
                (Some(month), _) => PeriodFilter::Month(month),
                (None, Some(date)) => PeriodFilter::Day(date),
                (None, None) => PeriodFilter::All,
            };
            report(&app, &team, &period, json).await
        }
        Commands::History { json } => history(&app, json).await,
        Commands::Dashboard => dashboard(&app).await,
    };

    app.db.close().await;
    result
}

async fn open_store(config: Config) -> anyhow::Result<App> {
    config
        .create_directories()
        .context("Failed to create database directory")?;
    let db = Database::new(&config.db_path)
        .await
        .context("Failed to connect to database")?;
    db.initialize()
        .await
        .context("Failed to initialize database schema")?;
    Ok(App {
        config,
        db: Arc::new(db),
    })
}

fn syncer(app: &App) -> anyhow::Result<Syncer> {
    let client = MetricsClient::new(&app.config).context("Failed to build GitHub client")?;
    Ok(Syncer::new(
        Arc::new(client),
        app.db.clone(),
        app.config.org_slug.clone(),
    ))
}

async fn sync(app: &App, json: bool) -> anyhow::Result<()> {
    let report = syncer(app)?
        .sync()
        .await
        .with_context(|| format!("Failed to sync metrics for {}", app.config.org_slug))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", output::render_sync(&report));
    }
    Ok(())
}

async fn load_history(app: &App) -> anyhow::Result<Option<Vec<cpm_types::MetricSnapshot>>> {
    SnapshotRepository::new(&app.db)
        .load_all()
        .await
        .context("Failed to load stored metrics")
}

async fn report(
    app: &App,
    team: &str,
    period: &PeriodFilter,
    json: bool,
) -> anyhow::Result<()> {
    let history = load_history(app)
        .await?
        .ok_or_else(|| anyhow!("No metrics stored yet; run `cpm sync` first"))?;
    let report = build_team_report(&history, team, period)
        .ok_or_else(|| anyhow!("No data available for {team} on selected {period}"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", output::render_report(&report));
    }
    Ok(())
}

async fn history(app: &App, json: bool) -> anyhow::Result<()> {
    let history = load_history(app).await?.unwrap_or_default();
    let index = HistoryIndex::from_history(&history);

    if json {
        println!("{}", serde_json::to_string_pretty(&index)?);
    } else {
        print!("{}", output::render_history(&index));
    }
    Ok(())
}

async fn dashboard(app: &App) -> anyhow::Result<()> {
    let syncer = syncer(app)?;
    let mut dashboard = Dashboard::new(app.config.org_slug.clone());
    dashboard.set_history(load_history(app).await?);

    let mut terminal = cpm_tui::init_terminal().context("Failed to set up terminal")?;
    let result = dashboard.run(&mut terminal, &syncer, &app.db).await;
    cpm_tui::restore_terminal(&mut terminal).context("Failed to restore terminal")?;
    result
}
