pub mod aggregate;
pub mod document;
pub mod fetcher;
pub mod flatten;
pub mod literal;
pub mod logging;
pub mod report;
pub mod sync;

pub use aggregate::{
    acceptance_series, aggregate_editors, aggregate_languages, round2, safe_ratio,
    summarize_period, AcceptanceSeries, PeriodSummary,
};
pub use document::{decode_as, parse_document, DecoderKind, DocumentDecoder, ParsedDocument};
pub use fetcher::{MetricsClient, MetricsSource};
pub use flatten::{
    extract_chat_summary, extract_daily_acceptance, extract_editors, extract_languages,
    extract_pull_request_summary, language_mentions,
};
pub use literal::parse_literal;
pub use logging::init_logging;
pub use report::{build_team_report, HistoryIndex, TeamReport};
pub use sync::{ScopeOutcome, ScopeStatus, SyncReport, Syncer};
