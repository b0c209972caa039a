pub mod documents;
pub mod enums;
pub mod error;
pub mod snapshot;
pub mod stats;

// Re-exports for convenience
pub use documents::{
    CodeCompletionsDoc, CompletionEditor, CompletionModel, DotcomChatDoc, IdeChatDoc,
    IdeChatEditor, IdeChatModel, LanguageEntry, PullRequestModel, PullRequestRepository,
    PullRequestsDoc,
};
pub use enums::PeriodFilter;
pub use error::{PulseError, Result};
pub use snapshot::{MetricRecord, MetricSnapshot, Team, ALL_ORGANIZATION};
pub use stats::{
    ChatStat, DailyAcceptance, EditorStat, EditorSummary, LanguageStat, LanguageSummary,
    PullRequestStat,
    saturating_sum,
};
