//! Terminal dashboard for stored Copilot metrics.
//!
//! Shows one team over one period: summary figures, daily chat and
//! acceptance trends, and per-language and per-editor breakdowns.

pub mod app;
pub mod ui;

pub use app::{init_terminal, restore_terminal, Action, Dashboard, Focus, PeriodMode, Status, Tui};
