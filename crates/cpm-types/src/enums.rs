use serde::{Deserialize, Serialize};

use crate::snapshot::MetricSnapshot;

/// Period a view is restricted to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum PeriodFilter {
    #[default]
    All,
    /// `YYYY-MM`
    Month(String),
    /// `YYYY-MM-DD`
    Day(String),
}

impl PeriodFilter {
    /// Whether a snapshot falls inside this period.
    pub fn matches(&self, snapshot: &MetricSnapshot) -> bool {
        match self {
            Self::All => true,
            Self::Month(month) => snapshot.month == *month,
            Self::Day(date) => snapshot.date == *date,
        }
    }
}

impl std::fmt::Display for PeriodFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::All => write!(f, "all time"),
            Self::Month(month) => write!(f, "month {month}"),
            Self::Day(date) => write!(f, "day {date}"),
        }
    }
}
