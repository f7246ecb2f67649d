use crate::extract::Record;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a collection stopped
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Termination {
    /// The combined record and thread count met the target
    TargetReached,

    /// The last page carried no cursor to follow
    #[default]
    CursorExhausted,

    /// The origin served its end-of-feed marker
    EndOfFeed,

    /// Protected, missing or suspended content
    Unavailable { message: String },

    RetriesExhausted,

    /// No endpoint survived a reprobe
    FederationDown,

    /// Cancelled or timed out at the dispatch boundary
    Cancelled,
}

impl Termination {
    /// Returns true if the collection ended without a fetch failure
    pub fn is_clean(&self) -> bool {
        matches!(self, Self::TargetReached | Self::CursorExhausted | Self::EndOfFeed)
    }

    /// Stable short name, as used in statistics
    pub fn name(&self) -> &'static str {
        match self {
            Self::TargetReached => "target_reached",
            Self::CursorExhausted => "cursor_exhausted",
            Self::EndOfFeed => "end_of_feed",
            Self::Unavailable { .. } => "unavailable",
            Self::RetriesExhausted => "retries_exhausted",
            Self::FederationDown => "federation_down",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable { message } => write!(f, "unavailable ({})", message),
            other => f.write_str(&other.name().replace('_', " ")),
        }
    }
}

/// Records and threads collected by one operation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionResult {
    pub records: Vec<Record>,
    pub threads: Vec<Vec<Record>>,
    pub termination: Termination,
}

impl CollectionResult {
    /// An empty result that stopped for `termination`
    pub fn terminated(termination: Termination) -> Self {
        Self {
            termination,
            ..Self::default()
        }
    }

    /// Combined count of records and threads, as compared to the target
    pub fn len(&self) -> usize {
        self.records.len() + self.threads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
