//! Collections and lookups over the federation
//!
//! This module contains everything above a single page fetch:
//! - Query validation and request path building
//! - The pagination collector (dedup, threads, stop conditions)
//! - Bounded parallel dispatch of independent operations
//! - The [`Harvester`] facade used by the binary

mod collector;
mod coordinator;
mod dispatch;
mod query;
mod result;

pub use collector::Collector;
pub use coordinator::Harvester;
pub use dispatch::{dispatch, host_parallelism, DispatchLimits, TaskOutcome};
pub use query::{normalize_username, PathShape, Query, QueryPlan, SearchMode, DEFAULT_NUMBER, FILTERS};
pub use result::{CollectionResult, Termination};
