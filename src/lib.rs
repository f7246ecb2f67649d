//! Nitter-Harvest: resilient retrieval from a federation of Nitter mirrors
//!
//! This crate retrieves posts, threads and profile cards from independently
//! operated mirror front-ends that all serve the same HTML layout. Mirrors are
//! health-checked, rotated and cooled down as they fail, and paginated feeds
//! are walked with at-most-once emission per post.

pub mod config;
pub mod extract;
pub mod federation;
pub mod fetch;
pub mod harvest;
pub mod output;
pub mod url;

use thiserror::Error;

/// Main error type for Nitter-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid query: {0}")]
    Query(#[from] QueryError),

    #[error("Endpoint discovery failed at {url}: {message}")]
    Discovery { url: String, message: String },

    #[error("No endpoint available: {0}")]
    NoEndpoint(String),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Errors raised while validating a query, before any request is made
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("Search term cannot be empty")]
    EmptyTerm,

    #[error("Invalid mode '{0}'. Use 'term', 'hashtag', or 'user'")]
    InvalidMode(String),

    #[error("Invalid '{field}' date '{value}'. Use the YYYY-MM-DD format, after 2006-03-21 and not in the future")]
    InvalidDate { field: &'static str, value: String },

    #[error("Unknown filter '{0}'")]
    UnknownFilter(String),

    #[error("Filter '{0}' cannot be both included and excluded")]
    ConflictingFilter(String),

    #[error("Too many parallel queries: {requested} requested, at most {limit} allowed")]
    TooManyQueries { requested: usize, limit: usize },
}

/// Result type alias for Nitter-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

/// Result type alias for query validation
pub type QueryResult<T> = std::result::Result<T, QueryError>;

// Re-export commonly used types
pub use config::Config;
pub use extract::{Profile, Record};
pub use fetch::{FetchOutcome, Orchestrator, PageOutcome, RetryPolicy, RetryState};
pub use harvest::{CollectionResult, Harvester, Query, SearchMode, Termination};
