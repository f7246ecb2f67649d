//! Configuration module for Nitter-Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every section is optional; a missing file section falls back to defaults.
//!
//! # Example
//!
//! ```no_run
//! use nitter_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Retries per page: {}", config.fetch.max_retries);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, DispatchConfig, FederationConfig, FetchConfig, UserAgentConfig,
    DEFAULT_DIRECTORY_URL, DEFAULT_USER_AGENT,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use validation::validate;
