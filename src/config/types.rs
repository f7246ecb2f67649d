use serde::Deserialize;
use std::time::Duration;

/// Default directory listing the public mirrors
pub const DEFAULT_DIRECTORY_URL: &str = "https://github.com/zedeus/nitter/wiki/Instances";

/// Default browser-like user agent sent to every mirror
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; rv:108.0) Gecko/20100101 Firefox/108.0";

/// Main configuration structure for Nitter-Harvest
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub federation: FederationConfig,
    pub fetch: FetchConfig,
    pub dispatch: DispatchConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
}

/// Where candidate endpoints come from and how they are checked
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FederationConfig {
    /// Directory page listing public mirrors
    #[serde(rename = "directory-url")]
    pub directory_url: String,

    /// Explicit candidate endpoints; discovery is skipped when non-empty
    pub instances: Vec<String>,

    /// Disables health checking: every candidate is treated as working
    #[serde(rename = "skip-instance-check")]
    pub skip_instance_check: bool,

    /// Always-present page used to probe a mirror
    #[serde(rename = "probe-path")]
    pub probe_path: String,

    /// Seed for endpoint selection and jitter
    pub seed: Option<u64>,
}

impl Default for FederationConfig {
    fn default() -> Self {
        Self {
            directory_url: DEFAULT_DIRECTORY_URL.to_string(),
            instances: Vec::new(),
            skip_instance_check: false,
            probe_path: "/jack".to_string(),
            seed: None,
        }
    }
}

/// Fetch timing and retry budget
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Attempts per page before giving up
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// Timeout for content page requests (milliseconds)
    #[serde(rename = "request-timeout-ms")]
    pub request_timeout_ms: u64,

    /// Timeout for health probe requests (milliseconds)
    #[serde(rename = "probe-timeout-ms")]
    pub probe_timeout_ms: u64,

    /// Politeness delay after every attempt (milliseconds)
    #[serde(rename = "attempt-delay-ms")]
    pub attempt_delay_ms: u64,

    /// Delay after rotating to a new endpoint (milliseconds)
    #[serde(rename = "rotate-delay-ms")]
    pub rotate_delay_ms: u64,

    /// Wait after a rate-limited response (milliseconds)
    #[serde(rename = "cooldown-delay-ms")]
    pub cooldown_delay_ms: u64,

    /// Consecutive cooldowns before the session is re-bound
    #[serde(rename = "cooldown-threshold")]
    pub cooldown_threshold: u32,

    /// Lower bound of the jitter between pages (milliseconds)
    #[serde(rename = "page-jitter-min-ms")]
    pub page_jitter_min_ms: u64,

    /// Upper bound of the jitter between pages (milliseconds)
    #[serde(rename = "page-jitter-max-ms")]
    pub page_jitter_max_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            request_timeout_ms: 5_000,
            probe_timeout_ms: 3_000,
            attempt_delay_ms: 1_000,
            rotate_delay_ms: 1_000,
            cooldown_delay_ms: 10_000,
            cooldown_threshold: 5,
            page_jitter_min_ms: 1_000,
            page_jitter_max_ms: 2_000,
        }
    }
}

impl FetchConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

/// Bounds for running several collections at once
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Upper bound on parallel operations, capped by host parallelism
    #[serde(rename = "max-parallel")]
    pub max_parallel: Option<usize>,

    /// Per-operation timeout (seconds)
    #[serde(rename = "task-timeout-secs")]
    pub task_timeout_secs: Option<u64>,
}

/// User agent identification
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserAgentConfig {
    pub value: String,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            value: DEFAULT_USER_AGENT.to_string(),
        }
    }
}
