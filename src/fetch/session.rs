//! HTTP fetch session
//!
//! A session is bound to exactly one mirror and performs single GET requests
//! against it. It never retries and never classifies content; it only
//! separates connection-level failures from HTTP responses.

use crate::config::Config;
use crate::url::normalize_endpoint;
use crate::HarvestError;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, COOKIE};
use reqwest::Client;
use std::time::Duration;

/// Cookies that unlock content the origin only renders with JavaScript
pub const SESSION_COOKIES: &str = "hlsPlayback=on; infiniteScroll=";

/// Upper bound on the TCP/TLS connect phase
const MAX_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Raw result of one GET request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawResponse {
    /// The mirror answered; status and body are passed through untouched
    Http { status: u16, body: String },

    /// Connection refused, timeout, TLS failure, truncated body...
    NetworkFailure(String),
}

/// A fetch capability bound to one endpoint
#[async_trait]
pub trait FetchSession: Send + Sync {
    /// Base URL this session is bound to
    fn endpoint(&self) -> &str;

    /// Performs exactly one GET of `path` against the bound endpoint
    async fn get(&self, path: &str) -> RawResponse;
}

/// Opens fresh sessions; every call yields new client state
pub trait SessionFactory: Send + Sync {
    fn open(&self, endpoint: &str) -> Result<Box<dyn FetchSession>, HarvestError>;
}

/// Settings shared by every HTTP client the crate builds
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub user_agent: String,
    pub request_timeout: Duration,
    pub probe_timeout: Duration,
}

impl SessionSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            user_agent: config.user_agent.value.clone(),
            request_timeout: config.fetch.request_timeout(),
            probe_timeout: config.fetch.probe_timeout(),
        }
    }
}

/// Builds an HTTP client with the fixed user agent and session cookies
///
/// # Example
///
/// ```no_run
/// use nitter_harvest::fetch::build_http_client;
/// use std::time::Duration;
///
/// let client = build_http_client("Mozilla/5.0", Duration::from_secs(5)).unwrap();
/// ```
pub fn build_http_client(user_agent: &str, timeout: Duration) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    headers.insert(COOKIE, HeaderValue::from_static(SESSION_COOKIES));

    Client::builder()
        .user_agent(user_agent)
        .default_headers(headers)
        .timeout(timeout)
        .connect_timeout(timeout.min(MAX_CONNECT_TIMEOUT))
        .gzip(true)
        .brotli(true)
        .build()
}

/// A reqwest-backed session
#[derive(Debug)]
pub struct HttpSession {
    endpoint: String,
    client: Client,
}

impl HttpSession {
    /// Binds a new session (and a new client) to `endpoint`
    pub fn open(endpoint: &str, settings: &SessionSettings) -> Result<Self, HarvestError> {
        Ok(Self {
            endpoint: normalize_endpoint(endpoint)?,
            client: build_http_client(&settings.user_agent, settings.request_timeout)?,
        })
    }
}

#[async_trait]
impl FetchSession for HttpSession {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn get(&self, path: &str) -> RawResponse {
        let url = format!("{}{}", self.endpoint, path);
        tracing::trace!("GET {}", url);

        match self.client.get(&url).send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                match response.text().await {
                    Ok(body) => RawResponse::Http { status, body },
                    Err(e) => RawResponse::NetworkFailure(format!("Failed to read body: {}", e)),
                }
            }
            Err(e) => {
                if e.is_timeout() {
                    RawResponse::NetworkFailure("Request timeout".to_string())
                } else if e.is_connect() {
                    RawResponse::NetworkFailure("Connection refused".to_string())
                } else {
                    RawResponse::NetworkFailure(e.to_string())
                }
            }
        }
    }
}

/// Opens [`HttpSession`]s
#[derive(Debug, Clone)]
pub struct HttpSessionFactory {
    settings: SessionSettings,
}

impl HttpSessionFactory {
    pub fn new(settings: SessionSettings) -> Self {
        Self { settings }
    }
}

impl SessionFactory for HttpSessionFactory {
    fn open(&self, endpoint: &str) -> Result<Box<dyn FetchSession>, HarvestError> {
        Ok(Box::new(HttpSession::open(endpoint, &self.settings)?))
    }
}
