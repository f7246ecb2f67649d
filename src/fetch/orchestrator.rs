//! Resilient fetch orchestrator
//!
//! Wraps one fetch session with the retry policy. Every attempt is
//! classified into a [`PageOutcome`] and the outcome alone decides what
//! happens next:
//!
//! - Network failures, HTTP errors, empty pages and transient error panels
//!   point at a bad endpoint, so the orchestrator rotates to another one.
//!   Halfway through the retry budget the whole federation is reprobed.
//! - Rate limiting points at a bad relationship with one endpoint, so the
//!   orchestrator cools down on the same endpoint, re-binding it after a run
//!   of cooldowns, and only rotates when it has just rotated.
//! - The end-of-feed marker and terminal error panels end the fetch cleanly.

use crate::federation::{EndpointPool, Prober};
use crate::fetch::outcome::{classify, PageOutcome};
use crate::fetch::retry::{RetryPolicy, RetryState};
use crate::fetch::session::{FetchSession, SessionFactory};
use crate::HarvestError;
use rand::rngs::StdRng;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;

/// A page body and the endpoint that served it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    pub endpoint: String,
    pub body: String,
}

/// Final result of one `fetch_page` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// A page with at least one timeline item
    Page(FetchedPage),

    /// The feed ended cleanly
    EndOfFeed,

    /// The content is protected, missing or suspended
    Unavailable(String),

    /// The retry budget ran out
    Exhausted,

    /// A reprobe left no working endpoint
    FederationDown,
}

impl FetchOutcome {
    /// Returns the page, if one was fetched
    pub fn into_page(self) -> Option<FetchedPage> {
        match self {
            Self::Page(page) => Some(page),
            _ => None,
        }
    }
}

/// Drives a fetch session through the retry policy
///
/// One orchestrator serves exactly one collection operation. It owns its
/// session, its copy of the endpoint pool and its random source, so
/// concurrent operations never observe each other's failures.
pub struct Orchestrator {
    pool: EndpointPool,
    sessions: Arc<dyn SessionFactory>,
    prober: Arc<dyn Prober>,
    policy: RetryPolicy,
    session: Option<Box<dyn FetchSession>>,
    rng: StdRng,
}

impl Orchestrator {
    pub fn new(
        pool: EndpointPool,
        sessions: Arc<dyn SessionFactory>,
        prober: Arc<dyn Prober>,
        policy: RetryPolicy,
        rng: StdRng,
    ) -> Self {
        Self {
            pool,
            sessions,
            prober,
            policy,
            session: None,
            rng,
        }
    }

    /// Endpoint the session is currently bound to
    pub fn endpoint(&self) -> Option<&str> {
        self.session.as_ref().map(|session| session.endpoint())
    }

    pub fn pool(&self) -> &EndpointPool {
        &self.pool
    }

    /// Binds a fresh session to `endpoint`, or to a random working endpoint
    ///
    /// # Errors
    ///
    /// Returns `HarvestError::NoEndpoint` when no endpoint is given and the
    /// working set is empty.
    pub fn bind(&mut self, endpoint: Option<&str>) -> Result<(), HarvestError> {
        let endpoint = match endpoint {
            Some(endpoint) => endpoint.to_string(),
            None => self.pool.choose(&mut self.rng, None).ok_or_else(|| {
                if self.pool.is_health_checked() {
                    HarvestError::NoEndpoint("no endpoint passed the health check".to_string())
                } else {
                    HarvestError::NoEndpoint(
                        "health checking is disabled and no endpoint was configured".to_string(),
                    )
                }
            })?,
        };

        self.session = Some(self.sessions.open(&endpoint)?);
        tracing::debug!("Bound session to {}", endpoint);
        Ok(())
    }

    /// Fetches `path`, retrying according to the policy
    ///
    /// `state` carries the counters of the calling operation across pages.
    /// Transient failures never surface as errors; they end in
    /// [`FetchOutcome::Exhausted`] or [`FetchOutcome::FederationDown`].
    pub async fn fetch_page(&mut self, path: &str, max_retries: u32, state: &mut RetryState) -> FetchOutcome {
        let max_retries = max_retries.max(1);

        if self.session.is_none() {
            if let Err(e) = self.bind(None) {
                tracing::warn!("Cannot fetch {}: {}", path, e);
                return FetchOutcome::FederationDown;
            }
        }

        while state.retry_count < max_retries {
            let (endpoint, response) = match self.session.as_ref() {
                Some(session) => (session.endpoint().to_string(), session.get(path).await),
                None => return FetchOutcome::FederationDown,
            };

            let outcome = classify(path, response);
            tracing::debug!("{}{} -> {}", endpoint, path, outcome.label());

            match outcome {
                PageOutcome::Ok(body) => {
                    state.record_success();
                    return FetchOutcome::Page(FetchedPage { endpoint, body });
                }
                PageOutcome::EmptyNoMore => {
                    state.record_success();
                    return FetchOutcome::EndOfFeed;
                }
                PageOutcome::ErrorPanel {
                    message,
                    terminal: true,
                } => {
                    tracing::warn!("{} reports '{}' for {}; not retrying", endpoint, message, path);
                    state.record_success();
                    return FetchOutcome::Unavailable(message);
                }
                PageOutcome::RateLimited => {
                    if state.session_was_reset {
                        tracing::info!("{} is rate limited right after rotating; rotating again", endpoint);
                        self.rotate();
                        state.session_was_reset = false;
                    } else {
                        tracing::info!(
                            "{} is rate limited; cooling down for {:?}",
                            endpoint,
                            self.policy.cooldown_delay
                        );
                        sleep(self.policy.cooldown_delay).await;
                        state.cooldown_count += 1;

                        if state.cooldown_count >= self.policy.cooldown_threshold {
                            tracing::info!(
                                "{} cooldowns on {}; re-binding the same endpoint",
                                state.cooldown_count,
                                endpoint
                            );
                            if let Err(e) = self.bind(Some(&endpoint)) {
                                tracing::warn!("Failed to re-bind {}: {}", endpoint, e);
                            }
                            state.cooldown_count = 0;
                        }
                    }
                    state.retry_count += 1;
                }
                failure => {
                    match &failure {
                        PageOutcome::NetworkFailure(error) => {
                            tracing::warn!("{} unreachable: {}", endpoint, error)
                        }
                        PageOutcome::HttpError(status) => {
                            tracing::warn!("{} returned HTTP {} for {}", endpoint, status, path)
                        }
                        PageOutcome::ErrorPanel { message, .. } => {
                            tracing::warn!("{} reports '{}' for {}", endpoint, message, path)
                        }
                        _ => tracing::warn!("Empty page on {} for {}", endpoint, path),
                    }

                    state.retry_count += 1;

                    if self.pool.is_health_checked() && state.retry_count == max_retries / 2 {
                        self.reprobe().await;
                        if self.pool.is_empty() {
                            tracing::warn!("No endpoint passed the reprobe; the federation appears to be down");
                            state.give_up();
                            return FetchOutcome::FederationDown;
                        }
                    }

                    if state.retry_count < max_retries {
                        self.rotate();
                        state.session_was_reset = true;
                        state.cooldown_count = 0;
                        sleep(self.policy.rotate_delay).await;
                    }
                }
            }

            sleep(self.policy.attempt_delay).await;
        }

        tracing::warn!("Max retries reached for {}. Check the request and try again.", path);
        state.give_up();
        FetchOutcome::Exhausted
    }

    /// Sleeps a random delay between pages of one feed
    pub async fn politeness_pause(&mut self) {
        let (min, max) = self.policy.page_jitter;
        let delay = if max > min {
            self.rng.random_range(min..=max)
        } else {
            min
        };
        sleep(delay).await;
    }

    /// Probes every candidate and replaces the working set with survivors
    pub async fn reprobe(&mut self) {
        tracing::info!("Reprobing {} candidate endpoints", self.pool.candidates().len());
        let passed = self.prober.probe(self.pool.candidates()).await;
        self.pool.replace_working(&passed);
    }

    /// Re-binds to a random working endpoint other than the current one
    fn rotate(&mut self) {
        let current = self.endpoint().map(str::to_string);
        let Some(next) = self.pool.choose(&mut self.rng, current.as_deref()) else {
            tracing::warn!("No working endpoint to rotate to");
            return;
        };

        tracing::info!("Rotating to {}", next);
        if let Err(e) = self.bind(Some(&next)) {
            tracing::warn!("Failed to bind {}: {}", next, e);
        }
    }
}

async fn sleep(duration: Duration) {
    if !duration.is_zero() {
        tokio::time::sleep(duration).await;
    }
}
