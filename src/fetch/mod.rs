//! Page fetching with endpoint rotation
//!
//! This module handles every content request the crate makes:
//! - Sessions bound to one mirror with the required cookies
//! - Classification of raw responses into page outcomes
//! - The retry, cooldown and rotation policy

mod orchestrator;
mod outcome;
mod retry;
mod session;

#[cfg(test)]
pub(crate) mod scripted;

pub use orchestrator::{FetchOutcome, FetchedPage, Orchestrator};
pub use outcome::{classify, PageOutcome};
pub use retry::{RetryPolicy, RetryState};
pub use session::{
    build_http_client, FetchSession, HttpSession, HttpSessionFactory, RawResponse, SessionFactory,
    SessionSettings, SESSION_COOKIES,
};
