//! URL handling module for Nitter-Harvest
//!
//! This module provides mirror endpoint normalization, the canonical post
//! link used as a deduplication key, and helpers for cursor continuations.

mod normalize;

// Re-export main functions
pub use normalize::{canonical_post_link, normalize_endpoint};

/// Returns true if the request path continues a feed from a cursor
///
/// Mirrors answer rate-limited continuation requests with a plain error
/// status, so the fetch layer needs to know which paths are continuations.
pub fn is_cursor_path(path: &str) -> bool {
    query_part(path)
        .map(|query| {
            query
                .split('&')
                .any(|pair| pair.starts_with("cursor="))
        })
        .unwrap_or(false)
}

/// Returns the query string of a path or href, without the leading `?`
///
/// # Examples
///
/// ```
/// use nitter_harvest::url::query_part;
///
/// assert_eq!(query_part("/search?f=tweets&cursor=abc"), Some("f=tweets&cursor=abc"));
/// assert_eq!(query_part("/jack"), None);
/// ```
pub fn query_part(href: &str) -> Option<&str> {
    href.rsplit_once('?')
        .map(|(_, query)| query)
        .filter(|query| !query.is_empty())
}
