use crate::extract::{classify_panel, error_panel, has_timeline_items, is_end_of_feed, PanelKind};
use crate::fetch::session::RawResponse;
use crate::url::is_cursor_path;
use scraper::Html;

/// Classification of one fetch attempt
///
/// Every orchestrator decision is driven by this value, never by raw status
/// codes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    /// Successful page with at least one timeline item
    Ok(String),

    /// Itemless page ending in "Load newest": the valid end of a feed
    EmptyNoMore,

    /// Blank or garbled page; the endpoint is probably degraded
    EmptyRetryable,

    /// The origin reports an error; `terminal` when retrying cannot help
    ErrorPanel { message: String, terminal: bool },

    RateLimited,

    NetworkFailure(String),

    HttpError(u16),
}

impl PageOutcome {
    /// Short label for logs
    pub fn label(&self) -> &'static str {
        match self {
            Self::Ok(_) => "ok",
            Self::EmptyNoMore => "end of feed",
            Self::EmptyRetryable => "empty page",
            Self::ErrorPanel { .. } => "error panel",
            Self::RateLimited => "rate limited",
            Self::NetworkFailure(_) => "network failure",
            Self::HttpError(_) => "http error",
        }
    }
}

/// Classifies a raw response for the request `path`
///
/// # Rules
///
/// | Response | Outcome |
/// |----------|---------|
/// | connection-level failure | `NetworkFailure` |
/// | HTTP 429 | `RateLimited` |
/// | other non-2xx on a cursor continuation | `RateLimited` |
/// | other non-2xx | `HttpError` |
/// | 2xx with timeline items | `Ok` |
/// | 2xx, no items, trailing "Load newest" | `EmptyNoMore` |
/// | 2xx, no items, error panel | `ErrorPanel` (or `RateLimited` if the panel says so) |
/// | 2xx, no items, no panel | `EmptyRetryable` |
pub fn classify(path: &str, response: RawResponse) -> PageOutcome {
    let (status, body) = match response {
        RawResponse::NetworkFailure(error) => return PageOutcome::NetworkFailure(error),
        RawResponse::Http { status, body } => (status, body),
    };

    if status == 429 {
        return PageOutcome::RateLimited;
    }

    if !(200..300).contains(&status) {
        return if is_cursor_path(path) {
            PageOutcome::RateLimited
        } else {
            PageOutcome::HttpError(status)
        };
    }

    let document = Html::parse_document(&body);

    if has_timeline_items(&document) {
        return PageOutcome::Ok(body);
    }

    if is_end_of_feed(&document) {
        return PageOutcome::EmptyNoMore;
    }

    match error_panel(&document) {
        Some(message) => match classify_panel(&message) {
            PanelKind::RateLimited => PageOutcome::RateLimited,
            PanelKind::Terminal => PageOutcome::ErrorPanel {
                message,
                terminal: true,
            },
            PanelKind::Transient => PageOutcome::ErrorPanel {
                message,
                terminal: false,
            },
        },
        None => PageOutcome::EmptyRetryable,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(body: &str) -> RawResponse {
        RawResponse::Http {
            status: 200,
            body: body.to_string(),
        }
    }

    const ITEM_PAGE: &str = r##"<div class="timeline"><div class="timeline-item"><a class="tweet-link" href="/a/status/1#m"></a></div></div>"##;

    #[test]
    fn test_items_are_ok() {
        assert!(matches!(classify("/a", ok(ITEM_PAGE)), PageOutcome::Ok(_)));
    }

    #[test]
    fn test_load_newest_is_end_of_feed() {
        let body = r#"<div class="timeline"><div class="show-more"><a href="/a">Load newest</a></div></div>"#;
        assert_eq!(classify("/a?cursor=X", ok(body)), PageOutcome::EmptyNoMore);
    }

    #[test]
    fn test_blank_page_is_retryable() {
        assert_eq!(classify("/a", ok("")), PageOutcome::EmptyRetryable);
        assert_eq!(
            classify("/a", ok("<html><body><div class=\"timeline\"></div></body></html>")),
            PageOutcome::EmptyRetryable
        );
    }

    #[test]
    fn test_protected_panel_is_terminal() {
        let body = r#"<div class="error-panel"><span>This account's tweets are protected</span></div>"#;
        assert_eq!(
            classify("/a", ok(body)),
            PageOutcome::ErrorPanel {
                message: "This account's tweets are protected".to_string(),
                terminal: true,
            }
        );
    }

    #[test]
    fn test_rate_limit_panel() {
        let body = r#"<div class="error-panel"><span>Instance has been rate limited.</span></div>"#;
        assert_eq!(classify("/a", ok(body)), PageOutcome::RateLimited);
    }

    #[test]
    fn test_status_classification_depends_on_path() {
        let failing = || RawResponse::Http {
            status: 503,
            body: String::new(),
        };
        assert_eq!(
            classify("/search?q=x&cursor=abc", failing()),
            PageOutcome::RateLimited
        );
        assert_eq!(classify("/search?q=x", failing()), PageOutcome::HttpError(503));
    }

    #[test]
    fn test_429_is_rate_limited_anywhere() {
        let response = RawResponse::Http {
            status: 429,
            body: String::new(),
        };
        assert_eq!(classify("/a", response), PageOutcome::RateLimited);
    }

    #[test]
    fn test_network_failure_passes_through() {
        assert_eq!(
            classify("/a", RawResponse::NetworkFailure("Connection refused".into())),
            PageOutcome::NetworkFailure("Connection refused".into())
        );
    }
}
