use crate::UrlError;
use url::Url;

/// Host that canonical post links are rebased onto
const ORIGIN_HOST: &str = "https://twitter.com";

/// Normalizes a mirror base URL
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Require an HTTP(S) scheme and a host
/// 3. Lowercase the host
/// 4. Drop query, fragment and any trailing slash
///
/// Request paths are appended directly to the result, so it never ends in `/`.
///
/// # Examples
///
/// ```
/// use nitter_harvest::url::normalize_endpoint;
///
/// let url = normalize_endpoint("https://Nitter.Example.ORG/").unwrap();
/// assert_eq!(url, "https://nitter.example.org");
/// ```
pub fn normalize_endpoint(url_str: &str) -> Result<String, UrlError> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    let host = url.host_str().ok_or(UrlError::MissingHost)?.to_lowercase();
    url.set_host(Some(&host))
        .map_err(|e| UrlError::Parse(format!("Failed to set host: {}", e)))?;

    url.set_query(None);
    url.set_fragment(None);

    Ok(url.as_str().trim_end_matches('/').to_string())
}

/// Builds the canonical link of a post from the href found in mirror markup
///
/// Mirrors link posts as `/<user>/status/<id>#m`; the canonical form is the
/// origin URL with the fragment and query stripped. This link is the identity
/// key used for deduplication.
///
/// # Examples
///
/// ```
/// use nitter_harvest::url::canonical_post_link;
///
/// assert_eq!(
///     canonical_post_link("/jack/status/20#m"),
///     "https://twitter.com/jack/status/20"
/// );
/// ```
pub fn canonical_post_link(href: &str) -> String {
    let href = href.trim();
    let path = match Url::parse(href) {
        // Absolute links (e.g. from a different mirror) keep only their path
        Ok(url) => url.path().to_string(),
        Err(_) => href
            .split(['#', '?'])
            .next()
            .unwrap_or_default()
            .to_string(),
    };

    if path.starts_with('/') {
        format!("{}{}", ORIGIN_HOST, path)
    } else {
        format!("{}/{}", ORIGIN_HOST, path)
    }
}
