use crate::extract::{first, select_all, text_of};
use crate::HarvestError;
use reqwest::Client;
use scraper::Html;

/// Fetches the public directory page and returns the listed endpoints
///
/// # Errors
///
/// Returns `HarvestError::Discovery` if the directory cannot be fetched or
/// does not have the expected table layout.
pub async fn discover(client: &Client, directory_url: &str) -> Result<Vec<String>, HarvestError> {
    tracing::info!("Discovering endpoints from {}", directory_url);

    let failure = |message: String| HarvestError::Discovery {
        url: directory_url.to_string(),
        message,
    };

    let response = client
        .get(directory_url)
        .send()
        .await
        .map_err(|e| failure(e.to_string()))?;

    if !response.status().is_success() {
        return Err(failure(format!("HTTP {}", response.status().as_u16())));
    }

    let body = response.text().await.map_err(|e| failure(e.to_string()))?;
    let endpoints = parse_directory(&body)
        .ok_or_else(|| failure("Directory page has no instance table".to_string()))?;

    tracing::info!("Discovered {} clear-web endpoints", endpoints.len());
    Ok(endpoints)
}

/// Parses the directory markup
///
/// The clear-web mirrors are listed in the second table body, one per row,
/// with the hostname as the text of the row's first link. Onion hosts are
/// skipped and every other host gets an `https://` prefix.
pub fn parse_directory(html: &str) -> Option<Vec<String>> {
    let document = Html::parse_document(html);
    let bodies = select_all(document.root_element(), "tbody");
    let table = bodies.get(1)?;

    let endpoints = select_all(*table, "tr")
        .into_iter()
        .filter_map(|row| first(row, "a").map(text_of))
        .filter(|host| !host.is_empty() && !host.ends_with(".onion"))
        .map(|host| format!("https://{}", host.trim_start_matches("https://")))
        .collect();

    Some(endpoints)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIRECTORY: &str = r#"
<html><body>
<table><tbody><tr><td><a href="https://status.example">status</a></td></tr></tbody></table>
<table><tbody>
  <tr><td><a href="https://nitter.one">nitter.one</a></td><td>ok</td></tr>
  <tr><td><a href="http://abc.onion">abcdef.onion</a></td><td>ok</td></tr>
  <tr><td><a href="https://nitter.two">nitter.two</a></td><td>ok</td></tr>
  <tr><td>no link</td></tr>
</tbody></table>
</body></html>"#;

    #[test]
    fn test_parse_directory() {
        assert_eq!(
            parse_directory(DIRECTORY).unwrap(),
            vec!["https://nitter.one", "https://nitter.two"]
        );
    }

    #[test]
    fn test_parse_directory_without_second_table() {
        assert!(parse_directory("<table><tbody></tbody></table>").is_none());
    }
}
