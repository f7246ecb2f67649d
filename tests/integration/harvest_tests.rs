//! Integration tests for the harvester
//!
//! These tests use wiremock servers as mirrors and run whole operations
//! end-to-end through the reqwest-backed sessions.

use nitter_harvest::config::Config;
use nitter_harvest::harvest::{Harvester, Query, SearchMode, Termination};
use nitter_harvest::HarvestError;
use std::io::Write;
use tempfile::NamedTempFile;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration over the given mirrors, with no delays
fn create_test_config(instances: Vec<String>, skip_instance_check: bool) -> Config {
    let mut config = Config::default();
    config.federation.instances = instances;
    config.federation.skip_instance_check = skip_instance_check;
    config.federation.seed = Some(11);
    config.fetch.attempt_delay_ms = 0;
    config.fetch.rotate_delay_ms = 0;
    config.fetch.cooldown_delay_ms = 0;
    config.fetch.page_jitter_min_ms = 0;
    config.fetch.page_jitter_max_ms = 0;
    config.fetch.request_timeout_ms = 2_000;
    config.fetch.probe_timeout_ms = 1_000;
    config
}

fn item(id: u64) -> String {
    format!(
        r##"<div class="timeline-item"><a class="tweet-link" href="/acct1/status/{id}#m"></a><div class="tweet-body"><div class="tweet-header"><a class="fullname" href="/acct1">Account One</a><a class="username" href="/acct1">@acct1</a><span class="tweet-date"><a href="/acct1/status/{id}#m" title="Jan 10, 2023 · 12:00 PM UTC">Jan 10</a></span></div><div class="tweet-content media-body">post number {id}</div><div class="tweet-stats"><span class="tweet-stat"><div class="icon-container"><span class="icon-comment"></span> 3</div></span></div></div></div>"##
    )
}

fn feed(ids: &[u64]) -> String {
    let items: String = ids.iter().map(|id| item(*id)).collect();
    format!(r#"<html><body><div class="timeline">{}</div></body></html>"#, items)
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body)
        .insert_header("content-type", "text/html")
}

#[tokio::test]
async fn test_date_window_survives_degraded_mirror() {
    let degraded = MockServer::start().await;
    let healthy = MockServer::start().await;

    // Mirror A always serves an empty timeline shell
    Mock::given(method("GET"))
        .respond_with(html(
            r#"<html><body><div class="timeline"></div></body></html>"#.to_string(),
        ))
        .mount(&degraded)
        .await;

    // Mirror B serves one page of two posts with no further cursor
    Mock::given(method("GET"))
        .and(path("/acct1/search"))
        .and(query_param("since", "2023-01-01"))
        .and(query_param("until", "2023-01-31"))
        .respond_with(html(feed(&[1, 2])))
        .mount(&healthy)
        .await;

    let config = create_test_config(vec![degraded.uri(), healthy.uri()], true);
    let harvester = Harvester::connect(&config).await.unwrap();

    let query = Query::new("acct1", SearchMode::User)
        .with_number(1)
        .with_since("2023-01-01")
        .with_until("2023-01-31");
    let result = harvester.posts(&query).await.unwrap();

    assert_eq!(result.records.len(), 2);
    assert_eq!(result.records[0].link, "https://twitter.com/acct1/status/1");
    assert_eq!(result.records[0].text, "post number 1");
    assert_eq!(result.records[0].stats.comments, 3);
    assert_eq!(result.termination, Termination::CursorExhausted);
}

#[tokio::test]
async fn test_pagination_follows_cursor_and_dedups() {
    let mirror = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/acct1"))
        .and(query_param("cursor", "P2"))
        .respond_with(html(feed(&[2, 3])))
        .mount(&mirror)
        .await;

    Mock::given(method("GET"))
        .and(path("/acct1"))
        .respond_with(html(format!(
            r#"<html><body><div class="timeline">{}{}<div class="show-more"><a href="/acct1?cursor=P2">Load more</a></div></div></body></html>"#,
            item(1),
            item(2)
        )))
        .mount(&mirror)
        .await;

    let config = create_test_config(vec![mirror.uri()], true);
    let harvester = Harvester::connect(&config).await.unwrap();

    let result = harvester
        .posts(&Query::new("acct1", SearchMode::User).with_number(10))
        .await
        .unwrap();

    let links: Vec<&str> = result.records.iter().map(|r| r.link.as_str()).collect();
    assert_eq!(
        links,
        vec![
            "https://twitter.com/acct1/status/1",
            "https://twitter.com/acct1/status/2",
            "https://twitter.com/acct1/status/3",
        ]
    );
}

#[tokio::test]
async fn test_session_sends_required_cookies() {
    let mirror = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/acct1"))
        .and(header("cookie", "hlsPlayback=on; infiniteScroll="))
        .respond_with(html(feed(&[1])))
        .mount(&mirror)
        .await;

    let config = create_test_config(vec![mirror.uri()], true);
    let harvester = Harvester::connect(&config).await.unwrap();

    let result = harvester
        .posts(&Query::new("acct1", SearchMode::User).with_number(1))
        .await
        .unwrap();

    assert_eq!(result.records.len(), 1);
    assert_eq!(result.termination, Termination::TargetReached);
}

#[tokio::test]
async fn test_health_check_filters_working_set() {
    let good = MockServer::start().await;
    let bad = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/jack"))
        .respond_with(html(feed(&[1])))
        .mount(&good)
        .await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&bad)
        .await;

    let config = create_test_config(vec![good.uri(), bad.uri()], false);
    let harvester = Harvester::connect(&config).await.unwrap();

    assert_eq!(harvester.pool().candidates().len(), 2);
    assert_eq!(harvester.pool().working(), [good.uri()]);
}

#[tokio::test]
async fn test_protected_account_is_unavailable() {
    let mirror = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/locked"))
        .respond_with(html(
            r#"<html><body><div class="error-panel"><span>This account's tweets are protected</span></div></body></html>"#
                .to_string(),
        ))
        .expect(1)
        .mount(&mirror)
        .await;

    let config = create_test_config(vec![mirror.uri()], true);
    let harvester = Harvester::connect(&config).await.unwrap();

    let result = harvester
        .posts(&Query::new("locked", SearchMode::User))
        .await
        .unwrap();

    assert!(result.is_empty());
    assert!(matches!(result.termination, Termination::Unavailable { .. }));
}

#[tokio::test]
async fn test_discovery_from_directory_page() {
    let directory = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/wiki/Instances"))
        .respond_with(html(
            r#"<html><body>
            <table><tbody><tr><td><a href="/status">status</a></td></tr></tbody></table>
            <table><tbody>
              <tr><td><a href="https://nitter.one">nitter.one</a></td></tr>
              <tr><td><a href="http://x.onion">xyz.onion</a></td></tr>
              <tr><td><a href="https://nitter.two">nitter.two</a></td></tr>
            </tbody></table>
            </body></html>"#
                .to_string(),
        ))
        .mount(&directory)
        .await;

    let mut config = create_test_config(vec![], true);
    config.federation.directory_url = format!("{}/wiki/Instances", directory.uri());
    let harvester = Harvester::connect(&config).await.unwrap();

    assert_eq!(
        harvester.pool().candidates(),
        ["https://nitter.one", "https://nitter.two"]
    );
}

#[tokio::test]
async fn test_discovery_failure_is_fatal() {
    let directory = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&directory)
        .await;

    let mut config = create_test_config(vec![], true);
    config.federation.directory_url = format!("{}/wiki/Instances", directory.uri());

    let result = Harvester::connect(&config).await;
    assert!(matches!(result, Err(HarvestError::Discovery { .. })));
}

#[tokio::test]
async fn test_profile_lookup() {
    let mirror = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/acct1"))
        .respond_with(html(format!(
            r#"<html><body>
            <div class="profile-card">
              <a class="profile-card-avatar" href="/pic/x"><img src="/pic/pbs.twimg.com%2Fprofile_images%2F1%2Fa_400x400.jpg"></a>
              <a class="profile-card-fullname" href="/acct1">Account One</a>
              <a class="profile-card-username" href="/acct1">@acct1</a>
              <div class="profile-bio"><p>hello there</p></div>
              <ul class="profile-statlist">
                <li class="followers"><span class="profile-stat-header">Followers</span><span class="profile-stat-num">1,024</span></li>
              </ul>
            </div>
            <div class="timeline">{}</div>
            </body></html>"#,
            item(1)
        )))
        .mount(&mirror)
        .await;

    let config = create_test_config(vec![mirror.uri()], true);
    let harvester = Harvester::connect(&config).await.unwrap();

    let profile = harvester.profile("@acct1", None).await.unwrap().unwrap();
    assert_eq!(profile.name, "Account One");
    assert_eq!(profile.bio, "hello there");
    assert_eq!(profile.stats.followers, 1024);
    assert_eq!(
        profile.image,
        "https://pbs.twimg.com/profile_images/1/a_400x400.jpg"
    );
}

#[tokio::test]
async fn test_post_by_id() {
    let mirror = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/acct1/status/42"))
        .respond_with(html(format!(
            r#"<html><body><div class="conversation"><div class="main-tweet">{}</div></div></body></html>"#,
            item(42)
        )))
        .mount(&mirror)
        .await;

    let config = create_test_config(vec![mirror.uri()], true);
    let harvester = Harvester::connect(&config).await.unwrap();

    let post = harvester.post_by_id("acct1", "42", None).await.unwrap().unwrap();
    assert_eq!(post.link, "https://twitter.com/acct1/status/42");
    assert_eq!(post.user.username, "@acct1");
}

#[tokio::test]
async fn test_config_file_drives_harvester() {
    let mirror = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "#rust"))
        .respond_with(html(feed(&[5, 6, 7])))
        .mount(&mirror)
        .await;

    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[federation]
instances = ["{}"]
skip-instance-check = true
seed = 5

[fetch]
attempt-delay-ms = 0
rotate-delay-ms = 0
cooldown-delay-ms = 0
page-jitter-min-ms = 0
page-jitter-max-ms = 0
"#,
        mirror.uri()
    )
    .unwrap();

    let config = nitter_harvest::config::load_config(file.path()).unwrap();
    let harvester = Harvester::connect(&config).await.unwrap();

    let result = harvester
        .posts(&Query::new("rust", SearchMode::Hashtag).with_number(2))
        .await
        .unwrap();

    assert_eq!(result.records.len(), 2);
    assert_eq!(result.termination, Termination::TargetReached);
}
