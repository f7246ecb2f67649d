//! Post record extraction
//!
//! Turns one `div.timeline-item` (or the `div.quote` nested in it) into a
//! structured [`Record`].

use crate::extract::media::{decode_avatar, decode_gif, decode_picture, decode_video, MediaEncoding};
use crate::extract::{attr_of, first, parse_count, select_all, text_of};
use crate::url::canonical_post_link;
use scraper::ElementRef;
use serde::{Deserialize, Serialize};

/// Author of a post
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub name: String,
    pub username: String,
    pub avatar: String,
}

/// Engagement counters; a missing or blank counter is zero
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub comments: u64,
    pub reposts: u64,
    pub quotes: u64,
    pub likes: u64,
}

/// Media attached to a post, as origin URLs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Media {
    pub pictures: Vec<String>,
    pub videos: Vec<String>,
    pub gifs: Vec<String>,
}

/// A post embedded in another post
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotedRecord {
    pub link: String,
    pub text: String,
    pub user: User,
    pub date: String,
    #[serde(flatten)]
    pub media: Media,
}

/// One post extracted from a feed page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Canonical post link, the identity key
    pub link: String,
    pub text: String,
    pub user: User,
    pub date: String,
    pub is_repost: bool,
    pub is_pinned: bool,
    pub external_link: String,
    pub quoted: Option<QuotedRecord>,
    pub stats: Stats,
    #[serde(flatten)]
    pub media: Media,
}

/// Extracts a record from a timeline item
///
/// Returns `None` when the item has no post link, which happens for
/// placeholder items such as deleted or withheld posts.
pub fn extract_record(item: ElementRef<'_>, encoding: MediaEncoding) -> Option<Record> {
    let link = post_link(item)?;

    let quoted = first(item, "div.quote").and_then(|quote| extract_quoted(quote, encoding));

    let media = first(item, "div.tweet-body > div.attachments")
        .map(|attachments| extract_media(attachments, encoding))
        .unwrap_or_default();

    Some(Record {
        link,
        text: post_text(item),
        user: extract_user(item, encoding),
        date: post_date(item),
        is_repost: first(item, "div.retweet-header").is_some(),
        is_pinned: first(item, "div.pinned").is_some(),
        external_link: attr_of(item, "a.card-container", "href").unwrap_or_default(),
        quoted,
        stats: extract_stats(item),
        media,
    })
}

fn extract_quoted(quote: ElementRef<'_>, encoding: MediaEncoding) -> Option<QuotedRecord> {
    let link = attr_of(quote, "a.quote-link", "href")
        .or_else(|| attr_of(quote, "a[href]", "href"))
        .map(|href| canonical_post_link(&href))?;

    let media = first(quote, "div.attachments")
        .map(|attachments| extract_media(attachments, encoding))
        .unwrap_or_default();

    Some(QuotedRecord {
        link,
        text: post_text(quote),
        user: extract_user(quote, encoding),
        date: post_date(quote),
        media,
    })
}

fn post_link(item: ElementRef<'_>) -> Option<String> {
    attr_of(item, "a.tweet-link", "href")
        .or_else(|| attr_of(item, "a[href]", "href"))
        .filter(|href| !href.is_empty())
        .map(|href| canonical_post_link(&href))
}

/// Post text with in-text links replaced by their full target
fn post_text(scope: ElementRef<'_>) -> String {
    let Some(content) = first(scope, "div.tweet-content").or_else(|| first(scope, "div.quote-text"))
    else {
        return String::new();
    };

    let mut out = String::new();
    push_text(content, &mut out);
    out.trim().replace('\n', " ")
}

fn push_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
        } else if let Some(child) = ElementRef::wrap(child) {
            if child.value().name() == "a" {
                if let Some(href) = child.value().attr("href").filter(|h| h.contains("https")) {
                    out.push_str(href);
                    continue;
                }
            }
            push_text(child, out);
        }
    }
}

fn post_date(scope: ElementRef<'_>) -> String {
    first(scope, "span.tweet-date a")
        .map(|anchor| {
            anchor
                .value()
                .attr("title")
                .map(str::to_string)
                .unwrap_or_else(|| text_of(anchor))
        })
        .unwrap_or_default()
}

fn extract_user(scope: ElementRef<'_>, encoding: MediaEncoding) -> User {
    User {
        name: first(scope, "a.fullname").map(text_of).unwrap_or_default(),
        username: first(scope, "a.username").map(text_of).unwrap_or_default(),
        avatar: attr_of(scope, "img.avatar", "src")
            .and_then(|src| decode_avatar(&src, encoding))
            .unwrap_or_default(),
    }
}

fn extract_stats(item: ElementRef<'_>) -> Stats {
    let counters: Vec<u64> = select_all(item, "span.tweet-stat")
        .into_iter()
        .map(|stat| first(stat, "div").map(text_of).map(|t| parse_count(&t)).unwrap_or(0))
        .collect();
    let counter = |index: usize| counters.get(index).copied().unwrap_or(0);

    Stats {
        comments: counter(0),
        reposts: counter(1),
        quotes: counter(2),
        likes: counter(3),
    }
}

fn extract_media(attachments: ElementRef<'_>, encoding: MediaEncoding) -> Media {
    let pictures = select_all(attachments, "img")
        .into_iter()
        .filter_map(|img| img.value().attr("src"))
        .filter_map(|src| decode_picture(src, encoding))
        .collect();

    let videos = select_all(attachments, "video")
        .into_iter()
        .filter(|video| !video.value().classes().any(|class| class == "gif"))
        .filter_map(|video| video.value().attr("data-url"))
        .filter_map(|url| decode_video(url, encoding))
        .collect();

    let gifs = select_all(attachments, "video.gif source")
        .into_iter()
        .filter_map(|source| source.value().attr("src"))
        .filter_map(|src| decode_gif(src, encoding))
        .collect();

    Media {
        pictures,
        videos,
        gifs,
    }
}
