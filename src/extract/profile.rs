use crate::extract::media::{decode_segment, MediaEncoding};
use crate::extract::{attr_of, first, parse_count, select_all, text_of};
use scraper::{ElementRef, Html};
use serde::{Deserialize, Serialize};

/// Counters shown on a profile card
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileStats {
    pub posts: u64,
    pub following: u64,
    pub followers: u64,
    pub likes: u64,
    pub media: u64,
}

/// A user's profile card
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub image: String,
    pub name: String,
    pub username: String,
    /// Numeric account id, recovered from the banner URL when present
    pub id: String,
    pub bio: String,
    pub location: String,
    pub website: String,
    pub joined: String,
    pub stats: ProfileStats,
}

/// Extracts the profile card from a user page
///
/// Returns `None` when the page has no profile card.
pub fn extract_profile(document: &Html, encoding: MediaEncoding) -> Option<Profile> {
    let root = document.root_element();
    let name = first(root, "a.profile-card-fullname").map(text_of)?;

    Some(Profile {
        image: attr_of(root, "a.profile-card-avatar img", "src")
            .and_then(|src| profile_image(&src, encoding))
            .unwrap_or_default(),
        name,
        username: first(root, "a.profile-card-username")
            .map(text_of)
            .unwrap_or_default(),
        id: attr_of(root, "div.profile-banner img", "src")
            .and_then(|src| account_id(&src, encoding))
            .unwrap_or_default(),
        bio: first(root, "div.profile-bio p").map(text_of).unwrap_or_default(),
        location: first(root, "div.profile-location")
            .and_then(|location| select_all(location, "span").last().copied())
            .map(text_of)
            .unwrap_or_default(),
        website: attr_of(root, "div.profile-website a", "href").unwrap_or_default(),
        joined: attr_of(root, "div.profile-joindate span", "title").unwrap_or_default(),
        stats: ProfileStats {
            posts: stat(root, "posts"),
            following: stat(root, "following"),
            followers: stat(root, "followers"),
            likes: stat(root, "likes"),
            media: first(root, "div.photo-rail-header div.icon-container")
                .map(text_of)
                .and_then(|text| text.split_whitespace().next().map(parse_count))
                .unwrap_or(0),
        },
    })
}

fn stat(root: ElementRef<'_>, class: &str) -> u64 {
    first(root, &format!("ul.profile-statlist li.{}", class))
        .and_then(|item| {
            first(item, "span.profile-stat-num").or_else(|| select_all(item, "span").get(1).copied())
        })
        .map(|span| parse_count(&text_of(span)))
        .unwrap_or(0)
}

fn profile_image(src: &str, encoding: MediaEncoding) -> Option<String> {
    match encoding {
        MediaEncoding::Encrypted => {
            let (_, encoded) = src.split_once("/enc/")?;
            let decoded = decode_segment(encoded)?;
            Some(format!("https://{}", decoded.trim_start_matches("https://")))
        }
        MediaEncoding::Plain => {
            let decoded = urlencoding::decode(src).ok()?;
            let (_, rest) = decoded.split_once("/pic/")?;
            Some(format!("https://{}", rest))
        }
    }
}

fn account_id(src: &str, encoding: MediaEncoding) -> Option<String> {
    let decoded = match encoding {
        MediaEncoding::Encrypted => decode_segment(src.split_once("/enc/")?.1)?,
        MediaEncoding::Plain => urlencoding::decode(src).ok()?.into_owned(),
    };
    let (_, rest) = decoded.split_once("profile_banners/")?;
    rest.split('/').next().map(str::to_string).filter(|id| !id.is_empty())
}
