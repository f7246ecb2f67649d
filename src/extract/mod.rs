//! Record extraction from mirror markup
//!
//! This module is a pure transform from page HTML to structured data:
//! - Feed page rules (timeline items, end-of-feed marker, error panels, cursors)
//! - Post records with author, stats, quoted post and media
//! - Profile cards
//! - Media URL decoding for plain and base64-encoded mirrors
//!
//! Nothing here performs I/O or keeps state between pages.

mod media;
mod profile;
mod record;
mod timeline;

pub use media::{decode_avatar, decode_gif, decode_picture, decode_segment, decode_video, MediaEncoding};
pub use profile::{extract_profile, Profile, ProfileStats};
pub use record::{extract_record, Media, QuotedRecord, Record, Stats, User};
pub use timeline::{
    classify_panel, error_panel, has_timeline_items, is_end_of_feed, main_post, next_cursor,
    timeline_items, ItemKind, PanelKind, TimelineItem,
};

use scraper::{ElementRef, Selector};

/// Returns the first descendant of `scope` matching `css`
pub(crate) fn first<'a>(scope: ElementRef<'a>, css: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(css).ok()?;
    let found = scope.select(&selector).next();
    found
}

/// Returns every descendant of `scope` matching `css`, in document order
pub(crate) fn select_all<'a>(scope: ElementRef<'a>, css: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(css) {
        Ok(selector) => scope.select(&selector).collect(),
        Err(_) => Vec::new(),
    }
}

/// Returns an attribute of the first descendant matching `css`
pub(crate) fn attr_of(scope: ElementRef<'_>, css: &str, attr: &str) -> Option<String> {
    first(scope, css)
        .and_then(|element| element.value().attr(attr))
        .map(|value| value.trim().to_string())
}

/// Concatenated, trimmed text content of an element
pub(crate) fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Parses a displayed counter such as `1,234`; blank or garbled is zero
pub(crate) fn parse_count(text: &str) -> u64 {
    text.trim().replace(',', "").parse().unwrap_or(0)
}
