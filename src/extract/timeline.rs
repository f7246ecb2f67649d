//! Feed page rules
//!
//! Everything the fetch and pagination layers need to know about a page's
//! markup lives here: whether it carries timeline items, whether it is the
//! valid end of a feed, what an error panel says, where the next cursor is,
//! and how each item is tagged.

use crate::extract::media::MediaEncoding;
use crate::extract::record::{extract_record, Record};
use crate::extract::{first, select_all, text_of};
use scraper::{ElementRef, Html};

/// Text of the control that points back to the head of a feed
const LOAD_NEWEST: &str = "Load newest";

/// Position of an item relative to a thread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Standalone,
    ThreadStart,
    ThreadContinuation,
    ThreadEnd,
}

impl ItemKind {
    pub fn is_thread(self) -> bool {
        !matches!(self, Self::Standalone)
    }
}

/// A tagged record from a feed page
#[derive(Debug, Clone)]
pub struct TimelineItem {
    pub kind: ItemKind,
    pub record: Record,
}

/// How an error panel should be treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelKind {
    /// Protected, missing or suspended content; retrying cannot help
    Terminal,
    /// The mirror reports its own upstream rate limit
    RateLimited,
    /// Anything else; another attempt may succeed
    Transient,
}

/// Structural marker carried by an item's class list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker {
    Standalone,
    Thread,
    ThreadLast,
}

fn marker(element: ElementRef<'_>) -> Option<Marker> {
    let classes: Vec<&str> = element.value().classes().collect();
    if !classes.contains(&"timeline-item") {
        return None;
    }

    if classes.len() == 1 {
        Some(Marker::Standalone)
    } else if classes.contains(&"thread") {
        if classes.contains(&"thread-last") {
            Some(Marker::ThreadLast)
        } else {
            Some(Marker::Thread)
        }
    } else {
        // show-more controls, unavailable placeholders, etc.
        None
    }
}

fn marked_items(document: &Html) -> Vec<(ElementRef<'_>, Marker)> {
    select_all(document.root_element(), "div.timeline-item")
        .into_iter()
        .filter_map(|element| marker(element).map(|m| (element, m)))
        .collect()
}

/// Returns true if the page carries at least one post-shaped item
pub fn has_timeline_items(document: &Html) -> bool {
    !marked_items(document).is_empty()
}

/// Returns true if the last "show more" control reads "Load newest"
///
/// An itemless page ending in that control is the valid terminal page of a
/// feed rather than a degraded response.
pub fn is_end_of_feed(document: &Html) -> bool {
    last_show_more_anchor(document)
        .map(|anchor| text_of(anchor) == LOAD_NEWEST)
        .unwrap_or(false)
}

/// Returns the message of the page's error panel, if any
pub fn error_panel(document: &Html) -> Option<String> {
    first(document.root_element(), "div.error-panel").map(text_of)
}

/// Decides how an error panel message is handled
pub fn classify_panel(message: &str) -> PanelKind {
    let message = message.to_lowercase();

    if message.contains("rate limit") {
        PanelKind::RateLimited
    } else if ["protected", "not found", "suspended", "doesn't exist", "unavailable"]
        .iter()
        .any(|needle| message.contains(needle))
    {
        PanelKind::Terminal
    } else {
        PanelKind::Transient
    }
}

/// Returns the href of the cursor link that continues the feed
///
/// Only the last "show more" control counts, and a "Load newest" control is
/// never a continuation: it points back to the head of the feed.
pub fn next_cursor(document: &Html) -> Option<String> {
    let anchor = last_show_more_anchor(document)?;
    if text_of(anchor) == LOAD_NEWEST {
        return None;
    }
    anchor
        .value()
        .attr("href")
        .map(str::to_string)
        .filter(|href| !href.is_empty())
}

fn last_show_more_anchor(document: &Html) -> Option<ElementRef<'_>> {
    let controls = select_all(document.root_element(), "div.show-more");
    let last = controls.last()?;
    first(*last, "a")
}

/// Extracts and tags every timeline item on a page, in page order
///
/// A thread item is a start when no thread is open at that point on the
/// page, a continuation otherwise; `thread-last` closes the thread.
pub fn timeline_items(document: &Html, encoding: MediaEncoding) -> Vec<TimelineItem> {
    let mut items = Vec::new();
    let mut thread_open = false;

    for (element, marker) in marked_items(document) {
        let kind = match marker {
            Marker::Standalone => ItemKind::Standalone,
            Marker::Thread if thread_open => ItemKind::ThreadContinuation,
            Marker::Thread => ItemKind::ThreadStart,
            Marker::ThreadLast => ItemKind::ThreadEnd,
        };
        thread_open = matches!(kind, ItemKind::ThreadStart | ItemKind::ThreadContinuation);

        match extract_record(element, encoding) {
            Some(record) => items.push(TimelineItem { kind, record }),
            None => tracing::debug!("Skipping timeline item without a post link"),
        }
    }

    items
}

/// Extracts the main post of a status page
pub fn main_post(document: &Html, encoding: MediaEncoding) -> Option<Record> {
    let root = document.root_element();
    let element = first(root, "div.main-tweet div.timeline-item").or_else(|| {
        marked_items(document)
            .into_iter()
            .map(|(element, _)| element)
            .next()
    })?;
    extract_record(element, encoding)
}
