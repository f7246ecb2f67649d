//! Pagination collector
//!
//! Walks one feed page by page through an [`Orchestrator`], following the
//! cursor of each page, and sorts timeline items into standalone records and
//! completed threads. Every post is emitted at most once per collection,
//! because mirrors repeat the last item of a page at the top of the next.

use crate::extract::{next_cursor, timeline_items, ItemKind, MediaEncoding, Record, TimelineItem};
use crate::fetch::{FetchOutcome, Orchestrator, RetryState};
use crate::harvest::query::{Query, QueryPlan};
use crate::harvest::result::{CollectionResult, Termination};
use crate::QueryResult;
use scraper::Html;
use std::collections::HashSet;

/// Everything the collector needs from one page
///
/// Parsed synchronously so the document never lives across an await.
struct PageDigest {
    items: Vec<TimelineItem>,
    cursor: Option<String>,
}

impl PageDigest {
    fn parse(body: &str) -> Self {
        let document = Html::parse_document(body);
        let encoding = MediaEncoding::detect(&document);
        Self {
            items: timeline_items(&document, encoding),
            cursor: next_cursor(&document),
        }
    }
}

/// Drives one collection operation
pub struct Collector {
    orchestrator: Orchestrator,
    max_retries: u32,
}

impl Collector {
    pub fn new(orchestrator: Orchestrator, max_retries: u32) -> Self {
        Self {
            orchestrator,
            max_retries,
        }
    }

    /// Validates `query` and collects it
    ///
    /// # Errors
    ///
    /// Only query validation fails; fetch failures end the collection with a
    /// [`Termination`] instead.
    pub async fn collect(&mut self, query: &Query) -> QueryResult<CollectionResult> {
        let plan = query.plan()?;
        Ok(self.collect_plan(&plan).await)
    }

    /// Collects an already validated plan
    pub async fn collect_plan(&mut self, plan: &QueryPlan) -> CollectionResult {
        let mut state = RetryState::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut result = CollectionResult::default();
        let mut thread: Vec<Record> = Vec::new();
        let mut path = plan.initial_path.clone();
        let mut pages = 0usize;

        let termination = loop {
            let page = match self.orchestrator.fetch_page(&path, self.max_retries, &mut state).await {
                FetchOutcome::Page(page) => page,
                FetchOutcome::EndOfFeed => break Termination::EndOfFeed,
                FetchOutcome::Unavailable(message) => break Termination::Unavailable { message },
                FetchOutcome::Exhausted => break Termination::RetriesExhausted,
                FetchOutcome::FederationDown => break Termination::FederationDown,
            };
            pages += 1;

            let digest = PageDigest::parse(&page.body);
            let full = absorb(plan, digest.items, &mut seen, &mut result, &mut thread);

            tracing::info!(
                "Page {} from {}: {} records, {} threads so far",
                pages,
                page.endpoint,
                result.records.len(),
                result.threads.len()
            );

            if full || plan.is_satisfied(result.len()) {
                break Termination::TargetReached;
            }

            let Some(next) = digest.cursor.and_then(|href| plan.next_path(&href)) else {
                break Termination::CursorExhausted;
            };

            self.orchestrator.politeness_pause().await;
            path = next;
        };

        if !thread.is_empty() {
            tracing::debug!("Dropping incomplete thread of {} posts", thread.len());
        }

        result.termination = termination;
        result
    }
}

/// Sorts one page's items into the result
///
/// Returns true when the target was met before the page was fully consumed.
fn absorb(
    plan: &QueryPlan,
    items: Vec<TimelineItem>,
    seen: &mut HashSet<String>,
    result: &mut CollectionResult,
    thread: &mut Vec<Record>,
) -> bool {
    for TimelineItem { kind, record } in items {
        if kind.is_thread() {
            if seen.insert(record.link.clone()) {
                thread.push(record);
            }
            if kind == ItemKind::ThreadEnd && !thread.is_empty() {
                result.threads.push(std::mem::take(thread));
            }
            continue;
        }

        if (plan.skip_pinned && record.is_pinned) || (plan.skip_reposts && record.is_repost) {
            continue;
        }

        if plan.is_satisfied(result.len()) {
            return true;
        }

        if seen.insert(record.link.clone()) {
            result.records.push(record);
        }
    }

    false
}
