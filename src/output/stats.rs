//! Statistics for a batch of collections
//!
//! This module summarises what a run retrieved and why each operation
//! stopped, so a partially successful batch is visible at a glance.

use crate::harvest::{CollectionResult, Termination};
use std::collections::HashMap;

/// Harvest statistics summary
#[derive(Debug, Clone, Default)]
pub struct HarvestStatistics {
    /// Number of collection operations
    pub operations: u64,

    /// Standalone records across all operations
    pub total_records: u64,

    /// Completed threads across all operations
    pub total_threads: u64,

    /// Records contained in those threads
    pub thread_records: u64,

    /// Count of operations by termination name
    pub terminations: HashMap<&'static str, u64>,

    /// Labels of operations that ended on a fetch failure
    pub incomplete: Vec<String>,
}

impl HarvestStatistics {
    /// Builds statistics from (label, result) pairs
    pub fn from_results<'a, I>(results: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a CollectionResult)>,
    {
        let mut stats = Self::default();
        for (label, result) in results {
            stats.record(label, result);
        }
        stats
    }

    /// Adds one operation's result
    pub fn record(&mut self, label: &str, result: &CollectionResult) {
        self.operations += 1;
        self.total_records += result.records.len() as u64;
        self.total_threads += result.threads.len() as u64;
        self.thread_records += result.threads.iter().map(|t| t.len() as u64).sum::<u64>();
        *self.terminations.entry(result.termination.name()).or_insert(0) += 1;

        if !result.termination.is_clean() {
            self.incomplete.push(format!("{} ({})", label, result.termination));
        }
    }

    /// Share of operations that ended without a fetch failure, in percent
    pub fn success_rate(&self) -> f64 {
        if self.operations == 0 {
            return 0.0;
        }
        let clean = self.operations - self.incomplete.len() as u64;
        (clean as f64 / self.operations as f64) * 100.0
    }
}

/// Prints statistics to stderr in a formatted manner
///
/// Stdout is reserved for JSON output.
pub fn print_statistics(stats: &HarvestStatistics) {
    eprintln!("=== Harvest Statistics ===\n");

    eprintln!("Overview:");
    eprintln!("  Operations: {}", stats.operations);
    eprintln!("  Records: {}", stats.total_records);
    eprintln!(
        "  Threads: {} ({} posts)",
        stats.total_threads, stats.thread_records
    );
    eprintln!();

    eprintln!("Terminations:");
    let mut counts: Vec<_> = stats.terminations.iter().collect();
    counts.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));
    for (name, count) in counts {
        let percentage = if stats.operations > 0 {
            (*count as f64 / stats.operations as f64) * 100.0
        } else {
            0.0
        };
        eprintln!("  {}: {} ({:.1}%)", name, count, percentage);
    }
    eprintln!();

    if !stats.incomplete.is_empty() {
        eprintln!("Incomplete Operations ({}):", stats.incomplete.len());
        for label in &stats.incomplete {
            eprintln!("  - {}", label);
        }
        eprintln!();
    }

    eprintln!(
        "Success Rate: {:.1}% ({} / {} operations ended cleanly)",
        stats.success_rate(),
        stats.operations - stats.incomplete.len() as u64,
        stats.operations
    );
}
