use crate::url::normalize_endpoint;
use rand::seq::IndexedRandom;
use rand::Rng;
use std::collections::HashSet;

/// Candidate and working endpoint sets
///
/// The working set is always a subset of the candidates. When health
/// checking is disabled it equals the candidate set and is never replaced.
#[derive(Debug, Clone, Default)]
pub struct EndpointPool {
    candidates: Vec<String>,
    working: Vec<String>,
    health_checked: bool,
}

impl EndpointPool {
    /// Builds a pool from raw endpoint strings
    ///
    /// Entries that fail normalization are dropped with a warning, and
    /// duplicates are collapsed keeping the first occurrence.
    pub fn new<I, S>(candidates: I, health_checked: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let mut normalized = Vec::new();

        for raw in candidates {
            match normalize_endpoint(raw.as_ref()) {
                Ok(endpoint) => {
                    if seen.insert(endpoint.clone()) {
                        normalized.push(endpoint);
                    }
                }
                Err(e) => tracing::warn!("Ignoring endpoint '{}': {}", raw.as_ref(), e),
            }
        }

        Self {
            working: normalized.clone(),
            candidates: normalized,
            health_checked,
        }
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    pub fn working(&self) -> &[String] {
        &self.working
    }

    pub fn is_health_checked(&self) -> bool {
        self.health_checked
    }

    pub fn is_empty(&self) -> bool {
        self.working.is_empty()
    }

    /// Replaces the working set with the endpoints that passed a probe
    ///
    /// Endpoints outside the candidate set are ignored and candidate order
    /// is kept. Has no effect when health checking is disabled.
    pub fn replace_working(&mut self, passed: &[String]) {
        if !self.health_checked {
            return;
        }
        let passed: HashSet<&str> = passed.iter().map(String::as_str).collect();
        self.working = self
            .candidates
            .iter()
            .filter(|endpoint| passed.contains(endpoint.as_str()))
            .cloned()
            .collect();
    }

    /// Picks a working endpoint uniformly at random
    ///
    /// `exclude` is avoided whenever another endpoint is available.
    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R, exclude: Option<&str>) -> Option<String> {
        let others: Vec<&String> = self
            .working
            .iter()
            .filter(|endpoint| Some(endpoint.as_str()) != exclude)
            .collect();

        if others.is_empty() {
            self.working.choose(rng).cloned()
        } else {
            others.choose(rng).map(|endpoint| (*endpoint).clone())
        }
    }
}
