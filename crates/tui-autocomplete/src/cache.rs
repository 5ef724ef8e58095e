//! Per-field memo of query results.

use crate::candidate::CandidateSet;
use std::collections::HashMap;

/// Maps exact query strings to the candidate sets fetched for them.
///
/// Entries live as long as the owning controller. There is no eviction;
/// the number of distinct queries is bounded by what one user types in a
/// session.
#[derive(Debug, Clone, Default)]
pub struct CandidateCache {
    entries: HashMap<String, CandidateSet>,
}

impl CandidateCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a query. Keys are compared verbatim.
    pub fn get(&self, query: &str) -> Option<&CandidateSet> {
        self.entries.get(query)
    }

    /// Store the result set for a query, replacing any previous one.
    pub fn put(&mut self, query: impl Into<String>, set: CandidateSet) {
        self.entries.insert(query.into(), set);
    }

    /// Whether a query has a cached result.
    pub fn contains(&self, query: &str) -> bool {
        self.entries.contains_key(query)
    }

    /// Number of cached queries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
