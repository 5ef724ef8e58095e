//! Candidate values and candidate sets.

use serde_json::Value;
use std::ops::Index;
use std::sync::Arc;

/// One suggested completion.
///
/// Display text is always available as a string; `record` keeps the full
/// value the server returned so it can travel with change notifications.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    display: String,
    record: Value,
}

impl Candidate {
    /// Create a plain string candidate.
    pub fn text(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            record: Value::String(text.clone()),
            display: text,
        }
    }

    /// Create a candidate from a server record.
    ///
    /// With `object_data` set, display text is read from that field of the
    /// record; otherwise the record itself is displayed.
    pub fn from_record(record: Value, object_data: Option<&str>) -> Self {
        let display = match object_data {
            Some(field) => record.get(field).map(display_text).unwrap_or_default(),
            None => display_text(&record),
        };
        Self { display, record }
    }

    /// Text written into the field when this candidate is committed.
    pub fn display(&self) -> &str {
        &self.display
    }

    /// Full candidate payload.
    pub fn record(&self) -> &Value {
        &self.record
    }
}

fn display_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Ordered, immutable, non-empty sequence of candidates.
///
/// Clones share the same storage, so a set can sit in the cache and in the
/// active list at once.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateSet {
    items: Arc<[Candidate]>,
}

impl CandidateSet {
    /// Create a set. Returns `None` for an empty sequence.
    pub fn new(items: Vec<Candidate>) -> Option<Self> {
        if items.is_empty() {
            None
        } else {
            Some(Self {
                items: items.into(),
            })
        }
    }

    /// Build a set from raw server records.
    pub fn from_records(records: Vec<Value>, object_data: Option<&str>) -> Option<Self> {
        Self::new(
            records
                .into_iter()
                .map(|record| Candidate::from_record(record, object_data))
                .collect(),
        )
    }

    /// Number of candidates (always at least one).
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Always false; kept for API symmetry with slices.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Candidate at `index`.
    pub fn get(&self, index: usize) -> Option<&Candidate> {
        self.items.get(index)
    }

    /// Index of the last candidate.
    pub fn last_index(&self) -> usize {
        self.items.len() - 1
    }

    /// Iterate over candidates in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Candidate> {
        self.items.iter()
    }

    /// Display texts in order.
    pub fn display_texts(&self) -> Vec<&str> {
        self.items.iter().map(Candidate::display).collect()
    }

    /// Whether both sets share the same storage.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.items, &other.items)
    }
}

impl Index<usize> for CandidateSet {
    type Output = Candidate;

    fn index(&self, index: usize) -> &Self::Output {
        &self.items[index]
    }
}

impl<'a> IntoIterator for &'a CandidateSet {
    type Item = &'a Candidate;
    type IntoIter = std::slice::Iter<'a, Candidate>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
