//! Candidate list model: the active candidate set and its selection cursor.

use crate::candidate::{Candidate, CandidateSet};

/// Active candidate set plus selection cursor.
///
/// The cursor is only ever `Some` while a set is present, and is reset
/// whenever the set is replaced or torn down.
#[derive(Debug, Clone, Default)]
pub struct CandidateList {
    set: Option<CandidateSet>,
    cursor: Option<usize>,
}

impl CandidateList {
    /// Create an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the active set.
    ///
    /// The cursor lands on the first candidate when `auto_select_first` is
    /// set, otherwise nothing is selected.
    pub fn populate(&mut self, set: CandidateSet, auto_select_first: bool) {
        self.set = Some(set);
        self.cursor = auto_select_first.then_some(0);
    }

    /// Move to the next candidate.
    ///
    /// With nothing selected this selects the first candidate. With a
    /// selection it moves one step forward; at the last candidate there is no
    /// successor and the cursor stays put. Returns the new cursor if it moved.
    pub fn next(&mut self) -> Option<usize> {
        let set = self.set.as_ref()?;
        let target = match self.cursor {
            None => 0,
            Some(i) if i + 1 < set.len() => i + 1,
            Some(_) => return None,
        };
        self.cursor = Some(target);
        Some(target)
    }

    /// Move to the previous candidate.
    ///
    /// With nothing selected this selects the last candidate. With a
    /// selection it moves one step back; at the first candidate the cursor
    /// stays put. Returns the new cursor if it moved.
    pub fn prev(&mut self) -> Option<usize> {
        let set = self.set.as_ref()?;
        let target = match self.cursor {
            None => set.last_index(),
            Some(i) if i > 0 => i - 1,
            Some(_) => return None,
        };
        self.cursor = Some(target);
        Some(target)
    }

    /// Whether `next()` would move the cursor.
    pub fn has_next(&self) -> bool {
        match (&self.set, self.cursor) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(set), Some(i)) => i + 1 < set.len(),
        }
    }

    /// Whether `prev()` would move the cursor.
    pub fn has_prev(&self) -> bool {
        match (&self.set, self.cursor) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(_), Some(i)) => i > 0,
        }
    }

    /// Currently selected candidate.
    pub fn selected(&self) -> Option<&Candidate> {
        self.cursor.and_then(|i| self.get(i))
    }

    /// Selection cursor.
    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    /// Candidate at `index` in the active set.
    pub fn get(&self, index: usize) -> Option<&Candidate> {
        self.set.as_ref().and_then(|set| set.get(index))
    }

    /// First candidate of the active set.
    pub fn first(&self) -> Option<&Candidate> {
        self.get(0)
    }

    /// Active set, if any.
    pub fn candidates(&self) -> Option<&CandidateSet> {
        self.set.as_ref()
    }

    /// Number of candidates in the active set (0 when torn down).
    pub fn total_count(&self) -> usize {
        self.set.as_ref().map_or(0, CandidateSet::len)
    }

    /// Whether a set is active.
    pub fn is_active(&self) -> bool {
        self.set.is_some()
    }

    /// Drop the active set and cursor.
    pub fn teardown(&mut self) {
        self.set = None;
        self.cursor = None;
    }
}
