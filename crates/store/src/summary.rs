use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use kesi_core::EventSummary;

/// Pending summaries of one run, oldest first.
///
/// Single pass: every call to `next` removes the summary from the pending
/// set, whatever the caller then does with it. Entries at or before the
/// `since` checkpoint are never yielded.
#[derive(Debug)]
pub struct SummarySet {
    pending: VecDeque<EventSummary>,
}

impl SummarySet {
    pub fn new(since: DateTime<Utc>, summaries: impl IntoIterator<Item = EventSummary>) -> Self {
        let mut pending: Vec<EventSummary> = summaries
            .into_iter()
            .filter(|s| s.timestamp > since)
            .collect();
        // stable: keeps the store's tie order for equal timestamps
        pending.sort_by_key(|s| s.timestamp);
        Self {
            pending: pending.into(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl Iterator for SummarySet {
    type Item = EventSummary;

    fn next(&mut self) -> Option<Self::Item> {
        self.pending.pop_front()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.pending.len(), Some(self.pending.len()))
    }
}

impl ExactSizeIterator for SummarySet {}
