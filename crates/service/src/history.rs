use std::collections::VecDeque;
use std::sync::Arc;

use gamma_core::Snapshot;

/// Bounded, append-only snapshot history for one index.
///
/// Entries are kept in completion order; the oldest is evicted once
/// `capacity` is reached.
#[derive(Debug)]
pub struct SnapshotHistory {
    capacity: usize,
    entries: VecDeque<Arc<Snapshot>>,
}

impl SnapshotHistory {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, snapshot: Arc<Snapshot>) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(snapshot);
    }

    /// The most recent `limit` entries, oldest first.
    #[must_use]
    pub fn recent(&self, limit: usize) -> Vec<Arc<Snapshot>> {
        let skip = self.entries.len().saturating_sub(limit);
        self.entries.iter().skip(skip).cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
