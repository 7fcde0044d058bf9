//! A bounded sample of truncated link lists, used to simulate paging through history.

use linkbench_types::TailCursor;
use rand::{Rng, RngCore};

/// Default number of cursors kept per requester.
pub const DEFAULT_CAPACITY: usize = 2048;

/// Keeps a random sample of continuation points of truncated link-list reads.
///
/// Once the cache is full, every new cursor overwrites a uniformly chosen slot. The cache thus
/// holds a representative sample of all truncation points seen so far, not just the most recent
/// ones. Entries are never removed, even after their list has been read to the end.
#[derive(Debug)]
pub struct TailHistoryCache {
    entries: Vec<TailCursor>,
    capacity: usize,
}

impl TailHistoryCache {
    /// Creates an empty cache holding at most `capacity` cursors.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "tail history capacity must be positive");
        Self {
            entries: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Returns the number of cursors in the cache.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the cache holds no cursors.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the maximum number of cursors in the cache.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Adds a cursor, evicting a random one if the cache is full.
    ///
    /// Returns the slot the cursor was stored in.
    pub fn record(&mut self, rng: &mut dyn RngCore, cursor: TailCursor) -> usize {
        if self.entries.len() < self.capacity {
            self.entries.push(cursor);
            self.entries.len() - 1
        } else {
            let slot = rng.random_range(0..self.entries.len());
            self.entries[slot] = cursor;
            slot
        }
    }

    /// Picks a random cursor and returns it with its slot, or `None` if the cache is empty.
    pub fn sample(&self, rng: &mut dyn RngCore) -> Option<(usize, TailCursor)> {
        if self.entries.is_empty() {
            return None;
        }
        let slot = rng.random_range(0..self.entries.len());
        Some((slot, self.entries[slot]))
    }

    /// Overwrites the cursor in `slot`, after a continuation read was truncated again.
    pub fn replace(&mut self, slot: usize, cursor: TailCursor) {
        self.entries[slot] = cursor;
    }

    /// Returns the cursor in `slot`.
    pub fn get(&self, slot: usize) -> Option<&TailCursor> {
        self.entries.get(slot)
    }
}
