//! Expiration Index Module
//!
//! Secondary index over the TTL-bearing subset of the entry store. Entries are
//! kept ordered by deadline so a sweep only touches keys that have expired.
//!
//! Lock order: callers that also hold the store lock must acquire it first.
//! The index lock is never held while waiting for the store lock.

use std::collections::{BTreeSet, HashMap};

use parking_lot::Mutex;

use crate::cache::entry::NO_EXPIRY;

#[derive(Debug, Default)]
struct IndexInner {
    /// key -> deadline
    deadlines: HashMap<String, i64>,
    /// (deadline, key), earliest first
    queue: BTreeSet<(i64, String)>,
}

// == Expiration Index ==
/// Tracks deadlines of entries that carry a TTL.
#[derive(Debug, Default)]
pub struct ExpirationIndex {
    inner: Mutex<IndexInner>,
}

impl ExpirationIndex {
    // == Constructor ==
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    // == Track ==
    /// Records `key` with its deadline, replacing any previous deadline.
    ///
    /// A `NO_EXPIRY` deadline removes the key instead, so an entry converted
    /// from TTL to no-TTL never lingers in the index.
    pub fn track(&self, key: &str, expires_at: i64) {
        let mut inner = self.inner.lock();

        if let Some(previous) = inner.deadlines.remove(key) {
            inner.queue.remove(&(previous, key.to_string()));
        }

        if expires_at != NO_EXPIRY {
            inner.deadlines.insert(key.to_string(), expires_at);
            inner.queue.insert((expires_at, key.to_string()));
        }
    }

    // == Untrack ==
    /// Removes `key` from the index. Returns true if it was tracked.
    pub fn untrack(&self, key: &str) -> bool {
        let mut inner = self.inner.lock();

        match inner.deadlines.remove(key) {
            Some(deadline) => {
                inner.queue.remove(&(deadline, key.to_string()));
                true
            }
            None => false,
        }
    }

    // == Sweep ==
    /// Removes and returns every key whose deadline is `<= now`.
    ///
    /// Work is proportional to the number of expired keys.
    pub fn sweep(&self, now: i64) -> Vec<(String, i64)> {
        let mut inner = self.inner.lock();
        let mut expired = Vec::new();

        while inner
            .queue
            .first()
            .is_some_and(|(deadline, _)| *deadline <= now)
        {
            if let Some((deadline, key)) = inner.queue.pop_first() {
                inner.deadlines.remove(&key);
                expired.push((key, deadline));
            }
        }

        expired
    }

    // == Clear ==
    /// Drops every tracked key.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.deadlines.clear();
        inner.queue.clear();
    }

    /// Returns the tracked deadline for `key`, if any.
    pub fn deadline(&self, key: &str) -> Option<i64> {
        self.inner.lock().deadlines.get(key).copied()
    }

    /// Returns the earliest tracked deadline.
    #[cfg(test)]
    pub fn next_deadline(&self) -> Option<i64> {
        self.inner.lock().queue.first().map(|(deadline, _)| *deadline)
    }

    /// Returns the number of tracked keys.
    pub fn len(&self) -> usize {
        self.inner.lock().deadlines.len()
    }

    /// Returns true if no key is tracked.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
