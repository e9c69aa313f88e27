//! Entry Store Module
//!
//! Primary key -> entry mapping with incremental memory and key accounting.
//! Not synchronized on its own; the engine guards it with its store lock.

use std::collections::HashMap;

use crate::cache::CacheEntry;

// == Entry Store ==
/// Key-value storage that keeps `memory_usage` and `key_count` in step with
/// every mutation.
#[derive(Debug)]
pub struct EntryStore<V> {
    /// Key-value storage
    entries: HashMap<String, CacheEntry<V>>,
    /// Sum of `size_bytes` across all entries
    memory_usage: u64,
    /// Number of entries, maintained incrementally
    key_count: u64,
}

impl<V> EntryStore<V> {
    // == Constructor ==
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            memory_usage: 0,
            key_count: 0,
        }
    }

    // == Insert ==
    /// Stores an entry, replacing and returning any previous one for the key.
    ///
    /// The previous entry's size is released and the new entry's size charged
    /// in the same step as the map mutation.
    pub fn insert(&mut self, key: String, entry: CacheEntry<V>) -> Option<CacheEntry<V>> {
        let size = entry.size_bytes;
        let previous = self.entries.insert(key, entry);

        match &previous {
            Some(old) => {
                self.memory_usage = self.memory_usage - old.size_bytes + size;
            }
            None => {
                self.memory_usage += size;
                self.key_count += 1;
            }
        }

        previous
    }

    // == Get ==
    /// Returns the entry for `key` without any expiration check.
    pub fn get(&self, key: &str) -> Option<&CacheEntry<V>> {
        self.entries.get(key)
    }

    // == Remove ==
    /// Removes an entry by key, releasing its accounted size.
    pub fn remove(&mut self, key: &str) -> Option<CacheEntry<V>> {
        let removed = self.entries.remove(key)?;
        self.memory_usage -= removed.size_bytes;
        self.key_count -= 1;
        Some(removed)
    }

    // == Clear ==
    /// Removes every entry and resets accounting. Returns the number removed.
    pub fn clear(&mut self) -> u64 {
        let removed = self.key_count;
        self.entries.clear();
        self.memory_usage = 0;
        self.key_count = 0;
        removed
    }

    /// Iterates over all entries in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &CacheEntry<V>)> {
        self.entries.iter()
    }

    // == Accounting ==
    /// Returns the number of entries in O(1).
    pub fn len(&self) -> u64 {
        self.key_count
    }

    /// Returns true if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.key_count == 0
    }

    /// Returns the summed size of all entries.
    pub fn memory_usage(&self) -> u64 {
        self.memory_usage
    }
}

impl<V> Default for EntryStore<V> {
    fn default() -> Self {
        Self::new()
    }
}
