//! Admission Controller Module
//!
//! Decides whether a value fits the memory ceiling and which entries must be
//! evicted to make room for it.

use crate::cache::EntryStore;
use crate::error::CacheError;

// == Eviction Policy ==
/// Behaviour when an insert would exceed the memory ceiling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EvictionPolicy {
    /// Evict least recently used entries until the value fits
    #[default]
    Lru,
    /// Never evict live entries; reject values that do not fit
    Reject,
}

// == Admission Decision ==
/// Outcome of an admission check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// The value fits once the listed keys are removed (possibly none)
    Admit { evict: Vec<String> },
    /// The value cannot be stored; the store must be left unchanged
    Reject(CacheError),
}

// == Admission Controller ==
/// Enforces the memory ceiling over an [`EntryStore`].
///
/// Lives under the store lock so the ceiling and the usage it is compared
/// against are always read together.
#[derive(Debug, Clone)]
pub struct AdmissionController {
    /// Memory ceiling in bytes, 0 = unbounded
    max_memory: u64,
    policy: EvictionPolicy,
}

impl AdmissionController {
    // == Constructor ==
    /// Creates a controller for the given ceiling and policy.
    pub fn new(max_memory: u64, policy: EvictionPolicy) -> Self {
        Self { max_memory, policy }
    }

    /// Returns the ceiling in bytes, 0 = unbounded.
    pub fn max_memory(&self) -> u64 {
        self.max_memory
    }

    /// Replaces the ceiling. Callers follow up with [`Self::reclaim`].
    pub fn set_max_memory(&mut self, max_memory: u64) {
        self.max_memory = max_memory;
    }

    // == Admit ==
    /// Checks whether `size` bytes can be stored under `key`.
    ///
    /// The existing entry for `key`, if any, is about to be replaced, so its
    /// size counts as free and it is never chosen as a victim. Expired entries
    /// are chosen first, then the least recently used.
    pub fn admit<V>(&self, store: &EntryStore<V>, key: &str, size: u64, now: i64) -> Admission {
        if self.max_memory == 0 {
            return Admission::Admit { evict: Vec::new() };
        }

        if size > self.max_memory {
            return Admission::Reject(CacheError::TooLarge {
                size,
                max: self.max_memory,
            });
        }

        let replaced = store.get(key).map_or(0, |entry| entry.size_bytes);
        let usage = store.memory_usage() - replaced;

        if usage + size <= self.max_memory {
            return Admission::Admit { evict: Vec::new() };
        }

        let needed = usage + size - self.max_memory;
        let only_expired = self.policy == EvictionPolicy::Reject;

        match select_victims(store, Some(key), needed, now, only_expired) {
            Some(evict) => Admission::Admit { evict },
            None => Admission::Reject(CacheError::OutOfMemory {
                size,
                available: self.max_memory.saturating_sub(usage),
            }),
        }
    }

    // == Reclaim ==
    /// Returns the keys to evict so that usage fits under the current ceiling.
    ///
    /// Used after the ceiling is lowered; applies regardless of policy.
    pub fn reclaim<V>(&self, store: &EntryStore<V>, now: i64) -> Vec<String> {
        if self.max_memory == 0 || store.memory_usage() <= self.max_memory {
            return Vec::new();
        }

        let needed = store.memory_usage() - self.max_memory;
        select_victims(store, None, needed, now, false).unwrap_or_default()
    }
}

/// Picks victims in eviction order until `needed` bytes are covered.
///
/// Snapshots and sorts every eligible entry, so one pass costs O(n log n) in
/// the number of stored keys and runs under the exclusive store lock. Only
/// writes that overflow the ceiling pay it. Returns None if all eligible
/// candidates together do not free enough.
fn select_victims<V>(
    store: &EntryStore<V>,
    exclude: Option<&str>,
    needed: u64,
    now: i64,
    only_expired: bool,
) -> Option<Vec<String>> {
    let mut candidates: Vec<(bool, u64, &String, u64)> = store
        .iter()
        .filter(|(key, _)| Some(key.as_str()) != exclude)
        .map(|(key, entry)| {
            (
                !entry.is_expired_at(now),
                entry.last_access(),
                key,
                entry.size_bytes,
            )
        })
        .filter(|(live, ..)| !(only_expired && *live))
        .collect();

    // Expired entries first, then oldest access
    candidates.sort_unstable_by_key(|(live, stamp, ..)| (*live, *stamp));

    let mut freed = 0;
    let mut victims = Vec::new();

    for (_, _, key, size) in candidates {
        if freed >= needed {
            break;
        }
        freed += size;
        victims.push(key.clone());
    }

    (freed >= needed).then_some(victims)
}
