//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Sentinel `expires_at` for entries that never expire.
pub const NO_EXPIRY: i64 = 0;

// == Cache Entry ==
/// Represents a single cache entry with value and metadata.
#[derive(Debug)]
pub struct CacheEntry<V> {
    /// The stored value
    pub value: V,
    /// Expiration timestamp (Unix nanoseconds), `NO_EXPIRY` = never expires
    pub expires_at: i64,
    /// Estimated memory cost, fixed at insertion
    pub size_bytes: u64,
    /// Logical access stamp for LRU ordering
    last_access: AtomicU64,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new cache entry.
    ///
    /// # Arguments
    /// * `value` - The value to store
    /// * `expires_at` - Absolute deadline in Unix nanoseconds, or `NO_EXPIRY`
    /// * `size_bytes` - Estimated memory cost of `value`
    /// * `stamp` - Initial access stamp
    pub fn new(value: V, expires_at: i64, size_bytes: u64, stamp: u64) -> Self {
        Self {
            value,
            expires_at,
            size_bytes,
            last_access: AtomicU64::new(stamp),
        }
    }

    /// Returns true if the entry carries a TTL.
    pub fn has_ttl(&self) -> bool {
        self.expires_at != NO_EXPIRY
    }

    // == Is Expired ==
    /// Checks if the entry has expired at `now`.
    ///
    /// An entry is expired once `now` reaches its deadline; entries without a
    /// TTL never expire.
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.has_ttl() && now >= self.expires_at
    }

    /// Remaining TTL at `now`, or None if no expiration is set.
    ///
    /// Returns `Some(Duration::ZERO)` once the deadline has passed.
    pub fn ttl_remaining_at(&self, now: i64) -> Option<Duration> {
        if !self.has_ttl() {
            return None;
        }
        let remaining = self.expires_at.saturating_sub(now).max(0);
        Some(Duration::from_nanos(remaining as u64))
    }

    // == Access Tracking ==
    /// Records an access. Safe to call under a shared lock.
    pub fn touch(&self, stamp: u64) {
        self.last_access.fetch_max(stamp, Ordering::Relaxed);
    }

    /// Returns the most recent access stamp.
    pub fn last_access(&self) -> u64 {
        self.last_access.load(Ordering::Relaxed)
    }
}
