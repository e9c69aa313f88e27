//! Cache Engine Module
//!
//! Thread-safe facade combining the entry store, the expiration index, the
//! admission controller and the background sweeper.
//!
//! Locking: one reader-writer lock guards the store together with the
//! admission controller. The expiration index has its own mutex and is only
//! ever locked while the store lock is already held (or without it), never
//! the other way round.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info};

use crate::cache::clock::{deadline_after, Clock, SystemClock};
use crate::cache::{
    Admission, AdmissionController, CacheEntry, CacheSize, CacheStats, EntryStore,
    ExpirationIndex, StatsRecorder,
};
use crate::config::{parse_memory_size, Config};
use crate::error::{CacheError, Result};
use crate::tasks::{Sweeper, SweeperState};

/// Longest a sweep pass waits for the store lock before skipping the tick.
const MAX_SWEEP_LOCK_WAIT: Duration = Duration::from_millis(100);

/// State guarded by the store lock.
#[derive(Debug)]
struct State<V> {
    store: EntryStore<V>,
    admission: AdmissionController,
}

/// Everything shared between callers and the sweeper thread.
struct Shared<V> {
    state: RwLock<State<V>>,
    expiring: ExpirationIndex,
    stats: StatsRecorder,
    clock: Arc<dyn Clock>,
    access_stamp: AtomicU64,
    closed: AtomicBool,
}

impl<V> Shared<V> {
    fn now(&self) -> i64 {
        self.clock.now_nanos()
    }

    fn next_stamp(&self) -> u64 {
        self.access_stamp.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Removes `key` if it is still expired at `now`.
    fn expire_if_stale(&self, key: &str, now: i64) {
        let mut state = self.state.write();

        if state
            .store
            .get(key)
            .is_some_and(|entry| entry.is_expired_at(now))
        {
            state.store.remove(key);
            self.expiring.untrack(key);
            self.stats.record_expirations(1);
        }
    }

    /// Removes victims chosen by the admission controller.
    fn remove_victims(&self, store: &mut EntryStore<V>, victims: Vec<String>, now: i64) {
        if victims.is_empty() {
            return;
        }

        let mut evicted = 0;
        let mut expired = 0;

        for key in victims {
            if let Some(entry) = store.remove(&key) {
                self.expiring.untrack(&key);
                if entry.is_expired_at(now) {
                    expired += 1;
                } else {
                    evicted += 1;
                }
            }
        }

        self.stats.record_evictions(evicted);
        self.stats.record_expirations(expired);
        debug!(evicted, expired, "Reclaimed memory");
    }

    /// Runs one sweep pass over the expiration index.
    ///
    /// With `wait` set, gives up and returns None if the store lock cannot be
    /// taken in time.
    fn sweep(&self, wait: Option<Duration>) -> Option<usize> {
        let mut state = match wait {
            Some(wait) => self.state.try_write_for(wait)?,
            None => self.state.write(),
        };

        let now = self.now();
        let mut removed = 0;

        for (key, deadline) in self.expiring.sweep(now) {
            if state
                .store
                .get(&key)
                .is_some_and(|entry| entry.expires_at == deadline)
            {
                state.store.remove(&key);
                removed += 1;
            }
        }

        self.stats.record_expirations(removed as u64);
        Some(removed)
    }
}

// == Cache ==
/// Concurrent in-process key-value cache with TTL expiration and a memory
/// ceiling.
///
/// All methods take `&self`; share the cache between threads with `Arc`.
/// After [`Cache::close`] every operation fails with [`CacheError::Closed`].
pub struct Cache<V> {
    shared: Arc<Shared<V>>,
    sweeper: Mutex<Sweeper>,
}

impl<V> Cache<V>
where
    V: Clone + CacheSize + Send + Sync + 'static,
{
    // == Constructor ==
    /// Creates a cache using the system clock.
    pub fn new(config: Config) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Creates a cache with a custom time source.
    pub fn with_clock(config: Config, clock: Arc<dyn Clock>) -> Self {
        let shared = Arc::new(Shared {
            state: RwLock::new(State {
                store: EntryStore::new(),
                admission: AdmissionController::new(
                    config.max_memory_bytes,
                    config.eviction_policy,
                ),
            }),
            expiring: ExpirationIndex::new(),
            stats: StatsRecorder::default(),
            clock,
            access_stamp: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        });

        let lock_wait = config.sweep_interval.min(MAX_SWEEP_LOCK_WAIT);
        let sweep_shared = Arc::clone(&shared);
        let sweeper = Sweeper::spawn(config.sweep_interval, move || {
            sweep_shared.sweep(Some(lock_wait))
        });

        debug!(
            max_memory = config.max_memory_bytes,
            sweep_interval_ms = config.sweep_interval.as_millis() as u64,
            policy = ?config.eviction_policy,
            "Cache initialized"
        );

        Self {
            shared,
            sweeper: Mutex::new(sweeper),
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.shared.closed.load(Ordering::Acquire) {
            Err(CacheError::Closed)
        } else {
            Ok(())
        }
    }

    /// Reads a live entry under the shared lock, expiring it lazily if stale.
    fn peek<R>(&self, key: &str, now: i64, read: impl FnOnce(&CacheEntry<V>) -> R) -> Option<R> {
        {
            let state = self.shared.state.read();
            match state.store.get(key) {
                None => return None,
                Some(entry) if !entry.is_expired_at(now) => return Some(read(entry)),
                Some(_) => {}
            }
        }

        self.shared.expire_if_stale(key, now);
        None
    }

    // == Set ==
    /// Stores a value, replacing any previous value and TTL for the key.
    ///
    /// `ttl` of None or zero means the entry never expires. Fails with
    /// [`CacheError::TooLarge`] or [`CacheError::OutOfMemory`] when the value
    /// cannot be admitted; the cache is unchanged in that case.
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Option<Duration>) -> Result<()> {
        self.ensure_open()?;

        let key = key.into();
        let size = value.cache_size();
        let now = self.shared.now();
        let expires_at = deadline_after(now, ttl);
        let stamp = self.shared.next_stamp();

        let mut guard = self.shared.state.write();
        // close() may have cleared the store while we waited for the lock
        self.ensure_open()?;
        let state = &mut *guard;

        match state.admission.admit(&state.store, &key, size, now) {
            Admission::Reject(err) => {
                self.shared.stats.record_rejection();
                debug!(key = %key, size, error = %err, "Rejected write");
                return Err(err);
            }
            Admission::Admit { evict } => {
                self.shared.remove_victims(&mut state.store, evict, now);
            }
        }

        state
            .store
            .insert(key.clone(), CacheEntry::new(value, expires_at, size, stamp));
        // Untracks when the new value has no TTL
        self.shared.expiring.track(&key, expires_at);

        Ok(())
    }

    // == Get ==
    /// Retrieves a value by key.
    ///
    /// Returns `Ok(None)` for absent or expired keys; expired entries are
    /// removed on the way out.
    pub fn get(&self, key: &str) -> Result<Option<V>> {
        self.ensure_open()?;

        let now = self.shared.now();
        let stamp = self.shared.next_stamp();
        let value = self.peek(key, now, |entry| {
            entry.touch(stamp);
            entry.value.clone()
        });

        match value {
            Some(_) => self.shared.stats.record_hit(),
            None => self.shared.stats.record_miss(),
        }

        Ok(value)
    }

    // == Exists ==
    /// Returns true if the key holds a live value. Honors lazy expiration.
    pub fn exists(&self, key: &str) -> Result<bool> {
        self.ensure_open()?;

        let now = self.shared.now();
        Ok(self.peek(key, now, |_| ()).is_some())
    }

    // == TTL ==
    /// Remaining time to live of a live key, None if absent or without TTL.
    pub fn ttl(&self, key: &str) -> Result<Option<Duration>> {
        self.ensure_open()?;

        let now = self.shared.now();
        Ok(self
            .peek(key, now, |entry| entry.ttl_remaining_at(now))
            .flatten())
    }

    // == Delete ==
    /// Removes an entry by key. Returns false if it was absent or already
    /// expired.
    pub fn delete(&self, key: &str) -> Result<bool> {
        self.ensure_open()?;

        let now = self.shared.now();
        let mut state = self.shared.state.write();
        self.ensure_open()?;

        match state.store.remove(key) {
            Some(entry) => {
                self.shared.expiring.untrack(key);
                if entry.is_expired_at(now) {
                    self.shared.stats.record_expirations(1);
                    Ok(false)
                } else {
                    Ok(true)
                }
            }
            None => Ok(false),
        }
    }

    // == Flush ==
    /// Removes every entry. Always `Ok(true)` on an open cache.
    pub fn flush(&self) -> Result<bool> {
        self.ensure_open()?;

        let mut state = self.shared.state.write();
        self.ensure_open()?;
        let removed = state.store.clear();
        self.shared.expiring.clear();

        debug!(removed, "Cache flushed");
        Ok(true)
    }

    // == Keys ==
    /// Returns the number of stored keys in O(1).
    ///
    /// Expired keys that have not been swept or read yet are still counted.
    pub fn keys(&self) -> Result<u64> {
        self.ensure_open()?;
        Ok(self.shared.state.read().store.len())
    }

    /// Returns the summed size of all stored values in bytes.
    pub fn memory_usage(&self) -> Result<u64> {
        self.ensure_open()?;
        Ok(self.shared.state.read().store.memory_usage())
    }

    /// Returns the memory ceiling in bytes, 0 = unbounded.
    pub fn max_memory(&self) -> Result<u64> {
        self.ensure_open()?;
        Ok(self.shared.state.read().admission.max_memory())
    }

    // == Set Max Memory ==
    /// Changes the memory ceiling. Lowering it evicts entries until usage
    /// fits before returning. 0 removes the limit.
    pub fn set_max_memory(&self, bytes: u64) -> Result<()> {
        self.ensure_open()?;

        let now = self.shared.now();
        let mut guard = self.shared.state.write();
        self.ensure_open()?;
        let state = &mut *guard;

        state.admission.set_max_memory(bytes);
        let victims = state.admission.reclaim(&state.store, now);
        self.shared.remove_victims(&mut state.store, victims, now);

        info!(max_memory = bytes, usage = state.store.memory_usage(), "Memory limit updated");
        Ok(())
    }

    /// Changes the memory ceiling from a human-readable size such as `"64MB"`.
    pub fn set_max_memory_str(&self, size: &str) -> Result<()> {
        let bytes = parse_memory_size(size)?;
        self.set_max_memory(bytes)
    }

    // == Purge Expired ==
    /// Runs one sweep pass synchronously. Returns the number of keys removed.
    pub fn purge_expired(&self) -> Result<usize> {
        self.ensure_open()?;
        Ok(self.shared.sweep(None).unwrap_or(0))
    }

    // == Stats ==
    /// Returns a snapshot of the cache metrics.
    pub fn stats(&self) -> Result<CacheStats> {
        self.ensure_open()?;

        let state = self.shared.state.read();
        Ok(self.shared.stats.snapshot(
            state.store.len(),
            state.store.memory_usage(),
            state.admission.max_memory(),
        ))
    }
}

impl<V> Cache<V> {
    // == Close ==
    /// Stops the sweeper, waits for it to exit and releases all entries.
    ///
    /// The closed flag is raised before the store lock is taken, and writers
    /// check it again once they hold that lock, so nothing is inserted after
    /// the store is cleared. Idempotent. Every later operation returns
    /// [`CacheError::Closed`].
    pub fn close(&self) {
        let first = !self.shared.closed.swap(true, Ordering::AcqRel);

        self.sweeper.lock().stop();

        let mut state = self.shared.state.write();
        state.store.clear();
        self.shared.expiring.clear();

        if first {
            info!("Cache closed");
        }
    }

    /// Returns true once [`Cache::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    /// Returns the lifecycle state of the background sweeper.
    pub fn sweeper_state(&self) -> SweeperState {
        self.sweeper.lock().state()
    }
}

impl<V> Drop for Cache<V> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<V> fmt::Debug for Cache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.read();
        f.debug_struct("Cache")
            .field("keys", &state.store.len())
            .field("memory_usage", &state.store.memory_usage())
            .field("max_memory", &state.admission.max_memory())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}
