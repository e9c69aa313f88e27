//! Cache Module
//!
//! Provides in-memory caching with TTL expiration and memory-bounded LRU
//! admission.

mod admission;
mod clock;
mod engine;
mod entry;
mod expiry;
mod size;
mod stats;
mod store;


// Re-export public types
pub use admission::{Admission, AdmissionController, EvictionPolicy};
pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::Cache;
pub use entry::{CacheEntry, NO_EXPIRY};
pub use expiry::ExpirationIndex;
pub use size::CacheSize;
pub use stats::CacheStats;
pub use store::EntryStore;

pub(crate) use stats::StatsRecorder;
