//! mem_cache - An in-process concurrent key-value cache
//!
//! Stores opaque values with optional TTL behind a reader-writer lock.
//! Expired entries are removed lazily on read and actively by a background
//! sweeper; a memory ceiling is enforced by evicting least recently used
//! entries.
//!
//! ```
//! use std::time::Duration;
//! use mem_cache::{Cache, Config};
//!
//! let cache: Cache<String> = Cache::new(Config::new().with_max_memory(1024));
//! cache.set("greeting", "hello".to_string(), Some(Duration::from_secs(60)))?;
//! assert_eq!(cache.get("greeting")?, Some("hello".to_string()));
//! cache.close();
//! # Ok::<(), mem_cache::CacheError>(())
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod tasks;

pub use cache::{Cache, CacheSize, CacheStats, EvictionPolicy};
pub use config::Config;
pub use error::{CacheError, Result};
pub use tasks::SweeperState;
