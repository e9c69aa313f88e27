//! Error types for the cache engine
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache engine.
///
/// Misses are not errors: an absent or expired key is reported as `Ok(None)`
/// or `Ok(false)` by the read operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Value is larger than the memory ceiling even with every other entry evicted
    #[error("Value of {size} bytes exceeds the memory limit of {max} bytes")]
    TooLarge { size: u64, max: u64 },

    /// Value does not fit the current headroom and the policy forbids eviction
    #[error("Value of {size} bytes does not fit ({available} bytes available)")]
    OutOfMemory { size: u64, available: u64 },

    /// Operation invoked after the cache was closed
    #[error("Cache is closed")]
    Closed,

    /// Human-readable memory size could not be parsed
    #[error("Invalid memory size: {0}")]
    InvalidMemorySize(String),
}

// == Result Type Alias ==
/// Convenience Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;
