//! Configuration Module
//!
//! Resolves the memory budget and sweep cadence handed to the cache at
//! construction time, either programmatically or from environment variables.

use std::env;
use std::time::Duration;

use tracing::warn;

use crate::cache::EvictionPolicy;
use crate::error::{CacheError, Result};

/// Default interval between active expiration sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Memory ceiling in bytes, 0 = unbounded
    pub max_memory_bytes: u64,
    /// Active expiration tick period, zero disables the sweeper
    pub sweep_interval: Duration,
    /// What to do when an insert does not fit the memory ceiling
    pub eviction_policy: EvictionPolicy,
}

impl Config {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the memory ceiling in bytes.
    pub fn with_max_memory(mut self, bytes: u64) -> Self {
        self.max_memory_bytes = bytes;
        self
    }

    /// Sets the active sweep interval. `Duration::ZERO` disables the sweeper.
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Sets the eviction policy.
    pub fn with_eviction_policy(mut self, policy: EvictionPolicy) -> Self {
        self.eviction_policy = policy;
        self
    }

    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `MAX_MEMORY` - Memory ceiling such as `256MB` (default: unbounded)
    /// - `SWEEP_INTERVAL_MS` - Sweep period in milliseconds, 0 disables (default: 1000)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let max_memory_bytes = match env::var("MAX_MEMORY") {
            Ok(raw) => parse_memory_size(&raw).unwrap_or_else(|err| {
                warn!(value = %raw, error = %err, "Ignoring MAX_MEMORY");
                defaults.max_memory_bytes
            }),
            Err(_) => defaults.max_memory_bytes,
        };

        let sweep_interval = match env::var("SWEEP_INTERVAL_MS") {
            Ok(raw) => match raw.trim().parse::<u64>() {
                Ok(ms) => Duration::from_millis(ms),
                Err(err) => {
                    warn!(value = %raw, error = %err, "Ignoring SWEEP_INTERVAL_MS");
                    defaults.sweep_interval
                }
            },
            Err(_) => defaults.sweep_interval,
        };

        Self {
            max_memory_bytes,
            sweep_interval,
            eviction_policy: defaults.eviction_policy,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_memory_bytes: 0,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            eviction_policy: EvictionPolicy::Lru,
        }
    }
}

// == Memory Size Parsing ==
/// Parses a human-readable memory size such as `"512"`, `"64KB"` or `"1 GB"`.
///
/// Units are case-insensitive powers of 1024: `B`, `KB`, `MB`, `GB`, `TB`.
/// A bare number is a byte count.
pub fn parse_memory_size(input: &str) -> Result<u64> {
    let trimmed = input.trim();
    let split = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let (digits, unit) = trimmed.split_at(split);

    if digits.is_empty() {
        return Err(CacheError::InvalidMemorySize(input.to_string()));
    }

    let amount: u64 = digits
        .parse()
        .map_err(|_| CacheError::InvalidMemorySize(input.to_string()))?;

    let multiplier: u64 = match unit.trim().to_ascii_uppercase().as_str() {
        "" | "B" => 1,
        "KB" | "K" => 1 << 10,
        "MB" | "M" => 1 << 20,
        "GB" | "G" => 1 << 30,
        "TB" | "T" => 1 << 40,
        _ => return Err(CacheError::InvalidMemorySize(input.to_string())),
    };

    amount
        .checked_mul(multiplier)
        .ok_or_else(|| CacheError::InvalidMemorySize(input.to_string()))
}
