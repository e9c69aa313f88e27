//! Integration Tests for the Cache Engine
//!
//! Exercises the public API end to end with the real clock and the
//! background sweeper.

use std::collections::HashMap;
use std::sync::{Arc, Barrier};
use std::thread::{self, sleep};
use std::time::{Duration, Instant};

use mem_cache::{Cache, CacheError, Config, SweeperState};

// == Helper Functions ==

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn create_test_cache(max_memory: u64, sweep_interval: Duration) -> Cache<String> {
    init_tracing();
    Cache::new(
        Config::new()
            .with_max_memory(max_memory)
            .with_sweep_interval(sweep_interval),
    )
}

// == Basic Operations ==

#[test]
fn test_set_without_ttl_persists() {
    let cache = create_test_cache(0, Duration::from_millis(10));

    cache.set("key", "value".to_string(), None).unwrap();
    sleep(Duration::from_millis(50));

    assert_eq!(cache.get("key").unwrap(), Some("value".to_string()));
    assert!(cache.exists("key").unwrap());
}

#[test]
fn test_zero_ttl_means_no_expiry() {
    let cache = create_test_cache(0, Duration::from_millis(10));

    cache
        .set("key", "value".to_string(), Some(Duration::ZERO))
        .unwrap();
    sleep(Duration::from_millis(30));

    assert_eq!(cache.ttl("key").unwrap(), None);
    assert!(cache.exists("key").unwrap());
}

#[test]
fn test_flush_clears_everything() {
    let cache = create_test_cache(0, Duration::from_secs(1));

    for i in 0..10 {
        cache.set(format!("key{i}"), "v".to_string(), None).unwrap();
    }

    assert!(cache.flush().unwrap());
    assert_eq!(cache.keys().unwrap(), 0);
    assert_eq!(cache.memory_usage().unwrap(), 0);
    for i in 0..10 {
        assert_eq!(cache.get(&format!("key{i}")).unwrap(), None);
    }
}

#[test]
fn test_set_then_delete() {
    let cache = create_test_cache(0, Duration::from_secs(1));

    cache.set("keep", "12345".to_string(), None).unwrap();
    cache.set("gone", "abc".to_string(), None).unwrap();
    assert!(cache.delete("gone").unwrap());

    assert!(!cache.exists("gone").unwrap());
    assert_eq!(cache.memory_usage().unwrap(), 5);
    assert_eq!(cache.keys().unwrap(), 1);
}

// == Expiration ==

#[test]
fn test_ttl_expires_on_read() {
    // Sweeper disabled: only lazy expiration can hide the key
    let cache = create_test_cache(0, Duration::ZERO);
    assert_eq!(cache.sweeper_state(), SweeperState::Disabled);

    cache
        .set("x", "v1".to_string(), Some(Duration::from_millis(50)))
        .unwrap();
    assert_eq!(cache.get("x").unwrap(), Some("v1".to_string()));

    sleep(Duration::from_millis(60));

    assert_eq!(cache.get("x").unwrap(), None);
    assert!(!cache.exists("x").unwrap());
}

#[test]
fn test_sweeper_removes_unread_keys() {
    let cache = create_test_cache(0, Duration::from_millis(10));

    for i in 0..10 {
        cache
            .set(
                format!("short{i}"),
                "value".to_string(),
                Some(Duration::from_millis(30)),
            )
            .unwrap();
    }
    cache.set("persistent", "value".to_string(), None).unwrap();
    assert_eq!(cache.keys().unwrap(), 11);

    sleep(Duration::from_millis(200));

    // Keys() does not expire lazily, so only the sweeper can bring this down
    assert_eq!(cache.keys().unwrap(), 1);
    assert_eq!(cache.memory_usage().unwrap(), 5);
    assert!(cache.exists("persistent").unwrap());
    assert_eq!(cache.stats().unwrap().expirations, 10);
}

#[test]
fn test_sweeper_preserves_valid_entries() {
    let cache = create_test_cache(0, Duration::from_millis(10));

    cache
        .set("long_lived", "value".to_string(), Some(Duration::from_secs(3600)))
        .unwrap();
    sleep(Duration::from_millis(60));

    assert_eq!(cache.get("long_lived").unwrap(), Some("value".to_string()));
}

// == Admission Control ==

#[test]
fn test_eviction_scenario() {
    let cache = create_test_cache(100, Duration::from_secs(1));

    cache.set("a", "a".repeat(60), None).unwrap();
    cache.set("b", "b".repeat(60), None).unwrap();

    assert!(!cache.exists("a").unwrap());
    assert!(cache.exists("b").unwrap());
    assert_eq!(cache.memory_usage().unwrap(), 60);
    assert_eq!(cache.stats().unwrap().evictions, 1);
}

#[test]
fn test_too_large_value_rejected() {
    let cache = create_test_cache(100, Duration::from_secs(1));

    cache.set("a", "a".repeat(60), None).unwrap();
    let result = cache.set("huge", "h".repeat(101), None);

    assert_eq!(result, Err(CacheError::TooLarge { size: 101, max: 100 }));
    assert!(cache.exists("a").unwrap());
    assert!(!cache.exists("huge").unwrap());
    assert_eq!(cache.memory_usage().unwrap(), 60);
}

#[test]
fn test_runtime_memory_limit() {
    let cache = create_test_cache(0, Duration::from_secs(1));

    for i in 0..8 {
        cache.set(format!("key{i}"), "x".repeat(1024), None).unwrap();
    }

    cache.set_max_memory_str("4KB").unwrap();

    assert_eq!(cache.max_memory().unwrap(), 4096);
    assert_eq!(cache.memory_usage().unwrap(), 4096);
    assert_eq!(cache.keys().unwrap(), 4);
    assert!(cache.exists("key7").unwrap());
    assert!(!cache.exists("key0").unwrap());
}

// == Shutdown ==

#[test]
fn test_close_stops_sweeper_and_rejects_calls() {
    // Long interval: close must not wait for the next tick
    let cache = create_test_cache(0, Duration::from_secs(3600));
    assert_eq!(cache.sweeper_state(), SweeperState::Idle);

    cache.set("key", "value".to_string(), None).unwrap();

    let started = Instant::now();
    cache.close();
    assert!(started.elapsed() < Duration::from_secs(1));

    assert_eq!(cache.sweeper_state(), SweeperState::Stopped);
    assert_eq!(cache.get("key"), Err(CacheError::Closed));
    assert_eq!(cache.memory_usage(), Err(CacheError::Closed));
    assert_eq!(cache.purge_expired(), Err(CacheError::Closed));
}

#[test]
fn test_close_is_idempotent_across_threads() {
    let cache = Arc::new(create_test_cache(0, Duration::from_millis(5)));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || cache.close())
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert!(cache.is_closed());
    assert_eq!(cache.sweeper_state(), SweeperState::Stopped);
}

// == Statistics ==

#[test]
fn test_stats_snapshot_serializes() {
    let cache = create_test_cache(1024, Duration::from_secs(1));

    cache.set("key", "value".to_string(), None).unwrap();
    cache.get("key").unwrap();
    cache.get("missing").unwrap();

    let stats = cache.stats().unwrap();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hit_rate(), 0.5);

    let json = serde_json::to_value(&stats).unwrap();
    assert_eq!(json["keys"], 1);
    assert_eq!(json["memory_usage"], 5);
    assert_eq!(json["max_memory"], 1024);
}

// == Concurrency ==

#[test]
fn test_concurrent_access() {
    const THREADS: usize = 100;
    const KEYS: usize = 32;

    let cache = Arc::new(create_test_cache(0, Duration::from_millis(5)));
    let barrier = Arc::new(Barrier::new(THREADS));
    let deadline = Instant::now() + Duration::from_secs(1);

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let cache = Arc::clone(&cache);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let mut i = t;
                while Instant::now() < deadline {
                    let key = format!("key{}", i % KEYS);
                    match i % 4 {
                        0 | 1 => {
                            let ttl = (i % 8 == 0).then(|| Duration::from_millis(20));
                            cache.set(key, format!("value-{t}-{i}"), ttl).unwrap();
                        }
                        2 => {
                            if let Some(value) = cache.get(&key).unwrap() {
                                assert!(value.starts_with("value-"));
                            }
                        }
                        _ => {
                            cache.delete(&key).unwrap();
                        }
                    }
                    i += 7;
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    // Drop short-lived entries so the count reflects live keys only
    sleep(Duration::from_millis(30));
    cache.purge_expired().unwrap();

    let mut live: HashMap<String, String> = HashMap::new();
    for i in 0..KEYS {
        let key = format!("key{i}");
        if let Some(value) = cache.get(&key).unwrap() {
            live.insert(key, value);
        }
    }

    assert_eq!(cache.keys().unwrap(), live.len() as u64);
    let expected_usage: u64 = live.values().map(|v| v.len() as u64).sum();
    assert_eq!(cache.memory_usage().unwrap(), expected_usage);
}

#[test]
fn test_concurrent_memory_bound() {
    const MAX: u64 = 512;

    let cache = Arc::new(create_test_cache(MAX, Duration::from_millis(5)));

    let handles: Vec<_> = (0..16)
        .map(|t| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                for i in 0..500 {
                    let value = "x".repeat((t * 7 + i) % 100);
                    cache.set(format!("key{}", (t + i) % 64), value, None).unwrap();
                    assert!(cache.memory_usage().unwrap() <= MAX);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert!(cache.memory_usage().unwrap() <= MAX);
}
