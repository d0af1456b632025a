//! End-to-end behaviour of LruMap through its public API

use std::sync::Arc;
use std::thread;

use lrumap::{CacheConfig, Error, EvictionEnd, LruMap, ManualClock};

#[test]
fn test_smoke_scenario_oldest_end() {
    let cache = LruMap::new(2).unwrap();

    cache.set("a", 1);
    cache.set("b", 2);
    cache.set("a", 3);
    cache.set("c", 4);
    cache.flush().unwrap();

    assert_eq!(cache.len(), 2);
    assert_eq!(cache.get("a"), Some(3));
    assert_eq!(cache.get("b"), None);
    assert_eq!(cache.get("c"), Some(4));
}

#[test]
fn test_smoke_scenario_newest_end() {
    let config = CacheConfig::new(2).with_eviction(EvictionEnd::Newest);
    let cache = LruMap::with_clock(config, ManualClock::new(0)).unwrap();

    cache.set("a", 1);
    cache.set("b", 2);
    cache.set("a", 3);
    cache.set("c", 4);
    cache.flush().unwrap();

    assert_eq!(cache.len(), 2);
    assert_eq!(cache.get("a"), None);
    assert_eq!(cache.get("b"), Some(2));
    assert_eq!(cache.get("c"), Some(4));
    assert_eq!(cache.stats().evictions(), 1);
}

#[test]
fn test_one_over_capacity_evicts_once() {
    let cache = LruMap::new(5).unwrap();

    for i in 0..6 {
        cache.set(format!("k{}", i), i);
    }
    cache.flush().unwrap();

    assert_eq!(cache.len(), 5);
    assert_eq!(cache.stats().evictions(), 1);
    assert_eq!(cache.stats().inserts(), 6);
    assert_eq!(cache.get("k0"), None);
    assert_eq!(cache.get("k5"), Some(5));
}

#[test]
fn test_update_keeps_count_and_moves_to_newest() {
    let clock = ManualClock::new(100);
    let cache = LruMap::with_clock(CacheConfig::new(3), clock.clone()).unwrap();

    cache.set("a", 1);
    cache.set("b", 2);
    cache.set("c", 3);
    cache.flush().unwrap();

    clock.advance(50);
    cache.set("a", 10);
    cache.flush().unwrap();

    assert_eq!(cache.len(), 3);
    let entries = cache.snapshot().unwrap();
    let newest = entries.last().unwrap();
    assert_eq!(newest.key, "a");
    assert_eq!(newest.value, 10);
    assert_eq!(newest.timestamp, 150);
}

#[test]
fn test_backwards_clock_inserts_mid_chain() {
    let clock = ManualClock::new(100);
    let cache = LruMap::with_clock(CacheConfig::new(4), clock.clone()).unwrap();

    cache.set("a", 1);
    cache.flush().unwrap();
    clock.set(300);
    cache.set("c", 3);
    cache.flush().unwrap();
    clock.set(200);
    cache.set("b", 2);

    let keys: Vec<String> = cache
        .snapshot()
        .unwrap()
        .into_iter()
        .map(|entry| entry.key)
        .collect();
    assert_eq!(keys, ["a", "b", "c"]);
}

#[test]
fn test_concurrent_writers_respect_capacity() {
    let cache = Arc::new(LruMap::new(100).unwrap());

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                for i in 0..500u64 {
                    cache.set(format!("key_{}_{}", t, i), i);
                    let _ = cache.get(&format!("key_{}_{}", t, i / 2));
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    cache.flush().unwrap();

    assert_eq!(cache.len(), 100);
    assert_eq!(cache.stats().inserts(), 2000);
    assert_eq!(cache.stats().evictions(), 1900);

    let entries = cache.snapshot().unwrap();
    assert_eq!(entries.len(), 100);
    assert!(entries
        .windows(2)
        .all(|pair| pair[0].timestamp <= pair[1].timestamp));
}

#[test]
fn test_same_key_writes_apply_in_order() {
    let cache = LruMap::new(4).unwrap();

    for i in 0..1000 {
        cache.set("counter", i);
    }
    cache.flush().unwrap();

    assert_eq!(cache.get("counter"), Some(999));
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.stats().updates(), 999);
}

#[test]
fn test_readers_during_writes() {
    let cache = Arc::new(LruMap::new(16).unwrap());
    cache.set("stable", 0u32);
    cache.flush().unwrap();

    let reader = {
        let cache = Arc::clone(&cache);
        thread::spawn(move || {
            for _ in 0..10_000 {
                // either the old or a newer value, never torn
                let value = cache.get("stable").unwrap();
                assert!(value <= 500);
            }
        })
    };

    for i in 1..=500u32 {
        cache.set("stable", i);
    }

    reader.join().unwrap();
    cache.flush().unwrap();
    assert_eq!(cache.get("stable"), Some(500));
}

#[test]
fn test_len_stays_full_while_evicting() {
    let cache = Arc::new(LruMap::new(4).unwrap());
    for i in 0..4u32 {
        cache.set(format!("seed{}", i), i);
    }
    cache.flush().unwrap();

    let reader = {
        let cache = Arc::clone(&cache);
        thread::spawn(move || {
            for _ in 0..50_000 {
                // each eviction swaps one key for another in a single step
                assert_eq!(cache.len(), 4);
            }
        })
    };

    for i in 0..20_000u32 {
        cache.set(format!("k{}", i), i);
    }

    reader.join().unwrap();
    cache.flush().unwrap();
    assert_eq!(cache.len(), 4);
    assert_eq!(cache.stats().evictions(), 20_000);
}

#[test]
fn test_try_set_reports_rejections() {
    let config = CacheConfig::new(8).with_queue_depth(1);
    let cache = LruMap::with_config(config).unwrap();

    let mut rejected = 0;
    for i in 0..10_000u32 {
        match cache.try_set(format!("k{}", i % 8), i) {
            Ok(()) => {}
            Err(Error::QueueFull) => rejected += 1,
            Err(other) => panic!("unexpected error: {}", other),
        }
    }
    cache.flush().unwrap();

    assert_eq!(cache.stats().rejected(), rejected);
    assert!(cache.len() <= 8);
}

#[test]
fn test_close_is_idempotent() {
    let cache = LruMap::new(4).unwrap();

    cache.set("a", 1);
    cache.flush().unwrap();

    cache.close();
    cache.close();
    cache.set("b", 2);
    cache.close();

    assert!(cache.is_closed());
    assert_eq!(cache.get("a"), None);
    assert_eq!(cache.get("b"), None);
    assert!(cache.is_empty());
    assert!(matches!(cache.snapshot(), Err(Error::Closed)));
}

#[test]
fn test_close_while_writers_blocked() {
    let config = CacheConfig::new(4).with_queue_depth(1);
    let cache = Arc::new(LruMap::with_config(config).unwrap());

    let writers: Vec<_> = (0..4)
        .map(|t| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                for i in 0..10_000u32 {
                    cache.set(format!("w{}", t), i);
                }
            })
        })
        .collect();

    cache.close();

    for writer in writers {
        writer.join().unwrap();
    }
    assert_eq!(cache.get("w0"), None);
}

#[test]
fn test_drop_joins_writer() {
    let cache = LruMap::new(4).unwrap();
    cache.set("a", vec![1u8, 2, 3]);
    drop(cache);
}

#[tokio::test]
async fn test_async_set_and_flush() {
    let cache = LruMap::new(3).unwrap();

    for i in 0..5 {
        cache.set_async(format!("k{}", i), i).await;
    }
    cache.flush_async().await.unwrap();

    assert_eq!(cache.len(), 3);
    assert_eq!(cache.get("k4"), Some(4));
    assert_eq!(cache.get("k0"), None);

    cache.close();
    assert!(matches!(cache.flush_async().await, Err(Error::Closed)));
}

#[tokio::test]
async fn test_async_snapshot_and_dump() {
    let cache = LruMap::with_clock(CacheConfig::new(4), ManualClock::new(9)).unwrap();

    cache.set_async("a", 1).await;
    cache.set_async("b", 2).await;
    cache.flush_async().await.unwrap();

    let entries = cache.snapshot_async().await.unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].key, "a");

    let mut out = Vec::new();
    cache.debug_dump_async(&mut out).await.unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), "a 1 9\nb 2 9\n\n");

    cache.close();
    assert!(matches!(cache.snapshot_async().await, Err(Error::Closed)));
}

#[tokio::test]
async fn test_blocking_calls_inside_runtime_do_not_panic() {
    let cache = LruMap::new(4).unwrap();

    // sync set falls back to a non-blocking submit
    cache.set("a", 1);
    cache.flush_async().await.unwrap();
    assert_eq!(cache.get("a"), Some(1));

    assert!(matches!(cache.flush(), Err(Error::InsideRuntime)));
    assert!(matches!(cache.snapshot(), Err(Error::InsideRuntime)));
    assert!(matches!(
        cache.debug_dump(Vec::new()),
        Err(Error::InsideRuntime)
    ));
}
