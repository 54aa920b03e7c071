//! Property-Based Tests for the Cache Engine
//!
//! Uses proptest to check the engine against straightforward reference
//! models over arbitrary operation sequences. The keyspace is kept small on
//! purpose so sequences collide, overwrite, and evict often.

use proptest::prelude::*;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::runtime::Runtime;

use crate::cache::Cache;
use crate::events::NullSink;

// == Test Configuration ==
const TEST_CAPACITY: usize = 8;
const TEST_TTL: Duration = Duration::from_secs(300);

// == Strategies ==
fn key_strategy() -> impl Strategy<Value = String> {
    "[a-d]{1,3}"
}

fn value_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ]{0,32}"
}

#[derive(Debug, Clone)]
enum CacheOp {
    Set { key: String, value: String },
    Get { key: String },
    Delete { key: String },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        (key_strategy(), value_strategy())
            .prop_map(|(key, value)| CacheOp::Set { key, value }),
        key_strategy().prop_map(|key| CacheOp::Get { key }),
        key_strategy().prop_map(|key| CacheOp::Delete { key }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    // The cache never holds more than `capacity` entries at any
    // observation point, whatever the operation sequence.
    #[test]
    fn prop_capacity_is_never_exceeded(ops in prop::collection::vec(cache_op_strategy(), 1..80)) {
        let rt = Runtime::new().unwrap();
        let max_len = rt.block_on(async move {
            let cache = Cache::new(TEST_CAPACITY, Arc::new(NullSink)).unwrap();
            let mut max_len = 0;
            for op in ops {
                match op {
                    CacheOp::Set { key, value } => cache.set(key, Value::String(value), TEST_TTL),
                    CacheOp::Get { key } => {
                        let _ = cache.get(&key);
                    }
                    CacheOp::Delete { key } => {
                        let _ = cache.delete(&key);
                    }
                }
                max_len = max_len.max(cache.len());
            }
            cache.shutdown();
            max_len
        });
        prop_assert!(max_len <= TEST_CAPACITY);
    }

    // Storing a value and reading it back before expiry returns exactly
    // the stored value.
    #[test]
    fn prop_roundtrip_returns_stored_value(key in key_strategy(), value in value_strategy()) {
        let rt = Runtime::new().unwrap();
        let expected = Value::String(value);
        let read = rt.block_on({
            let key = key.clone();
            let expected = expected.clone();
            async move {
                let cache = Cache::new(TEST_CAPACITY, Arc::new(NullSink)).unwrap();
                cache.set(key.clone(), expected, TEST_TTL);
                let read = cache.get(&key);
                cache.shutdown();
                read
            }
        });
        prop_assert_eq!(read, Some(expected));
    }

    // Overwriting a key leaves a single entry holding the latest value.
    #[test]
    fn prop_overwrite_keeps_latest_value(
        key in key_strategy(),
        first in value_strategy(),
        second in value_strategy()
    ) {
        let rt = Runtime::new().unwrap();
        let expected = Value::String(second);
        let (read, len) = rt.block_on({
            let key = key.clone();
            let expected = expected.clone();
            async move {
                let cache = Cache::new(TEST_CAPACITY, Arc::new(NullSink)).unwrap();
                cache.set(key.clone(), Value::String(first), TEST_TTL);
                cache.set(key.clone(), expected, TEST_TTL);
                let read = cache.get(&key);
                let len = cache.len();
                cache.shutdown();
                (read, len)
            }
        });
        prop_assert_eq!(read, Some(expected));
        prop_assert_eq!(len, 1);
    }

    // A deleted key reads as absent.
    #[test]
    fn prop_delete_removes_entry(key in key_strategy(), value in value_strategy()) {
        let rt = Runtime::new().unwrap();
        let (existed, read) = rt.block_on({
            let key = key.clone();
            async move {
                let cache = Cache::new(TEST_CAPACITY, Arc::new(NullSink)).unwrap();
                cache.set(key.clone(), Value::String(value), TEST_TTL);
                let existed = cache.delete(&key);
                let read = cache.get(&key);
                cache.shutdown();
                (existed, read)
            }
        });
        prop_assert!(existed);
        prop_assert_eq!(read, None);
    }

    // Replaying the same operations against a plain Vec model of LRU
    // ordering yields the same surviving keys in the same recency order.
    #[test]
    fn prop_eviction_matches_reference_model(ops in prop::collection::vec(cache_op_strategy(), 1..80)) {
        let rt = Runtime::new().unwrap();
        let (live, expected) = rt.block_on(async move {
            let cache = Cache::new(TEST_CAPACITY, Arc::new(NullSink)).unwrap();
            // front = most recently used
            let mut model: Vec<String> = Vec::new();

            for op in ops {
                match op {
                    CacheOp::Set { key, value } => {
                        cache.set(key.clone(), Value::String(value), TEST_TTL);
                        if let Some(pos) = model.iter().position(|tracked| *tracked == key) {
                            model.remove(pos);
                        } else if model.len() >= TEST_CAPACITY {
                            model.pop();
                        }
                        model.insert(0, key);
                    }
                    CacheOp::Get { key } => {
                        let _ = cache.get(&key);
                        if let Some(pos) = model.iter().position(|tracked| *tracked == key) {
                            let tracked = model.remove(pos);
                            model.insert(0, tracked);
                        }
                    }
                    CacheOp::Delete { key } => {
                        let _ = cache.delete(&key);
                        model.retain(|tracked| *tracked != key);
                    }
                }
            }

            let live: Vec<String> = cache.items().into_iter().map(|item| item.key).collect();
            cache.shutdown();
            (live, model)
        });
        prop_assert_eq!(live, expected);
    }

    // Statistics agree with a replay of the operation sequence.
    #[test]
    fn prop_statistics_accuracy(ops in prop::collection::vec(cache_op_strategy(), 1..50)) {
        let rt = Runtime::new().unwrap();
        let (stats, expected_hits, expected_misses, len) = rt.block_on(async move {
            let cache = Cache::new(TEST_CAPACITY, Arc::new(NullSink)).unwrap();
            let mut expected_hits: u64 = 0;
            let mut expected_misses: u64 = 0;

            for op in ops {
                match op {
                    CacheOp::Set { key, value } => cache.set(key, Value::String(value), TEST_TTL),
                    CacheOp::Get { key } => match cache.get(&key) {
                        Some(_) => expected_hits += 1,
                        None => expected_misses += 1,
                    },
                    CacheOp::Delete { key } => {
                        let _ = cache.delete(&key);
                    }
                }
            }

            let stats = cache.stats();
            let len = cache.len();
            cache.shutdown();
            (stats, expected_hits, expected_misses, len)
        });
        prop_assert_eq!(stats.hits, expected_hits, "Hits mismatch");
        prop_assert_eq!(stats.misses, expected_misses, "Misses mismatch");
        prop_assert_eq!(stats.entries, len, "Entry count mismatch");
    }
}
