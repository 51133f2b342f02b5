//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the TLRU cache against a simple reference model.

use proptest::prelude::*;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{AssignmentCacheKey, TlruCache};
use crate::clock::{Clock, ManualClock};

// == Test Configuration ==
const TEST_TTL_MS: u64 = 50;

// == Strategies ==
/// Small key space so operations collide often
fn key_strategy() -> impl Strategy<Value = String> {
    "[a-e]{1,2}"
}

fn value_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ]{1,32}"
}

#[derive(Debug, Clone)]
enum CacheOp {
    Set { key: String, value: String },
    Get { key: String },
    Delete { key: String },
    Advance { ms: u64 },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        (key_strategy(), value_strategy()).prop_map(|(key, value)| CacheOp::Set { key, value }),
        key_strategy().prop_map(|key| CacheOp::Get { key }),
        key_strategy().prop_map(|key| CacheOp::Delete { key }),
        (0u64..=TEST_TTL_MS).prop_map(|ms| CacheOp::Advance { ms }),
    ]
}

fn cache_with_clock(capacity: usize) -> (TlruCache, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(10_000));
    let cache = TlruCache::with_clock(capacity, Duration::from_millis(TEST_TTL_MS), clock.clone())
        .unwrap();
    (cache, clock)
}

// == Reference Model ==
/// Unbounded map of key -> (value, expires_at) with sweep-on-access semantics.
#[derive(Default)]
struct Model {
    entries: HashMap<String, (String, u64)>,
}

impl Model {
    fn sweep(&mut self, now: u64) {
        self.entries.retain(|_, (_, at)| *at > now);
    }

    fn set(&mut self, key: &str, value: &str, now: u64) {
        self.sweep(now);
        self.entries
            .insert(key.to_string(), (value.to_string(), now + TEST_TTL_MS));
    }

    fn get(&mut self, key: &str, now: u64) -> Option<String> {
        self.sweep(now);
        let entry = self.entries.get_mut(key)?;
        entry.1 = now + TEST_TTL_MS;
        Some(entry.0.clone())
    }

    fn delete(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    fn has(&self, key: &str, now: u64) -> bool {
        matches!(self.entries.get(key), Some((_, at)) if *at > now)
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    // Without capacity pressure the cache behaves exactly like the model.
    #[test]
    fn prop_matches_reference_model(ops in prop::collection::vec(cache_op_strategy(), 1..80)) {
        let (mut cache, clock) = cache_with_clock(1_000);
        let mut model = Model::default();

        for op in ops {
            let now = clock.now_ms();
            match op {
                CacheOp::Set { key, value } => {
                    cache.set(key.clone(), value.clone());
                    model.set(&key, &value, now);
                }
                CacheOp::Get { key } => {
                    prop_assert_eq!(cache.get(&key), model.get(&key, now), "get({})", key);
                }
                CacheOp::Delete { key } => {
                    prop_assert_eq!(cache.delete(&key), model.delete(&key), "delete({})", key);
                }
                CacheOp::Advance { ms } => clock.advance(Duration::from_millis(ms)),
            }

            let now = clock.now_ms();
            for key in ["a", "b", "c", "d", "e"] {
                prop_assert_eq!(cache.has(key), model.has(key, now), "has({})", key);
            }
        }
    }

    // The store and the expiry registry always hold the same keys, and the
    // registry stays ordered by expiry.
    #[test]
    fn prop_store_and_registry_agree(
        capacity in 1usize..6,
        ops in prop::collection::vec(cache_op_strategy(), 1..80)
    ) {
        let (mut cache, clock) = cache_with_clock(capacity);

        for op in ops {
            match op {
                CacheOp::Set { key, value } => cache.set(key, value),
                CacheOp::Get { key } => { cache.get(&key); }
                CacheOp::Delete { key } => { cache.delete(&key); }
                CacheOp::Advance { ms } => clock.advance(Duration::from_millis(ms)),
            }

            let registry = cache.registry();
            prop_assert!(cache.len() <= capacity, "size {} exceeds {}", cache.len(), capacity);
            prop_assert_eq!(registry.len(), cache.len());

            let expiries: Vec<u64> = registry.iter().map(|(_, at)| *at).collect();
            prop_assert!(expiries.windows(2).all(|w| w[0] <= w[1]), "registry out of order: {:?}", expiries);

            let registered: HashSet<&str> = registry.iter().map(|(k, _)| k.as_str()).collect();
            let mut stored = HashSet::new();
            cache.for_each(|k, _| { stored.insert(k.to_string()); });
            for key in &stored {
                prop_assert!(registered.contains(key.as_str()), "{} missing from registry", key);
            }
        }
    }

    // A sweep only removes entries whose expiry has passed.
    #[test]
    fn prop_sweep_keeps_live_entries(
        gaps in prop::collection::vec(0u64..20, 1..20),
        elapsed in 0u64..(TEST_TTL_MS * 2)
    ) {
        let (mut cache, clock) = cache_with_clock(100);

        for (i, gap) in gaps.iter().enumerate() {
            clock.advance(Duration::from_millis(*gap));
            cache.set(format!("k{}", i), "v");
        }
        clock.advance(Duration::from_millis(elapsed));

        let now = clock.now_ms();
        let expected_live = cache.registry().iter().filter(|(_, at)| *at > now).count();
        let expected_dead = cache.len() - expected_live;

        prop_assert_eq!(cache.evict_expired(), expected_dead);
        prop_assert_eq!(cache.len(), expected_live);
        prop_assert!(cache.registry().iter().all(|(_, at)| *at > now));
    }

    // Distinct composite keys never share an encoding.
    #[test]
    fn prop_assignment_key_injective(
        a in prop::array::uniform4("[a-c:0-9]{0,4}"),
        b in prop::array::uniform4("[a-c:0-9]{0,4}")
    ) {
        let ka = AssignmentCacheKey::new(a[0].clone(), a[1].clone(), a[2].clone(), a[3].clone());
        let kb = AssignmentCacheKey::new(b[0].clone(), b[1].clone(), b[2].clone(), b[3].clone());

        prop_assert_eq!(ka == kb, ka.to_cache_key() == kb.to_cache_key());
        prop_assert_eq!(ka.to_cache_key(), ka.clone().to_cache_key());
    }
}
