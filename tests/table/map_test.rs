/*!
 * Robin Hood Map Tests
 * Resize behavior, insertion-order iteration, and removal semantics
 */

use memkit::RhMap;
use pretty_assertions::assert_eq;
use std::hash::{BuildHasher, Hasher};

/// Hasher that reports integer keys as their own hash, so probe paths in a
/// test are exact.
#[derive(Default)]
struct PassThrough(u64);

impl Hasher for PassThrough {
    fn finish(&self) -> u64 {
        self.0
    }

    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 = (self.0 << 8) | u64::from(b);
        }
    }

    fn write_u64(&mut self, n: u64) {
        self.0 = n;
    }
}

struct PassThroughState;

impl BuildHasher for PassThroughState {
    type Hasher = PassThrough;

    fn build_hasher(&self) -> PassThrough {
        PassThrough::default()
    }
}

#[test]
fn test_resize_past_threshold_keeps_all_keys() {
    let mut map = RhMap::with_capacity(31);
    let initial = map.table_size();

    // 31 slots resize once the entry count exceeds 3/4 of the table.
    for i in 0..40u64 {
        assert!(map.insert(i, i * 7));
    }

    assert!(map.table_size() > initial, "table should have grown");
    assert_eq!(map.len(), 40);
    for i in 0..40u64 {
        assert_eq!(map.get(&i), Some(&(i * 7)));
    }
}

#[test]
fn test_growth_rule_is_double_plus_one() {
    let mut map = RhMap::with_capacity(31);
    for i in 0..30u64 {
        map.insert(i, ());
    }
    assert_eq!(map.table_size(), 63);
}

#[test]
fn test_duplicate_insert_is_a_noop() {
    let mut map = RhMap::new();
    assert!(map.insert("key", 1));
    assert!(!map.insert("key", 2));
    assert_eq!(map.get("key"), Some(&1));
    assert_eq!(map.len(), 1);
}

#[test]
fn test_duplicate_refused_when_displacement_would_hide_it() {
    // Build a 7-slot table where the resident copy of key 1 sits three
    // probes from home and a tombstone-reusing entry with one recorded
    // probe sits on its probe path. A duplicate insert of key 1 robs that
    // entry at probe two and settles before the walk ever reaches the
    // resident copy, so membership has to be resolved by lookup, not by
    // the walk.
    let mut map: RhMap<u64, &str, _> = RhMap::with_hasher(7, PassThroughState);
    map.insert(22, "home slot 1");
    map.insert(29, "slot 2, two probes");
    map.insert(1, "slot 5, three probes");
    map.remove(&29);
    map.insert(2, "reuses the slot 2 tombstone, one probe");

    assert!(!map.insert(1, "duplicate"));
    assert_eq!(map.len(), 3);
    assert_eq!(map.get(&1), Some(&"slot 5, three probes"));
    let copies = map.keys().filter(|k| **k == 1).count();
    assert_eq!(copies, 1);
}

#[test]
fn test_remove_then_lookup_is_absent() {
    let mut map = RhMap::new();
    map.insert("a", 1);
    map.insert("b", 2);

    assert_eq!(map.remove("a"), Some(("a", 1)));
    assert_eq!(map.get("a"), None);
    assert_eq!(map.remove("a"), None);
    assert_eq!(map.len(), 1);
}

#[test]
fn test_iteration_order_survives_resize() {
    let mut map = RhMap::with_capacity(7);
    for i in 0..50u32 {
        map.insert(i, ());
    }
    let order: Vec<u32> = map.keys().copied().collect();
    let expected: Vec<u32> = (0..50).collect();
    assert_eq!(order, expected);
}

#[test]
fn test_iteration_order_with_interleaved_removals() {
    let mut map = RhMap::new();
    for i in 0..10u32 {
        map.insert(i, i);
    }
    map.remove(&0);
    map.remove(&5);
    map.insert(100, 100);
    map.remove(&9);
    map.insert(5, 55);

    let order: Vec<u32> = map.keys().copied().collect();
    assert_eq!(order, vec![1, 2, 3, 4, 6, 7, 8, 100, 5]);
    assert_eq!(map.get(&5), Some(&55));
}

#[test]
fn test_get_mut_updates_in_place() {
    let mut map = RhMap::new();
    map.insert("counter", 0u32);
    if let Some(v) = map.get_mut("counter") {
        *v += 41;
    }
    assert_eq!(map.get("counter"), Some(&41));
}

#[test]
fn test_heavy_removal_does_not_break_lookup() {
    let mut map = RhMap::with_capacity(7);
    for round in 0..20u64 {
        for i in 0..6u64 {
            map.insert(round * 100 + i, i);
        }
        for i in 0..6u64 {
            assert!(map.remove(&(round * 100 + i)).is_some());
        }
    }
    assert_eq!(map.len(), 0);
    map.insert(1, 1);
    assert_eq!(map.get(&1), Some(&1));
    assert_eq!(map.get(&2), None);
}
