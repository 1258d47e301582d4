/*!
 * Arena Tests
 * Free-list reuse, chunk growth, and bulk teardown
 */

use memkit::{Arena, MemError};
use pretty_assertions::assert_eq;
use std::cell::Cell;
use std::rc::Rc;

#[test]
fn test_free_list_reuse_bounds_slot_growth() {
    let mut arena = Arena::with_chunk_capacity("bound", 16);
    let k = 10;
    let j = 6;

    let ids: Vec<_> = (0..k).map(|i| arena.alloc(i)).collect();
    assert_eq!(arena.slot_count(), k);

    for id in ids.iter().take(j) {
        arena.dealloc(*id).expect("live slot");
    }
    for i in 0..(k - j) {
        arena.alloc(100 + i);
    }

    // Reuse, not growth: the k - j follow-up allocations all come from the
    // free list, so no more than k slots ever exist.
    assert_eq!(arena.slot_count(), k);
    assert_eq!(arena.len(), k);
}

#[test]
fn test_slots_are_stable_and_readable() {
    let mut arena = Arena::with_chunk_capacity("stable", 2);
    let ids: Vec<_> = (0..100u32).map(|i| arena.alloc(i * 3)).collect();
    for (i, id) in ids.iter().enumerate() {
        assert_eq!(arena.get(*id), Some(&(i as u32 * 3)));
    }
    if let Some(v) = arena.get_mut(ids[42]) {
        *v = 7;
    }
    assert_eq!(arena.get(ids[42]), Some(&7));
}

#[test]
fn test_dealloc_returns_the_value() {
    let mut arena = Arena::new("take");
    let id = arena.alloc(String::from("payload"));
    assert_eq!(arena.dealloc(id), Ok(String::from("payload")));
    assert_eq!(
        arena.dealloc(id),
        Err(MemError::InvalidSlot {
            index: id.0,
            arena: "take"
        })
    );
}

#[test]
fn test_chunk_growth_is_monotonic() {
    let mut arena = Arena::with_chunk_capacity("grow", 4);
    for i in 0..9u32 {
        arena.alloc(i);
    }
    let stats = arena.stats();
    assert_eq!(stats.chunks, 3);
    assert_eq!(stats.slots_created, 9);
    assert_eq!(stats.requests, 9);

    // Deallocation never sheds chunks.
    for id in (0..9u32).map(memkit::SlotId) {
        arena.dealloc(id).expect("live");
    }
    assert_eq!(arena.stats().chunks, 3);
    assert_eq!(arena.stats().removes, 9);
}

#[test]
fn test_teardown_drops_only_live_values() {
    let drops = Rc::new(Cell::new(0u32));

    struct Counted(Rc<Cell<u32>>);
    impl Drop for Counted {
        fn drop(&mut self) {
            self.0.set(self.0.get() + 1);
        }
    }

    {
        let mut arena = Arena::new("teardown");
        let a = arena.alloc(Counted(Rc::clone(&drops)));
        arena.alloc(Counted(Rc::clone(&drops)));
        arena.alloc(Counted(Rc::clone(&drops)));
        drop(arena.dealloc(a).expect("live"));
        assert_eq!(drops.get(), 1);
    }
    assert_eq!(drops.get(), 3, "teardown must drop each live value once");
}

#[test]
fn test_stats_serialize() {
    let mut arena = Arena::with_chunk_capacity("json", 8);
    arena.alloc(1u8);
    let json = serde_json::to_string(&arena.stats()).expect("serialize");
    assert!(json.contains("\"name\":\"json\""));
    assert!(json.contains("\"live\":1"));
}
