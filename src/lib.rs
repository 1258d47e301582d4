/*!
 * memkit
 * Instrumented memory-management toolkit: a tracked heap with leak
 * detection, a typed arena allocator, a string-interning pool, and a
 * reference-counted object graph with mark-and-sweep collection, all
 * backed by one Robin Hood hash table.
 *
 * Single-threaded by design; every component is an explicit context
 * object with an owned lifecycle, not process state.
 */

pub mod alloc;
pub mod core;
pub mod graph;
pub mod table;

// Re-exports
pub use crate::alloc::{Arena, ArenaStats, HeapStats, IStr, Interner, LeakReport, SlotId, TrackedHeap};
pub use crate::core::{Address, CallSite, Count, GraphError, MemError, MemResult, NodeId, Size};
pub use crate::graph::{GraphConfig, MemGraph, SweepStats};
pub use crate::table::{RhMap, RhSet};
