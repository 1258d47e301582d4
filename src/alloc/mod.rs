/*!
 * Allocators
 * Tracked heap, arena allocator, and string interner
 */

pub mod arena;
pub mod intern;
pub mod tracked;

pub use arena::{Arena, ArenaStats, SlotId, DEFAULT_ELTS_IN_CHUNK};
pub use intern::{IStr, Interner, DEFAULT_CHUNK_SIZE};
pub use tracked::{AllocationRecord, HeapStats, LeakReport, TrackedHeap};
