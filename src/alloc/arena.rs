/*!
 * Arena Allocator
 * Fixed-stride region allocator with chunked storage and slot recycling
 */

use crate::core::errors::{MemError, MemResult};
use log::debug;
use serde::Serialize;
use std::mem::MaybeUninit;

/// Slots per chunk unless overridden
pub const DEFAULT_ELTS_IN_CHUNK: usize = 128;

/// Stable handle to an arena slot. Valid until the slot is deallocated or
/// the arena is torn down; a stale id is a contract error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SlotId(pub u32);

/// Usage counters for one arena
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArenaStats {
    pub name: &'static str,
    pub chunks: usize,
    pub slots_created: usize,
    pub live: usize,
    pub requests: u64,
    pub removes: u64,
}

/// Region allocator for same-sized objects.
///
/// Grows by chaining fixed-capacity chunks; freed slots go on an
/// index-based free list and are reused LIFO before any new slot is
/// created. Slots never move once handed out, and teardown is one pass
/// over the chunk chain rather than per-allocation frees.
pub struct Arena<T> {
    name: &'static str,
    chunks: Vec<Box<[MaybeUninit<T>]>>,
    occupied: Vec<bool>,
    free: Vec<u32>,
    chunk_cap: usize,
    next: u32,
    live: usize,
    requests: u64,
    removes: u64,
}

impl<T> Arena<T> {
    pub fn new(name: &'static str) -> Self {
        Self::with_chunk_capacity(name, DEFAULT_ELTS_IN_CHUNK)
    }

    pub fn with_chunk_capacity(name: &'static str, chunk_cap: usize) -> Self {
        Self {
            name,
            chunks: Vec::new(),
            occupied: Vec::new(),
            free: Vec::new(),
            chunk_cap: chunk_cap.max(1),
            next: 0,
            live: 0,
            requests: 0,
            removes: 0,
        }
    }

    /// Place a value in the arena. Pops the free list when possible (O(1)
    /// reuse); otherwise bump-allocates, chaining a new chunk when the
    /// current one is exhausted.
    pub fn alloc(&mut self, value: T) -> SlotId {
        self.requests += 1;
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                let index = self.next;
                let chunk = index as usize / self.chunk_cap;
                if chunk == self.chunks.len() {
                    self.grow();
                }
                self.next += 1;
                self.occupied.push(false);
                index
            }
        };
        let (chunk, offset) = self.locate(index);
        self.chunks[chunk][offset].write(value);
        self.occupied[index as usize] = true;
        self.live += 1;
        SlotId(index)
    }

    /// Take the value back out and push the slot onto the free list. The
    /// id is dead after this; reusing it is reported, not honored.
    pub fn dealloc(&mut self, id: SlotId) -> MemResult<T> {
        if !self.is_live(id) {
            return Err(MemError::InvalidSlot {
                index: id.0,
                arena: self.name,
            });
        }
        self.occupied[id.0 as usize] = false;
        self.free.push(id.0);
        self.live -= 1;
        self.removes += 1;
        let (chunk, offset) = self.locate(id.0);
        // SAFETY: the slot was occupied, so it holds an initialized T, and
        // the occupancy flag is already cleared so it cannot be read again.
        Ok(unsafe { self.chunks[chunk][offset].assume_init_read() })
    }

    pub fn get(&self, id: SlotId) -> Option<&T> {
        if !self.is_live(id) {
            return None;
        }
        let (chunk, offset) = self.locate(id.0);
        // SAFETY: occupied slots hold initialized values.
        Some(unsafe { self.chunks[chunk][offset].assume_init_ref() })
    }

    pub fn get_mut(&mut self, id: SlotId) -> Option<&mut T> {
        if !self.is_live(id) {
            return None;
        }
        let (chunk, offset) = self.locate(id.0);
        // SAFETY: occupied slots hold initialized values.
        Some(unsafe { self.chunks[chunk][offset].assume_init_mut() })
    }

    pub fn is_live(&self, id: SlotId) -> bool {
        (id.0 as usize) < self.occupied.len() && self.occupied[id.0 as usize]
    }

    /// Live value count.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Total slots ever created, across all chunks. Never decreases.
    pub fn slot_count(&self) -> usize {
        self.next as usize
    }

    pub fn stats(&self) -> ArenaStats {
        ArenaStats {
            name: self.name,
            chunks: self.chunks.len(),
            slots_created: self.next as usize,
            live: self.live,
            requests: self.requests,
            removes: self.removes,
        }
    }

    fn grow(&mut self) {
        let mut chunk = Vec::with_capacity(self.chunk_cap);
        chunk.resize_with(self.chunk_cap, MaybeUninit::uninit);
        self.chunks.push(chunk.into_boxed_slice());
        debug!(
            "arena '{}' grew to {} chunks ({} slots)",
            self.name,
            self.chunks.len(),
            self.chunks.len() * self.chunk_cap
        );
    }

    #[inline]
    fn locate(&self, index: u32) -> (usize, usize) {
        (
            index as usize / self.chunk_cap,
            index as usize % self.chunk_cap,
        )
    }
}

impl<T> Drop for Arena<T> {
    /// Bulk teardown: drop live values in place, then free the chunk chain
    /// in one pass.
    fn drop(&mut self) {
        for index in 0..self.next {
            if self.occupied[index as usize] {
                let (chunk, offset) = self.locate(index);
                // SAFETY: occupied slots hold initialized values and are
                // dropped exactly once, here.
                unsafe { self.chunks[chunk][offset].assume_init_drop() };
            }
        }
        debug!(
            "arena '{}' finalized: {} requests, {} removes, {} chunks",
            self.name,
            self.requests,
            self.removes,
            self.chunks.len()
        );
    }
}
