/*!
 * String Interner
 * Bump-allocated chunk pool with a canonicalization set
 */

use crate::table::RhSet;
use log::debug;
use std::borrow::Borrow;
use std::hash::{Hash, Hasher};
use std::ptr::NonNull;
use std::slice;
use std::str;

/// Bytes per chunk unless overridden
pub const DEFAULT_CHUNK_SIZE: usize = 32_488;

/// Initial table size of the canonicalization set
const INTERN_TABLE_SZ: usize = 4_091;

/// Canonical interned string.
///
/// A copyable index into the pool's chunk storage, resolved back to text
/// through [`Interner::resolve`]. For any one pool, equal content interns
/// to an identical handle forever, so handle equality is canonical-copy
/// equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IStr {
    chunk: u32,
    start: u32,
    len: u32,
}

impl IStr {
    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Set key for the canonicalization table: the stored bytes plus the handle
/// they resolve through. Hashed and compared by content so the set can
/// answer `&str` lookups.
///
/// The pointer targets a pool chunk. Chunks never move, shrink or drop
/// while the pool is alive, and this type never leaves the pool, so every
/// dereference happens under a live borrow of the pool.
#[derive(Clone, Copy)]
struct PoolStr {
    ptr: NonNull<u8>,
    handle: IStr,
}

impl PoolStr {
    fn as_str(&self) -> &str {
        // SAFETY: see the type docs; the bytes were copied from a &str.
        unsafe {
            str::from_utf8_unchecked(slice::from_raw_parts(
                self.ptr.as_ptr(),
                self.handle.len as usize,
            ))
        }
    }
}

impl PartialEq for PoolStr {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for PoolStr {}

impl Hash for PoolStr {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_str().hash(state);
    }
}

impl Borrow<str> for PoolStr {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

/// String-interning pool.
///
/// Strings are bump-copied into fixed-capacity chunks and canonicalized
/// through an [`RhSet`] keyed by content. At most one stored copy exists
/// per distinct byte sequence.
pub struct Interner {
    chunks: Vec<String>,
    strings: RhSet<PoolStr>,
    chunk_size: usize,
}

impl Interner {
    pub fn new() -> Self {
        Self::with_chunk_size(DEFAULT_CHUNK_SIZE)
    }

    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self {
            chunks: Vec::new(),
            strings: RhSet::with_capacity(INTERN_TABLE_SZ),
            chunk_size: chunk_size.max(1),
        }
    }

    /// Return the canonical handle for `s`, storing the bytes on first
    /// sight.
    pub fn intern(&mut self, s: &str) -> IStr {
        if let Some(canonical) = self.strings.get(s) {
            return canonical.handle;
        }
        let canonical = self.store(s);
        self.strings.insert(canonical);
        canonical.handle
    }

    /// Intern the byte range `[start, end)` of `s`. Yields the same
    /// canonical handle as interning that substring directly.
    pub fn intern_range(&mut self, s: &str, start: usize, end: usize) -> IStr {
        self.intern(&s[start..end])
    }

    /// Text of an interned string. The handle must come from this pool;
    /// a foreign handle panics on out-of-range indices.
    pub fn resolve(&self, handle: IStr) -> &str {
        let start = handle.start as usize;
        &self.chunks[handle.chunk as usize][start..start + handle.len as usize]
    }

    /// Number of distinct strings stored.
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    fn store(&mut self, s: &str) -> PoolStr {
        // Chunks never reallocate: a string only goes into a chunk with
        // spare capacity, so stored byte addresses stay put.
        let fits = self
            .chunks
            .last()
            .map_or(false, |c| c.capacity() - c.len() >= s.len());
        if !fits {
            let cap = self.chunk_size.max(s.len());
            self.chunks.push(String::with_capacity(cap));
            debug!("intern pool grew to {} chunks", self.chunks.len());
        }
        let chunk_idx = self.chunks.len() - 1;
        let chunk = match self.chunks.last_mut() {
            Some(chunk) => chunk,
            None => unreachable!("a chunk was just pushed"),
        };
        let start = chunk.len();
        chunk.push_str(s);
        let bytes = &chunk.as_bytes()[start..];
        PoolStr {
            // SAFETY: a str's bytes are never at a null address.
            ptr: unsafe { NonNull::new_unchecked(bytes.as_ptr() as *mut u8) },
            handle: IStr {
                chunk: chunk_idx as u32,
                start: start as u32,
                len: bytes.len() as u32,
            },
        }
    }
}

impl Default for Interner {
    fn default() -> Self {
        Self::new()
    }
}
