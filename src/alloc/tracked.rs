/*!
 * Tracked Heap
 * Instrumented allocator with a live-block registry and leak reporting
 */

use crate::core::errors::{MemError, MemResult};
use crate::core::types::{Address, CallSite, Count, Size};
use crate::table::RhMap;
use log::{error, info, warn};
use serde::Serialize;
use std::alloc::{self, Layout};

/// Smallest alignment the heap hands out
const MIN_BLOCK_ALIGN: usize = 8;

/// Largest alignment the heap honors; covers every primitive up to `u128`
const MAX_BLOCK_ALIGN: usize = 16;

/// Initial registry table size; sized like a process-wide registry because
/// typical hosts keep tens of thousands of live blocks.
const REGISTRY_TABLE_SZ: usize = 32_781;

/// Metadata kept for every live block, in a side-table keyed by the block
/// address (never embedded in the block itself).
#[derive(Debug, Clone, Serialize)]
pub struct AllocationRecord {
    pub elt_size: Size,
    pub count: Count,
    pub type_name: &'static str,
    pub site: CallSite,
}

impl AllocationRecord {
    fn bytes(&self) -> Size {
        self.elt_size * self.count
    }
}

/// One leaked block, as reported by [`TrackedHeap::finalize`]
#[derive(Debug, Clone, Serialize)]
pub struct LeakReport {
    pub address: Address,
    pub type_name: &'static str,
    pub elt_size: Size,
    pub count: Count,
    pub site: CallSite,
}

/// Allocation counters for the heap
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HeapStats {
    pub live_blocks: usize,
    pub live_bytes: Size,
    pub peak_bytes: Size,
    pub allocations: u64,
    pub reallocations: u64,
    pub frees: u64,
}

/// Instrumented general allocator.
///
/// Every block is zero-initialized, registered under its address in a
/// [`RhMap`] registry, and reported as a leak if still registered when the
/// heap is finalized. Freeing or reallocating an address the registry does
/// not know is a contract violation surfaced as [`MemError::NotRegistered`].
///
/// The heap is a context object, not process state; dropping it finalizes
/// it. Single-threaded by design.
pub struct TrackedHeap {
    registry: RhMap<Address, AllocationRecord>,
    verbose: bool,
    finalized: bool,
    stats: HeapStats,
}

impl TrackedHeap {
    pub fn new() -> Self {
        Self {
            registry: RhMap::with_capacity(REGISTRY_TABLE_SZ),
            verbose: false,
            finalized: false,
            stats: HeapStats::default(),
        }
    }

    /// Echo every allocation event through the log, with call-site metadata.
    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    /// Allocate a zeroed array of `count` elements of `T`. The call site
    /// recorded in the registry is the caller's, via `#[track_caller]`.
    ///
    /// The block is aligned to the element size rounded up to a power of
    /// two, capped at 16 bytes; types demanding more than 16-byte alignment
    /// are not supported.
    #[track_caller]
    pub fn alloc<T>(&mut self, count: Count) -> MemResult<Address> {
        self.alloc_bytes(std::mem::size_of::<T>(), count, std::any::type_name::<T>())
    }

    /// Allocate a zeroed block of `count` elements of `elt_size` bytes,
    /// tagged with `type_name` for diagnostics.
    #[track_caller]
    pub fn alloc_bytes(
        &mut self,
        elt_size: Size,
        count: Count,
        type_name: &'static str,
    ) -> MemResult<Address> {
        let site = CallSite::caller();
        let layout = self.block_layout(elt_size, count)?;
        // SAFETY: layout has non-zero size, checked by block_layout.
        let ptr = unsafe { alloc::alloc_zeroed(layout) };
        if ptr.is_null() {
            alloc::handle_alloc_error(layout);
        }
        let address = ptr as Address;
        let record = AllocationRecord {
            elt_size,
            count,
            type_name,
            site,
        };
        self.register(address, record, layout)?;
        if self.verbose {
            info!(
                "allocated {}[{}] at {:#x} from {}",
                type_name, count, address, site
            );
        }
        self.stats.allocations += 1;
        Ok(address)
    }

    /// Move a block to a new element count, zero-filling any added tail
    /// bytes. The original type name is carried forward; the call site is
    /// updated to the reallocating caller. The old address is unregistered
    /// and must not be used again.
    #[track_caller]
    pub fn realloc(&mut self, address: Address, elt_size: Size, count: Count) -> MemResult<Address> {
        let site = CallSite::caller();
        let old = match self.registry.get(&address) {
            Some(record) => record.clone(),
            None => {
                error!("realloc of unregistered address {:#x}", address);
                return Err(MemError::NotRegistered { address });
            }
        };
        let new_layout = self.block_layout(elt_size, count)?;
        let old_bytes = old.bytes();
        let new_bytes = elt_size * count;
        let old_layout = layout_of(&old);
        let new_ptr = if new_layout.align() <= old_layout.align() {
            // SAFETY: address came out of alloc_zeroed with old_layout and
            // is still registered, so it has not been freed.
            unsafe { alloc::realloc(address as *mut u8, old_layout, new_bytes) }
        } else {
            // The element size demands more alignment than the old block
            // carries; realloc cannot raise alignment, so move the bytes to
            // a fresh block.
            // SAFETY: both blocks are live, the copy stays within the
            // shorter of the two, and the old block is freed with the
            // layout it was allocated under.
            unsafe {
                let fresh = alloc::alloc_zeroed(new_layout);
                if !fresh.is_null() {
                    std::ptr::copy_nonoverlapping(
                        address as *const u8,
                        fresh,
                        old_bytes.min(new_bytes),
                    );
                    alloc::dealloc(address as *mut u8, old_layout);
                }
                fresh
            }
        };
        if new_ptr.is_null() {
            alloc::handle_alloc_error(new_layout);
        }
        if new_bytes > old_bytes {
            // SAFETY: the tail [old_bytes, new_bytes) is within the new block.
            unsafe { new_ptr.add(old_bytes).write_bytes(0, new_bytes - old_bytes) };
        }
        self.registry.remove(&address);
        self.stats.live_bytes -= old_bytes;
        let record = AllocationRecord {
            elt_size,
            count,
            type_name: old.type_name,
            site,
        };
        let new_address = new_ptr as Address;
        self.register(new_address, record, new_layout)?;
        if self.verbose {
            info!(
                "reallocated {:#x} -> {:#x} ({} x{}) from {}",
                address, new_address, old.type_name, count, site
            );
        }
        self.stats.reallocations += 1;
        Ok(new_address)
    }

    /// Free a block. The address must be registered: double frees and
    /// pointers this heap never produced are rejected.
    #[track_caller]
    pub fn dealloc(&mut self, address: Address) -> MemResult<()> {
        let site = CallSite::caller();
        let record = match self.registry.remove(&address) {
            Some((_, record)) => record,
            None => {
                error!("freeing {:#x} from {}, but it is not allocated", address, site);
                return Err(MemError::NotRegistered { address });
            }
        };
        self.release(address, &record);
        if self.verbose {
            info!("deallocated {:#x} from {}", address, site);
        }
        Ok(())
    }

    /// Report every still-registered block as a leak, force-free it, and
    /// drop the registry. Each leak is reported exactly once, with the
    /// metadata of the original allocating call. Runs from `Drop` if the
    /// caller never did it explicitly.
    pub fn finalize(&mut self) -> Vec<LeakReport> {
        let leaks: Vec<LeakReport> = self
            .registry
            .iter()
            .map(|(address, record)| LeakReport {
                address: *address,
                type_name: record.type_name,
                elt_size: record.elt_size,
                count: record.count,
                site: record.site,
            })
            .collect();
        for leak in &leaks {
            eprintln!(
                "forgot to free {:#x} ({} x{}) allocated at {}",
                leak.address, leak.type_name, leak.count, leak.site
            );
            warn!(
                "leak: {:#x} ({} x{}) allocated at {}",
                leak.address, leak.type_name, leak.count, leak.site
            );
        }
        let addresses: Vec<Address> = self.registry.keys().copied().collect();
        for address in addresses {
            if let Some((_, record)) = self.registry.remove(&address) {
                self.release(address, &record);
            }
        }
        self.finalized = true;
        leaks
    }

    /// Whether `address` is currently registered as live.
    pub fn contains(&self, address: Address) -> bool {
        self.registry.contains_key(&address)
    }

    /// Byte size of a live block, if registered.
    pub fn block_size(&self, address: Address) -> Option<Size> {
        self.registry.get(&address).map(|r| r.bytes())
    }

    /// Metadata of a live block, if registered.
    pub fn record(&self, address: Address) -> Option<&AllocationRecord> {
        self.registry.get(&address)
    }

    /// Number of live blocks.
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    pub fn stats(&self) -> HeapStats {
        let mut stats = self.stats.clone();
        stats.live_blocks = self.registry.len();
        stats
    }

    fn block_layout(&self, elt_size: Size, count: Count) -> MemResult<Layout> {
        if elt_size == 0 || count == 0 {
            error!("zero-sized allocation: {} x{}", elt_size, count);
            return Err(MemError::ZeroSized { elt_size, count });
        }
        let bytes = elt_size
            .checked_mul(count)
            .ok_or(MemError::AllocationFailed { bytes: Size::MAX })?;
        Layout::from_size_align(bytes, block_align(elt_size))
            .map_err(|_| MemError::AllocationFailed { bytes })
    }

    /// Registry invariant: an address is present iff it is a live block this
    /// heap produced. Double registration means the bookkeeping is broken;
    /// the fresh block is released before reporting it.
    fn register(
        &mut self,
        address: Address,
        record: AllocationRecord,
        layout: Layout,
    ) -> MemResult<()> {
        let bytes = record.bytes();
        let type_name = record.type_name;
        let count = record.count;
        if !self.registry.insert(address, record) {
            error!(
                "allocating {:#x} ({} x{}), but it is already allocated",
                address, type_name, count
            );
            // SAFETY: the block at address was just produced by this call
            // and is not reachable by anyone else yet.
            unsafe { alloc::dealloc(address as *mut u8, layout) };
            return Err(MemError::DoubleRegister {
                address,
                type_name,
                count,
            });
        }
        self.stats.live_bytes += bytes;
        if self.stats.live_bytes > self.stats.peak_bytes {
            self.stats.peak_bytes = self.stats.live_bytes;
        }
        Ok(())
    }

    fn release(&mut self, address: Address, record: &AllocationRecord) {
        // SAFETY: the record was registered by alloc/realloc, so the block
        // is live and its layout is what the record says.
        unsafe { alloc::dealloc(address as *mut u8, layout_of(record)) };
        self.stats.live_bytes -= record.bytes();
        self.stats.frees += 1;
    }
}

/// Element size rounded up to a power of two, clamped to the supported
/// alignment range. Capping before the round-up keeps huge element sizes
/// from overflowing it.
fn block_align(elt_size: Size) -> usize {
    elt_size
        .min(MAX_BLOCK_ALIGN)
        .next_power_of_two()
        .max(MIN_BLOCK_ALIGN)
}

fn layout_of(record: &AllocationRecord) -> Layout {
    // Valid by construction: block_layout accepted this size and alignment
    // at allocation time.
    Layout::from_size_align(record.bytes(), block_align(record.elt_size))
        .unwrap_or_else(|_| Layout::new::<u8>())
}

impl Default for TrackedHeap {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TrackedHeap {
    fn drop(&mut self) {
        if !self.finalized {
            self.finalize();
        }
    }
}
