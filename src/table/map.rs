/*!
 * Robin Hood Map
 * Open-addressing hash map with quadratic probing and insertion-order iteration
 */

use ahash::RandomState;
use std::borrow::Borrow;
use std::fmt;
use std::hash::{BuildHasher, Hash};

/// Default slot-array size for a fresh table
pub const DEFAULT_TABLE_SZ: usize = 31;

const MIN_TABLE_SZ: usize = 7;

/// Slot sentinel: never occupied
const NEVER_USED: i32 = 0;
/// Slot sentinel: previously occupied, now vacant
const TOMBSTONE: i32 = -1;

/// Null link in the insertion-order list and in slots
const NIL: u32 = u32::MAX;

/// Entry record. Entries live in a stable side array so that Robin Hood
/// displacement moves slot references, never the entries themselves; the
/// insertion-order links therefore survive any amount of probing traffic.
struct Entry<K, V> {
    key: K,
    value: V,
    hash: u64,
    prev: u32,
    next: u32,
}

/// Probe-table slot: the probe count doubles as the occupancy sentinel
/// (0 never used, -1 tombstone, >0 probes taken by the occupant).
#[derive(Clone, Copy)]
struct Slot {
    probes: i32,
    entry: u32,
}

const EMPTY_SLOT: Slot = Slot {
    probes: NEVER_USED,
    entry: NIL,
};

/// Hash map with open addressing, quadratic probing
/// (`(hash + i²) mod table_sz`) and Robin Hood displacement.
///
/// Iteration follows insertion order regardless of bucket layout, resizes
/// or removals. The table grows to `2n + 1` slots once the entry count
/// exceeds three quarters of the slot count.
pub struct RhMap<K, V, S = RandomState> {
    slots: Vec<Slot>,
    entries: Vec<Option<Entry<K, V>>>,
    free_entries: Vec<u32>,
    first: u32,
    last: u32,
    len: usize,
    tombstones: usize,
    thresh: usize,
    hasher: S,
}

#[inline]
fn probe_pos(hash: u64, probes: i32, table_sz: usize) -> usize {
    let p = probes as u64;
    ((hash.wrapping_add(p * p)) % table_sz as u64) as usize
}

#[inline]
fn threshold(table_sz: usize) -> usize {
    table_sz * 3 / 4
}

impl<K: Hash + Eq, V> RhMap<K, V> {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_TABLE_SZ)
    }

    /// Create a map whose slot array starts at `table_sz` slots.
    pub fn with_capacity(table_sz: usize) -> Self {
        Self::with_hasher(table_sz, RandomState::new())
    }
}

impl<K: Hash + Eq, V, S: BuildHasher> RhMap<K, V, S> {
    pub fn with_hasher(table_sz: usize, hasher: S) -> Self {
        let table_sz = table_sz.max(MIN_TABLE_SZ);
        Self {
            slots: vec![EMPTY_SLOT; table_sz],
            entries: Vec::new(),
            free_entries: Vec::new(),
            first: NIL,
            last: NIL,
            len: 0,
            tombstones: 0,
            thresh: threshold(table_sz),
            hasher,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Current slot-array size; grows, never shrinks.
    pub fn table_size(&self) -> usize {
        self.slots.len()
    }

    /// Insert a pair. Returns `false` (and drops the arguments) if an equal
    /// key is already present; the existing pair is left untouched.
    ///
    /// Membership is resolved by a plain lookup before the Robin Hood walk
    /// runs: the walk displaces occupants, and a displacement can settle the
    /// candidate before the walk ever reaches a resident equal key, so the
    /// walk itself cannot be trusted to detect duplicates.
    pub fn insert(&mut self, key: K, value: V) -> bool {
        if self.find_slot(&key).is_some() {
            return false;
        }
        if self.len > self.thresh {
            self.resize(self.slots.len() * 2 + 1);
        } else if self.len + self.tombstones > self.thresh {
            // Rebuild in place to clear tombstones, else probe chains on a
            // removal-heavy table can grow without bound.
            self.resize(self.slots.len());
        }
        let hash = self.hasher.hash_one(&key);
        let eidx = self.push_entry(key, value, hash);
        loop {
            match insert_into_slots(&mut self.slots, &self.entries, hash, eidx) {
                Placement::Placed => {
                    self.link_last(eidx);
                    self.len += 1;
                    return true;
                }
                // Quadratic probing only reaches a residue class of the
                // slots; if that class fills up before the load threshold
                // does, grow until the walk finds a home.
                Placement::Saturated => self.resize(self.slots.len() * 2 + 1),
            }
        }
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let sidx = self.find_slot(key)?;
        let eidx = self.slots[sidx].entry as usize;
        self.entries[eidx].as_ref().map(|e| &e.value)
    }

    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let sidx = self.find_slot(key)?;
        let eidx = self.slots[sidx].entry as usize;
        self.entries[eidx].as_mut().map(|e| &mut e.value)
    }

    /// Fetch the stored key and value for `key`. The returned key reference
    /// is the single copy the table owns, which is what canonicalizing
    /// callers (the intern pool) rely on.
    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let sidx = self.find_slot(key)?;
        let eidx = self.slots[sidx].entry as usize;
        self.entries[eidx].as_ref().map(|e| (&e.key, &e.value))
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.find_slot(key).is_some()
    }

    /// Remove a pair by key. The slot is tombstoned (probe count `-1`) and
    /// the entry is unlinked from the insertion-order list; the slot array
    /// never shrinks.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let sidx = self.find_slot(key)?;
        let eidx = self.slots[sidx].entry;
        self.slots[sidx] = Slot {
            probes: TOMBSTONE,
            entry: NIL,
        };
        self.tombstones += 1;
        self.unlink(eidx);
        let entry = self.entries[eidx as usize].take();
        self.free_entries.push(eidx);
        self.len -= 1;
        entry.map(|e| (e.key, e.value))
    }

    /// Iterate pairs in insertion order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            entries: &self.entries,
            cur: self.first,
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.iter().map(|(_, v)| v)
    }

    fn find_slot<Q>(&self, key: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        if self.len == 0 {
            return None;
        }
        let hash = self.hasher.hash_one(key);
        let table_sz = self.slots.len();
        // Any occupant sits within table_sz probes of its hash, so a longer
        // walk can only mean absence.
        for probes in 0..table_sz as i32 {
            let idx = probe_pos(hash, probes, table_sz);
            let slot = self.slots[idx];
            if slot.probes == NEVER_USED {
                return None;
            }
            if slot.probes == TOMBSTONE {
                continue;
            }
            if let Some(entry) = self.entries[slot.entry as usize].as_ref() {
                if entry.hash == hash && entry.key.borrow() == key {
                    return Some(idx);
                }
            }
        }
        None
    }

    /// Rebuild the slot array at `new_sz` slots, re-running the insertion
    /// algorithm for every live entry in insertion order. Entry records and
    /// the order list are untouched; tombstones are discarded. Grows further
    /// if the walk saturates a residue class mid-rebuild.
    fn resize(&mut self, mut new_sz: usize) {
        'rebuild: loop {
            let mut slots = vec![EMPTY_SLOT; new_sz];
            let mut cur = self.first;
            while cur != NIL {
                // Entries on the order list are always live.
                let (hash, next) = match self.entries[cur as usize].as_ref() {
                    Some(e) => (e.hash, e.next),
                    None => break,
                };
                if let Placement::Saturated =
                    insert_into_slots(&mut slots, &self.entries, hash, cur)
                {
                    new_sz = new_sz * 2 + 1;
                    continue 'rebuild;
                }
                cur = next;
            }
            self.slots = slots;
            self.tombstones = 0;
            self.thresh = threshold(new_sz);
            return;
        }
    }

    fn push_entry(&mut self, key: K, value: V, hash: u64) -> u32 {
        let entry = Entry {
            key,
            value,
            hash,
            prev: NIL,
            next: NIL,
        };
        match self.free_entries.pop() {
            Some(idx) => {
                self.entries[idx as usize] = Some(entry);
                idx
            }
            None => {
                self.entries.push(Some(entry));
                (self.entries.len() - 1) as u32
            }
        }
    }

    fn link_last(&mut self, eidx: u32) {
        if let Some(e) = self.entries[eidx as usize].as_mut() {
            e.prev = self.last;
            e.next = NIL;
        }
        if self.last != NIL {
            if let Some(prev) = self.entries[self.last as usize].as_mut() {
                prev.next = eidx;
            }
        }
        self.last = eidx;
        if self.first == NIL {
            self.first = eidx;
        }
    }

    fn unlink(&mut self, eidx: u32) {
        let (prev, next) = match self.entries[eidx as usize].as_ref() {
            Some(e) => (e.prev, e.next),
            None => return,
        };
        if prev != NIL {
            if let Some(e) = self.entries[prev as usize].as_mut() {
                e.next = next;
            }
        } else {
            self.first = next;
        }
        if next != NIL {
            if let Some(e) = self.entries[next as usize].as_mut() {
                e.prev = prev;
            }
        } else {
            self.last = prev;
        }
    }
}

/// Outcome of one probe walk
enum Placement {
    /// The candidate entry found a slot
    Placed,
    /// The walk exhausted its probe budget without finding a home; the
    /// table must grow
    Saturated,
}

/// Robin Hood probe walk over a slot array. The candidate's key must be
/// known absent; the walk places, it never checks membership.
///
/// On a never-used slot the candidate settles there, or in the first
/// tombstone passed over (reusing its smaller probe count). An occupied slot
/// whose recorded probe count is lower than the candidate's is robbed: the
/// occupant is evicted and continues probing with its own hash and probe
/// count, which bounds the worst-case probe length across the table. The
/// walk gives up after `table_sz` probes, falling back to the remembered
/// tombstone if it passed one.
fn insert_into_slots<K, V>(
    slots: &mut [Slot],
    entries: &[Option<Entry<K, V>>],
    mut hash: u64,
    mut entry: u32,
) -> Placement {
    let table_sz = slots.len();
    let mut probes: i32 = 0;
    let mut first_tomb: Option<(usize, i32)> = None;
    loop {
        if probes as usize >= table_sz {
            return match first_tomb {
                Some((dest, dest_probes)) => {
                    slots[dest] = Slot {
                        probes: dest_probes,
                        entry,
                    };
                    Placement::Placed
                }
                None => Placement::Saturated,
            };
        }
        let idx = probe_pos(hash, probes, table_sz);
        probes += 1;
        let slot = slots[idx];
        if slot.probes == NEVER_USED {
            let (dest, dest_probes) = first_tomb.unwrap_or((idx, probes));
            slots[dest] = Slot {
                probes: dest_probes,
                entry,
            };
            return Placement::Placed;
        }
        if slot.probes == TOMBSTONE {
            if first_tomb.is_none() {
                first_tomb = Some((idx, probes));
            }
            continue;
        }
        let occupant = match entries[slot.entry as usize].as_ref() {
            Some(e) => e,
            None => continue,
        };
        if slot.probes < probes {
            // Rob the richer occupant; it becomes the new candidate.
            let victim = slot;
            slots[idx] = Slot { probes, entry };
            entry = victim.entry;
            probes = victim.probes;
            hash = occupant.hash;
            first_tomb = None;
        }
    }
}

/// Insertion-order iterator over map entries
pub struct Iter<'a, K, V> {
    entries: &'a [Option<Entry<K, V>>],
    cur: u32,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        while self.cur != NIL {
            let idx = self.cur as usize;
            match self.entries[idx].as_ref() {
                Some(e) => {
                    self.cur = e.next;
                    return Some((&e.key, &e.value));
                }
                None => return None,
            }
        }
        None
    }
}

impl<'a, K: Hash + Eq, V, S: BuildHasher> IntoIterator for &'a RhMap<K, V, S> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K: Hash + Eq, V> Default for RhMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Hash + Eq + fmt::Debug, V: fmt::Debug, S: BuildHasher> fmt::Debug for RhMap<K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}
