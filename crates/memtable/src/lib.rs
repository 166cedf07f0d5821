//! # Memtable — in-memory multi-version write buffer
//!
//! Every mutation lands here (after the WAL) as an *internal key*: the user
//! key plus an 8-byte tag packing the sequence number and a value/tombstone
//! discriminator. Nothing is overwritten in place — a newer put or delete
//! for the same user key is a new entry that sorts in front of the old
//! versions, which is what makes snapshot reads and tombstone shadowing
//! fall out of plain ordered iteration.
//!
//! The backing store is a concurrent skip list (`crossbeam-skiplist`):
//! lookups are lock-free, and an insertion is published atomically, so
//! readers racing a writer see either the fully linked entry or no entry.
//! The engine's write path serializes writers externally; this crate only
//! requires that readers may run concurrently with one writer.

use std::cmp::Ordering;
use std::ops::Bound;
use std::sync::atomic::{self, AtomicUsize};
use std::sync::Arc;

use base::{
    extract_user_key, pack_sequence_and_type, Comparator, Error, InternalKeyComparator, LookupKey,
    Result, SequenceNumber, StorageIterator, ValueType,
};
use crossbeam_skiplist::map::Entry;
use crossbeam_skiplist::SkipMap;


/// An encoded internal key ordered by the internal-key comparator.
///
/// The skip list needs `Ord`, and internal-key order depends on the
/// user-supplied comparator, so every key carries a handle to it.
struct EntryKey {
    ikey: Box<[u8]>,
    cmp: InternalKeyComparator,
}

impl PartialEq for EntryKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for EntryKey {}

impl PartialOrd for EntryKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EntryKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cmp.compare(&self.ikey, &other.ikey)
    }
}

/// The in-memory ordered multi-version store.
///
/// Shared as `Arc<MemTable>`: the writer holds one reference, each open
/// iterator borrows another, and the memory is released when the last
/// reference drops.
pub struct MemTable {
    cmp: InternalKeyComparator,
    table: SkipMap<EntryKey, Vec<u8>>,
    /// Bytes consumed by encoded entries, in the on-disk entry shape
    /// (`varint32(ikey len) || ikey || varint32(value len) || value`) so the
    /// flush threshold tracks what a table file would hold.
    usage: AtomicUsize,
}

impl MemTable {
    pub fn new(cmp: InternalKeyComparator) -> MemTable {
        MemTable {
            cmp,
            table: SkipMap::new(),
            usage: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn comparator(&self) -> &InternalKeyComparator {
        &self.cmp
    }

    fn entry_key(&self, ikey: Box<[u8]>) -> EntryKey {
        EntryKey {
            ikey,
            cmp: self.cmp.clone(),
        }
    }

    /// Inserts an entry for `(user_key, sequence, value_type)`.
    ///
    /// `value` is empty for `Deletion`. Writers must be serialized by the
    /// caller; readers may run concurrently.
    pub fn add(&self, sequence: SequenceNumber, value_type: ValueType, user_key: &[u8], value: &[u8]) {
        let mut ikey = Vec::with_capacity(user_key.len() + 8);
        ikey.extend_from_slice(user_key);
        codec::put_fixed64(&mut ikey, pack_sequence_and_type(sequence, value_type));

        let encoded_len = codec::varint_length(ikey.len() as u64)
            + ikey.len()
            + codec::varint_length(value.len() as u64)
            + value.len();
        self.usage.fetch_add(encoded_len, atomic::Ordering::Relaxed);

        self.table
            .insert(self.entry_key(ikey.into_boxed_slice()), value.to_vec());
    }

    /// Point lookup at the snapshot carried by `key`.
    ///
    /// Returns `None` if this memtable holds nothing for the user key,
    /// `Some(Ok(value))` for a live value, and `Some(Err(NotFound))` when
    /// the newest visible entry is a tombstone — present, but masking
    /// anything older in the tables below.
    pub fn get(&self, key: &LookupKey) -> Option<Result<Vec<u8>>> {
        // Internal keys sort by ascending user key then descending tag, so
        // the first entry at-or-after the lookup key is the newest entry
        // visible at the snapshot (or a different user key entirely).
        let probe = self.entry_key(key.internal_key().to_vec().into_boxed_slice());
        let entry = self.table.lower_bound(Bound::Included(&probe))?;

        let ikey = &entry.key().ikey;
        let found_user = extract_user_key(ikey);
        if self
            .cmp
            .user_comparator()
            .compare(found_user, key.user_key())
            != Ordering::Equal
        {
            return None;
        }

        let tag = codec::decode_fixed64(&ikey[ikey.len() - 8..]);
        if tag & 0xff == ValueType::Value as u64 {
            Some(Ok(entry.value().clone()))
        } else {
            Some(Err(Error::not_found("key is tombstoned")))
        }
    }

    /// Approximate bytes of entry data held.
    #[must_use]
    pub fn approximate_memory_usage(&self) -> usize {
        self.usage.load(atomic::Ordering::Relaxed)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// A bidirectional iterator over the whole memtable. `key()` yields the
    /// encoded internal key, `value()` the raw value bytes.
    pub fn iter(self: &Arc<Self>) -> MemTableIterator {
        MemTableIterator {
            mem: Arc::clone(self),
            current: None,
        }
    }
}

impl std::fmt::Debug for MemTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemTable")
            .field("entries", &self.len())
            .field("approx_bytes", &self.approximate_memory_usage())
            .finish()
    }
}

/// Iterator over a [`MemTable`].
///
/// Positions are materialized as owned `(internal key, value)` pairs;
/// navigation re-probes the skip list from the current key with an
/// exclusive bound, which keeps the iterator independent of the map's
/// internal cursors and safe alongside concurrent inserts.
pub struct MemTableIterator {
    mem: Arc<MemTable>,
    current: Option<(Vec<u8>, Vec<u8>)>,
}

/// Copies an entry out of the map so the position outlives the probe.
fn materialize(entry: Option<Entry<'_, EntryKey, Vec<u8>>>) -> Option<(Vec<u8>, Vec<u8>)> {
    entry.map(|e| (e.key().ikey.to_vec(), e.value().clone()))
}

impl MemTableIterator {
    fn current_probe(&self) -> EntryKey {
        let (ikey, _) = self.current.as_ref().expect("iterator is valid");
        self.mem.entry_key(ikey.clone().into_boxed_slice())
    }
}

impl StorageIterator for MemTableIterator {
    fn valid(&self) -> bool {
        self.current.is_some()
    }

    fn seek_to_first(&mut self) {
        self.current = materialize(self.mem.table.front());
    }

    fn seek_to_last(&mut self) {
        self.current = materialize(self.mem.table.back());
    }

    fn seek(&mut self, target: &[u8]) {
        let probe = self.mem.entry_key(target.to_vec().into_boxed_slice());
        self.current = materialize(self.mem.table.lower_bound(Bound::Included(&probe)));
    }

    fn next(&mut self) {
        let probe = self.current_probe();
        self.current = materialize(self.mem.table.lower_bound(Bound::Excluded(&probe)));
    }

    fn prev(&mut self) {
        let probe = self.current_probe();
        self.current = materialize(self.mem.table.upper_bound(Bound::Excluded(&probe)));
    }

    fn key(&self) -> &[u8] {
        let (ikey, _) = self.current.as_ref().expect("iterator is valid");
        ikey
    }

    fn value(&self) -> &[u8] {
        let (_, value) = self.current.as_ref().expect("iterator is valid");
        value
    }

    fn status(&self) -> Result<()> {
        Ok(())
    }
}
