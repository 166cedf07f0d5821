//! # WriteBatch — the atomic unit of mutation
//!
//! A batch is a single byte buffer holding any number of put/delete records.
//! The same bytes serve two masters: they are the payload appended to the
//! record log (durability), and they are replayed record-by-record into the
//! memtable (visibility). Keeping one encoding for both is what makes a
//! batch atomic — it hits the log in one append and is re-applied
//! identically during recovery.
//!
//! ## Byte layout
//!
//! ```text
//! sequence: u64 LE | count: u32 LE | record*
//! record   := 0x01 varstring varstring     (put: key, value)
//!           | 0x00 varstring               (delete: key)
//! varstring := varint32(len) || bytes
//! ```
//!
//! Record `i` is applied with sequence number `sequence + i`.

use base::{Error, Result, SequenceNumber, ValueType};
use memtable::MemTable;


/// Bytes of header: an 8-byte sequence number followed by a 4-byte count.
pub const HEADER_SIZE: usize = 12;

/// An ordered collection of updates applied atomically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteBatch {
    rep: Vec<u8>,
}

impl Default for WriteBatch {
    fn default() -> Self {
        Self::new()
    }
}

impl WriteBatch {
    pub fn new() -> WriteBatch {
        WriteBatch {
            rep: vec![0; HEADER_SIZE],
        }
    }

    /// Drops all records, leaving a zeroed header.
    pub fn clear(&mut self) {
        self.rep.clear();
        self.rep.resize(HEADER_SIZE, 0);
    }

    /// Current encoded size in bytes.
    #[must_use]
    pub fn approximate_size(&self) -> usize {
        self.rep.len()
    }

    /// Queues an insertion of `key` → `value`.
    pub fn put(&mut self, key: &[u8], value: &[u8]) {
        self.set_count(self.count() + 1);
        self.rep.push(ValueType::Value as u8);
        codec::put_length_prefixed_slice(&mut self.rep, key);
        codec::put_length_prefixed_slice(&mut self.rep, value);
    }

    /// Queues a deletion of `key`.
    pub fn delete(&mut self, key: &[u8]) {
        self.set_count(self.count() + 1);
        self.rep.push(ValueType::Deletion as u8);
        codec::put_length_prefixed_slice(&mut self.rep, key);
    }

    /// Appends all of `source`'s records after this batch's own.
    pub fn append(&mut self, source: &WriteBatch) {
        assert!(source.rep.len() >= HEADER_SIZE);
        self.set_count(self.count() + source.count());
        self.rep.extend_from_slice(&source.rep[HEADER_SIZE..]);
    }

    /// Decodes the batch, dispatching each record to `handler` in order.
    ///
    /// Fails with `Corruption` if the header is missing, a record carries an
    /// unknown tag, a length prefix overruns the buffer, or the record count
    /// in the header does not match the records present.
    pub fn iterate(&self, handler: &mut dyn Handler) -> Result<()> {
        if self.rep.len() < HEADER_SIZE {
            return Err(Error::corruption("malformed WriteBatch (too small)"));
        }

        let mut input = &self.rep[HEADER_SIZE..];
        let mut found = 0u32;
        while !input.is_empty() {
            found += 1;
            let tag = input[0];
            input = &input[1..];
            match ValueType::from_u8(tag)
                .map_err(|_| Error::Corruption(format!("unknown WriteBatch tag: {tag}")))?
            {
                ValueType::Value => {
                    let key = codec::get_length_prefixed_slice(&mut input)
                        .ok_or_else(|| Error::corruption("bad WriteBatch put"))?;
                    let value = codec::get_length_prefixed_slice(&mut input)
                        .ok_or_else(|| Error::corruption("bad WriteBatch put"))?;
                    handler.put(key, value);
                }
                ValueType::Deletion => {
                    let key = codec::get_length_prefixed_slice(&mut input)
                        .ok_or_else(|| Error::corruption("bad WriteBatch delete"))?;
                    handler.delete(key);
                }
            }
        }

        if found != self.count() {
            return Err(Error::corruption("WriteBatch has wrong count"));
        }
        Ok(())
    }

    /// Sequence number assigned to the first record.
    #[must_use]
    pub fn sequence(&self) -> SequenceNumber {
        codec::decode_fixed64(&self.rep[0..8])
    }

    pub fn set_sequence(&mut self, seq: SequenceNumber) {
        codec::encode_fixed64_into(&mut self.rep[0..8], seq);
    }

    /// Number of records in the batch.
    #[must_use]
    pub fn count(&self) -> u32 {
        codec::decode_fixed32(&self.rep[8..12])
    }

    pub fn set_count(&mut self, n: u32) {
        codec::encode_fixed32_into(&mut self.rep[8..12], n);
    }

    /// The full encoding — exactly the bytes appended to the record log.
    #[must_use]
    pub fn contents(&self) -> &[u8] {
        &self.rep
    }

    /// Replaces the batch with `contents`, e.g. a record replayed from the
    /// log. Asserts that at least a header is present.
    pub fn set_contents(&mut self, contents: &[u8]) {
        assert!(contents.len() >= HEADER_SIZE);
        self.rep.clear();
        self.rep.extend_from_slice(contents);
    }
}

/// Receiver for decoded batch records.
pub trait Handler {
    fn put(&mut self, key: &[u8], value: &[u8]);

    fn delete(&mut self, key: &[u8]);
}

/// Applies records to a memtable, stamping each with the next sequence
/// number.
struct MemTableInserter<'a> {
    sequence: SequenceNumber,
    mem: &'a MemTable,
}

impl Handler for MemTableInserter<'_> {
    fn put(&mut self, key: &[u8], value: &[u8]) {
        self.mem.add(self.sequence, ValueType::Value, key, value);
        self.sequence += 1;
    }

    fn delete(&mut self, key: &[u8]) {
        self.mem.add(self.sequence, ValueType::Deletion, key, b"");
        self.sequence += 1;
    }
}

/// Replays `batch` into `mem`: record `i` is applied with sequence
/// `batch.sequence() + i`.
pub fn insert_into(batch: &WriteBatch, mem: &MemTable) -> Result<()> {
    let mut inserter = MemTableInserter {
        sequence: batch.sequence(),
        mem,
    };
    batch.iterate(&mut inserter)
}
