//! The multi-version key model.
//!
//! Every mutation is stamped with a 56-bit sequence number and a one-byte
//! type, packed into an 8-byte tag appended to the user key:
//!
//! ```text
//! internal_key := user_key || tag        tag := (sequence << 8) | type
//! ```
//!
//! A snapshot read at sequence `S` seeks to `(user_key, S, ValueTypeForSeek)`
//! and lands on the newest entry with sequence ≤ `S`, because internal keys
//! sort with newer tags first.

use crate::error::{Error, Result};

/// Monotonic per-mutation counter. Only the low 56 bits are usable; the top
/// byte of the tag carries the value type.
pub type SequenceNumber = u64;

/// Largest sequence number that fits alongside a type byte in the tag.
pub const MAX_SEQUENCE_NUMBER: SequenceNumber = (1 << 56) - 1;

/// Discriminates live values from tombstones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Deletion = 0,
    Value = 1,
}

/// The type used when constructing seek targets.
///
/// `Value` carries the numerically largest tag for a given sequence, so a
/// seek key built with it sorts at-or-before every entry with the same user
/// key and sequence ≤ the snapshot.
pub const VALUE_TYPE_FOR_SEEK: ValueType = ValueType::Value;

impl ValueType {
    pub fn from_u8(byte: u8) -> Result<Self> {
        match byte {
            0 => Ok(ValueType::Deletion),
            1 => Ok(ValueType::Value),
            other => Err(Error::Corruption(format!("unknown value type: {other}"))),
        }
    }
}

/// Packs a sequence number and type into the 8-byte tag.
pub fn pack_sequence_and_type(seq: SequenceNumber, t: ValueType) -> u64 {
    debug_assert!(seq <= MAX_SEQUENCE_NUMBER);
    (seq << 8) | t as u64
}

/// An internal key split into its logical parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedInternalKey<'a> {
    pub user_key: &'a [u8],
    pub sequence: SequenceNumber,
    pub value_type: ValueType,
}

/// Appends the encoding of `key` to `dst`.
pub fn append_internal_key(dst: &mut Vec<u8>, key: &ParsedInternalKey<'_>) {
    dst.extend_from_slice(key.user_key);
    codec::put_fixed64(dst, pack_sequence_and_type(key.sequence, key.value_type));
}

/// Splits an encoded internal key into its parts.
///
/// Fails with `Corruption` if the encoding is shorter than a tag or carries
/// an unknown type byte.
pub fn parse_internal_key(encoded: &[u8]) -> Result<ParsedInternalKey<'_>> {
    if encoded.len() < 8 {
        return Err(Error::corruption("internal key too short"));
    }
    let (user_key, tag_bytes) = encoded.split_at(encoded.len() - 8);
    let tag = codec::decode_fixed64(tag_bytes);
    let value_type = ValueType::from_u8((tag & 0xff) as u8)?;
    Ok(ParsedInternalKey {
        user_key,
        sequence: tag >> 8,
        value_type,
    })
}

/// The user-key portion of an encoded internal key.
///
/// Panics if `encoded` is shorter than the 8-byte tag; callers hold
/// well-formed internal keys.
pub fn extract_user_key(encoded: &[u8]) -> &[u8] {
    assert!(encoded.len() >= 8);
    &encoded[..encoded.len() - 8]
}

/// An owned internal key, used where key bounds outlive the iterator that
/// produced them (e.g. table file metadata).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InternalKey {
    rep: Vec<u8>,
}

impl InternalKey {
    pub fn new(user_key: &[u8], seq: SequenceNumber, t: ValueType) -> Self {
        let mut rep = Vec::with_capacity(user_key.len() + 8);
        append_internal_key(
            &mut rep,
            &ParsedInternalKey {
                user_key,
                sequence: seq,
                value_type: t,
            },
        );
        InternalKey { rep }
    }

    /// Replaces this key with the given encoding.
    pub fn decode_from(&mut self, encoded: &[u8]) {
        self.rep.clear();
        self.rep.extend_from_slice(encoded);
    }

    #[must_use]
    pub fn encoded(&self) -> &[u8] {
        &self.rep
    }

    #[must_use]
    pub fn user_key(&self) -> &[u8] {
        extract_user_key(&self.rep)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rep.is_empty()
    }
}

/// A memtable/table search key for `(user_key, snapshot)`.
///
/// Holds a single allocation shaped as
/// `varint32(user_key.len() + 8) || user_key || tag` and exposes three views:
/// the whole buffer for memtable-format probes, the suffix without the
/// length prefix for table seeks, and the bare user key.
pub struct LookupKey {
    data: Vec<u8>,
    kstart: usize,
}

impl LookupKey {
    pub fn new(user_key: &[u8], snapshot: SequenceNumber) -> Self {
        let internal_len = user_key.len() + 8;
        let mut data = Vec::with_capacity(codec::varint_length(internal_len as u64) + internal_len);
        codec::put_varint32(&mut data, internal_len as u32);
        let kstart = data.len();
        data.extend_from_slice(user_key);
        codec::put_fixed64(&mut data, pack_sequence_and_type(snapshot, VALUE_TYPE_FOR_SEEK));
        LookupKey { data, kstart }
    }

    /// The length-prefixed form used for memtable seeks.
    #[must_use]
    pub fn memtable_key(&self) -> &[u8] {
        &self.data
    }

    /// The internal-key form used for table seeks.
    #[must_use]
    pub fn internal_key(&self) -> &[u8] {
        &self.data[self.kstart..]
    }

    #[must_use]
    pub fn user_key(&self) -> &[u8] {
        &self.data[self.kstart..self.data.len() - 8]
    }
}
