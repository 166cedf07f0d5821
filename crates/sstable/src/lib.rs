//! # SSTable — sorted string tables
//!
//! Immutable, on-disk sorted files plus the merging iterator that unifies
//! them (and the memtable) into one ordered stream. When the in-memory
//! write buffer fills, the engine drains it through [`TableBuilder`] into a
//! table file; tables are *write-once, read-many* — never modified, only
//! replaced.
//!
//! ## File layout
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ DATA BLOCK 0                                                 │
//! │ DATA BLOCK 0 trailer: type (u8) | masked crc32c (u32 LE)     │
//! ├──────────────────────────────────────────────────────────────┤
//! │ ... more data blocks ...                                     │
//! ├──────────────────────────────────────────────────────────────┤
//! │ INDEX BLOCK (+ trailer)                                      │
//! │   one entry per data block:                                  │
//! │   key = last key of the block, value = BlockHandle           │
//! ├──────────────────────────────────────────────────────────────┤
//! │ FOOTER (always last 20 bytes)                                │
//! │   index_offset (u64 LE) | index_size (u64 LE) | magic (u32)  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each block is a sequence of prefix-compressed entries:
//!
//! ```text
//! shared: varint32 | unshared: varint32 | value_len: varint32
//! key_delta[unshared] | value[value_len]
//! ```
//!
//! Every `block_restart_interval` entries compression resets (`shared = 0`)
//! and the entry's offset is recorded in a trailing restart array, which is
//! what makes binary search inside a block possible:
//!
//! ```text
//! restart[0..k]: u32 LE each | k: u32 LE
//! ```
//!
//! The block trailer's CRC-32C covers the block bytes plus the type byte and
//! is stored masked. Type `0` (uncompressed) is the only defined type.

mod block;
mod block_builder;
mod builder;
mod format;
mod merge;
mod reader;

pub use block::{Block, BlockIter};
pub use block_builder::BlockBuilder;
pub use builder::TableBuilder;
pub use format::{BlockHandle, Footer, BLOCK_TRAILER_SIZE, BLOCK_TYPE_RAW, FOOTER_SIZE, TABLE_MAGIC};
pub use merge::new_merging_iterator;
pub use reader::{Table, TableIterator};

#[cfg(test)]
mod tests;
