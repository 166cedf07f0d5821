//! # WAL — block-framed record log
//!
//! Crash-safe durability for the storage engine. Every atomic mutation batch
//! is appended to the log **before** the corresponding in-memory update; on
//! restart the log is replayed to reconstruct the memtable, so no
//! acknowledged write is lost.
//!
//! ## Framing
//!
//! The byte stream is divided into fixed 32 KiB blocks. Each block holds a
//! sequence of physical records:
//!
//! ```text
//! [masked crc32c: u32 LE][length: u16 LE][type: u8][payload ...]
//! ```
//!
//! The CRC covers the type byte followed by the payload, and is stored
//! masked so a log containing its own checksums stays checkable. A logical
//! record larger than the space left in a block is split across blocks:
//! `Full` alone, or `First`, zero or more `Middle`, then `Last`. Fewer than
//! seven bytes left in a block are zero-filled and the next record starts in
//! the next block — so a reader can always find a header at a known offset.
//!
//! ## Example
//!
//! ```rust,no_run
//! use base::{DiskEnv, Env};
//! use wal::{Reader, Writer};
//!
//! let env = DiskEnv;
//! let file = env.new_writable_file("db/000003.log".as_ref()).unwrap();
//! let mut w = Writer::new(file);
//! w.add_record(b"batch bytes").unwrap();
//!
//! let f = std::fs::File::open("db/000003.log").unwrap();
//! let mut r = Reader::new(f);
//! while let Some(record) = r.read_record().unwrap() {
//!     println!("{} bytes", record.len());
//! }
//! ```

use base::{Error, Result};

mod reader;
mod writer;

pub use reader::Reader;
pub use writer::Writer;


/// Physical block size of the log stream.
pub const BLOCK_SIZE: usize = 32 * 1024;

/// Bytes of framing before each physical record: crc (4) + length (2) +
/// type (1).
pub const HEADER_SIZE: usize = 7;

/// Physical record types.
///
/// Type 0 is reserved for preallocated (zero-filled) file regions and never
/// written by [`Writer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordType {
    /// A logical record contained entirely in one physical record.
    Full = 1,
    /// First fragment of a spanning record.
    First = 2,
    /// Interior fragment.
    Middle = 3,
    /// Final fragment.
    Last = 4,
}

/// Highest assigned record type value.
pub const MAX_RECORD_TYPE: usize = RecordType::Last as usize;

impl RecordType {
    fn from_u8(byte: u8) -> Result<Self> {
        match byte {
            1 => Ok(RecordType::Full),
            2 => Ok(RecordType::First),
            3 => Ok(RecordType::Middle),
            4 => Ok(RecordType::Last),
            other => Err(Error::Corruption(format!(
                "unknown log record type: {other}"
            ))),
        }
    }
}
