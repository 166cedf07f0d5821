//! # Base — shared vocabulary of the storage core
//!
//! The types every other crate speaks: the error taxonomy, key ordering
//! (user keys, sequence numbers, internal keys), the iterator capability
//! trait, tuning options, the file-system abstraction, and the on-disk
//! naming scheme.
//!
//! Nothing here touches a byte format except the internal-key encoding
//! (`user_key || tag`), which is the ordering contract the memtable, the
//! sorted tables, and the merging iterator all share.

mod comparator;
mod env;
mod error;
mod filename;
mod iterator;
mod key;
mod options;

pub use comparator::{BytewiseComparator, Comparator, InternalKeyComparator};
pub use env::{DiskEnv, Env, RandomAccessFile, WritableFile};
pub use error::{Error, Result};
pub use filename::{log_file_name, table_file_name};
pub use iterator::{new_empty_iterator, new_error_iterator, StorageIterator};
pub use key::{
    append_internal_key, extract_user_key, pack_sequence_and_type, parse_internal_key,
    InternalKey, LookupKey, ParsedInternalKey, SequenceNumber, ValueType, MAX_SEQUENCE_NUMBER,
    VALUE_TYPE_FOR_SEEK,
};
pub use options::{Options, ReadOptions};
