use std::path::Path;

use base::{table_file_name, Env, InternalKey, Options, ReadOptions, Result, StorageIterator};
use sstable::TableBuilder;

use crate::cache::TableCache;

/// What the version layer needs to know about one table file.
#[derive(Debug, Clone, Default)]
pub struct FileMetaData {
    pub number: u64,
    pub file_size: u64,
    pub smallest: InternalKey,
    pub largest: InternalKey,
}

/// Drains `iter` into table file `meta.number` under `dbname`.
///
/// On success `meta` holds the file size and the smallest/largest internal
/// keys, and the file has been synced, closed, and validated by opening it
/// through `table_cache`. On any failure — including an error reported by
/// the input iterator — the partial file is deleted and the error returned.
///
/// An iterator with no entries is not an error: no file is created and
/// `meta.file_size` stays zero.
pub fn build_table(
    dbname: &Path,
    env: &dyn Env,
    options: &Options,
    table_cache: &TableCache,
    iter: &mut dyn StorageIterator,
    meta: &mut FileMetaData,
) -> Result<()> {
    meta.file_size = 0;
    iter.seek_to_first();

    let fname = table_file_name(dbname, meta.number);
    if !iter.valid() {
        return Ok(());
    }

    let file = env.new_writable_file(&fname)?;
    let mut builder = TableBuilder::new(options, file);

    meta.smallest.decode_from(iter.key());
    while iter.valid() {
        let key = iter.key();
        meta.largest.decode_from(key);
        builder.add(key, iter.value());
        iter.next();
    }

    let mut result = builder.finish();
    if result.is_ok() {
        meta.file_size = builder.file_size();
        assert!(meta.file_size > 0);
        result = builder.file().sync();
    }
    if result.is_ok() {
        result = builder.file().close();
    }

    if result.is_ok() {
        // Verify the file is usable before it becomes reachable.
        let validation = table_cache.new_iterator(&ReadOptions::default(), meta.number, meta.file_size);
        result = validation.status();
    }

    // An error from the data source trumps everything else.
    if let Err(e) = iter.status() {
        result = Err(e);
    }

    if result.is_err() || meta.file_size == 0 {
        // Deletion is best-effort; the original error is what matters.
        let _ = env.remove_file(&fname);
    }
    result
}
