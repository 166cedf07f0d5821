use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use base::{
    new_error_iterator, table_file_name, Env, Options, ReadOptions, Result, StorageIterator,
};
use sstable::Table;

/// Keeps table files open and parsed across reads.
///
/// Opening a table means reading its footer and index block; doing that once
/// per file number and sharing the `Arc<Table>` makes repeated iterator
/// creation cheap. Entries live until [`evict`](TableCache::evict) — the
/// version layer evicts a number when the file is deleted.
pub struct TableCache {
    dbname: PathBuf,
    env: Arc<dyn Env>,
    options: Options,
    tables: Mutex<HashMap<u64, Arc<Table>>>,
}

impl TableCache {
    pub fn new(dbname: &Path, env: Arc<dyn Env>, options: &Options) -> TableCache {
        TableCache {
            dbname: dbname.to_path_buf(),
            env,
            options: options.clone(),
            tables: Mutex::new(HashMap::new()),
        }
    }

    fn find_table(&self, file_number: u64, file_size: u64) -> Result<Arc<Table>> {
        if let Some(table) = self
            .tables
            .lock()
            .expect("table cache lock")
            .get(&file_number)
        {
            return Ok(Arc::clone(table));
        }

        let path = table_file_name(&self.dbname, file_number);
        let file = self.env.new_random_access_file(&path)?;
        let table = Table::open(&self.options, Arc::from(file), file_size)?;

        self.tables
            .lock()
            .expect("table cache lock")
            .insert(file_number, Arc::clone(&table));
        Ok(table)
    }

    /// An iterator over table `file_number`.
    ///
    /// A file that cannot be opened or parsed yields an invalid iterator
    /// whose `status()` carries the failure, so callers merge first and
    /// check errors once.
    pub fn new_iterator(
        &self,
        read_options: &ReadOptions,
        file_number: u64,
        file_size: u64,
    ) -> Box<dyn StorageIterator> {
        match self.find_table(file_number, file_size) {
            Ok(table) => Box::new(table.iter(read_options)),
            Err(e) => new_error_iterator(e),
        }
    }

    /// Drops the cached handle for `file_number`, e.g. after the file is
    /// deleted.
    pub fn evict(&self, file_number: u64) {
        self.tables
            .lock()
            .expect("table cache lock")
            .remove(&file_number);
    }
}
