use std::path::Path;
use std::sync::Arc;

use base::{
    BytewiseComparator, DiskEnv, Env, Error, InternalKeyComparator, Options, RandomAccessFile,
    Result, WritableFile,
};
use memtable::MemTable;

/// Options whose comparator orders internal keys — what every table built
/// from a memtable iterator needs.
pub fn internal_key_options() -> Options {
    Options {
        comparator: Arc::new(InternalKeyComparator::new(Arc::new(BytewiseComparator))),
        ..Options::default()
    }
}

pub fn new_memtable() -> Arc<MemTable> {
    let cmp = InternalKeyComparator::new(Arc::new(BytewiseComparator));
    Arc::new(MemTable::new(cmp))
}

// -------------------- Fault injection --------------------

struct FaultFile {
    inner: Box<dyn WritableFile>,
    fail_sync: bool,
}

impl WritableFile for FaultFile {
    fn append(&mut self, data: &[u8]) -> Result<()> {
        self.inner.append(data)
    }

    fn flush(&mut self) -> Result<()> {
        self.inner.flush()
    }

    fn sync(&mut self) -> Result<()> {
        if self.fail_sync {
            return Err(Error::Io("injected sync failure".to_string()));
        }
        self.inner.sync()
    }

    fn close(&mut self) -> Result<()> {
        self.inner.close()
    }
}

/// A disk-backed [`Env`] that can be told to fail every `sync`.
pub struct FaultEnv {
    inner: DiskEnv,
    pub fail_sync: bool,
}

impl FaultEnv {
    pub fn new(fail_sync: bool) -> FaultEnv {
        FaultEnv {
            inner: DiskEnv,
            fail_sync,
        }
    }
}

impl Env for FaultEnv {
    fn new_writable_file(&self, path: &Path) -> Result<Box<dyn WritableFile>> {
        Ok(Box::new(FaultFile {
            inner: self.inner.new_writable_file(path)?,
            fail_sync: self.fail_sync,
        }))
    }

    fn new_random_access_file(&self, path: &Path) -> Result<Box<dyn RandomAccessFile>> {
        self.inner.new_random_access_file(path)
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        self.inner.remove_file(path)
    }

    fn file_size(&self, path: &Path) -> Result<u64> {
        self.inner.file_size(path)
    }
}
