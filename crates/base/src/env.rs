//! File-system abstraction.
//!
//! The core never touches `std::fs` directly; it consumes these capabilities
//! so tests can interpose fault injection and alternative backends without
//! patching the write path.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::Mutex;

use crate::error::{Error, Result};

/// An append-only byte sink.
///
/// Durability is layered: `append` may buffer, `flush` pushes buffers to the
/// OS, `sync` makes bytes crash-durable, `close` releases the handle. Callers
/// own the policy for when each is invoked.
pub trait WritableFile: Send {
    fn append(&mut self, data: &[u8]) -> Result<()>;

    fn flush(&mut self) -> Result<()>;

    fn sync(&mut self) -> Result<()>;

    fn close(&mut self) -> Result<()>;
}

/// Positioned reads into an immutable file.
pub trait RandomAccessFile: Send + Sync + std::fmt::Debug {
    /// Reads up to `n` bytes starting at `offset`. Returns fewer bytes only
    /// at end-of-file.
    fn read(&self, offset: u64, n: usize) -> Result<Vec<u8>>;
}

/// The file-system capabilities the storage core consumes.
pub trait Env: Send + Sync {
    fn new_writable_file(&self, path: &Path) -> Result<Box<dyn WritableFile>>;

    fn new_random_access_file(&self, path: &Path) -> Result<Box<dyn RandomAccessFile>>;

    fn remove_file(&self, path: &Path) -> Result<()>;

    /// Size of the file in bytes. A missing file reports `NotFound`.
    fn file_size(&self, path: &Path) -> Result<u64>;
}

// -------------------- Disk implementation --------------------

struct DiskWritableFile {
    file: Option<File>,
}

impl DiskWritableFile {
    fn file(&mut self) -> Result<&mut File> {
        self.file
            .as_mut()
            .ok_or_else(|| Error::Io("file already closed".to_string()))
    }
}

impl WritableFile for DiskWritableFile {
    fn append(&mut self, data: &[u8]) -> Result<()> {
        self.file()?.write_all(data)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.file()?.flush()?;
        Ok(())
    }

    fn sync(&mut self) -> Result<()> {
        self.file()?.sync_all()?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        // Dropping the handle closes it; taking it makes later use an error
        // instead of a silent reopen.
        if let Some(mut f) = self.file.take() {
            f.flush()?;
        }
        Ok(())
    }
}

#[derive(Debug)]
struct DiskRandomAccessFile {
    /// Shared handle behind a mutex so `read` works through `&self`. Reads
    /// seek then read, which is portable at the cost of serializing callers.
    file: Mutex<File>,
}

impl RandomAccessFile for DiskRandomAccessFile {
    fn read(&self, offset: u64, n: usize) -> Result<Vec<u8>> {
        let mut file = self
            .file
            .lock()
            .map_err(|e| Error::Io(format!("lock poisoned: {e}")))?;
        file.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; n];
        let mut filled = 0;
        while filled < n {
            let read = file.read(&mut buf[filled..])?;
            if read == 0 {
                break;
            }
            filled += read;
        }
        buf.truncate(filled);
        Ok(buf)
    }
}

/// [`Env`] over the local file system.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskEnv;

impl Env for DiskEnv {
    fn new_writable_file(&self, path: &Path) -> Result<Box<dyn WritableFile>> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;
        Ok(Box::new(DiskWritableFile { file: Some(file) }))
    }

    fn new_random_access_file(&self, path: &Path) -> Result<Box<dyn RandomAccessFile>> {
        let file = File::open(path)?;
        Ok(Box::new(DiskRandomAccessFile {
            file: Mutex::new(file),
        }))
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        std::fs::remove_file(path)?;
        Ok(())
    }

    fn file_size(&self, path: &Path) -> Result<u64> {
        Ok(std::fs::metadata(path)?.len())
    }
}
