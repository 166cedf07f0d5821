use std::sync::Arc;

use base::{Error, Options, RandomAccessFile, ReadOptions, Result, StorageIterator};
use codec::crc;

use crate::block::{Block, BlockIter};
use crate::format::{BlockHandle, Footer, BLOCK_TRAILER_SIZE, BLOCK_TYPE_RAW, FOOTER_SIZE};

/// An open, immutable table file.
///
/// Holds the parsed index block; data blocks are read on demand by
/// iterators. Shared as `Arc<Table>` so any number of iterators can be open
/// at once.
pub struct Table {
    options: Options,
    file: Arc<dyn RandomAccessFile>,
    index_block: Block,
}

impl std::fmt::Debug for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Table").finish_non_exhaustive()
    }
}

impl Table {
    /// Reads and validates the footer and index block of a `size`-byte
    /// table file.
    pub fn open(
        options: &Options,
        file: Arc<dyn RandomAccessFile>,
        size: u64,
    ) -> Result<Arc<Table>> {
        if (size as usize) < FOOTER_SIZE {
            return Err(Error::corruption("file is too short to be an sstable"));
        }

        let footer_bytes = file.read(size - FOOTER_SIZE as u64, FOOTER_SIZE)?;
        let footer = Footer::decode_from(&footer_bytes)?;

        // The index block is the map of the whole file; always verify it.
        let index_contents = read_block_contents(file.as_ref(), &footer.index_handle, true)?;
        let index_block = Block::new(index_contents)?;

        Ok(Arc::new(Table {
            options: options.clone(),
            file,
            index_block,
        }))
    }

    /// A bidirectional iterator over every entry in the table.
    pub fn iter(self: &Arc<Self>, read_options: &ReadOptions) -> TableIterator {
        TableIterator {
            table: Arc::clone(self),
            read_options: read_options.clone(),
            index_iter: self
                .index_block
                .iter(Arc::clone(&self.options.comparator)),
            data_iter: None,
            data_block_handle: None,
            status: Ok(()),
        }
    }

    fn read_data_block(&self, handle: &BlockHandle, verify: bool) -> Result<Block> {
        let contents = read_block_contents(self.file.as_ref(), handle, verify)?;
        Block::new(contents)
    }
}

/// Reads one block plus its trailer, optionally verifying the checksum.
fn read_block_contents(
    file: &dyn RandomAccessFile,
    handle: &BlockHandle,
    verify: bool,
) -> Result<Vec<u8>> {
    let n = handle.size as usize;
    let mut data = file.read(handle.offset, n + BLOCK_TRAILER_SIZE)?;
    if data.len() < n + BLOCK_TRAILER_SIZE {
        return Err(Error::corruption("truncated block read"));
    }

    if verify {
        let stored = crc::unmask(codec::decode_fixed32(&data[n + 1..n + 5]));
        let actual = crc::extend(crc::value(&data[..n]), &data[n..n + 1]);
        if stored != actual {
            return Err(Error::corruption("block checksum mismatch"));
        }
    }

    match data[n] {
        BLOCK_TYPE_RAW => {
            data.truncate(n);
            Ok(data)
        }
        other => Err(Error::Corruption(format!("bad block type: {other}"))),
    }
}

/// Two-level iterator: walks the index block, lazily opening the data block
/// each index entry points at.
pub struct TableIterator {
    table: Arc<Table>,
    read_options: ReadOptions,
    index_iter: BlockIter,
    data_iter: Option<BlockIter>,
    /// Handle of the block `data_iter` is over, so repositioning within the
    /// same block skips the read.
    data_block_handle: Option<BlockHandle>,
    status: Result<()>,
}

impl TableIterator {
    /// Points `data_iter` at the block the index iterator designates.
    fn init_data_block(&mut self) {
        if !self.index_iter.valid() {
            self.data_iter = None;
            self.data_block_handle = None;
            return;
        }

        let handle = match BlockHandle::decode_from(self.index_iter.value()) {
            Ok(handle) => handle,
            Err(e) => {
                self.status = Err(e);
                self.data_iter = None;
                self.data_block_handle = None;
                return;
            }
        };
        if self.data_iter.is_some() && self.data_block_handle == Some(handle) {
            // Already over this block.
            return;
        }

        match self
            .table
            .read_data_block(&handle, self.read_options.verify_checksums)
        {
            Ok(block) => {
                self.data_iter =
                    Some(block.iter(Arc::clone(&self.table.options.comparator)));
                self.data_block_handle = Some(handle);
            }
            Err(e) => {
                self.status = Err(e);
                self.data_iter = None;
                self.data_block_handle = None;
            }
        }
    }

    /// Advances over exhausted data blocks until a valid position or the end
    /// of the index.
    fn skip_empty_data_blocks_forward(&mut self) {
        while self.data_iter.as_ref().map_or(true, |d| !d.valid()) {
            if !self.index_iter.valid() {
                self.data_iter = None;
                self.data_block_handle = None;
                return;
            }
            self.index_iter.next();
            self.init_data_block();
            if let Some(data) = self.data_iter.as_mut() {
                data.seek_to_first();
            }
        }
    }

    fn skip_empty_data_blocks_backward(&mut self) {
        while self.data_iter.as_ref().map_or(true, |d| !d.valid()) {
            if !self.index_iter.valid() {
                self.data_iter = None;
                self.data_block_handle = None;
                return;
            }
            self.index_iter.prev();
            self.init_data_block();
            if let Some(data) = self.data_iter.as_mut() {
                data.seek_to_last();
            }
        }
    }
}

impl StorageIterator for TableIterator {
    fn valid(&self) -> bool {
        self.data_iter.as_ref().map_or(false, |d| d.valid())
    }

    fn seek_to_first(&mut self) {
        self.index_iter.seek_to_first();
        self.init_data_block();
        if let Some(data) = self.data_iter.as_mut() {
            data.seek_to_first();
        }
        self.skip_empty_data_blocks_forward();
    }

    fn seek_to_last(&mut self) {
        self.index_iter.seek_to_last();
        self.init_data_block();
        if let Some(data) = self.data_iter.as_mut() {
            data.seek_to_last();
        }
        self.skip_empty_data_blocks_backward();
    }

    fn seek(&mut self, target: &[u8]) {
        // The index key for a block is its last key, so the first index
        // entry ≥ target names the block that could hold it.
        self.index_iter.seek(target);
        self.init_data_block();
        if let Some(data) = self.data_iter.as_mut() {
            data.seek(target);
        }
        self.skip_empty_data_blocks_forward();
    }

    fn next(&mut self) {
        assert!(self.valid());
        self.data_iter
            .as_mut()
            .expect("iterator is valid")
            .next();
        self.skip_empty_data_blocks_forward();
    }

    fn prev(&mut self) {
        assert!(self.valid());
        self.data_iter
            .as_mut()
            .expect("iterator is valid")
            .prev();
        self.skip_empty_data_blocks_backward();
    }

    fn key(&self) -> &[u8] {
        self.data_iter.as_ref().expect("iterator is valid").key()
    }

    fn value(&self) -> &[u8] {
        self.data_iter.as_ref().expect("iterator is valid").value()
    }

    fn status(&self) -> Result<()> {
        self.index_iter.status()?;
        if let Some(data) = self.data_iter.as_ref() {
            data.status()?;
        }
        self.status.clone()
    }
}
