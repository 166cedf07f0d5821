use std::cmp::Ordering;

use base::{Options, Result, WritableFile};
use codec::crc;

use crate::block_builder::BlockBuilder;
use crate::format::{BlockHandle, Footer, BLOCK_TRAILER_SIZE, BLOCK_TYPE_RAW};

/// Streams sorted key/value pairs into one immutable table file.
///
/// Entries accumulate in a data block until it reaches `block_size`, then
/// the block is written out with its checksum trailer. The index entry for
/// a finished block is deferred until the first key of the *next* block
/// arrives, matching when the block's key range is actually sealed.
///
/// The first error sticks: every later operation is a no-op and `finish`
/// reports it. Keys must arrive in strictly increasing order under the
/// table comparator.
pub struct TableBuilder {
    options: Options,
    file: Box<dyn WritableFile>,
    /// Bytes written so far; after `finish`, the final file size.
    offset: u64,
    status: Result<()>,
    data_block: BlockBuilder,
    index_block: BlockBuilder,
    last_key: Vec<u8>,
    num_entries: u64,
    closed: bool,
    /// True while the index entry for the just-flushed block is deferred.
    pending_index_entry: bool,
    pending_handle: BlockHandle,
}

impl TableBuilder {
    pub fn new(options: &Options, file: Box<dyn WritableFile>) -> TableBuilder {
        // Index keys are already far apart; per-entry restarts keep index
        // lookups a pure binary search.
        let mut index_options = options.clone();
        index_options.block_restart_interval = 1;

        TableBuilder {
            options: options.clone(),
            file,
            offset: 0,
            status: Ok(()),
            data_block: BlockBuilder::new(options),
            index_block: BlockBuilder::new(&index_options),
            last_key: Vec::new(),
            num_entries: 0,
            closed: false,
            pending_index_entry: false,
            pending_handle: BlockHandle::default(),
        }
    }

    /// Appends one entry. `key` must sort strictly after every key added so
    /// far.
    pub fn add(&mut self, key: &[u8], value: &[u8]) {
        assert!(!self.closed);
        if !self.ok() {
            return;
        }
        if self.num_entries > 0 {
            assert!(self.options.comparator.compare(key, &self.last_key) == Ordering::Greater);
        }

        if self.pending_index_entry {
            debug_assert!(self.data_block.is_empty());
            let mut handle_encoding = Vec::new();
            self.pending_handle.encode_to(&mut handle_encoding);
            self.index_block.add(&self.last_key, &handle_encoding);
            self.pending_index_entry = false;
        }

        self.last_key.clear();
        self.last_key.extend_from_slice(key);
        self.num_entries += 1;
        self.data_block.add(key, value);

        if self.data_block.current_size_estimate() >= self.options.block_size {
            self.flush();
        }
    }

    /// Writes the in-progress data block out, if non-empty.
    pub fn flush(&mut self) {
        assert!(!self.closed);
        if !self.ok() || self.data_block.is_empty() {
            return;
        }
        debug_assert!(!self.pending_index_entry);

        let contents = self.data_block.finish().to_vec();
        self.data_block.reset();
        self.pending_handle = self.write_raw_block(&contents);
        if self.ok() {
            self.pending_index_entry = true;
            if let Err(e) = self.file.flush() {
                self.status = Err(e);
            }
        }
    }

    /// Appends `contents` plus its type/checksum trailer, returning where it
    /// landed. On failure the error sticks and the offset stays put.
    fn write_raw_block(&mut self, contents: &[u8]) -> BlockHandle {
        let handle = BlockHandle {
            offset: self.offset,
            size: contents.len() as u64,
        };

        let mut trailer = [0u8; BLOCK_TRAILER_SIZE];
        trailer[0] = BLOCK_TYPE_RAW;
        let crc = crc::extend(crc::value(contents), &trailer[..1]);
        codec::encode_fixed32_into(&mut trailer[1..], crc::mask(crc));

        let result = self
            .file
            .append(contents)
            .and_then(|()| self.file.append(&trailer));
        match result {
            Ok(()) => self.offset += (contents.len() + BLOCK_TRAILER_SIZE) as u64,
            Err(e) => self.status = Err(e),
        }
        handle
    }

    /// Flushes the last data block, writes the index block and footer, and
    /// returns the final status. No entries may be added afterwards.
    pub fn finish(&mut self) -> Result<()> {
        self.flush();
        assert!(!self.closed);
        self.closed = true;

        if self.ok() && self.pending_index_entry {
            let mut handle_encoding = Vec::new();
            self.pending_handle.encode_to(&mut handle_encoding);
            self.index_block.add(&self.last_key, &handle_encoding);
            self.pending_index_entry = false;
        }

        if self.ok() {
            let contents = self.index_block.finish().to_vec();
            let index_handle = self.write_raw_block(&contents);
            if self.ok() {
                let mut footer_encoding = Vec::new();
                Footer { index_handle }.encode_to(&mut footer_encoding);
                match self.file.append(&footer_encoding) {
                    Ok(()) => self.offset += footer_encoding.len() as u64,
                    Err(e) => self.status = Err(e),
                }
            }
        }

        self.status.clone()
    }

    #[must_use]
    pub fn num_entries(&self) -> u64 {
        self.num_entries
    }

    /// Bytes written so far; after a successful `finish`, the file size.
    #[must_use]
    pub fn file_size(&self) -> u64 {
        self.offset
    }

    pub fn status(&self) -> Result<()> {
        self.status.clone()
    }

    fn ok(&self) -> bool {
        self.status.is_ok()
    }

    /// The underlying sink, for the caller's sync/close policy.
    pub fn file(&mut self) -> &mut dyn WritableFile {
        self.file.as_mut()
    }
}
