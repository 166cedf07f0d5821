use std::cmp::Ordering;
use std::sync::Arc;

use base::{Comparator, Error, Result, StorageIterator};

/// A decoded block: entry bytes followed by the restart array.
///
/// Cloning is cheap — the bytes are shared — so a table can hand a block to
/// any number of iterators.
#[derive(Clone, Debug)]
pub struct Block {
    data: Arc<Vec<u8>>,
    /// Offset where entries end and the restart array begins.
    restart_offset: usize,
    num_restarts: u32,
}

impl Block {
    /// Validates the restart trailer and takes ownership of the bytes.
    pub fn new(data: Vec<u8>) -> Result<Block> {
        if data.len() < 4 {
            return Err(Error::corruption("block too small for restart count"));
        }
        let num_restarts = codec::decode_fixed32(&data[data.len() - 4..]);
        let max_restarts = (data.len() as u64 - 4) / 4;
        if u64::from(num_restarts) > max_restarts {
            return Err(Error::corruption("block restart count out of range"));
        }
        let restart_offset = data.len() - 4 - 4 * num_restarts as usize;
        // Every restart must point into the entry region, or later slicing
        // would walk off the block.
        for i in 0..num_restarts {
            let point = codec::decode_fixed32(&data[restart_offset + 4 * i as usize..]) as usize;
            if point > restart_offset {
                return Err(Error::corruption("block restart offset out of range"));
            }
        }
        Ok(Block {
            data: Arc::new(data),
            restart_offset,
            num_restarts,
        })
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    fn restart_point(&self, index: u32) -> usize {
        debug_assert!(index < self.num_restarts);
        codec::decode_fixed32(&self.data[self.restart_offset + 4 * index as usize..]) as usize
    }

    /// An iterator over the block under `cmp` — the comparator the block was
    /// built with.
    pub fn iter(&self, cmp: Arc<dyn Comparator>) -> BlockIter {
        let restart_offset = self.restart_offset;
        BlockIter {
            block: self.clone(),
            cmp,
            current: restart_offset,
            restart_index: 0,
            key: Vec::new(),
            value_offset: restart_offset,
            value_len: 0,
            status: Ok(()),
        }
    }
}

/// Iterator over one block's prefix-compressed entries.
pub struct BlockIter {
    block: Block,
    cmp: Arc<dyn Comparator>,
    /// Offset of the current entry, or `restart_offset` when invalid.
    current: usize,
    /// Restart region the current entry belongs to.
    restart_index: u32,
    /// Reconstructed full key of the current entry.
    key: Vec<u8>,
    value_offset: usize,
    value_len: usize,
    status: Result<()>,
}

impl BlockIter {
    /// Offset just past the current entry.
    fn next_entry_offset(&self) -> usize {
        self.value_offset + self.value_len
    }

    fn seek_to_restart_point(&mut self, index: u32) {
        self.key.clear();
        self.restart_index = index;
        // No entry parsed yet; park the value cursor at the restart offset
        // so `parse_next_key` starts there.
        self.value_offset = self.block.restart_point(index);
        self.value_len = 0;
    }

    fn mark_invalid(&mut self) {
        self.current = self.block.restart_offset;
        self.restart_index = self.block.num_restarts;
    }

    fn corruption(&mut self, msg: &str) {
        self.mark_invalid();
        self.key.clear();
        self.value_len = 0;
        if self.status.is_ok() {
            self.status = Err(Error::corruption(msg));
        }
    }

    /// Decodes the entry at `next_entry_offset`, extending the reconstructed
    /// key. Returns false at the end of the block or on corruption.
    fn parse_next_key(&mut self) -> bool {
        self.current = self.next_entry_offset();
        if self.current >= self.block.restart_offset {
            self.mark_invalid();
            return false;
        }

        let mut input = &self.block.data[self.current..self.block.restart_offset];
        let header = (
            codec::get_varint32(&mut input),
            codec::get_varint32(&mut input),
            codec::get_varint32(&mut input),
        );
        let (shared, non_shared, value_len) = match header {
            (Some(s), Some(n), Some(v)) => (s as usize, n as usize, v as usize),
            _ => {
                self.corruption("bad entry in block");
                return false;
            }
        };
        if shared > self.key.len() || input.len() < non_shared + value_len {
            self.corruption("bad entry in block");
            return false;
        }

        let delta_offset = self.block.restart_offset - input.len();
        self.key.truncate(shared);
        self.key
            .extend_from_slice(&self.block.data[delta_offset..delta_offset + non_shared]);
        self.value_offset = delta_offset + non_shared;
        self.value_len = value_len;

        while self.restart_index + 1 < self.block.num_restarts
            && self.block.restart_point(self.restart_index + 1) < self.current
        {
            self.restart_index += 1;
        }
        true
    }

    /// Full key stored at restart point `index` (restart entries have
    /// `shared == 0`). Returns `None` on malformed bytes.
    fn restart_key(&self, index: u32) -> Option<&[u8]> {
        let offset = self.block.restart_point(index);
        let mut input = &self.block.data[offset..self.block.restart_offset];
        let shared = codec::get_varint32(&mut input)?;
        let non_shared = codec::get_varint32(&mut input)? as usize;
        let _value_len = codec::get_varint32(&mut input)?;
        if shared != 0 || input.len() < non_shared {
            return None;
        }
        Some(&input[..non_shared])
    }
}

impl StorageIterator for BlockIter {
    fn valid(&self) -> bool {
        self.current < self.block.restart_offset
    }

    fn seek_to_first(&mut self) {
        if self.block.num_restarts == 0 {
            self.mark_invalid();
            return;
        }
        self.seek_to_restart_point(0);
        self.parse_next_key();
    }

    fn seek_to_last(&mut self) {
        if self.block.num_restarts == 0 {
            self.mark_invalid();
            return;
        }
        self.seek_to_restart_point(self.block.num_restarts - 1);
        while self.parse_next_key() && self.next_entry_offset() < self.block.restart_offset {
            // Walk to the final entry of the final restart region.
        }
    }

    fn seek(&mut self, target: &[u8]) {
        if self.block.num_restarts == 0 {
            self.mark_invalid();
            return;
        }
        // Binary search the restart array for the last restart whose key is
        // strictly less than the target, then scan linearly from there.
        let mut left = 0u32;
        let mut right = self.block.num_restarts - 1;
        while left < right {
            let mid = (left + right + 1) / 2;
            let mid_key = match self.restart_key(mid) {
                Some(key) => key,
                None => {
                    self.corruption("bad restart entry in block");
                    return;
                }
            };
            if self.cmp.compare(mid_key, target) == Ordering::Less {
                left = mid;
            } else {
                right = mid - 1;
            }
        }

        self.seek_to_restart_point(left);
        loop {
            if !self.parse_next_key() {
                return;
            }
            if self.cmp.compare(&self.key, target) != Ordering::Less {
                return;
            }
        }
    }

    fn next(&mut self) {
        assert!(self.valid());
        self.parse_next_key();
    }

    fn prev(&mut self) {
        assert!(self.valid());

        // Find the restart point strictly before the current entry.
        let original = self.current;
        while self.block.restart_point(self.restart_index) >= original {
            if self.restart_index == 0 {
                // Already at the first entry.
                self.mark_invalid();
                return;
            }
            self.restart_index -= 1;
        }

        // Re-scan forward until the entry just before the original one.
        self.seek_to_restart_point(self.restart_index);
        while self.parse_next_key() && self.next_entry_offset() < original {}
    }

    fn key(&self) -> &[u8] {
        assert!(self.valid());
        &self.key
    }

    fn value(&self) -> &[u8] {
        assert!(self.valid());
        &self.block.data[self.value_offset..self.value_offset + self.value_len]
    }

    fn status(&self) -> Result<()> {
        self.status.clone()
    }
}
