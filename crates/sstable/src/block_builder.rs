use std::cmp::Ordering;
use std::sync::Arc;

use base::{Comparator, Options};

/// Serializes sorted key/value pairs into one prefix-compressed block.
///
/// Each key stores only the bytes it does not share with its predecessor.
/// Every `block_restart_interval` entries the shared prefix resets to zero
/// and the entry's offset joins the restart array at the end of the block,
/// giving readers binary-searchable full keys.
///
/// Keys must be added in strictly increasing order under the configured
/// comparator — violating that is a programmer error and asserts.
pub struct BlockBuilder {
    cmp: Arc<dyn Comparator>,
    restart_interval: usize,
    buffer: Vec<u8>,
    /// Offsets of entries written with `shared == 0`.
    restarts: Vec<u32>,
    /// Entries since the last restart point.
    counter: usize,
    finished: bool,
    last_key: Vec<u8>,
}

impl BlockBuilder {
    pub fn new(options: &Options) -> BlockBuilder {
        assert!(options.block_restart_interval >= 1);
        BlockBuilder {
            cmp: Arc::clone(&options.comparator),
            restart_interval: options.block_restart_interval,
            buffer: Vec::new(),
            restarts: vec![0],
            counter: 0,
            finished: false,
            last_key: Vec::new(),
        }
    }

    /// Makes the builder reusable for a fresh block.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.restarts.clear();
        self.restarts.push(0);
        self.counter = 0;
        self.finished = false;
        self.last_key.clear();
    }

    /// Appends one entry. `key` must sort strictly after every key added
    /// since the last `reset`.
    pub fn add(&mut self, key: &[u8], value: &[u8]) {
        assert!(!self.finished);
        assert!(self.counter <= self.restart_interval);
        assert!(
            self.buffer.is_empty() || self.cmp.compare(key, &self.last_key) == Ordering::Greater
        );

        if self.counter == self.restart_interval {
            // Restart compression from this entry.
            self.last_key.clear();
            self.counter = 0;
            self.restarts.push(self.buffer.len() as u32);
        }

        let shared = self
            .last_key
            .iter()
            .zip(key.iter())
            .take_while(|(a, b)| a == b)
            .count();
        let non_shared = key.len() - shared;

        codec::put_varint32(&mut self.buffer, shared as u32);
        codec::put_varint32(&mut self.buffer, non_shared as u32);
        codec::put_varint32(&mut self.buffer, value.len() as u32);
        self.buffer.extend_from_slice(&key[shared..]);
        self.buffer.extend_from_slice(value);

        self.last_key.truncate(shared);
        self.last_key.extend_from_slice(&key[shared..]);
        debug_assert_eq!(self.last_key, key);
        self.counter += 1;
    }

    /// Appends the restart trailer and returns the finished block bytes.
    pub fn finish(&mut self) -> &[u8] {
        for &restart in &self.restarts {
            codec::put_fixed32(&mut self.buffer, restart);
        }
        codec::put_fixed32(&mut self.buffer, self.restarts.len() as u32);
        self.finished = true;
        &self.buffer
    }

    /// Size of the block if finished now.
    #[must_use]
    pub fn current_size_estimate(&self) -> usize {
        self.buffer.len() + self.restarts.len() * 4 + 4
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}
