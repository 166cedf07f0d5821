use std::sync::Arc;

use crate::comparator::{BytewiseComparator, Comparator};

/// Tuning knobs recognized by the storage core.
#[derive(Clone)]
pub struct Options {
    /// Total order over user keys. Defaults to lexicographic unsigned bytes.
    pub comparator: Arc<dyn Comparator>,

    /// Advisory uncompressed size at which a data block is cut. Blocks may
    /// exceed this by one entry.
    pub block_size: usize,

    /// Number of entries between prefix-compression restart points. Must be
    /// at least 1.
    pub block_restart_interval: usize,

    /// Whether opening a missing database creates it. Consumed by the
    /// database layer; carried here so the whole configuration travels as
    /// one value.
    pub create_if_missing: bool,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            comparator: Arc::new(BytewiseComparator),
            block_size: 4 * 1024,
            block_restart_interval: 16,
            create_if_missing: false,
        }
    }
}

impl std::fmt::Debug for Options {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Options")
            .field("comparator", &self.comparator.name())
            .field("block_size", &self.block_size)
            .field("block_restart_interval", &self.block_restart_interval)
            .field("create_if_missing", &self.create_if_missing)
            .finish()
    }
}

/// Per-read settings.
#[derive(Debug, Clone, Default)]
pub struct ReadOptions {
    /// Verify block checksums on every data read. Index and footer reads are
    /// always verified.
    pub verify_checksums: bool,
}
