use crate::error::{Error, Result};

/// The central iteration capability of the storage core.
///
/// Every sorted source — the memtable, a data block, a whole table, the
/// N-way merged view — implements this trait, which is what makes them
/// composable.
///
/// Navigation calls do not return errors; a source that fails mid-iteration
/// becomes invalid and reports the failure through [`status`]. `key` and
/// `value` may only be called while [`valid`] returns true.
///
/// [`status`]: StorageIterator::status
/// [`valid`]: StorageIterator::valid
pub trait StorageIterator {
    /// True when positioned at an entry.
    fn valid(&self) -> bool;

    /// Positions at the first entry in the source, if any.
    fn seek_to_first(&mut self);

    /// Positions at the last entry in the source, if any.
    fn seek_to_last(&mut self);

    /// Positions at the first entry with key ≥ `target`.
    fn seek(&mut self, target: &[u8]);

    /// Advances to the next entry. Requires `valid()`.
    fn next(&mut self);

    /// Moves back to the previous entry. Requires `valid()`.
    fn prev(&mut self);

    /// The key at the current position. Requires `valid()`.
    fn key(&self) -> &[u8];

    /// The value at the current position. Requires `valid()`.
    fn value(&self) -> &[u8];

    /// `Ok` if no error has occurred, otherwise the first error observed.
    fn status(&self) -> Result<()>;
}

/// An iterator over nothing, optionally carrying a sticky error.
struct EmptyIterator {
    status: Result<()>,
}

impl StorageIterator for EmptyIterator {
    fn valid(&self) -> bool {
        false
    }

    fn seek_to_first(&mut self) {}

    fn seek_to_last(&mut self) {}

    fn seek(&mut self, _target: &[u8]) {}

    fn next(&mut self) {
        panic!("next on an empty iterator");
    }

    fn prev(&mut self) {
        panic!("prev on an empty iterator");
    }

    fn key(&self) -> &[u8] {
        panic!("key on an empty iterator");
    }

    fn value(&self) -> &[u8] {
        panic!("value on an empty iterator");
    }

    fn status(&self) -> Result<()> {
        self.status.clone()
    }
}

/// An iterator over an empty source.
pub fn new_empty_iterator() -> Box<dyn StorageIterator> {
    Box::new(EmptyIterator { status: Ok(()) })
}

/// An invalid iterator whose `status()` reports `error`. Used where an
/// iterator must be returned but the source could not be opened.
pub fn new_error_iterator(error: Error) -> Box<dyn StorageIterator> {
    Box::new(EmptyIterator { status: Err(error) })
}
