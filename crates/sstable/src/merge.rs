use std::cmp::Ordering;
use std::sync::Arc;

use base::{new_empty_iterator, Comparator, Result, StorageIterator};

/// Which way the merged cursor last moved. Reversing requires repositioning
/// every non-current child before stepping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Forward,
    Reverse,
}

/// N-way bidirectional merge over ordered child iterators.
///
/// At any valid position, `current` names the child whose key wins under the
/// comparator; equal keys resolve to the lowest child index, which is what
/// keeps multiple versions of one user key in newest-source-first order.
///
/// The subtle part is direction reversal. Moving forward, every non-current
/// child already sits at the first key greater than `key()`. After moving
/// backward they sit at keys ≤ `key()` instead, so `next` must first re-seek
/// every other child past the current key (and symmetrically for `prev`).
/// That re-seek is a correctness requirement, not an optimization.
struct MergingIterator {
    cmp: Arc<dyn Comparator>,
    children: Vec<Box<dyn StorageIterator>>,
    current: Option<usize>,
    direction: Direction,
}

impl MergingIterator {
    fn find_smallest(&mut self) {
        let mut smallest: Option<usize> = None;
        for (i, child) in self.children.iter().enumerate() {
            if !child.valid() {
                continue;
            }
            match smallest {
                None => smallest = Some(i),
                Some(s) => {
                    if self.cmp.compare(child.key(), self.children[s].key()) == Ordering::Less {
                        smallest = Some(i);
                    }
                }
            }
        }
        self.current = smallest;
    }

    fn find_largest(&mut self) {
        let mut largest: Option<usize> = None;
        for (i, child) in self.children.iter().enumerate() {
            if !child.valid() {
                continue;
            }
            match largest {
                None => largest = Some(i),
                Some(l) => {
                    if self.cmp.compare(child.key(), self.children[l].key()) == Ordering::Greater {
                        largest = Some(i);
                    }
                }
            }
        }
        self.current = largest;
    }
}

impl StorageIterator for MergingIterator {
    fn valid(&self) -> bool {
        self.current.is_some()
    }

    fn seek_to_first(&mut self) {
        for child in &mut self.children {
            child.seek_to_first();
        }
        self.find_smallest();
        self.direction = Direction::Forward;
    }

    fn seek_to_last(&mut self) {
        for child in &mut self.children {
            child.seek_to_last();
        }
        self.find_largest();
        self.direction = Direction::Reverse;
    }

    fn seek(&mut self, target: &[u8]) {
        for child in &mut self.children {
            child.seek(target);
        }
        self.find_smallest();
        self.direction = Direction::Forward;
    }

    fn next(&mut self) {
        assert!(self.valid());
        let current = self.current.expect("iterator is valid");

        if self.direction != Direction::Forward {
            // Coming out of reverse traversal the other children sit at keys
            // ≤ key(); position them strictly after it.
            let key = self.key().to_vec();
            for (i, child) in self.children.iter_mut().enumerate() {
                if i == current {
                    continue;
                }
                child.seek(&key);
                if child.valid() && self.cmp.compare(child.key(), &key) == Ordering::Equal {
                    child.next();
                }
            }
            self.direction = Direction::Forward;
        }

        self.children[current].next();
        self.find_smallest();
    }

    fn prev(&mut self) {
        assert!(self.valid());
        let current = self.current.expect("iterator is valid");

        if self.direction != Direction::Reverse {
            // Coming out of forward traversal the other children sit at keys
            // > key(); position them strictly before it.
            let key = self.key().to_vec();
            for (i, child) in self.children.iter_mut().enumerate() {
                if i == current {
                    continue;
                }
                child.seek(&key);
                if child.valid() {
                    // First entry ≥ key(): step back once.
                    child.prev();
                } else {
                    // Every key in this child is < key().
                    child.seek_to_last();
                }
            }
            self.direction = Direction::Reverse;
        }

        self.children[current].prev();
        self.find_largest();
    }

    fn key(&self) -> &[u8] {
        let current = self.current.expect("iterator is valid");
        self.children[current].key()
    }

    fn value(&self) -> &[u8] {
        let current = self.current.expect("iterator is valid");
        self.children[current].value()
    }

    fn status(&self) -> Result<()> {
        for child in &self.children {
            child.status()?;
        }
        Ok(())
    }
}

/// Merges `children` into one ordered view under `cmp`.
///
/// Zero children yield the empty iterator and a single child is returned
/// as-is; the merging machinery only exists for two or more.
pub fn new_merging_iterator(
    cmp: Arc<dyn Comparator>,
    mut children: Vec<Box<dyn StorageIterator>>,
) -> Box<dyn StorageIterator> {
    match children.len() {
        0 => new_empty_iterator(),
        1 => children.pop().expect("one child"),
        _ => Box::new(MergingIterator {
            cmp,
            children,
            current: None,
            direction: Direction::Forward,
        }),
    }
}
