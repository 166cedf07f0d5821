use std::sync::Arc;

use base::{BytewiseComparator, Error, Result, StorageIterator};

use crate::merge::new_merging_iterator;

// -------------------- A scriptable child iterator --------------------

/// In-memory sorted source with an optional injected error status.
struct VecIter {
    entries: Vec<(Vec<u8>, Vec<u8>)>,
    pos: Option<usize>,
    error: Option<Error>,
}

impl VecIter {
    fn new(entries: &[(&[u8], &[u8])]) -> Box<dyn StorageIterator> {
        Box::new(VecIter {
            entries: entries
                .iter()
                .map(|(k, v)| (k.to_vec(), v.to_vec()))
                .collect(),
            pos: None,
            error: None,
        })
    }

    fn failing(entries: &[(&[u8], &[u8])], error: Error) -> Box<dyn StorageIterator> {
        Box::new(VecIter {
            entries: entries
                .iter()
                .map(|(k, v)| (k.to_vec(), v.to_vec()))
                .collect(),
            pos: None,
            error: Some(error),
        })
    }
}

impl StorageIterator for VecIter {
    fn valid(&self) -> bool {
        self.pos.is_some()
    }

    fn seek_to_first(&mut self) {
        self.pos = if self.entries.is_empty() { None } else { Some(0) };
    }

    fn seek_to_last(&mut self) {
        self.pos = self.entries.len().checked_sub(1);
    }

    fn seek(&mut self, target: &[u8]) {
        self.pos = self
            .entries
            .iter()
            .position(|(k, _)| k.as_slice() >= target);
    }

    fn next(&mut self) {
        let pos = self.pos.expect("iterator is valid");
        self.pos = if pos + 1 < self.entries.len() {
            Some(pos + 1)
        } else {
            None
        };
    }

    fn prev(&mut self) {
        let pos = self.pos.expect("iterator is valid");
        self.pos = pos.checked_sub(1);
    }

    fn key(&self) -> &[u8] {
        &self.entries[self.pos.expect("iterator is valid")].0
    }

    fn value(&self) -> &[u8] {
        &self.entries[self.pos.expect("iterator is valid")].1
    }

    fn status(&self) -> Result<()> {
        match &self.error {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }
}

fn merged(children: Vec<Box<dyn StorageIterator>>) -> Box<dyn StorageIterator> {
    new_merging_iterator(Arc::new(BytewiseComparator), children)
}

fn forward_pairs(iter: &mut dyn StorageIterator) -> Vec<(Vec<u8>, Vec<u8>)> {
    let mut out = Vec::new();
    iter.seek_to_first();
    while iter.valid() {
        out.push((iter.key().to_vec(), iter.value().to_vec()));
        iter.next();
    }
    out
}

// -------------------- Union and ordering --------------------

#[test]
fn forward_traversal_is_the_sorted_union() {
    let a = VecIter::new(&[(b"a", b"A:a"), (b"c", b"A:c"), (b"e", b"A:e")]);
    let b = VecIter::new(&[(b"b", b"B:b"), (b"c", b"B:c"), (b"d", b"B:d")]);
    let mut iter = merged(vec![a, b]);

    // Equal keys surface lowest-child-first: A's "c" before B's "c".
    assert_eq!(
        forward_pairs(iter.as_mut()),
        vec![
            (b"a".to_vec(), b"A:a".to_vec()),
            (b"b".to_vec(), b"B:b".to_vec()),
            (b"c".to_vec(), b"A:c".to_vec()),
            (b"c".to_vec(), b"B:c".to_vec()),
            (b"d".to_vec(), b"B:d".to_vec()),
            (b"e".to_vec(), b"A:e".to_vec()),
        ]
    );
}

#[test]
fn empty_children_do_not_disturb_the_merge() {
    let a = VecIter::new(&[]);
    let b = VecIter::new(&[(b"k", b"v")]);
    let c = VecIter::new(&[]);
    let mut iter = merged(vec![a, b, c]);
    assert_eq!(forward_pairs(iter.as_mut()), vec![(b"k".to_vec(), b"v".to_vec())]);

    let mut iter = merged(vec![VecIter::new(&[])]);
    iter.seek_to_first();
    assert!(!iter.valid());
}

#[test]
fn seek_then_forward_yields_keys_at_or_after_target() {
    let a = VecIter::new(&[(b"1", b"A:1"), (b"3", b"A:3"), (b"5", b"A:5")]);
    let b = VecIter::new(&[(b"2", b"B:2"), (b"3", b"B:3"), (b"4", b"B:4")]);
    let mut iter = merged(vec![a, b]);

    iter.seek(b"3");
    let mut seen = Vec::new();
    while iter.valid() {
        seen.push((iter.key().to_vec(), iter.value().to_vec()));
        iter.next();
    }
    assert_eq!(
        seen,
        vec![
            (b"3".to_vec(), b"A:3".to_vec()),
            (b"3".to_vec(), b"B:3".to_vec()),
            (b"4".to_vec(), b"B:4".to_vec()),
            (b"5".to_vec(), b"A:5".to_vec()),
        ]
    );
}

#[test]
fn reverse_traversal_is_the_reverse_key_order() {
    let a = VecIter::new(&[(b"a", b"A:a"), (b"c", b"A:c"), (b"e", b"A:e")]);
    let b = VecIter::new(&[(b"b", b"B:b"), (b"c", b"B:c"), (b"d", b"B:d")]);
    let mut iter = merged(vec![a, b]);

    iter.seek_to_last();
    let mut seen = Vec::new();
    while iter.valid() {
        seen.push(iter.key().to_vec());
        iter.prev();
    }
    assert_eq!(
        seen,
        vec![
            b"e".to_vec(),
            b"d".to_vec(),
            b"c".to_vec(),
            b"c".to_vec(),
            b"b".to_vec(),
            b"a".to_vec(),
        ]
    );
}

// -------------------- Direction reversal --------------------

#[test]
fn direction_flip_repositions_the_other_children() {
    // A=[1,3,5], B=[2,3,4]: four nexts yield 1,2,3,3,4; two prevs then
    // yield 3,3, each from a different child.
    let a = VecIter::new(&[(b"1", b"A:1"), (b"3", b"A:3"), (b"5", b"A:5")]);
    let b = VecIter::new(&[(b"2", b"B:2"), (b"3", b"B:3"), (b"4", b"B:4")]);
    let mut iter = merged(vec![a, b]);

    iter.seek_to_first();
    let mut seen = vec![iter.key().to_vec()];
    for _ in 0..4 {
        iter.next();
        seen.push(iter.key().to_vec());
    }
    assert_eq!(
        seen,
        vec![b"1".to_vec(), b"2".to_vec(), b"3".to_vec(), b"3".to_vec(), b"4".to_vec()]
    );
    assert_eq!(iter.value(), b"B:4");

    iter.prev();
    assert_eq!(iter.key(), b"3");
    assert_eq!(iter.value(), b"A:3");
    iter.prev();
    assert_eq!(iter.key(), b"3");
    assert_eq!(iter.value(), b"B:3");
}

#[test]
fn next_then_prev_returns_to_the_same_position() {
    let a = VecIter::new(&[(b"a", b"A:a"), (b"c", b"A:c"), (b"e", b"A:e")]);
    let b = VecIter::new(&[(b"b", b"B:b"), (b"d", b"B:d")]);
    let mut iter = merged(vec![a, b]);

    iter.seek_to_first();
    while iter.valid() {
        let here = (iter.key().to_vec(), iter.value().to_vec());
        iter.next();
        if !iter.valid() {
            break;
        }
        let after = (iter.key().to_vec(), iter.value().to_vec());
        iter.prev();
        assert!(iter.valid());
        assert_eq!((iter.key().to_vec(), iter.value().to_vec()), here);
        iter.next();
        assert_eq!((iter.key().to_vec(), iter.value().to_vec()), after);
        iter.next();
    }
}

#[test]
fn prev_from_forward_with_exhausted_child() {
    // Reaching the last key exhausts B; prev must re-seat B via
    // seek_to_last.
    let a = VecIter::new(&[(b"a", b"A:a"), (b"z", b"A:z")]);
    let b = VecIter::new(&[(b"m", b"B:m")]);
    let mut iter = merged(vec![a, b]);

    iter.seek_to_first();
    iter.next();
    iter.next();
    assert_eq!(iter.key(), b"z");
    iter.prev();
    assert_eq!(iter.key(), b"m");
    iter.prev();
    assert_eq!(iter.key(), b"a");
    iter.prev();
    assert!(!iter.valid());
}

// -------------------- Factory and status --------------------

#[test]
fn factory_collapses_trivial_cases() {
    let mut empty = merged(vec![]);
    empty.seek_to_first();
    assert!(!empty.valid());
    assert!(empty.status().is_ok());

    let only = VecIter::new(&[(b"k", b"v")]);
    let mut sole = merged(vec![only]);
    assert_eq!(forward_pairs(sole.as_mut()), vec![(b"k".to_vec(), b"v".to_vec())]);
}

#[test]
fn status_reports_the_first_child_error() {
    let a = VecIter::new(&[(b"a", b"1")]);
    let b = VecIter::failing(&[(b"b", b"2")], Error::corruption("child failed"));
    let mut iter = merged(vec![a, b]);
    iter.seek_to_first();
    assert!(iter.status().unwrap_err().is_corruption());
}
