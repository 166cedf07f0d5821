use std::cmp::Ordering;
use std::sync::Arc;

use crate::key::extract_user_key;

/// A total order over byte-string keys.
///
/// Implementations must be consistent: `compare(a, b) == Equal` iff the keys
/// are interchangeable everywhere the comparator is used. `name()` identifies
/// the order for compatibility checks — a database written under one
/// comparator must never be reopened under a differently-named one.
pub trait Comparator: Send + Sync {
    fn compare(&self, a: &[u8], b: &[u8]) -> Ordering;

    fn name(&self) -> &'static str;
}

/// The default comparator: lexicographic over unsigned bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct BytewiseComparator;

impl Comparator for BytewiseComparator {
    fn compare(&self, a: &[u8], b: &[u8]) -> Ordering {
        a.cmp(b)
    }

    fn name(&self) -> &'static str {
        "ebbkv.BytewiseComparator"
    }
}

/// Orders internal keys (`user_key || tag`): ascending by user key, then
/// descending by sequence, then descending by type.
///
/// Descending tag order means that for a single user key the newest entry
/// sorts first, so a lookup seeking to `(key, snapshot)` lands on the newest
/// entry visible at that snapshot.
#[derive(Clone)]
pub struct InternalKeyComparator {
    user: Arc<dyn Comparator>,
}

impl InternalKeyComparator {
    pub fn new(user: Arc<dyn Comparator>) -> Self {
        InternalKeyComparator { user }
    }

    #[must_use]
    pub fn user_comparator(&self) -> &dyn Comparator {
        self.user.as_ref()
    }
}

impl Comparator for InternalKeyComparator {
    fn compare(&self, a: &[u8], b: &[u8]) -> Ordering {
        let by_user = self
            .user
            .compare(extract_user_key(a), extract_user_key(b));
        if by_user != Ordering::Equal {
            return by_user;
        }
        // Larger tag (newer sequence, then Value over Deletion) sorts first.
        let atag = codec::decode_fixed64(&a[a.len() - 8..]);
        let btag = codec::decode_fixed64(&b[b.len() - 8..]);
        btag.cmp(&atag)
    }

    fn name(&self) -> &'static str {
        "ebbkv.InternalKeyComparator"
    }
}

impl std::fmt::Debug for InternalKeyComparator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InternalKeyComparator")
            .field("user", &self.user.name())
            .finish()
    }
}
