//! Shared caches
//!
//! Two caches cross requests:
//! - the valid-revisions cache is caller-scoped: a map from revision to the
//!   commit value already proven valid against the current read-point
//! - the prev-no-property cache is process-wide: it remembers that a
//!   previous-document subtree holds no revisions for a property, so later
//!   reads skip loading it
//!
//! Both caches are purely an optimisation and safe to evict at any time.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::commit::CommitValue;
use crate::revision::Revision;

/// Caller-scoped cache of revisions already proven valid for the current
/// read-point.
pub type ValidRevisionsCache = HashMap<Revision, CommitValue>;

/// Process-wide cache of `property@previous-doc-id` keys known to hold no
/// revisions for that property.
///
/// Entries are written only after a negative scan that ran to completion;
/// an aborted or failed scan must not poison the cache.
#[derive(Debug, Default)]
pub struct PrevNoPropCache {
    inner: RwLock<HashMap<String, ()>>,
}

impl PrevNoPropCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    fn key(property: &str, doc_id: &str) -> String {
        format!("{}@{}", property, doc_id)
    }

    /// True iff the subtree rooted at `doc_id` is known to hold no
    /// revisions for `property`.
    pub fn knows_empty(&self, property: &str, doc_id: &str) -> bool {
        self.inner.read().contains_key(&Self::key(property, doc_id))
    }

    /// Records a completed negative scan.
    pub fn mark_empty(&self, property: &str, doc_id: &str) {
        self.inner.write().insert(Self::key(property, doc_id), ());
    }

    /// Number of cached negatives.
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// True iff nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Drops every cached entry.
    pub fn clear(&self) {
        self.inner.write().clear();
    }
}
