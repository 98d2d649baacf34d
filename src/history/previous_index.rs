//! PreviousIndex - descending index of off-loaded history documents
//!
//! Built lazily from a document's `_prev` map minus its `_stalePrev`
//! entries: a stale marker whose value equals a range's height hides that
//! range until garbage collection removes both. Iteration is descending by
//! high revision, like every other revision-keyed view.

use crate::document::errors::DocumentResult;
use crate::document::{keys, NodeDocument};
use crate::revision::{Revision, RevisionMap};

use super::range::Range;

/// The effective set of previous-document ranges of one document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreviousIndex {
    ranges: RevisionMap<Range>,
}

impl PreviousIndex {
    /// Builds the index for `doc`: `_prev` minus `_stalePrev`.
    pub fn from_document(doc: &NodeDocument) -> DocumentResult<Self> {
        let prev = doc.local_map(keys::PREVIOUS);
        if prev.is_empty() {
            return Ok(Self::default());
        }
        let stale = doc.local_map(keys::STALE_PREV);
        let mut ranges = RevisionMap::new();
        for (high, value) in prev.iter() {
            let range = Range::parse(*high, value)?;
            let is_stale = stale
                .get(high)
                .is_some_and(|h| h == &range.height().to_string());
            if !is_stale {
                ranges.insert(*high, range);
            }
        }
        Ok(Self { ranges })
    }

    /// The range with the largest high at or below `revision`, if any.
    pub fn floor_entry(&self, revision: &Revision) -> Option<&Range> {
        self.ranges.floor(revision).map(|(_, range)| range)
    }

    /// Ranges whose high is strictly newer than `revision`, descending.
    pub fn head(&self, revision: &Revision) -> impl Iterator<Item = &Range> {
        self.ranges.head(revision).map(|(_, range)| range)
    }

    /// All ranges, descending by high.
    pub fn values(&self) -> impl Iterator<Item = &Range> {
        self.ranges.values()
    }

    /// Number of ranges.
    #[inline]
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    /// True iff no previous documents are reachable.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}
