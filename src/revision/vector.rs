//! RevisionVector - per-writer snapshot of revisions
//!
//! A revision vector holds at most one revision per writer id, sorted by
//! writer id. Vectors are value types with an immutable-style API: updates
//! return a new vector. A vector doubles as a read-point; a branch
//! read-point carries exactly one branch-flagged element.

use std::fmt;
use std::str::FromStr;

use super::{MalformedRevision, Revision};

/// A set of revisions with at most one entry per writer id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct RevisionVector {
    // Sorted by writer id, unique per writer.
    revisions: Vec<Revision>,
}

impl RevisionVector {
    /// Creates an empty vector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a vector from the given revisions.
    ///
    /// When several revisions share a writer id, the newest one wins.
    pub fn from_revisions<I: IntoIterator<Item = Revision>>(revisions: I) -> Self {
        let mut vector = Self::new();
        for r in revisions {
            vector = vector.update(r);
        }
        vector
    }

    /// The entry for `writer_id`, if present.
    pub fn get(&self, writer_id: u32) -> Option<&Revision> {
        self.revisions
            .binary_search_by_key(&writer_id, |r| r.writer_id())
            .ok()
            .map(|idx| &self.revisions[idx])
    }

    /// Returns a vector where the entry for `revision.writer_id()` is
    /// replaced iff `revision` is newer than the current entry (or absent).
    pub fn update(&self, revision: Revision) -> Self {
        let mut revisions = self.revisions.clone();
        match revisions.binary_search_by_key(&revision.writer_id(), |r| r.writer_id()) {
            Ok(idx) => {
                if revision.is_newer_than(&revisions[idx])
                    || revision.stable_cmp(&revisions[idx]).is_eq()
                {
                    revisions[idx] = revision;
                }
            }
            Err(idx) => revisions.insert(idx, revision),
        }
        Self { revisions }
    }

    /// Returns a vector without the entry for `writer_id`.
    pub fn remove(&self, writer_id: u32) -> Self {
        let mut revisions = self.revisions.clone();
        if let Ok(idx) = revisions.binary_search_by_key(&writer_id, |r| r.writer_id()) {
            revisions.remove(idx);
        }
        Self { revisions }
    }

    /// True iff `revision` is newer (stable order) than this vector's entry
    /// for the same writer. A missing entry means the revision is newer.
    pub fn is_revision_newer(&self, revision: &Revision) -> bool {
        match self.get(revision.writer_id()) {
            Some(entry) => revision.is_newer_than(entry),
            None => true,
        }
    }

    /// True iff any element carries the branch flag.
    pub fn is_branch(&self) -> bool {
        self.revisions.iter().any(|r| r.is_branch())
    }

    /// The branch-flagged element, if any. A well-formed branch vector has
    /// exactly one.
    pub fn branch_revision(&self) -> Option<&Revision> {
        self.revisions.iter().find(|r| r.is_branch())
    }

    /// The vector with all branch-flagged elements removed. For a trunk
    /// vector this is a plain copy.
    pub fn base(&self) -> Self {
        Self {
            revisions: self
                .revisions
                .iter()
                .filter(|r| !r.is_branch())
                .copied()
                .collect(),
        }
    }

    /// The stable-order minimum among the entries, if any.
    pub fn min_revision(&self) -> Option<&Revision> {
        self.revisions.iter().min_by(|a, b| a.stable_cmp(b))
    }

    /// Iterates entries in writer-id order.
    pub fn iter(&self) -> impl Iterator<Item = &Revision> {
        self.revisions.iter()
    }

    /// Number of entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.revisions.len()
    }

    /// True iff the vector has no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.revisions.is_empty()
    }
}

impl fmt::Display for RevisionVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, r) in self.revisions.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", r)?;
        }
        Ok(())
    }
}

impl FromStr for RevisionVector {
    type Err = MalformedRevision;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(Self::new());
        }
        let mut vector = Self::new();
        for part in s.split(',') {
            vector = vector.update(part.parse()?);
        }
        Ok(vector)
    }
}

impl FromIterator<Revision> for RevisionVector {
    fn from_iter<T: IntoIterator<Item = Revision>>(iter: T) -> Self {
        Self::from_revisions(iter)
    }
}
