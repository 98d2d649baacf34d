//! Collision markers
//!
//! When a commit attempt observes a concurrent revision it cannot merge
//! with, the loser is marked in the `_collisions` map of the commit-root
//! document. Sweep and recovery use the markers to tell abandoned changes
//! from in-flight ones.

use crate::document::errors::{DocumentError, DocumentResult};
use crate::document::{keys, NodeDocument, UpdateOp};
use crate::revision::Revision;
use crate::store::DocumentStore;

/// One observed collision, ready to be marked on the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collision {
    doc_id: String,
    conflicting: Revision,
    our: Revision,
}

impl Collision {
    /// Creates a collision of `our` change with the `conflicting` revision
    /// observed on `doc`.
    pub fn new(doc: &NodeDocument, conflicting: Revision, our: Revision) -> DocumentResult<Self> {
        let doc_id = doc
            .doc_id()
            .ok_or_else(|| DocumentError::malformed("document without _id"))?
            .to_string();
        Ok(Self {
            doc_id,
            conflicting,
            our,
        })
    }

    /// The revision that collided with ours.
    #[inline]
    pub fn conflicting(&self) -> &Revision {
        &self.conflicting
    }

    /// Our change revision.
    #[inline]
    pub fn our(&self) -> &Revision {
        &self.our
    }

    /// Persists the marker. Returns false when the document disappeared
    /// underneath us.
    pub fn mark(&self, store: &dyn DocumentStore) -> DocumentResult<bool> {
        let mut op = UpdateOp::new(&self.doc_id, false);
        op.set_map_entry(keys::COLLISIONS, self.conflicting, "true");
        Ok(store.find_and_update(&op)?.is_some())
    }
}
