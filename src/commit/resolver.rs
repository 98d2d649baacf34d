//! Commit-value resolution
//!
//! The commit value of a revision lives in the `_revisions` map of the
//! document it was recorded on, which after splitting may be a previous
//! document. Resolution checks the local map first and only then follows
//! the ranges that include the revision. Branch flags never reach storage;
//! lookups use the trunk form.

use crate::document::{keys, NodeDocument};
use crate::history::ValueMap;
use crate::observability::Logger;
use crate::revision::Revision;
use crate::store::DocumentStore;

use super::commit_value::CommitValue;

/// True iff a raw commit-value string denotes a committed revision.
#[inline]
pub fn is_committed_str(value: &str) -> bool {
    value.starts_with('c')
}

/// Resolves the commit value of `revision` on `doc`, following previous
/// documents through the store. Returns `None` when the revision is
/// unknown, which callers treat as uncommitted.
pub fn commit_value_in(
    store: &dyn DocumentStore,
    doc: &NodeDocument,
    revision: &Revision,
) -> Option<CommitValue> {
    let lookup = revision.as_trunk();
    let raw = match doc.local_revisions().get(&lookup) {
        Some(raw) => Some(raw.clone()),
        None => ValueMap::new(store, doc, keys::REVISIONS)
            .get(&lookup)
            .unwrap_or_default(),
    };
    let raw = raw?;
    match raw.parse() {
        Ok(commit_value) => Some(commit_value),
        Err(_) => {
            Logger::warn(
                "unparseable_commit_value",
                &[
                    ("id", doc.doc_id().unwrap_or("?")),
                    ("revision", &lookup.to_string()),
                    ("value", &raw),
                ],
            );
            None
        }
    }
}
