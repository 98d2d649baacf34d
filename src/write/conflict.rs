//! ConflictDetector - pre-commit check against concurrent writers
//!
//! Before a change commits, the update is checked against everything that
//! happened after its base read:
//! 1. any `_deleted` entry newer than the base conflicts (node existence
//!    changed underneath the writer)
//! 2. an update that itself changes `_deleted` conflicts with any other
//!    concurrent change
//! 3. a property touched by the update conflicts with any newer revision
//!    in that property's full history
//!
//! The one exception is the concurrent add/remove rule: on hidden paths,
//! pure node adds and pure node deletes may race each other as long as
//! neither side touches user-visible properties.

use std::collections::BTreeSet;

use thiserror::Error;

use crate::document::errors::DocumentResult;
use crate::document::{id, keys, NodeDocument, Operation, UpdateOp};
use crate::history::ValueMap;
use crate::revision::{Revision, RevisionVector};
use crate::store::DocumentStore;

/// A concurrent change that the update being committed cannot merge with.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("change {commit} conflicts with concurrent revision {conflicting} on '{key}'")]
pub struct ConflictDetected {
    /// The concurrent revision that caused the conflict.
    pub conflicting: Revision,
    /// The revision of the change being committed.
    pub commit: Revision,
    /// The document key the conflict was found on.
    pub key: String,
}

impl ConflictDetected {
    fn new(conflicting: Revision, commit: Revision, key: &str) -> Self {
        Self {
            conflicting,
            commit,
            key: key.to_string(),
        }
    }
}

/// Checks `op` with base read `base` and commit revision `commit` against
/// the concurrent history on `doc`.
pub fn check_conflicts(
    store: &dyn DocumentStore,
    doc: &NodeDocument,
    op: &UpdateOp,
    base: &RevisionVector,
    commit: &Revision,
) -> DocumentResult<()> {
    let allow_add_remove = allows_concurrent_add_remove(doc, op)?;

    // existence changes after the base read
    for r in doc.local_deleted().keys() {
        if r != commit && base.is_revision_newer(r) {
            if allow_add_remove {
                continue;
            }
            return Err(ConflictDetected::new(*r, *commit, keys::DELETED).into());
        }
    }

    // an existence change of our own conflicts with any concurrent change
    if changes_existence(op) && !allow_add_remove {
        for r in doc
            .local_revisions()
            .keys()
            .chain(doc.local_commit_root().keys())
        {
            if r != commit && base.is_revision_newer(r) {
                return Err(ConflictDetected::new(*r, *commit, keys::DELETED).into());
            }
        }
    }

    // per-property concurrent changes
    for name in touched_properties(op) {
        let value_map = ValueMap::new(store, doc, name);
        let entries: Box<dyn Iterator<Item = DocumentResult<(Revision, String)>> + '_> =
            match truncation_floor(doc, name, base) {
                Some(min) => Box::new(value_map.changes_newer_than(min)),
                None => Box::new(value_map.iter()),
            };
        for entry in entries {
            let (r, _) = entry?;
            if &r != commit && base.is_revision_newer(&r) {
                return Err(ConflictDetected::new(r, *commit, name).into());
            }
        }
    }

    Ok(())
}

fn changes_existence(op: &UpdateOp) -> bool {
    op.changes().keys().any(|key| key.name() == keys::DELETED)
}

fn sets_deleted_to(op: &UpdateOp, value: &str) -> bool {
    op.changes().iter().any(|(key, operation)| {
        key.name() == keys::DELETED
            && matches!(operation, Operation::SetMapEntry(v) if v == value)
    })
}

/// The revision below which the property scan may stop, if any.
///
/// Truncating at the base minimum is only sound when every writer that can
/// appear in the property's history has an entry in the base vector: for a
/// writer missing from the base, arbitrarily old revisions still count as
/// concurrent. Local entries name their writers directly; a previous
/// document only holds its range writer's entries, so the `_prev` anchors
/// cover the off-loaded history.
fn truncation_floor(
    doc: &NodeDocument,
    property: &str,
    base: &RevisionVector,
) -> Option<Revision> {
    let all_writers_covered = doc
        .local_map(property)
        .keys()
        .chain(doc.local_map(keys::PREVIOUS).keys())
        .all(|r| base.get(r.writer_id()).is_some());
    if all_writers_covered {
        base.min_revision().copied()
    } else {
        None
    }
}

fn touched_properties(op: &UpdateOp) -> BTreeSet<&str> {
    op.changes()
        .iter()
        .filter(|(_, operation)| matches!(operation, Operation::SetMapEntry(_)))
        .map(|(key, _)| key.name())
        .filter(|name| keys::is_property_key(name))
        .collect()
}

/// The concurrent add/remove exception: hidden path, the op is a pure node
/// add or pure node delete, and neither side touches user-visible
/// properties.
fn allows_concurrent_add_remove(doc: &NodeDocument, op: &UpdateOp) -> DocumentResult<bool> {
    if op.modifies_user_properties() {
        return Ok(false);
    }
    // creation and re-creation both count as a pure add
    let pure_add = (op.is_new() || sets_deleted_to(op, "false")) && !op.is_delete();
    let pure_delete = op.is_delete();
    if !pure_add && !pure_delete {
        return Ok(false);
    }
    if !id::is_hidden_path(&doc.path()?) {
        return Ok(false);
    }
    Ok(doc.property_keys().next().is_none())
}
