//! NewestRevisionFinder - collision collection during a commit attempt
//!
//! A writer committing `change` on top of `base` needs two things: the
//! newest committed revision visible from its base (the state it is really
//! changing), and the set of concurrent revisions it collides with. Every
//! revision of the document is classified:
//! - uncommitted, wrong-branch, branch-base-violating, and
//!   committed-but-not-yet-visible revisions newer than the base are
//!   collisions
//! - committed revisions visible from the base advance the per-writer
//!   newest map
//!
//! Previous documents are consulted only when some previous range's low
//! end is newer than the base; everything older cannot collide.

use std::collections::{HashMap, HashSet};

use crate::commit::CommitValue;
use crate::document::errors::DocumentResult;
use crate::document::{keys, NodeDocument};
use crate::history::ValueMap;
use crate::revision::{Revision, RevisionVector};
use crate::store::{Branch, DocumentStore, RevisionContext};

/// Finds the newest committed revision visible from `base` and collects
/// colliding revisions into `collisions`.
///
/// Returns `None` when the document has no visible committed revision, or
/// when the node is deleted at the newest one.
pub fn newest_revision(
    store: &dyn DocumentStore,
    ctx: &dyn RevisionContext,
    doc: &NodeDocument,
    base: &RevisionVector,
    change: &Revision,
    branch: Option<&Branch>,
    collisions: &mut Vec<Revision>,
) -> DocumentResult<Option<Revision>> {
    let lower = match branch {
        Some(branch) => branch.base().clone(),
        None => base.base(),
    };

    let mut newest_revs: HashMap<u32, Revision> = HashMap::new();
    let mut record = |collisions: &mut Vec<Revision>, r: Revision| {
        if !collisions.contains(&r) {
            collisions.push(r);
        }
    };

    let mut seen: HashSet<Revision> = HashSet::new();
    for entry in all_changes(store, doc, &lower)? {
        let r = entry?;
        if !seen.insert(r) || &r == change {
            continue;
        }
        if newest_revs.contains_key(&r.writer_id()) && lower.is_revision_newer(&r) {
            // the newest committed revision for this writer is known;
            // only branch rules can still make r a collision
            match ctx.commit_value(&r, doc) {
                Some(CommitValue::UnmergedBranch(_)) => {
                    if branch.map_or(true, |b| !b.contains_commit(&r)) {
                        record(collisions, r);
                    }
                }
                Some(cv) => {
                    if let Some(b) = branch {
                        let commit_revision = cv.resolve_commit_revision(&r);
                        if b.base().is_revision_newer(&commit_revision) {
                            record(collisions, r);
                        }
                    }
                }
                None => record(collisions, r),
            }
            continue;
        }
        match ctx.commit_value(&r, doc) {
            // uncommitted concurrent change
            None => record(collisions, r),
            Some(CommitValue::UnmergedBranch(_)) => {
                if branch.map_or(true, |b| !b.contains_commit(&r)) {
                    // branch commit from a branch that is not ours
                    record(collisions, r);
                }
                // commits of our own branch are neither newest nor colliding
            }
            Some(cv) => {
                let commit_revision = cv.resolve_commit_revision(&r);
                if branch.is_some_and(|b| b.base().is_revision_newer(&commit_revision)) {
                    // committed past our branch base
                    record(collisions, r);
                } else if lower.is_revision_newer(&commit_revision) {
                    // committed but not visible from the base read
                    record(collisions, r);
                } else {
                    // committed and visible: candidate newest
                    newest_revs
                        .entry(r.writer_id())
                        .and_modify(|cur| {
                            if r.is_newer_than(cur) {
                                *cur = r;
                            }
                        })
                        .or_insert(r);
                }
            }
        }
    }

    let newest = match newest_revs.values().max_by(|a, b| a.stable_cmp(b)) {
        Some(newest) => *newest,
        None => return Ok(None),
    };

    // the node must not be deleted at the newest revision
    let deleted_value = match doc.local_deleted().get(&newest) {
        Some(value) => Some(value.clone()),
        None => ValueMap::new(store, doc, keys::DELETED).get(&newest)?,
    };
    if deleted_value.as_deref() == Some("true") {
        return Ok(None);
    }
    Ok(Some(newest))
}

/// All change revisions of the document: local `_revisions` and
/// `_commitRoot` keys, extended with previous documents only when a
/// previous range's low end is newer than `lower`.
fn all_changes<'a>(
    store: &'a dyn DocumentStore,
    doc: &'a NodeDocument,
    lower: &RevisionVector,
) -> DocumentResult<impl Iterator<Item = DocumentResult<Revision>> + 'a> {
    let mut local: Vec<Revision> = doc
        .local_revisions()
        .keys()
        .chain(doc.local_commit_root().keys())
        .copied()
        .collect();
    local.sort_by(|a, b| b.cmp(a));
    local.dedup();

    let include_previous = doc
        .previous_ranges()?
        .values()
        .any(|range| lower.is_revision_newer(range.low()));

    let previous: Box<dyn Iterator<Item = DocumentResult<Revision>> + 'a> = if include_previous {
        let revisions = ValueMap::new(store, doc, keys::REVISIONS);
        let commit_roots = ValueMap::new(store, doc, keys::COMMIT_ROOT);
        Box::new(
            revisions
                .iter()
                .chain(commit_roots.iter())
                .map(|entry| entry.map(|(r, _)| r)),
        )
    } else {
        Box::new(std::iter::empty())
    };

    Ok(local.into_iter().map(Ok).chain(previous))
}
