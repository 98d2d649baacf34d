//! VisibilityEngine - which revisions a read-point can see
//!
//! A revision is visible from a read-point when its resolved commit
//! revision is covered by the read vector; branch commits are only ever
//! visible to reads on their own branch. The rules:
//!
//! 1. committed (trunk or merged): resolve the commit revision `m`; a
//!    trunk read sees it iff `m` is covered by the read vector, a branch
//!    read iff `m` is covered by the branch base.
//! 2. unmerged branch commit: invisible to other writers and to trunk
//!    reads; a branch read sees it iff its branch contains that very
//!    commit and the read vector covers it.
//! 3. unknown commit state: invisible (treated as uncommitted).
//!
//! `latest_value` walks a descending entry sequence and returns the first
//! visible hit, caching every revision it proves valid so repeated lookups
//! against the same read-point skip re-resolution.

use std::collections::BTreeMap;

use crate::commit::CommitValue;
use crate::document::errors::{DocumentError, DocumentResult};
use crate::document::{keys, NodeDocument};
use crate::history::{PreviousIndex, ValueMap};
use crate::revision::{Revision, RevisionMap, RevisionVector};
use crate::store::{DocumentStore, PrevNoPropCache, RevisionContext, ValidRevisionsCache};

use super::node_state::DocumentNodeState;

/// The `_deleted` value marking a live node.
const LIVE_VALUE: &str = "false";

/// Decides whether `revision` with commit state `commit_value` is visible
/// from `read_point`.
pub fn is_visible(
    ctx: &dyn RevisionContext,
    revision: &Revision,
    commit_value: &CommitValue,
    read_point: &RevisionVector,
) -> bool {
    match commit_value {
        CommitValue::Trunk | CommitValue::MergedBranch(_) => {
            let commit_revision = commit_value.resolve_commit_revision(revision);
            if !read_point.is_branch() {
                return !read_point.is_revision_newer(&commit_revision);
            }
            // a branch read sees trunk state up to its base
            let base = match ctx.branches().branch_of(read_point) {
                Some(branch) => branch.base().clone(),
                None => read_point.base(),
            };
            !base.is_revision_newer(&commit_revision)
        }
        CommitValue::UnmergedBranch(_) => {
            if revision.writer_id() != ctx.writer_id() {
                return false;
            }
            if !read_point.is_branch() {
                return false;
            }
            let on_this_branch = match ctx.branches().branch_of(read_point) {
                Some(branch) => branch.contains_commit(revision),
                // fall back to the read vector's own branch element
                None => read_point
                    .branch_revision()
                    .is_some_and(|b| b.writer_id() == revision.writer_id()),
            };
            on_this_branch && !read_point.is_revision_newer(revision)
        }
    }
}

/// Walks `entries` newest-first and returns the first visible one.
///
/// `valid_revisions` is the caller-scoped cache of revisions already
/// proven valid against the current read-point; hits skip resolution.
pub fn latest_value<I>(
    ctx: &dyn RevisionContext,
    doc: &NodeDocument,
    entries: I,
    read_point: &RevisionVector,
    valid_revisions: &mut ValidRevisionsCache,
) -> DocumentResult<Option<(Revision, String)>>
where
    I: IntoIterator<Item = DocumentResult<(Revision, String)>>,
{
    for entry in entries {
        let (revision, value) = entry?;
        if valid_revisions.contains_key(&revision) {
            return Ok(Some((revision, value)));
        }
        let commit_value = match ctx.commit_value(&revision, doc) {
            Some(cv) => cv,
            None => continue,
        };
        if is_visible(ctx, &revision, &commit_value, read_point) {
            valid_revisions.insert(revision, commit_value);
            return Ok(Some((revision, value)));
        }
    }
    Ok(None)
}

/// True iff `revision` is at or above the first committed revision found
/// walking `local` newest-first.
pub fn is_most_recent_committed(
    ctx: &dyn RevisionContext,
    doc: &NodeDocument,
    local: &RevisionMap<String>,
    revision: &Revision,
) -> bool {
    for r in local.keys() {
        if ctx
            .commit_value(r, doc)
            .is_some_and(|cv| cv.is_committed())
        {
            return !r.is_newer_than(revision);
        }
    }
    true
}

/// Gate for the local-map shortcut: a local hit can only be trusted when
/// it is the most recent committed entry locally, or when no previous
/// range reaches above it.
pub fn requires_complete_map_check(
    ctx: &dyn RevisionContext,
    doc: &NodeDocument,
    local: &RevisionMap<String>,
    hit: &Revision,
    previous: &PreviousIndex,
) -> bool {
    if is_most_recent_committed(ctx, doc, local, hit) {
        return false;
    }
    previous.head(hit).next().is_some()
}

/// The latest visible entry of `key`, trying the local map first and only
/// spanning the full history when the shortcut gate demands it.
pub fn latest_visible(
    store: &dyn DocumentStore,
    ctx: &dyn RevisionContext,
    doc: &NodeDocument,
    key: &str,
    read_point: &RevisionVector,
    cache: Option<&PrevNoPropCache>,
    valid_revisions: &mut ValidRevisionsCache,
) -> DocumentResult<Option<(Revision, String)>> {
    let local = doc.local_map(key);
    let local_entries = local.iter().map(|(r, v)| Ok((*r, v.clone())));
    let local_hit = latest_value(ctx, doc, local_entries, read_point, valid_revisions)?;
    let previous = doc.previous_ranges()?;
    if let Some((revision, value)) = local_hit {
        if !requires_complete_map_check(ctx, doc, local, &revision, &previous) {
            return Ok(Some((revision, value)));
        }
    } else if previous.is_empty() {
        return Ok(None);
    }
    let mut value_map = ValueMap::new(store, doc, key);
    if let Some(cache) = cache {
        value_map = value_map.with_cache(cache);
    }
    latest_value(ctx, doc, value_map.iter(), read_point, valid_revisions)
}

/// Whether the node exists at `read_point`: the latest visible `_deleted`
/// entry must mark it live.
pub fn is_live_at(
    store: &dyn DocumentStore,
    ctx: &dyn RevisionContext,
    doc: &NodeDocument,
    read_point: &RevisionVector,
    valid_revisions: &mut ValidRevisionsCache,
) -> DocumentResult<Option<Revision>> {
    match latest_visible(
        store,
        ctx,
        doc,
        keys::DELETED,
        read_point,
        None,
        valid_revisions,
    )? {
        Some((revision, value)) if value == LIVE_VALUE => Ok(Some(revision)),
        _ => Ok(None),
    }
}

/// Resolves the node state at `read_point`, or `None` when the node does
/// not exist there.
pub fn node_at_revision(
    store: &dyn DocumentStore,
    ctx: &dyn RevisionContext,
    doc: &NodeDocument,
    read_point: &RevisionVector,
) -> DocumentResult<Option<DocumentNodeState>> {
    let mut valid_revisions = ValidRevisionsCache::new();
    let live_revision = match is_live_at(store, ctx, doc, read_point, &mut valid_revisions)? {
        Some(revision) => revision,
        None => return Ok(None),
    };
    let mut last_revision = ctx
        .commit_value(&live_revision, doc)
        .map(|cv| cv.resolve_commit_revision(&live_revision));

    let mut properties = BTreeMap::new();
    for key in doc.property_keys() {
        let hit = latest_visible(
            store,
            ctx,
            doc,
            key,
            read_point,
            None,
            &mut valid_revisions,
        )?;
        let (revision, raw) = match hit {
            Some(hit) => hit,
            None => continue,
        };
        if let Some(cv) = ctx.commit_value(&revision, doc) {
            last_revision = newest_of(last_revision, cv.resolve_commit_revision(&revision));
        }
        if raw.is_empty() {
            // the property was removed at this revision
            continue;
        }
        let value: serde_json::Value = serde_json::from_str(&raw).map_err(|e| {
            DocumentError::malformed(format!("property '{}' holds invalid JSON: {}", key, e))
        })?;
        properties.insert(keys::unescape_property_name(key), value);
    }

    // _lastRev and this process' pending writes push the state forward
    for value in doc.local_map(keys::LAST_REV).values() {
        if let Ok(r) = value.parse::<Revision>() {
            if !read_point.is_revision_newer(&r) {
                last_revision = newest_of(last_revision, r);
            }
        }
    }
    for r in ctx.pending_modifications().iter() {
        if !read_point.is_revision_newer(r) {
            last_revision = newest_of(last_revision, *r);
        }
    }

    Ok(Some(DocumentNodeState::new(
        doc.path()?,
        read_point.clone(),
        properties,
        last_revision,
    )))
}

fn newest_of(current: Option<Revision>, candidate: Revision) -> Option<Revision> {
    match current {
        Some(current) if current.is_newer_than(&candidate) => Some(current),
        _ => Some(candidate),
    }
}
