//! SplitOperations - moving history into previous documents
//!
//! A main document grows with every change; the splitter keeps it bounded
//! by emitting the update operations that move committed history into a
//! new previous document:
//! - a local revision map with 100 or more entries makes the document a
//!   candidate, as does serializing past 8 KiB
//! - a document of 1 MiB is picked up by maintenance regardless of
//!   revision counts
//! - only the local writer's committed revisions move, and every
//!   value-carrying map keeps its most recent committed entry locally as
//!   the anchor for later reads
//! - once 10 previous documents of the same height accumulate, they are
//!   consolidated under one intermediate document a level higher
//!
//! The operations are ordered so a crash leaves at most an unreferenced
//! previous document behind: new documents first, the main-document
//! rewiring last.

use std::collections::{BTreeMap, HashSet};

use crate::commit::is_committed_str;
use crate::document::errors::DocumentResult;
use crate::document::{id, keys, to_json_string, NodeDocument, SplitDocType, UpdateOp};
use crate::history::Range;
use crate::revision::{Revision, RevisionVector};
use crate::store::RevisionContext;

/// Revision-count threshold marking a split candidate.
pub const NUM_REVS_THRESHOLD: usize = 100;
/// Serialized size that forces a split regardless of revision counts.
pub const DOC_SIZE_THRESHOLD: usize = 1024 * 1024;
/// Serialized size a candidate must reach before operations are emitted.
pub const SPLIT_CANDIDATE_THRESHOLD: usize = 8 * 1024;
/// Previous documents of one height consolidated under an intermediate.
pub const PREV_SPLIT_FACTOR: usize = 10;

/// True iff `doc` is large enough to be considered for splitting.
pub fn needs_split(doc: &NodeDocument) -> bool {
    exceeds_rev_threshold(doc) || to_json_string(doc).len() >= DOC_SIZE_THRESHOLD
}

fn exceeds_rev_threshold(doc: &NodeDocument) -> bool {
    splittable_keys(doc)
        .into_iter()
        .any(|key| doc.local_map(&key).len() >= NUM_REVS_THRESHOLD)
}

fn splittable_keys(doc: &NodeDocument) -> Vec<String> {
    doc.property_keys()
        .map(str::to_string)
        .chain([
            keys::DELETED.to_string(),
            keys::REVISIONS.to_string(),
            keys::COMMIT_ROOT.to_string(),
        ])
        .collect()
}

/// Computes the operations that split `doc`, or an empty vector when the
/// document does not (yet) qualify.
pub fn split_operations(
    ctx: &dyn RevisionContext,
    doc: &NodeDocument,
    head: &RevisionVector,
) -> DocumentResult<Vec<UpdateOp>> {
    let doc_id = match doc.doc_id() {
        Some(doc_id) => doc_id.to_string(),
        None => return Ok(Vec::new()),
    };
    if doc.is_split_document() {
        return Ok(Vec::new());
    }
    let size = to_json_string(doc).len();
    if !exceeds_rev_threshold(doc) && size < SPLIT_CANDIDATE_THRESHOLD {
        return Ok(Vec::new());
    }
    let path = doc.path()?;
    let writer = ctx.writer_id();

    // what moves: committed changes of the local writer, bounded by head
    let mut moved: BTreeMap<String, Vec<(Revision, String)>> = BTreeMap::new();
    let movable = |r: &Revision| r.writer_id() == writer && !head.is_revision_newer(r);

    for key in [keys::REVISIONS, keys::COMMIT_ROOT] {
        for (r, value) in doc.local_map(key).iter() {
            if !movable(r) {
                continue;
            }
            let committed = if key == keys::REVISIONS {
                is_committed_str(value)
            } else {
                ctx.commit_value(r, doc).is_some_and(|cv| cv.is_committed())
            };
            if committed {
                moved
                    .entry(key.to_string())
                    .or_default()
                    .push((*r, value.clone()));
            }
        }
    }

    // value-carrying maps keep their most recent committed entry (the
    // anchor), regardless of which writer owns it
    for key in doc
        .property_keys()
        .map(str::to_string)
        .chain([keys::DELETED.to_string()])
    {
        let mut anchor_seen = false;
        for (r, value) in doc.local_map(&key).iter() {
            let committed = ctx.commit_value(r, doc).is_some_and(|cv| cv.is_committed());
            if !committed {
                continue;
            }
            if !anchor_seen {
                anchor_seen = true;
                continue;
            }
            if movable(r) {
                moved
                    .entry(key.clone())
                    .or_default()
                    .push((*r, value.clone()));
            }
        }
    }

    // branch-commit markers travel with their revisions
    let moved_revisions: HashSet<Revision> = moved
        .get(keys::REVISIONS)
        .map(|entries| entries.iter().map(|(r, _)| *r).collect())
        .unwrap_or_default();
    for (r, value) in doc.local_map(keys::BRANCH_COMMITS).iter() {
        if moved_revisions.contains(r) {
            moved
                .entry(keys::BRANCH_COMMITS.to_string())
                .or_default()
                .push((*r, value.clone()));
        }
    }

    let all_moved: Vec<Revision> = moved
        .values()
        .flat_map(|entries| entries.iter().map(|(r, _)| *r))
        .collect();
    let (high, low) = match bounds(&all_moved) {
        Some(bounds) => bounds,
        None => return Ok(Vec::new()),
    };
    let new_range = Range::new(high, low, 0);

    // the new leaf document
    let leaf_id = id::previous_id_for(&path, &high, 0);
    let mut leaf_op = UpdateOp::new(&leaf_id, true);
    leaf_op.set(keys::PATH, id::previous_path_for(&path, &high, 0));
    leaf_op.set(keys::SD_TYPE, leaf_type(&moved).value());
    leaf_op.set(keys::SD_MAX_REV_TIME, high.timestamp());
    for (key, entries) in &moved {
        for (r, value) in entries {
            leaf_op.set_map_entry(key.clone(), *r, value.clone());
        }
    }

    // rewire the main document
    let mut main_op = UpdateOp::new(&doc_id, false);
    for (key, entries) in &moved {
        for (r, _) in entries {
            main_op.remove_map_entry(key.clone(), *r);
        }
    }
    // a crashed earlier split may have left a superseded entry at the
    // same anchor; mark it stale so garbage collection can reclaim it
    if let Some(existing) = doc.local_map(keys::PREVIOUS).get(&high) {
        if let Ok(old) = Range::parse(high, existing) {
            if old.height() != 0 {
                main_op.set_stale_previous(high, old.height());
            }
        }
    }

    let mut ops = vec![leaf_op];

    // consolidate when enough leaves of the same height piled up
    let mut same_height: Vec<Range> = doc
        .previous_ranges()?
        .values()
        .filter(|range| range.height() == 0 && range.high().writer_id() == writer)
        .copied()
        .collect();
    same_height.push(new_range);
    if same_height.len() >= PREV_SPLIT_FACTOR {
        let i_high = *same_height
            .iter()
            .map(Range::high)
            .max_by(|a, b| a.stable_cmp(b))
            .unwrap_or(&high);
        let i_low = *same_height
            .iter()
            .map(Range::low)
            .min_by(|a, b| a.stable_cmp(b))
            .unwrap_or(&low);
        let i_range = Range::new(i_high, i_low, 1);
        let i_id = id::previous_id_for(&path, &i_high, 1);
        let mut i_op = UpdateOp::new(&i_id, true);
        i_op.set(keys::PATH, id::previous_path_for(&path, &i_high, 1));
        i_op.set(keys::SD_TYPE, SplitDocType::Intermediate.value());
        i_op.set(keys::SD_MAX_REV_TIME, i_high.timestamp());
        for range in &same_height {
            i_op.set_previous(range);
        }
        for range in &same_height {
            if range != &new_range {
                main_op.remove_previous(*range.high());
            }
        }
        main_op.set_previous(&i_range);
        ops.push(i_op);
    } else {
        main_op.set_previous(&new_range);
    }

    ops.push(main_op);
    Ok(ops)
}

fn bounds(revisions: &[Revision]) -> Option<(Revision, Revision)> {
    let high = revisions.iter().max_by(|a, b| a.stable_cmp(b))?;
    let low = revisions.iter().min_by(|a, b| a.stable_cmp(b))?;
    Some((*high, *low))
}

fn leaf_type(moved: &BTreeMap<String, Vec<(Revision, String)>>) -> SplitDocType {
    let only_commit_root = moved.keys().all(|key| key == keys::COMMIT_ROOT);
    if only_commit_root {
        return SplitDocType::CommitRootOnly;
    }
    let has_branch_commits = moved.contains_key(keys::BRANCH_COMMITS)
        || moved
            .get(keys::REVISIONS)
            .is_some_and(|entries| entries.iter().any(|(_, v)| v.starts_with("c-")));
    if has_branch_commits {
        SplitDocType::DefaultLeaf
    } else {
        SplitDocType::DefaultNoBranch
    }
}
