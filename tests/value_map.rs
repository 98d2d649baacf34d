//! ValueMap and PreviousIndex Tests
//!
//! The merged property view across local and previous documents:
//! - iteration is strictly descending and equals the union of the local
//!   map and all non-stale previous maps
//! - the local-map shortcut gate only fires when a previous range could
//!   hide a newer visible value
//! - negative scans feed the prev-no-property cache

use revdoc::commit::CommitValue;
use revdoc::document::{id, keys, SplitDocType, UpdateOp};
use revdoc::history::{Range, ValueMap};
use revdoc::revision::{Revision, RevisionVector};
use revdoc::store::{
    BasicRevisionContext, DocumentStore, MemoryDocumentStore, PrevNoPropCache, ValidRevisionsCache,
};
use revdoc::visibility::{
    is_most_recent_committed, latest_visible, requires_complete_map_check,
};

// =============================================================================
// Helper Functions
// =============================================================================

fn rev(ts: i64) -> Revision {
    Revision::new(ts, 0, 1)
}

fn vector(revisions: &[Revision]) -> RevisionVector {
    RevisionVector::from_revisions(revisions.iter().copied())
}

fn create_leaf(
    store: &MemoryDocumentStore,
    main_path: &str,
    high: Revision,
    low: Revision,
    entries: &[(Revision, &str)],
) -> Range {
    let prev_id = id::previous_id_for(main_path, &high, 0);
    let mut op = UpdateOp::new(&prev_id, true);
    op.set(keys::PATH, id::previous_path_for(main_path, &high, 0));
    op.set(keys::SD_TYPE, SplitDocType::DefaultNoBranch.value());
    op.set(keys::SD_MAX_REV_TIME, high.timestamp());
    for (r, value) in entries {
        op.set_map_entry("q", *r, *value);
        op.set_revision(*r, &CommitValue::Trunk);
    }
    assert!(store.find_and_update(&op).unwrap().is_some());
    Range::new(high, low, 0)
}

// =============================================================================
// Merged Iteration
// =============================================================================

/// Iteration is strictly descending and covers local plus all non-stale
/// previous maps.
#[test]
fn test_merged_iteration_descending_minus_stale() {
    let store = MemoryDocumentStore::new();
    let mut op = UpdateOp::new("1:/node", true);
    op.set_deleted(rev(25), false);
    op.set_revision(rev(25), &CommitValue::Trunk);
    op.set_revision(rev(30), &CommitValue::Trunk);
    op.set_map_entry("q", rev(30), "\"f\"");
    op.set_map_entry("q", rev(25), "\"e\"");
    store.find_and_update(&op).unwrap();

    let r1 = create_leaf(&store, "/node", rev(20), rev(11), &[(rev(20), "\"d\""), (rev(15), "\"c\"")]);
    let r2 = create_leaf(&store, "/node", rev(10), rev(1), &[(rev(10), "\"b\""), (rev(5), "\"a\"")]);
    // a third range exists but is marked stale
    let r3 = create_leaf(&store, "/node", rev(24), rev(21), &[(rev(22), "\"x\"")]);
    let mut op = UpdateOp::new("1:/node", false);
    op.set_previous(&r1);
    op.set_previous(&r2);
    op.set_previous(&r3);
    op.set_stale_previous(*r3.high(), r3.height());
    store.find_and_update(&op).unwrap();

    let doc = store.find("1:/node").unwrap().unwrap();
    let entries: Vec<(i64, String)> = ValueMap::new(&store, &doc, "q")
        .iter()
        .map(|e| {
            let (r, v) = e.unwrap();
            (r.timestamp(), v)
        })
        .collect();

    let timestamps: Vec<i64> = entries.iter().map(|(t, _)| *t).collect();
    assert_eq!(timestamps, vec![30, 25, 20, 15, 10, 5]);
    let mut sorted = timestamps.clone();
    sorted.sort_by(|a, b| b.cmp(a));
    assert_eq!(timestamps, sorted, "iteration must be strictly descending");
    assert!(
        !entries.iter().any(|(_, v)| v == "\"x\""),
        "stale ranges must not contribute entries"
    );
}

// =============================================================================
// Shortcut Gate
// =============================================================================

/// The gate fires exactly when the hit is not the most recent committed
/// local entry and a previous range reaches above it.
#[test]
fn test_requires_complete_map_check() {
    let store = MemoryDocumentStore::new();
    let mut op = UpdateOp::new("1:/node", true);
    op.set_deleted(rev(10), false);
    op.set_revision(rev(10), &CommitValue::Trunk);
    op.set_revision(rev(30), &CommitValue::Trunk);
    op.set_map_entry("q", rev(10), "\"a\"");
    op.set_map_entry("q", rev(30), "\"c\"");
    store.find_and_update(&op).unwrap();
    let range = create_leaf(&store, "/node", rev(20), rev(15), &[(rev(20), "\"b\"")]);
    let mut op = UpdateOp::new("1:/node", false);
    op.set_previous(&range);
    store.find_and_update(&op).unwrap();

    let doc = store.find("1:/node").unwrap().unwrap();
    let ctx = BasicRevisionContext::new(&store, vector(&[rev(30)]), 1);
    let local = doc.local_map("q");
    let previous = doc.previous_ranges().unwrap();

    // r30 is the most recent committed local entry: no full check
    assert!(is_most_recent_committed(&ctx, &doc, local, &rev(30)));
    assert!(!requires_complete_map_check(&ctx, &doc, local, &rev(30), &previous));
    // r10 is older and the previous range reaches to r20: full check
    assert!(!is_most_recent_committed(&ctx, &doc, local, &rev(10)));
    assert!(requires_complete_map_check(&ctx, &doc, local, &rev(10), &previous));
}

/// When the gate fires, the full history produces the correct value.
#[test]
fn test_latest_visible_spans_history_when_gated() {
    let store = MemoryDocumentStore::new();
    let mut op = UpdateOp::new("1:/node", true);
    op.set_deleted(rev(10), false);
    op.set_revision(rev(10), &CommitValue::Trunk);
    op.set_revision(rev(30), &CommitValue::Trunk);
    op.set_map_entry("q", rev(10), "\"a\"");
    op.set_map_entry("q", rev(30), "\"c\"");
    store.find_and_update(&op).unwrap();
    let range = create_leaf(&store, "/node", rev(20), rev(15), &[(rev(20), "\"b\"")]);
    let mut op = UpdateOp::new("1:/node", false);
    op.set_previous(&range);
    store.find_and_update(&op).unwrap();

    let doc = store.find("1:/node").unwrap().unwrap();
    let ctx = BasicRevisionContext::new(&store, vector(&[rev(30)]), 1);

    // a read-point between the previous high and the local newest entry
    let mut valid = ValidRevisionsCache::new();
    let hit = latest_visible(
        &store,
        &ctx,
        &doc,
        "q",
        &vector(&[rev(20)]),
        None,
        &mut valid,
    )
    .unwrap()
    .unwrap();
    assert_eq!(hit.0, rev(20));
    assert_eq!(hit.1, "\"b\"");

    // the newest read-point resolves locally
    let mut valid = ValidRevisionsCache::new();
    let hit = latest_visible(
        &store,
        &ctx,
        &doc,
        "q",
        &vector(&[rev(30)]),
        None,
        &mut valid,
    )
    .unwrap()
    .unwrap();
    assert_eq!(hit.0, rev(30));
}

// =============================================================================
// Negative-Scan Cache
// =============================================================================

/// A completed negative scan writes through to the cache; cached subtrees
/// are skipped on later reads.
#[test]
fn test_prev_no_prop_cache() {
    let store = MemoryDocumentStore::new();
    let mut op = UpdateOp::new("1:/node", true);
    op.set_deleted(rev(30), false);
    op.set_revision(rev(30), &CommitValue::Trunk);
    op.set_map_entry("other", rev(30), "\"x\"");
    store.find_and_update(&op).unwrap();
    // the previous document has revisions, but none for "other"
    let range = create_leaf(&store, "/node", rev(20), rev(15), &[(rev(20), "\"b\"")]);
    let mut op = UpdateOp::new("1:/node", false);
    op.set_previous(&range);
    store.find_and_update(&op).unwrap();

    let cache = PrevNoPropCache::new();
    let doc = store.find("1:/node").unwrap().unwrap();
    let entries: Vec<_> = ValueMap::new(&store, &doc, "other")
        .with_cache(&cache)
        .iter()
        .map(Result::unwrap)
        .collect();
    assert_eq!(entries.len(), 1, "only the local entry exists");

    let prev_id = id::previous_id_for("/node", &rev(20), 0);
    assert!(cache.knows_empty("other", &prev_id));
    assert!(!cache.knows_empty("q", &prev_id));

    // the cached negative short-circuits the next scan
    let entries: Vec<_> = ValueMap::new(&store, &doc, "other")
        .with_cache(&cache)
        .iter()
        .map(Result::unwrap)
        .collect();
    assert_eq!(entries.len(), 1);
}
