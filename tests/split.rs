//! Split Emission Tests
//!
//! The splitter turns oversized main documents into previous documents:
//! - 100 revisions on one property trigger a split that keeps the newest
//!   committed entry local and links the moved span
//! - application of the emitted operations shrinks the document and keeps
//!   the full history readable
//! - 10 previous documents of one height consolidate under an
//!   intermediate document
//! - stale previous entries are invisible to the index

use revdoc::commit::CommitValue;
use revdoc::document::{id, keys, to_json_string, SplitDocType, UpdateOp};
use revdoc::revision::{Revision, RevisionVector};
use revdoc::split::{needs_split, split_operations, PREV_SPLIT_FACTOR};
use revdoc::store::{BasicRevisionContext, DocumentStore, MemoryDocumentStore};
use revdoc::visibility::node_at_revision;

// =============================================================================
// Helper Functions
// =============================================================================

fn rev(ts: i64) -> Revision {
    Revision::new(ts, 0, 1)
}

fn vector(revisions: &[Revision]) -> RevisionVector {
    RevisionVector::from_revisions(revisions.iter().copied())
}

/// Creates `/test` and writes `count` committed values of property `q`.
fn create_with_history(store: &MemoryDocumentStore, count: i64) {
    let mut op = UpdateOp::new("1:/test", true);
    op.set_deleted(rev(1), false);
    op.set_revision(rev(1), &CommitValue::Trunk);
    op.set_map_entry("q", rev(1), "\"v1\"");
    assert!(store.find_and_update(&op).unwrap().is_some());
    for i in 2..=count {
        let mut op = UpdateOp::new("1:/test", false);
        op.set_map_entry("q", rev(i), format!("\"v{}\"", i));
        op.set_revision(rev(i), &CommitValue::Trunk);
        assert!(store.find_and_update(&op).unwrap().is_some());
    }
}

// =============================================================================
// Split Emission
// =============================================================================

/// 100 committed revisions emit a previous document anchored at the
/// newest one, remove the moved entries, and keep the anchor local.
#[test]
fn test_split_emission_after_hundred_revisions() {
    let store = MemoryDocumentStore::new();
    create_with_history(&store, 100);
    let doc = store.find("1:/test").unwrap().unwrap();
    assert!(needs_split(&doc));

    let head = vector(&[rev(100)]);
    let ctx = BasicRevisionContext::new(&store, head.clone(), 1);
    let ops = split_operations(&ctx, &doc, &head).unwrap();
    assert_eq!(ops.len(), 2, "one previous document plus the main rewiring");

    let leaf = &ops[0];
    assert!(leaf.is_new());
    assert_eq!(leaf.id(), id::previous_id_for("/test", &rev(100), 0));

    let before_size = to_json_string(&doc).len();
    for op in &ops {
        assert!(store.find_and_update(op).unwrap().is_some());
    }

    let doc = store.find("1:/test").unwrap().unwrap();
    // the anchor stays local
    let local = doc.local_map("q");
    assert_eq!(local.len(), 1);
    assert!(local.contains_key(&rev(100)));
    // the moved commit bookkeeping is gone
    assert!(doc.local_revisions().is_empty());
    // the span is linked
    let ranges: Vec<_> = doc.previous_ranges().unwrap().values().copied().collect();
    assert_eq!(ranges.len(), 1);
    assert_eq!(ranges[0].high(), &rev(100));
    assert_eq!(ranges[0].low(), &rev(1));
    assert_eq!(ranges[0].height(), 0);
    // application strictly decreased the document size
    assert!(to_json_string(&doc).len() < before_size);

    // the previous document is well-formed
    let prev = store
        .find(&id::previous_id_for("/test", &rev(100), 0))
        .unwrap()
        .unwrap();
    assert!(prev.is_split_document());
    assert_eq!(prev.split_doc_type().unwrap(), SplitDocType::DefaultNoBranch);
    assert_eq!(prev.sd_max_rev_time(), Some(rev(100).timestamp()));
    assert_eq!(prev.local_map("q").len(), 99);
}

/// The full history stays readable after the split.
#[test]
fn test_history_readable_after_split() {
    let store = MemoryDocumentStore::new();
    create_with_history(&store, 100);
    let doc = store.find("1:/test").unwrap().unwrap();
    let head = vector(&[rev(100)]);
    let ctx = BasicRevisionContext::new(&store, head.clone(), 1);
    for op in split_operations(&ctx, &doc, &head).unwrap() {
        assert!(store.find_and_update(&op).unwrap().is_some());
    }

    let doc = store.find("1:/test").unwrap().unwrap();
    // the newest value resolves from the local anchor
    let state = node_at_revision(&store, &ctx, &doc, &head).unwrap().unwrap();
    assert_eq!(state.string_property("q"), Some("v100"));
    // an old read-point resolves through the previous document
    let state = node_at_revision(&store, &ctx, &doc, &vector(&[rev(50)]))
        .unwrap()
        .unwrap();
    assert_eq!(state.string_property("q"), Some("v50"));
}

/// Small documents with short histories do not split.
#[test]
fn test_no_split_below_thresholds() {
    let store = MemoryDocumentStore::new();
    create_with_history(&store, 50);
    let doc = store.find("1:/test").unwrap().unwrap();
    assert!(!needs_split(&doc));

    let head = vector(&[rev(50)]);
    let ctx = BasicRevisionContext::new(&store, head.clone(), 1);
    assert!(split_operations(&ctx, &doc, &head).unwrap().is_empty());
}

/// A previous document itself never splits again.
#[test]
fn test_previous_documents_do_not_split() {
    let store = MemoryDocumentStore::new();
    create_with_history(&store, 100);
    let doc = store.find("1:/test").unwrap().unwrap();
    let head = vector(&[rev(100)]);
    let ctx = BasicRevisionContext::new(&store, head.clone(), 1);
    for op in split_operations(&ctx, &doc, &head).unwrap() {
        store.find_and_update(&op).unwrap();
    }
    let prev = store
        .find(&id::previous_id_for("/test", &rev(100), 0))
        .unwrap()
        .unwrap();
    assert!(split_operations(&ctx, &prev, &head).unwrap().is_empty());
}

/// Revisions newer than the head stay local.
#[test]
fn test_revisions_past_head_stay_local() {
    let store = MemoryDocumentStore::new();
    create_with_history(&store, 100);
    let doc = store.find("1:/test").unwrap().unwrap();
    // head lags behind the latest change
    let head = vector(&[rev(90)]);
    let ctx = BasicRevisionContext::new(&store, head.clone(), 1);
    for op in split_operations(&ctx, &doc, &head).unwrap() {
        store.find_and_update(&op).unwrap();
    }
    let doc = store.find("1:/test").unwrap().unwrap();
    for i in 91..=100 {
        assert!(doc.local_revisions().contains_key(&rev(i)));
    }
}

/// An oversized document is a split candidate regardless of revision
/// counts.
#[test]
fn test_document_size_forces_candidacy() {
    let store = MemoryDocumentStore::new();
    let mut op = UpdateOp::new("1:/big", true);
    op.set_deleted(rev(1), false);
    op.set_revision(rev(1), &CommitValue::Trunk);
    let huge = format!("\"{}\"", "x".repeat(1024 * 1024 + 1024));
    op.set_map_entry("blob", rev(1), huge);
    store.find_and_update(&op).unwrap();

    let doc = store.find("1:/big").unwrap().unwrap();
    assert!(needs_split(&doc));
}

// =============================================================================
// Intermediate Consolidation
// =============================================================================

/// The tenth previous document of one height consolidates everything
/// under an intermediate document one level up.
#[test]
fn test_intermediate_consolidation_at_fanout() {
    let store = MemoryDocumentStore::new();
    // history at 1001..1100, with nine older leaf ranges already linked
    let mut op = UpdateOp::new("1:/test", true);
    op.set_deleted(rev(1001), false);
    op.set_revision(rev(1001), &CommitValue::Trunk);
    op.set_map_entry("q", rev(1001), "\"v1\"");
    for i in 0..(PREV_SPLIT_FACTOR as i64 - 1) {
        let low = rev(100 * i + 1);
        let high = rev(100 * i + 50);
        op.set_previous(&revdoc::history::Range::new(high, low, 0));
    }
    store.find_and_update(&op).unwrap();
    for i in 1002..=1100 {
        let mut op = UpdateOp::new("1:/test", false);
        op.set_map_entry("q", rev(i), format!("\"v{}\"", i));
        op.set_revision(rev(i), &CommitValue::Trunk);
        store.find_and_update(&op).unwrap();
    }

    let doc = store.find("1:/test").unwrap().unwrap();
    let head = vector(&[rev(1100)]);
    let ctx = BasicRevisionContext::new(&store, head.clone(), 1);
    let ops = split_operations(&ctx, &doc, &head).unwrap();
    assert_eq!(ops.len(), 3, "leaf, intermediate, and main rewiring");

    let intermediate = &ops[1];
    assert!(intermediate.is_new());
    assert_eq!(intermediate.id(), id::previous_id_for("/test", &rev(1100), 1));

    for op in &ops {
        assert!(store.find_and_update(op).unwrap().is_some());
    }
    let doc = store.find("1:/test").unwrap().unwrap();
    let ranges: Vec<_> = doc.previous_ranges().unwrap().values().copied().collect();
    assert_eq!(ranges.len(), 1, "all leaves rewired under one intermediate");
    assert_eq!(ranges[0].height(), 1);
    assert_eq!(ranges[0].high(), &rev(1100));
    assert_eq!(ranges[0].low(), &rev(1));

    let inter = store
        .find(&id::previous_id_for("/test", &rev(1100), 1))
        .unwrap()
        .unwrap();
    assert_eq!(inter.split_doc_type().unwrap(), SplitDocType::Intermediate);
    assert_eq!(
        inter.previous_ranges().unwrap().len(),
        PREV_SPLIT_FACTOR,
        "the intermediate references every consolidated leaf"
    );
}

// =============================================================================
// Stale Previous Entries
// =============================================================================

/// A stale previous marker hides the matching range from the index.
#[test]
fn test_stale_previous_entry_is_hidden() {
    let store = MemoryDocumentStore::new();
    let mut op = UpdateOp::new("1:/test", true);
    op.set_deleted(rev(1), false);
    op.set_revision(rev(1), &CommitValue::Trunk);
    op.set_previous(&revdoc::history::Range::new(rev(10), rev(5), 0));
    op.set_stale_previous(rev(10), 0);
    store.find_and_update(&op).unwrap();

    let doc = store.find("1:/test").unwrap().unwrap();
    assert_eq!(doc.local_map(keys::PREVIOUS).len(), 1);
    assert!(doc.previous_ranges().unwrap().is_empty());
}
