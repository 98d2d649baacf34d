//! Visibility Invariant Tests
//!
//! Read-side correctness against trunk reads, unmerged branches, and
//! branch reads:
//! - a trunk read sees committed values covered by its vector
//! - unmerged branch commits are invisible from trunk
//! - a branch read sees its own branch commits

use revdoc::commit::CommitValue;
use revdoc::document::UpdateOp;
use revdoc::revision::{Revision, RevisionVector};
use revdoc::store::{
    BasicRevisionContext, Branch, DocumentStore, MemoryDocumentStore, ValidRevisionsCache,
};
use revdoc::visibility::{is_visible, latest_value, node_at_revision};

// =============================================================================
// Helper Functions
// =============================================================================

fn rev(ts: i64, writer: u32) -> Revision {
    Revision::new(ts, 0, writer)
}

fn vector(revisions: &[Revision]) -> RevisionVector {
    RevisionVector::from_revisions(revisions.iter().copied())
}

/// Creates `1:/foo` with `p` set at `r`, recorded with `commit_value`.
fn create_node(store: &MemoryDocumentStore, r: Revision, commit_value: &CommitValue, json: &str) {
    let mut op = UpdateOp::new("1:/foo", true);
    op.set_deleted(r, false);
    op.set_revision(r, commit_value);
    op.set_map_entry("p", r, json);
    assert!(store.find_and_update(&op).unwrap().is_some());
}

// =============================================================================
// Trunk Reads
// =============================================================================

/// A trunk read at the commit revision sees the committed value.
#[test]
fn test_trunk_read_sees_committed_value() {
    let store = MemoryDocumentStore::new();
    let r1 = rev(10, 1);
    create_node(&store, r1, &CommitValue::Trunk, "\"hello\"");

    let doc = store.find("1:/foo").unwrap().unwrap();
    let ctx = BasicRevisionContext::new(&store, vector(&[r1]), 1);
    let state = node_at_revision(&store, &ctx, &doc, &vector(&[r1]))
        .unwrap()
        .expect("node must be visible");

    assert_eq!(state.string_property("p"), Some("hello"));
    assert_eq!(state.path(), "/foo");
}

/// A trunk read older than the commit revision sees nothing.
#[test]
fn test_trunk_read_before_commit_sees_nothing() {
    let store = MemoryDocumentStore::new();
    let r0 = rev(5, 1);
    let r1 = rev(10, 1);
    create_node(&store, r1, &CommitValue::Trunk, "\"hello\"");

    let doc = store.find("1:/foo").unwrap().unwrap();
    let ctx = BasicRevisionContext::new(&store, vector(&[r1]), 1);
    assert!(node_at_revision(&store, &ctx, &doc, &vector(&[r0]))
        .unwrap()
        .is_none());
}

// =============================================================================
// Branch Commits
// =============================================================================

/// An unmerged branch commit is invisible from a trunk read.
#[test]
fn test_unmerged_branch_invisible_from_trunk() {
    let store = MemoryDocumentStore::new();
    let r0 = rev(5, 1);
    let r1 = rev(10, 1);
    create_node(&store, r1, &CommitValue::UnmergedBranch(r0), "\"x\"");

    let doc = store.find("1:/foo").unwrap().unwrap();
    let ctx = BasicRevisionContext::new(&store, vector(&[r0]), 1);
    assert!(node_at_revision(&store, &ctx, &doc, &vector(&[r0]))
        .unwrap()
        .is_none());
}

/// A branch read sees its own branch commit.
#[test]
fn test_branch_read_sees_own_branch_commit() {
    let store = MemoryDocumentStore::new();
    let r0 = rev(5, 1);
    let r1 = rev(10, 1);
    create_node(&store, r1, &CommitValue::UnmergedBranch(r0), "\"x\"");

    let doc = store.find("1:/foo").unwrap().unwrap();
    let mut ctx = BasicRevisionContext::new(&store, vector(&[r0]), 1);
    let mut branch = Branch::new(vector(&[r0]));
    branch.add_commit(r1);
    ctx.branches_mut().create(branch);

    let read = vector(&[r1.as_branch()]);
    let state = node_at_revision(&store, &ctx, &doc, &read)
        .unwrap()
        .expect("branch read must see its own commit");
    assert_eq!(state.string_property("p"), Some("x"));
}

/// A branch commit of another writer stays invisible even on a branch read.
#[test]
fn test_branch_commit_of_other_writer_invisible() {
    let store = MemoryDocumentStore::new();
    let r0 = rev(5, 1);
    let r1 = rev(10, 1);
    create_node(&store, r1, &CommitValue::UnmergedBranch(r0), "\"x\"");

    let doc = store.find("1:/foo").unwrap().unwrap();
    // local writer is 2, the commit was made by writer 1
    let mut ctx = BasicRevisionContext::new(&store, vector(&[r0]), 2);
    let mut branch = Branch::new(vector(&[r0]));
    branch.add_commit(r1);
    ctx.branches_mut().create(branch);

    assert!(node_at_revision(&store, &ctx, &doc, &vector(&[r1.as_branch()]))
        .unwrap()
        .is_none());
}

/// After the merge, the change is visible from the merge revision on.
#[test]
fn test_merged_branch_visible_from_merge_revision() {
    let store = MemoryDocumentStore::new();
    let r1 = rev(10, 1);
    let merge = rev(20, 1);
    create_node(&store, r1, &CommitValue::MergedBranch(merge), "\"x\"");

    let doc = store.find("1:/foo").unwrap().unwrap();
    let ctx = BasicRevisionContext::new(&store, vector(&[merge]), 1);
    // before the merge revision: invisible
    assert!(node_at_revision(&store, &ctx, &doc, &vector(&[rev(15, 1)]))
        .unwrap()
        .is_none());
    // at the merge revision: visible
    let state = node_at_revision(&store, &ctx, &doc, &vector(&[merge]))
        .unwrap()
        .expect("merged change must be visible");
    assert_eq!(state.string_property("p"), Some("x"));
}

// =============================================================================
// Deletions
// =============================================================================

/// A deleted node stops resolving, older reads still see it.
#[test]
fn test_deletion_is_versioned() {
    let store = MemoryDocumentStore::new();
    let r1 = rev(10, 1);
    let r2 = rev(20, 1);
    create_node(&store, r1, &CommitValue::Trunk, "\"hello\"");
    let mut op = UpdateOp::new("1:/foo", false);
    op.set_deleted(r2, true);
    op.set_revision(r2, &CommitValue::Trunk);
    store.find_and_update(&op).unwrap();

    let doc = store.find("1:/foo").unwrap().unwrap();
    let ctx = BasicRevisionContext::new(&store, vector(&[r2]), 1);
    assert!(node_at_revision(&store, &ctx, &doc, &vector(&[r2]))
        .unwrap()
        .is_none());
    assert!(node_at_revision(&store, &ctx, &doc, &vector(&[r1]))
        .unwrap()
        .is_some());
}

/// A removed property (empty value) disappears from the state.
#[test]
fn test_property_removal() {
    let store = MemoryDocumentStore::new();
    let r1 = rev(10, 1);
    let r2 = rev(20, 1);
    create_node(&store, r1, &CommitValue::Trunk, "\"hello\"");
    let mut op = UpdateOp::new("1:/foo", false);
    op.set_map_entry("p", r2, "");
    op.set_revision(r2, &CommitValue::Trunk);
    store.find_and_update(&op).unwrap();

    let doc = store.find("1:/foo").unwrap().unwrap();
    let ctx = BasicRevisionContext::new(&store, vector(&[r2]), 1);
    let state = node_at_revision(&store, &ctx, &doc, &vector(&[r2]))
        .unwrap()
        .unwrap();
    assert!(state.property("p").is_none());
    let state = node_at_revision(&store, &ctx, &doc, &vector(&[r1]))
        .unwrap()
        .unwrap();
    assert_eq!(state.string_property("p"), Some("hello"));
}

// =============================================================================
// latest_value Determinism
// =============================================================================

/// latest_value depends only on the visible prefix of the sequence.
#[test]
fn test_latest_value_is_deterministic() {
    let store = MemoryDocumentStore::new();
    let r1 = rev(10, 1);
    create_node(&store, r1, &CommitValue::Trunk, "\"hello\"");
    // an uncommitted newer change sits on top
    let r2 = rev(20, 1);
    let mut op = UpdateOp::new("1:/foo", false);
    op.set_map_entry("p", r2, "\"dirty\"");
    store.find_and_update(&op).unwrap();

    let doc = store.find("1:/foo").unwrap().unwrap();
    let ctx = BasicRevisionContext::new(&store, vector(&[r2]), 1);
    let read = vector(&[r2]);

    let entries = || {
        doc.local_map("p")
            .iter()
            .map(|(r, v)| Ok((*r, v.clone())))
            .collect::<Vec<_>>()
    };
    let mut valid = ValidRevisionsCache::new();
    let first = latest_value(&ctx, &doc, entries(), &read, &mut valid).unwrap();
    let second = latest_value(&ctx, &doc, entries(), &read, &mut valid).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.unwrap().1, "\"hello\"");
}

/// Visibility implies the resolved commit revision is covered by the read
/// vector.
#[test]
fn test_visible_commit_revision_is_covered() {
    let store = MemoryDocumentStore::new();
    let ctx = BasicRevisionContext::new(&store, vector(&[rev(50, 1)]), 1);
    let read = vector(&[rev(20, 1), rev(30, 2)]);
    let cases = [
        (rev(10, 1), CommitValue::Trunk),
        (rev(25, 1), CommitValue::Trunk),
        (rev(10, 2), CommitValue::MergedBranch(rev(25, 2))),
        (rev(10, 2), CommitValue::MergedBranch(rev(35, 2))),
        (rev(40, 1), CommitValue::Trunk),
    ];
    for (r, cv) in cases {
        if is_visible(&ctx, &r, &cv, &read) {
            let m = cv.resolve_commit_revision(&r);
            assert!(
                !read.is_revision_newer(&m),
                "visible {} must be covered by {}",
                m,
                read
            );
        }
    }
}
