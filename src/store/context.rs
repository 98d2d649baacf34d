//! RevisionContext - the consumed commit-state oracle
//!
//! Readers and writers need three pieces of ambient state the document
//! core does not own: the current head revision vector, the set of known
//! unmerged branches, and the commit value of an arbitrary revision. The
//! context trait bundles them together with the local writer id and the
//! writer's pending (not yet backgrounded) modifications.

use std::collections::BTreeSet;

use crate::commit::{self, CommitValue};
use crate::document::NodeDocument;
use crate::revision::{Revision, RevisionVector};

use super::document_store::DocumentStore;

/// One unmerged branch: its base vector and the commits made on it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Branch {
    base: RevisionVector,
    // commits are stored trunk-form; membership ignores the branch flag
    commits: BTreeSet<Revision>,
}

impl Branch {
    /// Creates a branch rooted at `base`.
    pub fn new(base: RevisionVector) -> Self {
        Self {
            base,
            commits: BTreeSet::new(),
        }
    }

    /// The trunk vector this branch was forked from.
    #[inline]
    pub fn base(&self) -> &RevisionVector {
        &self.base
    }

    /// Records a commit made on this branch.
    pub fn add_commit(&mut self, revision: Revision) {
        self.commits.insert(revision.as_trunk());
    }

    /// True iff `revision` was committed on this branch.
    pub fn contains_commit(&self, revision: &Revision) -> bool {
        self.commits.contains(&revision.as_trunk())
    }

    /// The commits made on this branch.
    pub fn commits(&self) -> impl Iterator<Item = &Revision> {
        self.commits.iter()
    }
}

/// Registry of unmerged branches, looked up by the branch-flagged element
/// of a read vector.
#[derive(Debug, Clone, Default)]
pub struct Branches {
    branches: Vec<Branch>,
}

impl Branches {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a branch and returns a handle to extend it.
    pub fn create(&mut self, branch: Branch) -> &mut Branch {
        self.branches.push(branch);
        self.branches
            .last_mut()
            .unwrap_or_else(|| unreachable!("just pushed"))
    }

    /// The branch containing the read vector's branch revision, if known.
    pub fn branch_of(&self, read_point: &RevisionVector) -> Option<&Branch> {
        let branch_rev = read_point.branch_revision()?;
        self.branches
            .iter()
            .find(|b| b.contains_commit(branch_rev))
    }
}

/// Ambient state consumed by visibility, conflict, and split decisions.
pub trait RevisionContext {
    /// The current head revision vector.
    fn head_revision(&self) -> RevisionVector;

    /// The id of the local writer.
    fn writer_id(&self) -> u32;

    /// The known unmerged branches.
    fn branches(&self) -> &Branches;

    /// The commit value of `revision`, or `None` when unknown (treated as
    /// uncommitted). May perform I/O through the store.
    fn commit_value(&self, revision: &Revision, doc: &NodeDocument) -> Option<CommitValue>;

    /// Last revisions written by this process but not yet persisted in
    /// `_lastRev` maps.
    fn pending_modifications(&self) -> RevisionVector;
}

/// A [`RevisionContext`] that resolves commit values from the documents
/// themselves, following previous documents through the store.
pub struct BasicRevisionContext<'a> {
    store: &'a dyn DocumentStore,
    head: RevisionVector,
    writer_id: u32,
    branches: Branches,
    pending: RevisionVector,
}

impl<'a> BasicRevisionContext<'a> {
    /// Creates a context over `store` for the given writer.
    pub fn new(store: &'a dyn DocumentStore, head: RevisionVector, writer_id: u32) -> Self {
        Self {
            store,
            head,
            writer_id,
            branches: Branches::new(),
            pending: RevisionVector::new(),
        }
    }

    /// Replaces the head vector.
    pub fn set_head_revision(&mut self, head: RevisionVector) {
        self.head = head;
    }

    /// Mutable access to the branch registry.
    pub fn branches_mut(&mut self) -> &mut Branches {
        &mut self.branches
    }

    /// Records pending modifications.
    pub fn set_pending_modifications(&mut self, pending: RevisionVector) {
        self.pending = pending;
    }
}

impl RevisionContext for BasicRevisionContext<'_> {
    fn head_revision(&self) -> RevisionVector {
        self.head.clone()
    }

    fn writer_id(&self) -> u32 {
        self.writer_id
    }

    fn branches(&self) -> &Branches {
        &self.branches
    }

    fn commit_value(&self, revision: &Revision, doc: &NodeDocument) -> Option<CommitValue> {
        commit::commit_value_in(self.store, doc, revision)
    }

    fn pending_modifications(&self) -> RevisionVector {
        self.pending.clone()
    }
}
