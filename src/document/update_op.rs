//! UpdateOp - the update-operation vocabulary
//!
//! Documents are never rewritten in place: a writer describes its change as
//! an `UpdateOp` and asks the store to apply it with conditional map-level
//! semantics. The vocabulary is deliberately small:
//! - `SET(key, scalar)` / `MAX(key, long)` for scalar fields
//! - `SET_MAP_ENTRY` / `REMOVE_MAP_ENTRY` / `UNSET_MAP_ENTRY` for
//!   revision-keyed maps (unset is a tombstone distinct from remove, for
//!   concurrent-commit ordering at the store level)
//! - `EQUALS(key, revision, value)` as a precondition
//!
//! The helper constructors below are the only way bookkeeping keys are
//! written; they encode the persisted formats in one place.

use std::collections::BTreeMap;

use crate::commit::CommitValue;
use crate::history::Range;
use crate::revision::Revision;

use super::keys;
use super::value::Scalar;

/// Seconds resolution of `_modified`: floor to 5-second buckets.
pub const MODIFIED_IN_SECS_RESOLUTION: i64 = 5;

/// The `_modified` value for a revision timestamp.
pub fn modified_value(timestamp_ms: i64) -> i64 {
    timestamp_ms / 1000 / MODIFIED_IN_SECS_RESOLUTION * MODIFIED_IN_SECS_RESOLUTION
}

/// Addresses one scalar field or one map entry of a document.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct UpdateKey {
    name: String,
    revision: Option<Revision>,
}

impl UpdateKey {
    /// A scalar field key.
    pub fn scalar(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            revision: None,
        }
    }

    /// A map entry key.
    pub fn map_entry(name: impl Into<String>, revision: Revision) -> Self {
        Self {
            name: name.into(),
            revision: Some(revision),
        }
    }

    /// The document key this addresses.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The map-entry revision, `None` for scalar fields.
    #[inline]
    pub fn revision(&self) -> Option<&Revision> {
        self.revision.as_ref()
    }
}

/// One operation against an [`UpdateKey`].
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Write a scalar field.
    Set(Scalar),
    /// Set a numeric field to the maximum of its current value and this.
    Max(i64),
    /// Add or replace a map entry.
    SetMapEntry(String),
    /// Delete a map entry.
    RemoveMapEntry,
    /// Tombstone a map entry. Applies like a removal; stores that order
    /// concurrent commits treat it differently from a plain remove.
    UnsetMapEntry,
    /// Precondition: the map entry must equal this value.
    Equals(String),
}

/// A conditional update against one document.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateOp {
    id: String,
    is_new: bool,
    changes: BTreeMap<UpdateKey, Operation>,
}

impl UpdateOp {
    /// Creates an update for the document `id`. `is_new` marks a creation:
    /// application fails if the document already exists.
    pub fn new(id: impl Into<String>, is_new: bool) -> Self {
        Self {
            id: id.into(),
            is_new,
            changes: BTreeMap::new(),
        }
    }

    /// The target document id.
    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// True iff this op creates the document.
    #[inline]
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    /// All changes, keyed by field/entry.
    #[inline]
    pub fn changes(&self) -> &BTreeMap<UpdateKey, Operation> {
        &self.changes
    }

    // ==================
    // Raw vocabulary
    // ==================

    /// `SET(key, scalar)`
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Scalar>) -> &mut Self {
        self.changes
            .insert(UpdateKey::scalar(key), Operation::Set(value.into()));
        self
    }

    /// `MAX(key, long)`
    pub fn max(&mut self, key: impl Into<String>, value: i64) -> &mut Self {
        self.changes
            .insert(UpdateKey::scalar(key), Operation::Max(value));
        self
    }

    /// `SET_MAP_ENTRY(key, revision, value)`
    pub fn set_map_entry(
        &mut self,
        key: impl Into<String>,
        revision: Revision,
        value: impl Into<String>,
    ) -> &mut Self {
        self.changes.insert(
            UpdateKey::map_entry(key, revision),
            Operation::SetMapEntry(value.into()),
        );
        self
    }

    /// `REMOVE_MAP_ENTRY(key, revision)`
    pub fn remove_map_entry(&mut self, key: impl Into<String>, revision: Revision) -> &mut Self {
        self.changes
            .insert(UpdateKey::map_entry(key, revision), Operation::RemoveMapEntry);
        self
    }

    /// `UNSET_MAP_ENTRY(key, revision)`
    pub fn unset_map_entry(&mut self, key: impl Into<String>, revision: Revision) -> &mut Self {
        self.changes
            .insert(UpdateKey::map_entry(key, revision), Operation::UnsetMapEntry);
        self
    }

    /// `EQUALS(key, revision, value)` precondition
    pub fn equals(
        &mut self,
        key: impl Into<String>,
        revision: Revision,
        value: impl Into<String>,
    ) -> &mut Self {
        self.changes.insert(
            UpdateKey::map_entry(key, revision),
            Operation::Equals(value.into()),
        );
        self
    }

    // ==================
    // Bookkeeping helpers
    // ==================

    /// Records the commit value of a revision.
    pub fn set_revision(&mut self, revision: Revision, commit_value: &CommitValue) -> &mut Self {
        self.set_map_entry(keys::REVISIONS, revision, commit_value.to_string())
    }

    /// Tombstones a `_revisions` entry.
    pub fn unset_revision(&mut self, revision: Revision) -> &mut Self {
        self.unset_map_entry(keys::REVISIONS, revision)
    }

    /// Removes a `_revisions` entry.
    pub fn remove_revision(&mut self, revision: Revision) -> &mut Self {
        self.remove_map_entry(keys::REVISIONS, revision)
    }

    /// Records the commit-root depth for a revision.
    pub fn set_commit_root(&mut self, revision: Revision, depth: u32) -> &mut Self {
        self.set_map_entry(keys::COMMIT_ROOT, revision, depth.to_string())
    }

    /// Removes a `_commitRoot` entry.
    pub fn remove_commit_root(&mut self, revision: Revision) -> &mut Self {
        self.remove_map_entry(keys::COMMIT_ROOT, revision)
    }

    /// Tombstones a `_commitRoot` entry.
    pub fn unset_commit_root(&mut self, revision: Revision) -> &mut Self {
        self.unset_map_entry(keys::COMMIT_ROOT, revision)
    }

    /// Records a node existence change. Deleting also sets `_deletedOnce`.
    pub fn set_deleted(&mut self, revision: Revision, deleted: bool) -> &mut Self {
        self.set_map_entry(keys::DELETED, revision, deleted.to_string());
        if deleted {
            self.set(keys::DELETED_ONCE, true);
        }
        self
    }

    /// Links a previous document by its range.
    pub fn set_previous(&mut self, range: &Range) -> &mut Self {
        self.set_map_entry(keys::PREVIOUS, *range.high(), range.entry_value())
    }

    /// Unlinks the previous document anchored at `high`.
    pub fn remove_previous(&mut self, high: Revision) -> &mut Self {
        self.remove_map_entry(keys::PREVIOUS, high)
    }

    /// Marks the previous entry anchored at `high` as stale at `height`.
    pub fn set_stale_previous(&mut self, high: Revision, height: u32) -> &mut Self {
        self.set_map_entry(keys::STALE_PREV, high, height.to_string())
    }

    /// Marks a revision as a branch commit.
    pub fn set_branch_commit(&mut self, revision: Revision) -> &mut Self {
        self.set_map_entry(keys::BRANCH_COMMITS, revision, "true")
    }

    /// Removes a branch commit marker.
    pub fn remove_branch_commit(&mut self, revision: Revision) -> &mut Self {
        self.remove_map_entry(keys::BRANCH_COMMITS, revision)
    }

    /// Flags the node as holding a binary property.
    pub fn set_has_binary(&mut self) -> &mut Self {
        self.set(keys::HAS_BINARY, keys::HAS_BINARY_VAL)
    }

    /// Records whether the node has child nodes.
    pub fn set_children_flag(&mut self, has_children: bool) -> &mut Self {
        self.set(keys::CHILDREN, has_children)
    }

    /// Records the writer's last written revision under the placeholder key
    /// `(0, 0, writer_id)`.
    pub fn set_last_rev(&mut self, revision: Revision) -> &mut Self {
        self.set_map_entry(
            keys::LAST_REV,
            Revision::new(0, 0, revision.writer_id()),
            revision.to_string(),
        )
    }

    /// Records the writer's sweep revision under the placeholder key
    /// `(0, 0, writer_id)`. The placeholder is part of the persisted format.
    pub fn set_sweep_rev(&mut self, revision: Revision) -> &mut Self {
        self.set_map_entry(
            keys::SWEEP_REV,
            Revision::new(0, 0, revision.writer_id()),
            revision.to_string(),
        )
    }

    /// Advances `_modified` for the revision's timestamp. `MAX` keeps the
    /// field monotonic under concurrent writers.
    pub fn set_modified(&mut self, revision: Revision) -> &mut Self {
        self.max(keys::MODIFIED, modified_value(revision.timestamp()))
    }

    // ==================
    // Interrogators
    // ==================

    /// True iff this op records a node deletion.
    pub fn is_delete(&self) -> bool {
        self.changes.iter().any(|(key, op)| {
            key.name() == keys::DELETED && matches!(op, Operation::SetMapEntry(v) if v == "true")
        })
    }

    /// True iff any change touches a user-visible property.
    pub fn modifies_user_properties(&self) -> bool {
        self.changes
            .keys()
            .any(|key| keys::is_property_key(key.name()))
    }
}
