//! In-memory document store
//!
//! The reference implementation of [`DocumentStore`]: a map of raw data
//! maps guarded by a lock, with the `UpdateOp` application semantics the
//! core assumes from any real backend. Serves the test suites and small
//! embedded deployments.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::document::{keys, DocValue, NodeDocument, Operation, UpdateOp};
use crate::revision::RevisionMap;

use super::document_store::{DocumentStore, StoreResult};

/// A [`DocumentStore`] backed by process memory.
#[derive(Default)]
pub struct MemoryDocumentStore {
    documents: RwLock<BTreeMap<String, BTreeMap<String, DocValue>>>,
    cache: RwLock<HashMap<String, Arc<NodeDocument>>>,
}

impl MemoryDocumentStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents held.
    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    /// True iff the store holds no documents.
    pub fn is_empty(&self) -> bool {
        self.documents.read().is_empty()
    }

    fn seal_snapshot(data: &BTreeMap<String, DocValue>) -> Arc<NodeDocument> {
        let mut doc = NodeDocument::from_data(data.clone());
        doc.seal();
        Arc::new(doc)
    }

    fn preconditions_hold(data: &BTreeMap<String, DocValue>, op: &UpdateOp) -> bool {
        for (key, operation) in op.changes() {
            if let Operation::Equals(expected) = operation {
                let revision = match key.revision() {
                    Some(r) => r,
                    None => return false,
                };
                let actual = data
                    .get(key.name())
                    .and_then(DocValue::as_map)
                    .and_then(|map| map.get(revision));
                if actual != Some(expected) {
                    return false;
                }
            }
        }
        true
    }

    fn apply(data: &mut BTreeMap<String, DocValue>, op: &UpdateOp) {
        for (key, operation) in op.changes() {
            match operation {
                Operation::Set(scalar) => {
                    data.insert(key.name().to_string(), DocValue::Scalar(scalar.clone()));
                }
                Operation::Max(value) => {
                    let current = data
                        .get(key.name())
                        .and_then(DocValue::as_scalar)
                        .and_then(|s| s.as_int());
                    let next = current.map_or(*value, |c| c.max(*value));
                    data.insert(key.name().to_string(), next.into());
                }
                Operation::SetMapEntry(value) => {
                    let revision = match key.revision() {
                        Some(r) => *r,
                        None => continue,
                    };
                    let entry = data
                        .entry(key.name().to_string())
                        .or_insert_with(|| DocValue::Map(RevisionMap::new()));
                    if let Some(map) = entry.as_map_mut() {
                        map.insert(revision, value.clone());
                    }
                }
                // unset is a tombstone at the wire level; in memory both
                // collapse to entry removal
                Operation::RemoveMapEntry | Operation::UnsetMapEntry => {
                    let revision = match key.revision() {
                        Some(r) => r,
                        None => continue,
                    };
                    let emptied = match data.get_mut(key.name()).and_then(DocValue::as_map_mut) {
                        Some(map) => {
                            map.remove(revision);
                            map.is_empty()
                        }
                        None => false,
                    };
                    if emptied {
                        data.remove(key.name());
                    }
                }
                Operation::Equals(_) => {}
            }
        }
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn find(&self, id: &str) -> StoreResult<Option<Arc<NodeDocument>>> {
        if let Some(cached) = self.cache.read().get(id) {
            return Ok(Some(Arc::clone(cached)));
        }
        let documents = self.documents.read();
        match documents.get(id) {
            Some(data) => {
                let doc = Self::seal_snapshot(data);
                self.cache
                    .write()
                    .insert(id.to_string(), Arc::clone(&doc));
                Ok(Some(doc))
            }
            None => Ok(None),
        }
    }

    fn find_and_update(&self, op: &UpdateOp) -> StoreResult<Option<Arc<NodeDocument>>> {
        let mut documents = self.documents.write();
        let exists = documents.contains_key(op.id());
        if op.is_new() && exists {
            return Ok(None);
        }
        if !op.is_new() && !exists {
            return Ok(None);
        }
        // check preconditions before touching the collection so a failed
        // creation leaves no scaffold behind
        let precondition_target = documents.get(op.id()).cloned().unwrap_or_default();
        if !Self::preconditions_hold(&precondition_target, op) {
            return Ok(None);
        }
        let data = documents.entry(op.id().to_string()).or_insert_with(|| {
            let mut data = BTreeMap::new();
            data.insert(keys::ID.to_string(), op.id().into());
            data
        });
        let before = Self::seal_snapshot(data);
        Self::apply(data, op);
        self.cache.write().remove(op.id());
        Ok(Some(before))
    }

    fn get_if_cached(&self, id: &str) -> Option<Arc<NodeDocument>> {
        self.cache.read().get(id).map(Arc::clone)
    }

    fn invalidate_cache(&self, id: &str) {
        self.cache.write().remove(id);
    }
}
