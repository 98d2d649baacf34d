//! DocumentNodeState - the resolved view of a node at a read-point

use std::collections::BTreeMap;

use serde_json::Value;

use crate::revision::{Revision, RevisionVector};

/// A node as observed from one read-point: the latest visible value of
/// every property, plus the revision the state is current up to.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentNodeState {
    path: String,
    read_point: RevisionVector,
    properties: BTreeMap<String, Value>,
    last_revision: Option<Revision>,
}

impl DocumentNodeState {
    pub(crate) fn new(
        path: String,
        read_point: RevisionVector,
        properties: BTreeMap<String, Value>,
        last_revision: Option<Revision>,
    ) -> Self {
        Self {
            path,
            read_point,
            properties,
            last_revision,
        }
    }

    /// The node path.
    #[inline]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The read-point this state was resolved for.
    #[inline]
    pub fn read_point(&self) -> &RevisionVector {
        &self.read_point
    }

    /// The visible properties, keyed by their unescaped names.
    #[inline]
    pub fn properties(&self) -> &BTreeMap<String, Value> {
        &self.properties
    }

    /// The decoded value of one property.
    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    /// Convenience accessor for string-valued properties.
    pub fn string_property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).and_then(Value::as_str)
    }

    /// The newest revision this state reflects.
    #[inline]
    pub fn last_revision(&self) -> Option<&Revision> {
        self.last_revision.as_ref()
    }
}
