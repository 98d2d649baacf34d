//! NodeDocument - the per-node record
//!
//! One document per content node, holding the node's entire (pre-split)
//! revision history: property mutations, deletion markers, and commit
//! bookkeeping. Instances are immutable after load ("sealed"); writers
//! change a node by emitting an `UpdateOp` through the store, after which
//! the in-memory instance is invalidated, not mutated.
//!
//! The only interior-mutable field is `last_check_time`, a cache-freshness
//! stamp readers may advance after independently confirming consistency.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::OnceLock;

use chrono::Utc;

use crate::history::PreviousIndex;
use crate::revision::RevisionMap;

use super::errors::{DocumentError, DocumentResult};
use super::id;
use super::keys;
use super::split_type::SplitDocType;
use super::value::{DocValue, Scalar};

static EMPTY_MAP: OnceLock<RevisionMap<String>> = OnceLock::new();
static NULL_DOCUMENT: OnceLock<NodeDocument> = OnceLock::new();

/// The per-node record of the hierarchical content store.
#[derive(Debug)]
pub struct NodeDocument {
    data: BTreeMap<String, DocValue>,
    created: i64,
    last_check_time: AtomicI64,
    sealed: bool,
}

impl NodeDocument {
    /// Creates an unsealed document from a parsed data map.
    pub fn from_data(data: BTreeMap<String, DocValue>) -> Self {
        let now = Utc::now().timestamp_millis();
        Self::with_created(data, now)
    }

    pub(crate) fn with_created(data: BTreeMap<String, DocValue>, created: i64) -> Self {
        Self {
            data,
            created,
            last_check_time: AtomicI64::new(created),
            sealed: false,
        }
    }

    /// The process-wide "document not found" sentinel.
    pub fn null_document() -> &'static NodeDocument {
        NULL_DOCUMENT.get_or_init(|| {
            let mut doc = NodeDocument::with_created(BTreeMap::new(), 0);
            doc.seal();
            doc
        })
    }

    /// True iff this is the not-found sentinel (or otherwise empty).
    pub fn is_null(&self) -> bool {
        self.data.is_empty()
    }

    /// Makes the document read-only.
    pub fn seal(&mut self) {
        self.sealed = true;
    }

    /// True once the document has been sealed.
    #[inline]
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    pub(crate) fn put(&mut self, key: impl Into<String>, value: DocValue) {
        assert!(!self.sealed, "document is sealed");
        self.data.insert(key.into(), value);
    }

    /// The underlying data map.
    #[inline]
    pub fn data(&self) -> &BTreeMap<String, DocValue> {
        &self.data
    }

    /// Looks up a raw value.
    #[inline]
    pub fn get(&self, key: &str) -> Option<&DocValue> {
        self.data.get(key)
    }

    fn scalar(&self, key: &str) -> Option<&Scalar> {
        self.data.get(key).and_then(DocValue::as_scalar)
    }

    /// The store primary key.
    pub fn doc_id(&self) -> Option<&str> {
        self.scalar(keys::ID).and_then(Scalar::as_str)
    }

    /// The node path: the `_path` field when present, otherwise derived
    /// from the id.
    pub fn path(&self) -> DocumentResult<String> {
        if let Some(path) = self.scalar(keys::PATH).and_then(Scalar::as_str) {
            return Ok(path.to_string());
        }
        let doc_id = self
            .doc_id()
            .ok_or_else(|| DocumentError::malformed("document without _id and _path"))?;
        id::path_from_id(doc_id).map(|(_, path)| path.to_string())
    }

    /// The path of the main document this record belongs to. For a main
    /// document this is its own path; for a previous document the anchor
    /// path is recovered from the previous-path encoding.
    pub fn main_path(&self) -> DocumentResult<String> {
        let path = self.path()?;
        if self.is_split_document() {
            id::main_path_from_previous(&path).ok_or_else(|| {
                DocumentError::malformed(format!("not a previous-document path: '{}'", path))
            })
        } else {
            Ok(path)
        }
    }

    // ==================
    // Local map accessors
    // ==================

    /// The local revision map stored under `key`; empty when absent or not
    /// a map.
    pub fn local_map(&self, key: &str) -> &RevisionMap<String> {
        self.data
            .get(key)
            .and_then(DocValue::as_map)
            .unwrap_or_else(|| EMPTY_MAP.get_or_init(RevisionMap::new))
    }

    /// The local `_revisions` map.
    #[inline]
    pub fn local_revisions(&self) -> &RevisionMap<String> {
        self.local_map(keys::REVISIONS)
    }

    /// The local `_commitRoot` map.
    #[inline]
    pub fn local_commit_root(&self) -> &RevisionMap<String> {
        self.local_map(keys::COMMIT_ROOT)
    }

    /// The local `_deleted` map.
    #[inline]
    pub fn local_deleted(&self) -> &RevisionMap<String> {
        self.local_map(keys::DELETED)
    }

    /// The keys of all (escaped) user properties present on this document.
    pub fn property_keys(&self) -> impl Iterator<Item = &str> {
        self.data
            .keys()
            .map(String::as_str)
            .filter(|k| keys::is_property_key(k))
    }

    // ==================
    // Bookkeeping accessors
    // ==================

    /// The coarse last-modified time in seconds, if recorded.
    pub fn modified(&self) -> Option<i64> {
        self.scalar(keys::MODIFIED).and_then(Scalar::as_int)
    }

    /// True iff the node was ever deleted.
    pub fn was_deleted_once(&self) -> bool {
        self.scalar(keys::DELETED_ONCE)
            .and_then(Scalar::as_bool)
            .unwrap_or(false)
    }

    /// True iff the node holds a binary property.
    pub fn has_binary(&self) -> bool {
        self.scalar(keys::HAS_BINARY).and_then(Scalar::as_int) == Some(keys::HAS_BINARY_VAL)
    }

    /// The recorded child-nodes flag, if any.
    pub fn children_flag(&self) -> Option<bool> {
        self.scalar(keys::CHILDREN).and_then(Scalar::as_bool)
    }

    /// The split-document type of this document. Fails fast when the
    /// stored code is outside the taxonomy.
    pub fn split_doc_type(&self) -> DocumentResult<SplitDocType> {
        match self.scalar(keys::SD_TYPE).and_then(Scalar::as_int) {
            None => Ok(SplitDocType::None),
            Some(value) => {
                SplitDocType::from_value(value).ok_or_else(|| DocumentError::InconsistentSplitType {
                    id: self.doc_id().unwrap_or_default().to_string(),
                    value,
                })
            }
        }
    }

    /// True iff this is a previous (split) document rather than a main one.
    pub fn is_split_document(&self) -> bool {
        match self.split_doc_type() {
            Ok(SplitDocType::None) => self.doc_id().is_some_and(id::is_previous_id),
            Ok(_) => true,
            // an inconsistent tag still marks a split document
            Err(_) => true,
        }
    }

    /// Upper bound on every revision timestamp contained in this previous
    /// document.
    pub fn sd_max_rev_time(&self) -> Option<i64> {
        self.scalar(keys::SD_MAX_REV_TIME).and_then(Scalar::as_int)
    }

    /// The effective previous-document index: `_prev` minus `_stalePrev`.
    pub fn previous_ranges(&self) -> DocumentResult<PreviousIndex> {
        PreviousIndex::from_document(self)
    }

    // ==================
    // Cache freshness
    // ==================

    /// Wall-clock ms when this instance was loaded.
    #[inline]
    pub fn created(&self) -> i64 {
        self.created
    }

    /// Wall-clock ms when a reader last confirmed consistency.
    pub fn last_check_time(&self) -> i64 {
        self.last_check_time.load(Ordering::Relaxed)
    }

    /// Advances the consistency stamp; never moves it backwards.
    pub fn mark_checked(&self, now_ms: i64) {
        self.last_check_time.fetch_max(now_ms, Ordering::Relaxed);
    }
}

impl Clone for NodeDocument {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            created: self.created,
            last_check_time: AtomicI64::new(self.last_check_time()),
            sealed: self.sealed,
        }
    }
}

impl PartialEq for NodeDocument {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

impl Eq for NodeDocument {}
