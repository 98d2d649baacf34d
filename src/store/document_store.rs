//! DocumentStore - the consumed persistence interface
//!
//! The core never owns persistence. It consumes an abstract key/value
//! collection of documents with conditional map-level updates:
//! - `find` may perform an I/O round-trip and can block
//! - `find_and_update` applies an `UpdateOp` atomically, all-or-nothing
//! - `get_if_cached` / `invalidate_cache` expose the store's document cache
//!   for the dangling-previous-pointer eviction heuristic
//!
//! I/O failures are surfaced unchanged; no retry loop lives in the core.

use std::sync::Arc;

use thiserror::Error;

use crate::document::{NodeDocument, UpdateOp};

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Store-level failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// An I/O round-trip failed.
    #[error("store I/O failure: {0}")]
    Io(String),
}

impl StoreError {
    /// Create an I/O error.
    pub fn io(msg: impl Into<String>) -> Self {
        Self::Io(msg.into())
    }
}

/// The persistence collaborator consumed by the document core.
pub trait DocumentStore: Send + Sync {
    /// Loads the document with the given id, or `None` when absent.
    fn find(&self, id: &str) -> StoreResult<Option<Arc<NodeDocument>>>;

    /// Applies `op` conditionally and atomically.
    ///
    /// Returns the document as it was before the update, or `None` when the
    /// update did not apply (missing document, failed precondition, or
    /// creation of an id that already exists).
    fn find_and_update(&self, op: &UpdateOp) -> StoreResult<Option<Arc<NodeDocument>>>;

    /// Returns the cached instance for `id` without any I/O.
    fn get_if_cached(&self, id: &str) -> Option<Arc<NodeDocument>>;

    /// Drops the cached instance for `id`, if any.
    fn invalidate_cache(&self, id: &str);
}
