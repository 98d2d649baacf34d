//! Document error types
//!
//! Parse errors surface to the caller. A detected write conflict is an
//! expected outcome the caller retries or aborts on. Store I/O failures
//! pass through unchanged; no retry loop lives in this crate.

use thiserror::Error;

use crate::revision::MalformedRevision;
use crate::store::StoreError;
use crate::write::ConflictDetected;

/// Result type for document operations.
pub type DocumentResult<T> = Result<T, DocumentError>;

/// Errors produced by the document core.
#[derive(Debug, Error)]
pub enum DocumentError {
    // ==================
    // Parse Errors
    // ==================
    /// A revision string did not parse.
    #[error(transparent)]
    MalformedRevision(#[from] MalformedRevision),

    /// A serialized document did not parse.
    #[error("malformed document: {0}")]
    MalformedDocument(String),

    /// A split-type code outside the taxonomy was encountered in text form.
    #[error("malformed split type: {0}")]
    MalformedSplitType(i64),

    // ==================
    // Consistency Errors
    // ==================
    /// A loaded document carries an `_sdType` outside the taxonomy.
    #[error("inconsistent split type {value} on document '{id}'")]
    InconsistentSplitType { id: String, value: i64 },

    // ==================
    // Expected Outcomes
    // ==================
    /// A concurrent change conflicts with the update being committed.
    #[error(transparent)]
    Conflict(#[from] ConflictDetected),

    // ==================
    // Pass-Through
    // ==================
    /// Store I/O failure, surfaced unchanged.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl DocumentError {
    /// Create a malformed-document error.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedDocument(msg.into())
    }
}
