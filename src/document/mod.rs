//! Node Document Façade
//!
//! This module provides:
//! - `NodeDocument` - the per-node record
//! - `UpdateOp` - the update-operation vocabulary and its helpers
//! - `SplitDocType` - the split-document taxonomy
//! - system keys, document id encoding, and the textual form

pub mod errors;
pub mod id;
pub mod keys;
mod node_document;
mod serialization;
mod split_type;
mod update_op;
mod value;

pub use errors::{DocumentError, DocumentResult};
pub use node_document::NodeDocument;
pub use serialization::{from_json_str, to_json_string};
pub use split_type::SplitDocType;
pub use update_op::{modified_value, Operation, UpdateKey, UpdateOp, MODIFIED_IN_SECS_RESOLUTION};
pub use value::{DocValue, Scalar};
