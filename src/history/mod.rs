//! Document History
//!
//! This module provides:
//! - `Range` - coverage claim of one previous document
//! - `PreviousIndex` - descending index of previous documents
//! - `ValueMap` - merged view of a property across the full history

mod previous_index;
mod range;
mod value_map;

pub use previous_index::PreviousIndex;
pub use range::Range;
pub use value_map::{ValueMap, ValueMapIter, MISSING_PREVIOUS_EVICT_AGE_MS};
