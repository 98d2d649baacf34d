//! Document Splitting
//!
//! This module provides:
//! - the split thresholds (revision count, sizes, fan-out)
//! - `split_operations` - the update operations that move history into
//!   previous documents

mod splitter;

pub use splitter::{
    needs_split, split_operations, DOC_SIZE_THRESHOLD, NUM_REVS_THRESHOLD, PREV_SPLIT_FACTOR,
    SPLIT_CANDIDATE_THRESHOLD,
};
