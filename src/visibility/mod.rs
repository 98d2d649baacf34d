//! Read-Side Visibility
//!
//! This module provides:
//! - the visibility rules for revisions against a read-point
//! - `latest_value` and the local-map shortcut gate
//! - `node_at_revision` - the resolved node state at a read-point

mod engine;
mod node_state;

pub use engine::{
    is_live_at, is_most_recent_committed, is_visible, latest_value, latest_visible,
    node_at_revision, requires_complete_map_check,
};
pub use node_state::DocumentNodeState;
