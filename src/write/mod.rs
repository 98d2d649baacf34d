//! Write-Side Checks
//!
//! This module provides:
//! - `check_conflicts` - pre-commit conflict detection
//! - `newest_revision` - newest visible revision plus collision collection
//! - `Collision` - persisted collision markers

mod collision;
mod conflict;
mod newest;

pub use collision::Collision;
pub use conflict::{check_conflicts, ConflictDetected};
pub use newest::newest_revision;
