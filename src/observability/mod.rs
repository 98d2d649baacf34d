//! Observability
//!
//! This module provides:
//! - Structured logging (JSON lines)
//! - Rate-limited suppression of repeated warnings
//!
//! # Principles
//!
//! 1. Observability is read-only
//! 2. No side effects on execution
//! 3. No async or background threads
//! 4. Deterministic output

mod logger;
mod silencer;

pub use logger::{Logger, Severity};
pub use silencer::{previous_doc_silencer, WarnSilencer, MISSING_PREVIOUS_WARN_WINDOW_MS};
