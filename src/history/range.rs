//! Range - coverage claim of one previous document
//!
//! A range `(high, low, height)` names the revision span a previous
//! document is responsible for. Both bounds belong to the same writer;
//! height 0 marks a leaf previous document and grows by one per
//! intermediate level. Ranges are persisted in `_prev` as
//! `high -> "low/height"`.

use std::fmt;

use crate::document::errors::{DocumentError, DocumentResult};
use crate::revision::Revision;

/// The revision span covered by one previous document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    high: Revision,
    low: Revision,
    height: u32,
}

impl Range {
    /// Creates a range. `high` and `low` must share a writer id and
    /// `low <= high` in stable order.
    pub fn new(high: Revision, low: Revision, height: u32) -> Self {
        assert_eq!(
            high.writer_id(),
            low.writer_id(),
            "range bounds must share a writer id"
        );
        assert!(!low.is_newer_than(&high), "range low must not exceed high");
        Self { high, low, height }
    }

    /// Parses the persisted `_prev` entry `high -> "low/height"`.
    pub fn parse(high: Revision, value: &str) -> DocumentResult<Self> {
        let (low, height) = value.rsplit_once('/').ok_or_else(|| {
            DocumentError::malformed(format!("previous entry without height: '{}'", value))
        })?;
        let low: Revision = low.parse()?;
        let height: u32 = height.parse().map_err(|_| {
            DocumentError::malformed(format!("non-numeric height in previous entry '{}'", value))
        })?;
        if low.writer_id() != high.writer_id() || low.is_newer_than(&high) {
            return Err(DocumentError::malformed(format!(
                "invalid previous range {} -> {}",
                high, value
            )));
        }
        Ok(Self { high, low, height })
    }

    /// The newest revision covered.
    #[inline]
    pub fn high(&self) -> &Revision {
        &self.high
    }

    /// The oldest revision covered.
    #[inline]
    pub fn low(&self) -> &Revision {
        &self.low
    }

    /// 0 for leaf previous documents, +1 per intermediate level.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// True iff `r` falls inside this range: same writer and
    /// `low <= r <= high` in stable order.
    pub fn includes(&self, r: &Revision) -> bool {
        r.writer_id() == self.high.writer_id()
            && !self.low.is_newer_than(r)
            && !r.is_newer_than(&self.high)
    }

    /// The persisted `_prev` entry value.
    pub fn entry_value(&self) -> String {
        format!("{}/{}", self.low, self.height)
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]/{}", self.high, self.low, self.height)
    }
}
