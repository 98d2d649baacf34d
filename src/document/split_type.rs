//! Split-document taxonomy
//!
//! A previous document carries a numeric `_sdType` tag identifying how it
//! was produced. The numeric codes are part of the persisted format and
//! must not change. Two historical codes (`DEFAULT_NO_CHILD`,
//! `PROP_COMMIT_ONLY`) are still read correctly but are never emitted.

use std::fmt;

/// The split-document type of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitDocType {
    /// Not a split document.
    None,
    /// Old-style default split document.
    Default,
    /// Historical code, read-only; never emitted.
    DefaultNoChild,
    /// Historical code, read-only; never emitted.
    PropCommitOnly,
    /// Points at other previous documents instead of carrying changes.
    Intermediate,
    /// Leaf split document carrying changes.
    DefaultLeaf,
    /// Leaf split document carrying only commit-root entries.
    CommitRootOnly,
    /// Leaf split document guaranteed to contain no branch commits.
    DefaultNoBranch,
}

impl SplitDocType {
    /// The persisted numeric code.
    pub fn value(&self) -> i64 {
        match self {
            SplitDocType::None => -1,
            SplitDocType::Default => 10,
            SplitDocType::DefaultNoChild => 20,
            SplitDocType::PropCommitOnly => 30,
            SplitDocType::Intermediate => 40,
            SplitDocType::DefaultLeaf => 50,
            SplitDocType::CommitRootOnly => 60,
            SplitDocType::DefaultNoBranch => 70,
        }
    }

    /// Decodes a persisted numeric code. Returns `None` for codes outside
    /// the taxonomy.
    pub fn from_value(value: i64) -> Option<Self> {
        match value {
            -1 => Some(SplitDocType::None),
            10 => Some(SplitDocType::Default),
            20 => Some(SplitDocType::DefaultNoChild),
            30 => Some(SplitDocType::PropCommitOnly),
            40 => Some(SplitDocType::Intermediate),
            50 => Some(SplitDocType::DefaultLeaf),
            60 => Some(SplitDocType::CommitRootOnly),
            70 => Some(SplitDocType::DefaultNoBranch),
            _ => None,
        }
    }

    /// True iff documents of this type point at other previous documents.
    #[inline]
    pub fn is_intermediate(&self) -> bool {
        matches!(self, SplitDocType::Intermediate)
    }

    /// True iff this code is only read for compatibility and never emitted.
    pub fn is_deprecated(&self) -> bool {
        matches!(
            self,
            SplitDocType::DefaultNoChild | SplitDocType::PropCommitOnly
        )
    }
}

impl fmt::Display for SplitDocType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}
