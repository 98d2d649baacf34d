//! CommitValue - decoded commit state of a revision
//!
//! The store keeps the commit state of a revision as a short string under
//! `_revisions[r]`:
//! - `"c"` - committed on trunk at `r`
//! - `"c-<rev>"` - branch commit, merged into trunk at `<rev>`
//! - `"b<rev>"` - branch commit, not yet merged, branch base `<rev>`
//!
//! The stringly-typed form is parsed exactly once at the store boundary
//! into this tagged variant; everything above works on the variant.

use std::fmt;
use std::str::FromStr;

use crate::revision::{MalformedRevision, Revision};

/// The decoded commit state stored for a revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitValue {
    /// Committed on trunk; the commit revision is the revision itself.
    Trunk,
    /// A branch commit that has been merged; carries the merge revision.
    MergedBranch(Revision),
    /// A branch commit that has not been merged; carries the branch base.
    UnmergedBranch(Revision),
}

impl CommitValue {
    /// True iff the revision is committed (trunk or merged branch).
    #[inline]
    pub fn is_committed(&self) -> bool {
        matches!(self, CommitValue::Trunk | CommitValue::MergedBranch(_))
    }

    /// Resolves the revision at which a change becomes visible.
    ///
    /// - trunk commit: the change revision itself
    /// - merged branch commit: the merge revision
    /// - unmerged branch commit: the change revision, branch-tagged
    pub fn resolve_commit_revision(&self, revision: &Revision) -> Revision {
        match self {
            CommitValue::Trunk => *revision,
            CommitValue::MergedBranch(merge) => *merge,
            CommitValue::UnmergedBranch(_) => revision.as_branch(),
        }
    }
}

impl fmt::Display for CommitValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommitValue::Trunk => write!(f, "c"),
            CommitValue::MergedBranch(merge) => write!(f, "c-{}", merge),
            CommitValue::UnmergedBranch(base) => write!(f, "b{}", base),
        }
    }
}

impl FromStr for CommitValue {
    type Err = MalformedRevision;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "c" {
            Ok(CommitValue::Trunk)
        } else if let Some(rest) = s.strip_prefix("c-") {
            Ok(CommitValue::MergedBranch(rest.parse()?))
        } else if let Some(rest) = s.strip_prefix('b') {
            Ok(CommitValue::UnmergedBranch(rest.parse()?))
        } else {
            Err(MalformedRevision {
                input: s.to_string(),
                reason: "not a commit value",
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rev(ts: i64) -> Revision {
        Revision::new(ts, 0, 1)
    }

    #[test]
    fn test_parse_trunk() {
        let cv: CommitValue = "c".parse().unwrap();
        assert_eq!(cv, CommitValue::Trunk);
        assert!(cv.is_committed());
    }

    #[test]
    fn test_parse_merged_branch() {
        let merge = rev(42);
        let cv: CommitValue = format!("c-{}", merge).parse().unwrap();
        assert_eq!(cv, CommitValue::MergedBranch(merge));
        assert!(cv.is_committed());
    }

    #[test]
    fn test_parse_unmerged_branch() {
        let base = rev(7);
        let cv: CommitValue = format!("b{}", base).parse().unwrap();
        assert_eq!(cv, CommitValue::UnmergedBranch(base));
        assert!(!cv.is_committed());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for input in ["", "x", "c-", "cb", "c-zz", "b"] {
            assert!(input.parse::<CommitValue>().is_err(), "accepted '{}'", input);
        }
    }

    #[test]
    fn test_resolve_commit_revision() {
        let r = rev(10);
        assert_eq!(CommitValue::Trunk.resolve_commit_revision(&r), r);
        assert_eq!(
            CommitValue::MergedBranch(rev(20)).resolve_commit_revision(&r),
            rev(20)
        );
        let resolved = CommitValue::UnmergedBranch(rev(5)).resolve_commit_revision(&r);
        assert!(resolved.is_branch());
        assert_eq!(resolved.as_trunk(), r);
    }

    #[test]
    fn test_string_roundtrip() {
        for cv in [
            CommitValue::Trunk,
            CommitValue::MergedBranch(rev(1)),
            CommitValue::UnmergedBranch(rev(2)),
        ] {
            let parsed: CommitValue = cv.to_string().parse().unwrap();
            assert_eq!(cv, parsed);
        }
    }
}
