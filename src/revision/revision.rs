//! Revision - totally ordered commit identifier per writer
//!
//! A revision is an immutable `(timestamp_ms, counter, writer_id)` triple
//! with a branch flag:
//! - The stable order compares the triple lexicographically and is the one
//!   order used for all revision-keyed map iteration.
//! - The derived `Ord` additionally breaks exact triple ties on the branch
//!   flag so that container ordering stays consistent with equality.
//! - The string form is `r<ts_hex>-<counter_hex>-<writer_hex>`, lowercase
//!   hex, with a leading `b` for branch revisions (`br...`). The `r`
//!   marker is not a hex digit, so a timestamp beginning with `b` can
//!   never be mistaken for the branch flag. Parsing is total: every
//!   string produced by `Display` parses back to an equal revision, and
//!   anything else is a `MalformedRevision` error.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Parse error for revision strings.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("malformed revision '{input}': {reason}")]
pub struct MalformedRevision {
    /// The rejected input.
    pub input: String,
    /// What was wrong with it.
    pub reason: &'static str,
}

impl MalformedRevision {
    fn new(input: &str, reason: &'static str) -> Self {
        Self {
            input: input.to_string(),
            reason,
        }
    }
}

/// A commit identifier issued by one writer.
///
/// Revisions are immutable. The branch flag marks commits that belong to an
/// unmerged branch lineage; it does not participate in the stable order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Revision {
    timestamp: i64,
    counter: u32,
    writer_id: u32,
    branch: bool,
}

impl Revision {
    /// Creates a trunk revision.
    pub fn new(timestamp: i64, counter: u32, writer_id: u32) -> Self {
        Self {
            timestamp,
            counter,
            writer_id,
            branch: false,
        }
    }

    /// Creates a branch revision.
    pub fn new_branch(timestamp: i64, counter: u32, writer_id: u32) -> Self {
        Self {
            timestamp,
            counter,
            writer_id,
            branch: true,
        }
    }

    /// The wall-clock millisecond component.
    #[inline]
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// The per-millisecond disambiguation counter.
    #[inline]
    pub fn counter(&self) -> u32 {
        self.counter
    }

    /// The id of the writer that issued this revision.
    #[inline]
    pub fn writer_id(&self) -> u32 {
        self.writer_id
    }

    /// Whether this revision belongs to a branch lineage.
    #[inline]
    pub fn is_branch(&self) -> bool {
        self.branch
    }

    /// Returns this revision with the branch flag cleared.
    #[inline]
    pub fn as_trunk(&self) -> Self {
        Self {
            branch: false,
            ..*self
        }
    }

    /// Returns this revision with the branch flag set.
    #[inline]
    pub fn as_branch(&self) -> Self {
        Self {
            branch: true,
            ..*self
        }
    }

    /// Compares on the stable order only: `(timestamp, counter, writer_id)`.
    ///
    /// The branch flag is ignored. Two revisions that differ only in the
    /// branch flag compare equal here.
    pub fn stable_cmp(&self, other: &Revision) -> Ordering {
        self.timestamp
            .cmp(&other.timestamp)
            .then(self.counter.cmp(&other.counter))
            .then(self.writer_id.cmp(&other.writer_id))
    }

    /// True iff `self` is strictly newer than `other` in the stable order.
    #[inline]
    pub fn is_newer_than(&self, other: &Revision) -> bool {
        self.stable_cmp(other) == Ordering::Greater
    }
}

impl PartialOrd for Revision {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Revision {
    fn cmp(&self, other: &Self) -> Ordering {
        // Stable order first; the branch flag only breaks exact triple ties
        // so Ord remains consistent with Eq.
        self.stable_cmp(other)
            .then(self.branch.cmp(&other.branch))
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.branch {
            write!(f, "b")?;
        }
        write!(
            f,
            "r{:x}-{:x}-{:x}",
            self.timestamp, self.counter, self.writer_id
        )
    }
}

impl FromStr for Revision {
    type Err = MalformedRevision;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (branch, rest) = match s.strip_prefix("br") {
            Some(rest) => (true, rest),
            None => match s.strip_prefix('r') {
                Some(rest) => (false, rest),
                None => return Err(MalformedRevision::new(s, "missing revision marker")),
            },
        };
        let mut parts = rest.split('-');
        let ts = parts
            .next()
            .ok_or_else(|| MalformedRevision::new(s, "missing timestamp"))?;
        let counter = parts
            .next()
            .ok_or_else(|| MalformedRevision::new(s, "missing counter"))?;
        let writer = parts
            .next()
            .ok_or_else(|| MalformedRevision::new(s, "missing writer id"))?;
        if parts.next().is_some() {
            return Err(MalformedRevision::new(s, "trailing input"));
        }
        if ts.is_empty() || counter.is_empty() || writer.is_empty() {
            return Err(MalformedRevision::new(s, "empty component"));
        }
        let timestamp = i64::from_str_radix(ts, 16)
            .map_err(|_| MalformedRevision::new(s, "invalid timestamp"))?;
        let counter = u32::from_str_radix(counter, 16)
            .map_err(|_| MalformedRevision::new(s, "invalid counter"))?;
        let writer_id = u32::from_str_radix(writer, 16)
            .map_err(|_| MalformedRevision::new(s, "invalid writer id"))?;
        Ok(Self {
            timestamp,
            counter,
            writer_id,
            branch,
        })
    }
}
