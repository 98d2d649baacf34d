//! System keys of a node document
//!
//! Document keys fall into two disjoint classes: system keys (bookkeeping,
//! enumerated here) and property keys (escaped user property names). The
//! store primary key `_id` sits outside both classes.

/// Store primary key of every document.
pub const ID: &str = "_id";

/// Coarse last-modified time, seconds, 5-second resolution.
pub const MODIFIED: &str = "_modified";
/// Commit values keyed by revision.
pub const REVISIONS: &str = "_revisions";
/// Commit-root depth markers keyed by revision.
pub const COMMIT_ROOT: &str = "_commitRoot";
/// Node existence markers keyed by revision ("false" = live).
pub const DELETED: &str = "_deleted";
/// Set once the node has ever been deleted.
pub const DELETED_ONCE: &str = "_deletedOnce";
/// Per-writer last written revision, keyed by a placeholder revision.
pub const LAST_REV: &str = "_lastRev";
/// Whether the node has (or ever had) child nodes.
pub const CHILDREN: &str = "_children";
/// Path of the node; overrides derivation from the id.
pub const PATH: &str = "_path";
/// Set to 1 once the node holds a binary property.
pub const HAS_BINARY: &str = "_bin";
/// Previous-document ranges: high revision -> "low/height".
pub const PREVIOUS: &str = "_prev";
/// Stale previous markers: high revision -> height.
pub const STALE_PREV: &str = "_stalePrev";
/// Branch commit markers keyed by revision.
pub const BRANCH_COMMITS: &str = "_bc";
/// Sweep revision, keyed by a placeholder revision.
pub const SWEEP_REV: &str = "_sweepRev";
/// Split-document type tag.
pub const SD_TYPE: &str = "_sdType";
/// Upper bound on every revision contained in a previous document.
pub const SD_MAX_REV_TIME: &str = "_sdMaxRevTime";
/// Collision markers keyed by revision.
pub const COLLISIONS: &str = "_collisions";

/// Value stored under [`HAS_BINARY`] when a binary is present.
pub const HAS_BINARY_VAL: i64 = 1;

const SYSTEM_KEYS: [&str; 16] = [
    MODIFIED,
    REVISIONS,
    COMMIT_ROOT,
    DELETED,
    DELETED_ONCE,
    LAST_REV,
    CHILDREN,
    PATH,
    HAS_BINARY,
    PREVIOUS,
    STALE_PREV,
    BRANCH_COMMITS,
    SWEEP_REV,
    SD_TYPE,
    SD_MAX_REV_TIME,
    COLLISIONS,
];

/// True iff `key` is one of the bookkeeping keys.
pub fn is_system_key(key: &str) -> bool {
    SYSTEM_KEYS.contains(&key)
}

/// True iff `key` holds an (escaped) user property map.
pub fn is_property_key(key: &str) -> bool {
    key != ID && !is_system_key(key)
}

/// Escapes a user property name for storage.
///
/// Names beginning with `_` would be ambiguous with system keys, so the
/// leading underscore is doubled. All other names are stored verbatim.
pub fn escape_property_name(name: &str) -> String {
    if let Some(rest) = name.strip_prefix('_') {
        format!("__{}", rest)
    } else {
        name.to_string()
    }
}

/// Inverse of [`escape_property_name`].
pub fn unescape_property_name(key: &str) -> String {
    if let Some(rest) = key.strip_prefix("__") {
        format!("_{}", rest)
    } else {
        key.to_string()
    }
}
