//! Document id and path encoding
//!
//! Main documents are identified by `<depth>:<path>`. Previous documents
//! hang off a main document and use `<depth+2>:p<main-path>/<high>/<height>`
//! (with the root path collapsing to `p/<high>/<height>`); their path
//! strings always begin with `p`. The `_path` field overrides derivation
//! from the id when present.

use crate::revision::Revision;

use super::errors::{DocumentError, DocumentResult};

/// Smallest possible document id value.
pub const MIN_ID_VALUE: &str = "0000000";
/// Largest possible document id value.
pub const MAX_ID_VALUE: &str = ";";

/// Number of name segments in an absolute path. The root path has depth 0.
pub fn path_depth(path: &str) -> usize {
    if path == "/" {
        0
    } else {
        path.matches('/').count()
    }
}

/// The id of the main document for a node path.
pub fn id_from_path(path: &str) -> String {
    format!("{}:{}", path_depth(path), path)
}

/// Splits an id into its depth prefix and path part.
pub fn path_from_id(id: &str) -> DocumentResult<(usize, &str)> {
    let (depth, path) = id
        .split_once(':')
        .ok_or_else(|| DocumentError::malformed(format!("id without depth prefix: '{}'", id)))?;
    let depth = depth
        .parse::<usize>()
        .map_err(|_| DocumentError::malformed(format!("non-numeric depth in id '{}'", id)))?;
    Ok((depth, path))
}

/// The path of the previous document for `main_path` anchored at `high`.
pub fn previous_path_for(main_path: &str, high: &Revision, height: u32) -> String {
    if main_path == "/" {
        format!("p/{}/{}", high, height)
    } else {
        format!("p{}/{}/{}", main_path, high, height)
    }
}

/// The id of the previous document for `main_path` anchored at `high`.
pub fn previous_id_for(main_path: &str, high: &Revision, height: u32) -> String {
    format!(
        "{}:{}",
        path_depth(main_path) + 2,
        previous_path_for(main_path, high, height)
    )
}

/// True iff `id` identifies a previous document.
pub fn is_previous_id(id: &str) -> bool {
    match id.split_once(':') {
        Some((_, path)) => path.starts_with("p/"),
        None => false,
    }
}

/// Recovers the main-document path from a previous-document path.
pub fn main_path_from_previous(path: &str) -> Option<String> {
    let rest = path.strip_prefix('p')?;
    // strip the trailing "/<high>/<height>" segments
    let mut parts = rest.rsplitn(3, '/');
    let _height = parts.next()?;
    let _high = parts.next()?;
    match parts.next() {
        Some("") | None => Some("/".to_string()),
        Some(main) => Some(main.to_string()),
    }
}

/// True iff any segment of `path` is hidden (starts with `:`).
pub fn is_hidden_path(path: &str) -> bool {
    path.split('/').any(|segment| segment.starts_with(':'))
}
