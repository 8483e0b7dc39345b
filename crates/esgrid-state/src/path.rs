//! Hierarchical path helpers.
//!
//! Paths are absolute and `/`-separated, with no empty segments and no
//! trailing slash. The root `/` itself is never stored.

use crate::error::{StateError, StateResult};

/// Validate `path` and return it in canonical form.
pub fn normalize(path: &str) -> StateResult<String> {
    if !path.starts_with('/') {
        return Err(StateError::InvalidPath(format!("{path}: must be absolute")));
    }
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(StateError::InvalidPath(format!("{path}: root is not a node")));
    }
    if trimmed[1..].split('/').any(str::is_empty) {
        return Err(StateError::InvalidPath(format!("{path}: empty segment")));
    }
    Ok(trimmed.to_string())
}

/// Proper ancestors of a canonical path, outermost first.
///
/// `/a/b/c` yields `["/a", "/a/b"]`.
pub fn ancestors(path: &str) -> Vec<String> {
    path.match_indices('/')
        .skip(1)
        .map(|(idx, _)| path[..idx].to_string())
        .collect()
}

/// Join a canonical parent path and a single child segment.
pub fn join(parent: &str, child: &str) -> String {
    format!("{}/{}", parent.trim_end_matches('/'), child.trim_matches('/'))
}
