//! Lexical containment checks for workspace-relative paths.
//!
//! Paths are folded without touching the filesystem: `.` is dropped, `..`
//! pops one component, and the result must still have the root as a
//! component-wise prefix. Absolute inputs are never inside a root.

use std::path::{Component, Path, PathBuf};

use crate::error::AgentError;

/// Fold `.` and `..` components. `..` above the first component is kept out of the result
/// and reported as `None`.
pub fn normalize(path: &Path) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    let mut depth = 0usize;
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                if depth == 0 {
                    return None;
                }
                out.pop();
                depth -= 1;
            }
            Component::Normal(part) => {
                out.push(part);
                depth += 1;
            }
        }
    }
    Some(out)
}

/// Resolve `relative` against `root`, rejecting anything that lands outside it.
///
/// An empty or `.` path resolves to the root itself.
pub fn resolve_within(root: &Path, relative: &str) -> Result<PathBuf, AgentError> {
    let traversal = || AgentError::PathTraversal {
        path: relative.to_string(),
    };

    let candidate = Path::new(relative);
    if candidate.has_root() || candidate.is_absolute() {
        return Err(traversal());
    }

    let root = normalize(root).ok_or_else(traversal)?;
    let joined = normalize(&root.join(candidate)).ok_or_else(traversal)?;
    if !joined.starts_with(&root) {
        return Err(traversal());
    }
    Ok(joined)
}
