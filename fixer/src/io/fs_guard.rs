//! Filesystem-aware containment: lexical check plus symlink resolution.

use std::path::{Path, PathBuf};

use tracing::warn;

use crate::core::path_guard::resolve_within;
use crate::error::AgentError;

/// Resolve `relative` under `root` and, when the target exists, make sure its
/// canonical form is still under the canonical root.
pub fn confine(root: &Path, relative: &str) -> Result<PathBuf, AgentError> {
    let resolved = resolve_within(root, relative)?;
    if !resolved.exists() {
        return Ok(resolved);
    }
    let canonical_root = root.canonicalize()?;
    let canonical = resolved.canonicalize()?;
    if !canonical.starts_with(&canonical_root) {
        warn!(path = relative, target = %canonical.display(), "path resolves outside root");
        return Err(AgentError::PathTraversal {
            path: relative.to_string(),
        });
    }
    Ok(resolved)
}
