//! I/O adapters: filesystem, subprocesses, inference, persistence.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

pub mod applier;
pub mod attempt_log;
pub mod config;
pub mod fs_guard;
pub mod git;
pub mod inference;
pub mod issue_source;
pub mod listing;
pub mod process;
pub mod prompt;
pub mod reader;
pub mod task_store;
pub mod workspace;

/// Name of the per-workspace bookkeeping directory.
pub const STATE_DIR: &str = ".fixer";

/// Write `contents` next to `path` and rename over it.
pub(crate) fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let mut tmp_name = path
        .file_name()
        .with_context(|| format!("path missing file name {}", path.display()))?
        .to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = parent.join(tmp_name);
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp file {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace {}", path.display()))?;
    Ok(())
}
