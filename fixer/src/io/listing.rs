//! Directory listing for the planner's `list_directory` tool.

use std::fs;
use std::path::PathBuf;

use tracing::{debug, instrument};

use crate::core::types::{DirEntry, EntryKind};
use crate::error::AgentError;
use crate::io::fs_guard::confine;

/// Lists immediate children of directories under a fixed root.
#[derive(Debug, Clone)]
pub struct DirectoryLister {
    root: PathBuf,
}

impl DirectoryLister {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Entries of `relative` sorted by name. Traversal outside the root is an error.
    #[instrument(skip_all, fields(path = relative))]
    pub fn list(&self, relative: &str) -> Result<Vec<DirEntry>, AgentError> {
        if relative.trim().is_empty() {
            return Err(AgentError::InputValidation(
                "list_directory requires a path".to_string(),
            ));
        }
        let dir = confine(&self.root, relative.trim())?;
        if !dir.is_dir() {
            return Err(AgentError::InputValidation(format!(
                "'{relative}' is not a directory"
            )));
        }

        let mut entries = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let kind = if entry.file_type()?.is_dir() {
                EntryKind::Directory
            } else {
                EntryKind::File
            };
            entries.push(DirEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                kind,
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        debug!(entries = entries.len(), "listed directory");
        Ok(entries)
    }
}
