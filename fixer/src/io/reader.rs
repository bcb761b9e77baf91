//! Reads selected files from the repository working tree.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, instrument, warn};

use crate::core::types::FileContent;
use crate::error::AgentError;
use crate::io::fs_guard::confine;

/// Successful reads plus the number of paths that could not be read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadFiles {
    pub files: Vec<FileContent>,
    pub failed: usize,
}

#[derive(Debug, Clone)]
pub struct FileReader {
    repo_dir: PathBuf,
}

impl FileReader {
    pub fn new(repo_dir: impl Into<PathBuf>) -> Self {
        Self {
            repo_dir: repo_dir.into(),
        }
    }

    /// Read every path, tolerating individual failures as long as one read succeeds.
    #[instrument(skip_all, fields(requested = paths.len()))]
    pub fn read(&self, paths: &[String]) -> Result<ReadFiles, AgentError> {
        if paths.is_empty() {
            return Err(AgentError::InputValidation(
                "no file paths to read".to_string(),
            ));
        }

        let mut files = Vec::new();
        let mut errors = Vec::new();
        for path in paths {
            match read_one(&self.repo_dir, path) {
                Ok(content) => files.push(FileContent {
                    path: path.clone(),
                    content,
                }),
                Err(err) => {
                    warn!(path = %path, err = %err, "failed to read file");
                    errors.push(format!("{path}: {err}"));
                }
            }
        }

        if files.is_empty() {
            return Err(AgentError::NoFilesReadable(errors.join("; ")));
        }
        debug!(read = files.len(), failed = errors.len(), "read files");
        Ok(ReadFiles {
            files,
            failed: errors.len(),
        })
    }
}

fn read_one(repo_dir: &Path, path: &str) -> Result<String, String> {
    let resolved = confine(repo_dir, path).map_err(|err| err.to_string())?;
    if !resolved.exists() {
        return Err("file not found".to_string());
    }
    if !resolved.is_file() {
        return Err("not a regular file".to_string());
    }
    fs::read_to_string(&resolved).map_err(|err| err.to_string())
}
