//! Test-only doubles: scripted model replies and throwaway workspaces.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tempfile::TempDir;

use crate::io::git::Git;
use crate::io::inference::Inference;
use crate::io::workspace::Workspace;

/// Inference double that replays queued replies in order and records every prompt.
///
/// Running out of replies is an inference failure, like a crashed model command.
#[derive(Debug, Default)]
pub struct ScriptedInference {
    replies: RefCell<VecDeque<String>>,
    prompts: RefCell<Vec<String>>,
}

impl ScriptedInference {
    pub fn new(replies: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            replies: RefCell::new(replies.into_iter().map(Into::into).collect()),
            prompts: RefCell::new(Vec::new()),
        }
    }

    /// Prompts received so far, oldest first.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.borrow().clone()
    }

    pub fn remaining(&self) -> usize {
        self.replies.borrow().len()
    }
}

impl Inference for ScriptedInference {
    fn infer(&self, prompt: &str) -> Result<String> {
        self.prompts.borrow_mut().push(prompt.to_string());
        self.replies
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| anyhow!("scripted inference has no replies left"))
    }
}

/// Temporary workspace whose `repo/` is an initialized git repository.
pub struct TestWorkspace {
    _temp: TempDir,
    workspace: Workspace,
}

impl TestWorkspace {
    /// # Panics
    /// Panics if the temp dir or `git init` fails.
    pub fn new() -> Self {
        Self::try_new().expect("test workspace")
    }

    pub fn try_new() -> Result<Self> {
        let temp = tempfile::tempdir().context("create tempdir")?;
        let workspace = Workspace::new(temp.path().join("ws"));
        let repo_dir = workspace.repo_dir();
        fs::create_dir_all(&repo_dir)
            .with_context(|| format!("create {}", repo_dir.display()))?;
        Git::new(&repo_dir, Duration::from_secs(30), 64 * 1024).init()?;
        Ok(Self {
            _temp: temp,
            workspace,
        })
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn root(&self) -> &Path {
        self.workspace.root()
    }

    pub fn repo_dir(&self) -> PathBuf {
        self.workspace.repo_dir()
    }

    /// Write `contents` to `repo/<relative>`, creating parent directories.
    ///
    /// # Panics
    /// Panics on any filesystem error.
    pub fn write_repo_file(&self, relative: &str, contents: &str) {
        let path = self.repo_dir().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dirs");
        }
        fs::write(&path, contents).expect("write repo file");
    }

    /// # Panics
    /// Panics if the file is missing or not UTF-8.
    pub fn read_repo_file(&self, relative: &str) -> String {
        fs::read_to_string(self.repo_dir().join(relative)).expect("read repo file")
    }
}

impl Default for TestWorkspace {
    fn default() -> Self {
        Self::new()
    }
}
