//! Workspace layout, repository checkout, and indexing.
//!
//! A workspace is a task-exclusive directory holding the working tree under
//! `repo/` and bookkeeping under `.fixer/`.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result, anyhow};
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument, warn};
use walkdir::WalkDir;

use crate::core::issue::IssueRef;
use crate::core::repo_tree::{RepoNode, RepositoryTree, is_ignored_dir};
use crate::io::STATE_DIR;
use crate::io::config::PatchToolConfig;
use crate::io::git::Git;

/// Name of the working-tree directory inside a workspace.
pub const REPO_DIR: &str = "repo";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `<base>/<workspace id of task_id>`.
    pub fn for_task(base: &Path, task_id: &str) -> Self {
        Self::new(base.join(workspace_id(task_id)))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn repo_dir(&self) -> PathBuf {
        self.root.join(REPO_DIR)
    }

    pub fn state_dir(&self) -> PathBuf {
        self.root.join(STATE_DIR)
    }

    /// Index `repo/`, failing if it is missing or empty.
    pub fn index(&self) -> Result<RepositoryTree> {
        index_repository(&self.repo_dir())
    }
}

/// Stable directory name for a task: `t_` plus the first 8 hex digits of its SHA-256.
pub fn workspace_id(task_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(task_id.as_bytes());
    let digest = hasher.finalize();
    format!("t_{}", hex::encode(&digest[..4]))
}

static TASK_SEQ: AtomicU64 = AtomicU64::new(0);

/// Fresh task id for one run against `issue`: `owner/repo#n-<8 hex>`.
///
/// The suffix differs between runs, so each run of the same issue gets its own workspace.
pub fn new_task_id(issue: &IssueRef) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(issue.to_string().as_bytes());
    hasher.update(nanos.to_le_bytes());
    hasher.update(std::process::id().to_le_bytes());
    hasher.update(TASK_SEQ.fetch_add(1, Ordering::Relaxed).to_le_bytes());
    let digest = hasher.finalize();
    format!("{issue}-{}", hex::encode(&digest[..4]))
}

/// Walk `repo_dir` into a name-sorted tree, skipping ignored directories.
#[instrument(skip_all, fields(repo = %repo_dir.display()))]
pub fn index_repository(repo_dir: &Path) -> Result<RepositoryTree> {
    if !repo_dir.is_dir() {
        return Err(anyhow!(
            "repository directory not found: {}",
            repo_dir.display()
        ));
    }

    let walker = WalkDir::new(repo_dir)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            !(e.file_type().is_dir() && is_ignored_dir(&e.file_name().to_string_lossy()))
        });

    let mut entries = Vec::new();
    for entry in walker {
        match entry {
            Ok(entry) => entries.push(WalkedEntry {
                depth: entry.depth(),
                name: entry.file_name().to_string_lossy().into_owned(),
                is_dir: entry.file_type().is_dir(),
            }),
            Err(err) => warn!(err = %err, "skipping unreadable entry"),
        }
    }

    let mut pos = 0;
    let tree = RepositoryTree::new(build_level(&entries, &mut pos, 1));
    if tree.is_empty() {
        return Err(anyhow!(
            "repository indexing produced an empty tree: {}",
            repo_dir.display()
        ));
    }
    debug!(entries = entries.len(), "indexed repository");
    Ok(tree)
}

struct WalkedEntry {
    depth: usize,
    name: String,
    is_dir: bool,
}

// Entries arrive in pre-order, so a directory's children directly follow it at depth + 1.
fn build_level(entries: &[WalkedEntry], pos: &mut usize, depth: usize) -> Vec<RepoNode> {
    let mut nodes = Vec::new();
    while let Some(entry) = entries.get(*pos) {
        if entry.depth != depth {
            break;
        }
        *pos += 1;
        if entry.is_dir {
            let children = build_level(entries, pos, depth + 1);
            nodes.push(RepoNode::dir(entry.name.clone(), children));
        } else {
            nodes.push(RepoNode::file(entry.name.clone()));
        }
    }
    nodes
}

/// Create the workspace directory, check out the issue's repository into `repo/`, and index it.
///
/// An existing git checkout is reused. A leftover `repo/` that is not a checkout is removed
/// first, and a failed clone leaves no `repo/` behind.
#[instrument(skip_all, fields(workspace = %workspace.root().display(), issue = %issue))]
pub fn prepare_workspace(
    workspace: &Workspace,
    issue: &IssueRef,
    git_config: &PatchToolConfig,
) -> Result<RepositoryTree> {
    fs::create_dir_all(workspace.root())
        .with_context(|| format!("create workspace {}", workspace.root().display()))?;

    let repo_dir = workspace.repo_dir();
    if repo_dir.join(".git").exists() {
        info!(repo = %repo_dir.display(), "reusing existing checkout");
    } else {
        if repo_dir.exists() {
            warn!(repo = %repo_dir.display(), "removing non-git repo directory");
            fs::remove_dir_all(&repo_dir)
                .with_context(|| format!("remove {}", repo_dir.display()))?;
        }
        let git = Git::new(
            workspace.root(),
            git_config.timeout(),
            git_config.output_limit_bytes,
        );
        let url = issue.clone_url();
        if let Err(err) = git.clone_shallow(&url, &repo_dir) {
            if repo_dir.exists()
                && let Err(cleanup) = fs::remove_dir_all(&repo_dir)
            {
                warn!(err = %cleanup, "failed to clean up partial clone");
            }
            return Err(err.context(format!("clone {url}")));
        }
        info!(url = %url, "cloned repository");
    }

    workspace.index()
}
