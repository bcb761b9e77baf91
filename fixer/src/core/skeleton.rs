//! Compact repository overview for the planning prompt.

use serde::Serialize;

use crate::core::repo_tree::{RepoNode, RepositoryTree, is_ignored_dir};

/// Root-level files that usually tell the planner what kind of project it is.
pub const KEY_FILES: &[&str] = &[
    "package.json",
    "tsconfig.json",
    "jsconfig.json",
    "requirements.txt",
    "pyproject.toml",
    "Cargo.toml",
    "Dockerfile",
    "docker-compose.yml",
    "README.md",
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RepoSkeleton {
    /// Top-level directories, each suffixed with `/`.
    pub top_level_dirs: Vec<String>,
    /// Key files present at the repository root, in [`KEY_FILES`] order.
    pub key_files: Vec<String>,
}

impl RepoSkeleton {
    pub fn from_tree(tree: &RepositoryTree) -> Self {
        let top_level_dirs = tree
            .nodes
            .iter()
            .filter_map(|node| match node {
                RepoNode::Directory { name, .. } if !is_ignored_dir(name) => {
                    Some(format!("{name}/"))
                }
                _ => None,
            })
            .collect();

        let key_files = KEY_FILES
            .iter()
            .filter(|key| {
                tree.nodes
                    .iter()
                    .any(|node| matches!(node, RepoNode::File { name } if name.as_str() == **key))
            })
            .map(|key| (*key).to_string())
            .collect();

        Self {
            top_level_dirs,
            key_files,
        }
    }

    pub fn render(&self) -> String {
        let dirs = if self.top_level_dirs.is_empty() {
            "(none)".to_string()
        } else {
            self.top_level_dirs.join(", ")
        };
        let files = if self.key_files.is_empty() {
            "(none)".to_string()
        } else {
            self.key_files.join(", ")
        };
        format!("Top-level directories: {dirs}\nKey files: {files}")
    }
}
