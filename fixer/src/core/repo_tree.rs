//! In-memory repository tree.
//!
//! The tree is built once by the workspace provider and is read-only to the
//! agents. It is used to validate model-proposed paths and to render the
//! repository layout into prompts.

use serde::{Deserialize, Serialize};

/// Directory names never indexed nor shown to the model.
pub const IGNORED_DIRS: &[&str] = &[
    "node_modules",
    ".git",
    "dist",
    "build",
    ".next",
    ".vscode",
    ".cache",
    ".idea",
    "coverage",
    "target",
];

pub fn is_ignored_dir(name: &str) -> bool {
    IGNORED_DIRS.contains(&name)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RepoNode {
    File {
        name: String,
    },
    Directory {
        name: String,
        children: Vec<RepoNode>,
    },
}

impl RepoNode {
    pub fn file(name: impl Into<String>) -> Self {
        RepoNode::File { name: name.into() }
    }

    pub fn dir(name: impl Into<String>, children: Vec<RepoNode>) -> Self {
        RepoNode::Directory {
            name: name.into(),
            children,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            RepoNode::File { name } | RepoNode::Directory { name, .. } => name,
        }
    }
}

/// Ordered forest of repository nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RepositoryTree {
    pub nodes: Vec<RepoNode>,
}

impl RepositoryTree {
    pub fn new(nodes: Vec<RepoNode>) -> Self {
        Self { nodes }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains_file(&self, path: &str) -> bool {
        let mut nodes = &self.nodes;
        let mut parts = path.split('/').filter(|p| !p.is_empty()).peekable();
        while let Some(part) = parts.next() {
            let last = parts.peek().is_none();
            let Some(node) = nodes.iter().find(|n| n.name() == part) else {
                return false;
            };
            match (node, last) {
                (RepoNode::File { .. }, true) => return true,
                (RepoNode::Directory { children, .. }, false) => nodes = children,
                _ => return false,
            }
        }
        false
    }

    /// Render as an indented listing, two spaces per level, directories suffixed with `/`.
    ///
    /// At most `max_entries` lines are emitted; the remainder is summarized on a final line.
    pub fn render(&self, max_entries: usize) -> String {
        let mut lines = Vec::new();
        let mut omitted = 0usize;
        render_nodes(&self.nodes, 0, max_entries, &mut lines, &mut omitted);
        let mut out = lines.join("\n");
        if omitted > 0 {
            out.push_str(&format!("\n... ({omitted} more entries omitted)"));
        }
        out
    }
}

fn render_nodes(
    nodes: &[RepoNode],
    depth: usize,
    max_entries: usize,
    lines: &mut Vec<String>,
    omitted: &mut usize,
) {
    let indent = "  ".repeat(depth);
    for node in nodes {
        if lines.len() >= max_entries {
            *omitted += count_nodes(std::slice::from_ref(node));
            continue;
        }
        match node {
            RepoNode::File { name } => lines.push(format!("{indent}{name}")),
            RepoNode::Directory { name, children } => {
                lines.push(format!("{indent}{name}/"));
                render_nodes(children, depth + 1, max_entries, lines, omitted);
            }
        }
    }
}

fn count_nodes(nodes: &[RepoNode]) -> usize {
    nodes
        .iter()
        .map(|n| match n {
            RepoNode::File { .. } => 1,
            RepoNode::Directory { children, .. } => 1 + count_nodes(children),
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RepositoryTree {
        RepositoryTree::new(vec![
            RepoNode::file("README.md"),
            RepoNode::dir(
                "src",
                vec![
                    RepoNode::file("index.ts"),
                    RepoNode::dir("util", vec![RepoNode::file("strings.ts")]),
                ],
            ),
        ])
    }

    #[test]
    fn contains_file_rejects_directories_and_unknown_paths() {
        let tree = sample();
        assert!(tree.contains_file("src/index.ts"));
        assert!(tree.contains_file("src/util/strings.ts"));
        assert!(!tree.contains_file("src"));
        assert!(!tree.contains_file("src/missing.ts"));
        assert!(!tree.contains_file("README.md/x"));
        assert!(!tree.contains_file(""));
    }

    #[test]
    fn render_caps_entries() {
        let tree = sample();
        assert_eq!(
            tree.render(100),
            "README.md\nsrc/\n  index.ts\n  util/\n    strings.ts"
        );
        assert_eq!(
            tree.render(2),
            "README.md\nsrc/\n... (3 more entries omitted)"
        );
    }

    #[test]
    fn serializes_with_type_tags() {
        let tree = RepositoryTree::new(vec![RepoNode::dir("src", vec![RepoNode::file("a.rs")])]);
        let json = serde_json::to_value(&tree).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!([
                {"type": "directory", "name": "src", "children": [{"type": "file", "name": "a.rs"}]}
            ])
        );
    }
}
