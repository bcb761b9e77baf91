//! Two-phase patch application: `git apply --check`, then `git apply`.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, info, instrument, warn};

use crate::core::diff::changed_files;
use crate::core::types::ApplyResult;
use crate::error::AgentError;
use crate::io::config::PatchToolConfig;
use crate::io::git::Git;
use crate::io::workspace::REPO_DIR;

/// Applies unified diffs to `<workspace>/repo`.
///
/// The diff is staged in a randomly named scratch file in the workspace root.
/// The scratch file is removed before [`PatchApplier::apply`] returns, whatever
/// the outcome.
#[derive(Debug, Clone)]
pub struct PatchApplier {
    workspace_root: PathBuf,
    config: PatchToolConfig,
}

impl PatchApplier {
    pub fn new(workspace_root: impl Into<PathBuf>, config: PatchToolConfig) -> Self {
        Self {
            workspace_root: workspace_root.into(),
            config,
        }
    }

    #[instrument(skip_all, fields(workspace = %self.workspace_root.display(), diff_bytes = diff.len()))]
    pub fn apply(&self, diff: &str) -> Result<ApplyResult, AgentError> {
        if diff.trim().is_empty() {
            return Err(AgentError::InputValidation(
                "diff text is empty".to_string(),
            ));
        }
        let repo_dir = self.workspace_root.join(REPO_DIR);
        if !repo_dir.is_dir() {
            return Err(AgentError::InputValidation(format!(
                "repository directory not found: {}",
                repo_dir.display()
            )));
        }

        let mut scratch = tempfile::Builder::new()
            .prefix(".fixer-")
            .suffix(".patch")
            .tempfile_in(&self.workspace_root)?;
        debug!(scratch = %scratch.path().display(), "staged patch");

        let result = write_patch(&mut scratch, diff)
            .and_then(|()| self.check_then_apply(&repo_dir, scratch.path()));

        let scratch_path = scratch.path().to_path_buf();
        if let Err(err) = scratch.close() {
            warn!(scratch = %scratch_path.display(), err = %err, "failed to remove scratch patch");
        }

        let files_changed = result.map(|()| changed_files(diff))?;
        info!(files = ?files_changed, "patch applied");
        Ok(ApplyResult { files_changed })
    }

    fn check_then_apply(&self, repo_dir: &Path, patch: &Path) -> Result<(), AgentError> {
        let git = Git::new(
            repo_dir,
            self.config.timeout(),
            self.config.output_limit_bytes,
        );

        let check = git
            .apply_check(patch)
            .map_err(|err| AgentError::ValidationFailed {
                diagnostic: format!("{err:#}"),
            })?;
        if !check.success() {
            let diagnostic = check.diagnostic();
            warn!(%diagnostic, "patch check failed");
            return Err(AgentError::ValidationFailed { diagnostic });
        }

        let applied = git.apply(patch).map_err(|err| AgentError::ApplyFailed {
            diagnostic: format!("{err:#}"),
        })?;
        if !applied.success() {
            let diagnostic = applied.diagnostic();
            warn!(%diagnostic, "patch apply failed");
            return Err(AgentError::ApplyFailed { diagnostic });
        }
        Ok(())
    }
}

fn write_patch(scratch: &mut NamedTempFile, diff: &str) -> Result<(), AgentError> {
    let file = scratch.as_file_mut();
    file.write_all(diff.as_bytes())?;
    file.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::test_support::TestWorkspace;

    const README_DIFF: &str = "--- a/README.md\n+++ b/README.md\n@@ -1,1 +1,1 @@\n-Old\n+New\n";

    fn scratch_files(root: &Path) -> Vec<String> {
        fs::read_dir(root)
            .expect("read workspace")
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|name| name.ends_with(".patch"))
            .collect()
    }

    #[test]
    fn applies_diff_and_reports_changed_files() {
        let ws = TestWorkspace::new();
        ws.write_repo_file("README.md", "Old\n");
        let applier = PatchApplier::new(ws.root(), PatchToolConfig::default());

        let result = applier.apply(README_DIFF).expect("apply");
        assert_eq!(result.files_changed, vec!["README.md"]);
        assert_eq!(ws.read_repo_file("README.md"), "New\n");
        assert!(scratch_files(ws.root()).is_empty());
    }

    #[test]
    fn check_failure_leaves_tree_untouched_and_cleans_up() {
        let ws = TestWorkspace::new();
        ws.write_repo_file("README.md", "Something else\n");
        let applier = PatchApplier::new(ws.root(), PatchToolConfig::default());

        let err = applier.apply(README_DIFF).expect_err("check fails");
        let AgentError::ValidationFailed { diagnostic } = err else {
            panic!("expected validation failure");
        };
        assert!(diagnostic.contains("README.md"));
        assert_eq!(ws.read_repo_file("README.md"), "Something else\n");
        assert!(scratch_files(ws.root()).is_empty());
    }

    #[test]
    fn multi_file_diff_is_all_or_nothing() {
        let ws = TestWorkspace::new();
        ws.write_repo_file("a.txt", "one\n");
        ws.write_repo_file("b.txt", "two\n");
        let diff = "--- a/a.txt\n+++ b/a.txt\n@@ -1 +1 @@\n-one\n+uno\n\
                    --- a/b.txt\n+++ b/b.txt\n@@ -1 +1 @@\n-zwei\n+dos\n";
        let applier = PatchApplier::new(ws.root(), PatchToolConfig::default());

        assert!(applier.apply(diff).is_err());
        assert_eq!(ws.read_repo_file("a.txt"), "one\n");
        assert_eq!(ws.read_repo_file("b.txt"), "two\n");
    }

    #[test]
    fn rejects_blank_diff_and_missing_repo() {
        let ws = TestWorkspace::new();
        let applier = PatchApplier::new(ws.root(), PatchToolConfig::default());
        assert!(matches!(
            applier.apply("  \n").expect_err("blank"),
            AgentError::InputValidation(_)
        ));

        let bare = tempfile::tempdir().expect("tempdir");
        let applier = PatchApplier::new(bare.path(), PatchToolConfig::default());
        assert!(matches!(
            applier.apply(README_DIFF).expect_err("no repo"),
            AgentError::InputValidation(_)
        ));
        assert!(scratch_files(bare.path()).is_empty());
    }
}
