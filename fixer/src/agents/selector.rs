//! File selection agent.

use std::collections::BTreeSet;

use tracing::{debug, instrument, warn};

use crate::core::reply::parse_selection_reply;
use crate::core::repo_tree::RepositoryTree;
use crate::core::types::{Plan, SelectedFileSet};
use crate::error::AgentError;
use crate::io::inference::Inference;
use crate::io::prompt::{PromptEngine, SelectionPromptInput};

pub struct FileSelector<'a, I: Inference> {
    inference: &'a I,
    prompts: &'a PromptEngine,
    max_files: usize,
    tree_max_entries: usize,
}

impl<'a, I: Inference> FileSelector<'a, I> {
    pub fn new(
        inference: &'a I,
        prompts: &'a PromptEngine,
        max_files: usize,
        tree_max_entries: usize,
    ) -> Self {
        Self {
            inference,
            prompts,
            max_files,
            tree_max_entries,
        }
    }

    /// Ask the model for at most `max_files` paths and keep those present in `tree`.
    ///
    /// Some rejected candidates are tolerated; an empty reply or a reply with no
    /// existing file is [`AgentError::SelectionFailed`].
    #[instrument(skip_all, fields(tried = previous_files.len(), retry = previous_error.is_some()))]
    pub fn select(
        &self,
        plan: &Plan,
        tree: &RepositoryTree,
        previous_files: &[String],
        previous_error: Option<&str>,
    ) -> Result<SelectedFileSet, AgentError> {
        plan.validate()?;
        if tree.is_empty() {
            return Err(AgentError::InputValidation(
                "repository tree is empty".to_string(),
            ));
        }

        let rendered_tree = tree.render(self.tree_max_entries);
        let prompt = self
            .prompts
            .render_file_selection(&SelectionPromptInput {
                plan,
                tree: &rendered_tree,
                previous_files,
                previous_error,
                max_files: self.max_files,
            })
            .map_err(|err| AgentError::SelectionFailed(format!("render prompt: {err:#}")))?;

        let reply = self
            .inference
            .infer(&prompt)
            .map_err(AgentError::inference)?;
        let raw = parse_selection_reply(&reply)?;

        // Repeats would otherwise use up the file budget.
        let mut seen = BTreeSet::new();
        let mut candidates: Vec<String> = raw
            .files
            .iter()
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty() && seen.insert(f.clone()))
            .collect();
        if candidates.is_empty() {
            return Err(AgentError::SelectionFailed(
                "model returned an empty file list".to_string(),
            ));
        }
        if candidates.len() > self.max_files {
            warn!(
                returned = candidates.len(),
                max = self.max_files,
                "model selected too many files, truncating"
            );
            candidates.truncate(self.max_files);
        }

        let (files, missing): (Vec<String>, Vec<String>) = candidates
            .into_iter()
            .partition(|f| tree.contains_file(f));
        if files.is_empty() {
            return Err(AgentError::SelectionFailed(format!(
                "none of the selected files exist in the repository: {}",
                missing.join(", ")
            )));
        }
        if !missing.is_empty() {
            warn!(missing = ?missing, "dropping selected files not in the repository");
        }

        debug!(files = ?files, "selected files");
        Ok(SelectedFileSet {
            files,
            reasoning: raw.reasoning,
        })
    }
}
