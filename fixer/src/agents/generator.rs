//! Patch generation agent.

use tracing::{debug, instrument};

use crate::core::diff::{normalize_diff, validate_structure};
use crate::core::types::{FileContent, Plan};
use crate::error::AgentError;
use crate::io::inference::Inference;
use crate::io::prompt::PromptEngine;

pub struct PatchGenerator<'a, I: Inference> {
    inference: &'a I,
    prompts: &'a PromptEngine,
}

impl<'a, I: Inference> PatchGenerator<'a, I> {
    pub fn new(inference: &'a I, prompts: &'a PromptEngine) -> Self {
        Self { inference, prompts }
    }

    /// Produce a unified diff for `files` that passes the structural checks.
    #[instrument(skip_all, fields(files = files.len()))]
    pub fn generate(&self, plan: &Plan, files: &[FileContent]) -> Result<String, AgentError> {
        plan.validate()?;
        if files.is_empty() {
            return Err(AgentError::InputValidation(
                "no files provided for diff generation".to_string(),
            ));
        }
        if files.iter().any(|f| f.path.trim().is_empty()) {
            return Err(AgentError::InputValidation(
                "file content entry without a path".to_string(),
            ));
        }

        let prompt = self
            .prompts
            .render_diff_generation(plan, files)
            .map_err(|err| AgentError::InvalidDiffFormat(format!("render prompt: {err:#}")))?;
        let reply = self
            .inference
            .infer(&prompt)
            .map_err(AgentError::inference)?;

        let diff = normalize_diff(&reply);
        if diff.trim().is_empty() {
            return Err(AgentError::InvalidDiffFormat(
                "model returned an empty diff".to_string(),
            ));
        }
        validate_structure(&diff)?;
        debug!(diff_bytes = diff.len(), "generated diff");
        Ok(diff)
    }
}
