//! Coding retry loop: select, read, generate, apply.
//!
//! Each iteration runs the four stages in order. A failure in any stage ends
//! the iteration and its message, along with every file selected so far,
//! feeds the next iteration's selection prompt. The loop stops at the first
//! applied patch or after `max_retries` failed iterations.

use std::path::Path;
use std::thread;
use std::time::Duration;

use tracing::{info, instrument, warn};

use crate::agents::generator::PatchGenerator;
use crate::agents::selector::FileSelector;
use crate::core::attempt::{AttemptOutcome, AttemptReport, Stage};
use crate::core::repo_tree::RepositoryTree;
use crate::core::retry::RetryState;
use crate::core::types::{ApplyResult, Plan, SelectedFileSet};
use crate::error::AgentError;
use crate::io::applier::PatchApplier;
use crate::io::config::{FixerConfig, PatchToolConfig};
use crate::io::inference::Inference;
use crate::io::prompt::PromptEngine;
use crate::io::reader::FileReader;
use crate::io::workspace::REPO_DIR;

/// Bounds for one coding run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoderSettings {
    pub max_retries: u32,
    pub max_selected_files: usize,
    pub tree_prompt_max_entries: usize,
    pub retry_delay: Duration,
    pub patch_tool: PatchToolConfig,
}

impl CoderSettings {
    pub fn from_config(config: &FixerConfig) -> Self {
        Self {
            max_retries: config.max_coding_retries,
            max_selected_files: config.max_selected_files,
            tree_prompt_max_entries: config.tree_prompt_max_entries,
            retry_delay: config.retry_delay(),
            patch_tool: config.patch_tool.clone(),
        }
    }
}

/// Why the coding loop stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoderStop {
    Applied { files_changed: Vec<String> },
    Exhausted { last_error: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoderOutcome {
    /// Iteration at which the loop stopped (1-based).
    pub iteration: u32,
    pub max_retries: u32,
    pub files_tried: Vec<String>,
    pub stop: CoderStop,
}

impl CoderOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(self.stop, CoderStop::Applied { .. })
    }

    /// Final user-facing failure message, if the loop was exhausted.
    pub fn error_message(&self) -> Option<String> {
        match &self.stop {
            CoderStop::Applied { .. } => None,
            CoderStop::Exhausted { last_error } => Some(format!(
                "All {} attempts failed. Last error: {last_error}",
                self.max_retries
            )),
        }
    }
}

pub struct CoderOrchestrator<'a, I: Inference> {
    selector: FileSelector<'a, I>,
    generator: PatchGenerator<'a, I>,
    reader: FileReader,
    applier: PatchApplier,
    settings: CoderSettings,
}

impl<'a, I: Inference> CoderOrchestrator<'a, I> {
    pub fn new(
        inference: &'a I,
        prompts: &'a PromptEngine,
        workspace_root: &Path,
        settings: CoderSettings,
    ) -> Self {
        Self {
            selector: FileSelector::new(
                inference,
                prompts,
                settings.max_selected_files,
                settings.tree_prompt_max_entries,
            ),
            generator: PatchGenerator::new(inference, prompts),
            reader: FileReader::new(workspace_root.join(REPO_DIR)),
            applier: PatchApplier::new(workspace_root, settings.patch_tool.clone()),
            settings,
        }
    }

    /// Run iterations until a patch applies or `max_retries` iterations have failed.
    ///
    /// `on_attempt` observes every iteration's report, failed or not. Only
    /// invalid inputs are returned as `Err`; stage failures are folded into the
    /// outcome.
    #[instrument(skip_all, fields(max_retries = self.settings.max_retries))]
    pub fn run(
        &self,
        plan: &Plan,
        tree: &RepositoryTree,
        mut on_attempt: impl FnMut(&AttemptReport),
    ) -> Result<CoderOutcome, AgentError> {
        if self.settings.max_retries == 0 {
            return Err(AgentError::InputValidation(
                "max_coding_retries must be > 0".to_string(),
            ));
        }
        plan.validate()?;
        if tree.is_empty() {
            return Err(AgentError::InputValidation(
                "repository tree is empty".to_string(),
            ));
        }
        info!(summary = %plan.summary, "starting coding loop");

        let mut state = RetryState::initial();
        loop {
            let report = self.attempt(plan, tree, &state);
            on_attempt(&report);

            match report.outcome {
                AttemptOutcome::Applied { files_changed } => {
                    info!(iteration = report.iteration, files = ?files_changed, "coding succeeded");
                    return Ok(CoderOutcome {
                        iteration: report.iteration,
                        max_retries: self.settings.max_retries,
                        files_tried: report.files_tried,
                        stop: CoderStop::Applied { files_changed },
                    });
                }
                AttemptOutcome::Failed { error, .. } => {
                    let next =
                        state.after_failure(report.files_tried.iter().cloned().collect(), error);
                    if next.iteration >= self.settings.max_retries {
                        warn!(iterations = next.iteration, "coding retries exhausted");
                        return Ok(CoderOutcome {
                            iteration: next.iteration,
                            max_retries: self.settings.max_retries,
                            files_tried: next.previous_files_tried.into_iter().collect(),
                            stop: CoderStop::Exhausted {
                                last_error: next.previous_error.unwrap_or_default(),
                            },
                        });
                    }
                    if !self.settings.retry_delay.is_zero() {
                        thread::sleep(self.settings.retry_delay);
                    }
                    state = next;
                }
            }
        }
    }

    /// Run one iteration from `state`. Never fails: stage errors land in the report.
    fn attempt(&self, plan: &Plan, tree: &RepositoryTree, state: &RetryState) -> AttemptReport {
        let iteration = state.attempt();
        info!(iteration, max = self.settings.max_retries, "coding iteration");

        let mut trace = AttemptTrace {
            files_tried: state.previous_files_tried.iter().cloned().collect(),
            ..AttemptTrace::default()
        };
        let outcome = match self.run_stages(plan, tree, state, &mut trace) {
            Ok(applied) => AttemptOutcome::Applied {
                files_changed: applied.files_changed,
            },
            Err((stage, err)) => {
                warn!(
                    iteration,
                    stage = stage.as_str(),
                    retryable = err.is_retryable(),
                    err = %err,
                    "iteration failed"
                );
                AttemptOutcome::Failed {
                    stage,
                    error: err.to_string(),
                }
            }
        };

        AttemptReport {
            iteration,
            selection: trace.selection,
            files_tried: trace.files_tried,
            files_read: trace.files_read,
            files_unreadable: trace.files_unreadable,
            diff: trace.diff,
            outcome,
        }
    }

    fn run_stages(
        &self,
        plan: &Plan,
        tree: &RepositoryTree,
        state: &RetryState,
        trace: &mut AttemptTrace,
    ) -> Result<ApplyResult, (Stage, AgentError)> {
        let previous: Vec<String> = state.previous_files_tried.iter().cloned().collect();
        let selection = self
            .selector
            .select(plan, tree, &previous, state.previous_error.as_deref())
            .map_err(|err| (Stage::Selecting, err))?;
        trace.files_tried = state
            .files_tried_with(&selection.files)
            .into_iter()
            .collect();
        trace.selection = Some(selection.clone());

        let read = self
            .reader
            .read(&selection.files)
            .map_err(|err| (Stage::Reading, err))?;
        trace.files_read = read.files.len();
        trace.files_unreadable = read.failed;

        let diff = self
            .generator
            .generate(plan, &read.files)
            .map_err(|err| (Stage::Generating, err))?;
        trace.diff = Some(diff.clone());

        self.applier
            .apply(&diff)
            .map_err(|err| (Stage::Applying, err))
    }
}

#[derive(Debug, Default)]
struct AttemptTrace {
    selection: Option<SelectedFileSet>,
    files_tried: Vec<String>,
    files_read: usize,
    files_unreadable: usize,
    diff: Option<String>,
}
