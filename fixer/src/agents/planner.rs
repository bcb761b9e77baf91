//! Planner agent: a bounded conversation that ends in a [`Plan`].
//!
//! Each exchange sends the whole conversation so far as one prompt. The model
//! either asks for a directory listing, which is answered in a `tool` message,
//! or returns the finished plan.

use serde_json::json;
use tracing::{debug, info, instrument, warn};

use crate::core::issue::IssueRef;
use crate::core::reply::parse_planner_reply;
use crate::core::skeleton::RepoSkeleton;
use crate::core::types::{ExplorationMessage, Plan, PlannerReply, ToolRequest};
use crate::error::AgentError;
use crate::io::inference::Inference;
use crate::io::listing::DirectoryLister;
use crate::io::prompt::{PlannerPromptInput, PromptEngine};

/// Issue and repository context for one planning run.
#[derive(Debug, Clone)]
pub struct PlanRequest<'a> {
    pub issue: &'a IssueRef,
    pub title: &'a str,
    pub body: &'a str,
    pub skeleton: &'a RepoSkeleton,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannerOutcome {
    pub plan: Plan,
    /// Number of exchanges with the model, including the final one.
    pub steps: u32,
    pub transcript: Vec<ExplorationMessage>,
}

pub struct PlannerLoop<'a, I: Inference> {
    inference: &'a I,
    lister: &'a DirectoryLister,
    prompts: &'a PromptEngine,
    max_steps: u32,
}

impl<'a, I: Inference> PlannerLoop<'a, I> {
    pub fn new(
        inference: &'a I,
        lister: &'a DirectoryLister,
        prompts: &'a PromptEngine,
        max_steps: u32,
    ) -> Self {
        Self {
            inference,
            lister,
            prompts,
            max_steps,
        }
    }

    /// Run the exploration loop. `on_message` sees every message as it is appended.
    ///
    /// Replies that are neither a tool request nor a plan end the run with
    /// [`AgentError::MalformedReply`]; a rejected listing path ends it with the
    /// lister's error. Neither is retried.
    #[instrument(skip_all, fields(issue = %request.issue, max_steps = self.max_steps))]
    pub fn run(
        &self,
        request: &PlanRequest<'_>,
        mut on_message: impl FnMut(&ExplorationMessage),
    ) -> Result<PlannerOutcome, AgentError> {
        if request.title.trim().is_empty() {
            return Err(AgentError::InputValidation(
                "issue title must not be empty".to_string(),
            ));
        }
        if self.max_steps == 0 {
            return Err(AgentError::InputValidation(
                "max_exploration_steps must be > 0".to_string(),
            ));
        }

        let repo_full_name = format!("{}/{}", request.issue.owner, request.issue.repo);
        let skeleton = request.skeleton.render();
        let opening = self
            .prompts
            .render_planner(&PlannerPromptInput {
                repo_full_name: &repo_full_name,
                issue_title: request.title,
                issue_body: request.body,
                skeleton: &skeleton,
                max_steps: self.max_steps,
            })
            .map_err(|err| AgentError::InputValidation(format!("render planner prompt: {err:#}")))?;

        let mut history = Vec::new();
        push(&mut history, ExplorationMessage::requester(opening), &mut on_message);

        for step in 1..=self.max_steps {
            let prompt = history
                .iter()
                .map(|m| m.content.as_str())
                .collect::<Vec<_>>()
                .join("\n\n");
            debug!(step, prompt_bytes = prompt.len(), "requesting planner reply");
            let reply = self
                .inference
                .infer(&prompt)
                .map_err(AgentError::inference)?;

            let parsed = parse_planner_reply(&reply).inspect_err(|err| {
                warn!(step, err = %err, reply = %reply, "unusable planner reply");
            })?;
            push(&mut history, ExplorationMessage::responder(reply), &mut on_message);

            match parsed {
                PlannerReply::Tool(ToolRequest::ListDirectory { path }) => {
                    info!(step, path = %path, "planner requested directory listing");
                    let listing = self.lister.list(&path)?;
                    let content = json!({
                        "action": "list_directory",
                        "path": path,
                        "listing": listing,
                    })
                    .to_string();
                    push(&mut history, ExplorationMessage::tool(content), &mut on_message);
                }
                PlannerReply::Plan(plan) => {
                    info!(step, steps = plan.steps.len(), "plan finalized");
                    return Ok(PlannerOutcome {
                        plan,
                        steps: step,
                        transcript: history,
                    });
                }
            }
        }

        warn!(max_steps = self.max_steps, "planner exhausted exploration steps");
        Err(AgentError::ExplorationExhausted {
            steps: self.max_steps,
        })
    }
}

fn push(
    history: &mut Vec<ExplorationMessage>,
    message: ExplorationMessage,
    on_message: &mut impl FnMut(&ExplorationMessage),
) {
    on_message(&message);
    history.push(message);
}
