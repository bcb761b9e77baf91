//! End-to-end task processing: issue to plan to applied patch.

use anyhow::Result;
use tracing::{error, info, instrument, warn};

use crate::agents::planner::{PlanRequest, PlannerLoop};
use crate::coder::{CoderOrchestrator, CoderSettings, CoderStop};
use crate::core::issue::IssueRef;
use crate::core::repo_tree::RepositoryTree;
use crate::core::skeleton::RepoSkeleton;
use crate::error::AgentError;
use crate::exit_codes;
use crate::io::attempt_log::{write_attempt, write_planner_transcript};
use crate::io::config::{FixerConfig, PatchToolConfig};
use crate::io::inference::Inference;
use crate::io::issue_source::IssueSource;
use crate::io::listing::DirectoryLister;
use crate::io::prompt::PromptEngine;
use crate::io::task_store::{TaskStatus, TaskStep, TaskStore};
use crate::io::workspace::{Workspace, prepare_workspace};

/// Collaborators shared by every task.
pub struct TaskContext<'a, I: Inference, S: IssueSource> {
    pub config: &'a FixerConfig,
    pub inference: &'a I,
    pub issues: &'a S,
    pub prompts: &'a PromptEngine,
}

/// A prepared task: parsed issue reference plus an indexed workspace.
#[derive(Debug, Clone)]
pub struct TaskInput<'a> {
    pub issue_url: &'a str,
    pub issue: &'a IssueRef,
    pub workspace: &'a Workspace,
    pub tree: &'a RepositoryTree,
}

/// Terminal state of a task.
#[derive(Debug)]
pub enum TaskOutcome {
    Completed {
        files_changed: Vec<String>,
        iteration: u32,
    },
    CodingExhausted {
        iteration: u32,
        message: String,
    },
    Failed {
        step: TaskStep,
        error: AgentError,
    },
}

impl TaskOutcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            TaskOutcome::Completed { .. } => exit_codes::OK,
            TaskOutcome::CodingExhausted { .. } => exit_codes::RETRIES_EXHAUSTED,
            TaskOutcome::Failed {
                error: AgentError::ExplorationExhausted { .. },
                ..
            } => exit_codes::EXPLORATION_EXHAUSTED,
            TaskOutcome::Failed { .. } => exit_codes::INVALID,
        }
    }
}

/// Check out and index the task's repository.
///
/// A setup failure is recorded as `failed/planning` in `store` before the error is returned.
#[instrument(skip_all, fields(issue = %issue, workspace = %workspace.root().display()))]
pub fn prepare_task<T: TaskStore>(
    workspace: &Workspace,
    issue: &IssueRef,
    git_config: &PatchToolConfig,
    store: &mut T,
) -> Result<RepositoryTree> {
    match prepare_workspace(workspace, issue, git_config) {
        Ok(tree) => Ok(tree),
        Err(err) => {
            let message = format!("prepare workspace: {err:#}");
            error!(%message, "task setup failed");
            store.persist_status(TaskStatus::Failed, TaskStep::Planning, Some(&message))?;
            Err(err)
        }
    }
}

/// Plan and code one task, recording every status transition in `store`.
///
/// Agent failures end in a `failed` record and are returned as a [`TaskOutcome`];
/// `Err` is reserved for persistence failures.
#[instrument(skip_all, fields(issue = %input.issue, workspace = %input.workspace.root().display()))]
pub fn process_task<I: Inference, S: IssueSource, T: TaskStore>(
    ctx: &TaskContext<'_, I, S>,
    input: &TaskInput<'_>,
    store: &mut T,
) -> Result<TaskOutcome> {
    store.persist_status(TaskStatus::Running, TaskStep::Planning, None)?;

    let issue = match ctx.issues.fetch(input.issue, input.issue_url) {
        Ok(issue) => issue,
        Err(err) => {
            let err = AgentError::InputValidation(format!("fetch issue: {err:#}"));
            return fail(store, TaskStep::Planning, err);
        }
    };

    let skeleton = RepoSkeleton::from_tree(input.tree);
    let lister = DirectoryLister::new(input.workspace.repo_dir());
    let planner = PlannerLoop::new(
        ctx.inference,
        &lister,
        ctx.prompts,
        ctx.config.max_exploration_steps,
    );
    let mut transcript = Vec::new();
    let planned = planner.run(
        &PlanRequest {
            issue: input.issue,
            title: &issue.title,
            body: &issue.body,
            skeleton: &skeleton,
        },
        |message| transcript.push(message.clone()),
    );
    if let Err(err) = write_planner_transcript(input.workspace.root(), &transcript) {
        warn!(err = %format!("{err:#}"), "failed to write planner transcript");
    }
    let planned = match planned {
        Ok(planned) => planned,
        Err(err) => return fail(store, TaskStep::Planning, err),
    };

    store.persist_plan(&planned.plan)?;
    store.persist_status(TaskStatus::Running, TaskStep::Coding, None)?;

    let coder = CoderOrchestrator::new(
        ctx.inference,
        ctx.prompts,
        input.workspace.root(),
        CoderSettings::from_config(ctx.config),
    );
    let coded = coder.run(&planned.plan, input.tree, |report| {
        if let Err(err) = write_attempt(input.workspace.root(), report) {
            warn!(
                iteration = report.iteration,
                err = %format!("{err:#}"),
                "failed to write attempt log"
            );
        }
    });
    let coded = match coded {
        Ok(coded) => coded,
        Err(err) => return fail(store, TaskStep::Coding, err),
    };

    let message = coded.error_message();
    match coded.stop {
        CoderStop::Applied { files_changed } => {
            store.persist_result(&files_changed, coded.iteration)?;
            store.persist_status(TaskStatus::Completed, TaskStep::Done, None)?;
            info!(iteration = coded.iteration, files = ?files_changed, "task completed");
            Ok(TaskOutcome::Completed {
                files_changed,
                iteration: coded.iteration,
            })
        }
        CoderStop::Exhausted { .. } => {
            let message = message.unwrap_or_default();
            store.persist_result(&[], coded.iteration)?;
            store.persist_status(TaskStatus::Failed, TaskStep::Coding, Some(&message))?;
            error!(iteration = coded.iteration, %message, "task failed");
            Ok(TaskOutcome::CodingExhausted {
                iteration: coded.iteration,
                message,
            })
        }
    }
}

fn fail<T: TaskStore>(store: &mut T, step: TaskStep, err: AgentError) -> Result<TaskOutcome> {
    error!(step = ?step, err = %err, "task failed");
    store.persist_status(TaskStatus::Failed, step, Some(&err.to_string()))?;
    Ok(TaskOutcome::Failed { step, error: err })
}
