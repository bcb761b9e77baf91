//! Issue-to-patch agent CLI.
//!
//! `fixer run` drives the whole pipeline for one GitHub issue: clone, plan,
//! code, apply. The other commands expose single stages against an existing
//! workspace.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand};
use tracing::debug;

use fixer::agents::planner::{PlanRequest, PlannerLoop};
use fixer::core::issue::{Issue, IssueRef, parse_issue_url};
use fixer::core::skeleton::RepoSkeleton;
use fixer::error::AgentError;
use fixer::exit_codes;
use fixer::io::applier::PatchApplier;
use fixer::io::config::{FixerConfig, load_config, write_config};
use fixer::io::inference::CommandInference;
use fixer::io::issue_source::{GhIssueSource, IssueSource, StaticIssueSource};
use fixer::io::listing::DirectoryLister;
use fixer::io::prompt::PromptEngine;
use fixer::io::task_store::{JsonTaskStore, TaskRecord};
use fixer::io::workspace::{Workspace, new_task_id};
use fixer::logging;
use fixer::pipeline::{TaskContext, TaskInput, TaskOutcome, prepare_task, process_task};

#[derive(Parser)]
#[command(
    name = "fixer",
    version,
    about = "Plan and apply a fix for a GitHub issue with a bounded agent loop"
)]
struct Cli {
    /// Path to the TOML config. A missing file means defaults.
    #[arg(long, global = true, default_value = "fixer.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write the default config to `--config` if missing.
    Init {
        /// Overwrite an existing file.
        #[arg(short, long)]
        force: bool,
    },
    /// Clone the issue's repository, plan a fix, and apply it.
    Run {
        issue_url: String,

        #[command(flatten)]
        issue: IssueArgs,

        /// Directory holding per-task workspaces.
        #[arg(long, default_value = "workspaces")]
        workspaces: PathBuf,
    },
    /// Run only the planner against an existing workspace and print the plan.
    Plan {
        #[arg(long)]
        workspace: PathBuf,

        #[arg(long)]
        issue_url: String,

        #[command(flatten)]
        issue: IssueArgs,
    },
    /// Apply a unified diff to `<workspace>/repo` and print the changed files.
    Apply {
        #[arg(long)]
        workspace: PathBuf,

        patch: PathBuf,
    },
    /// Print the indexed repository tree of a workspace as JSON.
    Tree {
        #[arg(long)]
        workspace: PathBuf,
    },
}

/// Issue content given on the command line instead of fetched with `gh`.
#[derive(Args, Debug, Default)]
struct IssueArgs {
    #[arg(long)]
    title: Option<String>,

    #[arg(long, requires = "title")]
    body: Option<String>,
}

enum CliIssueSource {
    Static(StaticIssueSource),
    Gh(GhIssueSource),
}

impl CliIssueSource {
    fn from_args(args: IssueArgs, config: &FixerConfig) -> Self {
        match args.title {
            Some(title) => {
                Self::Static(StaticIssueSource::new(title, args.body.unwrap_or_default()))
            }
            None => Self::Gh(GhIssueSource::new(
                config.patch_tool.timeout(),
                config.patch_tool.output_limit_bytes,
            )),
        }
    }
}

impl IssueSource for CliIssueSource {
    fn fetch(&self, issue: &IssueRef, url: &str) -> Result<Issue> {
        match self {
            Self::Static(source) => source.fetch(issue, url),
            Self::Gh(source) => source.fetch(issue, url),
        }
    }
}

fn main() -> ExitCode {
    logging::init();
    match run() {
        Ok(code) => exit_code(code),
        Err(err) => {
            eprintln!("{:#}", err);
            exit_code(exit_codes::INVALID)
        }
    }
}

fn exit_code(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    if let Command::Init { force } = cli.command {
        return cmd_init(&cli.config, force);
    }
    let config = load_config(&cli.config)?;
    debug!(config = %cli.config.display(), "loaded config");
    match cli.command {
        Command::Run {
            issue_url,
            issue,
            workspaces,
        } => cmd_run(&config, &issue_url, issue, &workspaces),
        Command::Plan {
            workspace,
            issue_url,
            issue,
        } => cmd_plan(&config, &workspace, &issue_url, issue),
        Command::Apply { workspace, patch } => cmd_apply(&config, &workspace, &patch),
        Command::Tree { workspace } => cmd_tree(&workspace),
        Command::Init { force } => cmd_init(&cli.config, force),
    }
}

fn cmd_init(path: &Path, force: bool) -> Result<i32> {
    if path.exists() && !force {
        eprintln!("{} exists, leaving it unchanged (use --force to overwrite)", path.display());
        return Ok(exit_codes::OK);
    }
    write_config(path, &FixerConfig::default())?;
    println!("{}", path.display());
    Ok(exit_codes::OK)
}

fn cmd_run(
    config: &FixerConfig,
    issue_url: &str,
    args: IssueArgs,
    workspaces: &Path,
) -> Result<i32> {
    let issue = parse_issue_url(issue_url)?;
    let task_id = new_task_id(&issue);
    let workspace = Workspace::for_task(workspaces, &task_id);
    let mut store = JsonTaskStore::create(
        JsonTaskStore::path_for(&workspace.state_dir()),
        TaskRecord::new(&task_id, issue_url),
    )?;
    eprintln!("task {task_id}: {}", workspace.root().display());

    let tree = match prepare_task(&workspace, &issue, &config.patch_tool, &mut store) {
        Ok(tree) => tree,
        Err(err) => {
            eprintln!("task record: {}", store.path().display());
            return Err(err);
        }
    };
    let inference = CommandInference::new(config.inference.clone())?;
    let issues = CliIssueSource::from_args(args, config);
    let prompts = PromptEngine::new();
    let ctx = TaskContext {
        config,
        inference: &inference,
        issues: &issues,
        prompts: &prompts,
    };
    let input = TaskInput {
        issue_url,
        issue: &issue,
        workspace: &workspace,
        tree: &tree,
    };

    let outcome = process_task(&ctx, &input, &mut store)?;
    match &outcome {
        TaskOutcome::Completed {
            files_changed,
            iteration,
        } => {
            println!("applied on iteration {iteration}");
            for file in files_changed {
                println!("{file}");
            }
        }
        TaskOutcome::CodingExhausted { message, .. } => eprintln!("{message}"),
        TaskOutcome::Failed { step, error } => eprintln!("{step:?} failed: {error}"),
    }
    eprintln!("task record: {}", store.path().display());
    Ok(outcome.exit_code())
}

fn cmd_plan(config: &FixerConfig, root: &Path, issue_url: &str, args: IssueArgs) -> Result<i32> {
    let issue = parse_issue_url(issue_url)?;
    let workspace = Workspace::new(root);
    let tree = workspace.index()?;
    let fetched = CliIssueSource::from_args(args, config).fetch(&issue, issue_url)?;

    let inference = CommandInference::new(config.inference.clone())?;
    let prompts = PromptEngine::new();
    let lister = DirectoryLister::new(workspace.repo_dir());
    let skeleton = RepoSkeleton::from_tree(&tree);
    let planner = PlannerLoop::new(&inference, &lister, &prompts, config.max_exploration_steps);
    let planned = planner.run(
        &PlanRequest {
            issue: &issue,
            title: &fetched.title,
            body: &fetched.body,
            skeleton: &skeleton,
        },
        |_| {},
    );

    match planned {
        Ok(planned) => {
            let json =
                serde_json::to_string_pretty(&planned.plan).context("serialize plan json")?;
            println!("{json}");
            Ok(exit_codes::OK)
        }
        Err(err @ AgentError::ExplorationExhausted { .. }) => {
            eprintln!("{err}");
            Ok(exit_codes::EXPLORATION_EXHAUSTED)
        }
        Err(err) => Err(anyhow!(err).context("planner failed")),
    }
}

fn cmd_apply(config: &FixerConfig, root: &Path, patch: &Path) -> Result<i32> {
    let diff =
        fs::read_to_string(patch).with_context(|| format!("read patch {}", patch.display()))?;
    let applied = PatchApplier::new(root, config.patch_tool.clone())
        .apply(&diff)
        .context("apply patch")?;
    for file in &applied.files_changed {
        println!("{file}");
    }
    Ok(exit_codes::OK)
}

fn cmd_tree(root: &Path) -> Result<i32> {
    let tree = Workspace::new(root).index()?;
    let json = serde_json::to_string_pretty(&tree).context("serialize tree json")?;
    println!("{json}");
    Ok(exit_codes::OK)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_run_defaults() {
        let cli = Cli::parse_from(["fixer", "run", "https://github.com/acme/widgets/issues/42"]);
        assert_eq!(cli.config, PathBuf::from("fixer.toml"));
        match cli.command {
            Command::Run {
                issue_url,
                issue,
                workspaces,
            } => {
                assert_eq!(issue_url, "https://github.com/acme/widgets/issues/42");
                assert!(issue.title.is_none());
                assert_eq!(workspaces, PathBuf::from("workspaces"));
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn parse_run_with_inline_issue() {
        let cli = Cli::parse_from([
            "fixer",
            "run",
            "https://github.com/acme/widgets/issues/42",
            "--title",
            "Crash on empty input",
            "--body",
            "Steps to reproduce",
            "--config",
            "custom.toml",
        ]);
        assert_eq!(cli.config, PathBuf::from("custom.toml"));
        assert!(matches!(
            cli.command,
            Command::Run { issue: IssueArgs { title: Some(_), body: Some(_) }, .. }
        ));
    }

    #[test]
    fn body_requires_title() {
        let result = Cli::try_parse_from([
            "fixer",
            "plan",
            "--workspace",
            "w",
            "--issue-url",
            "https://github.com/acme/widgets/issues/1",
            "--body",
            "b",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn parse_init() {
        let cli = Cli::parse_from(["fixer", "init"]);
        assert!(matches!(cli.command, Command::Init { force: false }));

        let cli = Cli::parse_from(["fixer", "init", "--force", "--config", "ci.toml"]);
        assert!(matches!(cli.command, Command::Init { force: true }));
        assert_eq!(cli.config, PathBuf::from("ci.toml"));
    }

    #[test]
    fn parse_apply() {
        let cli = Cli::parse_from(["fixer", "apply", "--workspace", "w", "fix.patch"]);
        match cli.command {
            Command::Apply { workspace, patch } => {
                assert_eq!(workspace, PathBuf::from("w"));
                assert_eq!(patch, PathBuf::from("fix.patch"));
            }
            _ => panic!("expected apply"),
        }
    }

    #[test]
    fn inline_title_selects_static_source() {
        let args = IssueArgs {
            title: Some("t".to_string()),
            body: None,
        };
        let source = CliIssueSource::from_args(args, &FixerConfig::default());
        assert!(matches!(source, CliIssueSource::Static(_)));
        assert!(matches!(
            CliIssueSource::from_args(IssueArgs::default(), &FixerConfig::default()),
            CliIssueSource::Gh(_)
        ));
    }
}
