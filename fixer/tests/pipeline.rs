//! Task pipeline tests: status transitions persisted to `task.json`.

use fixer::core::issue::parse_issue_url;
use fixer::core::types::Role;
use fixer::error::AgentError;
use fixer::exit_codes;
use fixer::io::attempt_log::planner_transcript_path;
use fixer::io::config::{FixerConfig, PatchToolConfig};
use fixer::io::issue_source::StaticIssueSource;
use fixer::io::prompt::PromptEngine;
use fixer::io::task_store::{
    JsonTaskStore, TaskRecord, TaskStatus, TaskStep, TaskStore, load_task_record,
};
use fixer::pipeline::{TaskContext, TaskInput, TaskOutcome, prepare_task, process_task};
use fixer::test_support::{ScriptedInference, TestWorkspace};

const ISSUE_URL: &str = "https://github.com/acme/widgets/issues/7";
const PLAN_REPLY: &str =
    r#"{"summary": "Update README wording", "steps": ["Replace Old with New in README.md"]}"#;
const SELECT_README: &str = r#"{"files": ["README.md"], "reasoning": "plan names README.md"}"#;
const README_DIFF: &str = "--- a/README.md\n+++ b/README.md\n@@ -1,1 +1,1 @@\n-Old\n+New\n";

fn run_task(
    ws: &TestWorkspace,
    config: &FixerConfig,
    inference: &ScriptedInference,
    issues: &StaticIssueSource,
) -> (TaskOutcome, TaskRecord) {
    let issue = parse_issue_url(ISSUE_URL).expect("issue url");
    let tree = ws.workspace().index().expect("index");
    let path = JsonTaskStore::path_for(&ws.workspace().state_dir());
    let mut store =
        JsonTaskStore::create(&path, TaskRecord::new(issue.to_string(), ISSUE_URL)).expect("store");
    assert_eq!(store.record().status, TaskStatus::Queued);

    let prompts = PromptEngine::new();
    let ctx = TaskContext {
        config,
        inference,
        issues,
        prompts: &prompts,
    };
    let input = TaskInput {
        issue_url: ISSUE_URL,
        issue: &issue,
        workspace: ws.workspace(),
        tree: &tree,
    };
    let outcome = process_task(&ctx, &input, &mut store).expect("process task");
    (outcome, load_task_record(&path).expect("reload"))
}

fn readme_workspace() -> TestWorkspace {
    let ws = TestWorkspace::new();
    ws.write_repo_file("README.md", "Old\n");
    ws.write_repo_file("src/index.ts", "export {};\n");
    ws
}

#[test]
fn issue_to_applied_patch() {
    let ws = readme_workspace();
    let inference = ScriptedInference::new([
        r#"{"action": "list_directory", "path": "src"}"#,
        PLAN_REPLY,
        SELECT_README,
        README_DIFF,
    ]);
    let issues = StaticIssueSource::new("README says Old", "It should say New.");

    let (outcome, record) = run_task(&ws, &FixerConfig::default(), &inference, &issues);

    assert_eq!(outcome.exit_code(), exit_codes::OK);
    assert!(matches!(outcome, TaskOutcome::Completed { iteration: 1, .. }));
    assert_eq!(record.status, TaskStatus::Completed);
    assert_eq!(record.current_step, Some(TaskStep::Done));
    assert_eq!(record.files_changed, vec!["README.md"]);
    assert_eq!(record.iteration, Some(1));
    assert_eq!(record.error_message, None);
    assert_eq!(
        record.plan.as_ref().map(|p| p.summary.as_str()),
        Some("Update README wording")
    );
    assert_eq!(ws.read_repo_file("README.md"), "New\n");

    let transcript: Vec<serde_json::Value> = serde_json::from_str(
        &std::fs::read_to_string(planner_transcript_path(ws.root())).expect("transcript"),
    )
    .expect("transcript json");
    assert_eq!(transcript.len(), 4);
    assert_eq!(transcript[2]["role"], serde_json::json!(Role::Tool));
    assert!(inference.prompts()[0].contains("README says Old"));
}

#[test]
fn planner_exhaustion_fails_before_coding() {
    let ws = readme_workspace();
    let config = FixerConfig {
        max_exploration_steps: 2,
        ..FixerConfig::default()
    };
    let inference = ScriptedInference::new([
        r#"{"action": "list_directory", "path": "."}"#,
        r#"{"action": "list_directory", "path": "src"}"#,
        SELECT_README,
    ]);
    let issues = StaticIssueSource::new("README says Old", "");

    let (outcome, record) = run_task(&ws, &config, &inference, &issues);

    assert_eq!(outcome.exit_code(), exit_codes::EXPLORATION_EXHAUSTED);
    assert!(matches!(
        outcome,
        TaskOutcome::Failed {
            step: TaskStep::Planning,
            error: AgentError::ExplorationExhausted { steps: 2 },
        }
    ));
    assert_eq!(record.status, TaskStatus::Failed);
    assert_eq!(record.current_step, Some(TaskStep::Planning));
    assert!(record.plan.is_none());
    assert!(
        record
            .error_message
            .as_deref()
            .is_some_and(|m| m.contains("2 exploration steps"))
    );
    assert_eq!(inference.remaining(), 1);
    assert!(planner_transcript_path(ws.root()).exists());
}

#[test]
fn exhausted_coding_records_last_error() {
    let ws = readme_workspace();
    let config = FixerConfig {
        max_coding_retries: 2,
        ..FixerConfig::default()
    };
    let inference = ScriptedInference::new([
        PLAN_REPLY,
        SELECT_README,
        "I could not produce a diff.",
        SELECT_README,
        "Still no diff.",
    ]);
    let issues = StaticIssueSource::new("README says Old", "");

    let (outcome, record) = run_task(&ws, &config, &inference, &issues);

    assert_eq!(outcome.exit_code(), exit_codes::RETRIES_EXHAUSTED);
    assert!(matches!(
        outcome,
        TaskOutcome::CodingExhausted { iteration: 2, .. }
    ));
    assert_eq!(record.status, TaskStatus::Failed);
    assert_eq!(record.current_step, Some(TaskStep::Coding));
    assert_eq!(record.iteration, Some(2));
    assert!(record.plan.is_some());
    let message = record.error_message.expect("error message");
    assert!(message.starts_with("All 2 attempts failed. Last error: invalid diff format"));
    assert_eq!(ws.read_repo_file("README.md"), "Old\n");
}

#[test]
fn missing_issue_title_fails_planning() {
    let ws = readme_workspace();
    let inference = ScriptedInference::new(Vec::<String>::new());
    let issues = StaticIssueSource::new("  ", "body only");

    let (outcome, record) = run_task(&ws, &FixerConfig::default(), &inference, &issues);

    assert_eq!(outcome.exit_code(), exit_codes::INVALID);
    assert!(matches!(
        outcome,
        TaskOutcome::Failed {
            step: TaskStep::Planning,
            error: AgentError::InputValidation(_),
        }
    ));
    assert_eq!(record.status, TaskStatus::Failed);
    assert!(inference.prompts().is_empty());
}

#[test]
fn setup_failure_is_recorded_as_failed_task() {
    // `repo/` is a checkout with nothing indexable, so setup fails without cloning.
    let ws = TestWorkspace::new();
    let issue = parse_issue_url(ISSUE_URL).expect("issue url");
    let path = JsonTaskStore::path_for(&ws.workspace().state_dir());
    let mut store =
        JsonTaskStore::create(&path, TaskRecord::new("acme/widgets#7-0000abcd", ISSUE_URL))
            .expect("store");

    let err = prepare_task(ws.workspace(), &issue, &PatchToolConfig::default(), &mut store)
        .expect_err("empty checkout");
    assert!(format!("{err:#}").contains("empty tree"));

    let record = load_task_record(&path).expect("reload");
    assert_eq!(record.id, "acme/widgets#7-0000abcd");
    assert_eq!(record.status, TaskStatus::Failed);
    assert_eq!(record.current_step, Some(TaskStep::Planning));
    assert!(
        record
            .error_message
            .as_deref()
            .is_some_and(|m| m.starts_with("prepare workspace:") && m.contains("empty tree"))
    );
}

#[test]
fn successful_setup_leaves_task_queued() {
    let ws = readme_workspace();
    let issue = parse_issue_url(ISSUE_URL).expect("issue url");
    let path = JsonTaskStore::path_for(&ws.workspace().state_dir());
    let mut store =
        JsonTaskStore::create(&path, TaskRecord::new("acme/widgets#7-0000abcd", ISSUE_URL))
            .expect("store");

    let tree = prepare_task(ws.workspace(), &issue, &PatchToolConfig::default(), &mut store)
        .expect("prepare");
    assert!(tree.contains_file("src/index.ts"));
    assert_eq!(load_task_record(&path).expect("reload").status, TaskStatus::Queued);
}
