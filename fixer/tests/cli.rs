//! CLI tests for the single-stage `fixer` commands.
//!
//! Spawns the fixer binary against temp workspaces and checks output and exit codes.

use std::fs;
use std::process::Command;

use fixer::exit_codes;
use fixer::io::config::{FixerConfig, load_config};
use fixer::test_support::TestWorkspace;

fn fixer(ws: &TestWorkspace) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_fixer"));
    cmd.current_dir(ws.root())
        .arg("--config")
        .arg(ws.root().join("absent.toml"));
    cmd
}

#[test]
fn apply_prints_changed_files() {
    let ws = TestWorkspace::new();
    ws.write_repo_file("README.md", "Old\n");
    let patch = ws.root().join("fix.diff");
    fs::write(
        &patch,
        "--- a/README.md\n+++ b/README.md\n@@ -1,1 +1,1 @@\n-Old\n+New\n",
    )
    .expect("write patch");

    let output = fixer(&ws)
        .arg("apply")
        .arg("--workspace")
        .arg(ws.root())
        .arg(&patch)
        .output()
        .expect("fixer apply");

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    assert_eq!(String::from_utf8_lossy(&output.stdout), "README.md\n");
    assert_eq!(ws.read_repo_file("README.md"), "New\n");
}

#[test]
fn apply_rejects_stale_patch_without_touching_files() {
    let ws = TestWorkspace::new();
    ws.write_repo_file("README.md", "Old\n");
    let patch = ws.root().join("fix.diff");
    fs::write(
        &patch,
        "--- a/README.md\n+++ b/README.md\n@@ -1,1 +1,1 @@\n-Other\n+New\n",
    )
    .expect("write patch");

    let output = fixer(&ws)
        .arg("apply")
        .arg("--workspace")
        .arg(ws.root())
        .arg(&patch)
        .output()
        .expect("fixer apply");

    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    assert!(String::from_utf8_lossy(&output.stderr).contains("diff validation failed"));
    assert_eq!(ws.read_repo_file("README.md"), "Old\n");
}

#[test]
fn tree_prints_indexed_repository() {
    let ws = TestWorkspace::new();
    ws.write_repo_file("src/index.ts", "");
    ws.write_repo_file("node_modules/dep/index.js", "");

    let output = fixer(&ws)
        .arg("tree")
        .arg("--workspace")
        .arg(ws.root())
        .output()
        .expect("fixer tree");

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let tree: serde_json::Value = serde_json::from_slice(&output.stdout).expect("tree json");
    assert_eq!(
        tree,
        serde_json::json!([
            {"type": "directory", "name": "src", "children": [
                {"type": "file", "name": "index.ts"}
            ]}
        ])
    );
}

#[test]
fn run_rejects_non_issue_url() {
    let ws = TestWorkspace::new();
    let status = fixer(&ws)
        .args(["run", "https://example.com/acme/widgets", "--title", "t"])
        .status()
        .expect("fixer run");
    assert_eq!(status.code(), Some(exit_codes::INVALID));
}

#[test]
fn init_writes_loadable_defaults_and_respects_existing_file() {
    let ws = TestWorkspace::new();
    let path = ws.root().join("conf/fixer.toml");

    let status = Command::new(env!("CARGO_BIN_EXE_fixer"))
        .arg("--config")
        .arg(&path)
        .arg("init")
        .status()
        .expect("fixer init");
    assert_eq!(status.code(), Some(exit_codes::OK));
    assert_eq!(load_config(&path).expect("load"), FixerConfig::default());

    fs::write(&path, "max_coding_retries = 1\n").expect("edit config");
    let status = Command::new(env!("CARGO_BIN_EXE_fixer"))
        .arg("--config")
        .arg(&path)
        .arg("init")
        .status()
        .expect("fixer init again");
    assert_eq!(status.code(), Some(exit_codes::OK));
    assert_eq!(load_config(&path).expect("load").max_coding_retries, 1);

    let status = Command::new(env!("CARGO_BIN_EXE_fixer"))
        .arg("--config")
        .arg(&path)
        .args(["init", "--force"])
        .status()
        .expect("fixer init --force");
    assert_eq!(status.code(), Some(exit_codes::OK));
    assert_eq!(load_config(&path).expect("load"), FixerConfig::default());
}
