//! Issue content lookup.

use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::core::issue::{Issue, IssueRef};
use crate::io::process::run_command_with_timeout;

pub trait IssueSource {
    /// Fetch title and body for the issue at `url`.
    fn fetch(&self, issue: &IssueRef, url: &str) -> Result<Issue>;
}

/// Fetches issues through the GitHub CLI (`gh issue view --json title,body`).
#[derive(Debug, Clone)]
pub struct GhIssueSource {
    timeout: Duration,
    output_limit_bytes: usize,
}

impl GhIssueSource {
    pub fn new(timeout: Duration, output_limit_bytes: usize) -> Self {
        Self {
            timeout,
            output_limit_bytes,
        }
    }
}

#[derive(Deserialize)]
struct GhIssue {
    title: String,
    body: Option<String>,
}

impl IssueSource for GhIssueSource {
    #[instrument(skip_all, fields(issue = %issue))]
    fn fetch(&self, issue: &IssueRef, url: &str) -> Result<Issue> {
        let mut cmd = Command::new("gh");
        cmd.args(["issue", "view", url, "--json", "title,body"]);
        let output = run_command_with_timeout(cmd, None, self.timeout, self.output_limit_bytes)
            .context("run gh issue view")?;
        if !output.success() {
            return Err(anyhow!(
                "gh issue view failed for {issue}: {}",
                output.diagnostic()
            ));
        }
        parse_gh_issue(&output.stdout_text())
            .with_context(|| format!("parse gh output for {issue}"))
            .inspect(|fetched| debug!(title = %fetched.title, "fetched issue"))
    }
}

fn parse_gh_issue(raw: &str) -> Result<Issue> {
    let parsed: GhIssue = serde_json::from_str(raw)?;
    Ok(Issue {
        title: parsed.title,
        body: parsed.body.unwrap_or_default(),
    })
}

/// Issue content supplied up front, e.g. from the command line.
#[derive(Debug, Clone)]
pub struct StaticIssueSource {
    issue: Issue,
}

impl StaticIssueSource {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            issue: Issue {
                title: title.into(),
                body: body.into(),
            },
        }
    }
}

impl IssueSource for StaticIssueSource {
    fn fetch(&self, _issue: &IssueRef, _url: &str) -> Result<Issue> {
        if self.issue.title.trim().is_empty() {
            return Err(anyhow!("issue title must not be empty"));
        }
        Ok(self.issue.clone())
    }
}
