//! Issue references and issue content.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::AgentError;

static ISSUE_URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"github\.com/([^/\s]+)/([^/\s]+)/issues/(\d+)").unwrap());

/// `owner/repo#number` parsed from an issue URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueRef {
    pub owner: String,
    pub repo: String,
    pub number: u64,
}

impl IssueRef {
    pub fn clone_url(&self) -> String {
        format!("https://github.com/{}/{}.git", self.owner, self.repo)
    }
}

impl fmt::Display for IssueRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}#{}", self.owner, self.repo, self.number)
    }
}

/// Title and body of an issue, as fed to the planner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub title: String,
    #[serde(default)]
    pub body: String,
}

pub fn parse_issue_url(url: &str) -> Result<IssueRef, AgentError> {
    let caps = ISSUE_URL_RE.captures(url.trim()).ok_or_else(|| {
        AgentError::InputValidation(format!("not a GitHub issue URL: '{url}'"))
    })?;
    let number = caps[3].parse::<u64>().map_err(|err| {
        AgentError::InputValidation(format!("invalid issue number in '{url}': {err}"))
    })?;
    Ok(IssueRef {
        owner: caps[1].to_string(),
        repo: caps[2].to_string(),
        number,
    })
}
