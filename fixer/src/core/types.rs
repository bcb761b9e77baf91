//! Shared deterministic types for the agent pipeline.
//!
//! These types define stable contracts between components. They do not depend
//! on external state or I/O.

use serde::{Deserialize, Serialize};

use crate::error::AgentError;

/// Intended fix for an issue. Produced once per task by the planner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub summary: String,
    pub steps: Vec<String>,
}

impl Plan {
    /// Reject plans with an empty summary or no usable steps.
    pub fn validate(&self) -> Result<(), AgentError> {
        if self.summary.trim().is_empty() {
            return Err(AgentError::InputValidation(
                "plan summary must not be empty".to_string(),
            ));
        }
        if self.steps.is_empty() || self.steps.iter().all(|s| s.trim().is_empty()) {
            return Err(AgentError::InputValidation(
                "plan must contain at least one step".to_string(),
            ));
        }
        Ok(())
    }
}

/// Author of an entry in the planner conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Requester,
    Responder,
    Tool,
}

/// One entry of the append-only planner conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplorationMessage {
    pub role: Role,
    pub content: String,
}

impl ExplorationMessage {
    pub fn requester(content: impl Into<String>) -> Self {
        Self {
            role: Role::Requester,
            content: content.into(),
        }
    }

    pub fn responder(content: impl Into<String>) -> Self {
        Self {
            role: Role::Responder,
            content: content.into(),
        }
    }

    pub fn tool(content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
        }
    }
}

/// Tool call requested by the planner. `action` is the discriminant on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ToolRequest {
    ListDirectory { path: String },
}

/// A planner reply: either a tool call or the finalized plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannerReply {
    Tool(ToolRequest),
    Plan(Plan),
}

/// Kind of a directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
}

/// Immediate child of a listed directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
}

/// Files chosen for one coding attempt (at most the configured cap, all present in the tree).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedFileSet {
    pub files: Vec<String>,
    pub reasoning: String,
}

/// Content of one successfully read file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileContent {
    pub path: String,
    pub content: String,
}

/// Outcome of a successful patch application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyResult {
    /// `a/`-side paths from the diff headers, in header order, not deduplicated.
    pub files_changed: Vec<String>,
}
