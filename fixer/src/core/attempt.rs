//! Per-iteration report emitted by the coding loop.

use serde::Serialize;

use crate::core::types::SelectedFileSet;

/// Stage of a coding iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Selecting,
    Reading,
    Generating,
    Applying,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Selecting => "selecting",
            Stage::Reading => "reading",
            Stage::Generating => "generating",
            Stage::Applying => "applying",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AttemptOutcome {
    Applied { files_changed: Vec<String> },
    Failed { stage: Stage, error: String },
}

/// Everything observable about one coding iteration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttemptReport {
    /// 1-based iteration number.
    pub iteration: u32,
    pub selection: Option<SelectedFileSet>,
    /// Union of all files selected up to and including this iteration.
    pub files_tried: Vec<String>,
    pub files_read: usize,
    pub files_unreadable: usize,
    pub diff: Option<String>,
    pub outcome: AttemptOutcome,
}

impl AttemptReport {
    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            AttemptOutcome::Applied { .. } => None,
            AttemptOutcome::Failed { error, .. } => Some(error),
        }
    }
}
