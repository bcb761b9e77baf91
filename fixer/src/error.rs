//! Error kinds reported by the agent components.
//!
//! Every component returns `Result<_, AgentError>` instead of letting failures
//! escape its boundary. The coder loop is the only place that turns repeated
//! per-iteration failures into a terminal outcome.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    /// Missing or malformed task inputs. Never retried.
    #[error("invalid input: {0}")]
    InputValidation(String),

    /// The planner ran out of exploration steps without a finalized plan.
    #[error("planner did not produce a plan within {steps} exploration steps")]
    ExplorationExhausted { steps: u32 },

    /// The planner reply matched neither a tool request nor a plan.
    #[error("malformed planner reply: {0}")]
    MalformedReply(String),

    #[error("file selection failed: {0}")]
    SelectionFailed(String),

    #[error("failed to read any files: {0}")]
    NoFilesReadable(String),

    #[error("invalid diff format: {0}")]
    InvalidDiffFormat(String),

    /// Dry-run of the patch tool rejected the diff. Carries the tool output verbatim.
    #[error("diff validation failed: {diagnostic}")]
    ValidationFailed { diagnostic: String },

    /// The mutating apply failed after a successful dry-run.
    #[error("diff application failed: {diagnostic}")]
    ApplyFailed { diagnostic: String },

    #[error("path '{path}' escapes the workspace root")]
    PathTraversal { path: String },

    /// The inference boundary failed or returned nothing usable.
    #[error("inference failed: {0}")]
    Inference(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl AgentError {
    /// True for the kinds the coder loop feeds into its next iteration.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AgentError::SelectionFailed(_)
                | AgentError::NoFilesReadable(_)
                | AgentError::InvalidDiffFormat(_)
                | AgentError::ValidationFailed { .. }
                | AgentError::ApplyFailed { .. }
                | AgentError::Inference(_)
        )
    }

    pub(crate) fn inference(err: anyhow::Error) -> Self {
        AgentError::Inference(format!("{err:#}"))
    }
}
