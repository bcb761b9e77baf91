//! Accumulator threaded through the coding retry loop.

use std::collections::BTreeSet;

/// State carried from one coding iteration to the next.
///
/// The value is never mutated in place: each failed iteration produces the next
/// state via [`RetryState::after_failure`], so every iteration's inputs can be
/// reproduced from the state it was handed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetryState {
    /// Number of iterations already completed (and failed).
    pub iteration: u32,
    pub previous_files_tried: BTreeSet<String>,
    pub previous_error: Option<String>,
}

impl RetryState {
    pub fn initial() -> Self {
        Self::default()
    }

    /// 1-based number of the attempt this state feeds.
    pub fn attempt(&self) -> u32 {
        self.iteration + 1
    }

    /// Union of the files tried so far with `selected`.
    pub fn files_tried_with(&self, selected: &[String]) -> BTreeSet<String> {
        let mut tried = self.previous_files_tried.clone();
        tried.extend(selected.iter().cloned());
        tried
    }

    /// State for the next iteration after the current one failed.
    pub fn after_failure(&self, files_tried: BTreeSet<String>, error: impl Into<String>) -> Self {
        Self {
            iteration: self.iteration + 1,
            previous_files_tried: files_tried,
            previous_error: Some(error.into()),
        }
    }
}
