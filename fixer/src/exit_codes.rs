//! Stable exit codes for `fixer` CLI commands.

/// Command succeeded.
pub const OK: i32 = 0;
/// Invalid input, configuration, or any runtime error outside the agent loops.
pub const INVALID: i32 = 1;
/// The coder loop used every retry without applying a patch.
pub const RETRIES_EXHAUSTED: i32 = 2;
/// The planner used every exploration step without producing a plan.
pub const EXPLORATION_EXHAUSTED: i32 = 3;
