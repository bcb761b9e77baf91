//! Issue-to-patch agent pipeline.
//!
//! Given an issue, the pipeline plans a fix with a bounded exploration loop and
//! then drives a bounded coder loop that selects files, reads them, asks for a
//! unified diff, and applies it. The crate keeps a strict split:
//!
//! - **[`core`]**: Pure, deterministic logic (plans, model-reply parsing, diff
//!   checks, path containment, retry bookkeeping). No I/O.
//! - **[`io`]**: Side-effecting operations (filesystem, `git`, child processes,
//!   inference). Isolated behind traits so tests can script them.
//!
//! [`agents`] wrap single model exchanges, [`coder`] owns the retry loop, and
//! [`pipeline`] ties a task record to both loops.

pub mod agents;
pub mod coder;
pub mod core;
pub mod error;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod pipeline;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
