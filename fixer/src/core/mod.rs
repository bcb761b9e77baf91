//! Deterministic, pure logic shared by the agents.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod attempt;
pub mod diff;
pub mod issue;
pub mod path_guard;
pub mod reply;
pub mod repo_tree;
pub mod retry;
pub mod skeleton;
pub mod types;
