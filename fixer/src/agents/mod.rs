//! Model-backed agents: planning, file selection, patch generation.

pub mod generator;
pub mod planner;
pub mod selector;
