//! Task record persistence (`<workspace>/.fixer/task.json`).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::types::Plan;
use crate::io::write_atomic;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Queued,
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStep {
    Planning,
    Coding,
    Done,
}

/// Persisted state of one issue-to-patch task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: String,
    pub issue_url: String,
    pub status: TaskStatus,
    pub current_step: Option<TaskStep>,
    pub plan: Option<Plan>,
    #[serde(default)]
    pub files_changed: Vec<String>,
    /// Coding iteration at which the task ended.
    pub iteration: Option<u32>,
    pub error_message: Option<String>,
}

impl TaskRecord {
    pub fn new(id: impl Into<String>, issue_url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            issue_url: issue_url.into(),
            status: TaskStatus::Queued,
            current_step: None,
            plan: None,
            files_changed: Vec::new(),
            iteration: None,
            error_message: None,
        }
    }
}

/// Write side of task persistence used by the pipeline.
pub trait TaskStore {
    fn record(&self) -> &TaskRecord;

    fn persist_plan(&mut self, plan: &Plan) -> Result<()>;

    /// Record a status transition. `error` replaces any previous error message.
    fn persist_status(
        &mut self,
        status: TaskStatus,
        step: TaskStep,
        error: Option<&str>,
    ) -> Result<()>;

    fn persist_result(&mut self, files_changed: &[String], iteration: u32) -> Result<()>;
}

/// Task store backed by a single JSON file, rewritten atomically on every change.
#[derive(Debug)]
pub struct JsonTaskStore {
    path: PathBuf,
    record: TaskRecord,
}

impl JsonTaskStore {
    pub fn path_for(state_dir: &Path) -> PathBuf {
        state_dir.join("task.json")
    }

    /// Start a store with `record`, writing it immediately.
    pub fn create(path: impl Into<PathBuf>, record: TaskRecord) -> Result<Self> {
        let store = Self {
            path: path.into(),
            record,
        };
        store.flush()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<()> {
        debug!(
            path = %self.path.display(),
            status = ?self.record.status,
            step = ?self.record.current_step,
            "writing task record"
        );
        let mut buf = serde_json::to_string_pretty(&self.record)?;
        buf.push('\n');
        write_atomic(&self.path, &buf)
    }
}

impl TaskStore for JsonTaskStore {
    fn record(&self) -> &TaskRecord {
        &self.record
    }

    fn persist_plan(&mut self, plan: &Plan) -> Result<()> {
        self.record.plan = Some(plan.clone());
        self.flush()
    }

    fn persist_status(
        &mut self,
        status: TaskStatus,
        step: TaskStep,
        error: Option<&str>,
    ) -> Result<()> {
        self.record.status = status;
        self.record.current_step = Some(step);
        self.record.error_message = error.map(str::to_string);
        self.flush()
    }

    fn persist_result(&mut self, files_changed: &[String], iteration: u32) -> Result<()> {
        self.record.files_changed = files_changed.to_vec();
        self.record.iteration = Some(iteration);
        self.flush()
    }
}

pub fn load_task_record(path: &Path) -> Result<TaskRecord> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read task record {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("parse task record {}", path.display()))
}
