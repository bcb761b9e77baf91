//! Attempt logging under `<workspace>/.fixer/`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::core::attempt::{AttemptOutcome, AttemptReport};
use crate::core::types::ExplorationMessage;
use crate::io::STATE_DIR;

#[derive(Debug, Clone)]
pub struct AttemptPaths {
    pub dir: PathBuf,
    pub meta_path: PathBuf,
    pub selection_path: PathBuf,
    pub patch_path: PathBuf,
    pub error_path: PathBuf,
}

impl AttemptPaths {
    pub fn new(workspace_root: &Path, iteration: u32) -> Self {
        let dir = workspace_root
            .join(STATE_DIR)
            .join("attempts")
            .join(iteration.to_string());
        Self {
            meta_path: dir.join("meta.json"),
            selection_path: dir.join("selection.json"),
            patch_path: dir.join("patch.diff"),
            error_path: dir.join("error.log"),
            dir,
        }
    }
}

#[derive(Debug, Serialize)]
struct AttemptMeta<'a> {
    iteration: u32,
    #[serde(flatten)]
    outcome: &'a AttemptOutcome,
    files_tried: &'a [String],
    files_read: usize,
    files_unreadable: usize,
}

/// Write the artifacts of one attempt. Only the artifacts the attempt produced are written;
/// anything left in the iteration directory by an earlier run is removed first.
pub fn write_attempt(workspace_root: &Path, report: &AttemptReport) -> Result<AttemptPaths> {
    let paths = AttemptPaths::new(workspace_root, report.iteration);
    match fs::remove_dir_all(&paths.dir) {
        Ok(()) => {}
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => {
            return Err(err)
                .with_context(|| format!("clear attempt dir {}", paths.dir.display()));
        }
    }
    fs::create_dir_all(&paths.dir)
        .with_context(|| format!("create attempt dir {}", paths.dir.display()))?;

    write_json(
        &paths.meta_path,
        &AttemptMeta {
            iteration: report.iteration,
            outcome: &report.outcome,
            files_tried: &report.files_tried,
            files_read: report.files_read,
            files_unreadable: report.files_unreadable,
        },
    )?;
    if let Some(selection) = &report.selection {
        write_json(&paths.selection_path, selection)?;
    }
    if let Some(diff) = &report.diff {
        write_text(&paths.patch_path, diff)?;
    }
    if let Some(error) = report.error() {
        write_text(&paths.error_path, &format!("{error}\n"))?;
    }
    Ok(paths)
}

pub fn planner_transcript_path(workspace_root: &Path) -> PathBuf {
    workspace_root
        .join(STATE_DIR)
        .join("planner_transcript.json")
}

/// Write the planner conversation as a JSON array of `{role, content}` messages.
pub fn write_planner_transcript(
    workspace_root: &Path,
    messages: &[ExplorationMessage],
) -> Result<PathBuf> {
    let path = planner_transcript_path(workspace_root);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    write_json(&path, &messages)?;
    Ok(path)
}

fn write_text(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents).with_context(|| format!("write {}", path.display()))
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let mut buf = serde_json::to_string_pretty(value)?;
    buf.push('\n');
    write_text(path, &buf)
}
