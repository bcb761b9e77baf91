//! Fixer configuration (`fixer.toml`).

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// Fixer configuration (TOML).
///
/// Missing fields default to the values below, so an absent or empty file is a
/// valid configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FixerConfig {
    /// Planner exchanges allowed before giving up without a plan.
    pub max_exploration_steps: u32,

    /// Coding iterations (select, read, generate, apply) allowed per task.
    pub max_coding_retries: u32,

    /// Cap on files handed to patch generation per iteration.
    pub max_selected_files: usize,

    /// Pause between failed coding iterations.
    pub retry_delay_ms: u64,

    /// Cap on repository-tree lines rendered into prompts.
    pub tree_prompt_max_entries: usize,

    pub inference: InferenceConfig,

    pub patch_tool: PatchToolConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct InferenceConfig {
    /// Command that reads a prompt on stdin and writes the reply to stdout.
    pub command: Vec<String>,
    pub timeout_secs: u64,
    pub output_limit_bytes: usize,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            command: vec!["llm".to_string()],
            timeout_secs: 300,
            output_limit_bytes: 1_000_000,
        }
    }
}

impl InferenceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Limits for `git` invocations (clone, apply check, apply).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PatchToolConfig {
    pub timeout_secs: u64,
    pub output_limit_bytes: usize,
}

impl Default for PatchToolConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 120,
            output_limit_bytes: 100_000,
        }
    }
}

impl PatchToolConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for FixerConfig {
    fn default() -> Self {
        Self {
            max_exploration_steps: 5,
            max_coding_retries: 3,
            max_selected_files: 3,
            retry_delay_ms: 0,
            tree_prompt_max_entries: 2_000,
            inference: InferenceConfig::default(),
            patch_tool: PatchToolConfig::default(),
        }
    }
}

impl FixerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_exploration_steps == 0 {
            return Err(anyhow!("max_exploration_steps must be > 0"));
        }
        if self.max_coding_retries == 0 {
            return Err(anyhow!("max_coding_retries must be > 0"));
        }
        if self.max_selected_files == 0 {
            return Err(anyhow!("max_selected_files must be > 0"));
        }
        if self.tree_prompt_max_entries == 0 {
            return Err(anyhow!("tree_prompt_max_entries must be > 0"));
        }
        if self.inference.command.is_empty() || self.inference.command[0].trim().is_empty() {
            return Err(anyhow!("inference.command must be a non-empty array"));
        }
        if self.inference.timeout_secs == 0 {
            return Err(anyhow!("inference.timeout_secs must be > 0"));
        }
        if self.inference.output_limit_bytes == 0 {
            return Err(anyhow!("inference.output_limit_bytes must be > 0"));
        }
        if self.patch_tool.timeout_secs == 0 {
            return Err(anyhow!("patch_tool.timeout_secs must be > 0"));
        }
        if self.patch_tool.output_limit_bytes == 0 {
            return Err(anyhow!("patch_tool.output_limit_bytes must be > 0"));
        }
        Ok(())
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `FixerConfig::default()`.
pub fn load_config(path: &Path) -> Result<FixerConfig> {
    if !path.exists() {
        let cfg = FixerConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: FixerConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &FixerConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    crate::io::write_atomic(path, &buf)
}
