//! Inference abstraction: prompt text in, reply text out.
//!
//! The [`Inference`] trait decouples the agents from the model backend. The
//! production backend pipes the prompt through an external command; tests use
//! scripted backends that return canned replies without spawning processes.

use std::process::Command;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, instrument, warn};

use crate::io::config::InferenceConfig;
use crate::io::process::run_command_with_timeout;

pub trait Inference {
    /// Send one prompt and return the reply text.
    fn infer(&self, prompt: &str) -> Result<String>;
}

impl<T: Inference + ?Sized> Inference for &T {
    fn infer(&self, prompt: &str) -> Result<String> {
        (**self).infer(prompt)
    }
}

/// Inference backend that writes the prompt to a command's stdin and reads the reply from stdout.
#[derive(Debug, Clone)]
pub struct CommandInference {
    config: InferenceConfig,
}

impl CommandInference {
    pub fn new(config: InferenceConfig) -> Result<Self> {
        if config.command.is_empty() || config.command[0].trim().is_empty() {
            return Err(anyhow!("inference command must be a non-empty array"));
        }
        Ok(Self { config })
    }
}

impl Inference for CommandInference {
    #[instrument(skip_all, fields(program = %self.config.command[0], prompt_bytes = prompt.len()))]
    fn infer(&self, prompt: &str) -> Result<String> {
        let mut cmd = Command::new(&self.config.command[0]);
        cmd.args(&self.config.command[1..]);

        let output = run_command_with_timeout(
            cmd,
            Some(prompt.as_bytes()),
            self.config.timeout(),
            self.config.output_limit_bytes,
        )
        .with_context(|| format!("run inference command {}", self.config.command.join(" ")))?;

        if output.timed_out {
            warn!(timeout_secs = self.config.timeout_secs, "inference timed out");
            return Err(anyhow!(
                "inference command timed out after {}s",
                self.config.timeout_secs
            ));
        }
        if !output.status.success() {
            warn!(exit_code = ?output.status.code(), "inference command failed");
            return Err(anyhow!(
                "inference command failed with status {:?}: {}",
                output.status.code(),
                output.diagnostic()
            ));
        }
        if output.stdout_truncated > 0 {
            return Err(anyhow!(
                "inference reply exceeded {} bytes",
                self.config.output_limit_bytes
            ));
        }

        let text = output.stdout_text();
        if text.trim().is_empty() {
            return Err(anyhow!("inference command returned an empty reply"));
        }
        debug!(reply_bytes = text.len(), "inference completed");
        Ok(text)
    }
}
