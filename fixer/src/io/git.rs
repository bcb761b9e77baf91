//! Git adapter for workspace preparation and patch application.
//!
//! Every invocation goes through the bounded process runner, so a hung `git`
//! never blocks a task forever.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use anyhow::{Result, anyhow};
use tracing::{debug, instrument};

use crate::io::process::{CommandOutput, run_command_with_timeout};

/// Wrapper for executing git commands in a working directory.
#[derive(Debug, Clone)]
pub struct Git {
    workdir: PathBuf,
    timeout: Duration,
    output_limit_bytes: usize,
}

impl Git {
    pub fn new(workdir: impl Into<PathBuf>, timeout: Duration, output_limit_bytes: usize) -> Self {
        Self {
            workdir: workdir.into(),
            timeout,
            output_limit_bytes,
        }
    }

    /// Dry-run a patch file against the working tree (`git apply --check`).
    #[instrument(skip_all, fields(patch = %patch.display()))]
    pub fn apply_check(&self, patch: &Path) -> Result<CommandOutput> {
        let patch = patch.to_string_lossy();
        self.run(&["apply", "--check", "--verbose", &patch])
    }

    /// Apply a patch file to the working tree (`git apply`).
    #[instrument(skip_all, fields(patch = %patch.display()))]
    pub fn apply(&self, patch: &Path) -> Result<CommandOutput> {
        let patch = patch.to_string_lossy();
        self.run(&["apply", "--verbose", &patch])
    }

    /// `git init` in the working directory.
    pub fn init(&self) -> Result<()> {
        self.run_checked(&["init", "--quiet"])?;
        Ok(())
    }

    /// Shallow-clone `url` into `dest`. Runs from `dest`'s parent.
    #[instrument(skip_all, fields(url, dest = %dest.display()))]
    pub fn clone_shallow(&self, url: &str, dest: &Path) -> Result<()> {
        let dest = dest.to_string_lossy();
        debug!(url, "cloning repository");
        self.run_checked(&["clone", "--depth", "1", "--quiet", url, &dest])?;
        Ok(())
    }

    fn run_checked(&self, args: &[&str]) -> Result<CommandOutput> {
        let output = self.run(args)?;
        if !output.success() {
            return Err(anyhow!(
                "git {} failed: {}",
                args.join(" "),
                output.diagnostic()
            ));
        }
        Ok(output)
    }

    fn run(&self, args: &[&str]) -> Result<CommandOutput> {
        let mut cmd = Command::new("git");
        cmd.args(args).current_dir(&self.workdir);
        run_command_with_timeout(cmd, None, self.timeout, self.output_limit_bytes)
            .map_err(|err| err.context(format!("run git {}", args.join(" "))))
    }
}
