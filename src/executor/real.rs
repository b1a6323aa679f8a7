//! Real command executor implementation.
//!
//! This module provides [`RealCommandExecutor`], which executes commands
//! using `std::process::Command` with captured output. Unlike a streaming
//! executor, output is collected in full: every call here is a short-lived
//! `az` invocation whose stdout is a JSON document to be parsed.

use std::process::{Command, Stdio};

use anyhow::Result;
use which::which;

use super::{CommandExecutor, CommandSpec, ExecutionResult};
use crate::error::AzFederateError;

/// Command executor that runs actual system commands.
///
/// When `dry_run` is true, commands are logged but not executed,
/// and `execute()` returns `Ok(ExecutionResult { status: None, .. })`.
pub struct RealCommandExecutor {
    pub dry_run: bool,
}

impl CommandExecutor for RealCommandExecutor {
    fn execute(&self, spec: &CommandSpec) -> Result<ExecutionResult> {
        if self.dry_run {
            tracing::info!("dry run: {}", spec.display());
            return Ok(ExecutionResult {
                status: None,
                stdout: String::new(),
                stderr: String::new(),
            });
        }

        let cmd = which(&spec.command).map_err(|_| AzFederateError::CommandNotFound {
            command: spec.command.clone(),
        })?;
        tracing::trace!("command found: {}: {}", spec.command, cmd.to_string_lossy());

        let mut command = Command::new(cmd);
        command.args(&spec.args);

        for (key, value) in &spec.env {
            command.env(key, value);
        }

        command.stdin(Stdio::null());

        let output = command.output().map_err(|e| AzFederateError::Execution {
            command: spec.display(),
            status: format!("failed to spawn command: {}", e),
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        tracing::trace!(
            "executed command: {}: success={}",
            spec.command,
            output.status.success()
        );
        if !stderr.trim().is_empty() {
            tracing::debug!("{} stderr: {}", spec.command, stderr.trim());
        }

        Ok(ExecutionResult {
            status: Some(output.status),
            stdout,
            stderr,
        })
    }
}
