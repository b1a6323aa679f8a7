//! Typed wrapper over the `az` CLI.
//!
//! Every operation is a single `az` invocation with `-o json` output parsed
//! into a typed struct. The wrapper never mutates anything it can look up
//! first: all create operations are paired with an existence check at the
//! call site, which is what makes the provisioner idempotent.
//!
//! In dry-run mode the executor returns no status and no output; lookup
//! helpers then report "absent" and create helpers return placeholder
//! objects with nil ids, so a dry run logs the full step sequence without
//! contacting Azure.

mod account;
mod ad;
mod group;
mod role;

use std::sync::Arc;

use anyhow::Result;
use serde::de::DeserializeOwned;

use crate::error::AzFederateError;
use crate::executor::{CommandExecutor, CommandSpec, ExecutionResult};

pub use account::Session;
pub use ad::{AppRegistration, FederatedCredential, FederatedCredentialSpec, ServicePrincipal};
pub use role::RoleAssignment;

/// Handle to the `az` CLI through a [`CommandExecutor`].
pub struct AzureCli {
    executor: Arc<dyn CommandExecutor>,
}

impl AzureCli {
    pub fn new(executor: Arc<dyn CommandExecutor>) -> Self {
        Self { executor }
    }

    /// Builds the command spec for an `az` invocation.
    ///
    /// `AZURE_CORE_ONLY_SHOW_ERRORS` keeps warnings out of stderr so that
    /// [`ExecutionResult::failure_reason`] surfaces the actual error line.
    fn spec(args: Vec<String>) -> CommandSpec {
        CommandSpec::new("az", args).with_env("AZURE_CORE_ONLY_SHOW_ERRORS", "true")
    }

    /// Converts borrowed argument slices into the owned form `CommandSpec` takes.
    fn args(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    /// Runs an `az` invocation, failing on a non-zero exit status.
    fn run_checked(&self, args: Vec<String>) -> Result<ExecutionResult> {
        let spec = Self::spec(args);
        let result = self.executor.execute(&spec)?;
        if !result.success() {
            return Err(AzFederateError::Execution {
                command: spec.display(),
                status: result.failure_reason(),
            }
            .into());
        }
        Ok(result)
    }

    /// Runs an `az` invocation and parses its stdout as JSON.
    ///
    /// Returns `None` in dry-run mode, where there is no output to parse.
    fn run_json<T: DeserializeOwned>(&self, args: Vec<String>) -> Result<Option<T>> {
        let spec = Self::spec(args);
        let result = self.executor.execute(&spec)?;
        if !result.success() {
            return Err(AzFederateError::Execution {
                command: spec.display(),
                status: result.failure_reason(),
            }
            .into());
        }
        if result.is_dry_run() {
            return Ok(None);
        }
        let value = serde_json::from_str(&result.stdout).map_err(|e| AzFederateError::Json {
            context: spec.display(),
            source: e,
        })?;
        Ok(Some(value))
    }
}
