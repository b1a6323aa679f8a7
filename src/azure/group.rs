//! Resource group operations.

use anyhow::Result;

use super::AzureCli;
use crate::error::AzFederateError;

impl AzureCli {
    /// Checks whether a resource group exists.
    ///
    /// `az group exists` prints a bare JSON boolean, which distinguishes
    /// "absent" from "request failed" cleanly (unlike `az group show`,
    /// where both surface as a non-zero exit).
    pub fn group_exists(&self, name: &str) -> Result<bool> {
        let result = self.run_checked(Self::args(&["group", "exists", "--name", name]))?;
        if result.is_dry_run() {
            return Ok(false);
        }
        let exists = serde_json::from_str(result.stdout.trim()).map_err(|e| {
            AzFederateError::Json {
                context: format!("az group exists --name {}", name),
                source: e,
            }
        })?;
        Ok(exists)
    }

    /// Creates a resource group in the given location.
    pub fn create_group(&self, name: &str, location: &str) -> Result<()> {
        self.run_checked(Self::args(&[
            "group", "create", "--name", name, "--location", location, "-o", "none",
        ]))?;
        Ok(())
    }
}
