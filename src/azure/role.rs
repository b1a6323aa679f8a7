//! Role assignment operations.

use anyhow::Result;
use serde::Deserialize;
use uuid::Uuid;

use super::AzureCli;

/// Role assignment as returned by `az role assignment list`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleAssignment {
    pub scope: String,
    pub role_definition_name: String,
}

impl AzureCli {
    /// Checks whether an assignment exists for the (assignee, role, scope)
    /// triple. The list call filters on all three, so any entry is a match.
    pub fn has_role_assignment(&self, assignee: &Uuid, role: &str, scope: &str) -> Result<bool> {
        let id = assignee.to_string();
        let assignments: Option<Vec<RoleAssignment>> = self.run_json(Self::args(&[
            "role",
            "assignment",
            "list",
            "--assignee",
            &id,
            "--role",
            role,
            "--scope",
            scope,
            "-o",
            "json",
        ]))?;
        Ok(assignments.is_some_and(|a| !a.is_empty()))
    }

    /// Creates a role assignment for the (assignee, role, scope) triple.
    pub fn create_role_assignment(&self, assignee: &Uuid, role: &str, scope: &str) -> Result<()> {
        let id = assignee.to_string();
        self.run_checked(Self::args(&[
            "role",
            "assignment",
            "create",
            "--assignee",
            &id,
            "--role",
            role,
            "--scope",
            scope,
            "-o",
            "none",
        ]))?;
        Ok(())
    }
}
