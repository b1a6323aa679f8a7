//! Authenticated session lookup (`az account show`).

use anyhow::Result;
use serde::Deserialize;
use uuid::Uuid;

use super::AzureCli;

/// Subset of `az account show` output the provisioner needs.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Account {
    id: Uuid,
    tenant_id: Uuid,
    name: String,
}

/// Explicit session context threaded through every provisioning operation,
/// instead of relying on the ambient `az` login state at each call site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Subscription every resource group and role assignment lives in.
    pub subscription_id: Uuid,
    /// Directory tenant the identities are created in.
    pub tenant_id: Uuid,
}

impl AzureCli {
    /// Resolves the current session, doubling as the authentication
    /// pre-flight: a failure here aborts the run before any provisioning.
    pub fn show_account(&self) -> Result<Session> {
        let account: Option<Account> =
            self.run_json(Self::args(&["account", "show", "-o", "json"]))?;
        match account {
            Some(account) => {
                tracing::debug!(
                    "authenticated against subscription {} ({})",
                    account.name,
                    account.id
                );
                Ok(Session {
                    subscription_id: account.id,
                    tenant_id: account.tenant_id,
                })
            }
            // Dry run: no session to resolve.
            None => Ok(Session {
                subscription_id: Uuid::nil(),
                tenant_id: Uuid::nil(),
            }),
        }
    }
}
