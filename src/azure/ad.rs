//! Directory (Entra ID) operations: app registrations, service principals,
//! federated credentials, and the Graph permission grant used by bootstrap.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::AzureCli;

/// Microsoft Graph's well-known application id.
pub const MICROSOFT_GRAPH_API: &str = "00000003-0000-0000-c000-000000000000";

/// Delegated `Application.ReadWrite.All` scope id on Microsoft Graph.
pub const APPLICATION_READWRITE_ALL_SCOPE: &str = "bdfbf15f-ee85-4955-8675-146e8e5296b5";

/// App registration as returned by `az ad app` commands.
///
/// `id` is the directory object id (used to address federated credentials
/// and permission grants); `app_id` is the client id CI workflows log in
/// with and the assignee of role assignments.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppRegistration {
    pub id: Uuid,
    pub app_id: Uuid,
    pub display_name: String,
}

/// Service principal as returned by `az ad sp` commands.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicePrincipal {
    pub id: Uuid,
    pub app_id: Uuid,
}

/// Federated credential payload, serialized verbatim as the `--parameters`
/// argument of `az ad app federated-credential create`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FederatedCredentialSpec {
    pub name: String,
    pub issuer: String,
    pub subject: String,
    pub description: String,
    pub audiences: Vec<String>,
}

/// Federated credential as returned by the list operation.
#[derive(Debug, Clone, Deserialize)]
pub struct FederatedCredential {
    pub name: String,
    pub issuer: String,
    pub subject: String,
}

/// One entry of an app registration's `requiredResourceAccess` list.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RequiredResourceAccess {
    resource_app_id: String,
    resource_access: Vec<ResourceAccess>,
}

#[derive(Debug, Clone, Deserialize)]
struct ResourceAccess {
    id: String,
}

impl AzureCli {
    /// Looks up an app registration by display name, returning the first
    /// match (display names are unique under the deterministic scheme).
    pub fn find_app(&self, display_name: &str) -> Result<Option<AppRegistration>> {
        let apps: Option<Vec<AppRegistration>> = self.run_json(Self::args(&[
            "ad", "app", "list", "--display-name", display_name, "-o", "json",
        ]))?;
        Ok(apps.and_then(|apps| apps.into_iter().next()))
    }

    /// Creates an app registration with the given display name.
    pub fn create_app(&self, display_name: &str) -> Result<AppRegistration> {
        let app: Option<AppRegistration> = self.run_json(Self::args(&[
            "ad", "app", "create", "--display-name", display_name, "-o", "json",
        ]))?;
        Ok(app.unwrap_or_else(|| AppRegistration {
            id: Uuid::nil(),
            app_id: Uuid::nil(),
            display_name: display_name.to_string(),
        }))
    }

    /// Looks up the service principal linked to an app registration.
    pub fn find_service_principal(&self, app_id: &Uuid) -> Result<Option<ServicePrincipal>> {
        let filter = format!("appId eq '{}'", app_id);
        let sps: Option<Vec<ServicePrincipal>> = self.run_json(Self::args(&[
            "ad", "sp", "list", "--filter", &filter, "-o", "json",
        ]))?;
        Ok(sps.and_then(|sps| sps.into_iter().next()))
    }

    /// Creates the service principal for an app registration.
    ///
    /// May fail shortly after app creation while the directory replicates;
    /// callers wrap this in a retry policy.
    pub fn create_service_principal(&self, app_id: &Uuid) -> Result<ServicePrincipal> {
        let id = app_id.to_string();
        let sp: Option<ServicePrincipal> =
            self.run_json(Self::args(&["ad", "sp", "create", "--id", &id, "-o", "json"]))?;
        Ok(sp.unwrap_or_else(|| ServicePrincipal {
            id: Uuid::nil(),
            app_id: *app_id,
        }))
    }

    /// Lists the federated credentials attached to an app registration
    /// (addressed by directory object id).
    pub fn list_federated_credentials(&self, object_id: &Uuid) -> Result<Vec<FederatedCredential>> {
        let id = object_id.to_string();
        let creds: Option<Vec<FederatedCredential>> = self.run_json(Self::args(&[
            "ad",
            "app",
            "federated-credential",
            "list",
            "--id",
            &id,
            "-o",
            "json",
        ]))?;
        Ok(creds.unwrap_or_default())
    }

    /// Creates a federated credential from the exact payload in `spec`.
    pub fn create_federated_credential(
        &self,
        object_id: &Uuid,
        spec: &FederatedCredentialSpec,
    ) -> Result<()> {
        let id = object_id.to_string();
        let parameters =
            serde_json::to_string(spec).map_err(|e| crate::error::AzFederateError::Json {
                context: format!("serialize federated credential parameters for {}", spec.name),
                source: e,
            })?;
        self.run_checked(Self::args(&[
            "ad",
            "app",
            "federated-credential",
            "create",
            "--id",
            &id,
            "--parameters",
            &parameters,
            "-o",
            "none",
        ]))?;
        Ok(())
    }

    /// Checks whether the delegated Graph permission is already attached.
    pub fn has_graph_permission(&self, object_id: &Uuid) -> Result<bool> {
        let id = object_id.to_string();
        let grants: Option<Vec<RequiredResourceAccess>> = self.run_json(Self::args(&[
            "ad", "app", "permission", "list", "--id", &id, "-o", "json",
        ]))?;
        let Some(grants) = grants else {
            return Ok(false);
        };
        Ok(grants.iter().any(|g| {
            g.resource_app_id == MICROSOFT_GRAPH_API
                && g.resource_access
                    .iter()
                    .any(|a| a.id == APPLICATION_READWRITE_ALL_SCOPE)
        }))
    }

    /// Attaches the delegated `Application.ReadWrite.All` Graph permission.
    pub fn add_graph_permission(&self, object_id: &Uuid) -> Result<()> {
        let id = object_id.to_string();
        let permission = format!("{}=Scope", APPLICATION_READWRITE_ALL_SCOPE);
        self.run_checked(Self::args(&[
            "ad",
            "app",
            "permission",
            "add",
            "--id",
            &id,
            "--api",
            MICROSOFT_GRAPH_API,
            "--api-permissions",
            &permission,
        ]))?;
        Ok(())
    }

    /// Grants admin consent for the app's configured permissions.
    pub fn grant_admin_consent(&self, app_id: &Uuid) -> Result<()> {
        let id = app_id.to_string();
        self.run_checked(Self::args(&[
            "ad",
            "app",
            "permission",
            "admin-consent",
            "--id",
            &id,
        ]))?;
        Ok(())
    }
}
