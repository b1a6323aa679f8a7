//! Per-repository provisioner.
//!
//! The only component with real logic: five idempotent steps, each a
//! lookup followed by a create only when the lookup came back empty.
//! Nothing is ever updated in place or deleted, so a half-provisioned
//! repository is repaired simply by re-running.

pub mod names;
pub mod retry;

use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, info};
use uuid::Uuid;

use crate::azure::{AppRegistration, AzureCli, FederatedCredentialSpec, Session};
use retry::RetryPolicy;

/// Provisioning step, used as the log label for outcome lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum Step {
    #[strum(serialize = "resource group")]
    ResourceGroup,
    #[strum(serialize = "app registration")]
    AppRegistration,
    #[strum(serialize = "service principal")]
    ServicePrincipal,
    #[strum(serialize = "role assignment")]
    RoleAssignment,
    #[strum(serialize = "federated credential")]
    FederatedCredential,
}

/// The three values the consuming CI system stores as protected
/// configuration to log in with the provisioned identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoIdentity {
    pub client_id: Uuid,
    pub tenant_id: Uuid,
    pub subscription_id: Uuid,
}

/// Executes the idempotent provisioning steps for one repository.
pub struct RepoProvisioner<'a> {
    azure: &'a AzureCli,
    session: &'a Session,
    retry: RetryPolicy,
    replication_wait: Duration,
}

impl<'a> RepoProvisioner<'a> {
    pub fn new(
        azure: &'a AzureCli,
        session: &'a Session,
        retry: RetryPolicy,
        replication_wait: Duration,
    ) -> Self {
        Self {
            azure,
            session,
            retry,
            replication_wait,
        }
    }

    /// The session the provisioner operates in.
    pub fn session(&self) -> &Session {
        self.session
    }

    /// Ensures the full per-repository state exists.
    ///
    /// Steps run strictly in order and the first failure aborts this
    /// repository's run; no rollback is attempted.
    pub fn provision(&self, org: &str, repo: &str, location: &str) -> Result<RepoIdentity> {
        self.ensure_resource_group(&names::resource_group(repo), location)?;

        let app = self.ensure_app_registration(&names::app_display_name(repo))?;
        self.ensure_service_principal(&app)?;

        let scope =
            names::resource_group_scope(&self.session.subscription_id, &names::resource_group(repo));
        self.ensure_role_assignment(&app, &scope)?;

        self.ensure_federated_credentials(&app, org, repo)?;

        Ok(RepoIdentity {
            client_id: app.app_id,
            tenant_id: self.session.tenant_id,
            subscription_id: self.session.subscription_id,
        })
    }

    /// Step 1: resource group.
    pub fn ensure_resource_group(&self, name: &str, location: &str) -> Result<()> {
        if self.azure.group_exists(name)? {
            info!("{} {} already exists, skipping", Step::ResourceGroup, name);
            return Ok(());
        }
        info!("creating {} {} in {}", Step::ResourceGroup, name, location);
        self.azure
            .create_group(name, location)
            .with_context(|| format!("failed to create resource group {}", name))
    }

    /// Step 2: app registration.
    ///
    /// After a fresh creation, pauses for the configured replication wait
    /// so that dependent directory lookups have a chance to see the object.
    pub fn ensure_app_registration(&self, display_name: &str) -> Result<AppRegistration> {
        if let Some(app) = self.azure.find_app(display_name)? {
            info!("{} {} already exists, skipping", Step::AppRegistration, display_name);
            return Ok(app);
        }

        info!("creating {} {}", Step::AppRegistration, display_name);
        let app = self
            .azure
            .create_app(display_name)
            .with_context(|| format!("failed to create app registration {}", display_name))?;

        if !self.replication_wait.is_zero() {
            debug!("waiting {:?} for directory replication", self.replication_wait);
            thread::sleep(self.replication_wait);
        }

        Ok(app)
    }

    /// Step 3: service principal, with retry for directory replication lag.
    pub fn ensure_service_principal(&self, app: &AppRegistration) -> Result<()> {
        if self.azure.find_service_principal(&app.app_id)?.is_some() {
            info!("{} for {} already exists, skipping", Step::ServicePrincipal, app.display_name);
            return Ok(());
        }

        info!("creating {} for {}", Step::ServicePrincipal, app.display_name);
        self.retry
            .run("service principal creation", || {
                self.azure.create_service_principal(&app.app_id).map(|_| ())
            })
            .with_context(|| {
                format!("failed to create service principal for {}", app.display_name)
            })?;
        Ok(())
    }

    /// Step 4: role assignment, scoped exactly to the given scope.
    pub fn ensure_role_assignment(&self, app: &AppRegistration, scope: &str) -> Result<()> {
        let role = names::PROVISIONED_ROLE;
        if self.azure.has_role_assignment(&app.app_id, role, scope)? {
            info!("{} ({}, {}) already exists, skipping", Step::RoleAssignment, role, scope);
            return Ok(());
        }
        info!("creating {}: {} for {} at {}", Step::RoleAssignment, role, app.display_name, scope);
        self.azure
            .create_role_assignment(&app.app_id, role, scope)
            .with_context(|| format!("failed to assign role {} at {}", role, scope))
    }

    /// Step 5: both federated credentials.
    pub fn ensure_federated_credentials(
        &self,
        app: &AppRegistration,
        org: &str,
        repo: &str,
    ) -> Result<()> {
        let existing: Vec<String> = self
            .azure
            .list_federated_credentials(&app.id)?
            .into_iter()
            .map(|c| c.name)
            .collect();

        for spec in federated_credential_specs(org, repo) {
            if existing.iter().any(|name| *name == spec.name) {
                info!("{} {} already exists, skipping", Step::FederatedCredential, spec.name);
                continue;
            }
            info!("creating {} {} ({})", Step::FederatedCredential, spec.name, spec.subject);
            self.azure
                .create_federated_credential(&app.id, &spec)
                .with_context(|| format!("failed to create federated credential {}", spec.name))?;
        }
        Ok(())
    }

    /// Bootstrap-only: the delegated Graph permission the automation
    /// identity needs to create app registrations itself.
    pub fn ensure_graph_permission(&self, app: &AppRegistration) -> Result<()> {
        if self.azure.has_graph_permission(&app.id)? {
            info!("Graph permission on {} already exists, skipping", app.display_name);
            return Ok(());
        }
        info!("adding delegated Application.ReadWrite.All to {}", app.display_name);
        self.azure
            .add_graph_permission(&app.id)
            .with_context(|| format!("failed to add Graph permission to {}", app.display_name))
    }

    /// Bootstrap-only: admin consent for the configured permissions.
    pub fn grant_admin_consent(&self, app: &AppRegistration) -> Result<()> {
        info!("granting admin consent for {}", app.display_name);
        self.azure.grant_admin_consent(&app.app_id)
    }
}

/// The two trust bindings every repository receives: pushes to main and
/// pull-request events.
pub fn federated_credential_specs(org: &str, repo: &str) -> [FederatedCredentialSpec; 2] {
    [
        FederatedCredentialSpec {
            name: names::MAIN_BRANCH_CREDENTIAL.to_string(),
            issuer: names::GITHUB_OIDC_ISSUER.to_string(),
            subject: names::main_branch_subject(org, repo),
            description: format!("GitHub Actions: {}/{} main branch", org, repo),
            audiences: vec![names::TOKEN_EXCHANGE_AUDIENCE.to_string()],
        },
        FederatedCredentialSpec {
            name: names::PULL_REQUEST_CREDENTIAL.to_string(),
            issuer: names::GITHUB_OIDC_ISSUER.to_string(),
            subject: names::pull_request_subject(org, repo),
            description: format!("GitHub Actions: {}/{} pull requests", org, repo),
            audiences: vec![names::TOKEN_EXCHANGE_AUDIENCE.to_string()],
        },
    ]
}
