//! One-time bootstrap: onboarding the automation's own identity.
//!
//! Same app-registration/service-principal/federated-credential sequence as
//! the per-repository provisioner, with two differences: the Owner role is
//! scoped to the whole subscription, and the identity additionally receives
//! the delegated Graph permission (plus an admin-consent attempt) it needs
//! to create app registrations for the repositories it will provision.

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::config::Manifest;
use crate::provision::{RepoProvisioner, names};

pub fn run_bootstrap(manifest: &Manifest, provisioner: &RepoProvisioner<'_>) -> Result<()> {
    let settings = manifest.bootstrap_settings()?;
    let repo = &settings.repository;

    info!("bootstrapping automation identity for {}/{}", manifest.organization, repo);

    let app = provisioner.ensure_app_registration(&names::app_display_name(repo))?;
    provisioner.ensure_service_principal(&app)?;

    let scope = names::subscription_scope(&provisioner.session().subscription_id);
    provisioner.ensure_role_assignment(&app, &scope)?;

    provisioner.ensure_federated_credentials(&app, &manifest.organization, repo)?;

    provisioner.ensure_graph_permission(&app)?;

    match provisioner.grant_admin_consent(&app) {
        Ok(()) => info!("admin consent granted for {}", app.display_name),
        Err(e) if settings.require_admin_consent => {
            return Err(e).context("admin consent is required by the manifest");
        }
        Err(e) => {
            // Without consent the provision subcommand cannot create app
            // registrations; the grant can be completed manually later.
            warn!("admin consent could not be granted: {:#}", e);
            warn!(
                "WARNING: repository provisioning will fail until an administrator \
                consents to Application.ReadWrite.All for {}",
                app.display_name
            );
        }
    }

    info!(
        "{}: AZURE_CLIENT_ID={} AZURE_TENANT_ID={} AZURE_SUBSCRIPTION_ID={}",
        repo,
        app.app_id,
        provisioner.session().tenant_id,
        provisioner.session().subscription_id
    );

    Ok(())
}
