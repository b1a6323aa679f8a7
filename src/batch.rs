//! Batch driver: one provisioner pass over every configured repository.
//!
//! Strictly sequential, never aborting early: one repository's failure is
//! converted into a status record at this boundary and never blocks the
//! repositories after it.

use std::fmt;

use tracing::{error, info};

use crate::config::Manifest;
use crate::provision::{RepoIdentity, RepoProvisioner};

/// Outcome of one repository's provisioning run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoStatus {
    Succeeded(RepoIdentity),
    Failed(String),
}

impl fmt::Display for RepoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepoStatus::Succeeded(_) => write!(f, "Success"),
            RepoStatus::Failed(reason) => write!(f, "Failed({})", reason),
        }
    }
}

/// Per-repository entry in the batch summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoReport {
    pub repository: String,
    pub status: RepoStatus,
}

/// Result of a full batch pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    pub reports: Vec<RepoReport>,
}

impl BatchSummary {
    pub fn succeeded(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| matches!(r.status, RepoStatus::Succeeded(_)))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.reports.len() - self.succeeded()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed() == 0
    }

    /// Logs the per-repository table and the aggregate counts.
    pub fn log(&self) {
        info!("summary: {} succeeded, {} failed", self.succeeded(), self.failed());
        for report in &self.reports {
            info!("  {:<40} {}", report.repository, report.status);
        }
    }
}

/// Runs the provisioner once per configured repository, in manifest order.
pub fn run_batch(manifest: &Manifest, provisioner: &RepoProvisioner<'_>) -> BatchSummary {
    let total = manifest.repositories.len();
    let mut reports = Vec::with_capacity(total);

    for (index, repo) in manifest.repositories.iter().enumerate() {
        info!("provisioning repository {}/{}: {}/{}", index + 1, total, manifest.organization, repo);

        let status =
            match provisioner.provision(&manifest.organization, repo, &manifest.location) {
                Ok(identity) => {
                    info!(
                        "{}: AZURE_CLIENT_ID={} AZURE_TENANT_ID={} AZURE_SUBSCRIPTION_ID={}",
                        repo, identity.client_id, identity.tenant_id, identity.subscription_id
                    );
                    RepoStatus::Succeeded(identity)
                }
                Err(e) => {
                    error!("repository {} failed: {:#}", repo, e);
                    RepoStatus::Failed(format!("{:#}", e))
                }
            };

        reports.push(RepoReport {
            repository: repo.clone(),
            status,
        });
    }

    let summary = BatchSummary { reports };
    summary.log();
    summary
}
