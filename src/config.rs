//! Manifest loading and validation.
//!
//! The manifest is a declarative YAML document naming the GitHub organization,
//! the Azure region, and the ordered list of repositories to provision. It is
//! the single source of truth for a run; nothing in it is mutated at run time.

use std::fs::File;
use std::io::BufReader;
use std::sync::LazyLock;
use std::time::Duration;

use anyhow::{Context, Result};
use camino::Utf8Path;
use regex::Regex;
use serde::Deserialize;

use crate::error::AzFederateError;
use crate::provision::retry::RetryPolicy;

/// Repository names feed directly into resource group and display names,
/// so they are restricted to characters valid in both.
static REPO_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.-]+$").expect("repo name regex must compile"));

/// Top-level manifest document.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    /// GitHub organization owning the repositories
    pub organization: String,

    /// Azure region for every provisioned resource group
    pub location: String,

    /// Ordered list of repository names to provision
    pub repositories: Vec<String>,

    /// Backoff policy for eventual-consistency retries
    #[serde(default)]
    pub retry: RetryConfig,

    /// Pause after app-registration creation before dependent lookups
    #[serde(default = "default_replication_wait_secs")]
    pub replication_wait_secs: u64,

    /// Settings for the one-time bootstrap subcommand
    #[serde(default)]
    pub bootstrap: Option<BootstrapSettings>,
}

/// Retry/backoff configuration, in whole seconds.
///
/// Defaults preserve the historical behavior of five attempts starting at
/// ten seconds, now with exponential growth, jitter, and an overall deadline.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_initial_delay_secs")]
    pub initial_delay_secs: u64,

    #[serde(default = "default_multiplier")]
    pub multiplier: f64,

    #[serde(default = "default_max_delay_secs")]
    pub max_delay_secs: u64,

    #[serde(default = "default_deadline_secs")]
    pub deadline_secs: u64,

    #[serde(default = "default_jitter")]
    pub jitter: bool,
}

fn default_max_attempts() -> u32 {
    5
}

fn default_initial_delay_secs() -> u64 {
    10
}

fn default_multiplier() -> f64 {
    2.0
}

fn default_max_delay_secs() -> u64 {
    60
}

fn default_deadline_secs() -> u64 {
    300
}

fn default_jitter() -> bool {
    true
}

fn default_replication_wait_secs() -> u64 {
    10
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_secs: default_initial_delay_secs(),
            multiplier: default_multiplier(),
            max_delay_secs: default_max_delay_secs(),
            deadline_secs: default_deadline_secs(),
            jitter: default_jitter(),
        }
    }
}

impl RetryConfig {
    /// Converts the manifest representation into a runtime policy.
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            initial_delay: Duration::from_secs(self.initial_delay_secs),
            multiplier: self.multiplier,
            max_delay: Duration::from_secs(self.max_delay_secs),
            deadline: Duration::from_secs(self.deadline_secs),
            jitter: self.jitter,
        }
    }
}

/// Settings consumed only by the `bootstrap` subcommand.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct BootstrapSettings {
    /// Repository hosting the automation itself; its workflows receive
    /// the subscription-scoped identity.
    pub repository: String,

    /// Treat a failed admin-consent grant as fatal instead of a warning.
    #[serde(default)]
    pub require_admin_consent: bool,
}

impl Manifest {
    /// Validates the manifest against the constraints the provisioner
    /// relies on (non-empty fields, well-formed repository names, no
    /// duplicates, sane retry bounds).
    pub fn validate(&self) -> Result<(), AzFederateError> {
        if self.organization.trim().is_empty() {
            return Err(AzFederateError::Validation(
                "organization must not be empty".to_string(),
            ));
        }
        if self.location.trim().is_empty() {
            return Err(AzFederateError::Validation("location must not be empty".to_string()));
        }
        if self.repositories.is_empty() {
            return Err(AzFederateError::Validation(
                "repositories must contain at least one entry".to_string(),
            ));
        }

        let mut seen = std::collections::BTreeSet::new();
        for repo in &self.repositories {
            validate_repo_name(repo)?;
            if !seen.insert(repo.as_str()) {
                return Err(AzFederateError::Validation(format!(
                    "duplicate repository name: {}",
                    repo
                )));
            }
        }

        if self.retry.max_attempts == 0 {
            return Err(AzFederateError::Validation(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.retry.multiplier < 1.0 {
            return Err(AzFederateError::Validation(
                "retry.multiplier must be at least 1.0".to_string(),
            ));
        }

        if let Some(bootstrap) = &self.bootstrap {
            validate_repo_name(&bootstrap.repository)?;
        }

        Ok(())
    }

    /// Returns the bootstrap settings, failing if the manifest has none.
    ///
    /// The `bootstrap` subcommand cannot run without them; the `provision`
    /// subcommand never reads them.
    pub fn bootstrap_settings(&self) -> Result<&BootstrapSettings, AzFederateError> {
        self.bootstrap.as_ref().ok_or_else(|| {
            AzFederateError::Validation(
                "manifest has no 'bootstrap' section; it is required by the bootstrap subcommand"
                    .to_string(),
            )
        })
    }
}

fn validate_repo_name(name: &str) -> Result<(), AzFederateError> {
    if name.is_empty() {
        return Err(AzFederateError::Validation(
            "repository name must not be empty".to_string(),
        ));
    }
    if !REPO_NAME_RE.is_match(name) {
        return Err(AzFederateError::Validation(format!(
            "repository name contains invalid characters: {}",
            name
        )));
    }
    Ok(())
}

pub fn load_manifest(path: &Utf8Path) -> Result<Manifest> {
    let file = File::open(path).with_context(|| format!("failed to load file: {}", path))?;
    let reader = BufReader::new(file);
    let manifest: Manifest = serde_yaml::from_reader(reader)
        .with_context(|| format!("failed to parse yaml: {}", path))?;
    Ok(manifest)
}
