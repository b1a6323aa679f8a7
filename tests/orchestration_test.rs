mod helpers;

use std::sync::Arc;

use azfederate::executor::{CommandExecutor, RealCommandExecutor};
use azfederate::{cli, run_provision, run_validate};
use uuid::Uuid;

use helpers::FakeAzure;

fn provision_args(file: camino::Utf8PathBuf, dry_run: bool) -> cli::ProvisionArgs {
    cli::ProvisionArgs {
        common: cli::CommonArgs {
            file,
            log_level: cli::LogLevel::Error,
        },
        dry_run,
    }
}

#[test]
fn run_provision_against_fake_control_plane() {
    let (_dir, path) = helpers::write_manifest(
        r#"---
organization: Acme
location: westeurope
repositories:
  - svc-a
  - svc-b
replication_wait_secs: 0
"#,
    );
    let fake = Arc::new(FakeAzure::new());
    let executor: Arc<dyn CommandExecutor> = fake.clone();

    let summary = run_provision(&provision_args(path, false), executor).unwrap();
    assert_eq!(summary.succeeded(), 2);
    assert_eq!(summary.failed(), 0);

    let state = fake.state.lock().unwrap();
    assert_eq!(state.groups.len(), 2);
    assert_eq!(state.federated.values().map(Vec::len).sum::<usize>(), 4);
}

#[test]
fn run_provision_dry_run_needs_no_az() {
    let (_dir, path) = helpers::write_manifest(
        r#"---
organization: Acme
location: westeurope
repositories: [svc-a]
"#,
    );
    let executor: Arc<dyn CommandExecutor> = Arc::new(RealCommandExecutor { dry_run: true });

    let summary = run_provision(&provision_args(path, true), executor).unwrap();
    assert_eq!(summary.succeeded(), 1);

    // Dry run synthesizes placeholder identities.
    match &summary.reports[0].status {
        azfederate::batch::RepoStatus::Succeeded(identity) => {
            assert_eq!(identity.client_id, Uuid::nil());
            assert_eq!(identity.subscription_id, Uuid::nil());
        }
        other => panic!("expected success, got: {:?}", other),
    }
}

#[test]
fn run_provision_rejects_invalid_manifest() {
    let (_dir, path) = helpers::write_manifest(
        r#"---
organization: Acme
location: westeurope
repositories: []
"#,
    );
    let executor: Arc<dyn CommandExecutor> = Arc::new(FakeAzure::new());

    let err = run_provision(&provision_args(path, false), executor).unwrap_err();
    assert!(format!("{:#}", err).contains("manifest validation failed"));
}

#[test]
fn run_validate_succeeds_on_valid_manifest() {
    let (_dir, path) = helpers::write_manifest(
        r#"---
organization: Acme
location: westeurope
repositories: [svc-a]
"#,
    );
    let opts = cli::ValidateArgs {
        common: cli::CommonArgs {
            file: path,
            log_level: cli::LogLevel::Error,
        },
    };
    run_validate(&opts).expect("run_validate should succeed for a valid manifest");
}

#[test]
fn run_validate_fails_on_malformed_yaml() {
    let (_dir, path) = helpers::write_manifest("organization: [unclosed\n");
    let opts = cli::ValidateArgs {
        common: cli::CommonArgs {
            file: path,
            log_level: cli::LogLevel::Error,
        },
    };
    assert!(run_validate(&opts).is_err());
}
