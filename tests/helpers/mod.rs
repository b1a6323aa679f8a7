//! Shared test helpers: an in-memory fake of the az control plane and
//! manifest fixtures.
//!
//! Not every test binary uses every helper.
#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::os::unix::process::ExitStatusExt;
use std::process::ExitStatus;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use camino::Utf8PathBuf;
use serde_json::json;
use uuid::Uuid;

use azfederate::config::{Manifest, RetryConfig};
use azfederate::executor::{CommandExecutor, CommandSpec, ExecutionResult};
use azfederate::provision::retry::RetryPolicy;

/// In-memory directory/subscription state mutated by [`FakeAzure`].
#[derive(Debug, Default)]
pub struct AzState {
    /// resource group name -> location
    pub groups: BTreeMap<String, String>,
    /// display name -> (object id, app id)
    pub apps: BTreeMap<String, (Uuid, Uuid)>,
    /// app ids that have a service principal
    pub service_principals: BTreeSet<Uuid>,
    /// (assignee app id, role, scope)
    pub role_assignments: Vec<(Uuid, String, String)>,
    /// object id -> federated credential payloads
    pub federated: BTreeMap<Uuid, Vec<serde_json::Value>>,
    /// object id -> granted Graph scope ids
    pub permissions: BTreeMap<Uuid, Vec<String>>,
    /// app ids that received admin consent
    pub consented: BTreeSet<Uuid>,
    /// display names whose service principal creation always fails
    pub sp_create_fail_for: BTreeSet<String>,
    /// number of upcoming sp create calls that fail (simulates replication lag)
    pub sp_create_failures: u32,
    /// admin-consent calls fail when set
    pub consent_fails: bool,
    /// every az invocation's argument vector, in order
    pub calls: Vec<Vec<String>>,
}

/// Fake `az` implementing [`CommandExecutor`] against [`AzState`].
///
/// Responds to exactly the invocations the crate issues; anything else
/// panics so new az calls must be modeled explicitly.
pub struct FakeAzure {
    pub state: Arc<Mutex<AzState>>,
    pub subscription_id: Uuid,
    pub tenant_id: Uuid,
}

impl FakeAzure {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(AzState::default())),
            subscription_id: Uuid::from_u128(0x1111_1111_1111_1111_1111_1111_1111_1111),
            tenant_id: Uuid::from_u128(0x2222_2222_2222_2222_2222_2222_2222_2222),
        }
    }

    /// Number of recorded invocations containing a `create` verb.
    pub fn create_calls(&self) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|args| args.iter().any(|a| a == "create"))
            .count()
    }

    /// Clears the recorded call log, keeping the provisioned state.
    pub fn reset_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    fn app_json(display_name: &str, object_id: &Uuid, app_id: &Uuid) -> serde_json::Value {
        json!({
            "id": object_id,
            "appId": app_id,
            "displayName": display_name,
        })
    }
}

fn ok(stdout: String) -> Result<ExecutionResult> {
    Ok(ExecutionResult {
        status: Some(ExitStatus::from_raw(0)),
        stdout,
        stderr: String::new(),
    })
}

fn fail(stderr: &str) -> Result<ExecutionResult> {
    Ok(ExecutionResult {
        status: Some(ExitStatus::from_raw(1 << 8)),
        stdout: String::new(),
        stderr: stderr.to_string(),
    })
}

/// Returns the value following `flag` in `args`.
fn arg<'a>(args: &'a [String], flag: &str) -> &'a str {
    let pos = args
        .iter()
        .position(|a| a == flag)
        .unwrap_or_else(|| panic!("missing {} in {:?}", flag, args));
    args.get(pos + 1)
        .unwrap_or_else(|| panic!("missing value for {} in {:?}", flag, args))
}

impl CommandExecutor for FakeAzure {
    fn execute(&self, spec: &CommandSpec) -> Result<ExecutionResult> {
        assert_eq!(spec.command, "az", "fake executor only models az");
        let mut state = self.state.lock().unwrap();
        state.calls.push(spec.args.clone());
        let args = spec.args.clone();
        let verbs: Vec<&str> = args.iter().map(String::as_str).take(4).collect();

        match verbs.as_slice() {
            ["account", "show", ..] => ok(json!({
                "id": self.subscription_id,
                "tenantId": self.tenant_id,
                "name": "test-subscription",
            })
            .to_string()),
            ["group", "exists", ..] => {
                let name = arg(&args, "--name");
                ok(state.groups.contains_key(name).to_string())
            }
            ["group", "create", ..] => {
                let name = arg(&args, "--name").to_string();
                let location = arg(&args, "--location").to_string();
                state.groups.insert(name, location);
                ok(String::new())
            }
            ["ad", "app", "list", ..] => {
                let display_name = arg(&args, "--display-name");
                let apps: Vec<_> = state
                    .apps
                    .get(display_name)
                    .map(|(oid, aid)| vec![FakeAzure::app_json(display_name, oid, aid)])
                    .unwrap_or_default();
                ok(serde_json::Value::Array(apps).to_string())
            }
            ["ad", "app", "create", ..] => {
                let display_name = arg(&args, "--display-name").to_string();
                let (oid, aid) = (Uuid::new_v4(), Uuid::new_v4());
                state.apps.insert(display_name.clone(), (oid, aid));
                ok(FakeAzure::app_json(&display_name, &oid, &aid).to_string())
            }
            ["ad", "sp", "list", ..] => {
                let filter = arg(&args, "--filter");
                let app_id: Uuid = filter
                    .strip_prefix("appId eq '")
                    .and_then(|s| s.strip_suffix('\''))
                    .expect("sp list filter shape")
                    .parse()
                    .expect("sp list filter app id");
                let sps: Vec<_> = if state.service_principals.contains(&app_id) {
                    vec![json!({"id": Uuid::new_v4(), "appId": app_id})]
                } else {
                    Vec::new()
                };
                ok(serde_json::Value::Array(sps).to_string())
            }
            ["ad", "sp", "create", ..] => {
                let app_id: Uuid = arg(&args, "--id").parse().expect("sp create app id");
                let display_name = state
                    .apps
                    .iter()
                    .find(|(_, (_, aid))| *aid == app_id)
                    .map(|(name, _)| name.clone());
                if let Some(name) = &display_name {
                    if state.sp_create_fail_for.contains(name) {
                        return fail("ERROR: directory object not found");
                    }
                }
                if state.sp_create_failures > 0 {
                    state.sp_create_failures -= 1;
                    return fail("ERROR: directory object not found");
                }
                state.service_principals.insert(app_id);
                ok(json!({"id": Uuid::new_v4(), "appId": app_id}).to_string())
            }
            ["role", "assignment", "list", ..] => {
                let assignee: Uuid = arg(&args, "--assignee").parse().expect("assignee id");
                let role = arg(&args, "--role");
                let scope = arg(&args, "--scope");
                let matches: Vec<_> = state
                    .role_assignments
                    .iter()
                    .filter(|(a, r, s)| *a == assignee && r == role && s == scope)
                    .map(|(_, r, s)| json!({"scope": s, "roleDefinitionName": r}))
                    .collect();
                ok(serde_json::Value::Array(matches).to_string())
            }
            ["role", "assignment", "create", ..] => {
                let assignee: Uuid = arg(&args, "--assignee").parse().expect("assignee id");
                let role = arg(&args, "--role").to_string();
                let scope = arg(&args, "--scope").to_string();
                state.role_assignments.push((assignee, role, scope));
                ok(String::new())
            }
            ["ad", "app", "federated-credential", "list"] => {
                let object_id: Uuid = arg(&args, "--id").parse().expect("object id");
                let creds = state.federated.get(&object_id).cloned().unwrap_or_default();
                ok(serde_json::Value::Array(creds).to_string())
            }
            ["ad", "app", "federated-credential", "create"] => {
                let object_id: Uuid = arg(&args, "--id").parse().expect("object id");
                let payload: serde_json::Value =
                    serde_json::from_str(arg(&args, "--parameters")).expect("parameters json");
                state.federated.entry(object_id).or_default().push(payload);
                ok(String::new())
            }
            ["ad", "app", "permission", "list"] => {
                let object_id: Uuid = arg(&args, "--id").parse().expect("object id");
                let grants: Vec<_> = state
                    .permissions
                    .get(&object_id)
                    .map(|scopes| {
                        vec![json!({
                            "resourceAppId": "00000003-0000-0000-c000-000000000000",
                            "resourceAccess": scopes
                                .iter()
                                .map(|id| json!({"id": id, "type": "Scope"}))
                                .collect::<Vec<_>>(),
                        })]
                    })
                    .unwrap_or_default();
                ok(serde_json::Value::Array(grants).to_string())
            }
            ["ad", "app", "permission", "add"] => {
                let object_id: Uuid = arg(&args, "--id").parse().expect("object id");
                let permission = arg(&args, "--api-permissions");
                let scope_id = permission.strip_suffix("=Scope").expect("scope permission");
                state
                    .permissions
                    .entry(object_id)
                    .or_default()
                    .push(scope_id.to_string());
                ok(String::new())
            }
            ["ad", "app", "permission", "admin-consent"] => {
                if state.consent_fails {
                    return fail("ERROR: insufficient privileges to grant admin consent");
                }
                let app_id: Uuid = arg(&args, "--id").parse().expect("app id");
                state.consented.insert(app_id);
                ok(String::new())
            }
            other => panic!("unexpected az invocation: {:?} (full args: {:?})", other, args),
        }
    }
}

/// A retry policy that never sleeps, for tests that exercise failures.
pub fn fast_retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        initial_delay: std::time::Duration::ZERO,
        multiplier: 1.0,
        max_delay: std::time::Duration::ZERO,
        deadline: std::time::Duration::from_secs(60),
        jitter: false,
    }
}

/// Builds an in-memory manifest without touching the filesystem.
pub fn manifest(org: &str, location: &str, repos: &[&str]) -> Manifest {
    Manifest {
        organization: org.to_string(),
        location: location.to_string(),
        repositories: repos.iter().map(|r| r.to_string()).collect(),
        retry: RetryConfig::default(),
        replication_wait_secs: 0,
        bootstrap: None,
    }
}

/// Writes a manifest YAML to a temp directory, returning the guard and path.
pub fn write_manifest(yaml: &str) -> (tempfile::TempDir, Utf8PathBuf) {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let path = dir.path().join("azfederate.yml");
    std::fs::write(&path, yaml).expect("failed to write manifest");
    let path = Utf8PathBuf::from_path_buf(path).expect("temp path should be UTF-8");
    (dir, path)
}
