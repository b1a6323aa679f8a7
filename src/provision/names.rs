//! Deterministic naming for every provisioned entity.
//!
//! Each remote object is addressable by a name derived from the repository
//! name alone, which is what makes lookup-before-create idempotence work:
//! a re-run computes the same names and finds the objects it created before.

/// Fixed OIDC issuer for GitHub Actions workload tokens.
pub const GITHUB_OIDC_ISSUER: &str = "https://token.actions.githubusercontent.com";

/// Fixed audience accepted by the Azure token exchange endpoint.
pub const TOKEN_EXCHANGE_AUDIENCE: &str = "api://AzureADTokenExchange";

/// Federated credential name for the main-branch trust binding.
pub const MAIN_BRANCH_CREDENTIAL: &str = "github-main";

/// Federated credential name for the pull-request trust binding.
pub const PULL_REQUEST_CREDENTIAL: &str = "github-pull-request";

/// Role granted to every provisioned identity.
pub const PROVISIONED_ROLE: &str = "Owner";

/// Resource group name for a repository.
pub fn resource_group(repo: &str) -> String {
    format!("rg-{}", repo)
}

/// Display name shared by the app registration and its service principal.
pub fn app_display_name(repo: &str) -> String {
    format!("sp-{}-github", repo)
}

/// OIDC subject trusted for pushes to the repository's main branch.
pub fn main_branch_subject(org: &str, repo: &str) -> String {
    format!("repo:{}/{}:ref:refs/heads/main", org, repo)
}

/// OIDC subject trusted for the repository's pull-request events.
pub fn pull_request_subject(org: &str, repo: &str) -> String {
    format!("repo:{}/{}:pull_request", org, repo)
}

/// Full ARM scope of a resource group within a subscription.
pub fn resource_group_scope(subscription_id: &uuid::Uuid, group: &str) -> String {
    format!("/subscriptions/{}/resourceGroups/{}", subscription_id, group)
}

/// Full ARM scope of the subscription itself (bootstrap only).
pub fn subscription_scope(subscription_id: &uuid::Uuid) -> String {
    format!("/subscriptions/{}", subscription_id)
}
