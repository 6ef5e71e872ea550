//! Platform capability interfaces.
//!
//! The orchestrator only ever talks to these traits; the concrete REST
//! clients ([`crate::ado::AdoClient`], [`crate::github::GitHubClient`]) are
//! thin adapters constructed once and injected. Responses are parsed into
//! typed records at this boundary instead of threading loose JSON maps
//! through the engine.

use async_trait::async_trait;

use crate::error::{MigrationError, Result};
use crate::types::{IssuePayload, IssueRef, PipelineDef, PipelineScope, ProjectRef, RepoRef, WorkItem};

/// Read-only capability over the source platform.
#[async_trait]
pub trait SourcePlatform: Send + Sync {
    /// Verify the configured credentials can reach the platform.
    async fn validate_credentials(&self) -> Result<()>;

    /// Enumerate projects visible to the credential.
    async fn list_projects(&self) -> Result<Vec<ProjectRef>>;

    /// Enumerate repositories in a project.
    async fn list_repositories(&self, project: &str) -> Result<Vec<RepoRef>>;

    /// Enumerate work items in a project.
    async fn list_work_items(&self, project: &str) -> Result<Vec<WorkItem>>;

    /// Enumerate pipeline definitions, project-wide or bound to one repository.
    async fn list_pipelines(
        &self,
        project: &str,
        scope: PipelineScope,
        repository_id: &str,
    ) -> Result<Vec<PipelineDef>>;

    /// Clone URL for a repository with the platform credential embedded.
    ///
    /// Callers must never log or persist the returned value un-redacted.
    fn authenticated_clone_url(&self, repo: &RepoRef) -> Result<String>;
}

/// Write capability over the target platform.
#[async_trait]
pub trait TargetPlatform: Send + Sync {
    /// Verify the configured credentials can reach the platform.
    async fn validate_credentials(&self) -> Result<()>;

    /// Whether a repository with this name already exists.
    async fn repository_exists(&self, name: &str) -> Result<bool>;

    /// Fetch a repository, if it exists.
    async fn get_repository(&self, name: &str) -> Result<Option<RepoRef>>;

    /// Create a repository.
    async fn create_repository(
        &self,
        name: &str,
        description: Option<&str>,
        private: bool,
    ) -> Result<RepoRef>;

    /// Create an issue in a repository.
    async fn create_issue(&self, repo: &str, payload: &IssuePayload) -> Result<IssueRef>;

    /// Create or update a file in a repository.
    async fn write_file(&self, repo: &str, path: &str, content: &str, message: &str) -> Result<()>;

    /// Clone URL for a repository with the platform credential embedded.
    ///
    /// Callers must never log or persist the returned value un-redacted.
    async fn authenticated_clone_url(&self, name: &str) -> Result<String>;
}

/// Map an HTTP response onto the migration error taxonomy.
///
/// Shared by both clients so every REST call classifies failures the same
/// way for the retry policy.
pub(crate) async fn check_status(
    response: reqwest::Response,
    context: &str,
) -> Result<reqwest::Response> {
    let status = response.status();

    if status.is_success() {
        return Ok(response);
    }

    if status == reqwest::StatusCode::FORBIDDEN {
        // GitHub reports primary rate limit exhaustion as 403.
        let exhausted = response
            .headers()
            .get("x-ratelimit-remaining")
            .and_then(|v| v.to_str().ok())
            .map(|v| v == "0")
            .unwrap_or(false);
        if exhausted {
            let reset = response
                .headers()
                .get("x-ratelimit-reset")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(|reset| {
                    let now = chrono::Utc::now().timestamp().max(0) as u64;
                    reset.saturating_sub(now)
                });
            return Err(MigrationError::RateLimited(reset));
        }
        return Err(MigrationError::AuthenticationFailed(format!(
            "{context}: {status}"
        )));
    }

    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(MigrationError::AuthenticationFailed(format!(
            "{context}: {status}"
        )));
    }

    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(MigrationError::NotFound(context.to_string()));
    }

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());
        return Err(MigrationError::RateLimited(retry_after));
    }

    if status == reqwest::StatusCode::UNPROCESSABLE_ENTITY
        || status == reqwest::StatusCode::BAD_REQUEST
    {
        let body = response.text().await.unwrap_or_default();
        return Err(MigrationError::ValidationError(format!(
            "{context}: {body}"
        )));
    }

    let body = response.text().await.unwrap_or_default();
    Err(MigrationError::ApiError(format!(
        "{context}: {status}: {body}"
    )))
}
