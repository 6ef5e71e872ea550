//! Azure DevOps REST client (source platform).

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use crate::client::{check_status, SourcePlatform};
use crate::error::{MigrationError, Result};
use crate::ratelimit::RateLimiter;
use crate::types::{PipelineDef, PipelineScope, ProjectRef, RepoRef, WorkItem};

const API_VERSION: &str = "7.0";

/// Client for the Azure DevOps REST API.
pub struct AdoClient {
    client: Client,
    base_url: String,
    pat: String,
    limiter: RateLimiter,
}

/// Azure DevOps list envelope.
#[derive(Debug, Deserialize)]
struct ValueList<T> {
    value: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct AdoProject {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AdoRepo {
    id: String,
    name: String,
    remote_url: Option<String>,
    default_branch: Option<String>,
    #[serde(default)]
    size: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AdoPipeline {
    id: u64,
    name: String,
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    queue_status: Option<String>,
    #[serde(default)]
    repository: Option<AdoPipelineRepo>,
    #[serde(default)]
    process: Option<AdoPipelineProcess>,
}

#[derive(Debug, Deserialize)]
struct AdoPipelineRepo {
    #[serde(default)]
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AdoPipelineProcess {
    #[serde(default)]
    phases: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct WiqlResult {
    #[serde(rename = "workItems", default)]
    work_items: Vec<WiqlRef>,
}

#[derive(Debug, Deserialize)]
struct WiqlRef {
    id: u64,
}

#[derive(Debug, Deserialize)]
struct AdoWorkItem {
    id: u64,
    #[serde(default)]
    fields: serde_json::Value,
}

impl AdoClient {
    /// Create a client for `https://dev.azure.com/{organization}`.
    pub fn new(
        organization: &str,
        personal_access_token: &str,
        limiter: RateLimiter,
        timeout: Duration,
    ) -> Result<Self> {
        Self::with_base_url(
            &format!("https://dev.azure.com/{organization}"),
            personal_access_token,
            limiter,
            timeout,
        )
    }

    /// Create a client against an explicit base URL (used by tests).
    pub fn with_base_url(
        base_url: &str,
        personal_access_token: &str,
        limiter: RateLimiter,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .user_agent("ado2gh-migrate")
            .timeout(timeout)
            .build()
            .map_err(|e| MigrationError::NetworkError(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            pat: personal_access_token.to_string(),
            limiter,
        })
    }

    fn auth_header(&self) -> String {
        format!("Basic {}", BASE64.encode(format!(":{}", self.pat)))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, context: &str) -> Result<T> {
        self.limiter.acquire().await;
        let url = format!("{}{path}", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("Authorization", self.auth_header())
            .send()
            .await
            .map_err(map_transport)?;

        let response = check_status(response, context).await?;
        response
            .json()
            .await
            .map_err(|e| MigrationError::ApiError(format!("{context}: {e}")))
    }

    async fn post<T: DeserializeOwned, B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
        context: &str,
    ) -> Result<T> {
        self.limiter.acquire().await;
        let url = format!("{}{path}", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("Authorization", self.auth_header())
            .json(body)
            .send()
            .await
            .map_err(map_transport)?;

        let response = check_status(response, context).await?;
        response
            .json()
            .await
            .map_err(|e| MigrationError::ApiError(format!("{context}: {e}")))
    }

    /// Fetch work item details for a batch of ids.
    async fn work_item_details(&self, ids: &[u64]) -> Result<Vec<WorkItem>> {
        let ids_str = ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let list: ValueList<AdoWorkItem> = self
            .get(
                &format!("/_apis/wit/workitems?ids={ids_str}&api-version={API_VERSION}&$expand=all"),
                "fetching work item details",
            )
            .await?;

        Ok(list.value.into_iter().map(parse_work_item).collect())
    }
}

/// WIQL query selecting every work item in a project. Single quotes in the
/// project name are doubled, per WIQL string-literal escaping.
fn wiql_query(project: &str) -> String {
    let escaped = project.replace('\'', "''");
    format!("SELECT [System.Id] FROM WorkItems WHERE [System.TeamProject] = '{escaped}'")
}

fn map_transport(err: reqwest::Error) -> MigrationError {
    if err.is_timeout() {
        MigrationError::Timeout(err.to_string())
    } else {
        MigrationError::NetworkError(err.to_string())
    }
}

/// Parse the loose field map of a work item into a typed record.
///
/// Missing fields degrade to defaults rather than erroring; the translator
/// handles absence gracefully further down.
fn parse_work_item(raw: AdoWorkItem) -> WorkItem {
    let fields = &raw.fields;
    let text = |key: &str| -> Option<String> {
        fields
            .get(key)
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .filter(|s| !s.trim().is_empty())
    };

    let assigned_to = fields.get("System.AssignedTo").and_then(|v| {
        v.as_str()
            .map(str::to_string)
            .or_else(|| v.get("displayName").and_then(|d| d.as_str()).map(str::to_string))
    });

    WorkItem {
        id: raw.id,
        title: text("System.Title").unwrap_or_else(|| format!("Migrated work item #{}", raw.id)),
        item_type: text("System.WorkItemType").unwrap_or_else(|| "Task".to_string()),
        state: text("System.State").unwrap_or_else(|| "New".to_string()),
        description: text("System.Description"),
        acceptance_criteria: text("Microsoft.VSTS.Common.AcceptanceCriteria"),
        repro_steps: text("Microsoft.VSTS.TCM.ReproSteps"),
        priority: fields
            .get("Microsoft.VSTS.Common.Priority")
            .and_then(|v| v.as_i64()),
        assigned_to,
    }
}

#[async_trait]
impl SourcePlatform for AdoClient {
    async fn validate_credentials(&self) -> Result<()> {
        debug!("validating Azure DevOps credentials");
        let _: ValueList<AdoProject> = self
            .get(
                &format!("/_apis/projects?api-version={API_VERSION}"),
                "validating Azure DevOps credentials",
            )
            .await?;
        Ok(())
    }

    async fn list_projects(&self) -> Result<Vec<ProjectRef>> {
        let list: ValueList<AdoProject> = self
            .get(
                &format!("/_apis/projects?api-version={API_VERSION}"),
                "listing projects",
            )
            .await?;
        Ok(list
            .value
            .into_iter()
            .map(|p| ProjectRef { id: p.id, name: p.name })
            .collect())
    }

    async fn list_repositories(&self, project: &str) -> Result<Vec<RepoRef>> {
        let list: ValueList<AdoRepo> = self
            .get(
                &format!("/{project}/_apis/git/repositories?api-version={API_VERSION}"),
                "listing repositories",
            )
            .await?;
        Ok(list
            .value
            .into_iter()
            .map(|r| RepoRef {
                id: r.id,
                name: r.name,
                clone_url: r.remote_url,
                default_branch: r.default_branch,
                description: None,
                size: r.size,
            })
            .collect())
    }

    async fn list_work_items(&self, project: &str) -> Result<Vec<WorkItem>> {
        let query = wiql_query(project);
        let wiql: WiqlResult = self
            .post(
                &format!("/{project}/_apis/wit/wiql?api-version={API_VERSION}"),
                &serde_json::json!({ "query": query }),
                "querying work items",
            )
            .await?;

        let ids: Vec<u64> = wiql.work_items.iter().map(|w| w.id).collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        // The detail endpoint caps batch size at 200 ids.
        let mut items = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(200) {
            items.extend(self.work_item_details(chunk).await?);
        }
        debug!(count = items.len(), "fetched work items");
        Ok(items)
    }

    async fn list_pipelines(
        &self,
        project: &str,
        scope: PipelineScope,
        repository_id: &str,
    ) -> Result<Vec<PipelineDef>> {
        let list: ValueList<AdoPipeline> = self
            .get(
                &format!("/{project}/_apis/build/definitions?api-version={API_VERSION}"),
                "listing pipeline definitions",
            )
            .await?;

        let mut defs: Vec<PipelineDef> = list
            .value
            .into_iter()
            .map(|p| PipelineDef {
                id: p.id,
                name: p.name,
                folder: p.path,
                queue_status: p.queue_status,
                repository_id: p.repository.and_then(|r| r.id),
                phase_count: p.process.and_then(|pr| pr.phases).map(|ph| ph.len()),
            })
            .collect();

        if scope == PipelineScope::Repository {
            defs.retain(|d| d.repository_id.as_deref() == Some(repository_id));
        }
        Ok(defs)
    }

    fn authenticated_clone_url(&self, repo: &RepoRef) -> Result<String> {
        let raw = repo.clone_url.as_deref().ok_or_else(|| {
            MigrationError::ValidationError(format!("repository '{}' has no clone URL", repo.name))
        })?;

        // Strip any embedded userinfo first to avoid double credential
        // injection, then embed the PAT.
        let mut url = Url::parse(raw)
            .map_err(|e| MigrationError::ValidationError(format!("bad clone URL: {e}")))?;
        if url.set_username("").is_err() || url.set_password(Some(&self.pat)).is_err() {
            warn!("clone URL does not accept credentials");
            return Ok(raw.to_string());
        }
        Ok(url.to_string())
    }
}
