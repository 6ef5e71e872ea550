//! GitHub REST client (target platform).

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::client::{check_status, TargetPlatform};
use crate::error::{MigrationError, Result};
use crate::ratelimit::RateLimiter;
use crate::types::{IssuePayload, IssueRef, RepoRef};

/// Client for the GitHub REST API.
pub struct GitHubClient {
    client: Client,
    base_url: String,
    token: String,
    organization: Option<String>,
    limiter: RateLimiter,
    user_login: tokio::sync::OnceCell<String>,
}

#[derive(Debug, Deserialize)]
struct GitHubRepo {
    name: String,
    #[serde(default)]
    node_id: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    clone_url: Option<String>,
    #[serde(default)]
    default_branch: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GitHubUser {
    login: String,
}

#[derive(Debug, Deserialize)]
struct GitHubIssue {
    number: u64,
    #[serde(default)]
    html_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GitHubContent {
    sha: String,
}

impl From<GitHubRepo> for RepoRef {
    fn from(repo: GitHubRepo) -> Self {
        RepoRef {
            id: repo.node_id.unwrap_or_default(),
            name: repo.name,
            clone_url: repo.clone_url,
            default_branch: repo.default_branch,
            description: repo.description,
            size: None,
        }
    }
}

impl GitHubClient {
    /// Create a client against api.github.com.
    pub fn new(
        token: &str,
        organization: Option<String>,
        limiter: RateLimiter,
        timeout: Duration,
    ) -> Result<Self> {
        Self::with_base_url("https://api.github.com", token, organization, limiter, timeout)
    }

    /// Create a client against an explicit base URL (used by tests).
    pub fn with_base_url(
        base_url: &str,
        token: &str,
        organization: Option<String>,
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
            token: token.to_string(),
            organization,
            limiter,
            user_login: tokio::sync::OnceCell::new(),
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, format!("{}{path}", self.base_url))
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", "application/vnd.github.v3+json")
    }

    /// Owner under which repositories are created: the configured
    /// organization, or the authenticated user.
    async fn owner(&self) -> Result<String> {
        if let Some(org) = &self.organization {
            return Ok(org.clone());
        }
        self.user_login
            .get_or_try_init(|| async {
                self.limiter.acquire().await;
                let response = self
                    .request(reqwest::Method::GET, "/user")
                    .send()
                    .await
                    .map_err(map_transport)?;
                let response = check_status(response, "fetching authenticated user").await?;
                let user: GitHubUser = response
                    .json()
                    .await
                    .map_err(|e| MigrationError::ApiError(e.to_string()))?;
                Ok(user.login)
            })
            .await
            .cloned()
    }

    async fn file_sha(&self, owner: &str, repo: &str, path: &str) -> Result<Option<String>> {
        self.limiter.acquire().await;
        let response = self
            .request(
                reqwest::Method::GET,
                &format!("/repos/{owner}/{repo}/contents/{path}"),
            )
            .send()
            .await
            .map_err(map_transport)?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = check_status(response, "checking existing file").await?;
        let content: GitHubContent = response
            .json()
            .await
            .map_err(|e| MigrationError::ApiError(e.to_string()))?;
        Ok(Some(content.sha))
    }
}

fn map_transport(err: reqwest::Error) -> MigrationError {
    if err.is_timeout() {
        MigrationError::Timeout(err.to_string())
    } else {
        MigrationError::NetworkError(err.to_string())
    }
}

#[async_trait]
impl TargetPlatform for GitHubClient {
    async fn validate_credentials(&self) -> Result<()> {
        debug!("validating GitHub credentials");
        self.limiter.acquire().await;
        let response = self
            .request(reqwest::Method::GET, "/user")
            .send()
            .await
            .map_err(map_transport)?;
        check_status(response, "validating GitHub credentials").await?;

        if let Some(org) = &self.organization {
            self.limiter.acquire().await;
            let response = self
                .request(reqwest::Method::GET, &format!("/orgs/{org}"))
                .send()
                .await
                .map_err(map_transport)?;
            check_status(response, "checking organization access").await?;
        }
        Ok(())
    }

    async fn repository_exists(&self, name: &str) -> Result<bool> {
        Ok(self.get_repository(name).await?.is_some())
    }

    async fn get_repository(&self, name: &str) -> Result<Option<RepoRef>> {
        let owner = self.owner().await?;
        self.limiter.acquire().await;
        let response = self
            .request(reqwest::Method::GET, &format!("/repos/{owner}/{name}"))
            .send()
            .await
            .map_err(map_transport)?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = check_status(response, "fetching repository").await?;
        let repo: GitHubRepo = response
            .json()
            .await
            .map_err(|e| MigrationError::ApiError(e.to_string()))?;
        Ok(Some(repo.into()))
    }

    async fn create_repository(
        &self,
        name: &str,
        description: Option<&str>,
        private: bool,
    ) -> Result<RepoRef> {
        let path = match &self.organization {
            Some(org) => format!("/orgs/{org}/repos"),
            None => "/user/repos".to_string(),
        };

        self.limiter.acquire().await;
        let response = self
            .request(reqwest::Method::POST, &path)
            .json(&serde_json::json!({
                "name": name,
                "description": description.unwrap_or(""),
                "private": private,
                "has_issues": true,
                "auto_init": false,
            }))
            .send()
            .await
            .map_err(map_transport)?;

        let status = response.status();
        if status == reqwest::StatusCode::UNPROCESSABLE_ENTITY {
            // "name already exists" — re-runs reuse the existing repository.
            let body = response.text().await.unwrap_or_default();
            if body.to_lowercase().contains("already exists") {
                warn!(repo = name, "repository already exists, reusing");
                if let Some(existing) = self.get_repository(name).await? {
                    return Ok(existing);
                }
            }
            return Err(MigrationError::ValidationError(format!(
                "creating repository '{name}': {body}"
            )));
        }

        let response = check_status(response, "creating repository").await?;
        let repo: GitHubRepo = response
            .json()
            .await
            .map_err(|e| MigrationError::ApiError(e.to_string()))?;
        debug!(repo = name, "created repository");
        Ok(repo.into())
    }

    async fn create_issue(&self, repo: &str, payload: &IssuePayload) -> Result<IssueRef> {
        let owner = self.owner().await?;
        self.limiter.acquire().await;
        let response = self
            .request(
                reqwest::Method::POST,
                &format!("/repos/{owner}/{repo}/issues"),
            )
            .json(&serde_json::json!({
                "title": payload.title,
                "body": payload.body,
                "labels": payload.labels,
            }))
            .send()
            .await
            .map_err(map_transport)?;

        let response = check_status(response, "creating issue").await?;
        let issue: GitHubIssue = response
            .json()
            .await
            .map_err(|e| MigrationError::ApiError(e.to_string()))?;
        Ok(IssueRef {
            number: issue.number,
            url: issue.html_url,
        })
    }

    async fn write_file(&self, repo: &str, path: &str, content: &str, message: &str) -> Result<()> {
        let owner = self.owner().await?;
        let sha = self.file_sha(&owner, repo, path).await?;

        let mut body = serde_json::json!({
            "message": message,
            "content": BASE64.encode(content),
        });
        if let Some(sha) = sha {
            body["sha"] = serde_json::Value::String(sha);
        }

        self.limiter.acquire().await;
        let response = self
            .request(
                reqwest::Method::PUT,
                &format!("/repos/{owner}/{repo}/contents/{path}"),
            )
            .json(&body)
            .send()
            .await
            .map_err(map_transport)?;

        check_status(response, "writing repository file").await?;
        Ok(())
    }

    async fn authenticated_clone_url(&self, name: &str) -> Result<String> {
        let owner = self.owner().await?;
        Ok(format!(
            "https://x-access-token:{}@github.com/{owner}/{name}.git",
            self.token
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer, organization: Option<&str>) -> GitHubClient {
        GitHubClient::with_base_url(
            &server.uri(),
            "gh-token",
            organization.map(str::to_string),
            RateLimiter::new(1000.0),
            Duration::from_secs(5),
        )
        .expect("client builds")
    }

    #[tokio::test]
    async fn test_create_repository_under_org() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/orgs/acme/repos"))
            .and(body_partial_json(serde_json::json!({"name": "shop"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "name": "shop",
                "node_id": "R_1",
                "clone_url": "https://github.com/acme/shop.git",
                "default_branch": "main"
            })))
            .mount(&server)
            .await;

        let repo = client(&server, Some("acme"))
            .create_repository("shop", Some("migrated"), true)
            .await
            .unwrap();
        assert_eq!(repo.name, "shop");
        assert_eq!(repo.clone_url.as_deref(), Some("https://github.com/acme/shop.git"));
    }

    #[tokio::test]
    async fn test_create_repository_reuses_existing_on_422() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/orgs/acme/repos"))
            .respond_with(ResponseTemplate::new(422).set_body_json(serde_json::json!({
                "message": "Repository creation failed.",
                "errors": [{"message": "name already exists on this account"}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/shop"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": "shop",
                "node_id": "R_1",
                "clone_url": "https://github.com/acme/shop.git"
            })))
            .mount(&server)
            .await;

        let repo = client(&server, Some("acme"))
            .create_repository("shop", None, true)
            .await
            .unwrap();
        assert_eq!(repo.name, "shop");
    }

    #[tokio::test]
    async fn test_repository_exists_false_on_404() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/ghost"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let exists = client(&server, Some("acme"))
            .repository_exists("ghost")
            .await
            .unwrap();
        assert!(!exists);
    }

    #[tokio::test]
    async fn test_create_issue_resolves_user_owner() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"login": "octo"})),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/repos/octo/shop/issues"))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "number": 12,
                "html_url": "https://github.com/octo/shop/issues/12"
            })))
            .mount(&server)
            .await;

        let issue = client(&server, None)
            .create_issue(
                "shop",
                &IssuePayload {
                    title: "Fix login".into(),
                    body: "body".into(),
                    labels: vec!["migrated".into()],
                },
            )
            .await
            .unwrap();
        assert_eq!(issue.number, 12);
    }

    #[tokio::test]
    async fn test_rate_limited_response_maps_to_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/shop"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "7"))
            .mount(&server)
            .await;

        let err = client(&server, Some("acme"))
            .get_repository("shop")
            .await
            .unwrap_err();
        assert!(matches!(err, MigrationError::RateLimited(Some(7))));
    }

    #[tokio::test]
    async fn test_write_file_includes_sha_when_file_exists() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/shop/contents/.github/workflows/ci.yml"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"sha": "abc123"})),
            )
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/repos/acme/shop/contents/.github/workflows/ci.yml"))
            .and(body_partial_json(serde_json::json!({"sha": "abc123"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        client(&server, Some("acme"))
            .write_file("shop", ".github/workflows/ci.yml", "name: ci\n", "Add workflow")
            .await
            .unwrap();
    }
}
