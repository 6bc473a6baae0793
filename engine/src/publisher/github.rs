use super::{PublishError, Publisher, Result};
use crate::config::GitHubConfig;
use crate::secrets::{self, GitHubCredentials};
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, StatusCode};
use sdk::FileSet;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

const USER_AGENT: &str = "pagesmith";
const ACCEPT: &str = "application/vnd.github+json";
const ERROR_EXCERPT_CHARS: usize = 200;

/// Waits and retry budgets used while publishing
#[derive(Debug, Clone)]
pub struct PublishTiming {
    pub init_settle: Duration,
    pub ref_retry_attempts: u32,
    pub ref_retry_delay: Duration,
    pub pages_poll_attempts: u32,
    pub pages_poll_interval: Duration,
    pub pages_probe_timeout: Duration,
    pub request_timeout: Duration,
}

impl From<&GitHubConfig> for PublishTiming {
    fn from(config: &GitHubConfig) -> Self {
        Self {
            init_settle: Duration::from_secs(config.init_settle_secs),
            ref_retry_attempts: config.ref_retry_attempts.max(1),
            ref_retry_delay: Duration::from_secs(config.ref_retry_delay_secs),
            pages_poll_attempts: config.pages_poll_attempts.max(1),
            pages_poll_interval: Duration::from_secs(config.pages_poll_interval_secs),
            pages_probe_timeout: Duration::from_secs(config.pages_probe_timeout_secs),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }
}

/// What a definite "branch does not exist" answer means to a lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MissingBranch {
    /// The repository is still initialising; keep asking
    Wait,
    /// The branch really is absent; create it with a parentless commit
    Init,
}

#[derive(Debug, Deserialize)]
struct RepoResponse {
    html_url: String,
}

#[derive(Debug, Deserialize)]
struct GitObject {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct RefResponse {
    object: GitObject,
}

#[derive(Debug, Deserialize)]
struct CommitResponse {
    tree: GitObject,
}

/// Publisher backed by the GitHub REST git-data and Pages APIs
pub struct GitHubPublisher {
    client: reqwest::Client,
    config: GitHubConfig,
    credentials: Option<GitHubCredentials>,
    timing: PublishTiming,
    pages_base_url: Option<String>,
}

impl GitHubPublisher {
    pub fn new(config: &GitHubConfig, credentials: Option<GitHubCredentials>) -> Self {
        Self {
            client: reqwest::Client::new(),
            timing: PublishTiming::from(config),
            config: config.clone(),
            credentials,
            pages_base_url: None,
        }
    }

    pub fn with_timing(mut self, timing: PublishTiming) -> Self {
        self.timing = timing;
        self
    }

    /// Serve Pages URLs from `{base}/{repo}/` instead of the owner subdomain
    pub fn with_pages_base_url(mut self, base: impl Into<String>) -> Self {
        self.pages_base_url = Some(base.into());
        self
    }

    fn credentials(&self) -> Result<&GitHubCredentials> {
        self.credentials
            .as_ref()
            .ok_or(PublishError::MissingCredentials)
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base_url.trim_end_matches('/'), path)
    }

    fn repo_path(&self, repo: &str, rest: &str) -> Result<String> {
        let owner = &self.credentials()?.username;
        Ok(format!("/repos/{}/{}{}", owner, repo, rest))
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let credentials = self.credentials()?;
        Ok(self
            .client
            .request(method, self.api_url(path))
            .header("Accept", ACCEPT)
            .header("User-Agent", USER_AGENT)
            .header("X-GitHub-Api-Version", "2022-11-28")
            .bearer_auth(credentials.token.unsecure())
            .timeout(self.timing.request_timeout))
    }

    async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response> {
        request
            .send()
            .await
            .map_err(|e| PublishError::Transport(secrets::scrub(&e.to_string())))
    }

    /// Send and decode a JSON body, mapping non-2xx to [`PublishError::Api`]
    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = self.send(request).await?;
        let response = ensure_success(response).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| PublishError::Decode(e.to_string()))
    }

    /// Current head of the branch, `None` when it does not exist yet
    async fn branch_head(&self, repo: &str) -> Result<Option<String>> {
        let path = self.repo_path(repo, &format!("/git/ref/heads/{}", self.config.branch))?;
        let response = self.send(self.request(Method::GET, &path)?).await?;

        // 409 is what GitHub answers for a repository with no commits at all
        if matches!(response.status(), StatusCode::NOT_FOUND | StatusCode::CONFLICT) {
            return Ok(None);
        }

        let response = ensure_success(response).await?;
        let reference: RefResponse = response
            .json()
            .await
            .map_err(|e| PublishError::Decode(e.to_string()))?;
        Ok(Some(reference.object.sha))
    }

    /// Resolve the branch head, retrying lookups that fail outright.
    ///
    /// A definite "no such branch" answer is retried under
    /// [`MissingBranch::Wait`] and ends the lookup with `None` under
    /// [`MissingBranch::Init`].
    async fn resolve_branch(&self, repo: &str, missing: MissingBranch) -> Result<Option<String>> {
        let attempts = self.timing.ref_retry_attempts;
        let mut last = String::new();

        for attempt in 1..=attempts {
            match self.branch_head(repo).await {
                Ok(Some(sha)) => return Ok(Some(sha)),
                Ok(None) if missing == MissingBranch::Init => return Ok(None),
                Ok(None) => last = format!("branch '{}' not found", self.config.branch),
                Err(PublishError::MissingCredentials) => {
                    return Err(PublishError::MissingCredentials)
                }
                Err(e) => last = e.to_string(),
            }

            if attempt < attempts {
                tracing::info!(repo, attempt, last = %last, "Branch lookup not settled, retrying");
                tokio::time::sleep(self.timing.ref_retry_delay).await;
            }
        }

        Err(PublishError::BranchNotReady { attempts, last })
    }

    /// Blobs, one tree, one commit, then move or create the branch ref
    async fn commit_files(&self, repo: &str, files: &FileSet, parent: Option<String>) -> Result<String> {
        let base_tree = match &parent {
            Some(sha) => {
                let path = self.repo_path(repo, &format!("/git/commits/{}", sha))?;
                let commit: CommitResponse = self.send_json(self.request(Method::GET, &path)?).await?;
                Some(commit.tree.sha)
            }
            None => None,
        };

        let blobs_path = self.repo_path(repo, "/git/blobs")?;
        let mut entries = Vec::with_capacity(files.len());
        for (path, content) in files.iter() {
            let blob: GitObject = self
                .send_json(
                    self.request(Method::POST, &blobs_path)?
                        .json(&json!({"content": content, "encoding": "utf-8"})),
                )
                .await?;
            tracing::debug!(repo, path, sha = %blob.sha, "Created blob");
            entries.push(json!({
                "path": path,
                "mode": "100644",
                "type": "blob",
                "sha": blob.sha,
            }));
        }

        let mut tree_body = json!({ "tree": entries });
        if let Some(base) = &base_tree {
            tree_body["base_tree"] = json!(base);
        }
        let tree: GitObject = self
            .send_json(
                self.request(Method::POST, &self.repo_path(repo, "/git/trees")?)?
                    .json(&tree_body),
            )
            .await?;

        let (message, parents) = match &parent {
            Some(sha) => ("Update application", vec![sha.clone()]),
            None => ("Initial commit", Vec::new()),
        };
        let commit: GitObject = self
            .send_json(
                self.request(Method::POST, &self.repo_path(repo, "/git/commits")?)?
                    .json(&json!({
                        "message": message,
                        "tree": tree.sha,
                        "parents": parents,
                    })),
            )
            .await?;

        let ref_request = match parent {
            Some(_) => self
                .request(
                    Method::PATCH,
                    &self.repo_path(repo, &format!("/git/refs/heads/{}", self.config.branch))?,
                )?
                .json(&json!({ "sha": commit.sha })),
            None => self
                .request(Method::POST, &self.repo_path(repo, "/git/refs")?)?
                .json(&json!({
                    "ref": format!("refs/heads/{}", self.config.branch),
                    "sha": commit.sha,
                })),
        };
        let response = self.send(ref_request).await?;
        ensure_success(response).await?;

        tracing::info!(repo, sha = %commit.sha, files = files.len(), "Committed files");
        Ok(commit.sha)
    }
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(PublishError::Api {
        status: status.as_u16(),
        message: secrets::scrub(&body.chars().take(ERROR_EXCERPT_CHARS).collect::<String>()),
    })
}

#[async_trait]
impl Publisher for GitHubPublisher {
    async fn create_repository(&self, name: &str) -> Result<String> {
        let repo: RepoResponse = self
            .send_json(self.request(Method::POST, "/user/repos")?.json(&json!({
                "name": name,
                "description": self.config.repo_description,
                "private": false,
                "auto_init": true,
            })))
            .await?;

        tracing::info!(repo = name, url = %repo.html_url, "Created repository");
        tokio::time::sleep(self.timing.init_settle).await;
        Ok(repo.html_url)
    }

    async fn publish(&self, repo: &str, files: &FileSet) -> Result<String> {
        let head = self.resolve_branch(repo, MissingBranch::Wait).await?;
        self.commit_files(repo, files, head).await
    }

    async fn publish_or_init(&self, repo: &str, files: &FileSet) -> Result<String> {
        let head = self.resolve_branch(repo, MissingBranch::Init).await?;
        if head.is_none() {
            tracing::info!(repo, "Branch missing, creating initial commit");
        }
        self.commit_files(repo, files, head).await
    }

    async fn enable_hosting(&self, repo: &str) -> Result<String> {
        let pages_url = self.pages_url(repo)?;
        let path = self.repo_path(repo, "/pages")?;
        let request = self.request(Method::POST, &path)?.json(&json!({
            "source": {"branch": self.config.branch, "path": "/"}
        }));

        match self.send(request).await {
            Ok(response) => {
                let status = response.status();
                if status == StatusCode::CREATED || status == StatusCode::NO_CONTENT {
                    tracing::info!(repo, "Enabled GitHub Pages");
                } else {
                    let body = response.text().await.unwrap_or_default();
                    if status == StatusCode::CONFLICT || body.to_lowercase().contains("already") {
                        tracing::info!(repo, "GitHub Pages already enabled");
                    } else {
                        tracing::warn!(
                            repo,
                            status = status.as_u16(),
                            body = %body.chars().take(ERROR_EXCERPT_CHARS).collect::<String>(),
                            "Unexpected Pages response, continuing"
                        );
                    }
                }
            }
            Err(e) => tracing::warn!(repo, error = %e, "Pages request failed, continuing"),
        }

        if !self.wait_for_pages(&pages_url).await {
            tracing::warn!(url = %pages_url, "Pages may not be fully deployed yet");
        }
        Ok(pages_url)
    }

    fn pages_url(&self, repo: &str) -> Result<String> {
        match &self.pages_base_url {
            Some(base) => Ok(format!("{}/{}/", base.trim_end_matches('/'), repo)),
            None => {
                let owner = &self.credentials()?.username;
                Ok(format!("https://{}.{}/{}/", owner, self.config.pages_domain, repo))
            }
        }
    }

    async fn wait_for_pages(&self, url: &str) -> bool {
        let attempts = self.timing.pages_poll_attempts;

        for attempt in 1..=attempts {
            let probe = self
                .client
                .get(url)
                .timeout(self.timing.pages_probe_timeout)
                .send()
                .await;

            match probe {
                Ok(response) if response.status() == StatusCode::OK => {
                    tracing::info!(url, attempt, "Pages site is live");
                    return true;
                }
                Ok(response) => {
                    tracing::debug!(url, attempt, status = response.status().as_u16(), "Pages not live yet")
                }
                Err(e) => tracing::debug!(url, attempt, error = %e, "Pages probe failed"),
            }

            if attempt < attempts {
                tokio::time::sleep(self.timing.pages_poll_interval).await;
            }
        }

        false
    }
}
