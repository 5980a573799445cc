//! reqwest-based GitHub REST client scoped to a single repository.

use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use reqwest::header;
use serde::Deserialize;

use crate::github::{GithubError, StatusClient};
use crate::status::{self, CombinedStatus};
use crate::types::Sha;

const API_ACCEPT: &str = "application/vnd.github+json";

/// One entry from the commit status API.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusEntry {
    pub state: String,
    #[serde(default)]
    pub context: Option<String>,
}

/// One entry from the check-runs API.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckRun {
    pub status: String,
    #[serde(default)]
    pub conclusion: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CheckRunsResponse {
    check_runs: Vec<CheckRun>,
}

/// A release asset (name plus a downloadable handle).
#[derive(Debug, Clone, Deserialize)]
pub struct Asset {
    pub id: u64,
    pub name: String,
    /// API URL; downloading requires the `application/octet-stream` accept
    /// header.
    pub url: String,
    #[serde(default)]
    pub size: u64,
}

/// A GitHub release.
#[derive(Debug, Clone, Deserialize)]
pub struct Release {
    pub id: u64,
    pub tag_name: String,
    pub upload_url: String,
    #[serde(default)]
    pub assets: Vec<Asset>,
}

/// A GitHub API client scoped to a specific repository.
///
/// All operations performed through this client target the repository parsed
/// out of the queue's remote URL.
#[derive(Clone)]
pub struct GithubClient {
    http: reqwest::Client,
    owner: String,
    repo: String,
    token: String,
}

impl GithubClient {
    /// Creates a client for the repository behind `remote_url`,
    /// authenticating with `token`.
    pub fn new(remote_url: &str, token: impl Into<String>) -> Result<Self, GithubError> {
        let (owner, repo) = parse_github_remote(remote_url)?;
        let http = reqwest::Client::builder().user_agent("convoy").build()?;
        Ok(Self {
            http,
            owner,
            repo,
            token: token.into(),
        })
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn repo(&self) -> &str {
        &self.repo
    }

    fn repo_url(&self, path: &str) -> String {
        format!(
            "https://api.github.com/repos/{}/{}/{}",
            self.owner, self.repo, path
        )
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, GithubError> {
        let resp = self
            .http
            .get(url)
            .bearer_auth(&self.token)
            .header(header::ACCEPT, API_ACCEPT)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(GithubError::Api {
                status: status.as_u16(),
                message: resp.text().await.unwrap_or_default(),
            });
        }
        Ok(resp.json::<T>().await?)
    }

    /// Lists the per-context commit statuses for a commit.
    pub async fn commit_statuses(&self, commit: &Sha) -> Result<Vec<StatusEntry>, GithubError> {
        let url = self.repo_url(&format!("commits/{}/statuses?per_page=100", commit));
        self.get_json(&url).await
    }

    /// Lists the check runs for a commit.
    pub async fn check_runs(&self, commit: &Sha) -> Result<Vec<CheckRun>, GithubError> {
        let url = self.repo_url(&format!("commits/{}/check-runs?per_page=100", commit));
        let resp: CheckRunsResponse = self.get_json(&url).await?;
        Ok(resp.check_runs)
    }

    /// Fetches the release for `tag`, or `None` when there is no release.
    pub async fn release_by_tag(&self, tag: &str) -> Result<Option<Release>, GithubError> {
        let url = self.repo_url(&format!("releases/tags/{}", tag));
        match self.get_json::<Release>(&url).await {
            Ok(release) => Ok(Some(release)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Creates a release for `tag` at `target_commitish`.
    pub async fn create_release(
        &self,
        tag: &str,
        target_commitish: &Sha,
    ) -> Result<Release, GithubError> {
        let url = self.repo_url("releases");
        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .header(header::ACCEPT, API_ACCEPT)
            .json(&serde_json::json!({
                "tag_name": tag,
                "target_commitish": target_commitish.as_str(),
            }))
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(GithubError::Api {
                status: status.as_u16(),
                message: resp.text().await.unwrap_or_default(),
            });
        }
        Ok(resp.json::<Release>().await?)
    }

    /// Deletes a release by id. The tag itself is left in place.
    pub async fn delete_release(&self, release_id: u64) -> Result<(), GithubError> {
        let url = self.repo_url(&format!("releases/{}", release_id));
        let resp = self
            .http
            .delete(&url)
            .bearer_auth(&self.token)
            .header(header::ACCEPT, API_ACCEPT)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(GithubError::Api {
                status: status.as_u16(),
                message: resp.text().await.unwrap_or_default(),
            });
        }
        Ok(())
    }

    /// Uploads one asset to a release.
    pub async fn upload_asset(
        &self,
        release: &Release,
        name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<Asset, GithubError> {
        // upload_url is an RFC 6570 template like ".../assets{?name,label}".
        let base = release
            .upload_url
            .split('{')
            .next()
            .unwrap_or(&release.upload_url);
        let resp = self
            .http
            .post(base)
            .query(&[("name", name)])
            .bearer_auth(&self.token)
            .header(header::CONTENT_TYPE, content_type.to_string())
            .body(bytes)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(GithubError::Api {
                status: status.as_u16(),
                message: resp.text().await.unwrap_or_default(),
            });
        }
        Ok(resp.json::<Asset>().await?)
    }

    /// Replaces the release for `tag` (deleting any existing one) and uploads
    /// every local file matching `patterns` as assets.
    pub async fn overwrite_release_assets(
        &self,
        tag: &str,
        target_commitish: &Sha,
        patterns: &[String],
    ) -> Result<(), GithubError> {
        if tag.is_empty() {
            return Err(GithubError::InvalidRequest("empty tag name".to_string()));
        }
        if target_commitish.as_str().is_empty() {
            return Err(GithubError::InvalidRequest(
                "empty target commit for the release tag".to_string(),
            ));
        }

        if let Some(existing) = self.release_by_tag(tag).await? {
            tracing::debug!(tag, release_id = existing.id, "deleting existing release");
            self.delete_release(existing.id).await?;
        }
        let release = self.create_release(tag, target_commitish).await?;

        for pattern in patterns {
            let paths = glob::glob(pattern)
                .map_err(|e| GithubError::InvalidRequest(format!("bad pattern `{pattern}`: {e}")))?;
            for path in paths {
                let path = path.map_err(|e| GithubError::Io(e.into_error()))?;
                let name = match path.file_name().and_then(|n| n.to_str()) {
                    Some(name) => name.to_string(),
                    None => continue,
                };
                let mime = mime_guess::from_path(Path::new(&name))
                    .first_or_octet_stream()
                    .essence_str()
                    .to_string();
                let bytes = std::fs::read(&path)?;
                tracing::info!(asset = %name, %mime, "uploading asset");
                self.upload_asset(&release, &name, &mime, bytes).await?;
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for GithubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GithubClient")
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl StatusClient for GithubClient {
    async fn combined_status(&self, commit: &Sha) -> Result<CombinedStatus, GithubError> {
        let statuses = self.commit_statuses(commit).await?;
        let checks = self.check_runs(commit).await?;

        let states = statuses
            .iter()
            .map(|s| Some(status::CommitState::parse(&s.state)))
            .chain(
                checks
                    .iter()
                    .map(|c| status::normalize_check_run(&c.status, c.conclusion.as_deref())),
            )
            .flatten();

        Ok(status::combine(states))
    }

    async fn release_assets(&self, tag: &str) -> Result<BTreeMap<String, Asset>, GithubError> {
        match self.release_by_tag(tag).await? {
            Some(release) => Ok(release
                .assets
                .into_iter()
                .map(|a| (a.name.clone(), a))
                .collect()),
            None => Ok(BTreeMap::new()),
        }
    }

    async fn download_asset(&self, asset: &Asset) -> Result<Vec<u8>, GithubError> {
        let resp = self
            .http
            .get(&asset.url)
            .bearer_auth(&self.token)
            .header(header::ACCEPT, "application/octet-stream")
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(GithubError::Api {
                status: status.as_u16(),
                message: resp.text().await.unwrap_or_default(),
            });
        }
        Ok(resp.bytes().await?.to_vec())
    }
}

/// Extracts `(owner, repo)` from a GitHub remote URL (HTTPS or SSH form).
pub fn parse_github_remote(url: &str) -> Result<(String, String), GithubError> {
    let trimmed = url
        .trim_end_matches('/')
        .trim_end_matches(".git")
        .trim_end_matches('/');
    let mut parts = trimmed.rsplit(['/', ':']);
    match (parts.next(), parts.next()) {
        (Some(repo), Some(owner)) if !repo.is_empty() && !owner.is_empty() => {
            Ok((owner.to_string(), repo.to_string()))
        }
        _ => Err(GithubError::BadRemoteUrl {
            url: url.to_string(),
        }),
    }
}
