//! Shared test scaffolding: throwaway git repositories and a scripted
//! GitHub client.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tempfile::TempDir;

use crate::git::{run_git_sync, Repository};
use crate::github::{Asset, GithubError, StatusClient};
use crate::status::{combine, CombinedStatus, CommitState};
use crate::types::Sha;

/// Creates a work repository with one commit on `main`, wired to a local
/// bare `origin` that pushes and fetches actually hit.
pub fn create_queue_repo() -> (TempDir, Repository) {
    let temp = TempDir::new().unwrap();
    let origin = temp.path().join("origin.git");
    let work = temp.path().join("work");

    run_git_sync(temp.path(), &["init", "--bare", "-q", "origin.git"]).unwrap();
    run_git_sync(temp.path(), &["init", "-q", "-b", "main", "work"]).unwrap();
    run_git_sync(&work, &["config", "user.email", "queue@test.invalid"]).unwrap();
    run_git_sync(&work, &["config", "user.name", "Queue Test"]).unwrap();

    std::fs::write(work.join("README.md"), "queue\n").unwrap();
    run_git_sync(&work, &["add", "README.md"]).unwrap();
    run_git_sync(&work, &["commit", "-q", "-m", "initial"]).unwrap();
    run_git_sync(
        &work,
        &["remote", "add", "origin", origin.to_str().unwrap()],
    )
    .unwrap();
    run_git_sync(&work, &["push", "-q", "-u", "origin", "main"]).unwrap();

    let repo = Repository::open(&work).unwrap();
    (temp, repo)
}

/// A scripted [`StatusClient`].
///
/// Statuses are per-commit queues: each query consumes one scripted answer
/// until a single answer remains, which then repeats. Assets are a static
/// per-tag listing.
#[derive(Default)]
pub struct FakeStatusClient {
    statuses: Mutex<BTreeMap<String, Vec<CombinedStatus>>>,
    assets: Mutex<BTreeMap<String, BTreeMap<String, Asset>>>,
    asset_bytes: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl FakeStatusClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a scripted status answer for `sha`.
    pub fn push_status(&self, sha: impl Into<String>, state: CommitState, count: usize) {
        let status = combine(std::iter::repeat(state).take(count));
        self.statuses
            .lock()
            .unwrap()
            .entry(sha.into())
            .or_default()
            .push(status);
    }

    /// Declares the uploaded asset names for `tag`.
    pub fn set_assets(&self, tag: &str, names: Vec<&str>) {
        let listing = names
            .into_iter()
            .enumerate()
            .map(|(i, name)| {
                (
                    name.to_string(),
                    Asset {
                        id: i as u64 + 1,
                        name: name.to_string(),
                        url: format!("fake://assets/{tag}/{name}"),
                        size: name.len() as u64,
                    },
                )
            })
            .collect();
        self.assets.lock().unwrap().insert(tag.to_string(), listing);
    }

    /// Sets the bytes served when `name` is downloaded. Assets without
    /// scripted bytes serve their own name.
    pub fn set_asset_bytes(&self, name: &str, bytes: Vec<u8>) {
        self.asset_bytes
            .lock()
            .unwrap()
            .insert(name.to_string(), bytes);
    }
}

#[async_trait]
impl StatusClient for FakeStatusClient {
    async fn combined_status(&self, commit: &Sha) -> Result<CombinedStatus, GithubError> {
        let mut statuses = self.statuses.lock().unwrap();
        match statuses.get_mut(commit.as_str()) {
            Some(queue) if !queue.is_empty() => {
                if queue.len() > 1 {
                    Ok(queue.remove(0))
                } else {
                    Ok(queue[0])
                }
            }
            _ => Err(GithubError::Api {
                status: 404,
                message: format!("no scripted status for {commit}"),
            }),
        }
    }

    async fn release_assets(&self, tag: &str) -> Result<BTreeMap<String, Asset>, GithubError> {
        Ok(self
            .assets
            .lock()
            .unwrap()
            .get(tag)
            .cloned()
            .unwrap_or_default())
    }

    async fn download_asset(&self, asset: &Asset) -> Result<Vec<u8>, GithubError> {
        Ok(self
            .asset_bytes
            .lock()
            .unwrap()
            .get(&asset.name)
            .cloned()
            .unwrap_or_else(|| asset.name.clone().into_bytes()))
    }
}
