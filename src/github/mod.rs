//! Read/write access to the GitHub API for one repository.
//!
//! The domain types never talk to GitHub directly; status and asset queries
//! go through the [`StatusClient`] capability so tests can substitute a
//! scripted fake. [`client::GithubClient`] is the production implementation.

pub mod client;
pub mod error;

pub use client::{Asset, GithubClient, Release};
pub use error::GithubError;

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::status::CombinedStatus;
use crate::types::Sha;

/// The narrow remote-status capability tasks and jobs query through.
#[async_trait]
pub trait StatusClient: Send + Sync {
    /// Merges the commit statuses and check runs for `commit` into one
    /// combined state.
    async fn combined_status(&self, commit: &Sha) -> Result<CombinedStatus, GithubError>;

    /// Lists the release assets for `tag`, keyed by asset name.
    ///
    /// A missing release is not an error; it maps to an empty listing.
    async fn release_assets(&self, tag: &str) -> Result<BTreeMap<String, Asset>, GithubError>;

    /// Fetches the raw contents of a release asset.
    async fn download_asset(&self, asset: &Asset) -> Result<Vec<u8>, GithubError>;
}
