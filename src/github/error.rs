//! GitHub API error types.

use thiserror::Error;

/// Errors from the GitHub REST API adapter.
///
/// Nothing here is retried internally; a single failure propagates to the
/// caller immediately.
#[derive(Debug, Error)]
pub enum GithubError {
    /// Transport-level failure (network, DNS, TLS).
    #[error("GitHub API unavailable: {0}")]
    RemoteUnavailable(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("GitHub API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// The remote URL does not look like a GitHub repository.
    #[error("could not parse GitHub owner/repo from remote URL `{url}`")]
    BadRemoteUrl { url: String },

    /// The caller asked for something malformed (empty tag, bad pattern).
    #[error("{0}")]
    InvalidRequest(String),

    /// Local file IO while uploading or downloading assets.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl GithubError {
    /// Returns true for a plain HTTP 404.
    pub fn is_not_found(&self) -> bool {
        matches!(self, GithubError::Api { status: 404, .. })
    }
}
