//! The source revision a job builds against.

use serde::{Deserialize, Serialize};

use crate::git::{GitResult, Repository};
use crate::types::Sha;

/// Immutable description of the revision the builds run against: the source
/// repository's remote, branch, head commit and version, plus the address
/// build notifications should go to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub head: Sha,
    /// `None` when the checkout was in detached HEAD state.
    pub branch: Option<String>,
    /// `None` when no remote counterpart could be detected.
    pub remote: Option<String>,
    pub version: String,
    /// `version` with a trailing `-rcN` suffix stripped; always derived,
    /// never independently set.
    pub no_rc_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Optional per-field overrides for [`Target::from_repository`].
#[derive(Debug, Clone, Default)]
pub struct TargetOverrides {
    pub head: Option<String>,
    pub branch: Option<String>,
    pub remote: Option<String>,
    pub version: Option<String>,
    pub email: Option<String>,
}

impl Target {
    pub fn new(
        head: Sha,
        branch: Option<String>,
        remote: Option<String>,
        version: impl Into<String>,
        email: Option<String>,
    ) -> Self {
        let version = version.into();
        let no_rc_version = strip_rc_suffix(&version);
        Target {
            head,
            branch,
            remote,
            version,
            no_rc_version,
            email,
        }
    }

    /// Builds a target by inspecting a local checkout, with each detected
    /// field individually overridable.
    pub fn from_repository(repo: &Repository, overrides: TargetOverrides) -> GitResult<Self> {
        let head = match overrides.head {
            Some(h) => Sha::new(h),
            None => repo.head()?,
        };
        let branch = match overrides.branch {
            Some(b) => Some(b),
            None => repo.current_branch()?,
        };
        let remote = match overrides.remote {
            Some(r) => Some(r),
            None => repo.remote_url()?,
        };
        let version = match overrides.version {
            Some(v) => v,
            None => repo.describe_version()?,
        };
        let email = overrides.email.or_else(|| Some(repo.user_email()));
        Ok(Target::new(head, branch, remote, version, email))
    }
}

/// Strips a trailing `-rcN` suffix from a version string.
pub fn strip_rc_suffix(version: &str) -> String {
    if let Some(idx) = version.rfind("-rc") {
        let digits = &version[idx + 3..];
        if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
            return version[..idx].to_string();
        }
    }
    version.to_string()
}
