//! Local git operations for the queue repository.
//!
//! All interaction with git goes through the `git` binary with a
//! config-isolated, non-interactive environment. Objects (blobs, trees,
//! commits, tags) are created directly in the object store without touching
//! the working tree, so branch creation never needs a checkout.

pub mod repository;

pub use repository::{FileTree, Repository, TreeEntry};

use std::path::Path;
use std::process::Output;

use thiserror::Error;

/// Errors from git operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// Git command failed for a reason we don't classify further.
    #[error("git command failed: {command}\nstderr: {stderr}")]
    CommandFailed { command: String, stderr: String },

    /// The remote could not be reached (network, DNS or auth failure).
    #[error("remote unavailable: {details}")]
    RemoteUnavailable { details: String },

    /// Push was rejected: non-fast-forward, or credentials exhausted.
    #[error("push rejected for refs {refs:?}: {details}")]
    PushRejected { refs: Vec<String>, details: String },

    /// A branch, commit or path does not exist.
    #[error("not found: {what}")]
    NotFound { what: String },

    /// The origin remote uses SSH but an HTTPS URL is required for token push.
    #[error("origin URL {url} uses SSH, change it to HTTPS to push with a token")]
    SshOrigin { url: String },

    /// Git produced output where a SHA was expected but it didn't parse.
    #[error("invalid SHA: {0}")]
    InvalidSha(String),

    /// IO error spawning git.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for git operations.
pub type GitResult<T> = Result<T, GitError>;

/// Create a git Command with a clean environment (no system/user config).
///
/// This ensures consistent behavior across machines by ignoring system and
/// user git configuration, and disables terminal prompts so a missing
/// credential fails instead of hanging.
pub(crate) fn git_command(workdir: &Path) -> std::process::Command {
    use std::process::Command;

    let mut cmd = Command::new("git");
    cmd.current_dir(workdir);
    cmd.env("GIT_CONFIG_NOSYSTEM", "1");
    cmd.env("GIT_CONFIG_GLOBAL", "/dev/null");
    cmd.env("GIT_TERMINAL_PROMPT", "0");
    cmd
}

/// Run a git command in the given working directory.
///
/// Returns the command output on success, or a GitError on failure.
pub(crate) fn run_git_sync(workdir: &Path, args: &[&str]) -> GitResult<Output> {
    let output = git_command(workdir).args(args).output()?;

    if output.status.success() {
        Ok(output)
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        let command = format!("git {}", args.join(" "));
        Err(GitError::CommandFailed { command, stderr })
    }
}

/// Run a git command and return trimmed stdout as a string.
pub(crate) fn run_git_stdout(workdir: &Path, args: &[&str]) -> GitResult<String> {
    let output = run_git_sync(workdir, args)?;
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Classifies fetch/push stderr that indicates the remote is unreachable.
pub(crate) fn is_remote_unavailable(stderr: &str) -> bool {
    let lower = stderr.to_lowercase();
    lower.contains("could not resolve")
        || lower.contains("unable to access")
        || lower.contains("connection")
        || lower.contains("network")
        || lower.contains("timed out")
        || lower.contains("could not read from remote")
}

/// Classifies push stderr that indicates a rejected (non-fast-forward) ref.
pub(crate) fn is_push_rejected(stderr: &str) -> bool {
    let lower = stderr.to_lowercase();
    lower.contains("non-fast-forward")
        || lower.contains("[rejected]")
        || lower.contains("failed to push some refs")
        || lower.contains("already exists")
}

/// Classifies stderr that indicates bad or missing credentials.
pub(crate) fn is_auth_failure(stderr: &str) -> bool {
    let lower = stderr.to_lowercase();
    lower.contains("authentication failed")
        || lower.contains("invalid username or password")
        || lower.contains("401")
        || lower.contains("403")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_rejection_classification() {
        assert!(is_push_rejected(
            "! [rejected] build-1 -> build-1 (non-fast-forward)"
        ));
        assert!(is_push_rejected("error: failed to push some refs"));
        assert!(!is_push_rejected("Everything up-to-date"));
    }

    #[test]
    fn remote_unavailable_classification() {
        assert!(is_remote_unavailable(
            "fatal: unable to access 'https://github.com/x/y/': Could not resolve host"
        ));
        assert!(is_remote_unavailable("ssh: connect to host: Connection refused"));
        assert!(!is_remote_unavailable("! [rejected] main -> main"));
    }

    #[test]
    fn auth_failure_classification() {
        assert!(is_auth_failure(
            "remote: Invalid username or password.\nfatal: Authentication failed"
        ));
        assert!(is_auth_failure("The requested URL returned error: 403"));
        assert!(!is_auth_failure("non-fast-forward"));
    }
}
