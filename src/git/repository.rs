//! Object-level wrapper around a local git repository.
//!
//! [`Repository`] creates blobs, trees, commits, branches and annotated tags
//! directly in the object store (`hash-object`, `mktree`, `commit-tree`,
//! `update-ref`), which means submitting a job never disturbs the working
//! tree. Every created branch/tag ref is accumulated in a pending-push set;
//! nothing reaches the remote until an explicit [`Repository::push`].

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use crate::git::{
    git_command, is_auth_failure, is_push_rejected, is_remote_unavailable, run_git_stdout,
    run_git_sync, GitError, GitResult,
};
use crate::types::Sha;

/// Credential failures on push are retried at most this many times.
pub const MAX_CREDENTIAL_ATTEMPTS: u32 = 5;

/// One entry in a [`FileTree`]: either file content or a subtree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeEntry {
    Blob(Vec<u8>),
    Tree(FileTree),
}

/// An in-memory file hierarchy, built from slash-separated paths.
///
/// Ordered (BTreeMap) so tree object creation is deterministic for
/// identical content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileTree {
    entries: BTreeMap<String, TreeEntry>,
}

impl FileTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts file content at a slash-separated path, creating intermediate
    /// subtrees as needed. An existing entry at the leaf is replaced.
    pub fn insert(&mut self, path: &str, content: impl Into<Vec<u8>>) {
        let mut parts = path.split('/').peekable();
        let mut node = self;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                node.entries
                    .insert(part.to_string(), TreeEntry::Blob(content.into()));
                return;
            }
            let entry = node
                .entries
                .entry(part.to_string())
                .or_insert_with(|| TreeEntry::Tree(FileTree::new()));
            // A blob in the middle of the path is replaced by a subtree.
            if !matches!(entry, TreeEntry::Tree(_)) {
                *entry = TreeEntry::Tree(FileTree::new());
            }
            match entry {
                TreeEntry::Tree(sub) => node = sub,
                TreeEntry::Blob(_) => unreachable!("blob replaced above"),
            }
        }
    }

    /// Merges `other` into `self`; entries from `other` win on conflict,
    /// except that two subtrees at the same path are merged recursively.
    pub fn merge(&mut self, other: FileTree) {
        for (name, entry) in other.entries {
            match (self.entries.get_mut(&name), entry) {
                (Some(TreeEntry::Tree(existing)), TreeEntry::Tree(incoming)) => {
                    existing.merge(incoming);
                }
                (_, entry) => {
                    self.entries.insert(name, entry);
                }
            }
        }
    }

    /// Looks up an entry by slash-separated path.
    pub fn get(&self, path: &str) -> Option<&TreeEntry> {
        let mut parts = path.split('/').peekable();
        let mut node = self;
        while let Some(part) = parts.next() {
            let entry = node.entries.get(part)?;
            if parts.peek().is_none() {
                return Some(entry);
            }
            match entry {
                TreeEntry::Tree(sub) => node = sub,
                TreeEntry::Blob(_) => return None,
            }
        }
        None
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn iter(&self) -> impl Iterator<Item = (&String, &TreeEntry)> {
        self.entries.iter()
    }
}

impl<P: AsRef<str>, C: Into<Vec<u8>>> FromIterator<(P, C)> for FileTree {
    fn from_iter<I: IntoIterator<Item = (P, C)>>(iter: I) -> Self {
        let mut tree = FileTree::new();
        for (path, content) in iter {
            tree.insert(path.as_ref(), content);
        }
        tree
    }
}

/// A local git repository with a single `origin` remote.
///
/// Used both for reading revision information from the source checkout and
/// for writing job/task branches into the queue repository.
pub struct Repository {
    path: PathBuf,
    github_token: Option<String>,
    remote_url_override: Option<String>,
    require_https: bool,
    pending_refs: Vec<String>,
}

impl Repository {
    /// Opens an existing repository at `path`.
    pub fn open(path: impl Into<PathBuf>) -> GitResult<Self> {
        let path = path.into();
        run_git_sync(&path, &["rev-parse", "--git-dir"]).map_err(|_| GitError::NotFound {
            what: format!("git repository at {}", path.display()),
        })?;
        Ok(Self {
            path,
            github_token: None,
            remote_url_override: None,
            require_https: false,
            pending_refs: Vec::new(),
        })
    }

    /// Sets the token used to authenticate pushes over HTTPS.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.github_token = Some(token.into());
        self
    }

    /// Overrides the detected origin URL.
    pub fn with_remote_url(mut self, url: impl Into<String>) -> Self {
        self.remote_url_override = Some(url.into());
        self
    }

    /// Makes [`Repository::remote_url`] fail on SSH origin URLs.
    pub fn require_https(mut self) -> Self {
        self.require_https = true;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Refs created since the last successful push.
    pub fn pending_refs(&self) -> &[String] {
        &self.pending_refs
    }

    /// The currently checked out commit.
    pub fn head(&self) -> GitResult<Sha> {
        let sha = run_git_stdout(&self.path, &["rev-parse", "HEAD"])?;
        Sha::parse(&sha).map_err(|e| GitError::InvalidSha(e.0))
    }

    /// The currently checked out branch, or `None` when detached.
    pub fn current_branch(&self) -> GitResult<Option<String>> {
        let output = git_command(&self.path)
            .args(["symbolic-ref", "--short", "-q", "HEAD"])
            .output()?;
        if output.status.success() {
            Ok(Some(
                String::from_utf8_lossy(&output.stdout).trim().to_string(),
            ))
        } else {
            Ok(None)
        }
    }

    /// The origin URL, with SSH GitHub URLs rewritten to their HTTPS
    /// equivalent (usable with a token). Returns `None` when no origin is
    /// configured and no override was given.
    pub fn remote_url(&self) -> GitResult<Option<String>> {
        if let Some(url) = &self.remote_url_override {
            return Ok(Some(url.clone()));
        }
        let url = match run_git_stdout(&self.path, &["remote", "get-url", "origin"]) {
            Ok(url) => url,
            Err(_) => return Ok(None),
        };
        if self.require_https && url.starts_with("git@github.com") {
            return Err(GitError::SshOrigin { url });
        }
        Ok(Some(url.replace("git@github.com:", "https://github.com/")))
    }

    /// Committer name from repo config, falling back to the environment.
    pub fn user_name(&self) -> String {
        run_git_stdout(&self.path, &["config", "user.name"])
            .ok()
            .filter(|s| !s.is_empty())
            .or_else(|| std::env::var("GIT_COMMITTER_NAME").ok())
            .unwrap_or_else(|| "unknown".to_string())
    }

    /// Committer email from repo config, falling back to the environment.
    pub fn user_email(&self) -> String {
        run_git_stdout(&self.path, &["config", "user.email"])
            .ok()
            .filter(|s| !s.is_empty())
            .or_else(|| std::env::var("GIT_COMMITTER_EMAIL").ok())
            .unwrap_or_else(|| "unknown".to_string())
    }

    /// Derives a version string from `git describe`, in the form
    /// `<tag>.dev<distance>` with a leading `v` stripped from the tag.
    pub fn describe_version(&self) -> GitResult<String> {
        let described = run_git_stdout(&self.path, &["describe", "--tags", "--long"])?;
        // Format is <tag>-<distance>-g<sha>; the tag itself may contain dashes,
        // so split from the right.
        let mut parts = described.rsplitn(3, '-');
        let _sha = parts.next();
        let distance = parts.next().unwrap_or("0");
        let tag = parts.next().unwrap_or(&described);
        let tag = tag.strip_prefix('v').unwrap_or(tag);
        Ok(format!("{}.dev{}", tag, distance))
    }

    /// Writes a blob into the object store.
    fn write_blob(&self, content: &[u8]) -> GitResult<Sha> {
        let mut child = git_command(&self.path)
            .args(["hash-object", "-w", "--stdin"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(content)?;
        }
        let output = child.wait_with_output()?;
        if !output.status.success() {
            return Err(GitError::CommandFailed {
                command: "git hash-object -w --stdin".to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            });
        }
        let sha = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Sha::parse(&sha).map_err(|e| GitError::InvalidSha(e.0))
    }

    /// Builds a tree object from an in-memory file hierarchy.
    ///
    /// Nested [`TreeEntry::Tree`] values become subtrees, built recursively.
    /// Deterministic for identical content.
    pub fn create_tree(&self, files: &FileTree) -> GitResult<Sha> {
        let mut listing = String::new();
        for (name, entry) in files.iter() {
            match entry {
                TreeEntry::Blob(content) => {
                    let blob = self.write_blob(content)?;
                    listing.push_str(&format!("100644 blob {}\t{}\n", blob, name));
                }
                TreeEntry::Tree(sub) => {
                    let tree = self.create_tree(sub)?;
                    listing.push_str(&format!("040000 tree {}\t{}\n", tree, name));
                }
            }
        }

        let mut child = git_command(&self.path)
            .arg("mktree")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(listing.as_bytes())?;
        }
        let output = child.wait_with_output()?;
        if !output.status.success() {
            return Err(GitError::CommandFailed {
                command: "git mktree".to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            });
        }
        let sha = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Sha::parse(&sha).map_err(|e| GitError::InvalidSha(e.0))
    }

    /// Creates a commit object for `tree` with the repository's configured
    /// identity as author and committer.
    pub fn create_commit(&self, parents: &[Sha], tree: &Sha, message: &str) -> GitResult<Sha> {
        let name = self.user_name();
        let email = self.user_email();
        let mut cmd = git_command(&self.path);
        cmd.arg("-c").arg(format!("user.name={}", name));
        cmd.arg("-c").arg(format!("user.email={}", email));
        cmd.args(["commit-tree", tree.as_str()]);
        for parent in parents {
            cmd.args(["-p", parent.as_str()]);
        }
        cmd.args(["-m", message]);

        let output = cmd.output()?;
        if !output.status.success() {
            return Err(GitError::CommandFailed {
                command: format!("git commit-tree {}", tree),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            });
        }
        let sha = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Sha::parse(&sha).map_err(|e| GitError::InvalidSha(e.0))
    }

    /// Creates a branch holding a commit of `files` and records the ref in
    /// the pending-push set. Returns the branch's commit.
    pub fn create_branch(
        &mut self,
        name: &str,
        files: &FileTree,
        parents: &[Sha],
        message: &str,
    ) -> GitResult<Sha> {
        let tree = self.create_tree(files)?;
        let commit = self.create_commit(parents, &tree, message)?;
        run_git_sync(
            &self.path,
            &["update-ref", &format!("refs/heads/{}", name), commit.as_str()],
        )?;
        self.pending_refs.push(format!("refs/heads/{}", name));
        tracing::debug!(branch = name, commit = %commit.short(), "created branch");
        Ok(commit)
    }

    /// Creates an annotated tag pointing at `commit` and records the ref in
    /// the pending-push set.
    pub fn create_tag(&mut self, name: &str, commit: &Sha, message: &str) -> GitResult<()> {
        let user = self.user_name();
        let email = self.user_email();
        let output = git_command(&self.path)
            .arg("-c")
            .arg(format!("user.name={}", user))
            .arg("-c")
            .arg(format!("user.email={}", email))
            .args(["tag", "-a", name, "-m", message, commit.as_str()])
            .output()?;
        if !output.status.success() {
            return Err(GitError::CommandFailed {
                command: format!("git tag -a {}", name),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            });
        }
        self.pending_refs.push(format!("refs/tags/{}", name));
        tracing::debug!(tag = name, commit = %commit.short(), "created tag");
        Ok(())
    }

    /// Fetches all remote branches into `refs/remotes/origin/*`.
    pub fn fetch(&self) -> GitResult<()> {
        match run_git_sync(
            &self.path,
            &["fetch", "origin", "+refs/heads/*:refs/remotes/origin/*"],
        ) {
            Ok(_) => Ok(()),
            Err(GitError::CommandFailed { stderr, command }) => {
                if is_remote_unavailable(&stderr) || is_auth_failure(&stderr) {
                    Err(GitError::RemoteUnavailable { details: stderr })
                } else {
                    Err(GitError::CommandFailed { command, stderr })
                }
            }
            Err(e) => Err(e),
        }
    }

    /// Pushes exactly the pending-push set to origin and clears it on
    /// success.
    ///
    /// Credential failures are retried up to [`MAX_CREDENTIAL_ATTEMPTS`]
    /// before failing hard; a non-fast-forward rejection is never retried
    /// here - the caller must re-fetch and re-derive before trying again.
    pub fn push(&mut self) -> GitResult<()> {
        if self.pending_refs.is_empty() {
            return Ok(());
        }
        let target = self.push_target()?;

        let mut attempts = 0;
        loop {
            attempts += 1;
            let mut cmd = git_command(&self.path);
            cmd.arg("push").arg(&target);
            for r in &self.pending_refs {
                cmd.arg(r);
            }
            let output = cmd.output()?;

            if output.status.success() {
                tracing::info!(refs = ?self.pending_refs, "pushed refs");
                self.pending_refs.clear();
                return Ok(());
            }

            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            if is_push_rejected(&stderr) {
                return Err(GitError::PushRejected {
                    refs: self.pending_refs.clone(),
                    details: stderr,
                });
            }
            if is_auth_failure(&stderr) {
                if attempts >= MAX_CREDENTIAL_ATTEMPTS {
                    return Err(GitError::PushRejected {
                        refs: self.pending_refs.clone(),
                        details: format!(
                            "credentials rejected after {} attempts: {}",
                            attempts, stderr
                        ),
                    });
                }
                tracing::warn!(attempt = attempts, "push authentication failed, retrying");
                continue;
            }
            if is_remote_unavailable(&stderr) {
                return Err(GitError::RemoteUnavailable { details: stderr });
            }
            return Err(GitError::CommandFailed {
                command: "git push".to_string(),
                stderr,
            });
        }
    }

    /// The push destination: a token-authenticated URL when both a token and
    /// an HTTPS origin are available, otherwise the plain `origin` remote.
    fn push_target(&self) -> GitResult<String> {
        if let (Some(token), Ok(Some(url))) = (&self.github_token, self.remote_url()) {
            if let Some(rest) = url.strip_prefix("https://") {
                return Ok(format!("https://x-access-token:{}@{}", token, rest));
            }
        }
        Ok("origin".to_string())
    }

    /// Reads the raw bytes of `path` from `commit`'s tree.
    pub fn file_contents(&self, commit: &Sha, path: &str) -> GitResult<Vec<u8>> {
        let spec = format!("{}:{}", commit, path);
        let output = git_command(&self.path)
            .args(["cat-file", "blob", &spec])
            .output()?;
        if output.status.success() {
            Ok(output.stdout)
        } else {
            Err(GitError::NotFound {
                what: format!("path {} in commit {}", path, commit.short()),
            })
        }
    }

    /// Resolves a branch name (local or remote-tracking, e.g.
    /// `origin/build-2`) to its commit.
    pub fn branch_commit(&self, name: &str) -> GitResult<Sha> {
        let spec = format!("{}^{{commit}}", name);
        let output = git_command(&self.path)
            .args(["rev-parse", "--verify", "--quiet", &spec])
            .output()?;
        if !output.status.success() {
            return Err(GitError::NotFound {
                what: format!("branch {}", name),
            });
        }
        let sha = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Sha::parse(&sha).map_err(|e| GitError::InvalidSha(e.0))
    }

    /// All known branch names: local heads plus `origin/...` tracking refs.
    pub fn branches(&self) -> GitResult<Vec<String>> {
        let out = run_git_stdout(
            &self.path,
            &[
                "for-each-ref",
                "--format=%(refname:short)",
                "refs/heads",
                "refs/remotes/origin",
            ],
        )?;
        Ok(out
            .lines()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty() && l != "origin/HEAD" && l != "origin")
            .collect())
    }
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("path", &self.path)
            .field("pending_refs", &self.pending_refs)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::create_queue_repo;

    mod file_tree {
        use super::*;

        #[test]
        fn insert_builds_nested_trees() {
            let mut tree = FileTree::new();
            tree.insert(".circleci/config.yml", "circle");
            tree.insert(".travis.yml", "travis");

            assert!(matches!(
                tree.get(".circleci/config.yml"),
                Some(TreeEntry::Blob(b)) if b == b"circle"
            ));
            assert!(matches!(tree.get(".travis.yml"), Some(TreeEntry::Blob(_))));
            assert!(matches!(tree.get(".circleci"), Some(TreeEntry::Tree(_))));
            assert!(tree.get("missing").is_none());
        }

        #[test]
        fn merge_later_entries_win() {
            let mut base: FileTree = [("a.yml", "old"), ("keep.yml", "keep")]
                .into_iter()
                .collect();
            let overlay: FileTree = [("a.yml", "new")].into_iter().collect();
            base.merge(overlay);

            assert!(matches!(base.get("a.yml"), Some(TreeEntry::Blob(b)) if b == b"new"));
            assert!(matches!(base.get("keep.yml"), Some(TreeEntry::Blob(b)) if b == b"keep"));
        }

        #[test]
        fn merge_recurses_into_subtrees() {
            let mut base: FileTree = [("dir/a", "a")].into_iter().collect();
            let overlay: FileTree = [("dir/b", "b")].into_iter().collect();
            base.merge(overlay);

            assert!(base.get("dir/a").is_some());
            assert!(base.get("dir/b").is_some());
        }
    }

    mod objects {
        use super::*;

        #[test]
        fn create_branch_and_read_back_contents() {
            let (_temp, mut repo) = create_queue_repo();
            let files: FileTree = [
                ("job.yml", "tasks: {}"),
                (".circleci/config.yml", "version: 2"),
            ]
            .into_iter()
            .collect();

            let commit = repo.create_branch("build-0", &files, &[], "").unwrap();

            let contents = repo.file_contents(&commit, "job.yml").unwrap();
            assert_eq!(contents, b"tasks: {}");
            let nested = repo.file_contents(&commit, ".circleci/config.yml").unwrap();
            assert_eq!(nested, b"version: 2");
        }

        #[test]
        fn file_contents_missing_path_is_not_found() {
            let (_temp, mut repo) = create_queue_repo();
            let files: FileTree = [("job.yml", "x")].into_iter().collect();
            let commit = repo.create_branch("build-0", &files, &[], "").unwrap();

            let err = repo.file_contents(&commit, "absent.yml").unwrap_err();
            assert!(matches!(err, GitError::NotFound { .. }), "{err:?}");
        }

        #[test]
        fn tree_creation_is_deterministic() {
            let (_temp, repo) = create_queue_repo();
            let files: FileTree = [("a.txt", "a"), ("d/b.txt", "b")].into_iter().collect();
            let first = repo.create_tree(&files).unwrap();
            let second = repo.create_tree(&files).unwrap();
            assert_eq!(first, second);
        }

        #[test]
        fn create_branch_and_tag_record_pending_refs() {
            let (_temp, mut repo) = create_queue_repo();
            let files: FileTree = [("f", "x")].into_iter().collect();
            let commit = repo.create_branch("build-1-circle-docker", &files, &[], "").unwrap();
            repo.create_tag("build-1-circle-docker", &commit, "").unwrap();

            assert_eq!(
                repo.pending_refs(),
                &[
                    "refs/heads/build-1-circle-docker".to_string(),
                    "refs/tags/build-1-circle-docker".to_string(),
                ]
            );
        }
    }

    mod remote {
        use super::*;

        #[test]
        fn push_sends_pending_refs_and_clears_set() {
            let (_temp, mut repo) = create_queue_repo();
            let files: FileTree = [("f", "x")].into_iter().collect();
            let commit = repo.create_branch("build-0", &files, &[], "").unwrap();
            repo.create_tag("build-0", &commit, "").unwrap();

            repo.push().unwrap();
            assert!(repo.pending_refs().is_empty());

            // The branch is now visible after a fetch.
            repo.fetch().unwrap();
            let branches = repo.branches().unwrap();
            assert!(branches.contains(&"origin/build-0".to_string()), "{branches:?}");
        }

        #[test]
        fn push_with_nothing_pending_is_a_noop() {
            let (_temp, mut repo) = create_queue_repo();
            repo.push().unwrap();
        }

        #[test]
        fn non_fast_forward_push_is_rejected() {
            let (_temp, mut repo) = create_queue_repo();

            // Seed the remote with a "clash" branch unrelated to ours.
            let seed: FileTree = [("seed", "remote content")].into_iter().collect();
            let mut first = Repository::open(repo.path()).unwrap();
            first.create_branch("clash", &seed, &[], "").unwrap();
            first.push().unwrap();
            run_git_sync(repo.path(), &["update-ref", "-d", "refs/heads/clash"]).unwrap();

            // Now create an unrelated local "clash" and try to push it.
            let files: FileTree = [("f", "local content")].into_iter().collect();
            repo.create_branch("clash", &files, &[], "").unwrap();
            let err = repo.push().unwrap_err();
            assert!(matches!(err, GitError::PushRejected { .. }), "{err:?}");
        }

        #[test]
        fn fetch_against_missing_remote_is_remote_unavailable() {
            let (_temp, repo) = create_queue_repo();
            run_git_sync(
                repo.path(),
                &[
                    "remote",
                    "set-url",
                    "origin",
                    "https://127.0.0.1:1/none/none.git",
                ],
            )
            .unwrap();

            let err = repo.fetch().unwrap_err();
            assert!(matches!(err, GitError::RemoteUnavailable { .. }), "{err:?}");
        }
    }

    mod checkout_info {
        use super::*;

        #[test]
        fn head_and_branch_detection() {
            let (_temp, repo) = create_queue_repo();
            let head = repo.head().unwrap();
            assert_eq!(head.as_str().len(), 40);
            assert_eq!(repo.current_branch().unwrap(), Some("main".to_string()));
        }

        #[test]
        fn detached_head_has_no_branch() {
            let (_temp, repo) = create_queue_repo();
            let head = repo.head().unwrap();
            run_git_sync(repo.path(), &["checkout", "--detach", head.as_str()]).unwrap();
            assert_eq!(repo.current_branch().unwrap(), None);
        }

        #[test]
        fn ssh_origin_is_rewritten_to_https() {
            let (_temp, repo) = create_queue_repo();
            run_git_sync(
                repo.path(),
                &["remote", "set-url", "origin", "git@github.com:acme/queue.git"],
            )
            .unwrap();

            let url = repo.remote_url().unwrap().unwrap();
            assert_eq!(url, "https://github.com/acme/queue.git");
        }

        #[test]
        fn ssh_origin_fails_when_https_required() {
            let (_temp, repo) = create_queue_repo();
            run_git_sync(
                repo.path(),
                &["remote", "set-url", "origin", "git@github.com:acme/queue.git"],
            )
            .unwrap();

            let repo = Repository::open(repo.path()).unwrap().require_https();
            let err = repo.remote_url().unwrap_err();
            assert!(matches!(err, GitError::SshOrigin { .. }), "{err:?}");
        }

        #[test]
        fn remote_url_override_wins() {
            let (_temp, repo) = create_queue_repo();
            let repo = Repository::open(repo.path())
                .unwrap()
                .with_remote_url("https://github.com/acme/other");
            assert_eq!(
                repo.remote_url().unwrap().unwrap(),
                "https://github.com/acme/other"
            );
        }

        #[test]
        fn describe_version_formats_tag_and_distance() {
            let (_temp, repo) = create_queue_repo();
            run_git_sync(repo.path(), &["tag", "-a", "v1.2.0", "-m", ""]).unwrap();
            let version = repo.describe_version().unwrap();
            assert_eq!(version, "1.2.0.dev0");
        }
    }
}
