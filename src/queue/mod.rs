//! The queue repository: a git repository used as a job queue.
//!
//! Submitting a job writes one branch per task (so each CI provider builds
//! exactly one configuration) plus a job branch holding the serialized job
//! descriptor. Job identifiers are sequential per prefix and derived from
//! the branch names already present, so the queue repository itself is the
//! only source of truth.

use std::path::Path;

use regex::Regex;
use thiserror::Error;

use crate::git::{FileTree, GitError, Repository};
use crate::types::{Job, JobError};

/// File on the job branch holding the serialized job.
pub const JOB_FILENAME: &str = "job.yml";

// Scaffolding committed to every branch so providers ignore branches that
// are not meant for them. Travis and CircleCI would otherwise build every
// pushed branch with a matching config file.
const DEFAULT_TRAVIS_YML: &str = "\
branches:
  only:
    - master
    - /.*-travis-.*/

os: linux
dist: focal
language: generic
";

const DEFAULT_CIRCLE_YML: &str = "\
version: 2
jobs:
  build:
    machine: true

workflows:
  version: 2
  build:
    jobs:
      - build:
          filters:
            branches:
              only:
                - /.*-circle-.*/
";

/// The base file tree every branch starts from.
pub fn default_tree() -> FileTree {
    [
        (".travis.yml", DEFAULT_TRAVIS_YML),
        (".circleci/config.yml", DEFAULT_CIRCLE_YML),
    ]
    .into_iter()
    .collect()
}

#[derive(Debug, Error)]
pub enum QueueError {
    /// No job with the given prefix exists in the queue yet.
    #[error("no job has been submitted with prefix `{prefix}` yet")]
    NoSuchJob { prefix: String },

    /// The named job branch or its descriptor is missing.
    #[error("job `{job}` was not found in the queue; did you fetch?")]
    NotFound { job: String },

    /// A job can only be submitted once.
    #[error("job has already been submitted as `{branch}`")]
    AlreadySubmitted { branch: String },

    /// The target lacks a field submission depends on.
    #[error("cannot submit job: target has no {what} ({hint})")]
    IncompleteTarget {
        what: &'static str,
        hint: &'static str,
    },

    #[error(transparent)]
    Git(#[from] GitError),

    #[error(transparent)]
    Job(#[from] JobError),

    #[error("failed to decode job descriptor: {0}")]
    Decode(#[from] serde_yaml::Error),

    #[error("bad job prefix: {0}")]
    Pattern(#[from] regex::Error),
}

/// Scans branch names for `{prefix}-{id}` (task branches included, since
/// they start with the job name) and returns the highest id seen.
fn latest_id<I>(prefix: &str, branches: I) -> Result<Option<u64>, regex::Error>
where
    I: IntoIterator<Item = String>,
{
    let pattern = Regex::new(&format!(r"[\w/-]*{}-(\d+)", regex::escape(prefix)))?;
    let mut latest = None;
    for branch in branches {
        if let Some(captures) = pattern.captures(&branch) {
            if let Ok(id) = captures[1].parse::<u64>() {
                latest = Some(latest.map_or(id, |prev: u64| prev.max(id)));
            }
        }
    }
    Ok(latest)
}

/// A job queue backed by a git repository.
pub struct Queue {
    repo: Repository,
}

impl Queue {
    pub fn new(repo: Repository) -> Self {
        Queue { repo }
    }

    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    pub fn fetch(&self) -> Result<(), QueueError> {
        Ok(self.repo.fetch()?)
    }

    pub fn push(&mut self) -> Result<(), QueueError> {
        Ok(self.repo.push()?)
    }

    pub fn remote_url(&self) -> Result<Option<String>, QueueError> {
        Ok(self.repo.remote_url()?)
    }

    /// The highest job id already used for `prefix`, across local and
    /// remote-tracking branches.
    fn latest_prefix_id(&self, prefix: &str) -> Result<Option<u64>, QueueError> {
        Ok(latest_id(prefix, self.repo.branches()?)?)
    }

    /// The id the next submitted job with `prefix` will get.
    ///
    /// Derived from branch names, so two submitters racing for the same id
    /// both compute it; the loser's push is rejected and must be retried
    /// after a fetch.
    pub fn next_job_id(&self, prefix: &str) -> Result<u64, QueueError> {
        Ok(self.latest_prefix_id(prefix)?.map_or(0, |id| id + 1))
    }

    /// Loads the most recently submitted job with `prefix`.
    pub fn latest_for_prefix(&self, prefix: &str) -> Result<Job, QueueError> {
        let id = self
            .latest_prefix_id(prefix)?
            .ok_or_else(|| QueueError::NoSuchJob {
                prefix: prefix.to_string(),
            })?;
        self.get(&format!("{}-{}", prefix, id))
    }

    /// Loads a job descriptor from its fetched branch.
    pub fn get(&self, job_name: &str) -> Result<Job, QueueError> {
        let commit = self
            .repo
            .branch_commit(&format!("origin/{}", job_name))
            .map_err(|_| QueueError::NotFound {
                job: job_name.to_string(),
            })?;
        let contents = self
            .repo
            .file_contents(&commit, JOB_FILENAME)
            .map_err(|_| QueueError::NotFound {
                job: job_name.to_string(),
            })?;
        let job = Job::from_yaml(&String::from_utf8_lossy(&contents))?;
        Ok(job)
    }

    /// Writes a job into the queue: one branch and tag per task, then the
    /// job branch with the descriptor. Nothing is pushed; call
    /// [`Queue::push`] afterwards.
    ///
    /// Returns the job's branch name, which is its identifier.
    pub fn put(
        &mut self,
        job: &mut Job,
        prefix: &str,
        template_root: &Path,
    ) -> Result<String, QueueError> {
        if let Some(branch) = &job.branch {
            return Err(QueueError::AlreadySubmitted {
                branch: branch.clone(),
            });
        }
        if job.target.remote.is_none() {
            return Err(QueueError::IncompleteTarget {
                what: "remote",
                hint: "pass one explicitly or add an origin to the source repository",
            });
        }
        if job.target.branch.is_none() {
            return Err(QueueError::IncompleteTarget {
                what: "branch",
                hint: "pass one explicitly or check out a branch in the source repository",
            });
        }

        let job_branch = format!("{}-{}", prefix, self.next_job_id(prefix)?);
        let defaults = default_tree();

        let mut extra = std::collections::BTreeMap::new();
        extra.insert("job".to_string(), minijinja::Value::from(job_branch.clone()));
        extra.insert(
            "target".to_string(),
            minijinja::Value::from_serialize(&job.target),
        );
        let queue_remote_url = self.repo.remote_url()?.unwrap_or_default();
        extra.insert(
            "queue_remote_url".to_string(),
            minijinja::Value::from(queue_remote_url),
        );

        for (name, task) in job.tasks.iter_mut() {
            let branch = format!("{}-{}-{}", job_branch, task.ci, name);
            task.branch = Some(branch.clone());

            let files = task.render_files(template_root, &defaults, &extra)?;
            let message = format!("{}: {}", job_branch, name);
            let commit = self.repo.create_branch(&branch, &files, &[], &message)?;
            self.repo.create_tag(&branch, &commit, &message)?;
            task.commit = Some(commit);
            tracing::info!(task = name.as_str(), branch = branch.as_str(), "queued task");
        }

        job.branch = Some(job_branch.clone());
        let mut files = defaults;
        files.insert(JOB_FILENAME, job.to_yaml()?.into_bytes());
        self.repo.create_branch(&job_branch, &files, &[], &job_branch)?;
        tracing::info!(job = job_branch.as_str(), "queued job");

        Ok(job_branch)
    }
}
