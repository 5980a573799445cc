//! The job/task/target data model.
//!
//! These types are constructed in memory, rendered to files, committed as
//! branches at submission time, and reconstructed by reading a job branch's
//! tree from a fetched queue. Serialization is explicit serde per type; the
//! transient status cache is excluded from the persisted form.

pub mod ids;
pub mod job;
pub mod target;
pub mod task;

pub use ids::Sha;
pub use job::{Job, STATUS_CONCURRENCY};
pub use target::{strip_rc_suffix, Target, TargetOverrides};
pub use task::{CiProvider, Platform, Task};

use thiserror::Error;

use crate::github::GithubError;

/// Errors from job/task level operations.
#[derive(Debug, Error)]
pub enum JobError {
    /// A requested task or group name is not defined in the configuration.
    #[error("invalid {kind}(s) {requested:?}, must be one of {valid:?}")]
    InvalidSelection {
        kind: &'static str,
        requested: Vec<String>,
        valid: Vec<String>,
    },

    /// An artifact pattern matched more than one uploaded asset name.
    #[error("only a single asset should match pattern `{pattern}`, matched: {matches:?}")]
    AmbiguousArtifact {
        pattern: String,
        matches: Vec<String>,
    },

    /// Status or assets were requested for a task never submitted to a queue.
    #[error("task `{task}` has not been submitted to a queue yet")]
    NotSubmitted { task: String },

    /// A job must own at least one task.
    #[error("no tasks were provided for the job")]
    NoTasks,

    /// The poll loop exceeded its wall-clock budget. The caller may re-poll.
    #[error(
        "exceeded the maximum amount of time waiting for the job to finish, \
         waited for {waited_minutes:.1} minutes"
    )]
    Timeout { waited_minutes: f64 },

    /// An artifact pattern is not a valid regular expression.
    #[error("bad artifact pattern `{pattern}`: {source}")]
    BadPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// The CI template could not be read.
    #[error("failed to read template `{template}`: {source}")]
    TemplateIo {
        template: String,
        #[source]
        source: std::io::Error,
    },

    /// The CI template failed to render (including undefined variables).
    #[error("failed to render template `{template}`: {source}")]
    Template {
        template: String,
        #[source]
        source: minijinja::Error,
    },

    /// Writing downloaded assets to disk failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Github(#[from] GithubError),
}
