//! Convoy - a git-backed job queue for dispatching packaging builds to
//! third-party CI providers.
//!
//! A *job* bundles a set of CI *tasks* against one source revision. Submitting
//! a job renders each task's CI configuration onto a dedicated branch (plus a
//! tag of the same name) in the queue repository and pushes the lot; the CI
//! providers pick the branches up from there. Completion is observed by
//! folding GitHub commit statuses and check-runs into one combined state per
//! task.

pub mod cli;
pub mod config;
pub mod git;
pub mod github;
pub mod queue;
pub mod report;
pub mod status;
pub mod types;

#[cfg(test)]
pub mod test_utils;
