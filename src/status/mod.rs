//! Combined-status aggregation.
//!
//! GitHub reports CI results through two different APIs with two different
//! vocabularies: the commit status API (`error`, `failure`, `pending`,
//! `success` per context) and the check-runs API (`queued`/`in_progress`/
//! `completed` plus a conclusion). Azure Pipelines only uses the latter, so
//! a job spanning several providers has to reconcile both into one state.
//!
//! [`normalize_check_run`] maps a check run into the status vocabulary and
//! [`combine`] folds the resulting multiset into a single [`CombinedStatus`].

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single per-context CI state, in the commit status API vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitState {
    Error,
    Failure,
    Pending,
    Success,
}

impl CommitState {
    /// Parses a state string as reported by the commit status API.
    ///
    /// Unknown strings map to `Error`, matching the merge rule's treatment
    /// of unexpected input.
    pub fn parse(s: &str) -> CommitState {
        match s {
            "error" => CommitState::Error,
            "failure" => CommitState::Failure,
            "pending" => CommitState::Pending,
            "success" => CommitState::Success,
            _ => CommitState::Error,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CommitState::Error => "error",
            CommitState::Failure => "failure",
            CommitState::Pending => "pending",
            CommitState::Success => "success",
        }
    }

    /// Returns true for states that will not change without a new build.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, CommitState::Pending)
    }
}

impl fmt::Display for CommitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single-state reduction of all statuses and check runs for one commit.
///
/// Derived on demand, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CombinedStatus {
    pub state: CommitState,
    /// Number of contributing entries (statuses plus non-neutral check runs).
    pub total_count: usize,
}

/// Normalizes one check run into the commit status vocabulary.
///
/// - a run that is not yet `completed` contributes `pending`
/// - `success` / `failure` conclusions contribute verbatim
/// - `cancelled`, `timed_out` and `action_required` contribute `error`
/// - `neutral` contributes nothing (returns `None`)
pub fn normalize_check_run(status: &str, conclusion: Option<&str>) -> Option<CommitState> {
    if status != "completed" {
        return Some(CommitState::Pending);
    }
    match conclusion {
        Some("success") => Some(CommitState::Success),
        Some("failure") => Some(CommitState::Failure),
        Some("cancelled") | Some("timed_out") | Some("action_required") => {
            Some(CommitState::Error)
        }
        Some("neutral") => None,
        // A completed run without a recognized conclusion is unexpected.
        _ => Some(CommitState::Error),
    }
}

/// Merges per-context states into one combined state.
///
/// The rule, in strict priority order:
/// 1. any `error` or `failure` entry -> `failure`
/// 2. else any `pending` entry -> `pending`
/// 3. else every entry is `success` -> `success`
/// 4. else `error` (covers the empty set)
pub fn combine<I>(states: I) -> CombinedStatus
where
    I: IntoIterator<Item = CommitState>,
{
    let mut total_count = 0;
    let mut any_failed = false;
    let mut any_pending = false;

    for state in states {
        total_count += 1;
        match state {
            CommitState::Error | CommitState::Failure => any_failed = true,
            CommitState::Pending => any_pending = true,
            CommitState::Success => {}
        }
    }

    let state = if any_failed {
        CommitState::Failure
    } else if any_pending {
        CommitState::Pending
    } else if total_count > 0 {
        CommitState::Success
    } else {
        CommitState::Error
    };

    CombinedStatus { state, total_count }
}
