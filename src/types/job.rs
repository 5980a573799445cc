//! A submitted (or about-to-be-submitted) collection of tasks.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};

use crate::config::TasksConfig;
use crate::github::StatusClient;
use crate::status::CombinedStatus;
use crate::types::{JobError, Target, Task};

/// How many status queries run against the API at once.
pub const STATUS_CONCURRENCY: usize = 8;

/// A set of tasks queued together against one target revision.
///
/// `branch` is assigned at submission time and doubles as the job's
/// identifier within the queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub target: Target,
    pub tasks: BTreeMap<String, Task>,
    #[serde(default)]
    pub branch: Option<String>,
}

impl Job {
    pub fn new(target: Target, tasks: BTreeMap<String, Task>) -> Result<Self, JobError> {
        if tasks.is_empty() {
            return Err(JobError::NoTasks);
        }
        Ok(Job {
            target,
            tasks,
            branch: None,
        })
    }

    /// Instantiates a job from the configuration file.
    ///
    /// The selection is the union of the explicitly named tasks and the
    /// members of the named groups; unknown names in either list are
    /// rejected with the full set of valid choices. Artifact patterns have
    /// their `{version}` and `{no_rc_version}` placeholders filled in from
    /// the target.
    pub fn from_config(
        config: &TasksConfig,
        target: Target,
        task_whitelist: &[String],
        group_whitelist: &[String],
    ) -> Result<Self, JobError> {
        let invalid_groups: Vec<String> = group_whitelist
            .iter()
            .filter(|g| !config.groups.contains_key(*g))
            .cloned()
            .collect();
        if !invalid_groups.is_empty() {
            return Err(JobError::InvalidSelection {
                kind: "group",
                requested: invalid_groups,
                valid: config.groups.keys().cloned().collect(),
            });
        }

        let mut selected: Vec<String> = task_whitelist.to_vec();
        for group in group_whitelist {
            selected.extend(config.groups[group].iter().cloned());
        }
        selected.sort();
        selected.dedup();

        let invalid_tasks: Vec<String> = selected
            .iter()
            .filter(|t| !config.tasks.contains_key(*t))
            .cloned()
            .collect();
        if !invalid_tasks.is_empty() {
            return Err(JobError::InvalidSelection {
                kind: "task",
                requested: invalid_tasks,
                valid: config.tasks.keys().cloned().collect(),
            });
        }

        let mut tasks = BTreeMap::new();
        for name in selected {
            let decl = &config.tasks[&name];
            let artifacts = decl
                .artifacts
                .iter()
                .map(|pattern| {
                    pattern
                        .replace("{version}", &target.version)
                        .replace("{no_rc_version}", &target.no_rc_version)
                })
                .collect();
            tasks.insert(
                name,
                Task::new(
                    decl.platform,
                    decl.ci,
                    decl.template.clone(),
                    artifacts,
                    decl.params.clone(),
                ),
            );
        }
        Job::new(target, tasks)
    }

    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    pub fn from_yaml(contents: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(contents)
    }

    /// Queries every task's combined status concurrently.
    ///
    /// Read-only; callers that want the per-task caches updated go through
    /// [`Job::is_finished`] instead.
    pub async fn query_statuses(
        &self,
        client: &dyn StatusClient,
    ) -> Result<BTreeMap<String, CombinedStatus>, JobError> {
        stream::iter(self.tasks.iter().map(|(name, task)| async move {
            let commit = task.commit.as_ref().ok_or_else(|| JobError::NotSubmitted {
                task: name.clone(),
            })?;
            let status = client.combined_status(commit).await?;
            Ok::<_, JobError>((name.clone(), status))
        }))
        .buffer_unordered(STATUS_CONCURRENCY)
        .try_collect()
        .await
    }

    /// Re-queries all tasks and reports whether every one reached a terminal
    /// state. Task caches are refreshed with the answers.
    pub async fn is_finished(&mut self, client: &dyn StatusClient) -> Result<bool, JobError> {
        let statuses = self.query_statuses(client).await?;
        let mut finished = true;
        for (name, status) in statuses {
            if !status.state.is_terminal() {
                finished = false;
            }
            if let Some(task) = self.tasks.get_mut(&name) {
                task.set_status_cache(status);
            }
        }
        Ok(finished)
    }

    /// Polls until every task finishes, or until `max_minutes` of wall clock
    /// have elapsed.
    pub async fn wait_until_finished(
        &mut self,
        client: &dyn StatusClient,
        max_minutes: u64,
        interval_minutes: u64,
    ) -> Result<(), JobError> {
        let started = Instant::now();
        loop {
            if self.is_finished(client).await? {
                return Ok(());
            }
            let waited_minutes = started.elapsed().as_secs_f64() / 60.0;
            if waited_minutes > max_minutes as f64 {
                return Err(JobError::Timeout { waited_minutes });
            }
            tracing::info!(
                waited_minutes,
                "job still has pending tasks, sleeping before the next poll"
            );
            tokio::time::sleep(Duration::from_secs(interval_minutes * 60)).await;
        }
    }
}
