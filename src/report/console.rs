//! Terminal status table for a job.

use std::collections::BTreeMap;
use std::io;
use std::path::Path;

use colored::Colorize;

use crate::github::{Asset, StatusClient};
use crate::status::CommitState;
use crate::types::{Job, JobError};

/// Renders per-task build state and artifact upload progress as a table,
/// optionally downloading the uploaded artifacts on the way.
pub struct ConsoleReport<'a> {
    job: &'a Job,
}

fn paint(line: String, state: CommitState) -> String {
    match state {
        CommitState::Error | CommitState::Failure => line.red().to_string(),
        CommitState::Pending => line.yellow().to_string(),
        CommitState::Success => line.green().to_string(),
    }
}

impl<'a> ConsoleReport<'a> {
    pub fn new(job: &'a Job) -> Self {
        ConsoleReport { job }
    }

    fn header() -> String {
        let header = format!("[{:>7}] {:<49} {:>20}", "state", "Task / Branch", "Artifacts");
        let delimiter = "-".repeat(header.len());
        format!("{}\n{}", header, delimiter)
    }

    fn lead(state: CommitState, branch: &str, uploaded: usize, expected: usize) -> String {
        let line = format!(
            "[{:>7}] {:<49} {:>20}",
            state.as_str().to_uppercase(),
            branch,
            format!("uploaded {} / {}", uploaded, expected)
        );
        paint(line, state)
    }

    fn artifact_line(state: CommitState, pattern: &str, asset: Option<&Asset>) -> String {
        let (name, label, label_state) = match asset {
            Some(asset) => (asset.name.as_str(), "OK", CommitState::Success),
            None if state == CommitState::Pending => (pattern, "PENDING", CommitState::Pending),
            None => (pattern, "MISSING", CommitState::Failure),
        };
        let badge = paint(format!("[{:>7}]", label), label_state);
        format!("{:>70} {}", name, badge)
    }

    /// Writes the table to `out`.
    ///
    /// With `download_dir` set, every uploaded asset is fetched into
    /// `download_dir/<task name>/` while the table is produced.
    pub async fn show<W: io::Write>(
        &self,
        out: &mut W,
        client: &dyn StatusClient,
        download_dir: Option<&Path>,
    ) -> Result<(), JobError> {
        writeln!(out, "{}", Self::header())?;

        let statuses = self.job.query_statuses(client).await?;
        for (name, task) in &self.job.tasks {
            let status = statuses[name];
            let assets: BTreeMap<String, Option<Asset>> = task.assets(client).await?;

            let uploaded = assets.values().filter(|a| a.is_some()).count();
            let branch = task.branch.as_deref().unwrap_or(name);
            writeln!(
                out,
                "{}",
                Self::lead(status.state, branch, uploaded, assets.len())
            )?;

            for (pattern, asset) in &assets {
                writeln!(
                    out,
                    "{}",
                    Self::artifact_line(status.state, pattern, asset.as_ref())
                )?;

                if let (Some(dir), Some(asset)) = (download_dir, asset) {
                    let task_dir = dir.join(name);
                    std::fs::create_dir_all(&task_dir)?;
                    let contents = client.download_asset(asset).await?;
                    std::fs::write(task_dir.join(&asset.name), contents)?;
                    tracing::info!(task = name.as_str(), asset = asset.name.as_str(), "downloaded asset");
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::BTreeMap as Map;

    use crate::test_utils::FakeStatusClient;
    use crate::types::{CiProvider, Platform, Sha, Target, Task};

    fn job_with_one_task(artifacts: Vec<&str>) -> Job {
        let target = Target::new(
            Sha::new("a".repeat(40)),
            Some("main".to_string()),
            Some("https://github.com/acme/pkg".to_string()),
            "1.0.0",
            None,
        );
        let mut task = Task::new(
            Platform::Linux,
            CiProvider::Travis,
            "ci.yml",
            artifacts.into_iter().map(String::from).collect(),
            Map::new(),
        );
        task.branch = Some("build-0-travis-wheel".to_string());
        task.commit = Some(Sha::new("c".repeat(40)));

        let mut tasks = Map::new();
        tasks.insert("wheel".to_string(), task);
        let mut job = Job::new(target, tasks).unwrap();
        job.branch = Some("build-0".to_string());
        job
    }

    fn rendered(output: &[u8]) -> String {
        // Strip ANSI escapes so assertions only see the table text.
        let text = String::from_utf8_lossy(output);
        let mut clean = String::new();
        let mut chars = text.chars();
        while let Some(c) = chars.next() {
            if c == '\u{1b}' {
                for c in chars.by_ref() {
                    if c == 'm' {
                        break;
                    }
                }
            } else {
                clean.push(c);
            }
        }
        clean
    }

    #[tokio::test]
    async fn table_shows_upload_progress() {
        let client = FakeStatusClient::new();
        client.push_status("c".repeat(40), crate::status::CommitState::Success, 1);
        client.set_assets("build-0-travis-wheel", vec!["pkg-1.0.whl"]);

        let job = job_with_one_task(vec![r"pkg-.*\.whl", r"pkg-.*\.tar\.gz"]);
        let mut out = Vec::new();
        ConsoleReport::new(&job)
            .show(&mut out, &client, None)
            .await
            .unwrap();

        let text = rendered(&out);
        assert!(text.contains("Task / Branch"), "{text}");
        assert!(text.contains("[SUCCESS] build-0-travis-wheel"), "{text}");
        assert!(text.contains("uploaded 1 / 2"), "{text}");
        assert!(text.contains("pkg-1.0.whl"), "{text}");
        assert!(text.contains("[     OK]"), "{text}");
        assert!(text.contains("[MISSING]"), "{text}");
    }

    #[tokio::test]
    async fn unfinished_tasks_show_pending_artifacts() {
        let client = FakeStatusClient::new();
        client.push_status("c".repeat(40), crate::status::CommitState::Pending, 1);

        let job = job_with_one_task(vec![r"pkg-.*\.whl"]);
        let mut out = Vec::new();
        ConsoleReport::new(&job)
            .show(&mut out, &client, None)
            .await
            .unwrap();

        let text = rendered(&out);
        assert!(text.contains("[PENDING]"), "{text}");
        assert!(!text.contains("[MISSING]"), "{text}");
    }

    #[tokio::test]
    async fn download_dir_receives_uploaded_assets() {
        let client = FakeStatusClient::new();
        client.push_status("c".repeat(40), crate::status::CommitState::Success, 1);
        client.set_assets("build-0-travis-wheel", vec!["pkg-1.0.whl"]);
        client.set_asset_bytes("pkg-1.0.whl", b"wheel bytes".to_vec());

        let job = job_with_one_task(vec![r"pkg-.*\.whl"]);
        let dir = tempfile::tempdir().unwrap();
        let mut out = Vec::new();
        ConsoleReport::new(&job)
            .show(&mut out, &client, Some(dir.path()))
            .await
            .unwrap();

        let downloaded = std::fs::read(dir.path().join("wheel/pkg-1.0.whl")).unwrap();
        assert_eq!(downloaded, b"wheel bytes");
    }
}
