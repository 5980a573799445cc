//! Nightly-style email report, rendered as an RFC 822 message.

use std::collections::BTreeMap;
use std::io;

use crate::status::{CombinedStatus, CommitState};
use crate::types::{Job, JobError};

/// Renders a job's task states as a plain-text email, grouped by outcome.
///
/// Status queries happen elsewhere; the report is a pure function of the
/// job and a status map, which keeps it testable without a network.
pub struct EmailReport<'a> {
    job: &'a Job,
    queue_remote_url: String,
    sender_name: String,
    sender_email: String,
    recipient_email: String,
}

const SECTIONS: [(CommitState, &str); 4] = [
    (CommitState::Failure, "Failed Tasks:"),
    (CommitState::Error, "Errored Tasks:"),
    (CommitState::Pending, "Pending Tasks:"),
    (CommitState::Success, "Succeeded Tasks:"),
];

impl<'a> EmailReport<'a> {
    pub fn new(
        job: &'a Job,
        queue_remote_url: impl Into<String>,
        sender_name: impl Into<String>,
        sender_email: impl Into<String>,
        recipient_email: impl Into<String>,
    ) -> Self {
        EmailReport {
            job,
            queue_remote_url: queue_remote_url.into(),
            sender_name: sender_name.into(),
            sender_email: sender_email.into(),
            recipient_email: recipient_email.into(),
        }
    }

    /// Link to the queue's branch listing filtered down to `query`.
    fn branch_url(&self, query: &str) -> String {
        let repo_url = self.queue_remote_url.trim_end_matches(".git");
        format!("{}/branches/all?query={}", repo_url, query)
    }

    fn job_name(&self) -> &str {
        self.job.branch.as_deref().unwrap_or("<unsubmitted>")
    }

    fn subject(&self) -> String {
        format!("[NIGHTLY] Build report for job {}", self.job_name())
    }

    fn body(&self, statuses: &BTreeMap<String, CombinedStatus>) -> String {
        let mut body = format!(
            "Build report for job {}\n\nAll tasks: {}\n",
            self.job_name(),
            self.branch_url(self.job_name())
        );

        for (state, heading) in SECTIONS {
            let mut entries: Vec<String> = Vec::new();
            for (name, task) in &self.job.tasks {
                let status = match statuses.get(name) {
                    Some(status) => *status,
                    None => continue,
                };
                if status.state != state {
                    continue;
                }
                let branch = task.branch.as_deref().unwrap_or(name);
                entries.push(format!(
                    "  - {}:\n    URL: {}",
                    name,
                    self.branch_url(branch)
                ));
            }
            if !entries.is_empty() {
                body.push('\n');
                body.push_str(heading);
                body.push('\n');
                body.push_str(&entries.join("\n"));
                body.push('\n');
            }
        }
        body
    }

    /// The full message, headers included.
    pub fn render(&self, statuses: &BTreeMap<String, CombinedStatus>) -> String {
        format!(
            "From: {} <{}>\nTo: {}\nSubject: {}\n\n{}",
            self.sender_name,
            self.sender_email,
            self.recipient_email,
            self.subject(),
            self.body(statuses)
        )
    }

    pub fn show<W: io::Write>(
        &self,
        out: &mut W,
        statuses: &BTreeMap<String, CombinedStatus>,
    ) -> Result<(), JobError> {
        out.write_all(self.render(statuses).as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::BTreeMap as Map;

    use crate::status::combine;
    use crate::types::{CiProvider, Platform, Sha, Target, Task};

    fn job() -> Job {
        let target = Target::new(
            Sha::new("a".repeat(40)),
            Some("main".to_string()),
            Some("https://github.com/acme/pkg".to_string()),
            "1.0.0",
            None,
        );
        let mut tasks = Map::new();
        for (name, ci) in [
            ("docker", CiProvider::Circle),
            ("wheel", CiProvider::Travis),
        ] {
            let mut task = Task::new(Platform::Linux, ci, "ci.yml", vec![], Map::new());
            task.branch = Some(format!("build-0-{ci}-{name}"));
            tasks.insert(name.to_string(), task);
        }
        let mut job = Job::new(target, tasks).unwrap();
        job.branch = Some("build-0".to_string());
        job
    }

    fn status_of(state: CommitState) -> CombinedStatus {
        combine([state])
    }

    #[test]
    fn groups_tasks_by_outcome_in_fixed_order() {
        let job = job();
        let mut statuses = Map::new();
        statuses.insert("docker".to_string(), status_of(CommitState::Success));
        statuses.insert("wheel".to_string(), status_of(CommitState::Failure));

        let report = EmailReport::new(
            &job,
            "https://github.com/acme/queue.git",
            "Nightly Bot",
            "bot@acme.dev",
            "builds@acme.dev",
        );
        let message = report.render(&statuses);

        assert!(message.starts_with("From: Nightly Bot <bot@acme.dev>\n"));
        assert!(message.contains("To: builds@acme.dev\n"));
        assert!(message.contains("Subject: [NIGHTLY] Build report for job build-0\n"));
        assert!(message
            .contains("All tasks: https://github.com/acme/queue/branches/all?query=build-0"));

        let failed = message.find("Failed Tasks:").unwrap();
        let succeeded = message.find("Succeeded Tasks:").unwrap();
        assert!(failed < succeeded);
        assert!(message.contains(
            "  - wheel:\n    URL: https://github.com/acme/queue/branches/all?query=build-0-travis-wheel"
        ));
    }

    #[test]
    fn empty_sections_are_omitted() {
        let job = job();
        let mut statuses = Map::new();
        statuses.insert("docker".to_string(), status_of(CommitState::Success));
        statuses.insert("wheel".to_string(), status_of(CommitState::Success));

        let report = EmailReport::new(
            &job,
            "https://github.com/acme/queue",
            "Bot",
            "bot@acme.dev",
            "builds@acme.dev",
        );
        let message = report.render(&statuses);

        assert!(message.contains("Succeeded Tasks:"));
        assert!(!message.contains("Failed Tasks:"));
        assert!(!message.contains("Pending Tasks:"));
    }
}
