//! Command line interface.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};

use crate::config::TasksConfig;
use crate::git::Repository;
use crate::github::GithubClient;
use crate::queue::Queue;
use crate::report::{ConsoleReport, EmailReport};
use crate::types::{Job, Sha, Target, TargetOverrides};

#[derive(Debug, Parser)]
#[command(name = "convoy", about = "Queue CI builds on a git repository", version)]
pub struct Cli {
    /// Token used for GitHub API calls and authenticated pushes.
    #[arg(long, env = "CONVOY_GITHUB_TOKEN", hide_env_values = true)]
    github_token: String,

    /// Path to the source repository the builds run against.
    #[arg(long, default_value = ".")]
    src_path: PathBuf,

    /// Path to the local clone of the queue repository.
    #[arg(long)]
    queue_path: PathBuf,

    /// Remote URL of the queue, overriding the clone's origin.
    #[arg(long)]
    queue_remote: Option<String>,

    /// Write command output to a file instead of stdout.
    #[arg(long)]
    output_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Render, commit and push a new job to the queue.
    Submit {
        /// Task names to build.
        tasks: Vec<String>,

        /// Task groups to build, as defined in the configuration file.
        #[arg(short = 'g', long = "group")]
        groups: Vec<String>,

        /// Prefix for the job's sequential identifier.
        #[arg(long, default_value = "build")]
        job_prefix: String,

        /// Task configuration file, relative to the source repository.
        #[arg(long, default_value = "tasks.yml")]
        config_path: PathBuf,

        /// Override the version detected from the source repository.
        #[arg(long)]
        version: Option<String>,

        /// Override the detected source remote URL.
        #[arg(long)]
        remote: Option<String>,

        /// Override the detected source branch.
        #[arg(long)]
        branch: Option<String>,

        /// Override the detected source head commit.
        #[arg(long)]
        head: Option<String>,

        /// Render and commit locally but do not push.
        #[arg(long)]
        dry_run: bool,
    },

    /// Show the build status of a submitted job.
    Status {
        /// Job identifier, e.g. `build-42`.
        job_name: String,
    },

    /// Show the identifier of the newest job with the given prefix.
    LatestPrefix { prefix: String },

    /// Render an email report for a job, optionally waiting for it to
    /// finish first.
    Report {
        job_name: String,

        #[arg(long, default_value = "Convoy")]
        sender_name: String,

        #[arg(long)]
        sender_email: String,

        #[arg(long, env = "CONVOY_EMAIL")]
        recipient_email: String,

        /// Poll until every task reaches a terminal state.
        #[arg(long)]
        poll: bool,

        #[arg(long, default_value_t = 180)]
        poll_max_minutes: u64,

        #[arg(long, default_value_t = 10)]
        poll_interval_minutes: u64,
    },

    /// Download a job's uploaded artifacts.
    DownloadArtifacts {
        job_name: String,

        /// Directory the artifacts are written into, one subdirectory per
        /// task.
        #[arg(long, default_value = "packages")]
        target_dir: PathBuf,
    },

    /// Replace the release for a tag with assets matching glob patterns.
    ///
    /// This is what CI builds invoke to publish their artifacts.
    UploadArtifacts {
        #[arg(long)]
        tag: String,

        /// Commit the release tag points at.
        #[arg(long)]
        sha: String,

        #[arg(short = 'p', long = "pattern")]
        patterns: Vec<String>,
    },
}

fn github_client(queue: &Queue, token: &str) -> anyhow::Result<GithubClient> {
    let url = queue
        .remote_url()?
        .context("the queue repository has no remote URL configured")?;
    Ok(GithubClient::new(&url, token)?)
}

fn output_stream(path: Option<&Path>) -> anyhow::Result<Box<dyn Write>> {
    match path {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("cannot create output file {}", path.display()))?;
            Ok(Box::new(file))
        }
        None => Ok(Box::new(std::io::stdout())),
    }
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut repo = Repository::open(&cli.queue_path)
        .with_context(|| format!("cannot open queue repository at {}", cli.queue_path.display()))?
        .with_token(&cli.github_token)
        .require_https();
    if let Some(remote) = &cli.queue_remote {
        repo = repo.with_remote_url(remote);
    }
    let mut queue = Queue::new(repo);
    let mut out = output_stream(cli.output_file.as_deref())?;

    match cli.command {
        Command::Submit {
            tasks,
            groups,
            job_prefix,
            config_path,
            version,
            remote,
            branch,
            head,
            dry_run,
        } => {
            let config_path = cli.src_path.join(&config_path);
            let config = TasksConfig::load(&config_path)?;
            let template_root = config_path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| cli.src_path.clone());

            let src = Repository::open(&cli.src_path).with_context(|| {
                format!("cannot open source repository at {}", cli.src_path.display())
            })?;
            let target = Target::from_repository(
                &src,
                TargetOverrides {
                    head,
                    branch,
                    remote,
                    version,
                    email: None,
                },
            )?;

            let mut job = Job::from_config(&config, target, &tasks, &groups)?;

            queue.fetch()?;
            let name = queue.put(&mut job, &job_prefix, &template_root)?;
            if dry_run {
                tracing::info!(job = name.as_str(), "dry run, not pushing");
            } else {
                queue.push()?;
            }

            writeln!(out, "{}", job.to_yaml()?)?;
            writeln!(out, "Pushed job identifier is: `{}`", name)?;
        }

        Command::Status { job_name } => {
            queue.fetch()?;
            let job = queue.get(&job_name)?;
            let client = github_client(&queue, &cli.github_token)?;
            ConsoleReport::new(&job).show(&mut out, &client, None).await?;
        }

        Command::LatestPrefix { prefix } => {
            queue.fetch()?;
            let job = queue.latest_for_prefix(&prefix)?;
            let name = job
                .branch
                .context("the stored job descriptor has no branch name")?;
            writeln!(out, "{}", name)?;
        }

        Command::Report {
            job_name,
            sender_name,
            sender_email,
            recipient_email,
            poll,
            poll_max_minutes,
            poll_interval_minutes,
        } => {
            queue.fetch()?;
            let mut job = queue.get(&job_name)?;
            let client = github_client(&queue, &cli.github_token)?;
            if poll {
                job.wait_until_finished(&client, poll_max_minutes, poll_interval_minutes)
                    .await?;
            }
            let statuses = job.query_statuses(&client).await?;
            let remote_url = queue
                .remote_url()?
                .context("the queue repository has no remote URL configured")?;
            EmailReport::new(&job, remote_url, sender_name, sender_email, recipient_email)
                .show(&mut out, &statuses)?;
        }

        Command::DownloadArtifacts {
            job_name,
            target_dir,
        } => {
            queue.fetch()?;
            let job = queue.get(&job_name)?;
            let client = github_client(&queue, &cli.github_token)?;
            // One directory per job, one subdirectory per task.
            let job_dir = target_dir.join(&job_name);
            std::fs::create_dir_all(&job_dir)?;
            ConsoleReport::new(&job)
                .show(&mut out, &client, Some(&job_dir))
                .await?;
        }

        Command::UploadArtifacts { tag, sha, patterns } => {
            let client = github_client(&queue, &cli.github_token)?;
            let sha = Sha::parse(&sha).map_err(|e| anyhow::anyhow!("invalid --sha: {}", e))?;
            client
                .overwrite_release_assets(&tag, &sha, &patterns)
                .await?;
            writeln!(out, "uploaded assets for tag `{}`", tag)?;
        }
    }

    Ok(())
}
