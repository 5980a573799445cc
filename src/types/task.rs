//! A single CI build: template, provider, artifacts, and remote state.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use minijinja::{Environment, UndefinedBehavior, Value};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::git::FileTree;
use crate::github::{Asset, StatusClient};
use crate::status::CombinedStatus;
use crate::types::{JobError, Sha};

/// Build platform a task targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Win,
    Osx,
    Linux,
}

/// CI provider a task runs on. Each provider only reacts to its own
/// configuration file, which is what keeps one branch per task honest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CiProvider {
    Circle,
    Travis,
    Appveyor,
    Azure,
}

impl CiProvider {
    /// The path, relative to the repository root, where this provider looks
    /// for its configuration.
    pub fn config_filename(&self) -> &'static str {
        match self {
            CiProvider::Circle => ".circleci/config.yml",
            CiProvider::Travis => ".travis.yml",
            CiProvider::Appveyor => "appveyor.yml",
            CiProvider::Azure => "azure-pipelines.yml",
        }
    }
}

impl fmt::Display for CiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CiProvider::Circle => "circle",
            CiProvider::Travis => "travis",
            CiProvider::Appveyor => "appveyor",
            CiProvider::Azure => "azure",
        };
        f.write_str(name)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Platform::Win => "win",
            Platform::Osx => "osx",
            Platform::Linux => "linux",
        };
        f.write_str(name)
    }
}

/// One build within a job.
///
/// `branch` and `commit` are `None` until the owning job is submitted; the
/// status cache never survives serialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub platform: Platform,
    pub ci: CiProvider,
    pub template: String,
    #[serde(default)]
    pub artifacts: Vec<String>,
    #[serde(default)]
    pub params: BTreeMap<String, serde_yaml::Value>,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub commit: Option<Sha>,
    #[serde(skip)]
    status_cache: Option<CombinedStatus>,
}

impl Task {
    pub fn new(
        platform: Platform,
        ci: CiProvider,
        template: impl Into<String>,
        artifacts: Vec<String>,
        params: BTreeMap<String, serde_yaml::Value>,
    ) -> Self {
        Task {
            platform,
            ci,
            template: template.into(),
            artifacts,
            params,
            branch: None,
            commit: None,
            status_cache: None,
        }
    }

    /// The release tag this task's artifacts are published under; equals the
    /// task branch name once submitted.
    pub fn tag(&self) -> Option<&str> {
        self.branch.as_deref()
    }

    fn branch_label(&self) -> String {
        self.branch
            .clone()
            .unwrap_or_else(|| "<unsubmitted>".to_string())
    }

    /// Renders this task's CI configuration and assembles the full file tree
    /// for its branch: the CI-skip scaffolding with the rendered provider
    /// config layered on top.
    ///
    /// Undefined template variables are a hard error, not empty output.
    pub fn render_files(
        &self,
        template_root: &Path,
        default_tree: &FileTree,
        extra_params: &BTreeMap<String, Value>,
    ) -> Result<FileTree, JobError> {
        let template_path = template_root.join(&self.template);
        let source = std::fs::read_to_string(&template_path).map_err(|source| {
            JobError::TemplateIo {
                template: self.template.clone(),
                source,
            }
        })?;

        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);

        let mut ctx: BTreeMap<String, Value> = self
            .params
            .iter()
            .map(|(k, v)| (k.clone(), Value::from_serialize(v)))
            .collect();
        for (k, v) in extra_params {
            ctx.insert(k.clone(), v.clone());
        }
        ctx.insert("task".to_string(), Value::from_serialize(self));

        let rendered = env
            .render_str(&source, &ctx)
            .map_err(|source| JobError::Template {
                template: self.template.clone(),
                source,
            })?;

        let mut files = default_tree.clone();
        files.insert(self.ci.config_filename(), rendered.into_bytes());
        Ok(files)
    }

    /// Queries the combined CI status of this task's branch head.
    ///
    /// The first successful answer is cached; pass `force_query` to bypass
    /// the cache during polling.
    pub async fn status(
        &mut self,
        client: &dyn StatusClient,
        force_query: bool,
    ) -> Result<CombinedStatus, JobError> {
        if !force_query {
            if let Some(cached) = self.status_cache {
                return Ok(cached);
            }
        }
        let commit = self.commit.as_ref().ok_or_else(|| JobError::NotSubmitted {
            task: self.branch_label(),
        })?;
        let status = client.combined_status(commit).await?;
        self.status_cache = Some(status);
        Ok(status)
    }

    pub(crate) fn set_status_cache(&mut self, status: CombinedStatus) {
        self.status_cache = Some(status);
    }

    /// Matches each artifact pattern against the uploaded release assets.
    ///
    /// Every declared pattern gets an entry; `None` means nothing uploaded
    /// matched it yet. A pattern matching several assets is an error because
    /// the report and the downloader both need a unique file per pattern.
    pub async fn assets(
        &self,
        client: &dyn StatusClient,
    ) -> Result<BTreeMap<String, Option<Asset>>, JobError> {
        let tag = self.tag().ok_or_else(|| JobError::NotSubmitted {
            task: self.branch_label(),
        })?;
        let uploaded = client.release_assets(tag).await?;

        let mut resolved = BTreeMap::new();
        for pattern in &self.artifacts {
            let re = Regex::new(&format!("^(?:{pattern})$")).map_err(|source| {
                JobError::BadPattern {
                    pattern: pattern.clone(),
                    source,
                }
            })?;
            let matches: Vec<&Asset> = uploaded
                .values()
                .filter(|a| re.is_match(&a.name))
                .collect();
            match matches.as_slice() {
                [] => {
                    resolved.insert(pattern.clone(), None);
                }
                [single] => {
                    resolved.insert(pattern.clone(), Some((*single).clone()));
                }
                many => {
                    return Err(JobError::AmbiguousArtifact {
                        pattern: pattern.clone(),
                        matches: many.iter().map(|a| a.name.clone()).collect(),
                    });
                }
            }
        }
        Ok(resolved)
    }
}
