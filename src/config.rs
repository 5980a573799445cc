//! The task configuration file (`tasks.yml`).
//!
//! Declares the named tasks a project can build and optional groups that
//! bundle them for submission.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::types::{CiProvider, Platform};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file `{path}`: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file `{path}`: {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}

/// One task declaration from the configuration file.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskConfig {
    pub platform: Platform,
    pub ci: CiProvider,
    pub template: String,
    #[serde(default)]
    pub artifacts: Vec<String>,
    #[serde(default)]
    pub params: BTreeMap<String, serde_yaml::Value>,
}

/// The whole configuration file: groups of task names plus the task
/// definitions themselves.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TasksConfig {
    #[serde(default)]
    pub groups: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub tasks: BTreeMap<String, TaskConfig>,
}

impl TasksConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_yaml::from_str(&contents).map_err(|source| ConfigError::Yaml {
            path: path.display().to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXAMPLE: &str = r#"
groups:
  quick:
    - wheel-linux
    - wheel-osx

tasks:
  wheel-linux:
    platform: linux
    ci: travis
    template: travis.linux.yml
    artifacts:
      - pkg-{version}-linux\.whl
    params:
      python: "3.12"
  wheel-osx:
    platform: osx
    ci: travis
    template: travis.osx.yml
  installer-win:
    platform: win
    ci: appveyor
    template: appveyor.yml
"#;

    #[test]
    fn parses_groups_and_tasks() {
        let config: TasksConfig = serde_yaml::from_str(EXAMPLE).unwrap();
        assert_eq!(config.groups["quick"], vec!["wheel-linux", "wheel-osx"]);
        assert_eq!(config.tasks.len(), 3);
        let linux = &config.tasks["wheel-linux"];
        assert_eq!(linux.ci, CiProvider::Travis);
        assert_eq!(linux.artifacts, vec![r"pkg-{version}-linux\.whl"]);
        assert!(config.tasks["wheel-osx"].artifacts.is_empty());
    }

    #[test]
    fn missing_groups_section_defaults_to_empty() {
        let config: TasksConfig =
            serde_yaml::from_str("tasks:\n  t:\n    platform: linux\n    ci: circle\n    template: x.yml\n")
                .unwrap();
        assert!(config.groups.is_empty());
    }

    #[test]
    fn load_reports_missing_file() {
        let err = TasksConfig::load(Path::new("/nonexistent/tasks.yml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
