//! The `.eclipserc` project marker and `component/environment` targets.

use std::path::Path;

use eclipse_common::file_notation::{Notation, NotationError, lenient};
use eclipse_common::NotationFile;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Name of the project marker file.
pub const PROJECT_FILE: &str = ".eclipserc";

const PROJECT_FILE_HEADER: &str = "Eclipse project configuration";

#[derive(Debug, Error)]
pub enum ProjectConfigError {
    #[error("You need to be on a project directory to use this command.")]
    NotLinked,

    #[error("The .eclipserc file in this directory is malformed: {0}")]
    Malformed(#[source] NotationError),

    #[error("Unable to write .eclipserc: {0}")]
    Write(#[source] NotationError),

    #[error(
        "Please specify a component and environment (component/environment), got {0:?}."
    )]
    InvalidTarget(String),
}

/// Contents of `.eclipserc`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProjectConfig {
    #[serde(rename = "PROJECT", deserialize_with = "lenient::string")]
    pub project: String,
    #[serde(
        rename = "COMPONENT",
        default,
        deserialize_with = "lenient::optional_string"
    )]
    pub component: Option<String>,
}

impl ProjectConfig {
    pub fn new(project: impl Into<String>, component: Option<String>) -> Self {
        Self {
            project: project.into(),
            component: component.filter(|c| !c.trim().is_empty()),
        }
    }

    fn file(dir: &Path) -> NotationFile {
        NotationFile::new(dir.join(PROJECT_FILE)).with_header(PROJECT_FILE_HEADER)
    }

    /// Read `.eclipserc` from `dir`, `None` when the file does not exist.
    pub fn load_from(dir: &Path) -> Result<Option<Self>, ProjectConfigError> {
        let file = Self::file(dir);
        if !file.find() {
            return Ok(None);
        }
        let config: Self = file.read_into().map_err(ProjectConfigError::Malformed)?;
        if config.project.trim().is_empty() {
            return Err(ProjectConfigError::Malformed(NotationError::NotARecord));
        }
        Ok(Some(config))
    }

    /// Like [`ProjectConfig::load_from`], but a missing file is an error.
    pub fn require_in(dir: &Path) -> Result<Self, ProjectConfigError> {
        Self::load_from(dir)?.ok_or(ProjectConfigError::NotLinked)
    }

    /// Write `.eclipserc` into `dir`, replacing any previous link.
    pub fn save_to(&self, dir: &Path) -> Result<(), ProjectConfigError> {
        let mut record = Notation::new();
        record.insert("PROJECT".to_string(), Value::String(self.project.clone()));
        if let Some(component) = &self.component {
            record.insert("COMPONENT".to_string(), Value::String(component.clone()));
        }
        Self::file(dir)
            .write(&record)
            .map_err(ProjectConfigError::Write)
    }
}

/// A `component/environment` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub component: String,
    pub environment: String,
}

impl Target {
    /// Parse `component/environment`, or a bare `environment` when the
    /// project config names a default component.
    pub fn resolve(raw: &str, project: &ProjectConfig) -> Result<Self, ProjectConfigError> {
        let invalid = || ProjectConfigError::InvalidTarget(raw.to_string());
        let raw = raw.trim();

        match raw.split_once('/') {
            Some((component, environment)) => {
                let (component, environment) = (component.trim(), environment.trim());
                if component.is_empty() || environment.is_empty() || environment.contains('/') {
                    return Err(invalid());
                }
                Ok(Self {
                    component: component.to_string(),
                    environment: environment.to_string(),
                })
            }
            None if !raw.is_empty() => match &project.component {
                Some(component) => Ok(Self {
                    component: component.clone(),
                    environment: raw.to_string(),
                }),
                None => Err(invalid()),
            },
            None => Err(invalid()),
        }
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.component, self.environment)
    }
}
