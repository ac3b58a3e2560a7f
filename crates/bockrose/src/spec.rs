//! bockrose specification parsing.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use miette::Diagnostic;
use serde::{Deserialize, Serialize};

/// bockrose specification (bockrose.yaml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectSpec {
    /// Specification version.
    #[serde(default = "default_version")]
    pub version: String,

    /// Project name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Services, by name.
    pub services: BTreeMap<String, ServiceSpec>,

    /// Base path (directory containing the project file).
    #[serde(skip)]
    pub base_path: PathBuf,
}

fn default_version() -> String {
    "1".to_string()
}

/// Service specification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceSpec {
    /// Program and arguments.
    pub command: Vec<String>,

    /// Environment variables.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub environment: HashMap<String, String>,

    /// Working directory, relative to the project file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,

    /// Restart policy.
    #[serde(default)]
    pub restart: RestartPolicy,

    /// Deploy configuration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deploy: Option<DeployConfig>,
}

impl ServiceSpec {
    /// Number of replicas to run.
    pub fn replicas(&self) -> u32 {
        self.deploy.as_ref().map_or(1, |d| d.replicas)
    }
}

/// Deploy configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployConfig {
    /// Number of replicas.
    #[serde(default = "default_replicas")]
    pub replicas: u32,
}

fn default_replicas() -> u32 {
    1
}

/// When a stopped container is started again.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RestartPolicy {
    /// Never restart.
    #[default]
    No,
    /// Always restart, whatever the exit code.
    Always,
    /// Restart on non-zero exit, optionally a bounded number of times.
    OnFailure {
        /// Maximum restarts, unbounded when `None`.
        max_retries: Option<u32>,
    },
}

impl RestartPolicy {
    /// Whether a container that exited with `exit_code` after `restarts`
    /// previous restarts should run again.
    pub fn should_restart(self, exit_code: i32, restarts: u32) -> bool {
        match self {
            Self::No => false,
            Self::Always => true,
            Self::OnFailure { max_retries } => {
                exit_code != 0 && max_retries.is_none_or(|max| restarts < max)
            }
        }
    }
}

impl FromStr for RestartPolicy {
    type Err = SpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || SpecError::Invalid {
            message: format!("invalid restart policy '{s}'"),
        };
        match s {
            "no" | "" => Ok(Self::No),
            "always" | "unless-stopped" => Ok(Self::Always),
            "on-failure" => Ok(Self::OnFailure { max_retries: None }),
            other => {
                let max = other.strip_prefix("on-failure:").ok_or_else(invalid)?;
                let max = max.parse().map_err(|_| invalid())?;
                Ok(Self::OnFailure {
                    max_retries: Some(max),
                })
            }
        }
    }
}

impl TryFrom<String> for RestartPolicy {
    type Error = SpecError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RestartPolicy> for String {
    fn from(policy: RestartPolicy) -> Self {
        policy.to_string()
    }
}

impl fmt::Display for RestartPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::No => f.write_str("no"),
            Self::Always => f.write_str("always"),
            Self::OnFailure { max_retries: None } => f.write_str("on-failure"),
            Self::OnFailure {
                max_retries: Some(max),
            } => write!(f, "on-failure:{max}"),
        }
    }
}

impl ProjectSpec {
    /// Parse from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self, SpecError> {
        let spec: Self = serde_yaml::from_str(yaml)?;
        spec.validate()?;
        Ok(spec)
    }

    /// Parse from file.
    pub fn from_file(path: &Path) -> Result<Self, SpecError> {
        let content = std::fs::read_to_string(path)?;
        let mut spec = Self::from_yaml(&content)?;
        spec.base_path = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(spec)
    }

    /// Check constraints serde cannot express.
    pub fn validate(&self) -> Result<(), SpecError> {
        if self.services.is_empty() {
            return Err(SpecError::Invalid {
                message: "no services defined".to_string(),
            });
        }
        for (name, service) in &self.services {
            if service.command.is_empty() {
                return Err(SpecError::Invalid {
                    message: format!("service '{name}' has an empty command"),
                });
            }
        }
        Ok(())
    }

    /// Get the project name.
    ///
    /// Falls back to the project file's directory, then to `default`.
    pub fn project_name(&self) -> String {
        let raw = self
            .name
            .clone()
            .or_else(|| {
                let base = if self.base_path.as_os_str().is_empty() {
                    Path::new(".")
                } else {
                    self.base_path.as_path()
                };
                std::fs::canonicalize(base)
                    .ok()
                    .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            })
            .unwrap_or_default();
        let name = normalize_project_name(&raw);
        if name.is_empty() {
            "default".to_string()
        } else {
            name
        }
    }
}

/// Lowercase, keeping only `[a-z0-9_-]`.
fn normalize_project_name(raw: &str) -> String {
    raw.to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}

/// bockrose specification parsing errors.
#[derive(Debug, thiserror::Error, Diagnostic)]
pub enum SpecError {
    /// I/O error.
    #[error("Failed to read bockrose.yaml: {0}")]
    #[diagnostic(code(bockrose::spec::io))]
    Io(#[from] std::io::Error),
    /// Parse error.
    #[error("Failed to parse bockrose.yaml: {0}")]
    #[diagnostic(code(bockrose::spec::parse))]
    Parse(#[from] serde_yaml::Error),
    /// Semantically invalid specification.
    #[error("Invalid bockrose.yaml: {message}")]
    #[diagnostic(
        code(bockrose::spec::invalid),
        help("Run `bockrose config` to check the project file")
    )]
    Invalid {
        /// What is wrong.
        message: String,
    },
}
