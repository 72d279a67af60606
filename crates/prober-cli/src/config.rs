//! Probe file loading
//!
//! A probe file names the target, the engine options and the list of probes
//! to run. Files ending in `.yaml` or `.yml` are read as YAML, anything else
//! as JSON.

use prober_core::engine::{LocalProcessExecutor, ProberOptions, DEFAULT_EXEC_TIMEOUT};
use prober_core::{Probe, TargetContext};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors raised while loading a probe file
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Probe file could not be read
    #[error("failed to read probe file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid YAML probe file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid JSON probe file: {0}")]
    Json(#[from] serde_json::Error),

    /// Parsed file violates a constraint
    #[error("invalid probe file: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        ConfigError::Invalid(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Contents of a probe file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProberConfig {
    #[serde(default)]
    pub options: ProberOptions,

    /// Settings for the local exec runner
    #[serde(default)]
    pub exec: ExecConfig,

    #[serde(default)]
    pub target: TargetContext,

    /// Probes run in order
    #[serde(default)]
    pub probes: Vec<Probe>,
}

impl ProberConfig {
    /// Load and validate a probe file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let is_yaml = matches!(
            path.extension().and_then(|ext| ext.to_str()),
            Some("yaml") | Some("yml")
        );
        let config = if is_yaml {
            Self::from_yaml(&content)?
        } else {
            Self::from_json(&content)?
        };

        tracing::debug!(path = %path.display(), probes = config.probes.len(), "Loaded probe file");
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.probes.is_empty() {
            return Err(ConfigError::invalid("at least one probe is required"));
        }
        if self.exec.timeout_seconds == 0 {
            return Err(ConfigError::invalid(
                "exec.timeoutSeconds must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// Local exec runner settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecConfig {
    #[serde(default = "default_exec_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Extra environment for every exec probe
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

fn default_exec_timeout_seconds() -> u64 {
    DEFAULT_EXEC_TIMEOUT.as_secs()
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_exec_timeout_seconds(),
            env: BTreeMap::new(),
        }
    }
}

impl ExecConfig {
    pub fn executor(&self) -> LocalProcessExecutor {
        LocalProcessExecutor::new()
            .with_timeout(Duration::from_secs(self.timeout_seconds))
            .with_envs(self.env.clone())
    }
}
