//! esgrid.toml configuration parser.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Ports every node consumes: one for the HTTP API, one for transport.
pub const REQUIRED_PORTS: usize = 2;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub framework: FrameworkConfig,
    pub cluster: ClusterConfig,
    pub resources: NodeResourcesConfig,
    pub state: StateConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameworkConfig {
    /// Framework name, also the namespace under which state is stored.
    pub name: String,
    /// Only resources reserved for this role are consumed.
    pub role: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Target number of search nodes.
    pub nodes: usize,
}

/// Resources consumed by each node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeResourcesConfig {
    pub cpus: f64,
    /// MB.
    pub mem: f64,
    /// MB.
    pub disk: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    pub data_dir: PathBuf,
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("framework name must not be empty")]
    EmptyFrameworkName,

    #[error("invalid {resource} requirement: {value}")]
    InvalidResource { resource: &'static str, value: f64 },
}

impl Default for FrameworkConfig {
    fn default() -> Self {
        Self {
            name: "elasticsearch".to_string(),
            role: "*".to_string(),
        }
    }
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self { nodes: 3 }
    }
}

impl Default for NodeResourcesConfig {
    fn default() -> Self {
        Self {
            cpus: 0.2,
            mem: 256.0,
            disk: 250.0,
        }
    }
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("/var/lib/esgrid"),
        }
    }
}

impl SchedulerConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: SchedulerConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.framework.name.is_empty() {
            return Err(ConfigError::EmptyFrameworkName);
        }
        for (resource, value) in [
            ("cpus", self.resources.cpus),
            ("mem", self.resources.mem),
            ("disk", self.resources.disk),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidResource { resource, value });
            }
        }
        Ok(())
    }

    pub fn framework_role(&self) -> &str {
        &self.framework.role
    }

    pub fn target_nodes(&self) -> usize {
        self.cluster.nodes
    }

    /// Path of the redb file holding scheduler state.
    pub fn state_db_path(&self) -> PathBuf {
        self.state.data_dir.join("esgrid.redb")
    }
}
