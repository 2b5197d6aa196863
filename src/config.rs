//! Studio Configuration
//!
//! Configuration can be loaded from:
//! - Default values
//! - Config file (~/.config/topology-studio/config.toml)
//! - Environment variables (TOPOLOGY_API_URL, TOPOLOGY_NAMESPACE, TOPOLOGY_SNAPSHOT_FILE)

use crate::provider::PollInterval;
use crate::theme::ThemeChoice;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_API_URL: &str = "TOPOLOGY_API_URL";
pub const ENV_NAMESPACE: &str = "TOPOLOGY_NAMESPACE";
pub const ENV_SNAPSHOT_FILE: &str = "TOPOLOGY_SNAPSHOT_FILE";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to access config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudioConfig {
    /// Base URL of the topology service
    pub api_url: String,

    /// Limit the view to one namespace
    pub namespace: Option<String>,

    pub poll_interval: PollInterval,

    pub theme: ThemeChoice,

    pub request_timeout_secs: u64,

    /// Read this JSON snapshot instead of calling the service
    pub snapshot_file: Option<PathBuf>,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8080/api/v1".to_string(),
            namespace: None,
            poll_interval: PollInterval::default(),
            theme: ThemeChoice::default(),
            request_timeout_secs: 15,
            snapshot_file: None,
        }
    }
}

impl StudioConfig {
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("topology-studio/config.toml"))
            .unwrap_or_else(|| PathBuf::from("topology-studio.toml"))
    }

    /// Load from the default path with env overrides, falling back to defaults
    pub fn load() -> Self {
        Self::load_saved().with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Load only what is on disk. This is the copy to edit and `save`.
    pub fn load_saved() -> Self {
        let path = Self::config_path();
        if path.exists() {
            match Self::load_from(&path) {
                Ok(config) => {
                    log::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    log::warn!("Ignoring unreadable config {}: {}", path.display(), e);
                    Self::default()
                }
            }
        } else {
            Self::default()
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Apply overrides from `lookup` (normally the process environment)
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.trim().is_empty()) {
            self.api_url = url.trim().to_string();
        }
        if let Some(ns) = lookup(ENV_NAMESPACE) {
            let ns = ns.trim();
            self.namespace = (!ns.is_empty()).then(|| ns.to_string());
        }
        if let Some(file) = lookup(ENV_SNAPSHOT_FILE).filter(|v| !v.trim().is_empty()) {
            self.snapshot_file = Some(PathBuf::from(file.trim()));
        }
    }

    /// Effective settings for this run; `self` stays as persisted
    pub fn with_env_overrides(&self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut effective = self.clone();
        effective.apply_env_overrides(lookup);
        effective
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}
