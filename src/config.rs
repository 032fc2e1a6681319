//! Runtime configuration
//!
//! Values come from an optional YAML file; command line flags override them
//! and built-in defaults fill whatever is left.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::reconcile::{MatchStyle, DEFAULT_ANOMALY_LOG};

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_DATABASE: &str = "aidlink.db";
pub const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: Option<String>,
    pub port: Option<u16>,
    pub cors_origin: Option<String>,
    pub log_level: Option<String>,
    pub anomaly_log: Option<PathBuf>,
    /// Falls back to the style suited to the connected backend
    pub match_style: Option<MatchStyle>,
}

impl AppConfig {
    pub fn from_yaml(source: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str(source)?)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let source = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read config {}: {}", path.display(), e))?;
        Self::from_yaml(&source)
    }

    /// Reads `path` when given, otherwise starts from the defaults
    pub fn load_optional(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Fields set in `overrides` replace the ones loaded from file
    pub fn merge(mut self, overrides: AppConfig) -> Self {
        if overrides.database.is_some() {
            self.database = overrides.database;
        }
        if overrides.port.is_some() {
            self.port = overrides.port;
        }
        if overrides.cors_origin.is_some() {
            self.cors_origin = overrides.cors_origin;
        }
        if overrides.log_level.is_some() {
            self.log_level = overrides.log_level;
        }
        if overrides.anomaly_log.is_some() {
            self.anomaly_log = overrides.anomaly_log;
        }
        if overrides.match_style.is_some() {
            self.match_style = overrides.match_style;
        }
        self
    }

    pub fn database(&self) -> &str {
        self.database.as_deref().unwrap_or(DEFAULT_DATABASE)
    }

    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }

    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    pub fn anomaly_log(&self) -> PathBuf {
        self.anomaly_log
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_ANOMALY_LOG))
    }
}
