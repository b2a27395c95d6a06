//! Host settings file.
//!
//! ```yaml
//! data_dir: /var/lib/orrery
//! log_level: debug
//! format: yaml
//! extensions:
//!   heartbeat: false
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::format::{JsonFormat, TreeFormat, YamlFormat};
use crate::extension::ExtensionId;
use crate::logging::{self, DEFAULT_LOG_LEVEL};
use crate::modules::ModuleId;

/// Errors loading the host settings file
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Failed to read settings '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid settings '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid log level '{0}'")]
    InvalidLogLevel(String),
}

/// On-disk encoding for module config files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatKind {
    #[default]
    Yaml,
    Json,
}

impl FormatKind {
    pub fn tree_format(&self) -> Arc<dyn TreeFormat> {
        match self {
            FormatKind::Yaml => Arc::new(YamlFormat),
            FormatKind::Json => Arc::new(JsonFormat),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostSettings {
    /// Root under which every module gets its own data directory
    pub data_dir: PathBuf,
    pub log_level: String,
    pub format: FormatKind,
    /// Per-extension switches; extensions not listed are enabled
    pub extensions: BTreeMap<String, bool>,
}

impl Default for HostSettings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            format: FormatKind::default(),
            extensions: BTreeMap::new(),
        }
    }
}

impl HostSettings {
    /// Read and validate a settings file.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let text = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut settings: HostSettings = if text.trim().is_empty() {
            HostSettings::default()
        } else {
            serde_yaml::from_str(&text).map_err(|source| SettingsError::Parse {
                path: path.to_path_buf(),
                source,
            })?
        };
        let level = settings.log_level.clone();
        settings.set_log_level(&level)?;
        Ok(settings)
    }

    /// Set the level after normalizing it.
    pub fn set_log_level(&mut self, level: &str) -> Result<(), SettingsError> {
        let normalized = logging::parse_level(level)
            .ok_or_else(|| SettingsError::InvalidLogLevel(level.to_string()))?;
        self.log_level = normalized.to_string();
        Ok(())
    }

    pub fn is_enabled(&self, id: &ExtensionId) -> bool {
        self.extensions.get(id.as_str()).copied().unwrap_or(true)
    }

    /// `<data_dir>/<module id>`
    pub fn module_dir(&self, module: &ModuleId) -> PathBuf {
        self.data_dir.join(module.as_str())
    }
}
