use std::path::PathBuf;
use thiserror::Error;

use crate::config::schema::SchemaId;
use crate::extension::{ExtensionId, ExtensionState, HookPhase};
use crate::modules::ModuleId;

/// Errors raised while constructing, migrating or persisting a config record.
///
/// Cloneable so a single failed construction can be handed to every caller
/// that was waiting on it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing collaborator: {0}")]
    MissingCollaborator(String),

    #[error("Malformed configuration '{}': {message}", path.display())]
    MalformedConfiguration { path: PathBuf, message: String },

    #[error("Migration of {schema} to version {version} failed: {message}")]
    MigrationFailure {
        schema: SchemaId,
        version: u32,
        message: String,
    },

    #[error("I/O error on '{}': {message}", path.display())]
    Io { path: PathBuf, message: String },

    #[error("Failed to encode config {schema}: {message}")]
    Encoding { schema: SchemaId, message: String },

    #[error("Config {schema} does not hold a value of type {expected}")]
    TypeMismatch {
        schema: SchemaId,
        expected: &'static str,
    },

    #[error("Config {schema} panicked during {stage}: {message}")]
    Panicked {
        schema: SchemaId,
        stage: &'static str,
        message: String,
    },

    #[error("Config not cached: {0}")]
    NotCached(SchemaId),

    #[error("Config cache is closed")]
    CacheClosed,
}

impl ConfigError {
    pub(crate) fn io(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        ConfigError::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Best-effort text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Errors raised by a single extension's lifecycle.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtensionError {
    #[error("{extension} {phase} hook failed ({message})")]
    HookFailure {
        extension: ExtensionId,
        phase: HookPhase,
        message: String,
    },

    #[error("Extension {extension} cannot {action} while {state}")]
    InvalidTransition {
        extension: ExtensionId,
        action: &'static str,
        state: ExtensionState,
    },

    #[error("Extension {extension} skipped: dependency {dependency} is {reason}")]
    DependencyUnavailable {
        extension: ExtensionId,
        dependency: ExtensionId,
        reason: String,
    },

    #[error("Extension {extension} skipped: owning module {module} is not registered")]
    MissingModule {
        extension: ExtensionId,
        module: ModuleId,
    },
}

impl ExtensionError {
    /// The extension this error is about.
    pub fn extension(&self) -> &ExtensionId {
        match self {
            ExtensionError::HookFailure { extension, .. }
            | ExtensionError::InvalidTransition { extension, .. }
            | ExtensionError::DependencyUnavailable { extension, .. }
            | ExtensionError::MissingModule { extension, .. } => extension,
        }
    }
}
