//! Error types for extension orchestration

use crate::errors::ExtensionError;
use crate::extension::ExtensionId;

/// Errors that can occur while ordering or driving a batch of extensions
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrchestratorError {
    #[error("Dependency cycle: {0}")]
    DependencyCycle(String),

    #[error("Extension already registered: {0}")]
    DuplicateExtension(ExtensionId),

    #[error("Extension not found: {0}")]
    ExtensionNotFound(ExtensionId),

    #[error("{} extension(s) failed to unload: {}", .0.len(), join_errors(.0))]
    Shutdown(Vec<ExtensionError>),
}

fn join_errors(errors: &[ExtensionError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
