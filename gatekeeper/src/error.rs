//! Error types for gate, engine and session operations.
//!
//! Validation failures are never errors: they are returned as data in a
//! [`ValidationReport`](crate::validator::ValidationReport) and drive the
//! correction loop. The variants here are the failures that stop an operation.

use std::path::PathBuf;

use thiserror::Error;

use crate::feedback::state_machine::IllegalTransition;
use crate::feedback::AttemptRecord;
use crate::provider::ProviderError;

/// Result type alias for architect operations
pub type ArchitectResult<T> = Result<T, ArchitectError>;

/// Errors that terminate a create, edit or load operation.
#[derive(Debug, Error)]
pub enum ArchitectError {
    /// `edit` was requested before any component was created
    #[error("No component exists yet. Create one before requesting an edit.")]
    NoArtifact,

    /// The completion provider failed mid-run. Attempts completed before the
    /// failure are preserved so the trail is never discarded.
    #[error("Completion provider failed on attempt {attempt}: {source}")]
    Provider {
        attempt: u32,
        completed: Vec<AttemptRecord>,
        #[source]
        source: ProviderError,
    },

    /// Design system document is missing required sections or holds bad values
    #[error("Invalid design system: {message}")]
    InvalidDesignSystem { message: String },

    /// Engine or validator configuration is out of range
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// A file could not be read or written
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The run state machine rejected a transition
    #[error(transparent)]
    IllegalTransition(#[from] IllegalTransition),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ArchitectError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error was caused by caller input rather than the environment.
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::NoArtifact | Self::InvalidConfig { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_artifact_is_input_error() {
        assert!(ArchitectError::NoArtifact.is_input_error());
        let err = ArchitectError::InvalidDesignSystem {
            message: "missing tokens".into(),
        };
        assert!(!err.is_input_error());
    }

    #[test]
    fn test_provider_error_display_names_attempt() {
        let err = ArchitectError::Provider {
            attempt: 2,
            completed: Vec::new(),
            source: ProviderError::EmptyCompletion,
        };
        let msg = err.to_string();
        assert!(msg.contains("attempt 2"));
    }
}
