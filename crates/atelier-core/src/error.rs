//! Unified error types for Atelier

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type for all Atelier operations
#[derive(Error, Debug)]
pub enum AtelierError {
    // Action errors (recovered per action, surfaced as failure results)
    #[error("Invalid action: {0}")]
    Validation(String),

    #[error("Out of range: {0}")]
    OutOfRange(String),

    #[error("Unknown action type: {0}")]
    UnknownAction(String),

    #[error("Preset not found: {0}")]
    PresetNotFound(String),

    // Session errors
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Proposal source error: {0}")]
    Proposal(String),

    // Configuration errors
    #[error("Config error: {0}")]
    Config(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(String),
}

impl AtelierError {
    /// Classify this error for an [`ActionResult`](crate::ActionResult)
    pub fn kind(&self) -> ActionErrorKind {
        match self {
            Self::Validation(_) | Self::Serialization(_) => ActionErrorKind::Validation,
            Self::OutOfRange(_) => ActionErrorKind::OutOfRange,
            Self::UnknownAction(_) => ActionErrorKind::UnknownAction,
            Self::PresetNotFound(_) => ActionErrorKind::PresetNotFound,
            _ => ActionErrorKind::Unexpected,
        }
    }
}

/// Error category carried by a failed action result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionErrorKind {
    Validation,
    OutOfRange,
    UnknownAction,
    PresetNotFound,
    Unexpected,
}

impl std::fmt::Display for ActionErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation => write!(f, "validation"),
            Self::OutOfRange => write!(f, "out_of_range"),
            Self::UnknownAction => write!(f, "unknown_action"),
            Self::PresetNotFound => write!(f, "preset_not_found"),
            Self::Unexpected => write!(f, "unexpected"),
        }
    }
}

/// Result type alias using AtelierError
pub type Result<T> = std::result::Result<T, AtelierError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            AtelierError::Validation("x".into()).kind(),
            ActionErrorKind::Validation
        );
        assert_eq!(
            AtelierError::OutOfRange("x".into()).kind(),
            ActionErrorKind::OutOfRange
        );
        assert_eq!(
            AtelierError::UnknownAction("x".into()).kind(),
            ActionErrorKind::UnknownAction
        );
        assert_eq!(
            AtelierError::PresetNotFound("x".into()).kind(),
            ActionErrorKind::PresetNotFound
        );
        assert_eq!(
            AtelierError::Other("x".into()).kind(),
            ActionErrorKind::Unexpected
        );
    }

    #[test]
    fn test_error_display() {
        let err = AtelierError::PresetNotFound("neon".to_string());
        assert_eq!(err.to_string(), "Preset not found: neon");
        assert_eq!(ActionErrorKind::OutOfRange.to_string(), "out_of_range");
    }
}
