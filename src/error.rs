//! # Errors
//!
//! Failure taxonomy of the section and rule repositories. Every variant names
//! the offending id or display name; nothing is retried or recovered locally
//! except revision conflicts (see `RuleRepository`).

use dfw_paths::prelude::PathBuilderError;
use thiserror::Error;

use crate::transport::TransportError;

/// Kind of firewall object an error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Section,
    Rule,
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ObjectKind::Section => write!(f, "Section"),
            ObjectKind::Rule => write!(f, "Rule"),
        }
    }
}

#[derive(Debug, Error)]
pub enum DfwError {
    /// The store rejected section creation
    #[error("Error creating section {name} in NSX: {source}")]
    CreateError {
        name: String,
        #[source]
        source: TransportError,
    },

    #[error("{kind} with id {id} not found")]
    ObjectNotFound { kind: ObjectKind, id: String },

    /// The store acknowledged a write but the expected state is not observable
    #[error("Integrity error: {0}")]
    Integrity(String),

    /// A mutating call was not acknowledged
    #[error("Operation failed: {0}")]
    OperationFailed(String),

    /// The revision kept changing under us
    #[error("{kind} {id} was modified concurrently; gave up after {attempts} attempt(s)")]
    Conflict {
        kind: ObjectKind,
        id: String,
        attempts: u32,
    },

    #[error("Found {count} {kind}s named '{name}'")]
    DuplicateName {
        kind: ObjectKind,
        name: String,
        count: usize,
    },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Unexpected response shape: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid API path: {0}")]
    Path(#[from] PathBuilderError),
}

impl DfwError {
    pub(crate) fn not_found(kind: ObjectKind, id: impl Into<String>) -> Self {
        DfwError::ObjectNotFound {
            kind,
            id: id.into(),
        }
    }

    /// Whether this error came from a stale revision
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        match self {
            DfwError::Conflict { .. } => true,
            DfwError::Transport(err) => err.is_conflict(),
            _ => false,
        }
    }
}

pub type DfwResult<T> = Result<T, DfwError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_object() {
        let err = DfwError::not_found(ObjectKind::Section, "s-1");
        assert_eq!(err.to_string(), "Section with id s-1 not found");

        let err = DfwError::Conflict {
            kind: ObjectKind::Rule,
            id: "r-9".to_string(),
            attempts: 4,
        };
        assert!(err.to_string().contains("r-9"));
        assert!(err.is_conflict());

        let err = DfwError::DuplicateName {
            kind: ObjectKind::Rule,
            name: "web".to_string(),
            count: 2,
        };
        assert_eq!(err.to_string(), "Found 2 Rules named 'web'");
    }

    #[test]
    fn test_create_error_keeps_transport_cause() {
        let err = DfwError::CreateError {
            name: "OpenNebula".to_string(),
            source: TransportError::Status {
                status: 403,
                message: "forbidden".to_string(),
            },
        };
        assert_eq!(
            err.to_string(),
            "Error creating section OpenNebula in NSX: HTTP 403: forbidden"
        );
    }
}
