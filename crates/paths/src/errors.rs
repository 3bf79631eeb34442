//! Error types for PathBuilder

use std::fmt;

/// Errors that can occur during path construction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathBuilderError {
    /// No operation was selected
    MissingOperation,

    /// Required parameter is missing
    MissingRequiredParameter(&'static str),

    /// A path segment would change the shape of the path (empty, or contains '/' or '?')
    InvalidSegment(String),
}

impl fmt::Display for PathBuilderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathBuilderError::MissingOperation => write!(f, "No operation selected"),
            PathBuilderError::MissingRequiredParameter(param) => {
                write!(f, "Missing required parameter: {param}")
            }
            PathBuilderError::InvalidSegment(segment) => {
                write!(f, "Invalid path segment: {segment:?}")
            }
        }
    }
}

impl std::error::Error for PathBuilderError {}
