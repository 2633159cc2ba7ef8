//! Typed errors raised while applying update operations.
//!
//! Engine functions return `anyhow::Result`; these types are wrapped with
//! [`anyhow::Error::new`] so callers can recover them with `downcast_ref`.

use std::fmt;

/// Fatal conditions that abort an update request.
#[derive(Debug)]
pub enum UpdateError {
    /// DROP or CLEAR named a graph the store does not contain.
    GraphNotFound { graph: String },
    /// CREATE named a graph the store already contains.
    GraphAlreadyExists { graph: String },
    /// LOAD could not retrieve or parse its source document.
    LoaderFailure {
        source: String,
        cause: anyhow::Error,
    },
    /// The operation object is malformed, e.g. a DROP without any target.
    InternalInvariantViolation { message: String },
}

impl UpdateError {
    pub fn graph_not_found(graph: impl fmt::Display) -> Self {
        UpdateError::GraphNotFound {
            graph: graph.to_string(),
        }
    }

    pub fn graph_already_exists(graph: impl fmt::Display) -> Self {
        UpdateError::GraphAlreadyExists {
            graph: graph.to_string(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        UpdateError::InternalInvariantViolation {
            message: message.into(),
        }
    }
}

impl fmt::Display for UpdateError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            UpdateError::GraphNotFound { graph } => write!(f, "No such graph: {}", graph),
            UpdateError::GraphAlreadyExists { graph } => {
                write!(f, "Graph store already contains graph: {}", graph)
            }
            UpdateError::LoaderFailure { source, cause } => {
                write!(f, "Failed to load {}: {}", source, cause)
            }
            UpdateError::InternalInvariantViolation { message } => {
                write!(f, "Internal error: {}", message)
            }
        }
    }
}

impl std::error::Error for UpdateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            UpdateError::LoaderFailure { cause, .. } => Some(&**cause),
            _ => None,
        }
    }
}

// OfflineRetrieval error

#[derive(Debug)]
pub struct OfflineRetrievalError {
    pub file: String,
}

impl fmt::Display for OfflineRetrievalError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Refusing to fetch {} in offline mode", self.file)
    }
}

impl std::error::Error for OfflineRetrievalError {}
