//! Infrastructure-level errors (wraps application errors)

use std::path::PathBuf;

use thiserror::Error;

use crate::application::ApplicationError;

/// Failures talking to the organization registry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Transport failure, non-2xx status, or an unusable response body.
    #[error("registry unavailable during {operation}: {reason}")]
    Unavailable {
        operation: &'static str,
        reason: String,
    },

    /// The registry rejected the bearer token. Recovered inside the client by
    /// one refresh and one retry; never escapes it.
    #[error("registry rejected the access token during {operation}")]
    AuthExpired { operation: &'static str },
}

impl RegistryError {
    pub fn unavailable(operation: &'static str, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            operation,
            reason: reason.into(),
        }
    }
}

/// Result type for registry calls.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Infrastructure errors wrap application errors and add I/O-level concerns.
#[derive(Error, Debug)]
pub enum InfraError {
    #[error("{0}")]
    Application(#[from] ApplicationError),

    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot read records from {path}: {message}")]
    Csv { path: PathBuf, message: String },
}

impl InfraError {
    /// Create an I/O error with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    pub fn csv(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Csv {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result type for infrastructure layer operations.
pub type InfraResult<T> = Result<T, InfraError>;
