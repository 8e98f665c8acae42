//! Application-level errors (wraps domain and registry errors)

use thiserror::Error;

use crate::domain::DomainError;
use crate::infrastructure::RegistryError;

/// Application errors wrap domain errors and add application-level context.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApplicationError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("{0}")]
    Registry(#[from] RegistryError),

    #[error("config error: {message}")]
    Config { message: String },
}

/// Result type for application layer operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
