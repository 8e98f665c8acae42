//! Domain-level errors (no external dependencies)

use thiserror::Error;

use crate::domain::entities::Level;

/// Domain errors represent violations of the hierarchy's shape.
/// These are independent of infrastructure concerns.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("malformed input at record {position}: {level} {reason}")]
    MalformedInput {
        /// Position of the offending record (line number for file sources)
        position: usize,
        level: Level,
        reason: String,
    },
}

impl DomainError {
    pub fn malformed(position: usize, level: Level, reason: impl Into<String>) -> Self {
        Self::MalformedInput {
            position,
            level,
            reason: reason.into(),
        }
    }
}
