//! Infrastructure layer: I/O implementations and DI container
//!
//! This layer implements the registry and HTTP boundary traits, reads record
//! files, and wires up services.

pub mod csv_source;
pub mod di;
pub mod error;
pub mod registry;
pub mod traits;

pub use error::{InfraError, InfraResult, RegistryError, RegistryResult};
