//! Domain layer: entities and hierarchy logic
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod arena;
pub mod builder;
pub mod entities;
pub mod error;

pub use arena::{NodeData, NodeView, OrgForest, OrgNode};
pub use builder::{BuildStats, ForestBuilder, TreeResult};
pub use entities::*;
pub use error::DomainError;
