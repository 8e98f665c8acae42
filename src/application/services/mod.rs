//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.
//! Services depend on the `Registry` boundary trait but are themselves
//! concrete structs, not traits.

mod orderer;
mod reconcile;
mod resolver;

pub use orderer::{OrderStats, OrdererService};
pub use reconcile::{ReconcileService, RunAborted};
pub use resolver::{ResolveStats, ResolverService};
