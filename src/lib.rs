//! Reconcile an organizational hierarchy exported as CSV with a remote
//! organization registry: build the hierarchy, bind every unit to a registry
//! identity, and push parent and sibling-order links.

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
