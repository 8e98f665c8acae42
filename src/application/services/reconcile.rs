//! Full reconciliation run: resolve identities, then order siblings.

use thiserror::Error;
use tracing::{info, instrument};

use crate::application::services::{OrdererService, ResolverService};
use crate::application::{ApplicationError, RunSummary};
use crate::domain::{OrgForest, RunMode};

/// A run stopped on a fatal error. The summary reflects the state reached.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("run aborted: {error}")]
pub struct RunAborted {
    #[source]
    pub error: ApplicationError,
    pub summary: RunSummary,
}

/// Orchestrates resolver and orderer over one forest.
pub struct ReconcileService {
    resolver: ResolverService,
    orderer: OrdererService,
}

impl ReconcileService {
    pub fn new(resolver: ResolverService, orderer: OrdererService) -> Self {
        Self { resolver, orderer }
    }

    /// Resolve every node, then compute and push sibling links.
    ///
    /// Ordering only starts once resolution completed. On a fatal registry
    /// error the partial summary travels with the error.
    #[instrument(level = "debug", skip(self, forest), fields(nodes = forest.len()))]
    pub fn run(&self, forest: &mut OrgForest, mode: RunMode) -> Result<RunSummary, RunAborted> {
        info!(
            "reconciling {} nodes{}",
            forest.len(),
            if mode.simulation { " (simulation)" } else { "" }
        );

        let outcome = self
            .resolver
            .resolve(forest, mode)
            .and_then(|_| self.orderer.order(forest, mode));
        let summary = RunSummary::from_forest(forest, mode);

        match outcome {
            Ok(_) => Ok(summary),
            Err(error) => Err(RunAborted { error, summary }),
        }
    }
}
