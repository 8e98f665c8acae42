//! Identity resolution
//!
//! Binds every node of the forest to a registry identity: an existing
//! organization found by description, or a newly created one. Parents are
//! always resolved before their children, so a created node can be attached
//! to its parent's identity.

use std::sync::Arc;

use generational_arena::Index;
use tracing::{debug, info, instrument, warn};

use crate::application::ApplicationResult;
use crate::config::CreateFailurePolicy;
use crate::domain::{
    BlockReason, OrgForest, ParentRef, Resolution, RunMode, NO_SIBLING_ID, ROOT_PARENT_ID,
};
use crate::infrastructure::traits::{NewOrganization, Registry};

/// Counters for one resolution pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveStats {
    pub matched_existing: usize,
    pub created: usize,
    pub skipped_simulation: usize,
    pub blocked: usize,
}

/// How a node's parent stands when the node is visited.
enum ParentState {
    /// Parent has an identity; carries the reference and its wire id
    Ready(ParentRef, i64),
    /// Parent exists only in the input (simulation); keep looking up
    Simulated,
    Blocked(BlockReason),
}

/// Identity resolution service.
pub struct ResolverService {
    registry: Arc<dyn Registry>,
    on_create_failure: CreateFailurePolicy,
}

impl ResolverService {
    pub fn new(registry: Arc<dyn Registry>, on_create_failure: CreateFailurePolicy) -> Self {
        Self {
            registry,
            on_create_failure,
        }
    }

    /// Resolve every node, parents before children.
    ///
    /// In simulation mode nothing is created; nodes missing in the registry
    /// end up `SkippedSimulation` and their descendants are still looked up.
    /// A registry error aborts the pass; nodes resolved so far keep their
    /// state and the failing node stays `Unresolved`.
    #[instrument(level = "debug", skip(self, forest))]
    pub fn resolve(&self, forest: &mut OrgForest, mode: RunMode) -> ApplicationResult<ResolveStats> {
        let mut stats = ResolveStats::default();

        for idx in forest.level_order() {
            let Some(node) = forest.get_node(idx) else {
                continue;
            };
            let description = node.data.description.clone();
            let name = node.data.name.clone();
            let parent_state = Self::parent_state(forest, node.parent, mode);
            Self::set(forest, idx, ParentRef::Unresolved, Resolution::Unresolved);

            let (parent_ref, resolution) = match parent_state {
                ParentState::Blocked(reason) => {
                    debug!("{}: blocked, {}", description, reason);
                    stats.blocked += 1;
                    (ParentRef::Unresolved, Resolution::Blocked { reason })
                }
                ParentState::Simulated => {
                    let resolution = self.lookup(&description, mode, &mut stats)?;
                    (ParentRef::Unresolved, resolution)
                }
                ParentState::Ready(parent_ref, parent_id) => {
                    let resolution = match self.lookup(&description, mode, &mut stats)? {
                        Resolution::Unresolved => {
                            self.create(parent_id, name, description, &mut stats)?
                        }
                        resolution => resolution,
                    };
                    (parent_ref, resolution)
                }
            };
            Self::set(forest, idx, parent_ref, resolution);
        }

        info!(
            "resolved: {} matched, {} created, {} skipped (simulation), {} blocked",
            stats.matched_existing, stats.created, stats.skipped_simulation, stats.blocked
        );
        Ok(stats)
    }

    /// Parent state derived from the parent's resolution. Level order
    /// guarantees the parent was visited already.
    fn parent_state(forest: &OrgForest, parent: Option<Index>, mode: RunMode) -> ParentState {
        let Some(parent_idx) = parent else {
            return ParentState::Ready(ParentRef::Root, ROOT_PARENT_ID);
        };
        let Some(parent) = forest.get_node(parent_idx) else {
            return ParentState::Ready(ParentRef::Root, ROOT_PARENT_ID);
        };

        match &parent.resolution {
            Resolution::MatchedExisting { id } | Resolution::Created { id } => {
                ParentState::Ready(ParentRef::Node(*id), *id)
            }
            Resolution::SkippedSimulation if mode.simulation => ParentState::Simulated,
            // Blocked ancestors propagate the original culprit
            Resolution::Blocked {
                reason: BlockReason::AncestorUnresolved { ancestor },
            } => ParentState::Blocked(BlockReason::AncestorUnresolved {
                ancestor: ancestor.clone(),
            }),
            Resolution::Blocked { .. } | Resolution::SkippedSimulation | Resolution::Unresolved => {
                ParentState::Blocked(BlockReason::AncestorUnresolved {
                    ancestor: forest.display_path(parent_idx),
                })
            }
        }
    }

    /// Look up by description. Returns `Unresolved` when absent in live mode,
    /// so the caller can create the node.
    fn lookup(
        &self,
        description: &str,
        mode: RunMode,
        stats: &mut ResolveStats,
    ) -> ApplicationResult<Resolution> {
        match self.registry.find_by_description(description)? {
            Some(id) => {
                debug!("{}: found existing id {}", description, id);
                stats.matched_existing += 1;
                Ok(Resolution::MatchedExisting { id })
            }
            None if mode.simulation => {
                debug!("{}: missing, creation skipped (simulation)", description);
                stats.skipped_simulation += 1;
                Ok(Resolution::SkippedSimulation)
            }
            None => Ok(Resolution::Unresolved),
        }
    }

    fn create(
        &self,
        parent_id: i64,
        name: String,
        description: String,
        stats: &mut ResolveStats,
    ) -> ApplicationResult<Resolution> {
        let organization = NewOrganization {
            parent_id,
            name,
            description,
            next_sibling_id: NO_SIBLING_ID,
        };
        match self.registry.create(&organization) {
            Ok(id) => {
                info!("created '{}' with id {}", organization.description, id);
                stats.created += 1;
                Ok(Resolution::Created { id })
            }
            Err(e) if self.on_create_failure == CreateFailurePolicy::Block => {
                warn!(
                    "creating '{}' failed, blocking its subtree: {}",
                    organization.description, e
                );
                stats.blocked += 1;
                Ok(Resolution::Blocked {
                    reason: BlockReason::CreateFailed {
                        message: e.to_string(),
                    },
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    fn set(forest: &mut OrgForest, idx: Index, parent_ref: ParentRef, resolution: Resolution) {
        if let Some(node) = forest.get_node_mut(idx) {
            node.parent_ref = parent_ref;
            node.resolution = resolution;
        }
    }
}
