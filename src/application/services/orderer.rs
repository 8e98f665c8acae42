//! Sibling ordering
//!
//! The registry orders siblings through a `next_sibling_id` chain derived
//! from input order among siblings. Nodes without an identity are not
//! bridged: the chain breaks at them.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::application::ApplicationResult;
use crate::domain::{OrgForest, RunMode, SiblingLink};
use crate::infrastructure::traits::{LinkUpdate, Registry};

/// Counters for one ordering pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrderStats {
    pub links_pushed: usize,
    /// Links computed but not written (simulation)
    pub links_computed_only: usize,
    /// Resolved nodes whose parent reference has no wire form
    pub not_pushable: usize,
}

/// Sibling link computation and registry update service.
pub struct OrdererService {
    registry: Arc<dyn Registry>,
}

impl OrdererService {
    pub fn new(registry: Arc<dyn Registry>) -> Self {
        Self { registry }
    }

    /// Compute previous/next links for every resolved node, then write them
    /// to the registry deepest level first.
    #[instrument(level = "debug", skip(self, forest))]
    pub fn order(&self, forest: &mut OrgForest, mode: RunMode) -> ApplicationResult<OrderStats> {
        self.compute_links(forest);
        self.push_links(forest, mode)
    }

    /// Fill `previous_sibling` / `next_sibling` per sibling group.
    ///
    /// Links follow stored order. An unresolved sibling keeps `Pending` links,
    /// and its neighbors get the no-sibling sentinel on the side facing it.
    pub fn compute_links(&self, forest: &mut OrgForest) {
        for group in forest.sibling_groups() {
            let identities: Vec<Option<i64>> = group
                .iter()
                .map(|&idx| forest.get_node(idx).and_then(|node| node.identity()))
                .collect();

            for (pos, &idx) in group.iter().enumerate() {
                let (previous, next) = match identities[pos] {
                    Some(_) => {
                        let previous = pos.checked_sub(1).and_then(|p| identities[p]);
                        let next = identities.get(pos + 1).copied().flatten();
                        (
                            SiblingLink::from_identity(previous),
                            SiblingLink::from_identity(next),
                        )
                    }
                    None => (SiblingLink::Pending, SiblingLink::Pending),
                };
                if let Some(node) = forest.get_node_mut(idx) {
                    node.previous_sibling = previous;
                    node.next_sibling = next;
                    node.links_pushed = false;
                }
            }
        }
    }

    /// Write links in reverse level order. Unresolved nodes are skipped.
    fn push_links(&self, forest: &mut OrgForest, mode: RunMode) -> ApplicationResult<OrderStats> {
        let mut stats = OrderStats::default();

        for idx in forest.level_order().into_iter().rev() {
            let Some(node) = forest.get_node(idx) else {
                continue;
            };
            let Some(id) = node.identity() else {
                continue;
            };
            if mode.simulation {
                stats.links_computed_only += 1;
                continue;
            }
            let (Some(parent_id), Some(next_sibling_id)) =
                (node.parent_ref.wire_id(), node.next_sibling.wire_id())
            else {
                warn!("{}: parent unresolved, links not pushed", node.data.description);
                stats.not_pushable += 1;
                continue;
            };

            let update = LinkUpdate {
                parent_id,
                name: node.data.name.clone(),
                next_sibling_id,
            };
            debug!("{}: parent {} next {}", id, parent_id, next_sibling_id);
            self.registry.update_links(id, &update)?;
            stats.links_pushed += 1;
            if let Some(node) = forest.get_node_mut(idx) {
                node.links_pushed = true;
            }
        }

        info!(
            "ordering: {} links pushed, {} computed only",
            stats.links_pushed, stats.links_computed_only
        );
        Ok(stats)
    }
}
