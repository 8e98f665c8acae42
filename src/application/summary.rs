//! End-of-run summary derived from the forest's per-node state.

use std::fmt;

use serde::Serialize;

use crate::domain::{Level, OrgForest, Resolution, RunMode, SiblingLink};

/// A node that did not end up bound and linked in the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeIssue {
    pub level: Level,
    /// Descriptions from the division down to the node
    pub path: String,
    pub reason: String,
}

/// Counts per outcome, plus every node that needs attention.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub simulation: bool,
    pub total_nodes: usize,
    pub matched_existing: usize,
    pub created: usize,
    pub skipped_simulation: usize,
    pub blocked: usize,
    pub unresolved: usize,
    pub links_pushed: usize,
    /// Simulation: links computed but never written
    pub links_computed_only: usize,
    /// Live run: links computed but not written, the node needs another run
    pub links_not_pushed: usize,
    pub issues: Vec<NodeIssue>,
}

impl RunSummary {
    pub fn from_forest(forest: &OrgForest, mode: RunMode) -> Self {
        let mut summary = RunSummary {
            simulation: mode.simulation,
            total_nodes: forest.len(),
            ..Default::default()
        };

        for idx in forest.level_order() {
            let Some(node) = forest.get_node(idx) else {
                continue;
            };
            let issue = |reason: String| NodeIssue {
                level: node.data.level,
                path: forest.display_path(idx),
                reason,
            };

            match &node.resolution {
                Resolution::MatchedExisting { .. } => summary.matched_existing += 1,
                Resolution::Created { .. } => summary.created += 1,
                Resolution::SkippedSimulation => {
                    summary.skipped_simulation += 1;
                    summary
                        .issues
                        .push(issue("missing in registry, not created (simulation)".into()));
                }
                Resolution::Blocked { reason } => {
                    summary.blocked += 1;
                    summary.issues.push(issue(reason.to_string()));
                }
                Resolution::Unresolved => {
                    summary.unresolved += 1;
                    summary.issues.push(issue("not resolved".into()));
                }
            }

            if node.links_pushed {
                summary.links_pushed += 1;
            } else if node.identity().is_some() && node.next_sibling != SiblingLink::Pending {
                if mode.simulation {
                    summary.links_computed_only += 1;
                } else {
                    summary.links_not_pushed += 1;
                    let reason = if node.parent_ref.wire_id().is_none() {
                        "parent unresolved, links not pushed"
                    } else {
                        "links not pushed: run aborted"
                    };
                    summary.issues.push(issue(reason.into()));
                }
            }
        }
        summary
    }

    /// True when every node is bound and no issue was recorded.
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} nodes: {} matched, {} created, {} skipped (simulation), {} blocked, {} unresolved",
            self.total_nodes,
            self.matched_existing,
            self.created,
            self.skipped_simulation,
            self.blocked,
            self.unresolved
        )?;
        write!(
            f,
            "links: {} pushed, {} computed only, {} not pushed",
            self.links_pushed, self.links_computed_only, self.links_not_pushed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BlockReason, NodeData, ParentRef};

    fn data(level: Level, description: &str) -> NodeData {
        NodeData {
            level,
            description: description.to_string(),
            name: description.to_string(),
        }
    }

    #[test]
    fn given_mixed_outcomes_when_summarizing_then_counts_and_reports_issues() {
        // Arrange
        let mut forest = OrgForest::new();
        let d1 = forest.insert_node(data(Level::Division, "D1"), None);
        let f1 = forest.insert_node(data(Level::Facility, "F1"), Some(d1));
        let f2 = forest.insert_node(data(Level::Facility, "F2"), Some(d1));
        for (idx, resolution) in [
            (d1, Resolution::MatchedExisting { id: 10 }),
            (f1, Resolution::Created { id: 11 }),
            (
                f2,
                Resolution::Blocked {
                    reason: BlockReason::CreateFailed {
                        message: "boom".into(),
                    },
                },
            ),
        ] {
            let node = forest.get_node_mut(idx).unwrap();
            node.resolution = resolution;
            node.parent_ref = ParentRef::Root;
        }
        let node = forest.get_node_mut(d1).unwrap();
        node.next_sibling = SiblingLink::None;
        node.links_pushed = true;

        // Act
        let summary = RunSummary::from_forest(&forest, RunMode::live());

        // Assert
        assert_eq!(summary.total_nodes, 3);
        assert_eq!(summary.matched_existing, 1);
        assert_eq!(summary.created, 1);
        assert_eq!(summary.blocked, 1);
        assert_eq!(summary.links_pushed, 1);
        assert_eq!(summary.issues.len(), 1);
        assert_eq!(summary.issues[0].path, "D1 / F2");
        assert!(summary.issues[0].reason.contains("boom"));
        assert!(!summary.is_clean());
    }

    #[test]
    fn given_linked_but_unpushed_node_when_summarizing_then_mode_decides_how_it_counts() {
        // Arrange
        let mut forest = OrgForest::new();
        let d1 = forest.insert_node(data(Level::Division, "D1"), None);
        let node = forest.get_node_mut(d1).unwrap();
        node.resolution = Resolution::MatchedExisting { id: 10 };
        node.parent_ref = ParentRef::Root;
        node.next_sibling = SiblingLink::None;

        // Act
        let simulated = RunSummary::from_forest(&forest, RunMode::simulation());
        let live = RunSummary::from_forest(&forest, RunMode::live());

        // Assert
        assert_eq!(simulated.links_computed_only, 1);
        assert_eq!(simulated.links_not_pushed, 0);
        assert!(simulated.is_clean());
        assert_eq!(live.links_computed_only, 0);
        assert_eq!(live.links_not_pushed, 1);
        assert_eq!(live.issues[0].path, "D1");
        assert_eq!(live.issues[0].reason, "links not pushed: run aborted");
    }
}
