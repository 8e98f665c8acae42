use std::collections::VecDeque;
use std::fmt;

use generational_arena::{Arena, Index};
use serde::Serialize;
use termtree::Tree;
use tracing::instrument;

use crate::domain::entities::{Level, ParentRef, Resolution, SiblingLink};

/// Data payload for tree nodes representing organizational units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeData {
    pub level: Level,
    /// Natural key used for registry lookup
    pub description: String,
    pub name: String,
}

impl fmt::Display for NodeData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.description, self.name)
    }
}

/// Tree node in the arena-based hierarchy structure.
#[derive(Debug)]
pub struct OrgNode {
    pub data: NodeData,
    /// Index of parent node in the arena, None for top-level nodes
    pub parent: Option<Index>,
    /// Indices of child nodes in first-encounter order
    pub children: Vec<Index>,
    pub resolution: Resolution,
    pub parent_ref: ParentRef,
    pub previous_sibling: SiblingLink,
    pub next_sibling: SiblingLink,
    /// Set once the node's links were written to the registry
    pub links_pushed: bool,
}

impl OrgNode {
    fn new(data: NodeData, parent: Option<Index>) -> Self {
        Self {
            data,
            parent,
            children: Vec::new(),
            resolution: Resolution::Unresolved,
            parent_ref: ParentRef::Unresolved,
            previous_sibling: SiblingLink::Pending,
            next_sibling: SiblingLink::Pending,
            links_pushed: false,
        }
    }

    pub fn identity(&self) -> Option<i64> {
        self.resolution.identity()
    }
}

/// Flat, serializable view of one node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeView {
    pub id: Option<i64>,
    pub parent_id: Option<i64>,
    pub previous_sibling_id: Option<i64>,
    pub next_sibling_id: Option<i64>,
    pub name: String,
    pub description: String,
    pub level: Level,
    pub resolution: Resolution,
}

/// Arena-based forest of organizational units.
///
/// Nodes are addressed by generational indices; parent, child and sibling
/// relations are stored as indices or registry ids, never as owning links.
/// The forest holds several top-level divisions, kept in encounter order.
#[derive(Debug, Default)]
pub struct OrgForest {
    arena: Arena<OrgNode>,
    roots: Vec<Index>,
}

impl OrgForest {
    pub fn new() -> Self {
        Self {
            arena: Arena::new(),
            roots: Vec::new(),
        }
    }

    #[instrument(level = "trace", skip(self))]
    pub fn insert_node(&mut self, data: NodeData, parent: Option<Index>) -> Index {
        let node_idx = self.arena.insert(OrgNode::new(data, parent));

        if let Some(parent_idx) = parent {
            if let Some(parent) = self.arena.get_mut(parent_idx) {
                parent.children.push(node_idx);
            }
        } else {
            self.roots.push(node_idx);
        }

        node_idx
    }

    pub fn get_node(&self, idx: Index) -> Option<&OrgNode> {
        self.arena.get(idx)
    }

    pub fn get_node_mut(&mut self, idx: Index) -> Option<&mut OrgNode> {
        self.arena.get_mut(idx)
    }

    /// Top-level nodes in encounter order.
    pub fn roots(&self) -> &[Index] {
        &self.roots
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Depth-first, pre-order traversal over all trees.
    pub fn iter(&self) -> ForestIterator<'_> {
        ForestIterator::new(self)
    }

    /// Breadth-first traversal: every parent precedes its children.
    #[instrument(level = "trace", skip(self))]
    pub fn level_order(&self) -> Vec<Index> {
        let mut order = Vec::with_capacity(self.arena.len());
        let mut queue: VecDeque<Index> = self.roots.iter().copied().collect();
        while let Some(idx) = queue.pop_front() {
            if let Some(node) = self.arena.get(idx) {
                order.push(idx);
                queue.extend(node.children.iter().copied());
            }
        }
        order
    }

    /// Groups of nodes sharing a parent, each in stored order.
    /// The top-level nodes form the first group.
    #[instrument(level = "trace", skip(self))]
    pub fn sibling_groups(&self) -> Vec<Vec<Index>> {
        let mut groups = Vec::new();
        if !self.roots.is_empty() {
            groups.push(self.roots.clone());
        }
        for idx in self.level_order() {
            if let Some(node) = self.arena.get(idx) {
                if !node.children.is_empty() {
                    groups.push(node.children.clone());
                }
            }
        }
        groups
    }

    /// Nodes without children.
    pub fn leaves(&self) -> Vec<Index> {
        self.iter()
            .filter(|(_, node)| node.children.is_empty())
            .map(|(idx, _)| idx)
            .collect()
    }

    /// Descriptions from the root down to the node.
    pub fn path_of(&self, idx: Index) -> Vec<String> {
        let mut path = Vec::new();
        let mut current = Some(idx);
        while let Some(current_idx) = current {
            match self.arena.get(current_idx) {
                Some(node) => {
                    path.push(node.data.description.clone());
                    current = node.parent;
                }
                None => break,
            }
        }
        path.reverse();
        path
    }

    pub fn display_path(&self, idx: Index) -> String {
        self.path_of(idx).join(" / ")
    }

    /// Number of nodes on the longest root-to-leaf path.
    pub fn depth(&self) -> usize {
        self.roots
            .iter()
            .map(|&root| self.calculate_depth(root))
            .max()
            .unwrap_or(0)
    }

    fn calculate_depth(&self, node_idx: Index) -> usize {
        if let Some(node) = self.get_node(node_idx) {
            1 + node
                .children
                .iter()
                .map(|&child| self.calculate_depth(child))
                .max()
                .unwrap_or(0)
        } else {
            0
        }
    }

    /// Flat listing of every node in level order.
    pub fn structure(&self) -> Vec<NodeView> {
        self.level_order()
            .into_iter()
            .filter_map(|idx| self.arena.get(idx))
            .map(|node| NodeView {
                id: node.identity(),
                parent_id: node.parent_ref.wire_id(),
                previous_sibling_id: node.previous_sibling.wire_id(),
                next_sibling_id: node.next_sibling.wire_id(),
                name: node.data.name.clone(),
                description: node.data.description.clone(),
                level: node.data.level,
                resolution: node.resolution.clone(),
            })
            .collect()
    }

    /// Render the forest for terminal display, one tree per division.
    pub fn to_tree_strings(&self) -> Vec<Tree<String>> {
        fn build_tree(forest: &OrgForest, node_idx: Index) -> Tree<String> {
            let Some(node) = forest.get_node(node_idx) else {
                return Tree::new(String::new());
            };
            let label = match node.identity() {
                Some(id) => format!("{} [{}]", node.data, id),
                None => node.data.to_string(),
            };
            let leaves: Vec<_> = node
                .children
                .iter()
                .map(|&child| build_tree(forest, child))
                .collect();
            Tree::new(label).with_leaves(leaves)
        }

        self.roots
            .iter()
            .map(|&root| build_tree(self, root))
            .collect()
    }
}

pub struct ForestIterator<'a> {
    forest: &'a OrgForest,
    stack: Vec<Index>,
}

impl<'a> ForestIterator<'a> {
    fn new(forest: &'a OrgForest) -> Self {
        // Roots reversed so the first division is visited first
        let stack = forest.roots.iter().rev().copied().collect();
        Self { forest, stack }
    }
}

impl<'a> Iterator for ForestIterator<'a> {
    type Item = (Index, &'a OrgNode);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(current_idx) = self.stack.pop() {
            if let Some(node) = self.forest.get_node(current_idx) {
                // Push children in reverse order for left-to-right traversal
                for &child in node.children.iter().rev() {
                    self.stack.push(child);
                }
                return Some((current_idx, node));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(level: Level, description: &str) -> NodeData {
        NodeData {
            level,
            description: description.to_string(),
            name: description.to_lowercase(),
        }
    }

    fn sample() -> (OrgForest, Vec<Index>) {
        let mut forest = OrgForest::new();
        let d1 = forest.insert_node(data(Level::Division, "D1"), None);
        let d2 = forest.insert_node(data(Level::Division, "D2"), None);
        let f1 = forest.insert_node(data(Level::Facility, "F1"), Some(d1));
        let f2 = forest.insert_node(data(Level::Facility, "F2"), Some(d1));
        let f3 = forest.insert_node(data(Level::Facility, "F3"), Some(d2));
        (forest, vec![d1, d2, f1, f2, f3])
    }

    #[test]
    fn given_forest_when_level_order_then_parents_precede_children() {
        let (forest, idx) = sample();
        assert_eq!(forest.level_order(), idx);
    }

    #[test]
    fn given_forest_when_iterating_then_visits_preorder() {
        let (forest, idx) = sample();
        let visited: Vec<_> = forest.iter().map(|(i, _)| i).collect();
        assert_eq!(visited, vec![idx[0], idx[2], idx[3], idx[1], idx[4]]);
    }

    #[test]
    fn given_forest_when_grouping_siblings_then_roots_come_first() {
        let (forest, idx) = sample();
        let groups = forest.sibling_groups();
        assert_eq!(
            groups,
            vec![vec![idx[0], idx[1]], vec![idx[2], idx[3]], vec![idx[4]]]
        );
    }

    #[test]
    fn given_nested_node_when_asking_path_then_returns_descriptions_from_root() {
        let (forest, idx) = sample();
        assert_eq!(forest.path_of(idx[3]), vec!["D1", "F2"]);
        assert_eq!(forest.display_path(idx[4]), "D2 / F3");
        assert_eq!(forest.depth(), 2);
        assert_eq!(forest.leaves().len(), 3);
    }

    #[test]
    fn given_fresh_forest_when_listing_structure_then_links_are_pending() {
        let (forest, _) = sample();
        let structure = forest.structure();
        assert_eq!(structure.len(), 5);
        assert!(structure.iter().all(|n| n.id.is_none()));
        assert!(structure.iter().all(|n| n.next_sibling_id.is_none()));
    }
}
