//! Forest builder: turns denormalized records into the five-level hierarchy.

use std::collections::HashMap;

use generational_arena::Index;
use tracing::{debug, instrument};

use crate::domain::arena::{NodeData, OrgForest};
use crate::domain::entities::{Level, OrgRecord, LEVEL_COUNT};
use crate::domain::error::DomainError;

/// Result type for tree operations.
pub type TreeResult<T> = Result<T, DomainError>;

/// Counters describing what the builder consumed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildStats {
    pub records: usize,
    /// Nodes created per level, division first
    pub nodes_per_level: [usize; LEVEL_COUNT],
    /// Records whose leaf-unit was empty
    pub records_without_leaf: usize,
}

/// Constructs an [`OrgForest`] from flat records.
///
/// Nodes are keyed by their path (descriptions from the root down), so the
/// same description may appear under different parents. The first record
/// that mentions a path decides the node's name.
pub struct ForestBuilder {
    forest: OrgForest,
    path_index: HashMap<Vec<String>, Index>,
    stats: BuildStats,
}

impl Default for ForestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ForestBuilder {
    pub fn new() -> Self {
        Self {
            forest: OrgForest::new(),
            path_index: HashMap::new(),
            stats: BuildStats::default(),
        }
    }

    /// Build a forest from records in input order; aborts on the first malformed record.
    #[instrument(level = "debug", skip_all)]
    pub fn build<I>(records: I) -> TreeResult<(OrgForest, BuildStats)>
    where
        I: IntoIterator<Item = OrgRecord>,
    {
        let mut builder = Self::new();
        for record in records {
            builder.add_record(&record)?;
        }
        Ok(builder.finish())
    }

    /// Merge one record into the forest.
    ///
    /// The record is validated before anything is inserted, so a rejected
    /// record leaves the forest untouched.
    pub fn add_record(&mut self, record: &OrgRecord) -> TreeResult<()> {
        let levels = Self::validate(record)?;

        let mut path: Vec<String> = Vec::with_capacity(LEVEL_COUNT);
        let mut parent: Option<Index> = None;
        for (level, description, name) in &levels {
            let level = *level;
            path.push(description.clone());
            let idx = match self.path_index.get(&path) {
                Some(&existing) => existing,
                None => {
                    let data = NodeData {
                        level,
                        description: description.clone(),
                        name: name.clone(),
                    };
                    let idx = self.forest.insert_node(data, parent);
                    self.path_index.insert(path.clone(), idx);
                    self.stats.nodes_per_level[level.depth()] += 1;
                    debug!("new {} node: {}", level, path.join(" / "));
                    idx
                }
            };
            parent = Some(idx);
        }

        self.stats.records += 1;
        if levels.len() < LEVEL_COUNT {
            self.stats.records_without_leaf += 1;
        }
        Ok(())
    }

    pub fn finish(self) -> (OrgForest, BuildStats) {
        (self.forest, self.stats)
    }

    /// Trimmed (level, description, name) triples the record contributes.
    fn validate(record: &OrgRecord) -> TreeResult<Vec<(Level, String, String)>> {
        let mut levels = Vec::with_capacity(LEVEL_COUNT);
        for level in Level::ALL {
            let entry = record.entry(level);
            let description = entry.description.trim();
            let name = entry.name.trim();

            if description.is_empty() {
                if level.is_leaf() {
                    // Leaf-unit is optional: the record stops at the business unit
                    break;
                }
                let reason = if name.is_empty() {
                    "is missing".to_string()
                } else {
                    format!("'{}' has no code", name)
                };
                return Err(DomainError::malformed(record.position, level, reason));
            }

            let name = if name.is_empty() { description } else { name };
            levels.push((level, description.to_string(), name.to_string()));
        }
        Ok(levels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::LevelEntry;

    fn record(position: usize, codes: [&str; LEVEL_COUNT]) -> OrgRecord {
        OrgRecord::new(
            position,
            codes.map(|code| LevelEntry::new(code, format!("{} name", code))),
        )
    }

    #[test]
    fn given_rejected_record_when_adding_then_forest_is_untouched() {
        let mut builder = ForestBuilder::new();
        let bad = record(2, ["D1", "F1", "", "B1", "U1"]);
        assert!(builder.add_record(&bad).is_err());
        let (forest, stats) = builder.finish();
        assert!(forest.is_empty());
        assert_eq!(stats.records, 0);
    }

    #[test]
    fn given_blank_name_when_building_then_description_is_used() {
        let mut rec = record(2, ["D1", "F1", "P1", "B1", "U1"]);
        rec.entries[0].name = "   ".into();
        let (forest, _) = ForestBuilder::build(vec![rec]).unwrap();
        let root = forest.roots()[0];
        assert_eq!(forest.get_node(root).unwrap().data.name, "D1");
    }

    #[test]
    fn given_padded_values_when_building_then_values_are_trimmed() {
        let rec = record(2, [" D1 ", "F1", "P1", "B1", "U1 "]);
        let (forest, _) = ForestBuilder::build(vec![rec]).unwrap();
        let root = forest.roots()[0];
        assert_eq!(forest.get_node(root).unwrap().data.description, "D1");
    }
}
