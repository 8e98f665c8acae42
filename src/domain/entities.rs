//! Domain entities: core data structures

use std::fmt;

use serde::Serialize;

/// Registry id of the implicit top-level parent.
pub const ROOT_PARENT_ID: i64 = 1;

/// Registry value meaning "no sibling in that direction".
pub const NO_SIBLING_ID: i64 = -10;

/// Number of levels in every root-to-leaf path.
pub const LEVEL_COUNT: usize = 5;

/// Fixed organizational levels, root first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Division,
    Facility,
    Department,
    Bu,
    Bsu,
}

impl Level {
    pub const ALL: [Level; LEVEL_COUNT] = [
        Level::Division,
        Level::Facility,
        Level::Department,
        Level::Bu,
        Level::Bsu,
    ];

    /// Depth from the root, 0..=4.
    pub fn depth(self) -> usize {
        self as usize
    }

    pub fn from_depth(depth: usize) -> Option<Level> {
        Self::ALL.get(depth).copied()
    }

    /// Next level down, None for the leaf level.
    pub fn child(self) -> Option<Level> {
        Self::from_depth(self.depth() + 1)
    }

    pub fn is_leaf(self) -> bool {
        self.child().is_none()
    }

    /// Column holding the natural key for this level.
    pub fn code_column(self) -> &'static str {
        match self {
            Level::Division => "division_code",
            Level::Facility => "facility_code",
            Level::Department => "department_code",
            Level::Bu => "bu_code",
            Level::Bsu => "bsu_code",
        }
    }

    /// Column holding the display name for this level.
    pub fn name_column(self) -> &'static str {
        match self {
            Level::Division => "division",
            Level::Facility => "facility",
            Level::Department => "department",
            Level::Bu => "bu",
            Level::Bsu => "bsu",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name_column())
    }
}

/// One (description, name) pair of a flat record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LevelEntry {
    /// Natural key
    pub description: String,
    /// Human-readable label
    pub name: String,
}

impl LevelEntry {
    pub fn new(description: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            name: name.into(),
        }
    }
}

/// A denormalized input row: one entry per level, division first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrgRecord {
    /// Position in the source, used in error messages
    pub position: usize,
    pub entries: [LevelEntry; LEVEL_COUNT],
}

impl OrgRecord {
    pub fn new(position: usize, entries: [LevelEntry; LEVEL_COUNT]) -> Self {
        Self { position, entries }
    }

    pub fn entry(&self, level: Level) -> &LevelEntry {
        &self.entries[level.depth()]
    }
}

/// Why a node was not resolved against the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BlockReason {
    /// Creating this node failed
    CreateFailed { message: String },
    /// An ancestor has no identity, so this node has no valid parent
    AncestorUnresolved { ancestor: String },
}

impl fmt::Display for BlockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockReason::CreateFailed { message } => write!(f, "create failed: {}", message),
            BlockReason::AncestorUnresolved { ancestor } => {
                write!(f, "ancestor '{}' is unresolved", ancestor)
            }
        }
    }
}

/// Identity resolution state of a node.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Resolution {
    #[default]
    Unresolved,
    MatchedExisting { id: i64 },
    Created { id: i64 },
    /// Missing in the registry; creation suppressed by simulation mode
    SkippedSimulation,
    Blocked { reason: BlockReason },
}

impl Resolution {
    /// Registry identity, if the node has one.
    pub fn identity(&self) -> Option<i64> {
        match self {
            Resolution::MatchedExisting { id } | Resolution::Created { id } => Some(*id),
            Resolution::Unresolved | Resolution::SkippedSimulation | Resolution::Blocked { .. } => {
                None
            }
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.identity().is_some()
    }
}

/// Reference to a node's parent in registry terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParentRef {
    /// Top-level node, parent is the registry root
    Root,
    Node(i64),
    #[default]
    Unresolved,
}

impl ParentRef {
    pub fn wire_id(self) -> Option<i64> {
        match self {
            ParentRef::Root => Some(ROOT_PARENT_ID),
            ParentRef::Node(id) => Some(id),
            ParentRef::Unresolved => None,
        }
    }
}

/// One direction of a sibling chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SiblingLink {
    /// Not computed yet
    #[default]
    Pending,
    /// No (resolved) sibling in that direction
    None,
    Node(i64),
}

impl SiblingLink {
    pub fn from_identity(identity: Option<i64>) -> Self {
        identity.map_or(SiblingLink::None, SiblingLink::Node)
    }

    /// Value sent to the registry; Pending has no wire form.
    pub fn wire_id(self) -> Option<i64> {
        match self {
            SiblingLink::Pending => None,
            SiblingLink::None => Some(NO_SIBLING_ID),
            SiblingLink::Node(id) => Some(id),
        }
    }
}

/// Execution flags consumed by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunMode {
    /// Suppress all registry writes; reads still happen
    pub simulation: bool,
}

impl RunMode {
    pub fn live() -> Self {
        Self { simulation: false }
    }

    pub fn simulation() -> Self {
        Self { simulation: true }
    }
}
