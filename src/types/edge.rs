//! Arc type for the network DAG.

use serde::{Deserialize, Serialize};
use super::node::NodeId;

/// Arc in the network DAG.
///
/// Represents a dependency from parent to child.
/// Ordering is canonical: (parent, child).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Edge {
    /// Parent variable (source).
    pub parent: NodeId,
    /// Child variable (target).
    pub child: NodeId,
}

impl Edge {
    /// Create a new arc.
    pub fn new(parent: impl Into<NodeId>, child: impl Into<NodeId>) -> Self {
        Self {
            parent: parent.into(),
            child: child.into(),
        }
    }
}

impl std::fmt::Display for Edge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "\"{}\" -> \"{}\"", self.parent, self.child)
    }
}
