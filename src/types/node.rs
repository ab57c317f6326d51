//! Node types for the network DAG.

use std::borrow::Borrow;
use std::collections::BTreeSet;
use std::fmt;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Unique identifier for a node in the network DAG.
///
/// Wraps the variable name and implements `Ord` so parents can be ordered
/// canonically when laying out conditional tables.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Create a new NodeId.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl Borrow<str> for NodeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Stable handle of a node inside its graph's arena.
///
/// Handles are only meaningful for the graph that issued them and stay valid
/// for the graph's lifetime (nodes are never removed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeIndex(pub(crate) usize);

impl NodeIndex {
    /// Position of the node in insertion order.
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Markov blanket members, stamped with the graph generation they were
/// computed at.
#[derive(Debug, Clone)]
struct CachedBlanket {
    generation: u64,
    members: BTreeSet<NodeIndex>,
}

/// A vertex in the network DAG.
///
/// Parent and child links are arena handles into the owning graph, never
/// owned references. The payload carries whatever the node specializes into
/// (a categorical variable for discrete networks).
#[derive(Debug)]
pub struct GraphNode<N> {
    id: NodeId,
    payload: N,
    pub(crate) parents: BTreeSet<NodeIndex>,
    pub(crate) children: BTreeSet<NodeIndex>,
    blanket: RwLock<Option<CachedBlanket>>,
}

impl<N> GraphNode<N> {
    pub(crate) fn new(id: NodeId, payload: N) -> Self {
        Self {
            id,
            payload,
            parents: BTreeSet::new(),
            children: BTreeSet::new(),
            blanket: RwLock::new(None),
        }
    }

    /// Node identifier.
    pub fn id(&self) -> &NodeId {
        &self.id
    }

    /// Node payload.
    pub fn payload(&self) -> &N {
        &self.payload
    }

    /// Mutable node payload. Structure is only mutable through the graph.
    pub fn payload_mut(&mut self) -> &mut N {
        &mut self.payload
    }

    /// Handles of this node's parents.
    pub fn parent_indices(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.parents.iter().copied()
    }

    /// Handles of this node's children.
    pub fn child_indices(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.children.iter().copied()
    }

    /// Number of parents (in-degree).
    pub fn num_parents(&self) -> usize {
        self.parents.len()
    }

    /// Number of children (out-degree).
    pub fn num_children(&self) -> usize {
        self.children.len()
    }

    /// Cached blanket, if it was computed at `generation`.
    pub(crate) fn cached_blanket(&self, generation: u64) -> Option<BTreeSet<NodeIndex>> {
        self.blanket
            .read()
            .as_ref()
            .filter(|cached| cached.generation == generation)
            .map(|cached| cached.members.clone())
    }

    pub(crate) fn store_blanket(&self, generation: u64, members: BTreeSet<NodeIndex>) {
        *self.blanket.write() = Some(CachedBlanket { generation, members });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_node_id_ordering() {
        let mut ids = vec![NodeId::from("S"), NodeId::from("A"), NodeId::from("E")];
        ids.sort();
        let names: Vec<_> = ids.iter().map(NodeId::as_str).collect();
        assert_eq!(names, vec!["A", "E", "S"]);
    }

    #[test]
    fn test_node_id_borrows_as_str() {
        let mut map = HashMap::new();
        map.insert(NodeId::from("A"), 1);
        assert_eq!(map.get("A"), Some(&1));
    }

    #[test]
    fn test_blanket_cache_generation() {
        let node = GraphNode::new(NodeId::from("A"), ());
        assert!(node.cached_blanket(0).is_none());

        let members: BTreeSet<_> = [NodeIndex(1), NodeIndex(2)].into_iter().collect();
        node.store_blanket(3, members.clone());

        assert_eq!(node.cached_blanket(3), Some(members));
        assert!(node.cached_blanket(4).is_none());
    }
}
