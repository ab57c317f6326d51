//! Directed acyclic graph with live cycle rejection.
//!
//! Nodes live in an arena owned by the graph; parent and child sets hold
//! [`NodeIndex`] handles. Every structural mutation bumps a generation
//! counter, which invalidates all cached Markov blankets at once.
//!
//! ## Arc Insertion
//!
//! 1. Link `from -> to` in both adjacency sets
//! 2. Breadth-first search from `from` over child edges
//! 3. If `from` is reachable from itself, unlink and return `CyclicGraph`
//!
//! A rejected arc leaves the graph, including its generation, exactly as
//! it was.

use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};

use parking_lot::RwLock;
use serde::Serialize;

use crate::canonical::canonical_hash_hex;
use crate::types::{Edge, GraphNode, NodeId, NodeIndex};

/// Error type for graph operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    /// Node not found.
    #[error("Node not found: {0}")]
    UnknownNode(NodeId),
    /// Node id already taken.
    #[error("Node already exists: {0}")]
    DuplicateNode(NodeId),
    /// Arc would close a cycle.
    #[error("Arc {from} -> {to} would create a cycle")]
    CyclicGraph {
        /// Arc source.
        from: NodeId,
        /// Arc target.
        to: NodeId,
    },
    /// Arc not present.
    #[error("Arc not found: {from} -> {to}")]
    UnknownArc {
        /// Arc source.
        from: NodeId,
        /// Arc target.
        to: NodeId,
    },
}

/// A DAG of nodes carrying payloads of type `N`.
#[derive(Debug)]
pub struct DirectedGraph<N> {
    nodes: Vec<GraphNode<N>>,
    index: BTreeMap<NodeId, NodeIndex>,
    generation: u64,
    /// Average blanket size, stamped with the generation it was computed at.
    blanket_average: RwLock<Option<(u64, f64)>>,
}

impl<N> Default for DirectedGraph<N> {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            index: BTreeMap::new(),
            generation: 0,
            blanket_average: RwLock::new(None),
        }
    }
}

/// Canonical structure description used for hashing.
#[derive(Serialize)]
struct StructureInput<'a> {
    nodes: Vec<&'a str>,
    arcs: Vec<(&'a str, &'a str)>,
}

impl<N> DirectedGraph<N> {
    /// Create a new empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node.
    pub fn add_node(&mut self, id: impl Into<NodeId>, payload: N) -> Result<NodeIndex, GraphError> {
        let id = id.into();
        if self.index.contains_key(&id) {
            return Err(GraphError::DuplicateNode(id));
        }

        let idx = NodeIndex(self.nodes.len());
        self.index.insert(id.clone(), idx);
        self.nodes.push(GraphNode::new(id, payload));
        self.generation += 1;
        Ok(idx)
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Structural generation. Bumped by every successful mutation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Check whether a node exists.
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Resolve an id to its arena handle.
    pub fn index_of(&self, id: &str) -> Result<NodeIndex, GraphError> {
        self.index
            .get(id)
            .copied()
            .ok_or_else(|| GraphError::UnknownNode(NodeId::from(id)))
    }

    /// Get a node by id.
    pub fn node(&self, id: &str) -> Option<&GraphNode<N>> {
        self.index.get(id).map(|idx| &self.nodes[idx.0])
    }

    /// Get a node by id, for payload mutation.
    pub fn node_mut(&mut self, id: &str) -> Option<&mut GraphNode<N>> {
        match self.index.get(id) {
            Some(idx) => Some(&mut self.nodes[idx.0]),
            None => None,
        }
    }

    /// Get a node by handle.
    pub fn node_at(&self, idx: NodeIndex) -> Option<&GraphNode<N>> {
        self.nodes.get(idx.0)
    }

    pub(crate) fn node_at_mut(&mut self, idx: NodeIndex) -> Option<&mut GraphNode<N>> {
        self.nodes.get_mut(idx.0)
    }

    /// All nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode<N>> {
        self.nodes.iter()
    }

    /// All node handles in insertion order.
    pub fn indices(&self) -> impl Iterator<Item = NodeIndex> {
        (0..self.nodes.len()).map(NodeIndex)
    }

    /// All node ids, sorted.
    pub fn ids(&self) -> impl Iterator<Item = &NodeId> {
        self.index.keys()
    }

    /// Parent ids of a node, sorted.
    pub fn parents(&self, id: &str) -> Result<Vec<&NodeId>, GraphError> {
        let idx = self.index_of(id)?;
        Ok(self.sorted_ids(&self.nodes[idx.0].parents))
    }

    /// Child ids of a node, sorted.
    pub fn children(&self, id: &str) -> Result<Vec<&NodeId>, GraphError> {
        let idx = self.index_of(id)?;
        Ok(self.sorted_ids(&self.nodes[idx.0].children))
    }

    /// Check whether the arc `from -> to` exists.
    pub fn has_arc(&self, from: &str, to: &str) -> bool {
        match (self.index.get(from), self.index.get(to)) {
            (Some(f), Some(t)) => self.nodes[f.0].children.contains(t),
            _ => false,
        }
    }

    /// Add the arc `from -> to`.
    ///
    /// Fails with `UnknownNode` if either endpoint is missing and with
    /// `CyclicGraph` if the arc would close a cycle; in both cases the graph
    /// is unchanged. Adding an existing arc succeeds without effect.
    pub fn add_arc(&mut self, from: &str, to: &str) -> Result<(), GraphError> {
        let f = self.index_of(from)?;
        let t = self.index_of(to)?;

        if self.nodes[f.0].children.contains(&t) {
            return Ok(());
        }

        self.nodes[f.0].children.insert(t);
        self.nodes[t.0].parents.insert(f);

        if self.reaches(f, f) {
            self.nodes[f.0].children.remove(&t);
            self.nodes[t.0].parents.remove(&f);
            tracing::warn!(from = %from, to = %to, "Rejected arc: resulting graph contains a cycle");
            return Err(GraphError::CyclicGraph {
                from: NodeId::from(from),
                to: NodeId::from(to),
            });
        }

        self.generation += 1;
        tracing::debug!(from = %from, to = %to, generation = self.generation, "Added arc");
        Ok(())
    }

    /// Remove the arc `from -> to`.
    pub fn remove_arc(&mut self, from: &str, to: &str) -> Result<(), GraphError> {
        let f = self.index_of(from)?;
        let t = self.index_of(to)?;

        if !self.nodes[f.0].children.remove(&t) {
            return Err(GraphError::UnknownArc {
                from: NodeId::from(from),
                to: NodeId::from(to),
            });
        }
        self.nodes[t.0].parents.remove(&f);

        self.generation += 1;
        tracing::debug!(from = %from, to = %to, generation = self.generation, "Removed arc");
        Ok(())
    }

    /// Whether a directed path of at least one arc leads from `from` to `to`.
    pub fn path(&self, from: &str, to: &str) -> Result<bool, GraphError> {
        let f = self.index_of(from)?;
        let t = self.index_of(to)?;
        Ok(self.reaches(f, t))
    }

    /// Whether `target` is reachable from `start` by following at least one
    /// child edge.
    fn reaches(&self, start: NodeIndex, target: NodeIndex) -> bool {
        let mut visited: HashSet<NodeIndex> = HashSet::new();
        let mut frontier: VecDeque<NodeIndex> = self.nodes[start.0].children.iter().copied().collect();

        while let Some(current) = frontier.pop_front() {
            if current == target {
                return true;
            }
            if !visited.insert(current) {
                continue;
            }
            frontier.extend(
                self.nodes[current.0]
                    .children
                    .iter()
                    .filter(|c| !visited.contains(*c)),
            );
        }

        false
    }

    /// Markov blanket of a node: parents, children and the children's other
    /// parents, excluding the node itself. Sorted by id.
    pub fn markov_blanket(&self, id: &str) -> Result<Vec<&NodeId>, GraphError> {
        let idx = self.index_of(id)?;
        let members = self.blanket_indices(idx);
        Ok(self.sorted_ids(&members))
    }

    /// Markov blanket as arena handles, served from the node cache when the
    /// cache matches the current generation.
    pub fn blanket_indices(&self, idx: NodeIndex) -> BTreeSet<NodeIndex> {
        let node = &self.nodes[idx.0];
        if let Some(members) = node.cached_blanket(self.generation) {
            return members;
        }

        let mut members: BTreeSet<NodeIndex> = node.parents.clone();
        for child in &node.children {
            members.insert(*child);
            members.extend(self.nodes[child.0].parents.iter().copied());
        }
        members.remove(&idx);

        node.store_blanket(self.generation, members.clone());
        members
    }

    /// Mean Markov blanket size over all nodes. `0.0` for an empty graph.
    pub fn average_markov_blanket_size(&self) -> f64 {
        if let Some((generation, average)) = *self.blanket_average.read() {
            if generation == self.generation {
                return average;
            }
        }

        let average = if self.nodes.is_empty() {
            0.0
        } else {
            let total: usize = self.indices().map(|idx| self.blanket_indices(idx).len()).sum();
            total as f64 / self.nodes.len() as f64
        };

        *self.blanket_average.write() = Some((self.generation, average));
        average
    }

    /// Mean number of parents over all nodes. `0.0` for an empty graph.
    pub fn average_branching_factor(&self) -> f64 {
        if self.nodes.is_empty() {
            return 0.0;
        }
        let total: usize = self.nodes.iter().map(GraphNode::num_parents).sum();
        total as f64 / self.nodes.len() as f64
    }

    /// All arcs in canonical (parent, child) order.
    pub fn arcs(&self) -> Vec<Edge> {
        let mut arcs: Vec<Edge> = self
            .nodes
            .iter()
            .flat_map(|node| {
                node.children
                    .iter()
                    .map(move |c| Edge::new(node.id().clone(), self.nodes[c.0].id().clone()))
            })
            .collect();
        arcs.sort();
        arcs
    }

    /// Number of arcs.
    pub fn num_arcs(&self) -> usize {
        self.nodes.iter().map(GraphNode::num_children).sum()
    }

    /// Check acyclicity from scratch (Kahn's algorithm).
    pub fn is_acyclic(&self) -> bool {
        let mut in_degree: Vec<usize> = self.nodes.iter().map(GraphNode::num_parents).collect();
        let mut ready: VecDeque<usize> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, d)| **d == 0)
            .map(|(i, _)| i)
            .collect();

        let mut visited = 0;
        while let Some(i) = ready.pop_front() {
            visited += 1;
            for child in &self.nodes[i].children {
                in_degree[child.0] -= 1;
                if in_degree[child.0] == 0 {
                    ready.push_back(child.0);
                }
            }
        }

        visited == self.nodes.len()
    }

    /// Canonical hash of node ids and arcs.
    pub fn structure_hash(&self) -> String {
        let arcs = self.arcs();
        let input = StructureInput {
            nodes: self.index.keys().map(NodeId::as_str).collect(),
            arcs: arcs
                .iter()
                .map(|e| (e.parent.as_str(), e.child.as_str()))
                .collect(),
        };
        canonical_hash_hex(&input)
    }

    fn sorted_ids(&self, handles: &BTreeSet<NodeIndex>) -> Vec<&NodeId> {
        let mut ids: Vec<&NodeId> = handles.iter().map(|h| self.nodes[h.0].id()).collect();
        ids.sort();
        ids
    }
}
