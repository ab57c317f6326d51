//! Discrete Bayesian networks.
//!
//! A [`DiscreteBayesianNetwork`] is a [`DirectedGraph`] whose nodes carry
//! [`CategoricalVariable`] payloads. Structural changes and level changes
//! discard the affected conditional tables; a fit rebuilds all of them.

use crate::estimator::FitConfig;
use crate::fitter::{FitError, FitReport, NetworkFitter};
use crate::graph::{DirectedGraph, GraphError};
use crate::model_string::{self, ModelStringError};
use crate::tensor::{ConditionalTable, Dimension, TableError};
use crate::types::{CategoricalVariable, Edge, GraphNode, LevelError, NodeId, NodeIndex};

/// Error type for network operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NetworkError {
    /// Structural error.
    #[error(transparent)]
    Graph(#[from] GraphError),
    /// Level list rejected.
    #[error("Invalid levels for {variable}: {source}")]
    Levels {
        /// Variable whose levels were rejected.
        variable: NodeId,
        /// Reason.
        source: LevelError,
    },
    /// A table dimension has no levels assigned yet.
    #[error("Variable {0} has no levels")]
    MissingLevels(NodeId),
    /// Table construction error.
    #[error(transparent)]
    Table(#[from] TableError),
}

/// A DAG of categorical variables with conditional probability tables.
#[derive(Debug, Default)]
pub struct DiscreteBayesianNetwork {
    graph: DirectedGraph<CategoricalVariable>,
}

impl DiscreteBayesianNetwork {
    /// Create a new empty network.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a network from a model string such as `"A, S, E|A:S"`.
    ///
    /// Levels still have to be assigned before fitting.
    pub fn from_model_string(model: &str) -> Result<Self, ModelStringError> {
        let declarations = model_string::parse(model)?;
        let mut network = Self::new();
        for declaration in &declarations {
            network.add_variable(declaration.id.clone())?;
            for parent in &declaration.parents {
                network.add_arc(parent.as_str(), declaration.id.as_str())?;
            }
        }
        Ok(network)
    }

    /// Underlying graph.
    pub fn graph(&self) -> &DirectedGraph<CategoricalVariable> {
        &self.graph
    }

    /// Number of variables.
    pub fn len(&self) -> usize {
        self.graph.len()
    }

    /// Whether the network has no variables.
    pub fn is_empty(&self) -> bool {
        self.graph.is_empty()
    }

    /// Add a variable without levels.
    pub fn add_variable(&mut self, id: impl Into<NodeId>) -> Result<NodeIndex, NetworkError> {
        Ok(self.graph.add_node(id, CategoricalVariable::new())?)
    }

    /// Add a variable with levels.
    pub fn add_variable_with_levels<I, S>(&mut self, id: impl Into<NodeId>, levels: I) -> Result<NodeIndex, NetworkError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let id = id.into();
        let variable = CategoricalVariable::with_levels(levels).map_err(|source| NetworkError::Levels {
            variable: id.clone(),
            source,
        })?;
        Ok(self.graph.add_node(id, variable)?)
    }

    /// Add the arc `from -> to`. Discards the table of `to`.
    pub fn add_arc(&mut self, from: &str, to: &str) -> Result<(), NetworkError> {
        let generation = self.graph.generation();
        self.graph.add_arc(from, to)?;
        if self.graph.generation() != generation {
            self.clear_table(to);
        }
        Ok(())
    }

    /// Remove the arc `from -> to`. Discards the table of `to`.
    pub fn remove_arc(&mut self, from: &str, to: &str) -> Result<(), NetworkError> {
        self.graph.remove_arc(from, to)?;
        self.clear_table(to);
        Ok(())
    }

    /// Assign levels to a variable.
    ///
    /// Discards the tables of the variable and of its children, whose shapes
    /// depend on these levels.
    pub fn set_levels<I, S>(&mut self, id: &str, levels: I) -> Result<(), NetworkError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let idx = self.graph.index_of(id)?;
        let children: Vec<NodeIndex> = match self.graph.node_at_mut(idx) {
            Some(node) => {
                node.payload_mut().set_levels(levels).map_err(|source| NetworkError::Levels {
                    variable: NodeId::from(id),
                    source,
                })?;
                node.child_indices().collect()
            }
            None => return Err(GraphError::UnknownNode(NodeId::from(id)).into()),
        };

        for child in children {
            if let Some(node) = self.graph.node_at_mut(child) {
                node.payload_mut().clear_table();
            }
        }
        Ok(())
    }

    /// Assign levels to several variables. Stops at the first error; levels
    /// assigned before it are kept.
    pub fn set_levels_many<'a, I, L, S>(&mut self, assignments: I) -> Result<(), NetworkError>
    where
        I: IntoIterator<Item = (&'a str, L)>,
        L: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for (id, levels) in assignments {
            self.set_levels(id, levels)?;
        }
        Ok(())
    }

    /// Levels of a variable.
    pub fn levels(&self, id: &str) -> Option<&[String]> {
        self.variable(id).map(CategoricalVariable::levels)
    }

    /// A variable by id.
    pub fn variable(&self, id: &str) -> Option<&CategoricalVariable> {
        self.graph.node(id).map(GraphNode::payload)
    }

    /// Variables with their ids, in insertion order.
    pub fn variables(&self) -> impl Iterator<Item = (&NodeId, &CategoricalVariable)> {
        self.graph.nodes().map(|node| (node.id(), node.payload()))
    }

    /// Conditional table of a variable, if built.
    pub fn table(&self, id: &str) -> Option<&ConditionalTable> {
        self.variable(id).and_then(CategoricalVariable::table)
    }

    /// Markov blanket of a variable, sorted by id.
    pub fn markov_blanket(&self, id: &str) -> Result<Vec<&NodeId>, NetworkError> {
        Ok(self.graph.markov_blanket(id)?)
    }

    /// Whether a directed path leads from `from` to `to`.
    pub fn path(&self, from: &str, to: &str) -> Result<bool, NetworkError> {
        Ok(self.graph.path(from, to)?)
    }

    /// Mean Markov blanket size.
    pub fn average_markov_blanket_size(&self) -> f64 {
        self.graph.average_markov_blanket_size()
    }

    /// Mean number of parents.
    pub fn average_branching_factor(&self) -> f64 {
        self.graph.average_branching_factor()
    }

    /// All arcs in canonical order.
    pub fn arcs(&self) -> Vec<Edge> {
        self.graph.arcs()
    }

    /// Table dimensions of a variable: parents sorted by id, then itself.
    pub fn dimensions_of(&self, id: &str) -> Result<Vec<Dimension>, NetworkError> {
        let node = self
            .graph
            .node(id)
            .ok_or_else(|| GraphError::UnknownNode(NodeId::from(id)))?;
        self.dimensions_for(node)
    }

    pub(crate) fn dimensions_for(&self, node: &GraphNode<CategoricalVariable>) -> Result<Vec<Dimension>, NetworkError> {
        let mut axes: Vec<&GraphNode<CategoricalVariable>> = node
            .parent_indices()
            .filter_map(|p| self.graph.node_at(p))
            .collect();
        axes.sort_by(|a, b| a.id().cmp(b.id()));
        axes.push(node);

        axes.into_iter()
            .map(|axis| {
                let variable = axis.payload();
                if !variable.has_levels() {
                    return Err(NetworkError::MissingLevels(axis.id().clone()));
                }
                Ok(Dimension::new(axis.id().clone(), variable.levels().to_vec()))
            })
            .collect()
    }

    /// Assign a conditional table directly.
    ///
    /// `probabilities` are in row-major order over [`Self::dimensions_of`]:
    /// the variable's own levels vary fastest.
    pub fn set_distribution(&mut self, id: &str, probabilities: Vec<f64>) -> Result<(), NetworkError> {
        let dimensions = self.dimensions_of(id)?;
        let table = ConditionalTable::from_distribution(dimensions, probabilities)?;
        if let Some(node) = self.graph.node_mut(id) {
            node.payload_mut().set_table(table);
        }
        Ok(())
    }

    /// Fit every table from observation rows. Row 0 is the header.
    pub fn fit<R, S>(&mut self, data: &[R], config: &FitConfig) -> Result<FitReport, FitError>
    where
        R: AsRef<[S]>,
        S: AsRef<str>,
    {
        NetworkFitter::new(config.clone()).fit::<R, S>(self, data)
    }

    /// Whether every variable has a normalized table.
    pub fn is_fitted(&self) -> bool {
        self.graph
            .nodes()
            .all(|node| node.payload().table().map_or(false, ConditionalTable::is_normalized))
    }

    pub(crate) fn install_tables(&mut self, tables: Vec<(NodeIndex, ConditionalTable)>) {
        for (idx, table) in tables {
            if let Some(node) = self.graph.node_at_mut(idx) {
                node.payload_mut().set_table(table);
            }
        }
    }

    fn clear_table(&mut self, id: &str) {
        if let Some(node) = self.graph.node_mut(id) {
            node.payload_mut().clear_table();
        }
    }
}
