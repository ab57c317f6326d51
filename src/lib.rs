//! # discrete-bayesnet
//!
//! Discrete Bayesian networks fitted from tabular observations.
//!
//! The crate answers one question:
//!
//! > Given a DAG of categorical variables and rows of observations, what is
//! > each variable's distribution under every configuration of its parents?
//!
//! ## Core Contract
//!
//! 1. Arcs are inserted one at a time; an arc that would close a cycle is
//!    rejected and the graph is left exactly as it was
//! 2. Markov blankets are cached and never stale
//! 3. Each variable's conditional table is shaped by its parents (sorted by
//!    id) and itself, and is either counting or normalized, never both
//!
//! ## Architecture
//!
//! ```text
//! Model string → DiscreteBayesianNetwork (DirectedGraph<CategoricalVariable>)
//!                          ↓
//! Dataset rows → NetworkFitter → ConditionalTable (Counts → Distribution)
//!                     ↑
//!                 FitConfig (mle | bayes + iss)
//! ```
//!
//! ## Determinism Guarantees
//!
//! - Table dimensions are ordered by parent id, then the variable itself
//! - Arcs are listed in canonical (parent, child) order
//! - Same structure + same config → same `structure_hash` and `params_hash`

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod types;
pub mod graph;
pub mod tensor;
pub mod estimator;
pub mod network;
pub mod fitter;
pub mod dataset;
pub mod model_string;
pub mod canonical;

// Re-exports
pub use types::{NodeId, NodeIndex, GraphNode, Edge, CategoricalVariable, LevelError};
pub use graph::{DirectedGraph, GraphError};
pub use tensor::{ConditionalTable, Dimension, TableCells, TableError, SIMPLEX_TOLERANCE};
pub use estimator::{Estimator, UnobservedPolicy, FitConfig, NormalizationRule};
pub use estimator::config::DEFAULT_ISS;
pub use network::{DiscreteBayesianNetwork, NetworkError};
pub use fitter::{NetworkFitter, FitError, FitReport};
pub use dataset::{Dataset, DatasetError};
pub use model_string::{NodeDeclaration, ModelStringError};
pub use canonical::{to_canonical_bytes, canonical_hash, canonical_hash_hex};
