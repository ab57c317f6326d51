//! Core types for the network DAG.

pub mod node;
pub mod edge;
pub mod variable;

pub use node::{NodeId, NodeIndex, GraphNode};
pub use edge::Edge;
pub use variable::{CategoricalVariable, LevelError};
