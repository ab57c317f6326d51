//! Compact network definitions.
//!
//! `"A, S, E|A:S, O|E, R|E, T|O:R"` declares six variables; `E|A:S` means
//! `E` has parents `A` and `S`. Whitespace is ignored. A parent must be
//! declared before the term that references it.

use std::collections::BTreeSet;

use crate::network::NetworkError;
use crate::types::NodeId;

/// Pattern for variable identifiers.
const IDENTIFIER_PATTERN: &str = r"^[A-Za-z0-9_.\-]+$";

/// Error type for model string parsing.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelStringError {
    /// Empty term between separators.
    #[error("Empty term at position {0}")]
    EmptyTerm(usize),
    /// More than one `|` in a term.
    #[error("Malformed term: {0:?}")]
    MalformedTerm(String),
    /// Identifier with forbidden characters.
    #[error("Invalid identifier: {0:?}")]
    InvalidIdentifier(String),
    /// Parent referenced before its declaration.
    #[error("Parent {parent} of {node} is not declared before it")]
    UndeclaredParent {
        /// Declared node.
        node: NodeId,
        /// Missing parent.
        parent: NodeId,
    },
    /// Building the network failed.
    #[error(transparent)]
    Network(#[from] NetworkError),
}

/// One term of a model string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeDeclaration {
    /// Declared variable.
    pub id: NodeId,
    /// Its parents, in the order written.
    pub parents: Vec<NodeId>,
}

/// Parse a model string into declarations, in order.
pub fn parse(model: &str) -> Result<Vec<NodeDeclaration>, ModelStringError> {
    let identifier = regex_lite::Regex::new(IDENTIFIER_PATTERN).unwrap();
    let compact: String = model.chars().filter(|c| !c.is_whitespace()).collect();

    let mut declared: BTreeSet<NodeId> = BTreeSet::new();
    let mut declarations = Vec::new();

    for (position, term) in compact.split(',').enumerate() {
        if term.is_empty() {
            return Err(ModelStringError::EmptyTerm(position));
        }

        let mut parts = term.split('|');
        let name = parts.next().unwrap_or_default();
        let parents = parts.next();
        if parts.next().is_some() {
            return Err(ModelStringError::MalformedTerm(term.to_string()));
        }

        if !identifier.is_match(name) {
            return Err(ModelStringError::InvalidIdentifier(name.to_string()));
        }
        let id = NodeId::from(name);

        let parents: Vec<NodeId> = match parents {
            None => Vec::new(),
            Some(list) => list
                .split(':')
                .map(|parent| {
                    if !identifier.is_match(parent) {
                        return Err(ModelStringError::InvalidIdentifier(parent.to_string()));
                    }
                    let parent = NodeId::from(parent);
                    if !declared.contains(&parent) {
                        return Err(ModelStringError::UndeclaredParent {
                            node: id.clone(),
                            parent,
                        });
                    }
                    Ok(parent)
                })
                .collect::<Result<_, _>>()?,
        };

        declared.insert(id.clone());
        declarations.push(NodeDeclaration { id, parents });
    }

    Ok(declarations)
}
