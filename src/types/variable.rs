//! Categorical variables: the node payload of a discrete network.

use std::collections::BTreeSet;

use crate::tensor::ConditionalTable;

/// Error raised when a level list is not a valid outcome set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LevelError {
    /// No levels were given.
    #[error("A variable needs at least one level")]
    Empty,
    /// The same label appears twice.
    #[error("Duplicate level: {0}")]
    Duplicate(String),
}

/// A random variable over a finite, ordered set of outcome labels.
///
/// Level order is significant: it fixes the layout of every conditional
/// table the variable takes part in.
#[derive(Debug, Clone, Default)]
pub struct CategoricalVariable {
    levels: Vec<String>,
    table: Option<ConditionalTable>,
}

impl CategoricalVariable {
    /// Create a variable with no levels yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a variable with the given levels.
    pub fn with_levels<I, S>(levels: I) -> Result<Self, LevelError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut variable = Self::new();
        variable.set_levels(levels)?;
        Ok(variable)
    }

    /// Replace the levels. Discards the table, whose shape no longer matches.
    pub fn set_levels<I, S>(&mut self, levels: I) -> Result<(), LevelError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let levels: Vec<String> = levels.into_iter().map(Into::into).collect();
        if levels.is_empty() {
            return Err(LevelError::Empty);
        }

        let mut seen = BTreeSet::new();
        for level in &levels {
            if !seen.insert(level.as_str()) {
                return Err(LevelError::Duplicate(level.clone()));
            }
        }

        self.levels = levels;
        self.table = None;
        Ok(())
    }

    /// Outcome labels in declaration order.
    pub fn levels(&self) -> &[String] {
        &self.levels
    }

    /// Whether levels have been assigned.
    pub fn has_levels(&self) -> bool {
        !self.levels.is_empty()
    }

    /// Number of outcome labels.
    pub fn num_levels(&self) -> usize {
        self.levels.len()
    }

    /// Position of a label among the levels.
    pub fn level_index(&self, level: &str) -> Option<usize> {
        self.levels.iter().position(|l| l == level)
    }

    /// The conditional table, if one has been built or fitted.
    pub fn table(&self) -> Option<&ConditionalTable> {
        self.table.as_ref()
    }

    pub(crate) fn set_table(&mut self, table: ConditionalTable) {
        self.table = Some(table);
    }

    pub(crate) fn clear_table(&mut self) {
        self.table = None;
    }
}
