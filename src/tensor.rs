//! Conditional probability tables.
//!
//! A table is a flat, row-major tensor over an ordered list of dimensions:
//! the variable's parents sorted by id, then the variable itself. Because
//! the variable's own dimension is last, every parent configuration owns a
//! contiguous block of `m` cells (one per own level).
//!
//! ## States
//!
//! | State | Cells | Produced by |
//! |-------|-------|-------------|
//! | `Counts` | `u64` occurrences | [`ConditionalTable::build`] |
//! | `Distribution` | `f64` probabilities, each block on the simplex | [`ConditionalTable::normalize`], [`ConditionalTable::from_distribution`] |
//!
//! `normalize` consumes a counting table and returns a normalized one, so a
//! table can never hold counts and probabilities at once.

use serde::{Deserialize, Serialize};

use crate::estimator::NormalizationRule;
use crate::types::NodeId;

/// Tolerance for a supplied block of probabilities to count as summing to
/// one. Accepted blocks are rescaled to sum to one exactly (up to rounding).
pub const SIMPLEX_TOLERANCE: f64 = 1e-6;

/// Error type for table operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TableError {
    /// No dimensions were given.
    #[error("A table needs at least one dimension")]
    EmptyShape,
    /// A dimension has no levels.
    #[error("Dimension {0} has no levels")]
    EmptyDimension(NodeId),
    /// The product of the extents does not fit in `usize`.
    #[error("Table for {0} has too many cells")]
    ShapeTooLarge(NodeId),
    /// Coordinate length differs from the number of dimensions.
    #[error("Coordinate has {got} components, table has {expected} dimensions")]
    DimensionMismatch {
        /// Number of dimensions expected.
        expected: usize,
        /// Number of components given.
        got: usize,
    },
    /// Label is not a level of its dimension.
    #[error("Level {level:?} is not a level of {variable}")]
    UnknownLevel {
        /// Dimension variable.
        variable: NodeId,
        /// Offending label.
        level: String,
    },
    /// Level index past the end of its dimension.
    #[error("Level index {index} out of range for {variable} ({extent} levels)")]
    IndexOutOfRange {
        /// Dimension variable.
        variable: NodeId,
        /// Offending index.
        index: usize,
        /// Number of levels in the dimension.
        extent: usize,
    },
    /// Operation needs counts but the table is normalized.
    #[error("Table for {0} is already normalized")]
    NotCounting(NodeId),
    /// Operation needs probabilities but the table holds counts.
    #[error("Table for {0} holds counts, not probabilities")]
    NotNormalized(NodeId),
    /// A parent configuration has zero observations under a rejecting policy.
    #[error("Parent configuration {configuration:?} of {variable} was never observed")]
    UnobservedConfiguration {
        /// Variable whose table was normalized.
        variable: NodeId,
        /// Parent levels, in dimension order.
        configuration: Vec<String>,
    },
    /// Wrong number of cells supplied.
    #[error("Table for {variable} needs {expected} cells, got {got}")]
    CellCountMismatch {
        /// Variable of the table.
        variable: NodeId,
        /// Cells required by the shape.
        expected: usize,
        /// Cells supplied.
        got: usize,
    },
    /// A supplied block is not a probability distribution.
    #[error("Block {configuration:?} of {variable} is not a probability distribution (sum {sum})")]
    NotADistribution {
        /// Variable of the table.
        variable: NodeId,
        /// Parent levels, in dimension order.
        configuration: Vec<String>,
        /// Sum of the block.
        sum: f64,
    },
}

/// One axis of a table: a variable and its ordered levels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimension {
    /// Variable indexed by this axis.
    pub variable: NodeId,
    /// Levels of the variable, in declaration order.
    pub levels: Vec<String>,
}

impl Dimension {
    /// Create a new dimension.
    pub fn new<I, S>(variable: impl Into<NodeId>, levels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            variable: variable.into(),
            levels: levels.into_iter().map(Into::into).collect(),
        }
    }

    /// Number of levels.
    pub fn extent(&self) -> usize {
        self.levels.len()
    }

    /// Position of a label among the levels.
    pub fn position(&self, level: &str) -> Option<usize> {
        self.levels.iter().position(|l| l == level)
    }
}

/// Cell storage, tagged with the table state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", content = "cells", rename_all = "snake_case")]
pub enum TableCells {
    /// Raw occurrence counts.
    Counts(Vec<u64>),
    /// Normalized probabilities.
    Distribution(Vec<f64>),
}

/// A conditional probability table over `[parents sorted by id] ++ [self]`.
///
/// Deserialization recomputes the strides and runs the same checks as
/// [`ConditionalTable::build`] and [`ConditionalTable::from_distribution`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TableRecord")]
pub struct ConditionalTable {
    dimensions: Vec<Dimension>,
    strides: Vec<usize>,
    cells: TableCells,
}

/// Serialized form of a table; strides are derived, not trusted.
#[derive(Deserialize)]
struct TableRecord {
    dimensions: Vec<Dimension>,
    cells: TableCells,
}

impl TryFrom<TableRecord> for ConditionalTable {
    type Error = TableError;

    fn try_from(record: TableRecord) -> Result<Self, Self::Error> {
        match record.cells {
            TableCells::Distribution(probabilities) => Self::from_distribution(record.dimensions, probabilities),
            TableCells::Counts(counts) => {
                let (strides, len) = Self::layout(&record.dimensions)?;
                if counts.len() != len {
                    return Err(TableError::CellCountMismatch {
                        variable: record.dimensions[record.dimensions.len() - 1].variable.clone(),
                        expected: len,
                        got: counts.len(),
                    });
                }
                Ok(Self {
                    dimensions: record.dimensions,
                    strides,
                    cells: TableCells::Counts(counts),
                })
            }
        }
    }
}

impl ConditionalTable {
    /// Build a zeroed counting table.
    ///
    /// The last dimension is the variable the table belongs to.
    pub fn build(dimensions: Vec<Dimension>) -> Result<Self, TableError> {
        let (strides, len) = Self::layout(&dimensions)?;
        tracing::debug!(
            variable = %dimensions[dimensions.len() - 1].variable,
            rank = dimensions.len(),
            cells = len,
            "Built conditional table"
        );
        Ok(Self {
            dimensions,
            strides,
            cells: TableCells::Counts(vec![0; len]),
        })
    }

    /// Build a normalized table from probabilities given in row-major order.
    ///
    /// Every block (one per parent configuration) must hold finite,
    /// non-negative values summing to one within [`SIMPLEX_TOLERANCE`].
    /// Each accepted block is divided by its sum.
    pub fn from_distribution(dimensions: Vec<Dimension>, mut probabilities: Vec<f64>) -> Result<Self, TableError> {
        let (strides, len) = Self::layout(&dimensions)?;
        let mut table = Self {
            dimensions,
            strides,
            cells: TableCells::Counts(Vec::new()),
        };

        if probabilities.len() != len {
            return Err(TableError::CellCountMismatch {
                variable: table.variable().clone(),
                expected: len,
                got: probabilities.len(),
            });
        }

        let own = table.own_extent();
        for (block, values) in probabilities.chunks_mut(own).enumerate() {
            let sum: f64 = values.iter().sum();
            let in_range = values.iter().all(|p| p.is_finite() && *p >= 0.0);
            if !in_range || (sum - 1.0).abs() > SIMPLEX_TOLERANCE {
                return Err(TableError::NotADistribution {
                    variable: table.variable().clone(),
                    configuration: table.configuration_labels(block),
                    sum,
                });
            }
            values.iter_mut().for_each(|p| *p /= sum);
        }

        table.cells = TableCells::Distribution(probabilities);
        Ok(table)
    }

    fn layout(dimensions: &[Dimension]) -> Result<(Vec<usize>, usize), TableError> {
        if dimensions.is_empty() {
            return Err(TableError::EmptyShape);
        }
        if let Some(empty) = dimensions.iter().find(|d| d.levels.is_empty()) {
            return Err(TableError::EmptyDimension(empty.variable.clone()));
        }

        let too_large = || TableError::ShapeTooLarge(dimensions[dimensions.len() - 1].variable.clone());
        let mut strides = vec![1usize; dimensions.len()];
        for i in (0..dimensions.len() - 1).rev() {
            strides[i] = strides[i + 1]
                .checked_mul(dimensions[i + 1].extent())
                .ok_or_else(too_large)?;
        }
        let len = strides[0].checked_mul(dimensions[0].extent()).ok_or_else(too_large)?;
        Ok((strides, len))
    }

    /// Variable this table belongs to (the last dimension).
    pub fn variable(&self) -> &NodeId {
        &self.dimensions[self.dimensions.len() - 1].variable
    }

    /// All dimensions, parents first.
    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    /// Parent dimensions, sorted by id.
    pub fn parent_dimensions(&self) -> &[Dimension] {
        &self.dimensions[..self.dimensions.len() - 1]
    }

    /// Extent of every dimension.
    pub fn shape(&self) -> Vec<usize> {
        self.dimensions.iter().map(Dimension::extent).collect()
    }

    /// Number of levels of the table's own variable.
    pub fn own_extent(&self) -> usize {
        self.dimensions[self.dimensions.len() - 1].extent()
    }

    /// Number of leaf cells.
    pub fn len(&self) -> usize {
        match &self.cells {
            TableCells::Counts(c) => c.len(),
            TableCells::Distribution(p) => p.len(),
        }
    }

    /// Always false; a table has at least one cell.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of parent configurations.
    pub fn num_configurations(&self) -> usize {
        self.len() / self.own_extent()
    }

    /// Whether the table holds probabilities.
    pub fn is_normalized(&self) -> bool {
        matches!(self.cells, TableCells::Distribution(_))
    }

    /// Raw cell storage.
    pub fn cells(&self) -> &TableCells {
        &self.cells
    }

    /// Flat offset of a labelled coordinate.
    pub fn offset<S: AsRef<str>>(&self, coordinate: &[S]) -> Result<usize, TableError> {
        self.check_rank(coordinate.len())?;
        let mut offset = 0;
        for ((dim, stride), level) in self.dimensions.iter().zip(&self.strides).zip(coordinate) {
            let level = level.as_ref();
            let position = dim.position(level).ok_or_else(|| TableError::UnknownLevel {
                variable: dim.variable.clone(),
                level: level.to_string(),
            })?;
            offset += position * stride;
        }
        Ok(offset)
    }

    /// Flat offset of an index coordinate.
    pub fn offset_indices(&self, coordinate: &[usize]) -> Result<usize, TableError> {
        self.check_rank(coordinate.len())?;
        let mut offset = 0;
        for ((dim, stride), &index) in self.dimensions.iter().zip(&self.strides).zip(coordinate) {
            if index >= dim.extent() {
                return Err(TableError::IndexOutOfRange {
                    variable: dim.variable.clone(),
                    index,
                    extent: dim.extent(),
                });
            }
            offset += index * stride;
        }
        Ok(offset)
    }

    fn check_rank(&self, got: usize) -> Result<(), TableError> {
        if got != self.dimensions.len() {
            return Err(TableError::DimensionMismatch {
                expected: self.dimensions.len(),
                got,
            });
        }
        Ok(())
    }

    /// Add one observation at a labelled coordinate.
    pub fn increment<S: AsRef<str>>(&mut self, coordinate: &[S]) -> Result<(), TableError> {
        let offset = self.offset(coordinate)?;
        self.increment_at(offset)
    }

    /// Add one observation at an index coordinate.
    pub fn increment_indices(&mut self, coordinate: &[usize]) -> Result<(), TableError> {
        let offset = self.offset_indices(coordinate)?;
        self.increment_at(offset)
    }

    fn increment_at(&mut self, offset: usize) -> Result<(), TableError> {
        if let TableCells::Counts(counts) = &mut self.cells {
            counts[offset] += 1;
            return Ok(());
        }
        Err(TableError::NotCounting(self.variable().clone()))
    }

    /// Count at a labelled coordinate.
    pub fn count<S: AsRef<str>>(&self, coordinate: &[S]) -> Result<u64, TableError> {
        let offset = self.offset(coordinate)?;
        match &self.cells {
            TableCells::Counts(counts) => Ok(counts[offset]),
            TableCells::Distribution(_) => Err(TableError::NotCounting(self.variable().clone())),
        }
    }

    /// Probability at a labelled coordinate.
    pub fn probability<S: AsRef<str>>(&self, coordinate: &[S]) -> Result<f64, TableError> {
        let offset = self.offset(coordinate)?;
        match &self.cells {
            TableCells::Distribution(probs) => Ok(probs[offset]),
            TableCells::Counts(_) => Err(TableError::NotNormalized(self.variable().clone())),
        }
    }

    /// Distribution over the own levels for one parent configuration.
    ///
    /// `parents` holds one label per parent dimension, in dimension order.
    pub fn distribution<S: AsRef<str>>(&self, parents: &[S]) -> Result<&[f64], TableError> {
        let probs = match &self.cells {
            TableCells::Distribution(probs) => probs,
            TableCells::Counts(_) => return Err(TableError::NotNormalized(self.variable().clone())),
        };

        let parent_dims = self.parent_dimensions();
        if parents.len() != parent_dims.len() {
            return Err(TableError::DimensionMismatch {
                expected: self.dimensions.len(),
                got: parents.len() + 1,
            });
        }

        let mut start = 0;
        for ((dim, stride), level) in parent_dims.iter().zip(&self.strides).zip(parents) {
            let level = level.as_ref();
            let position = dim.position(level).ok_or_else(|| TableError::UnknownLevel {
                variable: dim.variable.clone(),
                level: level.to_string(),
            })?;
            start += position * stride;
        }

        Ok(&probs[start..start + self.own_extent()])
    }

    /// Parent labels of the `block`-th configuration.
    pub fn configuration_labels(&self, block: usize) -> Vec<String> {
        let offset = block * self.own_extent();
        self.parent_dimensions()
            .iter()
            .zip(&self.strides)
            .map(|(dim, stride)| dim.levels[(offset / stride) % dim.extent()].clone())
            .collect()
    }

    /// Convert counts into a distribution, one parent configuration at a time.
    ///
    /// Precondition: the table is in counting state. Normalizing an already
    /// normalized table fails with `NotCounting`.
    pub fn normalize(self, rule: &NormalizationRule) -> Result<Self, TableError> {
        let counts = match &self.cells {
            TableCells::Counts(counts) => counts,
            TableCells::Distribution(_) => return Err(TableError::NotCounting(self.variable().clone())),
        };

        let own = self.own_extent();
        let mut probabilities = Vec::with_capacity(counts.len());
        for (block, values) in counts.chunks(own).enumerate() {
            let normalized = rule.normalize_block(values).ok_or_else(|| {
                TableError::UnobservedConfiguration {
                    variable: self.variable().clone(),
                    configuration: self.configuration_labels(block),
                }
            })?;

            if values.iter().all(|v| *v == 0) {
                tracing::warn!(
                    variable = %self.variable(),
                    configuration = ?self.configuration_labels(block),
                    "Unobserved parent configuration, using the prior"
                );
            }
            probabilities.extend(normalized);
        }

        Ok(Self {
            dimensions: self.dimensions,
            strides: self.strides,
            cells: TableCells::Distribution(probabilities),
        })
    }
}
