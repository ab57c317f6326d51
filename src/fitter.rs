//! Fitting conditional tables from observation rows.
//!
//! ## Algorithm
//!
//! 1. Split off the header (row 0) and map column names to positions
//! 2. Build a fresh counting table for every variable from the current
//!    structure (parents sorted by id, then the variable)
//! 3. For every variable, count every non-header row into its table
//! 4. Normalize every table with the configured rule
//! 5. Install the tables
//!
//! Nothing is installed until every step has succeeded for every variable,
//! so a failed fit leaves the network's previous tables in place.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::estimator::{Estimator, FitConfig};
use crate::network::{DiscreteBayesianNetwork, NetworkError};
use crate::tensor::{ConditionalTable, Dimension, TableError};
use crate::types::{NodeId, NodeIndex};

/// Error type for fitting.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FitError {
    /// No rows at all, not even a header.
    #[error("Dataset has no rows, not even a header")]
    EmptyDataset,
    /// A variable's column is absent from the header or from a row.
    #[error("Column {column} missing from row {row}")]
    MissingColumn {
        /// Column (variable) name.
        column: NodeId,
        /// Row number; 0 is the header.
        row: usize,
    },
    /// A row value is not a declared level.
    #[error("Row {row}: value {level:?} is not a level of {variable}")]
    UnknownLevel {
        /// Variable whose column held the value.
        variable: NodeId,
        /// Offending value.
        level: String,
        /// Row number (1-based, after the header).
        row: usize,
    },
    /// Estimator name not recognized.
    #[error("Unknown estimator: {0}")]
    UnknownEstimator(String),
    /// Imaginary sample size out of range.
    #[error("Imaginary sample size must be finite and non-negative, got {0}")]
    InvalidSampleSize(f64),
    /// Network error (e.g. a variable without levels).
    #[error(transparent)]
    Network(#[from] NetworkError),
    /// Table error (e.g. an unobserved configuration under `Reject`).
    #[error(transparent)]
    Table(#[from] TableError),
}

/// Summary of a completed fit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitReport {
    /// Estimator applied.
    pub estimator: Estimator,
    /// Observation rows counted (header excluded).
    pub rows_counted: usize,
    /// Hash of the fit parameters.
    pub params_hash: String,
    /// Hash of the network structure at fit time.
    pub structure_hash: String,
    /// Leaf cells per variable.
    pub cells: BTreeMap<String, usize>,
    /// Completion time.
    pub fitted_at: DateTime<Utc>,
}

/// Fits every conditional table of a network.
#[derive(Debug, Clone, Default)]
pub struct NetworkFitter {
    config: FitConfig,
}

impl NetworkFitter {
    /// Create a fitter with the given configuration.
    pub fn new(config: FitConfig) -> Self {
        Self { config }
    }

    /// Get the configuration.
    pub fn config(&self) -> &FitConfig {
        &self.config
    }

    /// Replace every variable's table with a zeroed counting table shaped
    /// by the current structure. All-or-nothing.
    pub fn rebuild_shapes(network: &mut DiscreteBayesianNetwork) -> Result<(), FitError> {
        let tables = Self::build_shapes(network)?;
        network.install_tables(tables);
        Ok(())
    }

    fn build_shapes(network: &DiscreteBayesianNetwork) -> Result<Vec<(NodeIndex, ConditionalTable)>, FitError> {
        let graph = network.graph();
        graph
            .indices()
            .zip(graph.nodes())
            .map(|(idx, node)| {
                let dimensions = network.dimensions_for(node)?;
                Ok((idx, ConditionalTable::build(dimensions)?))
            })
            .collect()
    }

    /// Fit every table from `data`, whose row 0 is the header.
    pub fn fit<R, S>(&self, network: &mut DiscreteBayesianNetwork, data: &[R]) -> Result<FitReport, FitError>
    where
        R: AsRef<[S]>,
        S: AsRef<str>,
    {
        let (header, rows) = data.split_first().ok_or(FitError::EmptyDataset)?;
        let columns: HashMap<&str, usize> = header
            .as_ref()
            .iter()
            .enumerate()
            .map(|(i, name)| (name.as_ref(), i))
            .collect();

        let rule = self.config.rule(rows.len())?;
        let mut tables = Self::build_shapes(network)?;

        for (_, table) in tables.iter_mut() {
            Self::count_rows::<R, S>(table, &columns, rows)?;
        }

        let fitted: Vec<(NodeIndex, ConditionalTable)> = tables
            .into_iter()
            .map(|(idx, table)| Ok((idx, table.normalize(&rule)?)))
            .collect::<Result<_, FitError>>()?;

        let cells = fitted
            .iter()
            .map(|(_, table)| (table.variable().to_string(), table.len()))
            .collect();
        network.install_tables(fitted);

        let report = FitReport {
            estimator: self.config.estimator,
            rows_counted: rows.len(),
            params_hash: self.config.params_hash(),
            structure_hash: network.graph().structure_hash(),
            cells,
            fitted_at: Utc::now(),
        };

        tracing::info!(
            estimator = %report.estimator,
            rows = report.rows_counted,
            variables = network.len(),
            params_hash = %report.params_hash,
            "Fitted network"
        );
        Ok(report)
    }

    /// Count every row into `table`.
    fn count_rows<R, S>(
        table: &mut ConditionalTable,
        columns: &HashMap<&str, usize>,
        rows: &[R],
    ) -> Result<(), FitError>
    where
        R: AsRef<[S]>,
        S: AsRef<str>,
    {
        let axes: Vec<(usize, Dimension)> = table
            .dimensions()
            .iter()
            .map(|dim| {
                columns
                    .get(dim.variable.as_str())
                    .map(|&column| (column, dim.clone()))
                    .ok_or_else(|| FitError::MissingColumn {
                        column: dim.variable.clone(),
                        row: 0,
                    })
            })
            .collect::<Result<_, _>>()?;

        let mut coordinate = vec![0; axes.len()];
        for (offset, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            let row_number = offset + 1;

            for (slot, (column, dim)) in coordinate.iter_mut().zip(&axes) {
                let value = row
                    .get(*column)
                    .ok_or_else(|| FitError::MissingColumn {
                        column: dim.variable.clone(),
                        row: row_number,
                    })?
                    .as_ref();
                *slot = dim.position(value).ok_or_else(|| FitError::UnknownLevel {
                    variable: dim.variable.clone(),
                    level: value.to_string(),
                    row: row_number,
                })?;
            }

            table.increment_indices(&coordinate)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimator::UnobservedPolicy;

    fn education_network() -> DiscreteBayesianNetwork {
        let mut network = DiscreteBayesianNetwork::from_model_string("A, S, E|A:S").unwrap();
        network
            .set_levels_many(vec![
                ("A", vec!["young", "adult", "old"]),
                ("S", vec!["M", "F"]),
                ("E", vec!["high", "uni"]),
            ])
            .unwrap();
        network
    }

    fn rows(text: &[&str]) -> Vec<Vec<String>> {
        text.iter()
            .map(|line| line.split(',').map(str::to_string).collect())
            .collect()
    }

    #[test]
    fn test_rebuild_shapes() {
        let mut network = education_network();
        NetworkFitter::rebuild_shapes(&mut network).unwrap();

        let table = network.table("E").unwrap();
        assert_eq!(table.shape(), vec![3, 2, 2]);
        assert!(!table.is_normalized());
        assert_eq!(network.table("A").unwrap().len(), 3);
    }

    #[test]
    fn test_counts_every_row() {
        let mut network = education_network();
        let data = rows(&["A,S,E", "young,M,high", "young,M,uni", "young,M,high"]);

        let report = network.fit(&data, &FitConfig::mle()).unwrap();
        assert_eq!(report.rows_counted, 3);
        assert_eq!(report.cells["E"], 12);

        let table = network.table("E").unwrap();
        let p = table.distribution(&["young", "M"]).unwrap();
        assert!((p[0] - 2.0 / 3.0).abs() < 1e-12);
        assert!((p[1] - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_column_order_independent() {
        let mut network = education_network();
        let data = rows(&["E,A,S", "uni,old,F"]);
        network.fit(&data, &FitConfig::mle()).unwrap();

        let table = network.table("E").unwrap();
        assert_eq!(table.probability(&["old", "F", "uni"]).unwrap(), 1.0);
    }

    #[test]
    fn test_empty_dataset() {
        let mut network = education_network();
        let data: Vec<Vec<String>> = Vec::new();
        assert_eq!(network.fit(&data, &FitConfig::mle()).unwrap_err(), FitError::EmptyDataset);
    }

    #[test]
    fn test_header_only_dataset() {
        let mut network = education_network();
        let data = rows(&["A,S,E"]);

        network.fit(&data, &FitConfig::mle()).unwrap();
        assert_eq!(network.table("S").unwrap().distribution::<&str>(&[]).unwrap(), &[0.5, 0.5]);

        let err = network
            .fit(&data, &FitConfig::mle().with_unobserved(UnobservedPolicy::Reject))
            .unwrap_err();
        assert!(matches!(err, FitError::Table(TableError::UnobservedConfiguration { .. })));
    }

    #[test]
    fn test_missing_column_in_header() {
        let mut network = education_network();
        let data = rows(&["A,S", "young,M"]);
        let err = network.fit(&data, &FitConfig::mle()).unwrap_err();
        assert_eq!(err, FitError::MissingColumn { column: NodeId::from("E"), row: 0 });
    }

    #[test]
    fn test_short_row() {
        let mut network = education_network();
        let data = rows(&["A,S,E", "young,M,high", "old,F"]);
        let err = network.fit(&data, &FitConfig::mle()).unwrap_err();
        assert!(matches!(err, FitError::MissingColumn { row: 2, .. }));
    }

    #[test]
    fn test_unknown_level() {
        let mut network = education_network();
        let data = rows(&["A,S,E", "young,M,phd"]);
        let err = network.fit(&data, &FitConfig::mle()).unwrap_err();
        assert_eq!(
            err,
            FitError::UnknownLevel { variable: NodeId::from("E"), level: "phd".to_string(), row: 1 }
        );
    }

    #[test]
    fn test_failed_fit_keeps_previous_tables() {
        let mut network = education_network();
        let good = rows(&["A,S,E", "young,M,high"]);
        network.fit(&good, &FitConfig::mle()).unwrap();
        let before = network.table("E").cloned();

        let bad = rows(&["A,S,E", "young,M,phd"]);
        assert!(network.fit(&bad, &FitConfig::mle()).is_err());
        assert_eq!(network.table("E").cloned(), before);
    }

    #[test]
    fn test_missing_levels() {
        let mut network = DiscreteBayesianNetwork::from_model_string("A, B|A").unwrap();
        network.set_levels("A", ["x", "y"]).unwrap();
        let err = network.fit(&rows(&["A,B"]), &FitConfig::mle()).unwrap_err();
        assert_eq!(err, FitError::Network(NetworkError::MissingLevels(NodeId::from("B"))));
    }

    #[test]
    fn test_bayes_smoothing() {
        let mut network = education_network();
        let data = rows(&["A,S,E", "young,M,high", "young,M,high", "adult,F,uni", "old,F,uni"]);
        network.fit(&data, &FitConfig::bayes(4.0)).unwrap();

        // n = 4, iss = 4: half prior, half data.
        let table = network.table("E").unwrap();
        assert_eq!(table.distribution(&["young", "M"]).unwrap(), &[0.75, 0.25]);
        // Unobserved configuration: prior.
        assert_eq!(table.distribution(&["old", "M"]).unwrap(), &[0.5, 0.5]);
        // Root: S counts M=2, F=2.
        assert_eq!(network.table("S").unwrap().distribution::<&str>(&[]).unwrap(), &[0.5, 0.5]);
    }

    #[test]
    fn test_invalid_sample_size() {
        let mut network = education_network();
        let err = network.fit(&rows(&["A,S,E"]), &FitConfig::bayes(-2.0)).unwrap_err();
        assert_eq!(err, FitError::InvalidSampleSize(-2.0));
    }
}
