//! Tabular observation data.
//!
//! A dataset is an ordered sequence of rows of string fields; row 0 is the
//! header naming the columns. Parsing is lenient: row lengths are checked
//! by the fitter, which knows which columns each variable needs.

use std::collections::HashMap;
use std::path::Path;

/// Error type for dataset loading.
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    /// File could not be read.
    #[error("Failed to read dataset: {0}")]
    Io(#[from] std::io::Error),
}

/// Observation rows with a header row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dataset {
    rows: Vec<Vec<String>>,
}

impl Dataset {
    /// Wrap rows as given. Row 0, if any, is the header.
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    /// Parse delimited text. Fields are trimmed; blank lines are skipped.
    pub fn parse_delimited(text: &str, delimiter: char) -> Self {
        let rows = text
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| line.split(delimiter).map(|field| field.trim().to_string()).collect())
            .collect();
        Self { rows }
    }

    /// Read and parse a delimited file.
    pub fn from_path(path: impl AsRef<Path>, delimiter: char) -> Result<Self, DatasetError> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::parse_delimited(&text, delimiter))
    }

    /// All rows, header first.
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Header row, if present.
    pub fn header(&self) -> Option<&[String]> {
        self.rows.first().map(Vec::as_slice)
    }

    /// Number of observation rows (excluding the header).
    pub fn num_observations(&self) -> usize {
        self.rows.len().saturating_sub(1)
    }

    /// Whether there are no rows at all, not even a header.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Column name to position, from the header.
    pub fn column_index(&self) -> HashMap<&str, usize> {
        self.header()
            .map(|header| header.iter().enumerate().map(|(i, name)| (name.as_str(), i)).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SURVEY: &str = "A,S,E\nyoung, M ,high\nadult,F,uni\n\n";

    #[test]
    fn test_parse_delimited() {
        let data = Dataset::parse_delimited(SURVEY, ',');
        assert_eq!(data.num_observations(), 2);
        assert_eq!(data.rows()[1], vec!["young", "M", "high"]);
        assert_eq!(data.header().unwrap(), &["A", "S", "E"]);
    }

    #[test]
    fn test_column_index() {
        let data = Dataset::parse_delimited(SURVEY, ',');
        let columns = data.column_index();
        assert_eq!(columns["E"], 2);
        assert!(!columns.contains_key("T"));
    }

    #[test]
    fn test_empty_text() {
        let data = Dataset::parse_delimited("\n  \n", ',');
        assert!(data.is_empty());
        assert_eq!(data.num_observations(), 0);
        assert!(data.column_index().is_empty());
    }

    #[test]
    fn test_missing_file() {
        let err = Dataset::from_path("/nonexistent/survey.txt", ',').unwrap_err();
        assert!(matches!(err, DatasetError::Io(_)));
    }
}
