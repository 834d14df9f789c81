//! Error types for loading, deriving and joining datasets.

use std::path::PathBuf;

use thiserror::Error;

/// A dataset could not be loaded. Every variant names the dataset so the UI
/// can tell the user which chart is affected.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DataLoadError {
    /// The file is missing or unreadable.
    #[error("{dataset}: cannot read {path}: {source}")]
    Io {
        dataset: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The CSV reader rejected the input.
    #[error("{dataset}: malformed CSV: {source}")]
    Csv {
        dataset: String,
        #[source]
        source: csv::Error,
    },

    /// A row does not have as many fields as there are declared columns.
    #[error("{dataset}: row {row} has {found} fields, expected {expected}")]
    FieldCount {
        dataset: String,
        row: usize,
        expected: usize,
        found: usize,
    },

    /// A cell could not be coerced to its declared column type.
    #[error("{dataset}: row {row}, column '{column}': '{value}' is not a valid {expected}")]
    BadValue {
        dataset: String,
        row: usize,
        column: String,
        value: String,
        expected: &'static str,
    },

    /// A required column is not present in the source.
    #[error("{dataset}: missing column '{column}'")]
    MissingColumn { dataset: String, column: String },

    /// The Parquet reader failed.
    #[error("{dataset}: parquet error: {reason}")]
    Parquet { dataset: String, reason: String },

    /// A remote reference file could not be fetched.
    #[error("{dataset}: fetching {url} failed: {reason}")]
    Remote {
        dataset: String,
        url: String,
        reason: String,
    },

    /// The boundary file is not valid TopoJSON.
    #[error("{dataset}: invalid boundary data: {reason}")]
    Geo { dataset: String, reason: String },
}

impl DataLoadError {
    /// Name of the dataset that failed to load.
    pub fn dataset(&self) -> &str {
        match self {
            DataLoadError::Io { dataset, .. }
            | DataLoadError::Csv { dataset, .. }
            | DataLoadError::FieldCount { dataset, .. }
            | DataLoadError::BadValue { dataset, .. }
            | DataLoadError::MissingColumn { dataset, .. }
            | DataLoadError::Parquet { dataset, .. }
            | DataLoadError::Remote { dataset, .. }
            | DataLoadError::Geo { dataset, .. } => dataset,
        }
    }
}

/// A percentage change could not be computed for one entity.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ComputationError {
    #[error("{entity}: no values for year {year}")]
    MissingYear { entity: String, year: i64 },

    #[error("{entity}: baseline sum for year {year} is zero")]
    ZeroBaseline { entity: String, year: i64 },

    #[error("{entity}: percentage change is not finite")]
    NonFinite { entity: String },
}

/// A join key present on one side has no counterpart on the other.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum JoinError {
    #[error("'{key}' has no match in {dataset}")]
    MissingKey { key: String, dataset: String },
}
