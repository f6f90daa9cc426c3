//! Error types for dataset loading and pipeline configuration
//!
//! Load failures abort before any computation runs. Pipeline errors abort a
//! single count request and leave the session usable.

use std::fmt;
use thiserror::Error;

/// Where a column name was referenced from, for error messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRole {
    Subject,
    ReconciledAttribute,
    Filter,
    Timepoint,
    Variable,
}

impl fmt::Display for ColumnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let role = match self {
            ColumnRole::Subject => "subject column",
            ColumnRole::ReconciledAttribute => "reconciled attribute",
            ColumnRole::Filter => "filter",
            ColumnRole::Timepoint => "timepoint column",
            ColumnRole::Variable => "variable",
        };
        f.write_str(role)
    }
}

/// Configuration errors raised while running the pipeline
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error("Unknown column '{column}' referenced as {role}")]
    UnknownColumn { column: String, role: ColumnRole },

    #[error("Invalid range for '{name}': [{lo}, {hi}] (bounds must be finite and lo <= hi)")]
    InvalidRange { name: String, lo: f64, hi: f64 },

    #[error("Duplicate timepoint bucket '{0}'")]
    DuplicateBucket(String),

    #[error("Timepoint bucket name must not be empty")]
    EmptyBucketName,

    #[error("Timepoint bucket '{0}' must define exactly one of `range` or `labels`")]
    AmbiguousBucket(String),

    #[error("Filter on '{0}' must define exactly one of `range` or `values`")]
    AmbiguousFilter(String),

    #[error("Filter on '{0}' has an empty allowed-value set")]
    EmptyValueSet(String),

    #[error("No variables selected for counting")]
    NoVariables,
}

/// Errors raised while reading a dataset into a record store
#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("Dataset file not found: {0}")]
    NotFound(String),

    #[error("Unsupported dataset format: {0} (expected .csv or .json)")]
    UnsupportedFormat(String),

    #[error("Dataset has no header row")]
    EmptyHeader,

    #[error("Duplicate column name '{0}'")]
    DuplicateColumn(String),

    #[error("Row {row} has {found} fields, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("Malformed CSV at line {line}: {reason}")]
    MalformedCsv { line: usize, reason: String },

    #[error("Invalid JSON dataset: {0}")]
    InvalidJson(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
