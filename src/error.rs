//! Error types for the analytics pipeline

use thiserror::Error;

/// Data-integrity failures that abort a pipeline run
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Missing required column: {column}")]
    MissingColumn { column: String },

    #[error("Invalid timestamp in field `{field}` at row {row}: {value:?}")]
    InvalidTimestamp {
        field: &'static str,
        row: usize,
        value: String,
    },

    #[error("Empty dataset: {0}")]
    EmptyDataset(&'static str),

    #[error("Invalid bins: {0}")]
    InvalidBins(String),

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Data error: {0}")]
    Data(String),
}

impl From<polars::error::PolarsError> for PipelineError {
    fn from(err: polars::error::PolarsError) -> Self {
        PipelineError::Data(err.to_string())
    }
}
