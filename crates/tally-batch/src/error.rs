//! Batch error types

use std::path::PathBuf;
use tally_domain::DatasetError;
use thiserror::Error;

/// Errors that can abort a batch run
///
/// Per-page and per-document failures are not errors at this level; they
/// are recorded in the page metadata and the run summary while the batch
/// continues.
#[derive(Error, Debug)]
pub enum BatchError {
    /// The input location held nothing to process
    #[error("No documents found in {0}")]
    NoDocuments(PathBuf),

    /// The input location could not be read
    #[error("Input location error: {0}")]
    Io(#[from] std::io::Error),

    /// The dataset rejected a write; indicates an internal invariant break
    #[error("Dataset integrity error: {0}")]
    Dataset(#[from] DatasetError),

    /// The batch configuration failed validation
    #[error("Configuration error: {0}")]
    Config(String),
}
