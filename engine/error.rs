// ========================================================================================
//                                  Engine error taxonomy
// ========================================================================================

use std::path::PathBuf;
use thiserror::Error;

/// Every failure that stops a run before or while records are processed.
///
/// Per-record exclusions and data-check repairs are not errors. They are written to
/// the run's error log and processing continues.
#[derive(Error, Debug)]
pub enum CodError {
    #[error("Invalid parameter: {0}")]
    BadParam(String),

    #[error("Invalid SCI matrix: {0}")]
    InvalidSci(String),

    #[error("Invalid input data: {0}")]
    BadInput(String),

    #[error("The run was cancelled before record {processed} completed.")]
    RunCancelled { processed: usize },

    #[error(
        "Built-in data asset '{}' was not found. Set CAUSA_DATA_DIR to the directory holding the reference files.",
        .0.display()
    )]
    MissingAsset(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}
