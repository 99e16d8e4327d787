//! Locating the reference data files shipped next to the crate.

use crate::error::CodError;
use std::path::{Path, PathBuf};

/// Environment variable naming the directory that holds the reference files.
pub const DATA_DIR_ENV: &str = "CAUSA_DATA_DIR";
/// The default SCI matrix.
pub const SCI_FILE: &str = "probbase.csv";
/// The sample input, used for self-tests and as the column-label reference.
pub const SAMPLE_INPUT_FILE: &str = "randomva5.csv";

pub fn data_dir() -> PathBuf {
    std::env::var_os(DATA_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| Path::new(env!("CARGO_MANIFEST_DIR")).join("data"))
}

/// Path of `name` under `dir`, failing with `MissingAsset` when it does not exist.
pub fn require_in(dir: &Path, name: &str) -> Result<PathBuf, CodError> {
    let path = dir.join(name);
    if path.is_file() {
        Ok(path)
    } else {
        Err(CodError::MissingAsset(path))
    }
}

pub fn require(name: &str) -> Result<PathBuf, CodError> {
    require_in(&data_dir(), name)
}
