// ========================================================================================
//                                   Run configuration
// ========================================================================================

use crate::csmf::CsmfOptions;
use crate::run::RunOptions;
use crate::types::Prevalence;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read or write configuration file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML configuration file: {0}")]
    TomlParseError(#[from] toml::de::Error),
    #[error("Failed to serialize configuration to TOML format: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),
}

/// Layout of the per-record result file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// The fixed columns only.
    Classic,
    /// The fixed columns followed by all 70 outcome probabilities.
    #[default]
    Extended,
}

/// Settings for a run and its population summary, as kept in a TOML file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub hiv: Prevalence,
    pub malaria: Prevalence,
    pub groupcode: bool,
    pub insilico_check: bool,
    pub return_checked_data: bool,
    pub output: OutputFormat,
    pub csmf_top: usize,
    pub interva_rule: bool,
    /// Directory holding the reference data files, when not the default.
    pub data_dir: Option<PathBuf>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            hiv: Prevalence::High,
            malaria: Prevalence::Low,
            groupcode: false,
            insilico_check: false,
            return_checked_data: false,
            output: OutputFormat::Extended,
            csmf_top: 10,
            interva_rule: true,
            data_dir: None,
        }
    }
}

impl RunConfig {
    /// Saves the configuration in a human-readable TOML format.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let toml_string = toml::to_string_pretty(self)?;
        let mut file = BufWriter::new(fs::File::create(path)?);
        file.write_all(toml_string.as_bytes())?;
        file.flush()?;
        Ok(())
    }

    /// Loads a configuration. Keys left out of the file keep their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let toml_string = fs::read_to_string(path)?;
        let config = toml::from_str(&toml_string)?;
        Ok(config)
    }

    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            groupcode: self.groupcode,
            return_checked_data: self.return_checked_data,
            insilico_check: self.insilico_check,
        }
    }

    pub fn csmf_options(&self) -> CsmfOptions {
        CsmfOptions {
            top: self.csmf_top,
            interva_rule: self.interva_rule,
            groupcode: self.groupcode,
            ..CsmfOptions::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_values() {
        let config = RunConfig::default();
        assert_eq!(config.hiv, Prevalence::High);
        assert_eq!(config.malaria, Prevalence::Low);
        assert_eq!(config.output, OutputFormat::Extended);
        assert_eq!(config.csmf_top, 10);
        assert!(config.interva_rule);
        assert!(!config.run_options().insilico_check);
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("causa.toml");
        let config = RunConfig {
            hiv: Prevalence::VeryLow,
            output: OutputFormat::Classic,
            csmf_top: 5,
            data_dir: Some(PathBuf::from("/srv/who")),
            ..RunConfig::default()
        };
        config.save(&path).unwrap();
        assert_eq!(RunConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn partial_files_fill_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.toml");
        fs::write(&path, "malaria = \"H\"\noutput = \"classic\"\n").unwrap();
        let config = RunConfig::load(&path).unwrap();
        assert_eq!(config.malaria, Prevalence::High);
        assert_eq!(config.output, OutputFormat::Classic);
        assert_eq!(config.hiv, Prevalence::High);
        assert_eq!(config.csmf_top, 10);
    }

    #[test]
    fn unknown_prevalence_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "hiv = \"x\"\n").unwrap();
        assert!(matches!(
            RunConfig::load(&path),
            Err(ConfigError::TomlParseError(_))
        ));
    }
}
