// ========================================================================================
//                                   The run error log
// ========================================================================================

use std::fmt;
use std::io::Write;
use std::path::Path;

pub const EXCLUDED_HEADER: &str =
    "The following records are incomplete and excluded from further processing:";
pub const DISCREPANCY_HEADER: &str =
    "The following data discrepancies were identified and handled:";
pub const SECOND_PASS_HEADER: &str = "Second pass";

/// The part of the log a line belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LogSection {
    Excluded,
    FirstPass,
    SecondPass,
}

/// Receives log lines as they occur, before the run completes.
pub trait ErrorLogSink {
    fn on_line(&mut self, section: LogSection, line: &str) {
        let _ = (section, line);
    }
}

#[derive(Default)]
pub struct NoopErrorLogSink;

impl ErrorLogSink for NoopErrorLogSink {}

/// Every exclusion and repair of a run, in record order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorLog {
    pub excluded: Vec<String>,
    pub first_pass: Vec<String>,
    pub second_pass: Vec<String>,
}

impl ErrorLog {
    pub fn push(&mut self, section: LogSection, line: String) {
        match section {
            LogSection::Excluded => self.excluded.push(line),
            LogSection::FirstPass => self.first_pass.push(line),
            LogSection::SecondPass => self.second_pass.push(line),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.excluded.is_empty() && self.first_pass.is_empty() && self.second_pass.is_empty()
    }

    pub fn write_to(&self, path: &Path) -> std::io::Result<()> {
        let mut file = std::io::BufWriter::new(std::fs::File::create(path)?);
        write!(file, "{self}")?;
        file.flush()
    }
}

impl fmt::Display for ErrorLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{EXCLUDED_HEADER}")?;
        for line in &self.excluded {
            writeln!(f, "{line}")?;
        }
        writeln!(f)?;
        writeln!(f, "{DISCREPANCY_HEADER}")?;
        for line in &self.first_pass {
            writeln!(f, "{line}")?;
        }
        writeln!(f)?;
        writeln!(f, "{SECOND_PASS_HEADER}")?;
        for line in &self.second_pass {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}
