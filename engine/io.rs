// ========================================================================================
//                                 Reading and writing tables
// ========================================================================================

use crate::causes::outcome_names;
use crate::config::OutputFormat;
use crate::csmf::CsmfEntry;
use crate::csmf::indiv::IndivTable;
use crate::error::CodError;
use crate::run::RunResult;
use crate::types::Va5Record;
use std::fmt;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

/// Written in place of an empty result slot.
pub const BLANK: &str = " ";

pub const VA5_COLUMNS: [&str; 15] = [
    "ID", "MALPREV", "HIVPREV", "PREGSTAT", "PREGLIK", "CAUSE1", "LIK1", "CAUSE2", "LIK2",
    "CAUSE3", "LIK3", "INDET", "COMCAT", "COMNUM", "WHOLEPROB",
];

/// A VA input file: its header line and the raw cells of every record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// The file the table was read from; `None` for tables built in memory.
    pub source: Option<PathBuf>,
}

impl InputTable {
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, CodError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);
        let header = csv_reader.headers()?.iter().map(str::to_string).collect();
        let mut rows = Vec::new();
        for record in csv_reader.records() {
            rows.push(record?.iter().map(str::to_string).collect());
        }
        Ok(Self {
            header,
            rows,
            source: None,
        })
    }
}

impl fmt::Display for InputTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(path) => write!(
                f,
                "VA input from '{}' ({} records)",
                path.display(),
                self.rows.len()
            ),
            None => write!(f, "in-memory VA input ({} records)", self.rows.len()),
        }
    }
}

pub fn read_input(path: &Path) -> Result<InputTable, CodError> {
    let file = fs::File::open(path)?;
    let mut table = InputTable::from_reader(io::BufReader::new(file))?;
    table.source = Some(path.to_path_buf());
    log::info!("Read {table}");
    Ok(table)
}

pub fn va5_header(format: OutputFormat) -> Vec<String> {
    let fixed = VA5_COLUMNS[..VA5_COLUMNS.len() - 1].iter().map(|c| c.to_string());
    match format {
        OutputFormat::Classic => fixed.collect(),
        OutputFormat::Extended => fixed.chain(outcome_names(false)).collect(),
    }
}

fn or_blank<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| BLANK.to_string(), |v| v.to_string())
}

pub fn va5_row(record: &Va5Record, format: OutputFormat, groupcode: bool) -> Vec<String> {
    let mut row = vec![
        record.id.clone(),
        record.malaria.to_string(),
        record.hiv.to_string(),
        record.pregnancy.state.label().to_string(),
        or_blank(record.pregnancy.likelihood),
    ];
    for call in &record.causes.causes {
        row.push(or_blank(call.map(|c| c.name(groupcode))));
        row.push(or_blank(call.map(|c| c.likelihood)));
    }
    row.push(record.causes.indeterminate.to_string());
    row.push(record.comcat.label().to_string());
    row.push(or_blank(record.comcat.percent));

    if format == OutputFormat::Extended {
        let mut buffer = ryu::Buffer::new();
        row.extend(record.whole_prob.iter().map(|&p| buffer.format(p).to_string()));
    }
    row
}

/// Writes `path` through a temporary sibling so that a failed write never leaves a
/// truncated file behind.
fn write_atomically<F>(path: &Path, fill: F) -> Result<(), CodError>
where
    F: FnOnce(&mut csv::Writer<io::BufWriter<fs::File>>) -> Result<(), CodError>,
{
    let temp_path = path.with_extension("tmp");
    let result = (|| -> Result<(), CodError> {
        let file = fs::File::create(&temp_path)?;
        let mut writer = csv::Writer::from_writer(io::BufWriter::new(file));
        fill(&mut writer)?;
        writer.flush()?;
        let mut inner = writer
            .into_inner()
            .map_err(|e| CodError::Io(io::Error::other(e.to_string())))?;
        inner.flush()?;
        Ok(())
    })();

    if let Err(err) = result {
        let _ = fs::remove_file(&temp_path);
        return Err(err);
    }
    fs::rename(&temp_path, path).map_err(|err| {
        let _ = fs::remove_file(&temp_path);
        CodError::Io(err)
    })
}

pub fn write_va5(path: &Path, result: &RunResult, format: OutputFormat) -> Result<(), CodError> {
    write_atomically(path, |writer| {
        writer.write_record(va5_header(format))?;
        for record in &result.va5 {
            writer.write_record(va5_row(record, format, result.groupcode))?;
        }
        Ok(())
    })
}

/// Writes the repaired records under the (renamed) input header. Does nothing when the
/// run did not keep them.
pub fn write_checked_data(path: &Path, result: &RunResult) -> Result<(), CodError> {
    let Some(checked) = &result.checked_data else {
        return Ok(());
    };
    write_atomically(path, |writer| {
        writer.write_record(&result.columns)?;
        for record in checked {
            writer.write_record(record.to_row())?;
        }
        Ok(())
    })
}

pub fn write_csmf(path: &Path, entries: &[CsmfEntry]) -> Result<(), CodError> {
    write_atomically(path, |writer| {
        let mut buffer = ryu::Buffer::new();
        writer.write_record(["cause", "fraction"])?;
        for entry in entries {
            writer.write_record([entry.cause.as_str(), buffer.format(entry.fraction)])?;
        }
        Ok(())
    })
}

pub fn write_indiv(path: &Path, table: &IndivTable) -> Result<(), CodError> {
    write_atomically(path, |writer| {
        writer.write_record(&table.columns)?;
        for row in &table.rows {
            writer.write_record(row)?;
        }
        Ok(())
    })
}

/// Renders a CSMF as aligned text, one cause per line.
pub fn format_csmf(entries: &[CsmfEntry]) -> String {
    let width = entries.iter().map(|e| e.cause.len()).max().unwrap_or(0);
    let mut out = String::new();
    for entry in entries {
        out.push_str(&format!("{:<width$}  {:.4}\n", entry.cause, entry.fraction));
    }
    out
}

/// Writes a plain-text rendering to any sink, used for terminal output.
pub fn print_csmf<W: Write>(mut sink: W, entries: &[CsmfEntry]) -> io::Result<()> {
    sink.write_all(format_csmf(entries).as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::select::{CauseCall, ComcatCall, PregnancyCall, PregnancyState, TopCauses};
    use crate::types::{AgeGroup, Prevalence, Sex};
    use ndarray::Array1;

    fn sample() -> Va5Record {
        Va5Record {
            id: "R7".to_string(),
            malaria: Prevalence::High,
            hiv: Prevalence::VeryLow,
            pregnancy: PregnancyCall {
                state: PregnancyState::NotApplicable,
                likelihood: None,
            },
            causes: TopCauses {
                causes: [
                    Some(CauseCall {
                        index: 4,
                        likelihood: 81,
                    }),
                    None,
                    None,
                ],
                indeterminate: 19,
            },
            comcat: ComcatCall {
                category: Some(0),
                percent: Some(64),
            },
            whole_prob: Array1::from_elem(70, 0.25),
            age_group: AgeGroup::Adult,
            sex: Sex::Male,
        }
    }

    #[test]
    fn classic_row_uses_single_space_blanks() {
        let row = va5_row(&sample(), OutputFormat::Classic, false);
        assert_eq!(
            row,
            vec![
                "R7", "h", "v", "n/a", " ", "Malaria", "81", " ", " ", " ", " ", "19", "Culture",
                "64"
            ]
        );
        assert_eq!(va5_header(OutputFormat::Classic).len(), row.len());
    }

    #[test]
    fn extended_row_appends_every_outcome() {
        let row = va5_row(&sample(), OutputFormat::Extended, true);
        let header = va5_header(OutputFormat::Extended);
        assert_eq!(row.len(), 14 + 70);
        assert_eq!(header.len(), row.len());
        assert_eq!(row[5], "01.05 Malaria");
        assert_eq!(row[14], "0.25");
        assert_eq!(header[14], "Not pregnant or recently delivered");
    }

    #[test]
    fn input_round_trips_through_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.csv");
        fs::write(&path, "ID,i004a,i459o\nA,y,n\nB,,.\n").unwrap();
        let table = read_input(&path).unwrap();
        assert_eq!(table.header, vec!["ID", "i004a", "i459o"]);
        assert_eq!(table.rows[1], vec!["B", "", "."]);
        assert!(table.to_string().contains("(2 records)"));

        let memory = InputTable::from_reader("ID\nx\n".as_bytes()).unwrap();
        assert_eq!(memory.to_string(), "in-memory VA input (1 records)");
    }

    #[test]
    fn csmf_file_has_a_header_and_one_line_per_cause() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("csmf.csv");
        let entries = vec![
            CsmfEntry {
                cause: "Malaria".to_string(),
                fraction: 0.75,
            },
            CsmfEntry {
                cause: "Undetermined".to_string(),
                fraction: 0.25,
            },
        ];
        write_csmf(&path, &entries).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text, "cause,fraction\nMalaria,0.75\nUndetermined,0.25\n");
        assert!(!path.with_extension("tmp").exists());
        assert!(format_csmf(&entries).starts_with("Malaria       0.7500"));
    }
}
