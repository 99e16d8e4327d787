// ========================================================================================
//                       The symptom-cause-information (SCI) matrix
// ========================================================================================
//
// The SCI is read once per run and never mutated afterwards. Loading splits it into
// two independent views: the raw string table, whose metadata columns drive the data
// checker, and a freshly allocated numeric matrix with the propensity codes decoded,
// which drives the scorer. The prior is derived from the numeric view and then
// adjusted for HIV and malaria endemicity.

use crate::assets;
use crate::error::CodError;
use crate::layout::{LAST_INDICATOR, META_COLS, RECORD_LEN, SCI_COLS};
use crate::types::{Prevalence, Response};
use ndarray::{Array1, Array2, ArrayView1, s};
use std::io::Read;
use std::path::Path;

/// Metadata column holding the matrix version (on row 0).
pub const COL_VERSION: usize = 2;
/// Metadata column holding the indicator short code.
pub const COL_CODE: usize = 3;
/// Metadata column holding the indicator description.
pub const COL_DESCRIPTION: usize = 4;
/// Metadata column holding the substantive value marker (`Y` or `N`).
pub const COL_SUBSTANTIVE: usize = 5;
/// Metadata columns holding up to eight dont-ask rules.
pub const COLS_DONT_ASK: std::ops::RangeInclusive<usize> = 7..=14;
/// Metadata column holding the ask-if rule.
pub const COL_ASK_IF: usize = 15;
/// Metadata column holding the neonate-only marker.
pub const COL_NEONATE_ONLY: usize = 16;

/// Decodes one qualitative propensity code.
///
/// Blank cells decode to zero. A cell that already holds a plain number (as in
/// user-supplied numeric matrices) is taken at face value. Anything else is `None`.
pub fn decode_propensity(code: &str) -> Option<f64> {
    let value = match code.trim() {
        "" => 0.0,
        "I" => 1.0,
        "A+" => 0.8,
        "A" => 0.5,
        "A-" => 0.2,
        "B+" => 0.1,
        "B" => 0.05,
        "B-" => 0.02,
        "C+" => 0.01,
        "C" => 0.005,
        "C-" => 0.002,
        "D+" => 0.001,
        "D" => 5e-4,
        "D-" => 1e-4,
        "E" => 1e-5,
        "N" => 0.0,
        other => return other.parse::<f64>().ok().filter(|v| v.is_finite() && *v >= 0.0),
    };
    Some(value)
}

/// The SCI as read, every cell a string.
#[derive(Debug, Clone)]
pub struct RawSci {
    cells: Vec<Vec<String>>,
}

impl RawSci {
    #[inline]
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.cells[row][col].trim()
    }

    /// The indicator short code of `row`.
    pub fn code(&self, row: usize) -> &str {
        self.cell(row, COL_CODE)
    }

    pub fn description(&self, row: usize) -> &str {
        self.cell(row, COL_DESCRIPTION)
    }

    /// The answer that means "present" for the indicator on `row`.
    pub fn substantive(&self, row: usize) -> Response {
        if row == 0 {
            return Response::Missing;
        }
        Response::from_marker(self.cell(row, COL_SUBSTANTIVE))
    }

    pub fn version(&self) -> &str {
        self.cell(0, COL_VERSION)
    }
}

/// A validated SCI matrix: the raw metadata table plus its decoded numeric twin.
#[derive(Debug, Clone)]
pub struct SciMatrix {
    raw: RawSci,
    numeric: Array2<f64>,
}

impl SciMatrix {
    /// Validates and decodes a 354×87 table of cells.
    pub fn from_rows<S: AsRef<str>>(rows: &[Vec<S>]) -> Result<Self, CodError> {
        if rows.len() != RECORD_LEN {
            return Err(CodError::InvalidSci(format!(
                "expected {RECORD_LEN} rows but found {}",
                rows.len()
            )));
        }
        if let Some((index, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != SCI_COLS) {
            return Err(CodError::InvalidSci(format!(
                "expected {SCI_COLS} columns but row {index} has {}",
                row.len()
            )));
        }

        let cells: Vec<Vec<String>> = rows
            .iter()
            .map(|row| row.iter().map(|c| c.as_ref().to_string()).collect())
            .collect();
        let raw = RawSci { cells };

        let last = raw.code(RECORD_LEN - 1);
        if !last.eq_ignore_ascii_case(LAST_INDICATOR) {
            return Err(CodError::InvalidSci(format!(
                "the last indicator must be '{LAST_INDICATOR}' but is '{last}'"
            )));
        }

        let mut numeric = Array2::<f64>::zeros((RECORD_LEN, SCI_COLS));
        for row in 0..RECORD_LEN {
            for col in META_COLS..SCI_COLS {
                let code = raw.cell(row, col);
                numeric[[row, col]] = decode_propensity(code).ok_or_else(|| {
                    CodError::InvalidSci(format!(
                        "unrecognized propensity code '{code}' at row {row}, column {col}"
                    ))
                })?;
            }
        }

        log::info!("Loaded SCI matrix version '{}'", raw.version());
        Ok(Self { raw, numeric })
    }

    /// Reads an SCI from CSV. The file has no header line: its first line is row 0.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, CodError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);
        let mut rows: Vec<Vec<String>> = Vec::with_capacity(RECORD_LEN);
        for record in csv_reader.records() {
            rows.push(record?.iter().map(str::to_string).collect());
        }
        Self::from_rows(&rows)
    }

    pub fn from_csv_path(path: &Path) -> Result<Self, CodError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(std::io::BufReader::new(file))
    }

    /// Loads the reference matrix shipped with the engine.
    pub fn builtin() -> Result<Self, CodError> {
        Self::from_csv_path(&assets::require(assets::SCI_FILE)?)
    }

    #[inline]
    pub fn raw(&self) -> &RawSci {
        &self.raw
    }

    /// The decoded matrix, 354×87, metadata columns zeroed.
    #[inline]
    pub fn numeric(&self) -> &Array2<f64> {
        &self.numeric
    }

    pub fn version(&self) -> &str {
        self.raw.version()
    }

    /// The outcome columns of `row`, as used by the scorer.
    #[inline]
    pub fn propensities(&self, row: usize) -> ArrayView1<'_, f64> {
        self.numeric.slice(s![row, META_COLS..])
    }
}

/// Where a run takes its SCI matrix from.
#[derive(Debug, Clone)]
pub enum SciSource<'a> {
    /// The reference matrix under the data directory.
    Builtin,
    Path(&'a Path),
    Matrix(&'a SciMatrix),
}

impl SciSource<'_> {
    pub fn load(&self) -> Result<SciMatrix, CodError> {
        match self {
            Self::Builtin => SciMatrix::builtin(),
            Self::Path(path) => SciMatrix::from_csv_path(path),
            Self::Matrix(matrix) => Ok((*matrix).clone()),
        }
    }
}

/// SCI column of the HIV/AIDS prior.
pub const HIV_PRIOR_COL: usize = 22;
/// SCI columns of the malaria-sensitive priors.
pub const MALARIA_PRIOR_COLS: [usize; 2] = [24, 44];

impl Prevalence {
    /// Prior for the HIV/AIDS column at this endemicity.
    pub fn hiv_prior(self) -> f64 {
        match self {
            Self::High => 0.05,
            Self::Low => 0.005,
            Self::VeryLow => 1e-5,
        }
    }

    /// Priors for the two malaria-sensitive columns at this endemicity.
    pub fn malaria_priors(self) -> [f64; 2] {
        match self {
            Self::High => [0.05, 0.05],
            Self::Low => [0.005, 1e-5],
            Self::VeryLow => [1e-5, 1e-5],
        }
    }
}

/// The 87-entry unconditional prior used by every record of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct PriorVector(Array1<f64>);

impl PriorVector {
    #[inline]
    pub fn as_array(&self) -> &Array1<f64> {
        &self.0
    }

    /// The 70 outcome entries.
    #[inline]
    pub fn outcomes(&self) -> ArrayView1<'_, f64> {
        self.0.slice(s![META_COLS..])
    }
}

/// Derives the prior from SCI row 0 and applies the endemicity overrides.
pub fn adjust_prior(sci: &SciMatrix, hiv: Prevalence, malaria: Prevalence) -> PriorVector {
    let mut prior = sci.numeric.row(0).to_owned();
    prior[HIV_PRIOR_COL] = hiv.hiv_prior();
    for (col, value) in MALARIA_PRIOR_COLS.into_iter().zip(malaria.malaria_priors()) {
        prior[col] = value;
    }
    PriorVector(prior)
}
