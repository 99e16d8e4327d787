//! Builders for synthetic SCI matrices and VA records.
//!
//! The shipped reference matrix is large and licensed separately, so unit tests,
//! integration tests and benchmarks build small, fully controlled matrices here
//! instead. A fresh [`SciBuilder`] is neutral: every indicator row carries `I` in
//! every outcome column, so asserting it leaves the probabilities unchanged until a
//! test gives it propensities of its own.

use crate::error::CodError;
use crate::layout::{AGE_BUCKETS, FEMALE, LAST_INDICATOR, MALE, META_COLS, NEONATE, RECORD_LEN, SCI_COLS};
use crate::sci::{
    COL_ASK_IF, COL_CODE, COL_DESCRIPTION, COL_NEONATE_ONLY, COL_SUBSTANTIVE, COL_VERSION,
    COLS_DONT_ASK, SciMatrix,
};
use crate::types::{Response, VaRecord};

/// The short code the synthetic matrix uses at `position`.
pub fn indicator_code(position: usize) -> String {
    match position {
        0 => "ID".to_string(),
        1 => "i004a".to_string(),
        2 => "i004b".to_string(),
        MALE => "i019a".to_string(),
        FEMALE => "i019b".to_string(),
        5..=18 => format!("i022{}", char::from(b'a' + (position - 5) as u8)),
        19 => "i059o".to_string(),
        p if p == RECORD_LEN - 1 => LAST_INDICATOR.to_string(),
        p => format!("s{p:03}a"),
    }
}

/// Column names of an input file matching the synthetic matrix.
pub fn header() -> Vec<String> {
    (0..RECORD_LEN).map(indicator_code).collect()
}

#[derive(Debug, Clone)]
pub struct SciBuilder {
    rows: Vec<Vec<String>>,
}

impl Default for SciBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SciBuilder {
    pub fn new() -> Self {
        let mut rows = vec![vec![String::new(); SCI_COLS]; RECORD_LEN];
        rows[0][COL_VERSION] = "synthetic".to_string();
        for cell in &mut rows[0][META_COLS..] {
            *cell = "C".to_string();
        }
        for (position, row) in rows.iter_mut().enumerate().skip(1) {
            row[0] = position.to_string();
            row[COL_CODE] = indicator_code(position);
            row[COL_DESCRIPTION] = format!("indicator {position}");
            row[COL_SUBSTANTIVE] = "Y".to_string();
            for cell in &mut row[META_COLS..] {
                *cell = "I".to_string();
            }
        }
        Self { rows }
    }

    pub fn version(mut self, version: &str) -> Self {
        self.rows[0][COL_VERSION] = version.to_string();
        self
    }

    /// Sets the prior of outcome `outcome` (0..70).
    pub fn prior(mut self, outcome: usize, code: &str) -> Self {
        self.rows[0][META_COLS + outcome] = code.to_string();
        self
    }

    /// Sets the propensity of indicator `row` for outcome `outcome` (0..70).
    pub fn propensity(mut self, row: usize, outcome: usize, code: &str) -> Self {
        self.rows[row][META_COLS + outcome] = code.to_string();
        self
    }

    /// Sets every outcome column of indicator `row` to `code`.
    pub fn propensity_row(mut self, row: usize, code: &str) -> Self {
        for cell in &mut self.rows[row][META_COLS..] {
            *cell = code.to_string();
        }
        self
    }

    pub fn substantive(mut self, row: usize, marker: &str) -> Self {
        self.rows[row][COL_SUBSTANTIVE] = marker.to_string();
        self
    }

    /// Adds a dont-ask rule to `row`: when `row` holds its substantive value and
    /// indicator `reference` holds `value`, `row` is cleared.
    pub fn dont_ask(mut self, row: usize, reference: usize, value: &str) -> Self {
        let rule = format!("{}{value}", indicator_code(reference));
        let slot = COLS_DONT_ASK
            .clone()
            .find(|&col| self.rows[row][col].is_empty())
            .unwrap_or(*COLS_DONT_ASK.end());
        self.rows[row][slot] = rule;
        self
    }

    /// Sets the ask-if rule of `row`: when `row` holds its substantive value, the
    /// gate indicator `gate` is set to `value`.
    pub fn ask_if(mut self, row: usize, gate: usize, value: &str) -> Self {
        self.rows[row][COL_ASK_IF] = format!("{}{value}", indicator_code(gate));
        self
    }

    pub fn neonate_only(mut self, row: usize) -> Self {
        self.rows[row][COL_NEONATE_ONLY] = "Y".to_string();
        self
    }

    /// Overwrites a single raw cell.
    pub fn cell(mut self, row: usize, col: usize, value: &str) -> Self {
        self.rows[row][col] = value.to_string();
        self
    }

    pub fn rows(self) -> Vec<Vec<String>> {
        self.rows
    }

    pub fn build(&self) -> Result<SciMatrix, CodError> {
        SciMatrix::from_rows(&self.rows)
    }
}

/// A record in the synthetic layout. Every answer starts out missing.
#[derive(Debug, Clone)]
pub struct RecordBuilder {
    cells: Vec<String>,
}

impl RecordBuilder {
    pub fn new(id: &str) -> Self {
        let mut cells = vec![".".to_string(); RECORD_LEN];
        cells[0] = id.to_string();
        Self { cells }
    }

    pub fn answer(mut self, position: usize, value: &str) -> Self {
        self.cells[position] = value.to_string();
        self
    }

    pub fn yes(self, position: usize) -> Self {
        self.answer(position, "y")
    }

    pub fn no(self, position: usize) -> Self {
        self.answer(position, "n")
    }

    pub fn missing(self, position: usize) -> Self {
        self.answer(position, ".")
    }

    pub fn male(self) -> Self {
        self.yes(MALE)
    }

    pub fn female(self) -> Self {
        self.yes(FEMALE)
    }

    /// Asserts the youngest adult bucket.
    pub fn adult(self) -> Self {
        self.yes(*AGE_BUCKETS.start())
    }

    pub fn child(self) -> Self {
        self.yes(AGE_BUCKETS.start() + 3)
    }

    pub fn neonate(self) -> Self {
        self.yes(NEONATE)
    }

    pub fn row(self) -> Vec<String> {
        self.cells
    }

    pub fn record(&self) -> VaRecord {
        let mut values = Vec::with_capacity(RECORD_LEN);
        values.push(Response::No);
        values.extend(self.cells[1..].iter().map(|cell| Response::parse(cell)));
        VaRecord {
            id: self.cells[0].clone(),
            values,
        }
    }
}
