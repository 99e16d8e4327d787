// ========================================================================================
//                             High-Level Data Contracts
// ========================================================================================

use crate::error::CodError;
use crate::layout::{self, AGE_BUCKETS, FEMALE, MALE, RECORD_LEN};
use crate::select::{ComcatCall, PregnancyCall, TopCauses};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One answer in a VA record, after boundary normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Response {
    Yes,
    No,
    #[default]
    Missing,
}

impl Response {
    /// Maps `y`/`Y`/`1` to `Yes`, `n`/`N`/`0` to `No`, anything else to `Missing`.
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "y" | "Y" | "1" => Self::Yes,
            "n" | "N" | "0" => Self::No,
            _ => Self::Missing,
        }
    }

    /// Parses the substantive-value marker of an SCI row (`Y` or `N`).
    pub fn from_marker(raw: &str) -> Self {
        match raw.trim() {
            m if m.eq_ignore_ascii_case("y") => Self::Yes,
            m if m.eq_ignore_ascii_case("n") => Self::No,
            _ => Self::Missing,
        }
    }

    #[inline]
    pub fn is_yes(self) -> bool {
        self == Self::Yes
    }

    #[inline]
    pub fn is_missing(self) -> bool {
        self == Self::Missing
    }

    /// The code used when writing repaired records back out.
    pub fn as_code(self) -> &'static str {
        match self {
            Self::Yes => "y",
            Self::No => "n",
            Self::Missing => ".",
        }
    }
}

/// A normalized VA record.
///
/// `values` always has [`RECORD_LEN`] entries and is indexed by SCI row, so
/// `values[0]` is a placeholder for the identifier slot. The identifier itself is
/// carried in `id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaRecord {
    pub id: String,
    pub values: Vec<Response>,
}

impl VaRecord {
    /// Builds a record from one raw input row (identifier followed by 353 cells).
    ///
    /// The identifier slot is forced to `No` so that it never matches a substantive
    /// value during scoring.
    pub fn from_row<S: AsRef<str>>(row: &[S]) -> Result<Self, CodError> {
        if row.len() != RECORD_LEN {
            return Err(CodError::BadInput(format!(
                "a record has {} fields, but {} are required",
                row.len(),
                RECORD_LEN
            )));
        }
        let id = row[0].as_ref().trim().to_string();
        let mut values = Vec::with_capacity(RECORD_LEN);
        values.push(Response::No);
        values.extend(row[1..].iter().map(|cell| Response::parse(cell.as_ref())));
        Ok(Self { id, values })
    }

    /// Counts the `Yes` answers among the given positions.
    pub fn count_yes<I: IntoIterator<Item = usize>>(&self, positions: I) -> usize {
        positions
            .into_iter()
            .filter(|&position| self.values[position].is_yes())
            .count()
    }

    pub fn age_group(&self) -> AgeGroup {
        let bucket = AGE_BUCKETS.into_iter().find(|&position| self.values[position].is_yes());
        match bucket.map(|position| position - AGE_BUCKETS.start()) {
            Some(0..=2) => AgeGroup::Adult,
            Some(3..=5) => AgeGroup::Child,
            Some(6) => AgeGroup::Neonate,
            _ => AgeGroup::Unknown,
        }
    }

    pub fn sex(&self) -> Sex {
        if self.values[MALE].is_yes() {
            Sex::Male
        } else if self.values[FEMALE].is_yes() {
            Sex::Female
        } else {
            Sex::Unknown
        }
    }

    /// Renders the record the way it was read, with repaired answers written back.
    pub fn to_row(&self) -> Vec<String> {
        let mut row = Vec::with_capacity(RECORD_LEN);
        row.push(self.id.clone());
        row.extend(self.values[1..].iter().map(|v| v.as_code().to_string()));
        row
    }
}

/// Age of the decedent, collapsed from the seven questionnaire buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgeGroup {
    Adult,
    Child,
    Neonate,
    Unknown,
}

impl AgeGroup {
    pub fn parse(raw: &str) -> Result<Self, CodError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "adult" => Ok(Self::Adult),
            "child" => Ok(Self::Child),
            "neonate" => Ok(Self::Neonate),
            other => Err(CodError::BadParam(format!(
                "age group must be one of adult, child, neonate (got '{other}')"
            ))),
        }
    }
}

impl fmt::Display for AgeGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Adult => "adult",
            Self::Child => "child",
            Self::Neonate => "neonate",
            Self::Unknown => "unknown",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Male,
    Female,
    Unknown,
}

impl Sex {
    pub fn parse(raw: &str) -> Result<Self, CodError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "male" => Ok(Self::Male),
            "female" => Ok(Self::Female),
            other => Err(CodError::BadParam(format!(
                "sex must be one of male, female (got '{other}')"
            ))),
        }
    }
}

/// Endemicity level of HIV or malaria in the population the records come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Prevalence {
    High,
    Low,
    VeryLow,
}

impl Prevalence {
    /// Accepts `h`, `l`, `v` in any case, plus the spelled-out forms.
    pub fn parse(raw: &str) -> Result<Self, CodError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "h" | "high" => Ok(Self::High),
            "l" | "low" => Ok(Self::Low),
            "v" | "verylow" | "very-low" | "very_low" => Ok(Self::VeryLow),
            other => Err(CodError::BadParam(format!(
                "prevalence must be one of h, l, v (got '{other}')"
            ))),
        }
    }

    pub fn as_letter(self) -> &'static str {
        match self {
            Self::High => "h",
            Self::Low => "l",
            Self::VeryLow => "v",
        }
    }
}

impl fmt::Display for Prevalence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_letter())
    }
}

impl TryFrom<String> for Prevalence {
    type Error = CodError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Prevalence> for String {
    fn from(value: Prevalence) -> Self {
        value.as_letter().to_string()
    }
}

/// The assignment produced for one valid record.
#[derive(Debug, Clone, PartialEq)]
pub struct Va5Record {
    pub id: String,
    pub malaria: Prevalence,
    pub hiv: Prevalence,
    pub pregnancy: PregnancyCall,
    pub causes: TopCauses,
    pub comcat: ComcatCall,
    /// The 70 outcome probabilities in cause-table order.
    pub whole_prob: Array1<f64>,
    pub age_group: AgeGroup,
    pub sex: Sex,
}

impl Va5Record {
    /// The block-B slice of the whole-probability vector.
    pub fn cause_probabilities(&self) -> ndarray::ArrayView1<'_, f64> {
        self.whole_prob.slice(ndarray::s![layout::BLOCK_B])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_parse_folds_common_spellings() {
        assert_eq!(Response::parse("Y"), Response::Yes);
        assert_eq!(Response::parse(" y "), Response::Yes);
        assert_eq!(Response::parse("1"), Response::Yes);
        assert_eq!(Response::parse("N"), Response::No);
        assert_eq!(Response::parse("0"), Response::No);
        assert_eq!(Response::parse(""), Response::Missing);
        assert_eq!(Response::parse("."), Response::Missing);
        assert_eq!(Response::parse("yes"), Response::Missing);
        assert_eq!(Response::parse("2"), Response::Missing);
    }

    #[test]
    fn prevalence_parse_is_case_insensitive() {
        assert_eq!(Prevalence::parse("H").unwrap(), Prevalence::High);
        assert_eq!(Prevalence::parse("l").unwrap(), Prevalence::Low);
        assert_eq!(Prevalence::parse("Very-Low").unwrap(), Prevalence::VeryLow);
        assert!(matches!(
            Prevalence::parse("x"),
            Err(CodError::BadParam(_))
        ));
    }

    #[test]
    fn record_from_row_forces_identifier_slot_and_reads_groups() {
        let mut row = vec!["n".to_string(); RECORD_LEN];
        row[0] = "R1".to_string();
        row[FEMALE] = "y".to_string();
        row[9] = "Y".to_string();
        let record = VaRecord::from_row(&row).unwrap();
        assert_eq!(record.id, "R1");
        assert_eq!(record.values[0], Response::No);
        assert_eq!(record.sex(), Sex::Female);
        assert_eq!(record.age_group(), AgeGroup::Child);
        assert_eq!(record.to_row()[FEMALE], "y");
    }

    #[test]
    fn record_from_row_rejects_wrong_width() {
        let row = vec!["n".to_string(); RECORD_LEN - 1];
        assert!(matches!(
            VaRecord::from_row(&row),
            Err(CodError::BadInput(_))
        ));
    }
}
