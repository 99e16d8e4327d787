// ========================================================================================
//                       Population cause-specific mortality fractions
// ========================================================================================

pub mod indiv;
pub mod rule;

use crate::causes::{self, UNDETERMINED};
use crate::error::CodError;
use crate::layout::CAUSE_COUNT;
use crate::types::{AgeGroup, Sex, Va5Record};

/// Causes kept per record when the threshold rule is off.
pub const TOP_N: usize = 3;
/// Relative tolerance under which fractions count as tied at the top-K boundary.
pub const TIE_RELATIVE_TOLERANCE: f64 = 1e-5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsmfOptions {
    pub top: usize,
    /// Apply the threshold rule; otherwise keep the top three causes of each record.
    pub interva_rule: bool,
    pub age: Option<AgeGroup>,
    pub sex: Option<Sex>,
    pub groupcode: bool,
}

impl Default for CsmfOptions {
    fn default() -> Self {
        Self {
            top: 10,
            interva_rule: true,
            age: None,
            sex: None,
            groupcode: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CsmfEntry {
    pub cause: String,
    pub fraction: f64,
}

/// Parses a textual top-K value. Negative and non-integer values are rejected.
pub fn parse_top(raw: &str) -> Result<usize, CodError> {
    let value: i64 = raw
        .trim()
        .parse()
        .map_err(|_| CodError::BadParam(format!("top must be an integer (got '{raw}')")))?;
    usize::try_from(value)
        .map_err(|_| CodError::BadParam(format!("top must not be negative (got {value})")))
}

/// Python-style `isclose` with a relative tolerance only.
fn is_close(a: f64, b: f64) -> bool {
    (a - b).abs() <= TIE_RELATIVE_TOLERANCE * a.abs().max(b.abs())
}

/// The first `k` entries, extended while later entries tie the `k`-th.
pub fn top_with_ties(entries: &[CsmfEntry], k: usize) -> Vec<CsmfEntry> {
    if k == 0 || entries.is_empty() {
        return Vec::new();
    }
    if k >= entries.len() {
        return entries.to_vec();
    }
    let boundary = entries[k - 1].fraction;
    let extra = entries[k..]
        .iter()
        .take_while(|e| is_close(e.fraction, boundary))
        .count();
    entries[..k + extra].to_vec()
}

/// Keeps the entries at or above the `n`-th largest value; the rest is undetermined.
fn top_n_contribution(b: &[f64], n: usize) -> rule::Contribution {
    let total: f64 = b.iter().sum();
    if total <= 0.0 {
        return rule::Contribution {
            causes: vec![0.0; b.len()],
            undetermined: 1.0,
        };
    }
    let mut sorted = b.to_vec();
    sorted.sort_unstable_by(|x, y| y.total_cmp(x));
    let nth = sorted[n.min(sorted.len()) - 1];
    let mut undetermined = 0.0;
    let causes = b
        .iter()
        .map(|&v| {
            if v >= nth {
                v
            } else {
                undetermined += v;
                0.0
            }
        })
        .collect();
    rule::Contribution {
        causes,
        undetermined,
    }
}

fn qualifies(record: &Va5Record, options: &CsmfOptions) -> bool {
    options.age.is_none_or(|age| record.age_group == age)
        && options.sex.is_none_or(|sex| record.sex == sex)
}

/// The full normalized distribution over causes and undetermined, largest first.
///
/// Causes with no mass are left out. Equal fractions keep cause-table order, with
/// undetermined last.
pub fn csmf_distribution(results: &[Va5Record], options: &CsmfOptions) -> Vec<CsmfEntry> {
    let mut totals = vec![0.0_f64; CAUSE_COUNT];
    let mut undetermined = 0.0_f64;
    let mut counted = 0usize;

    for record in results.iter().filter(|r| qualifies(r, options)) {
        let b = record.cause_probabilities().to_vec();
        let contribution = if options.interva_rule {
            rule::apply(&b)
        } else {
            top_n_contribution(&b, TOP_N)
        };
        for (total, value) in totals.iter_mut().zip(&contribution.causes) {
            *total += value;
        }
        undetermined += contribution.undetermined;
        counted += 1;
    }

    if counted == 0 {
        log::warn!("No valid records: the CSMF is empty");
        return Vec::new();
    }
    let grand_total: f64 = totals.iter().sum::<f64>() + undetermined;
    if grand_total <= 0.0 {
        return Vec::new();
    }

    let mut entries: Vec<CsmfEntry> = totals
        .iter()
        .enumerate()
        .filter(|(_, total)| **total > 0.0)
        .map(|(index, total)| CsmfEntry {
            cause: causes::cause_name(index, options.groupcode),
            fraction: total / grand_total,
        })
        .collect();
    if undetermined > 0.0 {
        entries.push(CsmfEntry {
            cause: UNDETERMINED.to_string(),
            fraction: undetermined / grand_total,
        });
    }
    entries.sort_by(|x, y| y.fraction.total_cmp(&x.fraction));
    log::debug!("CSMF over {counted} records has {} non-zero entries", entries.len());
    entries
}

/// The top-K causes of the population, ties at the K-th entry included.
pub fn csmf(results: &[Va5Record], options: &CsmfOptions) -> Vec<CsmfEntry> {
    top_with_ties(&csmf_distribution(results, options), options.top)
}

/// The CSMF of each age group, in adult, child, neonate order.
pub fn csmf_by_group(
    results: &[Va5Record],
    options: &CsmfOptions,
) -> Vec<(AgeGroup, Vec<CsmfEntry>)> {
    [AgeGroup::Adult, AgeGroup::Child, AgeGroup::Neonate]
        .into_iter()
        .map(|age| {
            let grouped = CsmfOptions {
                age: Some(age),
                ..options.clone()
            };
            (age, csmf(results, &grouped))
        })
        .collect()
}
