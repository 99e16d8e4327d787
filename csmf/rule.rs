// ========================================================================================
//                        The threshold rule, in exact decimal arithmetic
// ========================================================================================
//
// Whether an entry sits exactly on the cutoff decides whether its mass is reported or
// moved to undetermined, so the cutoff is formed and compared in `Decimal`. Binary
// floats cannot express the boundary tolerance at all.

use crate::select::CAUSE_THRESHOLD;
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};

/// Subtracted from the cutoff before comparing, 1e-15.
fn cutoff_epsilon() -> Decimal {
    Decimal::new(1, 15)
}

/// Ten times the tie tolerance of 4e-29, which is below `Decimal`'s finest step.
fn scaled_tie_tolerance() -> Decimal {
    Decimal::new(4, 28)
}

fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default()
}

/// Whether `value` falls to undetermined against the adjusted cutoff. Values within
/// the tie tolerance of the cutoff count as below it.
fn falls_below(value: Decimal, adjusted: Decimal) -> bool {
    value < adjusted || (value - adjusted).abs() * Decimal::TEN < scaled_tie_tolerance()
}

/// What one record adds to the population totals.
#[derive(Debug, Clone, PartialEq)]
pub struct Contribution {
    /// Retained mass per cause, indexed like block B.
    pub causes: Vec<f64>,
    pub undetermined: f64,
}

/// The cutoff below which a cause's mass is not attributed to it.
pub fn cutoff(b: &[f64]) -> Decimal {
    let mut sorted: Vec<Decimal> = b.iter().map(|&v| to_decimal(v)).collect();
    sorted.sort_unstable_by(|x, y| y.cmp(x));
    let nth = |i: usize| sorted.get(i).copied().unwrap_or(Decimal::ZERO);
    let half = nth(0) / Decimal::TWO;
    nth(2).max(half).min(nth(1).max(half))
}

/// Applies the threshold rule to one record's block-B probabilities.
pub fn apply(b: &[f64]) -> Contribution {
    let max = b.iter().copied().fold(0.0_f64, f64::max);
    if max < CAUSE_THRESHOLD {
        let total: f64 = b.iter().sum();
        return Contribution {
            causes: vec![0.0; b.len()],
            undetermined: if total > 0.0 { total } else { 1.0 },
        };
    }

    let adjusted = cutoff(b) - cutoff_epsilon();
    let mut undetermined = Decimal::ZERO;
    let causes = b
        .iter()
        .map(|&v| {
            let value = to_decimal(v);
            if falls_below(value, adjusted) {
                undetermined += value;
                0.0
            } else {
                v
            }
        })
        .collect();
    Contribution {
        causes,
        undetermined: undetermined.to_f64().unwrap_or_default(),
    }
}
