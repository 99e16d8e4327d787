// ========================================================================================
//                                The per-record scorer
// ========================================================================================
//
// Scoring starts from the adjusted prior and, for every indicator the record asserts
// with its substantive value, multiplies in that indicator's SCI row. Each of the three
// outcome blocks is renormalized independently after every multiplication, so the
// order of symptoms matters only through floating-point rounding.

use crate::layout::{BLOCK_A, BLOCK_B, BLOCK_C, CAUSE_COUNT, OUTCOMES, RECORD_LEN};
use crate::sci::{PriorVector, SciMatrix};
use crate::types::{Response, VaRecord};
use ndarray::{Array1, s};
use std::ops::Range;

/// The 70 outcome probabilities of one record, split into their three blocks.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockProbabilities {
    pub a: [f64; 3],
    pub b: [f64; CAUSE_COUNT],
    pub c: [f64; 6],
}

impl BlockProbabilities {
    fn from_whole(whole: &Array1<f64>) -> Self {
        Self {
            a: block(whole, BLOCK_A),
            b: block(whole, BLOCK_B),
            c: block(whole, BLOCK_C),
        }
    }

    /// The blocks concatenated back into one 70-entry vector.
    pub fn whole(&self) -> Array1<f64> {
        self.a
            .iter()
            .chain(self.b.iter())
            .chain(self.c.iter())
            .copied()
            .collect()
    }
}

fn block<const N: usize>(whole: &Array1<f64>, range: Range<usize>) -> [f64; N] {
    std::array::from_fn(|i| whole[range.start + i])
}

/// Rescales `range` of `prob` to sum to one. A block without mass is left as is.
fn renormalize(prob: &mut Array1<f64>, range: Range<usize>) {
    let mut view = prob.slice_mut(s![range]);
    let total = view.sum();
    if total > 0.0 {
        view.mapv_inplace(|v| v / total);
    }
}

pub struct Scorer<'a> {
    sci: &'a SciMatrix,
    prior: &'a PriorVector,
    substantive: Vec<Response>,
}

impl<'a> Scorer<'a> {
    pub fn new(sci: &'a SciMatrix, prior: &'a PriorVector) -> Self {
        let substantive = (0..RECORD_LEN).map(|j| sci.raw().substantive(j)).collect();
        Self {
            sci,
            prior,
            substantive,
        }
    }

    /// Marks each position where the record holds the indicator's substantive value.
    /// Missing answers never match.
    pub fn new_input(&self, record: &VaRecord) -> Vec<bool> {
        record
            .values
            .iter()
            .zip(&self.substantive)
            .map(|(value, substantive)| !value.is_missing() && value == substantive)
            .collect()
    }

    pub fn score(&self, record: &VaRecord) -> BlockProbabilities {
        let mut prob: Array1<f64> = self.prior.outcomes().to_owned();
        for (j, asserted) in self.new_input(record).into_iter().enumerate() {
            if !asserted {
                continue;
            }
            prob *= &self.sci.propensities(j);
            for range in [BLOCK_A, BLOCK_B, BLOCK_C] {
                renormalize(&mut prob, range);
            }
        }

        for (name, range) in [("A", BLOCK_A), ("B", BLOCK_B), ("C", BLOCK_C)] {
            if prob.slice(s![range]).sum() <= 0.0 {
                log::debug!(
                    "Record '{}': block {} has no probability mass and is treated as indeterminate",
                    record.id,
                    name
                );
            }
        }
        debug_assert_eq!(prob.len(), OUTCOMES);
        BlockProbabilities::from_whole(&prob)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{RecordBuilder, SciBuilder};
    use crate::sci::adjust_prior;
    use crate::types::Prevalence;
    use approx::assert_abs_diff_eq;

    #[test]
    fn blocks_sum_to_one_after_scoring() {
        let sci = SciBuilder::new()
            .propensity_row(40, "E")
            .propensity(40, BLOCK_B.start + 12, "I")
            .propensity(40, 1, "A")
            .build()
            .unwrap();
        let prior = adjust_prior(&sci, Prevalence::High, Prevalence::Low);
        let record = RecordBuilder::new("r").male().adult().yes(40).record();
        let probs = Scorer::new(&sci, &prior).score(&record);

        assert_abs_diff_eq!(probs.a.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(probs.b.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(probs.c.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
        assert!(probs.b[12] > 0.5);
        assert_eq!(probs.whole().len(), OUTCOMES);
    }

    #[test]
    fn missing_and_non_substantive_answers_are_ignored() {
        let sci = SciBuilder::new()
            .propensity_row(40, "E")
            .propensity(40, BLOCK_B.start, "I")
            .substantive(41, "N")
            .propensity_row(41, "E")
            .propensity(41, BLOCK_B.start + 1, "I")
            .build()
            .unwrap();
        let prior = adjust_prior(&sci, Prevalence::Low, Prevalence::Low);
        let scorer = Scorer::new(&sci, &prior);

        let baseline = scorer.score(&RecordBuilder::new("b").male().adult().yes(20).record());
        let missing = scorer.score(
            &RecordBuilder::new("m")
                .male()
                .adult()
                .yes(20)
                .missing(40)
                .yes(41)
                .record(),
        );
        assert_eq!(baseline, missing);

        let input = scorer.new_input(&RecordBuilder::new("x").no(41).missing(40).record());
        assert!(input[41]);
        assert!(!input[40]);
        assert!(!input[0]);
    }

    #[test]
    fn degenerate_block_stays_at_zero() {
        let sci = SciBuilder::new()
            .propensity_row(40, "N")
            .propensity(40, BLOCK_B.start + 3, "I")
            .build()
            .unwrap();
        let prior = adjust_prior(&sci, Prevalence::High, Prevalence::High);
        let record = RecordBuilder::new("z").female().adult().yes(40).record();
        let probs = Scorer::new(&sci, &prior).score(&record);
        assert!(probs.a.iter().all(|&v| v == 0.0));
        assert!(probs.c.iter().all(|&v| v == 0.0));
        assert_abs_diff_eq!(probs.b[3], 1.0);
    }
}
