// ========================================================================================
//                        Turning block probabilities into calls
// ========================================================================================

use crate::causes::{self, MULTIPLE};
use crate::layout::{FEMALE, REPRODUCTIVE_AGE};
use crate::scoring::BlockProbabilities;
use crate::types::VaRecord;

/// Below this, the top cause is not reported at all.
pub const CAUSE_THRESHOLD: f64 = 0.4;
/// Secondary causes must reach this fraction of the top cause.
pub const SECONDARY_RATIO: f64 = 0.5;
/// Below this, the pregnancy state is indeterminate.
pub const PREGNANCY_THRESHOLD: f64 = 0.1;
/// Below this, no single circumstance category dominates.
pub const COMCAT_THRESHOLD: f64 = 0.5;
/// Number of causes reported per record.
pub const REPORTED_CAUSES: usize = 3;

/// Integer percent, rounding halves to even.
#[inline]
pub fn percent(p: f64) -> u32 {
    (100.0 * p).round_ties_even() as u32
}

/// Index of the first entry achieving the maximum, with that maximum.
pub fn argmax_first(values: &[f64]) -> Option<(usize, f64)> {
    values.iter().copied().enumerate().fold(None, |best, (i, v)| match best {
        Some((_, bv)) if v <= bv => best,
        _ => Some((i, v)),
    })
}

pub fn is_reproductive_age(record: &VaRecord) -> bool {
    record.values[FEMALE].is_yes() && record.count_yes(REPRODUCTIVE_AGE) > 0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PregnancyState {
    NotApplicable,
    Indeterminate,
    NotPregnant,
    RecentlyDelivered,
    Pregnant,
}

impl PregnancyState {
    fn from_index(index: usize) -> Self {
        match index {
            0 => Self::NotPregnant,
            1 => Self::RecentlyDelivered,
            _ => Self::Pregnant,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::NotApplicable => "n/a",
            Self::Indeterminate => "indeterminate",
            Self::NotPregnant => causes::pregnancy_name(0),
            Self::RecentlyDelivered => causes::pregnancy_name(1),
            Self::Pregnant => causes::pregnancy_name(2),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PregnancyCall {
    pub state: PregnancyState,
    pub likelihood: Option<u32>,
}

/// One reported cause: its index within block B and its integer percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CauseCall {
    pub index: usize,
    pub likelihood: u32,
}

impl CauseCall {
    pub fn name(&self, groupcode: bool) -> String {
        causes::cause_name(self.index, groupcode)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopCauses {
    pub causes: [Option<CauseCall>; REPORTED_CAUSES],
    /// 100 minus the reported likelihoods. Rounding can push this below zero.
    pub indeterminate: i32,
}

impl TopCauses {
    pub fn reported(&self) -> impl Iterator<Item = &CauseCall> {
        self.causes.iter().flatten()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComcatCall {
    /// Index within block C, or `None` when several categories share the mass.
    pub category: Option<usize>,
    pub percent: Option<u32>,
}

impl ComcatCall {
    pub fn label(&self) -> &'static str {
        self.category.map_or(MULTIPLE, causes::circumstance_name)
    }
}

/// Everything the selector decides for one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub pregnancy: PregnancyCall,
    pub causes: TopCauses,
    pub comcat: ComcatCall,
}

pub fn select(record: &VaRecord, probs: &BlockProbabilities) -> Selection {
    Selection {
        pregnancy: pregnancy(&probs.a, is_reproductive_age(record)),
        causes: top_causes(&probs.b),
        comcat: comcat(&probs.c),
    }
}

pub fn pregnancy(a: &[f64], reproductive_age: bool) -> PregnancyCall {
    let total: f64 = a.iter().sum();
    if total <= 0.0 || !reproductive_age {
        return PregnancyCall {
            state: PregnancyState::NotApplicable,
            likelihood: None,
        };
    }
    match argmax_first(a) {
        Some((index, max)) if max >= PREGNANCY_THRESHOLD => PregnancyCall {
            state: PregnancyState::from_index(index),
            likelihood: Some(percent(max / total)),
        },
        _ => PregnancyCall {
            state: PregnancyState::Indeterminate,
            likelihood: None,
        },
    }
}

/// The `count` highest causes in rank order, each with its raw probability.
///
/// Every slot is `None` when the top cause is below [`CAUSE_THRESHOLD`]; otherwise a
/// slot is `None` once its cause falls below [`SECONDARY_RATIO`] of the top cause.
/// Ties resolve to the lower index.
pub fn ranked_causes(b: &[f64], count: usize) -> Vec<Option<(usize, f64)>> {
    let mut ranked = vec![None; count];
    let Some((first, top)) = argmax_first(b) else {
        return ranked;
    };
    if top < CAUSE_THRESHOLD {
        return ranked;
    }

    let mut remaining = b.to_vec();
    let mut next = Some((first, top));
    for slot in ranked.iter_mut() {
        let Some((index, value)) = next else { break };
        if value < SECONDARY_RATIO * top {
            break;
        }
        *slot = Some((index, value));
        remaining[index] = f64::NEG_INFINITY;
        next = argmax_first(&remaining).filter(|(_, v)| v.is_finite());
    }
    ranked
}

pub fn top_causes(b: &[f64]) -> TopCauses {
    let mut causes = [None; REPORTED_CAUSES];
    for (slot, ranked) in causes.iter_mut().zip(ranked_causes(b, REPORTED_CAUSES)) {
        *slot = ranked.map(|(index, value)| CauseCall {
            index,
            likelihood: percent(value),
        });
    }
    let reported: i32 = causes.iter().flatten().map(|c| c.likelihood as i32).sum();
    TopCauses {
        causes,
        indeterminate: 100 - reported,
    }
}

pub fn comcat(c: &[f64]) -> ComcatCall {
    let total: f64 = c.iter().sum();
    let normalized: Vec<f64> = if total > 0.0 {
        c.iter().map(|v| v / total).collect()
    } else {
        c.to_vec()
    };
    match argmax_first(&normalized) {
        Some((index, max)) if max >= COMCAT_THRESHOLD => ComcatCall {
            category: Some(index),
            percent: Some(percent(max)),
        },
        _ => ComcatCall {
            category: None,
            percent: None,
        },
    }
}
