// ========================================================================================
//                              The fixed indicator layout
// ========================================================================================
//
// A record and the SCI matrix share one positional contract: 354 slots, where slot 0
// is the record identifier (or the prior row of the SCI) and slots 1..=353 are the
// indicators in questionnaire order. Positions are what the engine computes with, but
// the handful of positions it reasons about directly are pinned here by name and
// checked against the SCI short codes and the input header when a run starts.

use std::ops::{Range, RangeInclusive};

/// Number of slots in a record, and number of rows in the SCI matrix.
pub const RECORD_LEN: usize = 354;

/// Number of columns in the SCI matrix.
pub const SCI_COLS: usize = 87;

/// Columns 0..17 of the SCI hold metadata; the outcome columns follow.
pub const META_COLS: usize = 17;

/// Number of outcome columns (pregnancy states, causes, circumstances).
pub const OUTCOMES: usize = SCI_COLS - META_COLS;

/// Pregnancy states, within the 70-entry outcome vector.
pub const BLOCK_A: Range<usize> = 0..3;
/// Causes of death, within the 70-entry outcome vector.
pub const BLOCK_B: Range<usize> = 3..64;
/// Circumstances of mortality, within the 70-entry outcome vector.
pub const BLOCK_C: Range<usize> = 64..70;

pub const CAUSE_COUNT: usize = BLOCK_B.end - BLOCK_B.start;

/// `i019a`, the male sex indicator.
pub const MALE: usize = 3;
/// `i019b`, the female sex indicator.
pub const FEMALE: usize = 4;
/// The sex indicators, `i019a..=i019b`.
pub const SEX: RangeInclusive<usize> = MALE..=FEMALE;
/// The seven age buckets, `i022a..=i022g`.
pub const AGE_BUCKETS: RangeInclusive<usize> = 5..=11;
/// `i022g`, deaths within the first 28 days of life.
pub const NEONATE: usize = 11;
/// Female reproductive age bands, `i022l..=i022n`.
pub const REPRODUCTIVE_AGE: RangeInclusive<usize> = 16..=18;
/// Slots that count as symptoms for the "something was reported" check.
pub const SYMPTOMS: RangeInclusive<usize> = 20..=327;

/// The short code every well-formed SCI and input ends with.
pub const LAST_INDICATOR: &str = "i459o";

/// Column names from older questionnaire versions and their current spelling.
pub const LEGACY_RENAMES: &[(&str, &str)] = &[("i183o", "i183a")];

/// The named positions checked at the start of every run.
pub const ANCHORS: &[(&str, usize)] = &[
    ("i019a", MALE),
    ("i019b", FEMALE),
    ("i022a", 5),
    ("i022b", 6),
    ("i022c", 7),
    ("i022d", 8),
    ("i022e", 9),
    ("i022f", 10),
    ("i022g", NEONATE),
    (LAST_INDICATOR, RECORD_LEN - 1),
];

/// Returns the first anchor whose expected name disagrees with `names`.
///
/// `names` is indexed by position, so `names[0]` is the identifier column. Names are
/// compared case-insensitively.
pub fn first_anchor_mismatch<'a, S: AsRef<str>>(
    names: &'a [S],
) -> Option<(&'static str, usize, Option<&'a str>)> {
    ANCHORS.iter().find_map(|&(expected, position)| {
        let found = names.get(position).map(|name| name.as_ref().trim());
        match found {
            Some(name) if name.eq_ignore_ascii_case(expected) => None,
            other => Some((expected, position, other)),
        }
    })
}
