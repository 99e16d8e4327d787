// ========================================================================================
//                                  The data checker
// ========================================================================================
//
// Three rule families from the SCI metadata repair a record in place:
//
// - dont-ask: an indicator that should not have been asked, given another answer,
//   is cleared.
// - ask-if: an indicator that implies a gating question forces that gate's answer.
// - neonate-only: an indicator that only applies to neonates is cleared otherwise.
//
// The checker runs exactly two passes over the record. Every decision reads the live
// record, so a repair made earlier in a pass is visible to later rows. Records are
// never rejected here.

use crate::layout::{NEONATE, RECORD_LEN};
use crate::sci::{COL_ASK_IF, COL_NEONATE_ONLY, COLS_DONT_ASK, RawSci};
use crate::types::{Response, VaRecord};
use std::collections::HashMap;

/// A reference to another indicator's answer, as written in a rule cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Condition {
    pub position: usize,
    pub value: Response,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct RowRules {
    dont_ask: Vec<Condition>,
    ask_if: Option<Condition>,
    neonate_only: bool,
}

/// The rule set of one SCI, with indicator references resolved to positions.
#[derive(Debug, Clone)]
pub struct CheckRules {
    rows: Vec<RowRules>,
    substantive: Vec<Response>,
    codes: Vec<String>,
    descriptions: Vec<String>,
}

impl CheckRules {
    /// Resolves every rule cell against the SCI's own indicator codes. A cell that
    /// does not name an indicator followed by `Y` or `N` is skipped with a warning.
    pub fn compile(raw: &RawSci) -> Self {
        let positions: HashMap<String, usize> = (1..RECORD_LEN)
            .map(|row| (raw.code(row).to_ascii_lowercase(), row))
            .collect();
        let resolve = |row: usize, col: usize| -> Option<Condition> {
            let text = raw.cell(row, col);
            if text.is_empty() {
                return None;
            }
            let condition = text
                .char_indices()
                .last()
                .and_then(|(split, _)| {
                    let value = Response::from_marker(&text[split..]);
                    let position = positions.get(&text[..split].to_ascii_lowercase())?;
                    (!value.is_missing()).then_some(Condition {
                        position: *position,
                        value,
                    })
                });
            if condition.is_none() {
                log::warn!(
                    "Ignoring rule '{text}' at SCI row {row}, column {col}: it does not name an indicator and a Y/N value"
                );
            }
            condition
        };

        let mut rows = vec![RowRules::default(); RECORD_LEN];
        for (row, rules) in rows.iter_mut().enumerate().skip(1) {
            for col in COLS_DONT_ASK {
                if let Some(condition) = resolve(row, col) {
                    rules.dont_ask.push(condition);
                }
            }
            rules.ask_if = resolve(row, COL_ASK_IF);
            rules.neonate_only = !raw.cell(row, COL_NEONATE_ONLY).is_empty();
        }

        Self {
            rows,
            substantive: (0..RECORD_LEN).map(|row| raw.substantive(row)).collect(),
            codes: (0..RECORD_LEN).map(|row| raw.code(row).to_string()).collect(),
            descriptions: (0..RECORD_LEN)
                .map(|row| raw.description(row).to_string())
                .collect(),
        }
    }

    fn label(&self, position: usize) -> String {
        format!("{} ({})", self.codes[position], self.descriptions[position])
    }

    /// Number of rows carrying at least one rule.
    pub fn ruled_rows(&self) -> usize {
        self.rows
            .iter()
            .filter(|r| !r.dont_ask.is_empty() || r.ask_if.is_some() || r.neonate_only)
            .count()
    }
}

/// Whether an answer is the indicator's substantive value. Missing never is.
#[inline]
fn holds(value: Response, substantive: Response) -> bool {
    !value.is_missing() && value == substantive
}

/// A repaired record and the repairs made in each pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOutcome {
    pub record: VaRecord,
    pub first_pass: Vec<String>,
    pub second_pass: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct DataChecker {
    rules: CheckRules,
    insilico: bool,
}

impl DataChecker {
    /// With `insilico`, a dont-ask rule fires on any answered indicator rather than
    /// only on its substantive value.
    pub fn new(rules: CheckRules, insilico: bool) -> Self {
        Self { rules, insilico }
    }

    pub fn check(&self, record: &VaRecord) -> CheckOutcome {
        let mut record = record.clone();
        let mut first_pass = Vec::new();
        let mut second_pass = Vec::new();
        self.pass(&mut record, &mut first_pass);
        self.pass(&mut record, &mut second_pass);
        CheckOutcome {
            record,
            first_pass,
            second_pass,
        }
    }

    /// One sweep over rows 1..=353, appending a message for every repair.
    pub fn pass(&self, record: &mut VaRecord, messages: &mut Vec<String>) {
        let rules = &self.rules;
        for j in 1..RECORD_LEN {
            let row = &rules.rows[j];
            let substantive = rules.substantive[j];

            for condition in &row.dont_ask {
                let value = record.values[j];
                let triggered = if self.insilico {
                    !value.is_missing()
                } else {
                    holds(value, substantive)
                };
                if triggered && record.values[condition.position] == condition.value {
                    record.values[j] = Response::Missing;
                    messages.push(format!(
                        "{}   {} value inconsistent with {} - cleared in working information",
                        record.id,
                        rules.label(j),
                        rules.label(condition.position)
                    ));
                }
            }

            if let Some(gate) = row.ask_if {
                let current = record.values[gate.position];
                if holds(record.values[j], substantive)
                    && current != gate.value
                    && current != rules.substantive[gate.position]
                {
                    record.values[gate.position] = gate.value;
                    messages.push(format!(
                        "{}   {} not flagged in category {} - updated in working information",
                        record.id,
                        rules.label(gate.position),
                        rules.label(j)
                    ));
                }
            }

            let neonate = record.values[NEONATE].is_yes();
            if row.neonate_only && holds(record.values[j], substantive) && !neonate {
                record.values[j] = Response::Missing;
                messages.push(format!(
                    "{}   {} only required for neonates - cleared in working information",
                    record.id,
                    rules.label(j)
                ));
            }
        }
    }
}
