//! The individual cause-of-death table.

use crate::causes;
use crate::io::BLANK;
use crate::layout::CAUSE_COUNT;
use crate::select::ranked_causes;
use crate::types::Va5Record;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndivOptions {
    /// Number of causes per record, or 0 for every cause propensity.
    pub top: usize,
    pub include_prop: bool,
    pub groupcode: bool,
}

impl Default for IndivOptions {
    fn default() -> Self {
        Self {
            top: 3,
            include_prop: false,
            groupcode: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndivTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

pub fn indiv_prob(results: &[Va5Record], options: &IndivOptions) -> IndivTable {
    let mut buffer = ryu::Buffer::new();
    let mut columns = vec!["ID".to_string()];

    if options.top == 0 {
        columns.extend((0..CAUSE_COUNT).map(|i| causes::cause_name(i, options.groupcode)));
        let rows = results
            .iter()
            .map(|record| {
                std::iter::once(record.id.clone())
                    .chain(
                        record
                            .cause_probabilities()
                            .iter()
                            .map(|&p| buffer.format(p).to_string()),
                    )
                    .collect::<Vec<String>>()
            })
            .collect();
        return IndivTable { columns, rows };
    }

    for rank in 1..=options.top {
        columns.push(format!("CAUSE{rank}"));
        if options.include_prop {
            columns.push(format!("PROB{rank}"));
        }
    }
    let rows = results
        .iter()
        .map(|record| {
            let b = record.cause_probabilities().to_vec();
            let mut row = vec![record.id.clone()];
            for ranked in ranked_causes(&b, options.top) {
                match ranked {
                    Some((index, p)) => {
                        row.push(causes::cause_name(index, options.groupcode));
                        if options.include_prop {
                            row.push(buffer.format(p).to_string());
                        }
                    }
                    None => {
                        row.push(BLANK.to_string());
                        if options.include_prop {
                            row.push(BLANK.to_string());
                        }
                    }
                }
            }
            row
        })
        .collect();
    IndivTable { columns, rows }
}
