use std::fmt;

/// Stages reported during a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RunStage {
    Records,
}

impl RunStage {
    pub fn describe(self) -> &'static str {
        match self {
            Self::Records => "record assignment",
        }
    }
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// Percent of `total` covered by `processed`, when the total is known.
pub fn percent_complete(processed: usize, total: Option<usize>) -> Option<f64> {
    match total {
        Some(0) => Some(100.0),
        Some(total) => Some(100.0 * processed as f64 / total as f64),
        None => None,
    }
}

/// Observer for reporting incremental progress while records are assigned.
///
/// Observers only watch. Whether one is attached never changes a run's results.
pub trait RunProgressObserver {
    fn on_stage_start(&mut self, stage: RunStage, total_records: Option<usize>) {
        let _ = (stage, total_records);
    }
    /// Called after every record, including excluded ones.
    fn on_stage_advance(&mut self, stage: RunStage, processed_records: usize, percent: Option<f64>) {
        let _ = (stage, processed_records, percent);
    }
    fn on_stage_finish(&mut self, stage: RunStage) {
        let _ = stage;
    }
}

#[derive(Default)]
pub struct NoopRunProgress;

impl RunProgressObserver for NoopRunProgress {}
