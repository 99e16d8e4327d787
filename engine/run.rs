// ========================================================================================
//                                  The run orchestrator
// ========================================================================================
//
// A run validates the column layout once, then walks the records in input order:
// basic completeness checks, the data checker, scoring, and selection. Records that
// fail the completeness checks are logged and skipped. Nothing is shared between
// records except the read-only SCI, prior and rule set held by the engine.

use crate::check::{CheckRules, DataChecker};
use crate::error::CodError;
use crate::errorlog::{ErrorLog, ErrorLogSink, LogSection};
use crate::layout::{self, AGE_BUCKETS, LAST_INDICATOR, LEGACY_RENAMES, RECORD_LEN, SEX, SYMPTOMS};
use crate::progress::{RunProgressObserver, RunStage, percent_complete};
use crate::scoring::Scorer;
use crate::sci::{PriorVector, SciMatrix, SciSource, adjust_prior};
use crate::select;
use crate::types::{Prevalence, Va5Record, VaRecord};
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Prefix cause names with their group code when rendering.
    pub groupcode: bool,
    /// Keep every repaired record in [`RunResult::checked_data`].
    pub return_checked_data: bool,
    /// Let dont-ask rules fire on any answered indicator.
    pub insilico_check: bool,
}

/// Optional capabilities a caller can attach to a run.
#[derive(Default)]
pub struct RunHooks<'a> {
    pub progress: Option<&'a mut dyn RunProgressObserver>,
    pub cancel: Option<&'a AtomicBool>,
    pub sink: Option<&'a mut dyn ErrorLogSink>,
}

/// Why a record was left out of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exclusion {
    Age,
    Sex,
    Symptoms,
}

impl Exclusion {
    /// The first completeness check `record` fails, if any.
    pub fn find(record: &VaRecord) -> Option<Self> {
        if record.count_yes(AGE_BUCKETS) < 1 {
            Some(Self::Age)
        } else if record.count_yes(SEX) < 1 {
            Some(Self::Sex)
        } else if record.count_yes(SYMPTOMS) < 1 {
            Some(Self::Symptoms)
        } else {
            None
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Self::Age => "Error in age indicator: Not Specified",
            Self::Sex => "Error in sex indicator: Not Specified",
            Self::Symptoms => "Error in indicators: No symptoms specified",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunResult {
    /// Identifiers of the records that received an assignment, in input order.
    pub id: Vec<String>,
    pub va5: Vec<Va5Record>,
    pub malaria: Prevalence,
    pub hiv: Prevalence,
    /// Repaired records, when requested.
    pub checked_data: Option<Vec<VaRecord>>,
    pub error_log: ErrorLog,
    /// Legacy column names that were rewritten, as `(found, replacement)`.
    pub renamed_columns: Vec<(String, String)>,
    /// The input header after renames.
    pub columns: Vec<String>,
    pub groupcode: bool,
}

/// Checks the input header against the layout and applies the legacy renames.
pub fn normalize_header<S: AsRef<str>>(
    header: &[S],
) -> Result<(Vec<String>, Vec<(String, String)>), CodError> {
    let last = header.last().map(|name| name.as_ref().trim()).unwrap_or("");
    if !last.eq_ignore_ascii_case(LAST_INDICATOR) {
        return Err(CodError::BadInput(format!(
            "the last column must be '{LAST_INDICATOR}' but is '{last}'"
        )));
    }
    if header.len() != RECORD_LEN {
        return Err(CodError::BadInput(format!(
            "the input has {} columns but the SCI matrix has {RECORD_LEN} rows",
            header.len()
        )));
    }

    let mut renamed = Vec::new();
    let columns: Vec<String> = header
        .iter()
        .map(|name| {
            let name = name.as_ref().trim();
            match LEGACY_RENAMES
                .iter()
                .find(|(old, _)| name.eq_ignore_ascii_case(old))
            {
                Some(&(old, current)) => {
                    renamed.push((old.to_string(), current.to_string()));
                    current.to_string()
                }
                None => name.to_string(),
            }
        })
        .collect();

    if let Some((expected, position, found)) = layout::first_anchor_mismatch(&columns) {
        return Err(CodError::BadInput(format!(
            "column {position} must be '{expected}' but is '{}'",
            found.unwrap_or("")
        )));
    }
    for (old, current) in &renamed {
        log::info!("Renamed input column '{old}' to '{current}'");
    }
    Ok((columns, renamed))
}

/// Scores records against one SCI at fixed endemicity levels.
#[derive(Debug, Clone)]
pub struct Engine {
    sci: SciMatrix,
    prior: PriorVector,
    rules: CheckRules,
    hiv: Prevalence,
    malaria: Prevalence,
}

impl Engine {
    pub fn new(sci: SciMatrix, hiv: Prevalence, malaria: Prevalence) -> Result<Self, CodError> {
        let rules = CheckRules::compile(sci.raw());
        let prior = adjust_prior(&sci, hiv, malaria);
        log::debug!("Compiled consistency rules for {} indicators", rules.ruled_rows());
        Ok(Self {
            sci,
            prior,
            rules,
            hiv,
            malaria,
        })
    }

    pub fn sci(&self) -> &SciMatrix {
        &self.sci
    }

    pub fn prior(&self) -> &PriorVector {
        &self.prior
    }

    pub fn checker(&self, insilico: bool) -> DataChecker {
        DataChecker::new(self.rules.clone(), insilico)
    }

    /// Scores an already repaired record and selects its calls.
    pub fn assign(&self, scorer: &Scorer<'_>, cleaned: &VaRecord) -> Va5Record {
        let probs = scorer.score(cleaned);
        let selection = select::select(cleaned, &probs);
        Va5Record {
            id: cleaned.id.clone(),
            malaria: self.malaria,
            hiv: self.hiv,
            pregnancy: selection.pregnancy,
            causes: selection.causes,
            comcat: selection.comcat,
            whole_prob: probs.whole(),
            age_group: cleaned.age_group(),
            sex: cleaned.sex(),
        }
    }

    pub fn scorer(&self) -> Scorer<'_> {
        Scorer::new(&self.sci, &self.prior)
    }

    pub fn run<I>(
        &self,
        header: &[String],
        records: I,
        options: &RunOptions,
    ) -> Result<RunResult, CodError>
    where
        I: IntoIterator,
        I::Item: AsRef<[String]>,
    {
        self.run_with(header, records, options, RunHooks::default())
    }

    pub fn run_with<I>(
        &self,
        header: &[String],
        records: I,
        options: &RunOptions,
        mut hooks: RunHooks<'_>,
    ) -> Result<RunResult, CodError>
    where
        I: IntoIterator,
        I::Item: AsRef<[String]>,
    {
        let (columns, renamed_columns) = normalize_header(header)?;
        let records = records.into_iter();
        let total = match records.size_hint() {
            (lower, Some(upper)) if lower == upper => Some(lower),
            _ => None,
        };

        log::info!(
            "Starting run: HIV '{}', malaria '{}', SCI version '{}'",
            self.hiv,
            self.malaria,
            self.sci.version()
        );
        if let Some(progress) = hooks.progress.as_deref_mut() {
            progress.on_stage_start(RunStage::Records, total);
        }

        let checker = self.checker(options.insilico_check);
        let scorer = self.scorer();
        let mut error_log = ErrorLog::default();
        let mut id = Vec::new();
        let mut va5 = Vec::new();
        let mut checked_data = options.return_checked_data.then(Vec::new);
        let mut processed = 0usize;

        for row in records {
            if hooks.cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
                log::info!("Run cancelled after {processed} records");
                return Err(CodError::RunCancelled { processed });
            }

            let record = VaRecord::from_row(row.as_ref())?;
            let mut emit = |section: LogSection, line: String| {
                if let Some(sink) = hooks.sink.as_deref_mut() {
                    sink.on_line(section, &line);
                }
                error_log.push(section, line);
            };

            match Exclusion::find(&record) {
                Some(exclusion) => {
                    log::debug!("Excluding record '{}': {}", record.id, exclusion.message());
                    emit(
                        LogSection::Excluded,
                        format!("{} {}", record.id, exclusion.message()),
                    );
                }
                None => {
                    let outcome = checker.check(&record);
                    for line in outcome.first_pass {
                        emit(LogSection::FirstPass, line);
                    }
                    for line in outcome.second_pass {
                        emit(LogSection::SecondPass, line);
                    }
                    va5.push(self.assign(&scorer, &outcome.record));
                    id.push(outcome.record.id.clone());
                    if let Some(checked) = checked_data.as_mut() {
                        checked.push(outcome.record);
                    }
                }
            }

            processed += 1;
            if let Some(progress) = hooks.progress.as_deref_mut() {
                progress.on_stage_advance(
                    RunStage::Records,
                    processed,
                    percent_complete(processed, total),
                );
            }
        }

        if let Some(progress) = hooks.progress.as_deref_mut() {
            progress.on_stage_finish(RunStage::Records);
        }
        if va5.is_empty() {
            log::warn!("No valid records: none of the {processed} records could be assigned");
        } else {
            log::info!("Assigned causes to {} of {processed} records", va5.len());
        }

        Ok(RunResult {
            id,
            va5,
            malaria: self.malaria,
            hiv: self.hiv,
            checked_data,
            error_log,
            renamed_columns,
            columns,
            groupcode: options.groupcode,
        })
    }
}

/// One-call entry point: parses the endemicity levels, loads the SCI (the built-in
/// matrix when `sci` is `None`) and runs every record.
pub fn run<I>(
    header: &[String],
    records: I,
    sci: Option<&SciMatrix>,
    hiv: &str,
    malaria: &str,
    options: &RunOptions,
) -> Result<RunResult, CodError>
where
    I: IntoIterator,
    I::Item: AsRef<[String]>,
{
    let hiv = Prevalence::parse(hiv)?;
    let malaria = Prevalence::parse(malaria)?;
    let source = sci.map_or(SciSource::Builtin, SciSource::Matrix);
    Engine::new(source.load()?, hiv, malaria)?.run(header, records, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{self, RecordBuilder, SciBuilder};
    use crate::progress::NoopRunProgress;

    fn engine() -> Engine {
        let sci = SciBuilder::new().build().unwrap();
        Engine::new(sci, Prevalence::High, Prevalence::High).unwrap()
    }

    #[test]
    fn exclusions_check_age_then_sex_then_symptoms() {
        let none = RecordBuilder::new("a").yes(40).record();
        assert_eq!(Exclusion::find(&none), Some(Exclusion::Age));
        let no_sex = RecordBuilder::new("b").adult().yes(40).record();
        assert_eq!(Exclusion::find(&no_sex), Some(Exclusion::Sex));
        let no_symptom = RecordBuilder::new("c").adult().male().yes(19).record();
        assert_eq!(Exclusion::find(&no_symptom), Some(Exclusion::Symptoms));
        let valid = RecordBuilder::new("d").adult().male().yes(327).record();
        assert_eq!(Exclusion::find(&valid), None);
    }

    #[test]
    fn header_must_end_with_the_last_indicator() {
        let mut header = fixtures::header();
        header.pop();
        header.push("i458o".to_string());
        assert!(matches!(
            normalize_header(&header),
            Err(CodError::BadInput(_))
        ));

        let mut short = fixtures::header();
        short.remove(100);
        let err = normalize_header(&short).unwrap_err();
        assert!(err.to_string().contains("columns"));
    }

    #[test]
    fn legacy_column_is_renamed_and_reported() {
        let mut header = fixtures::header();
        header[120] = "I183O".to_string();
        let (columns, renamed) = normalize_header(&header).unwrap();
        assert_eq!(columns[120], "i183a");
        assert_eq!(renamed, vec![("i183o".to_string(), "i183a".to_string())]);
    }

    #[test]
    fn misplaced_anchor_is_bad_input() {
        let mut header = fixtures::header();
        header.swap(3, 4);
        assert!(matches!(
            normalize_header(&header),
            Err(CodError::BadInput(_))
        ));
    }

    #[test]
    fn excluded_records_advance_progress_but_yield_nothing() {
        struct Counter(Vec<usize>);
        impl RunProgressObserver for Counter {
            fn on_stage_advance(&mut self, stage: RunStage, processed: usize, percent: Option<f64>) {
                assert_eq!(stage, RunStage::Records);
                assert!(percent.is_some());
                self.0.push(processed);
            }
        }

        let rows = vec![
            RecordBuilder::new("ok").male().adult().yes(40).row(),
            RecordBuilder::new("T5").male().yes(40).row(),
        ];
        let mut counter = Counter(Vec::new());
        let hooks = RunHooks {
            progress: Some(&mut counter),
            ..RunHooks::default()
        };
        let result = engine()
            .run_with(&fixtures::header(), &rows, &RunOptions::default(), hooks)
            .unwrap();
        assert_eq!(result.id, vec!["ok".to_string()]);
        assert_eq!(
            result.error_log.excluded,
            vec!["T5 Error in age indicator: Not Specified".to_string()]
        );
        assert_eq!(counter.0, vec![1, 2]);
        assert!(result.checked_data.is_none());
    }

    #[test]
    fn cancellation_stops_before_the_first_record() {
        let cancel = AtomicBool::new(true);
        let mut progress = NoopRunProgress;
        let hooks = RunHooks {
            progress: Some(&mut progress),
            cancel: Some(&cancel),
            sink: None,
        };
        let rows = vec![RecordBuilder::new("x").male().adult().yes(40).row()];
        let err = engine()
            .run_with(&fixtures::header(), rows, &RunOptions::default(), hooks)
            .unwrap_err();
        assert!(matches!(err, CodError::RunCancelled { processed: 0 }));
    }

    #[test]
    fn free_function_rejects_bad_levels_before_loading() {
        let err = run(
            &fixtures::header(),
            Vec::<Vec<String>>::new(),
            None,
            "x",
            "h",
            &RunOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, CodError::BadParam(_)));
    }
}
