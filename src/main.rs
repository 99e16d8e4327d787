// ========================================================================================
//
//                            The causa command-line front end
//
// ========================================================================================
//
// The library never touches the terminal or picks file names; the binary does both.
// Each subcommand resolves its settings (file values first, then flags), builds an
// engine, and writes its results into the output directory.

use causa::assets::{self, SCI_FILE};
use causa::config::{OutputFormat, RunConfig};
use causa::csmf::indiv::{IndivOptions, indiv_prob};
use causa::csmf::{self, CsmfOptions};
use causa::io;
use causa::progress::{RunProgressObserver, RunStage};
use causa::run::{Engine, RunHooks};
use causa::sci::SciSource;
use causa::types::{AgeGroup, Prevalence, Sex};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::error::Error;
use std::fs;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process;

const VA5_FILE: &str = "VA5_result.csv";
const ERROR_LOG_FILE: &str = "errorlogV5.txt";
const CHECKED_DATA_FILE: &str = "checked_data.csv";
const CSMF_FILE: &str = "csmf.csv";
const INDIV_FILE: &str = "indiv_prob.csv";

// ========================================================================================
//                          Command-line interface definition
// ========================================================================================

#[derive(Parser)]
#[command(
    name = "causa",
    about = "Probabilistic cause-of-death assignment for verbal autopsy records",
    long_about = "Assigns likely causes of death, pregnancy status and circumstances of \
                 mortality to verbal autopsy records, and summarizes them as population \
                 cause-specific mortality fractions."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatCli {
    Classic,
    Extended,
}

impl From<FormatCli> for OutputFormat {
    fn from(value: FormatCli) -> Self {
        match value {
            FormatCli::Classic => OutputFormat::Classic,
            FormatCli::Extended => OutputFormat::Extended,
        }
    }
}

/// Settings shared by every subcommand that scores records.
#[derive(Args)]
struct EngineArgs {
    /// Path to the VA input CSV (header line plus one record per line)
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// TOML configuration file; flags override its values
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// SCI matrix CSV to use instead of the built-in reference matrix
    #[arg(long, value_name = "PATH")]
    sci: Option<PathBuf>,

    /// HIV endemicity: h, l or v
    #[arg(long)]
    hiv: Option<String>,

    /// Malaria endemicity: h, l or v
    #[arg(long)]
    malaria: Option<String>,

    /// Prefix cause names with their group code
    #[arg(long)]
    groupcode: bool,

    /// Directory for output files
    #[arg(long, value_name = "DIR", default_value = ".")]
    output_dir: PathBuf,
}

#[derive(Args)]
struct RunArgs {
    #[command(flatten)]
    engine: EngineArgs,

    /// Let consistency rules fire on any answered indicator
    #[arg(long)]
    insilico_check: bool,

    /// Also write the repaired records
    #[arg(long)]
    checked_data: bool,

    /// Layout of the per-record result file
    #[arg(long, value_enum)]
    format: Option<FormatCli>,

    /// Number of causes in the population summary
    #[arg(long, value_name = "K", allow_hyphen_values = true)]
    top: Option<String>,

    /// Keep the top three causes per record instead of applying the threshold rule
    #[arg(long)]
    no_interva_rule: bool,

    /// Restrict the population summary to one age group (adult, child, neonate)
    #[arg(long)]
    age: Option<String>,

    /// Restrict the population summary to one sex (male, female)
    #[arg(long)]
    sex: Option<String>,

    /// Also print the population summary of each age group
    #[arg(long)]
    by_age: bool,
}

#[derive(Args)]
struct IndivArgs {
    #[command(flatten)]
    engine: EngineArgs,

    /// Causes per record, or 0 for every cause propensity
    #[arg(long, value_name = "T", default_value = "3")]
    top: usize,

    /// Write each cause's propensity next to it
    #[arg(long)]
    include_prop: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Assign causes to every record of an input file
    #[command(about = "Assign causes of death (outputs: VA5_result.csv, errorlogV5.txt, csmf.csv)")]
    Run(RunArgs),

    /// Write the individual cause-of-death table
    #[command(about = "Write individual cause probabilities (outputs: indiv_prob.csv)")]
    Indiv(IndivArgs),

    /// Display version and build information
    #[command(about = "Display version and build information")]
    Version,
}

// ========================================================================================
//                                    Progress bar
// ========================================================================================

fn create_progress_bar(len: Option<usize>, message: &str) -> Result<ProgressBar, Box<dyn Error>> {
    let draw_target = if std::io::stderr().is_terminal() {
        ProgressDrawTarget::stderr_with_hz(20)
    } else {
        ProgressDrawTarget::hidden()
    };

    let pb = ProgressBar::with_draw_target(len.map(|n| n as u64), draw_target);
    pb.set_style(
        ProgressStyle::with_template(
            "\n> [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}",
        )?
        .progress_chars("█▉▊▋▌▍▎▏  "),
    );
    pb.set_message(message.to_string());
    Ok(pb)
}

struct BarProgress {
    bar: Option<ProgressBar>,
}

impl RunProgressObserver for BarProgress {
    fn on_stage_start(&mut self, stage: RunStage, total_records: Option<usize>) {
        match create_progress_bar(total_records, stage.describe()) {
            Ok(bar) => self.bar = Some(bar),
            Err(e) => log::warn!("Progress display unavailable: {e}"),
        }
    }

    fn on_stage_advance(&mut self, stage: RunStage, processed_records: usize, percent: Option<f64>) {
        if let Some(bar) = &self.bar {
            bar.set_position(processed_records as u64);
            if percent.is_none() {
                bar.set_message(format!("{stage}: {processed_records} records"));
            }
        }
    }

    fn on_stage_finish(&mut self, stage: RunStage) {
        if let Some(bar) = self.bar.take() {
            bar.finish_with_message(format!("{stage} complete"));
        }
    }
}

// ========================================================================================
//                              Subcommand handlers
// ========================================================================================

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let Cli { command } = Cli::parse();
    let result = match command {
        Some(Commands::Run(args)) => run_assignment(args),
        Some(Commands::Indiv(args)) => run_indiv(args),
        Some(Commands::Version) => {
            print_version_info();
            Ok(())
        }
        None => Cli::command()
            .print_help()
            .map(|()| println!())
            .map_err(Into::into),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

/// Loads the configuration file, if any, and applies the shared flags on top.
fn resolve_config(args: &EngineArgs) -> Result<RunConfig, Box<dyn Error>> {
    let mut config = match &args.config {
        Some(path) => RunConfig::load(path)?,
        None => RunConfig::default(),
    };
    if let Some(hiv) = &args.hiv {
        config.hiv = Prevalence::parse(hiv)?;
    }
    if let Some(malaria) = &args.malaria {
        config.malaria = Prevalence::parse(malaria)?;
    }
    config.groupcode |= args.groupcode;
    Ok(config)
}

fn build_engine(args: &EngineArgs, config: &RunConfig) -> Result<Engine, Box<dyn Error>> {
    let from_data_dir = match (&args.sci, &config.data_dir) {
        (None, Some(dir)) => Some(assets::require_in(dir, SCI_FILE)?),
        _ => None,
    };
    let source = match (&args.sci, &from_data_dir) {
        (Some(path), _) | (None, Some(path)) => SciSource::Path(path),
        (None, None) => SciSource::Builtin,
    };
    Ok(Engine::new(source.load()?, config.hiv, config.malaria)?)
}

fn print_summary(title: &str, entries: &[csmf::CsmfEntry]) -> Result<(), Box<dyn Error>> {
    println!("{title}");
    io::print_csmf(std::io::stdout().lock(), entries)?;
    Ok(())
}

fn run_assignment(args: RunArgs) -> Result<(), Box<dyn Error>> {
    let mut config = resolve_config(&args.engine)?;
    config.insilico_check |= args.insilico_check;
    config.return_checked_data |= args.checked_data;
    config.interva_rule &= !args.no_interva_rule;
    if let Some(format) = args.format {
        config.output = format.into();
    }
    if let Some(top) = &args.top {
        config.csmf_top = csmf::parse_top(top)?;
    }
    let csmf_options = CsmfOptions {
        age: args.age.as_deref().map(AgeGroup::parse).transpose()?,
        sex: args.sex.as_deref().map(Sex::parse).transpose()?,
        ..config.csmf_options()
    };

    let table = io::read_input(&args.engine.input)?;
    let engine = build_engine(&args.engine, &config)?;
    let mut progress = BarProgress { bar: None };
    let hooks = RunHooks {
        progress: Some(&mut progress),
        ..RunHooks::default()
    };
    let result = engine.run_with(&table.header, &table.rows, &config.run_options(), hooks)?;

    let out = &args.engine.output_dir;
    fs::create_dir_all(out)?;
    io::write_va5(&out.join(VA5_FILE), &result, config.output)?;
    result.error_log.write_to(&out.join(ERROR_LOG_FILE))?;
    if config.return_checked_data {
        io::write_checked_data(&out.join(CHECKED_DATA_FILE), &result)?;
    }

    let entries = csmf::csmf(&result.va5, &csmf_options);
    io::write_csmf(&out.join(CSMF_FILE), &entries)?;
    print_summary("Cause-specific mortality fractions:", &entries)?;
    if args.by_age {
        for (age, grouped) in csmf::csmf_by_group(&result.va5, &csmf_options) {
            print_summary(&format!("\nAge group {age}:"), &grouped)?;
        }
    }

    log::info!(
        "Wrote {} assignments to '{}'",
        result.va5.len(),
        out.join(VA5_FILE).display()
    );
    Ok(())
}

fn run_indiv(args: IndivArgs) -> Result<(), Box<dyn Error>> {
    let config = resolve_config(&args.engine)?;
    let table = io::read_input(&args.engine.input)?;
    let engine = build_engine(&args.engine, &config)?;
    let result = engine.run(&table.header, &table.rows, &config.run_options())?;

    let options = IndivOptions {
        top: args.top,
        include_prop: args.include_prop,
        groupcode: config.groupcode,
    };
    let out: &Path = &args.engine.output_dir;
    fs::create_dir_all(out)?;
    io::write_indiv(&out.join(INDIV_FILE), &indiv_prob(&result.va5, &options))?;
    log::info!("Wrote individual cause table for {} records", result.va5.len());
    Ok(())
}

/// Format seconds into a human-readable duration like "2.4 hours ago"
fn format_duration_ago(seconds: u64) -> String {
    const MINUTE: u64 = 60;
    const HOUR: u64 = 60 * MINUTE;
    const DAY: u64 = 24 * HOUR;

    if seconds < MINUTE {
        format!("{seconds} seconds ago")
    } else if seconds < HOUR {
        format!("{:.1} minutes ago", seconds as f64 / MINUTE as f64)
    } else if seconds < DAY {
        format!("{:.1} hours ago", seconds as f64 / HOUR as f64)
    } else {
        format!("{:.1} days ago", seconds as f64 / DAY as f64)
    }
}

fn print_version_info() {
    println!("causa {}", env!("CARGO_PKG_VERSION"));

    let build_timestamp: u64 = env!("CAUSA_BUILD_TIMESTAMP").parse().unwrap_or(0);
    if build_timestamp > 0 {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        println!("Built: {}", format_duration_ago(now.saturating_sub(build_timestamp)));
    }

    match assets::require(SCI_FILE) {
        Ok(path) => println!("Reference SCI: {}", path.display()),
        Err(e) => println!("Reference SCI: unavailable ({e})"),
    }
}
