//! Relative usage of a set of terms across a corpus of dated documents
//!
//! Every document in the corpus directory whose file name contains a year is
//! scanned for the requested terms, and the share of each year's documents
//! which contain each term is written down as a CSV table.

mod config;
mod corpus;
mod progress;
mod prompt;
mod report;
mod scan;
mod stats;

use crate::{
    config::{Config, UnreadablePolicy},
    progress::ProgressReport,
    report::Report,
};
use anyhow::Context;
use clap::Parser;
use log::LevelFilter;
use std::{
    fs,
    num::NonZeroUsize,
    path::{Path, PathBuf},
    sync::Arc,
};

/// Scan a corpus of documents for specified terms and generate a CSV file of
/// their frequency for each year
///
/// The year of a document is the first group of 4 digits in its file name.
/// Documents whose name contains no such group are ignored. The frequency of
/// a term on a given year is the percentage of that year's documents which
/// contain the term at least once, regardless of case.
#[derive(Parser, Debug)]
#[command(version, author)]
struct Args {
    /// Directory containing the documents to be scanned
    ///
    /// Only files directly inside of this directory are considered,
    /// subdirectories are not scanned.
    corpus_directory: PathBuf,

    /// Comma-separated list of terms to search for, e.g. "war,peace"
    ///
    /// Terms are used as typed, including any surrounding whitespace.
    word_list: String,

    /// Path to the CSV file where results should be written
    ///
    /// An existing file at this location will be replaced.
    output_csv: PathBuf,

    /// Enable debug output
    #[arg(short, long, default_value_t = false)]
    debug: bool,

    /// Ask before overwriting an existing output file
    #[arg(short, long, default_value_t = false)]
    interactive: bool,

    /// What to do with documents that cannot be read as UTF-8 text
    ///
    /// By default, such a document aborts the run, so that results are never
    /// silently computed over a subset of the corpus. Skipped documents are
    /// reported in the logs and count towards no year.
    #[arg(long, value_enum, default_value_t = UnreadablePolicy::Abort)]
    on_unreadable: UnreadablePolicy,

    /// Emit an all-zero row for terms that were found in no document
    ///
    /// By default, such terms are left out of the output table.
    #[arg(long, default_value_t = false)]
    keep_unmatched: bool,

    /// Maximal number of documents being read at the same time
    #[arg(short, long, default_value = "16")]
    jobs: NonZeroUsize,
}
//
impl Args {
    /// Decode and validate CLI arguments
    pub fn parse_and_check() -> Result<Self> {
        // Decode CLI arguments
        let args = Args::parse();

        // Check CLI arguments for basic sanity
        args.check()?;
        Ok(args)
    }

    /// Check that the paths we were given can be used
    fn check(&self) -> Result<()> {
        anyhow::ensure!(
            self.corpus_directory.is_dir(),
            "corpus directory {} does not exist or is not a directory",
            self.corpus_directory.display()
        );
        anyhow::ensure!(
            self.output_csv.file_name().is_some() && !self.output_csv.is_dir(),
            "output path {} does not designate a file",
            self.output_csv.display()
        );
        let output_dir = (self.output_csv.parent())
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        anyhow::ensure!(
            output_dir.is_dir(),
            "output directory {} does not exist",
            output_dir.display()
        );

        // Results are written next to the output, so that must be possible
        let scratch = report::temporary_path(&self.output_csv);
        let context = || format!("output directory {} is not writable", output_dir.display());
        fs::File::create(&scratch).with_context(context)?;
        fs::remove_file(&scratch).with_context(context)?;
        Ok(())
    }

    /// Verbosity of the logs
    pub fn log_level(&self) -> LevelFilter {
        if cfg!(feature = "log-trace") {
            LevelFilter::Trace
        } else if self.debug {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        }
    }
}
//
#[tokio::main]
async fn main() -> Result<()> {
    // Decode CLI arguments, then set up logging at the requested verbosity
    let args = Args::parse_and_check()?;
    setup_logging(args.log_level());

    // Make sure we're allowed to clobber the output before doing any work
    if args.interactive && !prompt::confirm_overwrite(&args.output_csv)? {
        log::info!("User declined to overwrite {}", args.output_csv.display());
        return Ok(());
    }
    run(Config::new(args)).await
}

/// Scan the corpus and write down the yearly frequency of each term
///
/// Nothing is written if any step fails.
async fn run(config: Arc<Config>) -> Result<()> {
    // Classify the documents of the corpus by year
    let documents = corpus::list_documents(&config.corpus).await?;

    // Count in how many documents of each year every term appears
    let progress = ProgressReport::new();
    let stats = scan::scan_corpus(config.clone(), documents, &progress).await?;
    log::info!(
        "Scanned {} documents spanning {} years",
        stats.num_documents(),
        stats.years().count()
    );

    // Turn these counts into a table of yearly frequencies and save it
    let report = Report::new(&config, &stats);
    report.save(&config.output).await?;
    Ok(())
}

/// Use anyhow for Result type erasure
pub use anyhow::Result;

/// Year label extracted from a document's file name
///
/// This is kept as the original 4-digit string, whose lexicographic order
/// matches chronological order.
pub type Year = Box<str>;

/// Addition operator for NonZeroUsize
pub fn add_nz_usize(x: NonZeroUsize, y: NonZeroUsize) -> NonZeroUsize {
    x.checked_add(y.get()).expect("overflow while adding NonZeroUsizes")
}

/// Set up logging
///
/// Logs go to the local syslog daemon. If there is none, we carry on without
/// logs rather than failing the run.
fn setup_logging(level: LevelFilter) {
    if let Err(e) = syslog::init(syslog::Facility::LOG_USER, level, None) {
        eprintln!("warning: failed to connect to syslog, logs will be discarded ({e})");
    }
}
