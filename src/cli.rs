//! Command-line front end.
//!
//! Parses arguments, merges them with the config file, drives the organizer
//! behind a progress bar and writes the report artifacts after a real run.

use crate::config::OrganizerConfig;
use crate::file_organizer::{EntryOutcome, OrganizeError, Organizer, RunOptions};
use crate::output::OutputFormatter;
use crate::report::{OrganizationReport, ReportPaths, ReportWriter};
use clap::Parser;
use std::path::PathBuf;

/// Sort a downloads folder into category subdirectories.
#[derive(Debug, Clone, Parser)]
#[command(name = "downloads-organizer", version, about)]
pub struct Cli {
    /// Directory to organize (defaults to ~/Downloads or the configured source_dir)
    pub source: Option<PathBuf>,

    /// Preview the run without changing anything on disk
    #[arg(long)]
    pub dry_run: bool,

    /// Create YYYY-MM subfolders inside each category
    #[arg(long)]
    pub organize_by_date: bool,

    /// Organized root (defaults to <SOURCE>/Organized)
    #[arg(long, value_name = "DIR")]
    pub target: Option<PathBuf>,

    /// Configuration file (TOML)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            dry_run: self.dry_run,
            organize_by_date: self.organize_by_date,
        }
    }
}

/// Result of a completed run.
#[derive(Debug)]
pub struct RunOutcome {
    pub report: OrganizationReport,
    /// Written artifacts; `None` for dry runs.
    pub report_paths: Option<ReportPaths>,
}

/// Runs the CLI application with parsed arguments.
///
/// Only configuration problems and an unreadable source directory are errors;
/// files that fail individually are reported in the summary.
///
/// # Examples
///
/// ```no_run
/// use clap::Parser;
/// use downloads_organizer::cli::{Cli, run_cli};
///
/// let cli = Cli::parse_from(["downloads-organizer", "--dry-run", "/tmp/downloads"]);
/// match run_cli(&cli) {
///     Ok(outcome) => println!("{} files", outcome.report.metadata.total_files_processed),
///     Err(e) => eprintln!("Error: {}", e),
/// }
/// ```
pub fn run_cli(cli: &Cli) -> Result<RunOutcome, String> {
    let config = OrganizerConfig::load(
        cli.config.as_deref(),
        cli.source.as_deref(),
        cli.target.as_deref(),
    )
    .map_err(|e| format!("Error loading configuration: {}", e))?;

    OutputFormatter::header("=== Downloads Organizer ===");
    println!("Source: {}", config.source_dir.display());
    println!("Destination: {}", config.target_dir.display());

    run_organize(config, cli.run_options())
}

/// Organizes with an explicit configuration, printing progress and summary.
///
/// Writes the JSON and HTML reports into the organized root unless this is a
/// dry run.
pub fn run_organize(config: OrganizerConfig, options: RunOptions) -> Result<RunOutcome, String> {
    let organizer = Organizer::new(config, options);
    let scan = organizer.scan().map_err(|e| format!("Error: {}", e))?;

    if options.dry_run {
        OutputFormatter::dry_run_notice("Simulating; nothing will be changed.");
    }
    if scan.entries.is_empty() {
        OutputFormatter::info("No files found to organize.");
    }

    let progress = OutputFormatter::create_progress_bar(scan.entries.len() as u64);
    let report = organizer.process(scan, |entry, outcome| {
        progress.set_message(entry.name.clone());
        if let EntryOutcome::Failed(e) = outcome {
            progress.suspend(|| OutputFormatter::error(&e.to_string()));
        }
        progress.inc(1);
    });
    progress.finish_and_clear();

    OutputFormatter::report_summary(&report, options.dry_run);

    let report_paths = if options.dry_run {
        None
    } else {
        let target_dir = &organizer.config().target_dir;
        match ReportWriter::new(target_dir).write(&report) {
            Ok(paths) => {
                OutputFormatter::report_paths(&paths);
                Some(paths)
            }
            Err(source) => {
                let error = OrganizeError::ReportWriteFailed {
                    path: target_dir.clone(),
                    source,
                };
                tracing::warn!("{}", error);
                OutputFormatter::error(&error.to_string());
                None
            }
        }
    };

    if report.metadata.errors_encountered == 0 {
        OutputFormatter::success("Organization complete!");
    }

    Ok(RunOutcome {
        report,
        report_paths,
    })
}
