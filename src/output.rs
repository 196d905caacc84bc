//! Terminal output for the organizer binary.
//!
//! Status lines, the per-file progress bar and the end-of-run summary all go
//! through [`OutputFormatter`] so the look stays consistent. Diagnostics belong
//! in `tracing`, not here.

use crate::report::{OrganizationReport, ReportPaths};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeMap;

const PROGRESS_TEMPLATE: &str = "{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {wide_msg}";

/// Colored status lines and run summaries.
///
/// Errors go to stderr; everything else to stdout.
pub struct OutputFormatter;

impl OutputFormatter {
    /// `✓ message` in green.
    ///
    /// # Arguments
    ///
    /// * `message` - Shown after the checkmark
    ///
    /// # Example
    ///
    /// ```no_run
    /// use downloads_organizer::output::OutputFormatter;
    /// OutputFormatter::success("Organization complete!");
    /// ```
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// `✗ message` in red, on stderr.
    ///
    /// # Arguments
    ///
    /// * `message` - Usually an error's `Display` output
    ///
    /// # Example
    ///
    /// ```no_run
    /// use downloads_organizer::output::OutputFormatter;
    /// OutputFormatter::error("Failed to move a.pdf");
    /// ```
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red().bold(), message);
    }

    /// `⚠ message` in yellow.
    ///
    /// # Arguments
    ///
    /// * `message` - Shown after the warning sign
    ///
    /// # Example
    ///
    /// ```no_run
    /// use downloads_organizer::output::OutputFormatter;
    /// OutputFormatter::warning("2 files left in place after errors");
    /// ```
    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    pub fn header(title: &str) {
        println!("\n{}", title.bold().underline());
    }

    /// Prefixes `message` with `[DRY RUN]`.
    pub fn dry_run_notice(message: &str) {
        println!("{} {}", "[DRY RUN]".yellow().bold(), message.yellow());
    }

    /// Progress bar sized to the number of files about to be processed.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use downloads_organizer::output::OutputFormatter;
    ///
    /// let bar = OutputFormatter::create_progress_bar(3);
    /// bar.set_message("a.pdf");
    /// bar.inc(1);
    /// bar.finish_and_clear();
    /// ```
    pub fn create_progress_bar(files: u64) -> ProgressBar {
        let style = ProgressStyle::with_template(PROGRESS_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░");
        ProgressBar::new(files).with_style(style)
    }

    /// Per-category counts followed by a total row.
    ///
    /// # Arguments
    ///
    /// * `category_stats` - Files per category, printed in key order
    /// * `total_files` - Value of the total row
    ///
    /// # Example
    ///
    /// ```no_run
    /// use downloads_organizer::output::OutputFormatter;
    /// use std::collections::BTreeMap;
    ///
    /// let mut stats = BTreeMap::new();
    /// stats.insert("Documents".to_string(), 2);
    /// stats.insert("Images".to_string(), 1);
    /// OutputFormatter::category_table(&stats, 3);
    /// ```
    pub fn category_table(category_stats: &BTreeMap<String, usize>, total_files: usize) {
        Self::header("Files by category");

        let width = category_stats
            .keys()
            .map(String::len)
            .chain(std::iter::once("Category".len()))
            .max()
            .unwrap_or(0);
        let rule = "-".repeat(width + 12);

        println!("{:<width$} | {}", "Category".bold(), "Files".bold());
        println!("{}", rule);
        for (category, count) in category_stats {
            println!(
                "{:<width$} | {:>5} {}",
                category,
                count.to_string().green(),
                plural_files(*count)
            );
        }
        println!("{}", rule);
        println!(
            "{:<width$} | {:>5} {}",
            "Total".bold(),
            total_files.to_string().green().bold(),
            plural_files(total_files)
        );
    }

    /// The end-of-run summary.
    ///
    /// # Arguments
    ///
    /// * `report` - The finished run
    /// * `dry_run` - Words the counts as "would be" and adds the dry-run notice
    pub fn report_summary(report: &OrganizationReport, dry_run: bool) {
        let meta = &report.metadata;
        let (moved, removed) = if dry_run {
            ("would be organized", "would be removed as duplicates")
        } else {
            ("organized", "removed as duplicates")
        };

        Self::header("Summary");
        println!("{} {}", meta.total_files_processed, moved);
        println!("{} {}", meta.duplicates_found, removed);
        println!("{:.2} MB total", meta.total_size_mb);
        if meta.skipped_files > 0 {
            println!("{} skipped by filters", meta.skipped_files);
        }

        if !report.category_stats.is_empty() {
            Self::category_table(&report.category_stats, meta.total_files_processed);
        }

        if meta.errors_encountered > 0 {
            println!();
            Self::warning(&format!(
                "{} {} left in place after errors (run with -v for details)",
                meta.errors_encountered,
                plural_files(meta.errors_encountered)
            ));
        }

        if dry_run {
            println!();
            Self::dry_run_notice("Nothing on disk was changed.");
        }
    }

    pub fn report_paths(paths: &ReportPaths) {
        Self::header("Reports");
        println!("JSON: {}", paths.json.display());
        println!("HTML: {}", paths.html.display());
    }
}

fn plural_files(count: usize) -> &'static str {
    if count == 1 { "file" } else { "files" }
}
