//! Report payload for one organizer run and its JSON/HTML renderings.
//!
//! The organizer builds an [`OrganizationReport`]; [`ReportWriter`] turns it
//! into `report_<timestamp>.json` and `report_<timestamp>.html` in the
//! organized root. Nothing here touches the files being organized.

use crate::file_organizer::SourceEntry;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Number of rows in each HTML "top" table.
const TOP_N: usize = 10;

/// Converts bytes to megabytes rounded to two decimals.
pub fn bytes_to_mb(bytes: u64) -> f64 {
    (bytes as f64 / (1024.0 * 1024.0) * 100.0).round() / 100.0
}

/// One file that was kept and (possibly simulated) moved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileRecord {
    pub name: String,
    pub category: String,
    pub size_mb: f64,
    pub modified: DateTime<Local>,
    /// Destination relative to the organized root.
    pub new_path: String,
    #[serde(skip)]
    pub size_bytes: u64,
}

impl FileRecord {
    pub fn new(entry: &SourceEntry, category: &str, new_path: &Path) -> Self {
        Self {
            name: entry.name.clone(),
            category: category.to_string(),
            size_mb: bytes_to_mb(entry.size),
            modified: entry.modified,
            new_path: new_path.to_string_lossy().into_owned(),
            size_bytes: entry.size,
        }
    }
}

/// A source file dropped because identical content already existed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateRecord {
    pub name: String,
    /// The matching file, relative to the organized root.
    pub duplicate_of: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportMetadata {
    pub timestamp: DateTime<Local>,
    pub duration_seconds: f64,
    pub source_folder: String,
    pub target_folder: String,
    pub total_files_processed: usize,
    pub total_size_mb: f64,
    pub duplicates_found: usize,
    pub errors_encountered: usize,
    pub skipped_files: usize,
}

/// Everything one run produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrganizationReport {
    pub metadata: ReportMetadata,
    pub category_stats: BTreeMap<String, usize>,
    pub all_files: Vec<FileRecord>,
    /// `all_files` by size, largest first.
    pub largest_files: Vec<FileRecord>,
    /// `all_files` by modification time, oldest first.
    pub oldest_files: Vec<FileRecord>,
    pub duplicates: Vec<DuplicateRecord>,
}

impl OrganizationReport {
    /// Assembles the report and its derived views.
    pub fn new(
        metadata: ReportMetadata,
        category_stats: BTreeMap<String, usize>,
        all_files: Vec<FileRecord>,
        duplicates: Vec<DuplicateRecord>,
    ) -> Self {
        let mut largest_files = all_files.clone();
        largest_files.sort_by(|a, b| b.size_bytes.cmp(&a.size_bytes));

        let mut oldest_files = all_files.clone();
        oldest_files.sort_by_key(|record| record.modified);

        Self {
            metadata,
            category_stats,
            all_files,
            largest_files,
            oldest_files,
            duplicates,
        }
    }

    /// Per-month, per-category file counts: sorted `YYYY-MM` labels plus one
    /// series per category aligned with those labels.
    pub fn monthly_history(&self) -> (Vec<String>, BTreeMap<String, Vec<usize>>) {
        let months: Vec<String> = self
            .all_files
            .iter()
            .map(|record| record.modified.format("%Y-%m").to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut series: BTreeMap<String, Vec<usize>> = self
            .category_stats
            .keys()
            .map(|category| (category.clone(), vec![0; months.len()]))
            .collect();

        for record in &self.all_files {
            let month = record.modified.format("%Y-%m").to_string();
            if let (Ok(index), Some(counts)) = (
                months.binary_search(&month),
                series.get_mut(&record.category),
            ) {
                counts[index] += 1;
            }
        }

        (months, series)
    }
}

/// Paths of the artifacts written for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPaths {
    pub json: PathBuf,
    pub html: PathBuf,
}

/// Writes report artifacts into a directory.
pub struct ReportWriter {
    dir: PathBuf,
}

impl ReportWriter {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    /// Writes `report_<YYYYmmdd_HHMMSS>.json` and `.html`, named after the run start.
    pub fn write(&self, report: &OrganizationReport) -> io::Result<ReportPaths> {
        fs::create_dir_all(&self.dir)?;

        let stem = format!("report_{}", report.metadata.timestamp.format("%Y%m%d_%H%M%S"));
        let paths = ReportPaths {
            json: self.dir.join(format!("{}.json", stem)),
            html: self.dir.join(format!("{}.html", stem)),
        };

        fs::write(&paths.json, render_json(report)?)?;
        fs::write(&paths.html, render_html(report)?)?;

        tracing::info!(
            json = %paths.json.display(),
            html = %paths.html.display(),
            "reports written"
        );
        Ok(paths)
    }
}

/// Serializes the report as pretty-printed JSON.
pub fn render_json(report: &OrganizationReport) -> io::Result<String> {
    serde_json::to_string_pretty(report).map_err(|e| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("JSON serialization failed: {}", e),
        )
    })
}

/// Renders a standalone HTML page with charts and top-10 tables.
pub fn render_html(report: &OrganizationReport) -> io::Result<String> {
    let labels: Vec<&String> = report.category_stats.keys().collect();
    let counts: Vec<usize> = report.category_stats.values().copied().collect();
    let (months, series) = report.monthly_history();

    let largest_rows: String = report
        .largest_files
        .iter()
        .take(TOP_N)
        .map(|file| {
            format!(
                "<tr><td>{}</td><td>{:.2}</td><td>{}</td><td>{}</td></tr>\n",
                escape_html(&file.name),
                file.size_mb,
                escape_html(&file.category),
                escape_html(&file.new_path)
            )
        })
        .collect();

    let oldest_rows: String = report
        .oldest_files
        .iter()
        .take(TOP_N)
        .map(|file| {
            format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
                escape_html(&file.name),
                file.modified.format("%Y-%m-%d"),
                escape_html(&file.category),
                escape_html(&file.new_path)
            )
        })
        .collect();

    let meta = &report.metadata;
    Ok(format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>Downloads Organization Report</title>
<script src="https://cdn.jsdelivr.net/npm/chart.js"></script>
<style>
body {{ font-family: Arial, sans-serif; margin: 2rem; }}
.chart-container {{ margin: 2rem 0; max-width: 800px; }}
table {{ border-collapse: collapse; width: 100%; }}
th, td {{ padding: 8px; text-align: left; border-bottom: 1px solid #ddd; }}
tr:hover {{ background-color: #f5f5f5; }}
</style>
</head>
<body>
<h1>Organization Report</h1>
<p>{timestamp} &middot; {processed} files &middot; {size:.2} MB &middot; {duplicates} duplicates removed &middot; {errors} errors</p>
<p>{source} &rarr; {target}</p>

<div class="chart-container">
<h2>File Type Distribution</h2>
<canvas id="typeChart"></canvas>
</div>

<div class="chart-container">
<h2>File Type History</h2>
<canvas id="historyChart"></canvas>
</div>

<h2>Largest Files (Top {top})</h2>
<table>
<tr><th>File</th><th>Size (MB)</th><th>Type</th><th>Path</th></tr>
{largest_rows}</table>

<h2>Oldest Files (Top {top})</h2>
<table>
<tr><th>File</th><th>Last Modified</th><th>Type</th><th>Path</th></tr>
{oldest_rows}</table>

<script>
new Chart(document.getElementById('typeChart'), {{
  type: 'pie',
  data: {{
    labels: {labels},
    datasets: [{{
      data: {counts},
      backgroundColor: ['#FF6384', '#36A2EB', '#FFCE56', '#4BC0C0', '#9966FF', '#FF9F40', '#E7E9ED']
    }}]
  }}
}});

const historyData = {{ dates: {months}, types: {series} }};
new Chart(document.getElementById('historyChart'), {{
  type: 'line',
  data: {{
    labels: historyData.dates,
    datasets: Object.entries(historyData.types).map(([type, counts]) => ({{
      label: type,
      data: counts,
      borderWidth: 2,
      fill: false
    }}))
  }},
  options: {{ responsive: true, scales: {{ y: {{ beginAtZero: true }} }} }}
}});
</script>
</body>
</html>
"#,
        timestamp = meta.timestamp.format("%Y-%m-%d %H:%M:%S"),
        processed = meta.total_files_processed,
        size = meta.total_size_mb,
        duplicates = meta.duplicates_found,
        errors = meta.errors_encountered,
        source = escape_html(&meta.source_folder),
        target = escape_html(&meta.target_folder),
        top = TOP_N,
        largest_rows = largest_rows,
        oldest_rows = oldest_rows,
        labels = script_json(&labels)?,
        counts = script_json(&counts)?,
        months = script_json(&months)?,
        series = script_json(&series)?,
    ))
}

/// JSON safe to embed inside a `<script>` element.
fn script_json<T: Serialize + ?Sized>(value: &T) -> io::Result<String> {
    serde_json::to_string(value)
        .map(|json| json.replace("</", "<\\/"))
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
