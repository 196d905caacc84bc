/// Classification, deduplication and relocation of a flat source directory.
///
/// The [`Organizer`] walks the immediate children of the source directory one
/// at a time: classify by extension, resolve a destination (hashing on
/// collision), then move, delete as duplicate, or just record the decision in
/// dry-run mode. A failure on one file is logged and counted; it never aborts
/// the run.
use crate::config::OrganizerConfig;
use crate::report::{
    DuplicateRecord, FileRecord, OrganizationReport, ReportMetadata, bytes_to_mb,
};
use crate::resolver::{DestinationResolver, Placements, Resolution, ResolveError};
use chrono::{DateTime, Local};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Snapshot of one file found in the source directory.
///
/// Captured once per run; later changes to the file on disk are not seen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEntry {
    pub name: String,
    /// The last extension with its leading dot, or empty.
    pub extension: String,
    /// Size in bytes.
    pub size: u64,
    pub modified: DateTime<Local>,
    pub path: PathBuf,
}

impl SourceEntry {
    /// Reads the metadata of `path` into a snapshot.
    ///
    /// # Errors
    ///
    /// Fails if the metadata cannot be read or the file name is not valid UTF-8.
    pub fn from_path(path: &Path) -> io::Result<Self> {
        let metadata = fs::metadata(path)?;
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("{} has no UTF-8 file name", path.display()),
                )
            })?
            .to_string();
        let extension = path
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();

        Ok(Self {
            name,
            extension,
            size: metadata.len(),
            modified: metadata.modified()?.into(),
            path: path.to_path_buf(),
        })
    }
}

/// Mode flags for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Compute everything but touch nothing on disk.
    pub dry_run: bool,
    /// Add a `YYYY-MM` folder under each category.
    pub organize_by_date: bool,
}

/// Errors that can occur during file organization operations.
#[derive(Debug)]
pub enum OrganizeError {
    /// The source directory is missing or unreadable. Fatal for the run.
    InvalidSourceDir { path: PathBuf, source: io::Error },
    /// Failed to create a destination directory.
    DirectoryCreationFailed { path: PathBuf, source: io::Error },
    /// Failed to move a file to its destination.
    FileMoveFailure {
        source: PathBuf,
        destination: PathBuf,
        source_error: io::Error,
    },
    /// Failed to delete a duplicate source file.
    FileDeleteFailed { path: PathBuf, source: io::Error },
    /// Failed to read a source file's metadata.
    Metadata { path: PathBuf, source: io::Error },
    /// No destination could be found for the file.
    Resolve(ResolveError),
    /// Failed to write the report artifacts.
    ReportWriteFailed { path: PathBuf, source: io::Error },
}

impl std::fmt::Display for OrganizeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidSourceDir { path, source } => {
                write!(f, "Invalid source directory {}: {}", path.display(), source)
            }
            Self::DirectoryCreationFailed { path, source } => {
                write!(
                    f,
                    "Failed to create directory {}: {}",
                    path.display(),
                    source
                )
            }
            Self::FileMoveFailure {
                source,
                destination,
                source_error,
            } => {
                write!(
                    f,
                    "Failed to move {} to {}: {}",
                    source.display(),
                    destination.display(),
                    source_error
                )
            }
            Self::FileDeleteFailed { path, source } => {
                write!(
                    f,
                    "Failed to delete duplicate {}: {}",
                    path.display(),
                    source
                )
            }
            Self::Metadata { path, source } => {
                write!(f, "Failed to read metadata of {}: {}", path.display(), source)
            }
            Self::Resolve(e) => write!(f, "{}", e),
            Self::ReportWriteFailed { path, source } => {
                write!(f, "Failed to write report in {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for OrganizeError {}

impl From<ResolveError> for OrganizeError {
    fn from(e: ResolveError) -> Self {
        Self::Resolve(e)
    }
}

/// Result type for file organization operations.
pub type OrganizeResult<T> = Result<T, OrganizeError>;

/// What happened to one entry.
#[derive(Debug)]
pub enum EntryOutcome {
    /// Moved to its destination.
    Moved(FileRecord),
    /// Would have been moved (dry run).
    Simulated(FileRecord),
    /// Identical content already existed at `existing`; the source was removed
    /// (or would have been, in a dry run).
    Duplicate { existing: PathBuf },
    /// Left in place after an error.
    Failed(OrganizeError),
}

/// Files selected for processing plus what was passed over while scanning.
#[derive(Debug, Default)]
pub struct Scan {
    pub entries: Vec<SourceEntry>,
    /// Files excluded by the filters.
    pub skipped: usize,
    /// Files whose metadata could not be read.
    pub failed: usize,
}

/// Organizes the files of one source directory into category folders.
pub struct Organizer {
    config: OrganizerConfig,
    options: RunOptions,
}

impl Organizer {
    pub fn new(config: OrganizerConfig, options: RunOptions) -> Self {
        Self { config, options }
    }

    pub fn config(&self) -> &OrganizerConfig {
        &self.config
    }

    /// Lists the regular files directly inside the source directory, sorted by name.
    ///
    /// Subdirectories (including the organized root) are ignored, as are files
    /// rejected by the configured filters.
    ///
    /// # Errors
    ///
    /// Returns [`OrganizeError::InvalidSourceDir`] if the source cannot be read.
    pub fn scan(&self) -> OrganizeResult<Scan> {
        let source_dir = &self.config.source_dir;
        let invalid = |source: io::Error| OrganizeError::InvalidSourceDir {
            path: source_dir.clone(),
            source,
        };

        if !source_dir.is_dir() {
            return Err(invalid(io::Error::new(
                io::ErrorKind::NotFound,
                "source directory does not exist or is not a directory",
            )));
        }

        let mut scan = Scan::default();
        for dir_entry in fs::read_dir(source_dir).map_err(invalid)? {
            let path = match dir_entry {
                Ok(dir_entry) => dir_entry.path(),
                Err(e) => {
                    tracing::warn!(error = %e, "could not read directory entry");
                    scan.failed += 1;
                    continue;
                }
            };

            if path == self.config.target_dir || !path.is_file() {
                continue;
            }

            let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
                tracing::warn!(path = %path.display(), "skipping file with non UTF-8 name");
                scan.skipped += 1;
                continue;
            };
            if !self.config.filters.should_include(name) {
                tracing::debug!(name, "excluded by filters");
                scan.skipped += 1;
                continue;
            }

            match SourceEntry::from_path(&path) {
                Ok(entry) => scan.entries.push(entry),
                Err(source) => {
                    let error = OrganizeError::Metadata { path, source };
                    tracing::warn!("{}", error);
                    scan.failed += 1;
                }
            }
        }

        scan.entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(scan)
    }

    /// Scans and processes the source directory.
    pub fn run(&self) -> OrganizeResult<OrganizationReport> {
        let scan = self.scan()?;
        Ok(self.process(scan, |_, _| {}))
    }

    /// Processes scanned entries in order, calling `on_entry` after each one.
    pub fn process<F>(&self, scan: Scan, mut on_entry: F) -> OrganizationReport
    where
        F: FnMut(&SourceEntry, &EntryOutcome),
    {
        let started_at = Local::now();
        let clock = Instant::now();
        let resolver = DestinationResolver::new(
            &self.config.target_dir,
            self.options.organize_by_date,
            self.config.max_rename_attempts,
        );
        let mut placements = Placements::new();

        let mut category_stats: BTreeMap<String, usize> = BTreeMap::new();
        let mut all_files = Vec::new();
        let mut duplicates = Vec::new();
        let mut total_size: u64 = 0;
        let mut errors = scan.failed;

        tracing::info!(
            source = %self.config.source_dir.display(),
            target = %self.config.target_dir.display(),
            files = scan.entries.len(),
            dry_run = self.options.dry_run,
            "organizing"
        );

        for entry in &scan.entries {
            let outcome = match self.process_entry(entry, &resolver, &mut placements) {
                Ok(outcome) => outcome,
                Err(e) => EntryOutcome::Failed(e),
            };

            match &outcome {
                EntryOutcome::Moved(record) | EntryOutcome::Simulated(record) => {
                    *category_stats.entry(record.category.clone()).or_insert(0) += 1;
                    total_size += entry.size;
                    all_files.push(record.clone());
                }
                EntryOutcome::Duplicate { existing } => {
                    duplicates.push(DuplicateRecord {
                        name: entry.name.clone(),
                        duplicate_of: relative_to(existing, resolver.root()),
                    });
                }
                EntryOutcome::Failed(e) => {
                    tracing::warn!(file = %entry.name, "{}", e);
                    errors += 1;
                }
            }

            on_entry(entry, &outcome);
        }

        let metadata = ReportMetadata {
            timestamp: started_at,
            duration_seconds: (clock.elapsed().as_secs_f64() * 100.0).round() / 100.0,
            source_folder: self.config.source_dir.to_string_lossy().into_owned(),
            target_folder: self.config.target_dir.to_string_lossy().into_owned(),
            total_files_processed: all_files.len(),
            total_size_mb: bytes_to_mb(total_size),
            duplicates_found: duplicates.len(),
            errors_encountered: errors,
            skipped_files: scan.skipped,
        };

        OrganizationReport::new(metadata, category_stats, all_files, duplicates)
    }

    /// Runs one entry through classify, resolve and move/delete.
    fn process_entry(
        &self,
        entry: &SourceEntry,
        resolver: &DestinationResolver,
        placements: &mut Placements,
    ) -> OrganizeResult<EntryOutcome> {
        let dry_run = self.options.dry_run;
        let category = self.config.categories.classify(&entry.extension);
        tracing::debug!(file = %entry.name, category, "classified");

        if !dry_run {
            let folder = resolver.destination_folder(category, entry.modified);
            fs::create_dir_all(&folder).map_err(|source| {
                OrganizeError::DirectoryCreationFailed {
                    path: folder.clone(),
                    source,
                }
            })?;
        }

        match resolver.resolve(entry, category, placements)? {
            Resolution::Duplicate { existing } => {
                if !dry_run {
                    fs::remove_file(&entry.path).map_err(|source| {
                        OrganizeError::FileDeleteFailed {
                            path: entry.path.clone(),
                            source,
                        }
                    })?;
                }
                Ok(EntryOutcome::Duplicate { existing })
            }
            Resolution::InPlace { destination } => {
                tracing::debug!(file = %entry.name, "already at its destination");
                let record = Self::record(entry, category, &destination, resolver);
                placements.simulate(destination, entry.path.clone());
                Ok(if dry_run {
                    EntryOutcome::Simulated(record)
                } else {
                    EntryOutcome::Moved(record)
                })
            }
            Resolution::Place {
                destination,
                renamed,
            } => {
                if renamed {
                    tracing::info!(
                        file = %entry.name,
                        destination = %destination.display(),
                        "name collision, renamed"
                    );
                }

                let record = Self::record(entry, category, &destination, resolver);
                if dry_run {
                    placements.simulate(destination, entry.path.clone());
                    Ok(EntryOutcome::Simulated(record))
                } else {
                    move_file(&entry.path, &destination)?;
                    Ok(EntryOutcome::Moved(record))
                }
            }
        }
    }

    fn record(
        entry: &SourceEntry,
        category: &str,
        destination: &Path,
        resolver: &DestinationResolver,
    ) -> FileRecord {
        let relative = destination.strip_prefix(resolver.root()).unwrap_or(destination);
        FileRecord::new(entry, category, relative)
    }
}

/// Moves a file, falling back to copy-then-delete when a rename is not possible
/// (e.g. across filesystems). A half-finished fallback removes its copy.
fn move_file(from: &Path, to: &Path) -> OrganizeResult<()> {
    let rename_error = match fs::rename(from, to) {
        Ok(()) => return Ok(()),
        Err(e) => e,
    };
    tracing::debug!(error = %rename_error, "rename failed, trying copy");

    if let Err(e) = fs::copy(from, to).and_then(|_| fs::remove_file(from)) {
        if from.exists()
            && to.exists()
            && let Err(cleanup) = fs::remove_file(to)
        {
            tracing::warn!(
                path = %to.display(),
                error = %cleanup,
                "could not remove partial copy"
            );
        }
        return Err(OrganizeError::FileMoveFailure {
            source: from.to_path_buf(),
            destination: to.to_path_buf(),
            source_error: e,
        });
    }
    Ok(())
}

fn relative_to(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .into_owned()
}
