//! downloads-organizer - sort a downloads folder into category subdirectories
//!
//! This library classifies the files directly inside a source directory by
//! extension, moves them under an organized root (optionally split by
//! modification month), drops exact duplicates by content hash, resolves name
//! collisions with `_N` suffixes, and produces a report of the run.

pub mod cli;
pub mod config;
pub mod file_category;
pub mod file_organizer;
pub mod hasher;
pub mod output;
pub mod report;
pub mod resolver;

pub use config::{CompiledFilters, ConfigError, ConfigFile, OrganizerConfig};
pub use file_category::{Category, CategoryTable, DEFAULT_CATEGORY};
pub use file_organizer::{
    EntryOutcome, OrganizeError, OrganizeResult, Organizer, RunOptions, SourceEntry,
};
pub use hasher::{ContentDigest, hash_file};
pub use report::{FileRecord, OrganizationReport, ReportWriter};
pub use resolver::{DestinationResolver, Resolution, ResolveError};

pub use cli::{Cli, RunOutcome, run_cli, run_organize};
