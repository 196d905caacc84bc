//! Destination computation and collision resolution.
//!
//! Given a classified [`SourceEntry`], the resolver picks the folder it belongs
//! in (`root/category` or `root/category/YYYY-MM`) and then finds a free name:
//!
//! 1. If `folder/name` is the source file itself, it is already in place.
//! 2. If nothing occupies `folder/name`, the file goes there.
//! 3. If the occupant has identical content, the entry is a duplicate.
//! 4. Otherwise `name_1.ext`, `name_2.ext`, ... are tried in turn, with the
//!    same duplicate check applied to every occupied candidate.
//!
//! The resolver never mutates the filesystem. Simulated placements from a dry
//! run are tracked in [`Placements`] so a preview resolves exactly like a real run.

use crate::file_organizer::SourceEntry;
use crate::hasher::{ContentDigest, hash_file};
use chrono::{DateTime, Local};
use std::collections::HashMap;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

/// Default cap on `_N` suffixes tried before giving up on an entry.
pub const DEFAULT_MAX_RENAME_ATTEMPTS: u32 = 10_000;

/// The outcome of resolving one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Move the source to `destination`.
    Place {
        destination: PathBuf,
        /// True when a `_N` suffix was needed.
        renamed: bool,
    },
    /// The source duplicates the file already at `existing`; drop the source.
    Duplicate { existing: PathBuf },
    /// The source already sits at its destination; leave it alone.
    InPlace { destination: PathBuf },
}

/// Errors that can occur while resolving a destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// Every candidate name up to the cap was occupied by different content.
    ExhaustedRenameAttempts { path: PathBuf, attempts: u32 },
}

impl std::fmt::Display for ResolveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ExhaustedRenameAttempts { path, attempts } => write!(
                f,
                "No free name for {} after {} rename attempts",
                path.display(),
                attempts
            ),
        }
    }
}

impl std::error::Error for ResolveError {}

/// Destination paths claimed during the current run without touching disk.
///
/// Maps a claimed destination to the path whose bytes would end up there.
#[derive(Debug, Default)]
pub struct Placements {
    simulated: HashMap<PathBuf, PathBuf>,
}

impl Placements {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `source` would be placed at `destination`.
    pub fn simulate(&mut self, destination: PathBuf, source: PathBuf) {
        self.simulated.insert(destination, source);
    }

    /// Returns the path holding the content at `candidate`, if it is occupied.
    pub fn occupant(&self, candidate: &Path) -> Option<PathBuf> {
        if let Some(source) = self.simulated.get(candidate) {
            return Some(source.clone());
        }
        fs::symlink_metadata(candidate)
            .is_ok()
            .then(|| candidate.to_path_buf())
    }
}

/// Computes destinations under an organized root.
#[derive(Debug, Clone)]
pub struct DestinationResolver {
    root: PathBuf,
    organize_by_date: bool,
    max_rename_attempts: u32,
}

impl DestinationResolver {
    pub fn new(root: &Path, organize_by_date: bool, max_rename_attempts: u32) -> Self {
        Self {
            root: root.to_path_buf(),
            organize_by_date,
            max_rename_attempts,
        }
    }

    /// The organized root all destinations live under.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns `root/category`, or `root/category/YYYY-MM` in date mode.
    pub fn destination_folder(&self, category: &str, modified: DateTime<Local>) -> PathBuf {
        let folder = self.root.join(category);
        if self.organize_by_date {
            folder.join(modified.format("%Y-%m").to_string())
        } else {
            folder
        }
    }

    /// Resolves where `entry` should go, or whether it is a duplicate.
    ///
    /// Hash failures on either side are logged and treated as "contents differ",
    /// so an unreadable file is renamed rather than deleted.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::ExhaustedRenameAttempts`] when `name`, `name_1`
    /// through `name_<cap>` are all taken by different content.
    pub fn resolve(
        &self,
        entry: &SourceEntry,
        category: &str,
        placements: &Placements,
    ) -> Result<Resolution, ResolveError> {
        let folder = self.destination_folder(category, entry.modified);
        let mut source_digest = None;

        for attempt in 0..=self.max_rename_attempts {
            let candidate = if attempt == 0 {
                folder.join(&entry.name)
            } else {
                folder.join(numbered_name(&entry.name, attempt))
            };

            if is_same_file(&candidate, &entry.path) {
                return Ok(Resolution::InPlace {
                    destination: candidate,
                });
            }

            let Some(occupant) = placements.occupant(&candidate) else {
                return Ok(Resolution::Place {
                    destination: candidate,
                    renamed: attempt > 0,
                });
            };

            if same_content(&entry.path, &occupant, &mut source_digest) {
                tracing::debug!(
                    source = %entry.path.display(),
                    existing = %candidate.display(),
                    "duplicate content"
                );
                return Ok(Resolution::Duplicate {
                    existing: candidate,
                });
            }

            tracing::debug!(candidate = %candidate.display(), "destination occupied");
        }

        Err(ResolveError::ExhaustedRenameAttempts {
            path: folder.join(&entry.name),
            attempts: self.max_rename_attempts,
        })
    }
}

/// Builds `stem_N.ext` from `name` (only the last extension is kept after the counter).
fn numbered_name(name: &str, counter: u32) -> OsString {
    let path = Path::new(name);
    let mut numbered = path
        .file_stem()
        .map(|stem| stem.to_os_string())
        .unwrap_or_default();
    numbered.push(format!("_{}", counter));
    if let Some(ext) = path.extension() {
        numbered.push(".");
        numbered.push(ext);
    }
    numbered
}

/// True when both paths name the same file, even through different spellings.
fn is_same_file(candidate: &Path, source: &Path) -> bool {
    if candidate == source {
        return true;
    }
    match (fs::canonicalize(candidate), fs::canonicalize(source)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Compares content, hashing the source at most once per resolution.
fn same_content(
    source: &Path,
    occupant: &Path,
    source_digest: &mut Option<Option<ContentDigest>>,
) -> bool {
    let source_hash = *source_digest.get_or_insert_with(|| digest_or_warn(source));
    match (source_hash, digest_or_warn(occupant)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

fn digest_or_warn(path: &Path) -> Option<ContentDigest> {
    match hash_file(path) {
        Ok(digest) => Some(digest),
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "could not hash file, assuming contents differ"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn entry_for(dir: &Path, name: &str, content: &str) -> SourceEntry {
        let path = dir.join(name);
        fs::write(&path, content).expect("Failed to write source file");
        SourceEntry::from_path(&path).expect("Failed to snapshot entry")
    }

    fn setup() -> (TempDir, PathBuf, PathBuf) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let source = temp_dir.path().join("source");
        let root = temp_dir.path().join("Organized");
        fs::create_dir_all(&source).unwrap();
        fs::create_dir_all(root.join("Images")).unwrap();
        (temp_dir, source, root)
    }

    #[test]
    fn test_destination_folder_plain_and_dated() {
        let when = Local.with_ymd_and_hms(2024, 3, 9, 12, 0, 0).unwrap();
        let plain = DestinationResolver::new(Path::new("/org"), false, 5);
        let dated = DestinationResolver::new(Path::new("/org"), true, 5);

        assert_eq!(
            plain.destination_folder("Images", when),
            PathBuf::from("/org/Images")
        );
        assert_eq!(
            dated.destination_folder("Images", when),
            PathBuf::from("/org/Images/2024-03")
        );
    }

    #[test]
    fn test_free_destination_is_used() {
        let (_tmp, source, root) = setup();
        let entry = entry_for(&source, "Photo.jpg", "new");
        let resolver = DestinationResolver::new(&root, false, 10);

        let resolution = resolver
            .resolve(&entry, "Images", &Placements::new())
            .unwrap();
        assert_eq!(
            resolution,
            Resolution::Place {
                destination: root.join("Images/Photo.jpg"),
                renamed: false
            }
        );
    }

    #[test]
    fn test_identical_content_is_duplicate() {
        let (_tmp, source, root) = setup();
        fs::write(root.join("Images/Photo.jpg"), "same").unwrap();
        let entry = entry_for(&source, "Photo.jpg", "same");
        let resolver = DestinationResolver::new(&root, false, 10);

        let resolution = resolver
            .resolve(&entry, "Images", &Placements::new())
            .unwrap();
        assert_eq!(
            resolution,
            Resolution::Duplicate {
                existing: root.join("Images/Photo.jpg")
            }
        );
    }

    #[test]
    fn test_collision_renames_with_counter() {
        let (_tmp, source, root) = setup();
        fs::write(root.join("Images/Photo.jpg"), "existing").unwrap();
        let entry = entry_for(&source, "Photo.jpg", "incoming");
        let resolver = DestinationResolver::new(&root, false, 10);

        let resolution = resolver
            .resolve(&entry, "Images", &Placements::new())
            .unwrap();
        assert_eq!(
            resolution,
            Resolution::Place {
                destination: root.join("Images/Photo_1.jpg"),
                renamed: true
            }
        );
    }

    #[test]
    fn test_collision_skips_occupied_counter() {
        let (_tmp, source, root) = setup();
        fs::write(root.join("Images/Photo.jpg"), "existing").unwrap();
        fs::write(root.join("Images/Photo_1.jpg"), "also existing").unwrap();
        let entry = entry_for(&source, "Photo.jpg", "incoming");
        let resolver = DestinationResolver::new(&root, false, 10);

        let resolution = resolver
            .resolve(&entry, "Images", &Placements::new())
            .unwrap();
        assert_eq!(
            resolution,
            Resolution::Place {
                destination: root.join("Images/Photo_2.jpg"),
                renamed: true
            }
        );
    }

    #[test]
    fn test_duplicate_of_renamed_copy() {
        let (_tmp, source, root) = setup();
        fs::write(root.join("Images/Photo.jpg"), "existing").unwrap();
        fs::write(root.join("Images/Photo_1.jpg"), "incoming").unwrap();
        let entry = entry_for(&source, "Photo.jpg", "incoming");
        let resolver = DestinationResolver::new(&root, false, 10);

        let resolution = resolver
            .resolve(&entry, "Images", &Placements::new())
            .unwrap();
        assert_eq!(
            resolution,
            Resolution::Duplicate {
                existing: root.join("Images/Photo_1.jpg")
            }
        );
    }

    #[test]
    fn test_exhausted_rename_attempts() {
        let (_tmp, source, root) = setup();
        fs::write(root.join("Images/Photo.jpg"), "0").unwrap();
        fs::write(root.join("Images/Photo_1.jpg"), "1").unwrap();
        fs::write(root.join("Images/Photo_2.jpg"), "2").unwrap();
        let entry = entry_for(&source, "Photo.jpg", "incoming");
        let resolver = DestinationResolver::new(&root, false, 2);

        let err = resolver
            .resolve(&entry, "Images", &Placements::new())
            .unwrap_err();
        assert_eq!(
            err,
            ResolveError::ExhaustedRenameAttempts {
                path: root.join("Images/Photo.jpg"),
                attempts: 2
            }
        );
    }

    #[test]
    fn test_directory_occupant_is_treated_as_different() {
        let (_tmp, source, root) = setup();
        fs::create_dir(root.join("Images/Photo.jpg")).unwrap();
        let entry = entry_for(&source, "Photo.jpg", "incoming");
        let resolver = DestinationResolver::new(&root, false, 10);

        let resolution = resolver
            .resolve(&entry, "Images", &Placements::new())
            .unwrap();
        assert_eq!(
            resolution,
            Resolution::Place {
                destination: root.join("Images/Photo_1.jpg"),
                renamed: true
            }
        );
    }

    #[test]
    fn test_simulated_placement_occupies_destination() {
        let (_tmp, source, root) = setup();
        let first = entry_for(&source, "Photo_1.jpg", "first");
        let second = entry_for(&source, "Photo.jpg", "second");
        fs::write(root.join("Images/Photo.jpg"), "on disk").unwrap();

        let mut placements = Placements::new();
        placements.simulate(root.join("Images/Photo_1.jpg"), first.path.clone());

        let resolver = DestinationResolver::new(&root, false, 10);
        let resolution = resolver.resolve(&second, "Images", &placements).unwrap();
        assert_eq!(
            resolution,
            Resolution::Place {
                destination: root.join("Images/Photo_2.jpg"),
                renamed: true
            }
        );
    }

    #[test]
    fn test_source_at_its_own_destination_stays_in_place() {
        let (_tmp, _source, root) = setup();
        let entry = entry_for(&root.join("Images"), "Photo.jpg", "only copy");
        let resolver = DestinationResolver::new(&root, false, 10);

        let resolution = resolver
            .resolve(&entry, "Images", &Placements::new())
            .unwrap();
        assert_eq!(
            resolution,
            Resolution::InPlace {
                destination: root.join("Images/Photo.jpg")
            }
        );
    }

    #[test]
    fn test_same_file_through_other_spelling() {
        let (_tmp, _source, root) = setup();
        let entry = entry_for(&root.join("Images"), "Photo.jpg", "only copy");
        let spelled = root.join("Images/../Images/Photo.jpg");

        assert!(is_same_file(&spelled, &entry.path));
        assert!(!is_same_file(&root.join("Images/Other.jpg"), &entry.path));
    }

    #[test]
    fn test_numbered_name_variants() {
        assert_eq!(numbered_name("Photo.jpg", 1), OsString::from("Photo_1.jpg"));
        assert_eq!(
            numbered_name("archive.tar.gz", 3),
            OsString::from("archive.tar_3.gz")
        );
        assert_eq!(numbered_name("README", 2), OsString::from("README_2"));
        assert_eq!(numbered_name(".bashrc", 1), OsString::from(".bashrc_1"));
    }
}
