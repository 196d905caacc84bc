//! Organizer configuration and entry filtering.
//!
//! A TOML file is parsed into a [`ConfigFile`], merged with command-line
//! overrides and compiled into the immutable [`OrganizerConfig`] that the
//! organizer is constructed with. Every key is optional.
//!
//! # Configuration File Format
//!
//! ```toml
//! source_dir = "~/Downloads"
//! target_dir = "~/Downloads/Organized"
//! default_category = "Miscellaneous"
//! max_rename_attempts = 10000
//!
//! [[categories]]
//! name = "Documents"
//! extensions = [".pdf", ".txt"]
//!
//! [[categories]]
//! name = "Images"
//! extensions = [".jpg", ".png"]
//!
//! [filters]
//! enable_hidden_files = true
//!
//! [filters.exclude]
//! filenames = ["desktop.ini"]
//! patterns = ["*.crdownload"]
//! extensions = ["part"]
//! regex = []
//!
//! [filters.include]
//! patterns = []
//! ```
//!
//! A `categories` list replaces the built-in table entirely and is matched in
//! the order written.

use crate::file_category::{Category, CategoryTable, DEFAULT_CATEGORY, standard_categories};
use crate::resolver::DEFAULT_MAX_RENAME_ATTEMPTS;
use glob::Pattern;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the organized root created inside the source directory by default.
pub const DEFAULT_TARGET_DIR_NAME: &str = "Organized";

const LOCAL_CONFIG_FILE: &str = ".downloads-organizer.toml";

/// Errors raised while loading or compiling configuration.
#[derive(Debug, Clone)]
pub enum ConfigError {
    /// An explicitly requested config file does not exist.
    ConfigNotFound(PathBuf),
    /// The file is not valid TOML or has wrongly typed keys.
    ConfigInvalid(String),
    /// A filter glob failed to compile.
    InvalidGlobPattern(String),
    /// A filter regex failed to compile.
    InvalidRegexPattern { pattern: String, reason: String },
    /// The config file exists but could not be read.
    IoError(String),
    /// No source directory was given and `HOME` is not set.
    MissingHomeDirectory,
    /// A category (or the default category) has a blank name.
    EmptyCategoryName,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConfigNotFound(path) => write!(f, "No config file at {}", path.display()),
            Self::ConfigInvalid(msg) => write!(f, "Malformed config file: {}", msg),
            Self::InvalidGlobPattern(pattern) => write!(f, "Bad filter glob '{}'", pattern),
            Self::InvalidRegexPattern { pattern, reason } => {
                write!(f, "Bad filter regex '{}': {}", pattern, reason)
            }
            Self::IoError(msg) => write!(f, "Could not read config file: {}", msg),
            Self::MissingHomeDirectory => {
                write!(f, "HOME is not set; pass a source directory explicitly")
            }
            Self::EmptyCategoryName => write!(f, "Category names must not be empty"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// The TOML document as written by the user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub source_dir: Option<PathBuf>,
    pub target_dir: Option<PathBuf>,
    pub default_category: String,
    pub max_rename_attempts: u32,
    pub categories: Option<Vec<CategoryConfig>>,
    pub filters: FilterRules,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            source_dir: None,
            target_dir: None,
            default_category: DEFAULT_CATEGORY.to_string(),
            max_rename_attempts: DEFAULT_MAX_RENAME_ATTEMPTS,
            categories: None,
            filters: FilterRules::default(),
        }
    }
}

/// One `[[categories]]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryConfig {
    pub name: String,
    #[serde(default)]
    pub extensions: Vec<String>,
}

/// `[filters]`: which files in the source directory are left alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterRules {
    /// Organize dotfiles too. On unless set to false.
    pub enable_hidden_files: bool,
    pub exclude: ExcludeRules,
    /// Matches here win over every exclude rule.
    pub include: IncludeRules,
}

impl Default for FilterRules {
    fn default() -> Self {
        Self {
            enable_hidden_files: true,
            exclude: ExcludeRules::default(),
            include: IncludeRules::default(),
        }
    }
}

/// `[filters.exclude]`. All rules match against the bare file name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExcludeRules {
    /// Exact names, e.g. `desktop.ini`.
    pub filenames: Vec<String>,
    /// Globs, e.g. `*.crdownload`.
    pub patterns: Vec<String>,
    /// Last extension, case-insensitive, dot optional.
    pub extensions: Vec<String>,
    pub regex: Vec<String>,
}

/// `[filters.include]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IncludeRules {
    pub patterns: Vec<String>,
}

impl ConfigFile {
    /// Finds and parses the config file.
    ///
    /// Lookup order:
    /// 1. `config_path`, when given (it must exist)
    /// 2. `.downloads-organizer.toml` in the working directory
    /// 3. `$HOME/.config/downloads-organizer/config.toml`
    /// 4. built-in defaults
    ///
    /// # Errors
    ///
    /// Fails when a file is found (or requested) but cannot be read or parsed.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let candidate = match config_path {
            Some(path) => Some(path.to_path_buf()),
            None => Self::discover(),
        };

        match candidate {
            Some(path) => Self::read(&path),
            None => Ok(Self::default()),
        }
    }

    fn discover() -> Option<PathBuf> {
        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.is_file() {
            return Some(local);
        }

        home_dir()
            .map(|home| home.join(".config/downloads-organizer/config.toml"))
            .filter(|path| path.is_file())
    }

    fn read(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::ConfigNotFound(path.to_path_buf()));
        }

        tracing::debug!(path = %path.display(), "loading config");
        let text = fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
        Self::parse(&text)
    }

    /// Parses a TOML document.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ConfigInvalid(e.to_string()))
    }
}

/// Immutable configuration for one organizer run.
#[derive(Debug, Clone)]
pub struct OrganizerConfig {
    pub source_dir: PathBuf,
    pub target_dir: PathBuf,
    pub categories: CategoryTable,
    pub max_rename_attempts: u32,
    pub filters: CompiledFilters,
}

impl OrganizerConfig {
    /// Defaults for `source_dir`: organized root at `source_dir/Organized`,
    /// the built-in category table, and no filtering.
    pub fn new(source_dir: &Path) -> Self {
        Self {
            source_dir: source_dir.to_path_buf(),
            target_dir: source_dir.join(DEFAULT_TARGET_DIR_NAME),
            categories: CategoryTable::default(),
            max_rename_attempts: DEFAULT_MAX_RENAME_ATTEMPTS,
            filters: CompiledFilters::allow_all(),
        }
    }

    /// Builds a config from a parsed file plus command-line overrides.
    ///
    /// Overrides win over file values; the source falls back to `~/Downloads`.
    pub fn from_file(
        file: ConfigFile,
        source_override: Option<&Path>,
        target_override: Option<&Path>,
    ) -> Result<Self, ConfigError> {
        let source_dir = match source_override.map(Path::to_path_buf).or(file.source_dir) {
            Some(dir) => expand_home(&dir),
            None => home_dir()
                .ok_or(ConfigError::MissingHomeDirectory)?
                .join("Downloads"),
        };
        let target_dir = target_override
            .map(Path::to_path_buf)
            .or(file.target_dir)
            .map(|dir| expand_home(&dir))
            .unwrap_or_else(|| source_dir.join(DEFAULT_TARGET_DIR_NAME));

        let categories = match file.categories {
            Some(entries) => entries
                .iter()
                .map(|entry| {
                    if entry.name.trim().is_empty() {
                        Err(ConfigError::EmptyCategoryName)
                    } else {
                        Ok(Category::new(&entry.name, &entry.extensions))
                    }
                })
                .collect::<Result<Vec<_>, _>>()?,
            None => standard_categories(),
        };
        if file.default_category.trim().is_empty() {
            return Err(ConfigError::EmptyCategoryName);
        }

        Ok(Self {
            source_dir,
            target_dir,
            categories: CategoryTable::new(categories, &file.default_category),
            max_rename_attempts: file.max_rename_attempts,
            filters: CompiledFilters::new(file.filters)?,
        })
    }

    /// Loads the config file (see [`ConfigFile::load`]) and applies overrides.
    pub fn load(
        config_path: Option<&Path>,
        source_override: Option<&Path>,
        target_override: Option<&Path>,
    ) -> Result<Self, ConfigError> {
        let file = ConfigFile::load(config_path)?;
        Self::from_file(file, source_override, target_override)
    }

    pub fn with_target_dir(mut self, target_dir: &Path) -> Self {
        self.target_dir = target_dir.to_path_buf();
        self
    }

    pub fn with_categories(mut self, categories: CategoryTable) -> Self {
        self.categories = categories;
        self
    }

    pub fn with_max_rename_attempts(mut self, attempts: u32) -> Self {
        self.max_rename_attempts = attempts;
        self
    }

    pub fn with_filters(mut self, filters: CompiledFilters) -> Self {
        self.filters = filters;
        self
    }
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .filter(|home| !home.is_empty())
        .map(PathBuf::from)
}

/// Expands a leading `~` to the home directory.
fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

fn compile_globs(patterns: &[String]) -> Result<Vec<Pattern>, ConfigError> {
    patterns
        .iter()
        .map(|pattern| {
            Pattern::new(pattern).map_err(|_| ConfigError::InvalidGlobPattern(pattern.clone()))
        })
        .collect()
}

fn compile_regexes(patterns: &[String]) -> Result<Vec<Regex>, ConfigError> {
    patterns
        .iter()
        .map(|pattern| {
            Regex::new(pattern).map_err(|e| ConfigError::InvalidRegexPattern {
                pattern: pattern.clone(),
                reason: e.to_string(),
            })
        })
        .collect()
}

/// [`FilterRules`] with every pattern compiled, ready to test file names.
#[derive(Debug, Clone)]
pub struct CompiledFilters {
    hidden_files: bool,
    names: HashSet<String>,
    extensions: HashSet<String>,
    globs: Vec<Pattern>,
    regexes: Vec<Regex>,
    keep: Vec<Pattern>,
}

impl CompiledFilters {
    /// # Errors
    ///
    /// Returns the first glob or regex that fails to compile.
    pub fn new(rules: FilterRules) -> Result<Self, ConfigError> {
        let FilterRules {
            enable_hidden_files,
            exclude,
            include,
        } = rules;

        Ok(Self {
            hidden_files: enable_hidden_files,
            globs: compile_globs(&exclude.patterns)?,
            regexes: compile_regexes(&exclude.regex)?,
            keep: compile_globs(&include.patterns)?,
            extensions: exclude
                .extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_lowercase())
                .collect(),
            names: exclude.filenames.into_iter().collect(),
        })
    }

    /// Filters that let every file through.
    pub fn allow_all() -> Self {
        Self {
            hidden_files: true,
            names: HashSet::new(),
            extensions: HashSet::new(),
            globs: Vec::new(),
            regexes: Vec::new(),
            keep: Vec::new(),
        }
    }

    /// Whether `file_name` should be organized.
    ///
    /// An include match always wins. Otherwise the file is dropped if it is a
    /// disabled dotfile or hits any exclude rule.
    pub fn should_include(&self, file_name: &str) -> bool {
        if self.keep.iter().any(|glob| glob.matches(file_name)) {
            return true;
        }
        !self.is_excluded(file_name)
    }

    fn is_excluded(&self, file_name: &str) -> bool {
        if !self.hidden_files && file_name.starts_with('.') {
            return true;
        }
        if self.names.contains(file_name) {
            return true;
        }
        let excluded_extension = Path::new(file_name)
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .is_some_and(|ext| self.extensions.contains(&ext));

        excluded_extension
            || self.globs.iter().any(|glob| glob.matches(file_name))
            || self.regexes.iter().any(|regex| regex.is_match(file_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules_with(exclude: ExcludeRules) -> FilterRules {
        FilterRules {
            enable_hidden_files: true,
            exclude,
            include: IncludeRules::default(),
        }
    }

    #[test]
    fn test_default_config_file() {
        let file = ConfigFile::default();
        assert_eq!(file.default_category, DEFAULT_CATEGORY);
        assert_eq!(file.max_rename_attempts, DEFAULT_MAX_RENAME_ATTEMPTS);
        assert!(file.categories.is_none());
        assert!(file.filters.enable_hidden_files);
    }

    #[test]
    fn test_organizer_config_defaults() {
        let config = OrganizerConfig::new(Path::new("/downloads"));
        assert_eq!(config.target_dir, PathBuf::from("/downloads/Organized"));
        assert_eq!(config.categories.classify(".pdf"), "Documents");
        assert!(config.filters.should_include(".hidden"));
    }

    #[test]
    fn test_parse_partial_file_keeps_defaults() {
        let file = ConfigFile::parse("max_rename_attempts = 3\n").unwrap();
        assert_eq!(file.max_rename_attempts, 3);
        assert_eq!(file.default_category, DEFAULT_CATEGORY);
    }

    #[test]
    fn test_custom_categories_replace_table_in_order() {
        let file = ConfigFile::parse(
            r#"
default_category = "Other"

[[categories]]
name = "Ebooks"
extensions = ["EPUB", ".pdf"]

[[categories]]
name = "Documents"
extensions = [".pdf", ".txt"]
"#,
        )
        .unwrap();
        let config = OrganizerConfig::from_file(file, Some(Path::new("/in")), None).unwrap();

        assert_eq!(config.categories.classify(".epub"), "Ebooks");
        assert_eq!(config.categories.classify(".PDF"), "Ebooks");
        assert_eq!(config.categories.classify(".txt"), "Documents");
        assert_eq!(config.categories.classify(".jpg"), "Other");
        assert_eq!(config.categories.default_category(), "Other");
    }

    #[test]
    fn test_overrides_win_over_file() {
        let file = ConfigFile::parse(
            "source_dir = \"/from/file\"\ntarget_dir = \"/file/target\"\n",
        )
        .unwrap();
        let config = OrganizerConfig::from_file(
            file,
            Some(Path::new("/cli/source")),
            Some(Path::new("/cli/target")),
        )
        .unwrap();
        assert_eq!(config.source_dir, PathBuf::from("/cli/source"));
        assert_eq!(config.target_dir, PathBuf::from("/cli/target"));
    }

    #[test]
    fn test_target_defaults_under_source() {
        let file = ConfigFile::parse("source_dir = \"/from/file\"\n").unwrap();
        let config = OrganizerConfig::from_file(file, None, None).unwrap();
        assert_eq!(config.target_dir, PathBuf::from("/from/file/Organized"));
    }

    #[test]
    fn test_empty_category_name_rejected() {
        let file = ConfigFile::parse("[[categories]]\nname = \" \"\n").unwrap();
        let result = OrganizerConfig::from_file(file, Some(Path::new("/in")), None);
        assert!(matches!(result, Err(ConfigError::EmptyCategoryName)));
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let result = ConfigFile::parse("max_rename_attempts = \"lots\"");
        assert!(matches!(result, Err(ConfigError::ConfigInvalid(_))));
    }

    #[test]
    fn test_missing_explicit_config_file() {
        let result = ConfigFile::load(Some(Path::new("/no/such/config.toml")));
        assert!(matches!(result, Err(ConfigError::ConfigNotFound(_))));
    }

    #[test]
    fn test_hidden_file_excluded_when_disabled() {
        let compiled = CompiledFilters::new(FilterRules {
            enable_hidden_files: false,
            ..FilterRules::default()
        })
        .unwrap();

        assert!(!compiled.should_include(".DS_Store"));
        assert!(compiled.should_include("photo.jpg"));
    }

    #[test]
    fn test_exclude_exact_filename() {
        let compiled = CompiledFilters::new(rules_with(ExcludeRules {
            filenames: vec!["desktop.ini".to_string()],
            ..Default::default()
        }))
        .unwrap();

        assert!(!compiled.should_include("desktop.ini"));
        assert!(compiled.should_include("image.jpg"));
    }

    #[test]
    fn test_exclude_extensions_case_insensitive() {
        let compiled = CompiledFilters::new(rules_with(ExcludeRules {
            extensions: vec!["part".to_string(), ".tmp".to_string()],
            ..Default::default()
        }))
        .unwrap();

        assert!(!compiled.should_include("movie.mkv.part"));
        assert!(!compiled.should_include("file.TMP"));
        assert!(compiled.should_include("file.txt"));
    }

    #[test]
    fn test_exclude_glob_patterns() {
        let compiled = CompiledFilters::new(rules_with(ExcludeRules {
            patterns: vec!["*.crdownload".to_string(), "file?.txt".to_string()],
            ..Default::default()
        }))
        .unwrap();

        assert!(!compiled.should_include("setup.exe.crdownload"));
        assert!(!compiled.should_include("file1.txt"));
        assert!(compiled.should_include("file12.txt"));
    }

    #[test]
    fn test_exclude_regex() {
        let compiled = CompiledFilters::new(rules_with(ExcludeRules {
            regex: vec![r"^~\$.*".to_string()],
            ..Default::default()
        }))
        .unwrap();

        assert!(!compiled.should_include("~$report.docx"));
        assert!(compiled.should_include("report.docx"));
    }

    #[test]
    fn test_include_overrides_exclude() {
        let compiled = CompiledFilters::new(FilterRules {
            enable_hidden_files: false,
            exclude: ExcludeRules {
                extensions: vec!["tmp".to_string()],
                ..Default::default()
            },
            include: IncludeRules {
                patterns: vec!["keep*".to_string(), ".important".to_string()],
            },
        })
        .unwrap();

        assert!(compiled.should_include("keep.tmp"));
        assert!(compiled.should_include(".important"));
        assert!(!compiled.should_include("drop.tmp"));
        assert!(!compiled.should_include(".other"));
    }

    #[test]
    fn test_invalid_patterns_return_error() {
        let bad_regex = CompiledFilters::new(rules_with(ExcludeRules {
            regex: vec!["[invalid(".to_string()],
            ..Default::default()
        }));
        assert!(matches!(
            bad_regex,
            Err(ConfigError::InvalidRegexPattern { .. })
        ));

        let bad_glob = CompiledFilters::new(rules_with(ExcludeRules {
            patterns: vec!["[invalid".to_string()],
            ..Default::default()
        }));
        assert!(matches!(bad_glob, Err(ConfigError::InvalidGlobPattern(_))));
    }
}
