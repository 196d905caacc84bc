//! File categorization by extension.
//!
//! This module maps file extensions to named categories (e.g., "Images",
//! "Documents"). Categories are kept in declaration order and the first
//! category whose extension set contains the extension wins.
//!
//! # Examples
//!
//! ```
//! use downloads_organizer::file_category::{CategoryTable, DEFAULT_CATEGORY};
//!
//! let table = CategoryTable::default();
//! assert_eq!(table.classify(".pdf"), "Documents");
//! assert_eq!(table.classify(".PNG"), "Images");
//! assert_eq!(table.classify(".xyz"), DEFAULT_CATEGORY);
//! ```

use std::collections::HashSet;

/// Category used for any extension not claimed by the table.
pub const DEFAULT_CATEGORY: &str = "Miscellaneous";

/// A named bucket of extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    /// The category name, also used as the destination folder name.
    pub name: String,
    /// Lowercase extensions including the leading dot (e.g. ".pdf").
    pub extensions: HashSet<String>,
}

impl Category {
    /// Creates a category, normalizing every extension.
    pub fn new<I, S>(name: &str, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            name: name.to_string(),
            extensions: extensions
                .into_iter()
                .map(|ext| normalize_extension(ext.as_ref()))
                .filter(|ext| !ext.is_empty())
                .collect(),
        }
    }
}

/// Normalizes an extension to lowercase with a single leading dot.
///
/// An empty input stays empty so that extensionless files never match a category.
///
/// ```
/// use downloads_organizer::file_category::normalize_extension;
///
/// assert_eq!(normalize_extension("PDF"), ".pdf");
/// assert_eq!(normalize_extension(".Jpg"), ".jpg");
/// assert_eq!(normalize_extension(""), "");
/// ```
pub fn normalize_extension(ext: &str) -> String {
    let trimmed = ext.trim().trim_start_matches('.');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(".{}", trimmed.to_lowercase())
    }
}

/// Ordered list of categories with a fallback name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryTable {
    categories: Vec<Category>,
    default_category: String,
}

impl CategoryTable {
    /// Creates a table from categories in match order.
    pub fn new(categories: Vec<Category>, default_category: &str) -> Self {
        Self {
            categories,
            default_category: default_category.to_string(),
        }
    }

    /// Maps an extension (with or without leading dot, any case) to a category name.
    ///
    /// Unknown, empty or malformed extensions fall through to the default category.
    pub fn classify(&self, extension: &str) -> &str {
        let needle = normalize_extension(extension);
        if needle.is_empty() {
            return &self.default_category;
        }

        self.categories
            .iter()
            .find(|category| category.extensions.contains(&needle))
            .map(|category| category.name.as_str())
            .unwrap_or(self.default_category.as_str())
    }

    /// Returns the categories in match order.
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// Returns the fallback category name.
    pub fn default_category(&self) -> &str {
        &self.default_category
    }
}

impl Default for CategoryTable {
    fn default() -> Self {
        Self::new(standard_categories(), DEFAULT_CATEGORY)
    }
}

/// The built-in category table, in match order.
pub fn standard_categories() -> Vec<Category> {
    vec![
        Category::new(
            "Documents",
            [".pdf", ".docx", ".txt", ".rtf", ".xlsx", ".pptx", ".md"],
        ),
        Category::new(
            "Images",
            [".jpg", ".jpeg", ".png", ".gif", ".svg", ".bmp", ".webp"],
        ),
        Category::new("Music", [".mp3", ".wav", ".flac", ".aac", ".ogg"]),
        Category::new("Videos", [".mp4", ".mov", ".avi", ".mkv", ".flv", ".webm"]),
        Category::new("Archives", [".zip", ".rar", ".7z", ".tar", ".gz"]),
        Category::new("Executables", [".exe", ".msi", ".dmg", ".pkg", ".deb"]),
        Category::new("Scripts", [".py", ".js", ".sh", ".bat", ".ps1"]),
    ]
}
