//! Path classification: file-type categories and excluded system regions
//!
//! Everything here is pure. The category table is fixed; the excluded-root
//! table defaults to [`SYSTEM_ROOTS`] and can be extended through the
//! `[exclusions]` section of the configuration.

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::Serialize;
use std::path::{Component, Path};

use crate::config::Config;

/// File type categories used to tag large files and duplicates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Video,
    Installer,
    Archive,
    Image,
    Document,
    Other,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Video => "Video",
            Category::Installer => "Installer",
            Category::Archive => "Archive",
            Category::Image => "Image",
            Category::Document => "Document",
            Category::Other => "Other",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Category::Video => "🎬",
            Category::Installer => "📦",
            Category::Archive => "📁",
            Category::Image => "🖼️",
            Category::Document => "📄",
            Category::Other => "📎",
        }
    }
}

/// Directories that are never walked or hashed. Matched case-insensitively
/// against single path components.
pub const SYSTEM_ROOTS: &[&str] = &[
    "Windows",
    "Program Files",
    "Program Files (x86)",
    "ProgramData",
    "$Recycle.Bin",
    "System Volume Information",
    "Recovery",
    "MSOCache",
    "WinSxS",
    "node_modules",
    ".pnpm-store",
    "Package Cache",
];

/// Directory names that imply a category when the extension says nothing
const SEGMENT_RULES: &[(&str, Category)] = &[
    ("installers", Category::Installer),
    ("installer", Category::Installer),
    ("setup", Category::Installer),
    ("videos", Category::Video),
    ("movies", Category::Video),
    ("pictures", Category::Image),
    ("photos", Category::Image),
    ("screenshots", Category::Image),
];

fn category_for_extension(ext: &str) -> Option<Category> {
    match ext {
        "mp4" | "mkv" | "avi" | "mov" | "wmv" | "flv" | "webm" | "m4v" | "mpg" | "mpeg" | "ts"
        | "3gp" => Some(Category::Video),
        "exe" | "msi" | "msix" | "msixbundle" | "appx" | "appxbundle" | "dmg" | "pkg" | "deb"
        | "rpm" => Some(Category::Installer),
        "zip" | "rar" | "7z" | "tar" | "gz" | "bz2" | "xz" | "zst" | "cab" | "tgz" | "tbz2"
        | "iso" | "img" | "vhd" | "vhdx" | "vmdk" | "wim" => Some(Category::Archive),
        "jpg" | "jpeg" | "png" | "gif" | "bmp" | "tif" | "tiff" | "webp" | "heic" | "heif"
        | "raw" | "cr2" | "nef" | "psd" | "svg" => Some(Category::Image),
        "pdf" | "doc" | "docx" | "xls" | "xlsx" | "ppt" | "pptx" | "odt" | "ods" | "odp"
        | "rtf" | "txt" | "md" | "epub" | "csv" => Some(Category::Document),
        _ => None,
    }
}

/// Derive a category from the file extension, falling back to the names of
/// the parent directories.
pub fn classify(path: &Path) -> Category {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    if let Some(category) = ext.as_deref().and_then(category_for_extension) {
        return category;
    }

    if let Some(parent) = path.parent() {
        for component in parent.components().rev() {
            if let Component::Normal(name) = component {
                let name = name.to_string_lossy().to_lowercase();
                if let Some((_, category)) = SEGMENT_RULES.iter().find(|(seg, _)| *seg == name) {
                    return *category;
                }
            }
        }
    }

    Category::Other
}

/// True if any component of `path` is one of the default [`SYSTEM_ROOTS`].
pub fn is_excluded(path: &Path) -> bool {
    path_has_segment(path, SYSTEM_ROOTS.iter().copied())
}

fn path_has_segment<'a>(path: &Path, segments: impl Iterator<Item = &'a str> + Clone) -> bool {
    path.components().any(|c| match c {
        Component::Normal(name) => {
            let name = name.to_string_lossy();
            segments.clone().any(|seg| name.eq_ignore_ascii_case(seg))
        }
        _ => false,
    })
}

/// Returns true if this path is a Windows reparse point (junction/symlink/mount point).
///
/// `follow_links(false)` does not stop walkers from descending into
/// directory junctions, which can form cycles.
pub fn is_reparse_point(path: &Path) -> bool {
    #[cfg(windows)]
    {
        use std::os::windows::fs::MetadataExt;
        const FILE_ATTRIBUTE_REPARSE_POINT: u32 = 0x0400;
        if let Ok(meta) = std::fs::symlink_metadata(path) {
            return meta.file_attributes() & FILE_ATTRIBUTE_REPARSE_POINT != 0;
        }
        false
    }
    #[cfg(not(windows))]
    {
        let _ = path;
        false
    }
}

/// Exclusion table built from configuration.
#[derive(Debug, Clone)]
pub struct PathClassifier {
    system_roots: Vec<String>,
    patterns: GlobSet,
}

impl Default for PathClassifier {
    fn default() -> Self {
        Self {
            system_roots: SYSTEM_ROOTS.iter().map(|s| s.to_string()).collect(),
            patterns: GlobSet::empty(),
        }
    }
}

impl PathClassifier {
    /// Build from the `[exclusions]` section. Invalid glob patterns are
    /// logged and ignored.
    pub fn from_config(config: &Config) -> Self {
        let mut builder = GlobSetBuilder::new();
        for pattern in &config.exclusions.patterns {
            match Glob::new(pattern) {
                Ok(glob) => {
                    builder.add(glob);
                }
                Err(e) => log::warn!("ignoring invalid exclusion pattern {:?}: {}", pattern, e),
            }
        }
        let patterns = builder.build().unwrap_or_else(|e| {
            log::warn!("failed to compile exclusion patterns: {}", e);
            GlobSet::empty()
        });

        Self {
            system_roots: config.exclusions.system_roots.clone(),
            patterns,
        }
    }

    pub fn classify(&self, path: &Path) -> Category {
        classify(path)
    }

    /// True for paths under a configured system root or matching a user
    /// exclusion pattern.
    pub fn is_excluded(&self, path: &Path) -> bool {
        path_has_segment(path, self.system_roots.iter().map(String::as_str))
            || self.patterns.is_match(path)
    }

    /// Exclusion check for an entry found under `root`.
    ///
    /// Only the part below the root is matched against system roots, so a
    /// root the user picked explicitly is always honored. Patterns match
    /// either the path relative to the root or the full path.
    pub fn is_excluded_below(&self, root: &Path, path: &Path) -> bool {
        let relative = path.strip_prefix(root).unwrap_or(path);
        path_has_segment(relative, self.system_roots.iter().map(String::as_str))
            || self.patterns.is_match(relative)
            || self.patterns.is_match(path)
    }
}
