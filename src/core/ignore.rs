//! Static, non-persistent ignore rules applied to every traversal.

use globset::{Glob, GlobSet, GlobSetBuilder};
use std::collections::{BTreeSet, HashSet};
use std::path::Path;

/// Directory names that are never shown or collected.
pub const DEFAULT_IGNORE_DIRS: &[&str] = &[
    "node_modules",
    "__pycache__",
    ".git",
    "env",
    "dist",
    "migrations",
    ".next",
    "build",
    ".venv",
    "media",
];

/// File extensions (with the leading dot, lowercase) that are never shown or collected.
pub const DEFAULT_IGNORE_EXTENSIONS: &[&str] = &[
    ".pyc", ".zip", ".png", ".jpg", ".jpeg", ".svg", ".ico", ".woff", ".woff2", ".ttf", ".map",
    ".lock",
];

/// The ignore rules shared by the tree, the search index and the aggregator.
///
/// Cheap to clone; background workers take their own copy at launch.
#[derive(Debug, Clone)]
pub struct IgnoreRules {
    dir_names: HashSet<String>,
    extensions: HashSet<String>,
    patterns: GlobSet,
}

impl Default for IgnoreRules {
    fn default() -> Self {
        Self::new(
            DEFAULT_IGNORE_DIRS.iter().copied(),
            DEFAULT_IGNORE_EXTENSIONS.iter().copied(),
            &BTreeSet::new(),
        )
    }
}

impl IgnoreRules {
    pub fn new<D, E>(dir_names: D, extensions: E, patterns: &BTreeSet<String>) -> Self
    where
        D: IntoIterator,
        D::Item: AsRef<str>,
        E: IntoIterator,
        E::Item: AsRef<str>,
    {
        let extensions = extensions
            .into_iter()
            .map(|ext| {
                let ext = ext.as_ref().trim().to_lowercase();
                if ext.starts_with('.') {
                    ext
                } else {
                    format!(".{ext}")
                }
            })
            .collect();

        Self {
            dir_names: dir_names
                .into_iter()
                .map(|d| d.as_ref().trim().to_string())
                .collect(),
            extensions,
            patterns: build_globset_from_patterns(patterns),
        }
    }

    /// Rules that ignore nothing at all.
    pub fn none() -> Self {
        Self::new(
            std::iter::empty::<&str>(),
            std::iter::empty::<&str>(),
            &BTreeSet::new(),
        )
    }

    /// Ignored directory names, sorted.
    pub fn dir_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.dir_names.iter().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Ignored extensions (lowercase, with the dot), sorted.
    pub fn extensions(&self) -> Vec<&str> {
        let mut extensions: Vec<&str> = self.extensions.iter().map(String::as_str).collect();
        extensions.sort_unstable();
        extensions
    }

    /// True when user glob patterns are configured.
    pub fn has_patterns(&self) -> bool {
        !self.patterns.is_empty()
    }

    /// Decides whether a directory entry is hidden from every view.
    ///
    /// `path` is only consulted for the glob patterns; the name rules look at
    /// the final component alone.
    pub fn should_ignore(&self, path: &Path, is_dir: bool) -> bool {
        let name = match path.file_name() {
            Some(name) => name.to_string_lossy(),
            None => return false,
        };

        if name.starts_with('.') {
            return true;
        }

        if is_dir {
            if self.dir_names.contains(name.as_ref()) {
                return true;
            }
        } else if let Some(ext) = extension_of(&name) {
            if self.extensions.contains(&ext) {
                return true;
            }
        }

        self.patterns.is_match(path)
    }
}

/// Lowercased extension including the dot, following the "last dot that is not
/// the first character" convention.
fn extension_of(name: &str) -> Option<String> {
    let idx = name.rfind('.')?;
    if idx == 0 {
        return None;
    }
    Some(name[idx..].to_lowercase())
}

/// Builds a `GlobSet` from a set of `.gitignore`-style patterns.
pub fn build_globset_from_patterns(patterns: &BTreeSet<String>) -> GlobSet {
    let mut builder = GlobSetBuilder::new();

    for pattern in patterns {
        let trimmed_pattern = pattern.trim();
        if trimmed_pattern.is_empty() || trimmed_pattern.starts_with('#') {
            continue;
        }

        if let Some(dir_pattern) = trimmed_pattern.strip_suffix('/') {
            // "target/" matches the directory itself and everything below it.
            for glob in [format!("**/{dir_pattern}"), format!("**/{dir_pattern}/**")] {
                match Glob::new(&glob) {
                    Ok(glob) => {
                        builder.add(glob);
                    }
                    Err(e) => tracing::warn!("Skipping invalid ignore pattern {:?}: {}", pattern, e),
                }
            }
        } else {
            match Glob::new(&format!("**/{trimmed_pattern}")) {
                Ok(glob) => {
                    builder.add(glob);
                }
                Err(e) => tracing::warn!("Skipping invalid ignore pattern {:?}: {}", pattern, e),
            }
        }
    }

    builder.build().unwrap_or_else(|e| {
        tracing::error!("Failed to build glob set from patterns: {}", e);
        GlobSet::empty()
    })
}
