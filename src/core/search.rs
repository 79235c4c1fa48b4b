//! A flat, independently built index of every visible entry under a root.

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use super::error::CoreError;
use super::exclusions::ExclusionSet;
use super::ignore::IgnoreRules;
use super::walk::visible_entries;

/// Default number of hits returned by [`SearchIndex::query`].
pub const DEFAULT_RESULT_LIMIT: usize = 40;
/// Upper bound for any configured limit.
pub const MAX_RESULT_LIMIT: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexEntry {
    pub path: PathBuf,
    pub name: String,
    /// Path relative to the index root, always `/`-separated.
    pub relative_path: String,
    pub is_directory: bool,
}

/// An immutable snapshot produced by one full traversal.
#[derive(Debug, Clone, Default)]
pub struct SearchIndex {
    root: PathBuf,
    entries: Vec<IndexEntry>,
}

impl SearchIndex {
    /// Walks `root` once and records every non-excluded, non-ignored file and
    /// directory below it. The root itself is not an entry.
    ///
    /// Blocking; callers run it off the interactive context.
    pub fn build(
        root: &Path,
        exclusions: &ExclusionSet,
        rules: &IgnoreRules,
    ) -> Result<Self, CoreError> {
        let root =
            fs::canonicalize(root).map_err(|_| CoreError::RootNotFound(root.to_path_buf()))?;

        let entries: Vec<IndexEntry> = visible_entries(&root, exclusions, rules)
            .filter(|entry| entry.depth() > 0)
            .map(|entry| {
                let relative_path = entry
                    .path()
                    .strip_prefix(&root)
                    .map(|rel| {
                        rel.components()
                            .map(|c| c.as_os_str().to_string_lossy())
                            .collect::<Vec<_>>()
                            .join("/")
                    })
                    .unwrap_or_else(|_| entry.path().to_string_lossy().into_owned());
                IndexEntry {
                    name: entry.file_name().to_string_lossy().into_owned(),
                    is_directory: entry.file_type().is_dir(),
                    relative_path,
                    path: entry.into_path(),
                }
            })
            .collect();

        tracing::info!("Indexed {} entries under {:?}", entries.len(), root);
        Ok(Self { root, entries })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whitespace-separated terms, all of which must appear (case-insensitively)
    /// in the relative path. At most `limit` hits, in index order.
    ///
    /// A blank query returns nothing.
    pub fn query(&self, text: &str, limit: usize) -> Vec<&IndexEntry> {
        let terms: Vec<String> = text.split_whitespace().map(str::to_lowercase).collect();
        if terms.is_empty() {
            return Vec::new();
        }

        self.entries
            .iter()
            .filter(|entry| Self::matches_terms(&entry.relative_path, &terms))
            .take(limit.clamp(1, MAX_RESULT_LIMIT))
            .collect()
    }

    fn matches_terms(relative_path: &str, terms: &[String]) -> bool {
        let haystack = relative_path.to_lowercase();
        terms.iter().all(|term| haystack.contains(term.as_str()))
    }
}
