//! The one traversal every component shares.
//!
//! Children are visited directories first, then by case-insensitive name.
//! Ignored or excluded entries are pruned together with their subtree, and a
//! directory that cannot be listed simply contributes no children.

use std::cmp::Ordering;
use std::path::Path;
use walkdir::{DirEntry, WalkDir};

use super::exclusions::ExclusionSet;
use super::ignore::IgnoreRules;

/// Sort key used for every listing: subdirectories before files, then by
/// lowercased name, raw name as the tie-breaker so the order is total.
pub fn directories_first(a: &DirEntry, b: &DirEntry) -> Ordering {
    let a_is_file = !a.file_type().is_dir();
    let b_is_file = !b.file_type().is_dir();
    a_is_file
        .cmp(&b_is_file)
        .then_with(|| {
            a.file_name()
                .to_string_lossy()
                .to_lowercase()
                .cmp(&b.file_name().to_string_lossy().to_lowercase())
        })
        .then_with(|| a.file_name().cmp(b.file_name()))
}

/// Walks `root` depth-first, pre-order, yielding `root` itself first.
///
/// The root is never filtered; everything below it is checked against the ignore
/// rules (relative to `root`) and the exclusion snapshot.
pub fn visible_entries<'a>(
    root: &Path,
    exclusions: &'a ExclusionSet,
    rules: &'a IgnoreRules,
) -> impl Iterator<Item = DirEntry> + 'a {
    let root = root.to_path_buf();
    WalkDir::new(&root)
        .follow_links(false)
        .sort_by(directories_first)
        .into_iter()
        .filter_entry(move |entry| {
            if entry.depth() == 0 {
                return true;
            }
            // Glob patterns see the path relative to the root, never its ancestors.
            let relative = entry.path().strip_prefix(&root).unwrap_or(entry.path());
            !(rules.should_ignore(relative, entry.file_type().is_dir())
                || exclusions.is_excluded(entry.path()))
        })
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                // Permission denied, vanished directory, ...: no further children.
                tracing::debug!("Skipping unreadable entry: {}", e);
                None
            }
        })
}

/// True for regular files and for symlinks that resolve to one.
pub fn is_file_like(entry: &DirEntry) -> bool {
    let file_type = entry.file_type();
    file_type.is_file() || (file_type.is_symlink() && entry.path().is_file())
}
