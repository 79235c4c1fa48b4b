//! The permanent path blacklist.
//!
//! Storage is a flat, sorted set of absolute path strings; containment is
//! hierarchical (an entry also covers everything nested below it).

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf, MAIN_SEPARATOR};
use std::sync::Arc;

use super::error::CoreError;

/// An immutable view of the excluded paths.
///
/// Cloning is cheap, so background workers capture one at launch and keep a
/// stable view even if the registry changes while they run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionSet {
    entries: Arc<BTreeSet<String>>,
}

impl ExclusionSet {
    pub fn from_paths<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entries: Arc::new(paths.into_iter().map(Into::into).collect()),
        }
    }

    /// True if `path` equals an entry or is nested below one.
    pub fn is_excluded(&self, path: &Path) -> bool {
        let path = path.to_string_lossy();
        self.entries.iter().any(|entry| {
            path.as_ref() == entry.as_str()
                || (path.starts_with(entry.as_str())
                    && path[entry.len()..].starts_with(MAIN_SEPARATOR))
        })
    }

    pub fn contains(&self, entry: &str) -> bool {
        self.entries.contains(entry)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }
}

/// On-disk document: `{ "paths": [ ...sorted... ] }`.
#[derive(Debug, Default, Serialize, Deserialize)]
struct ExclusionDocument {
    #[serde(default)]
    paths: Vec<String>,
}

/// Owns the exclusion set and keeps its backing store in sync.
///
/// Every mutation writes the whole set immediately. A failed write is logged and
/// swallowed: the in-memory set stays authoritative for the running session.
#[derive(Debug)]
pub struct ExclusionRegistry {
    set: ExclusionSet,
    store_path: Option<PathBuf>,
}

impl ExclusionRegistry {
    /// A registry that never touches the disk.
    pub fn in_memory() -> Self {
        Self {
            set: ExclusionSet::default(),
            store_path: None,
        }
    }

    /// Reads the store at `store_path`. A missing or corrupt store yields an
    /// empty registry that will overwrite it on the next mutation.
    pub fn load(store_path: impl Into<PathBuf>) -> Self {
        let store_path = store_path.into();
        let set = match fs::read_to_string(&store_path) {
            Ok(content) => match serde_json::from_str::<ExclusionDocument>(&content) {
                Ok(doc) => {
                    tracing::info!(
                        "Loaded {} exclusion(s) from {:?}",
                        doc.paths.len(),
                        store_path
                    );
                    ExclusionSet::from_paths(doc.paths)
                }
                Err(e) => {
                    tracing::warn!(
                        "Exclusion store at {:?} is corrupt ({}). Starting with an empty blacklist.",
                        store_path,
                        e
                    );
                    ExclusionSet::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => ExclusionSet::default(),
            Err(e) => {
                tracing::warn!("Could not read exclusion store {:?}: {}", store_path, e);
                ExclusionSet::default()
            }
        };

        Self {
            set,
            store_path: Some(store_path),
        }
    }

    pub fn store_path(&self) -> Option<&Path> {
        self.store_path.as_deref()
    }

    pub fn is_excluded(&self, path: &Path) -> bool {
        self.set.is_excluded(path)
    }

    /// A snapshot for handing to a traversal.
    pub fn snapshot(&self) -> ExclusionSet {
        self.set.clone()
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    /// Adds `path`. Returns `false` if it was already present.
    pub fn add(&mut self, path: &Path) -> bool {
        let entry = path.to_string_lossy().into_owned();
        if self.set.contains(&entry) {
            return false;
        }
        self.mutate(|entries| {
            entries.insert(entry);
        });
        true
    }

    /// Removes every listed entry. Returns how many were actually present.
    pub fn remove<I, S>(&mut self, paths: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let to_remove: Vec<String> = paths
            .into_iter()
            .map(|p| p.as_ref().to_string())
            .filter(|p| self.set.contains(p))
            .collect();
        if to_remove.is_empty() {
            return 0;
        }
        let removed = to_remove.len();
        self.mutate(|entries| {
            for entry in &to_remove {
                entries.remove(entry);
            }
        });
        removed
    }

    pub fn clear(&mut self) {
        self.mutate(BTreeSet::clear);
    }

    fn mutate<F>(&mut self, f: F)
    where
        F: FnOnce(&mut BTreeSet<String>),
    {
        let mut entries = (*self.set.entries).clone();
        f(&mut entries);
        self.set = ExclusionSet {
            entries: Arc::new(entries),
        };

        if let Some(path) = &self.store_path {
            if let Err(e) = persist(path, &self.set) {
                tracing::warn!("Failed to persist exclusions: {}", e);
            }
        }
    }
}

/// Writes the full set through a temp file in the same directory and renames it
/// over the store, so readers never observe a half-written document.
fn persist(path: &Path, set: &ExclusionSet) -> Result<(), CoreError> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir).map_err(|e| CoreError::io(e, dir))?;

    let doc = ExclusionDocument {
        paths: set.iter().map(str::to_string).collect(),
    };
    let mut json = serde_json::to_string_pretty(&doc).map_err(|e| CoreError::Persist {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    json.push('\n');

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| CoreError::io(e, dir))?;
    tmp.write_all(json.as_bytes())
        .map_err(|e| CoreError::io(e, path))?;
    tmp.persist(path).map_err(|e| CoreError::Persist {
        path: path.to_path_buf(),
        reason: e.error.to_string(),
    })?;

    tracing::debug!("Saved {} exclusion(s) to {:?}", set.len(), path);
    Ok(())
}
