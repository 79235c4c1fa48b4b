//! Defines the custom error type for the `core` module.

use std::path::PathBuf;
use thiserror::Error;

use super::tree::NodeId;

/// The primary error type for the `core` module.
///
/// Filesystem trouble inside a traversal never shows up here; directories that
/// cannot be listed are simply treated as childless. What remains are the errors
/// a caller has to react to.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Represents an I/O error, typically from file system operations.
    #[error("I/O error for path {1}: {0}")]
    Io(#[source] std::io::Error, PathBuf),

    /// The traversal root does not exist.
    #[error("Root path does not exist: {0}")]
    RootNotFound(PathBuf),

    /// Generate/copy/export was requested with nothing checked.
    #[error("Select at least one file or folder first")]
    EmptySelection,

    /// A path that is not (or no longer) part of the live tree.
    #[error("Path is not in the tree (excluded, deleted or needs a reload): {0}")]
    NotInTree(PathBuf),

    /// A node id that was removed or never issued by this tree.
    #[error("Unknown tree node: {0:?}")]
    UnknownNode(NodeId),

    /// Represents an error that occurred when a Tokio task was joined.
    #[error("Task join error: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// Writing a persisted document failed.
    #[error("Failed to persist {path}: {reason}")]
    Persist { path: PathBuf, reason: String },
}

impl CoreError {
    pub(crate) fn io(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        CoreError::Io(err, path.into())
    }
}
