//! Responsible for transforming the `AppState` into a `UiState` view model.
//!
//! The tree is flattened into rows in traversal order. Only rows whose
//! ancestors are all open are emitted, the same set a tree widget would show.

use serde::Serialize;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use super::state::AppState;
use crate::core::{GenerationStats, IndexEntry, NodeId, TreeModel};

/// A serializable representation of the application state for the UI.
#[derive(Serialize, Clone, Debug)]
pub struct UiState {
    pub root: Option<PathBuf>,
    pub rows: Vec<TreeRow>,
    pub selected_count: usize,
    pub exclusions: Vec<String>,
    pub search_query: String,
    pub search_results: Vec<IndexEntry>,
    pub is_indexing: bool,
    pub is_generating: bool,
    pub status_message: String,
    pub stats: Option<GenerationStats>,
}

/// One visible line of the tree.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct TreeRow {
    pub id: NodeId,
    pub name: String,
    pub path: PathBuf,
    pub depth: usize,
    pub is_directory: bool,
    pub checked: bool,
    pub open: bool,
    pub highlighted: bool,
    /// Short file-type tag such as `[rs]`; `None` for directories.
    pub tag: Option<String>,
}

/// Creates the complete `UiState` from the current `AppState`.
pub fn generate_ui_state(state: &AppState) -> UiState {
    UiState {
        root: state.root().map(Path::to_path_buf),
        rows: visible_rows(&state.tree),
        selected_count: state.tree.get_selected().len(),
        exclusions: state
            .exclusions
            .snapshot()
            .iter()
            .map(str::to_string)
            .collect(),
        search_query: state.search_query.clone(),
        search_results: state.search_results.clone(),
        is_indexing: state.is_indexing(),
        is_generating: state.is_generating,
        status_message: state.status_message.clone(),
        stats: state.last_generated.as_ref().map(|g| g.stats.clone()),
    }
}

/// Rows for every node whose ancestors are all open.
pub fn visible_rows(tree: &TreeModel) -> Vec<TreeRow> {
    let highlighted = tree.highlighted();
    // Depth at which a closed directory hides everything below it.
    let mut hidden_below: Option<usize> = None;
    let mut rows = Vec::new();

    for (id, depth) in tree.walk() {
        if let Some(limit) = hidden_below {
            if depth > limit {
                continue;
            }
            hidden_below = None;
        }
        let Some(node) = tree.node(id) else { continue };

        if node.is_directory && !node.open {
            hidden_below = Some(depth);
        }
        rows.push(TreeRow {
            id,
            name: node.name(),
            path: node.path.clone(),
            depth,
            is_directory: node.is_directory,
            checked: node.checked,
            open: node.open,
            highlighted: highlighted == Some(id),
            tag: (!node.is_directory).then(|| file_tag(&node.path)),
        });
    }
    rows
}

/// The bracketed type tag shown next to file names.
pub fn file_tag(path: &Path) -> String {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    let tag = match ext.as_str() {
        "jsx" => "tsx",
        "py" | "ts" | "tsx" | "js" | "json" | "md" | "css" | "html" | "sql" | "sh" | "rs"
        | "toml" | "yaml" | "yml" => ext.as_str(),
        _ => "txt",
    };
    format!("[{tag}]")
}

/// Plain-text rendering of tree rows, one per line.
///
/// ```text
/// [ ] [+] project
///   [x] [+] src
///     [x] [rs] main.rs
///   [ ] [md] README.md  <<
/// ```
pub fn render_rows(rows: &[TreeRow]) -> String {
    let mut out = String::new();
    for row in rows {
        let check = if row.checked { "[x]" } else { "[ ]" };
        let kind = match (&row.tag, row.is_directory) {
            (_, true) => "[+]",
            (Some(tag), false) => tag.as_str(),
            (None, false) => "[txt]",
        };
        let _ = write!(out, "{}{} {} {}", "  ".repeat(row.depth), check, kind, row.name);
        if row.highlighted {
            out.push_str("  <<");
        }
        out.push('\n');
    }
    out
}

/// Selection counter shown next to the tree.
pub fn selection_label(count: usize) -> String {
    match count {
        1 => "1 selected item".to_string(),
        n => format!("{n} selected items"),
    }
}
