//! Contains all the command handlers a front end can call.
//!
//! Every handler runs on the interactive loop, mutates the `AppState` it is
//! given and reports back through the `EventProxy`. Long traversals are handed
//! to `tasks`.

use std::fs;
use std::path::{Path, PathBuf};
use tokio::task::JoinHandle;

use super::events::UserEvent;
use super::helpers::with_state_and_notify;
use super::proxy::EventProxy;
use super::state::AppState;
use super::tasks::{self, OutputTarget};
use crate::config::settings;
use crate::core::{shell_script, CoreError, IndexEntry, Navigator, NodeId};

/// Builds the tree for `root` and starts indexing it in the background.
pub fn load_root<P: EventProxy>(state: &mut AppState, proxy: &P, root: &Path) {
    let exclusions = state.exclusions.snapshot();
    let rules = state.ignore_rules();

    match state.tree.build(root, &exclusions, &rules) {
        Ok(()) => {
            state.search_query.clear();
            state.search_results.clear();
            state.last_generated = None;
            tasks::start_index_build(state, proxy.clone());
            state.status_message = format!("Tree loaded: {}", state.tree.root_path().display());
        }
        Err(e) => {
            tracing::warn!("Could not load {:?}: {}", root, e);
            state.reset_root_state();
            state.status_message = "ERROR: Root path does not exist".to_string();
            proxy.send_event(UserEvent::ShowError(e.to_string()));
        }
    }
    with_state_and_notify(state, proxy, |_| {});
}

/// Full rebuild of the loaded root, e.g. after the exclusion list changed.
pub fn reload<P: EventProxy>(state: &mut AppState, proxy: &P) {
    match state.root().map(Path::to_path_buf) {
        Some(root) => load_root(state, proxy, &root),
        None => tracing::debug!("Reload requested without a loaded root"),
    }
}

/// Flips (or forces) the checked state of a node and its subtree.
pub fn toggle_node<P: EventProxy>(
    state: &mut AppState,
    proxy: &P,
    id: NodeId,
    explicit: Option<bool>,
) {
    let result = with_state_and_notify(state, proxy, |s| s.tree.toggle(id, explicit));
    if let Err(e) = result {
        proxy.send_event(UserEvent::ShowError(e.to_string()));
    }
}

/// Like [`toggle_node`], addressed by path.
///
/// Returns `false` (with a warning event) when the path is not in the tree.
pub fn toggle_path<P: EventProxy>(
    state: &mut AppState,
    proxy: &P,
    path: &Path,
    explicit: Option<bool>,
) -> bool {
    match state.tree.find(path) {
        Some(id) => {
            toggle_node(state, proxy, id, explicit);
            true
        }
        None => {
            proxy.send_event(UserEvent::ShowWarning(
                CoreError::NotInTree(path.to_path_buf()).to_string(),
            ));
            false
        }
    }
}

pub fn toggle_expansion<P: EventProxy>(state: &mut AppState, proxy: &P, id: NodeId) {
    let result = with_state_and_notify(state, proxy, |s| {
        let open = s.tree.node(id).map(|n| n.open).unwrap_or(false);
        s.tree.set_open(id, !open)
    });
    if let Err(e) = result {
        proxy.send_event(UserEvent::ShowError(e.to_string()));
    }
}

pub fn expand_collapse_all<P: EventProxy>(state: &mut AppState, proxy: &P, expand: bool) {
    with_state_and_notify(state, proxy, |s| s.tree.set_all_open(expand));
}

/// Excludes a node straight from the tree: the registry gains the path, the
/// node leaves the live tree without a rebuild, and the index is rebuilt.
pub fn exclude_node<P: EventProxy>(state: &mut AppState, proxy: &P, id: NodeId) {
    if state.tree.root() == Some(id) {
        proxy.send_event(UserEvent::ShowWarning(
            "The tree root cannot be excluded".to_string(),
        ));
        return;
    }
    let Some(path) = state.tree.node(id).map(|n| n.path.clone()) else {
        proxy.send_event(UserEvent::ShowError(CoreError::UnknownNode(id).to_string()));
        return;
    };

    state.exclusions.add(&path);
    if let Err(e) = state.tree.remove_node(id) {
        tracing::warn!("Excluded node vanished before removal: {}", e);
    }
    tasks::start_index_build(state, proxy.clone());
    state.refresh_search_results();

    with_state_and_notify(state, proxy, |s| {
        s.status_message = format!("[x] Excluded: {} entries in exclusion list", s.exclusions.len());
    });
}

/// Excludes an arbitrary path. Paths in the live tree go through [`exclude_node`].
pub fn exclude_path<P: EventProxy>(state: &mut AppState, proxy: &P, path: &Path) {
    if let Some(id) = state.tree.find(path) {
        exclude_node(state, proxy, id);
        return;
    }

    let path = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    state.exclusions.add(&path);
    tasks::start_index_build(state, proxy.clone());
    with_state_and_notify(state, proxy, |s| {
        s.status_message = format!("Exclusion list: {} entries", s.exclusions.len());
    });
}

/// Removes entries from the exclusion list and rebuilds tree and index.
pub fn remove_exclusions<P: EventProxy>(state: &mut AppState, proxy: &P, entries: &[String]) {
    let removed = state.exclusions.remove(entries);
    if removed == 0 {
        with_state_and_notify(state, proxy, |s| {
            s.status_message = "No matching exclusion entries".to_string();
        });
        return;
    }
    after_exclusion_change(state, proxy);
}

pub fn clear_exclusions<P: EventProxy>(state: &mut AppState, proxy: &P) {
    if state.exclusions.is_empty() {
        return;
    }
    state.exclusions.clear();
    after_exclusion_change(state, proxy);
}

fn after_exclusion_change<P: EventProxy>(state: &mut AppState, proxy: &P) {
    reload(state, proxy);
    with_state_and_notify(state, proxy, |s| {
        s.status_message = format!("Exclusion list: {} entries", s.exclusions.len());
    });
}

/// Runs `query` against the current index.
pub fn update_search<P: EventProxy>(state: &mut AppState, proxy: &P, query: &str) {
    with_state_and_notify(state, proxy, |s| {
        s.search_query = query.to_string();
        s.refresh_search_results();
        s.status_message = if s.search_query.trim().is_empty() {
            "Type to search...".to_string()
        } else if s.index.is_empty() && s.is_indexing() {
            "Indexing...".to_string()
        } else {
            format!("{} result(s)", s.search_results.len())
        };
    });
}

/// Highlights a search hit in the tree.
///
/// A hit that is no longer in the tree yields a warning, never an error.
pub fn go_to<P: EventProxy>(state: &mut AppState, proxy: &P, entry: &IndexEntry) -> bool {
    let result = with_state_and_notify(state, proxy, |s| {
        let result = Navigator::select(&mut s.tree, entry);
        s.status_message = match &result {
            Ok(_) => {
                let parent = entry
                    .path
                    .parent()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default();
                format!(">> {}   ->   {}", entry.name, parent)
            }
            Err(_) => format!(
                "WARN: {} not found -- excluded, or reload the tree?",
                entry.name
            ),
        };
        result
    });

    match result {
        Ok(_) => true,
        Err(e) => {
            proxy.send_event(UserEvent::ShowWarning(e.to_string()));
            false
        }
    }
}

/// [`go_to`] for the `position`-th current search result.
pub fn go_to_result<P: EventProxy>(state: &mut AppState, proxy: &P, position: usize) -> bool {
    match state.search_results.get(position).cloned() {
        Some(entry) => go_to(state, proxy, &entry),
        None => false,
    }
}

pub fn clear_selection<P: EventProxy>(state: &mut AppState, proxy: &P) {
    with_state_and_notify(state, proxy, |s| s.tree.clear_selection());
}

/// Starts generating content for the current selection.
///
/// With nothing selected an error event is sent and no task is started.
pub fn generate_content<P: EventProxy>(
    state: &mut AppState,
    proxy: &P,
    target: OutputTarget,
) -> Option<JoinHandle<()>> {
    match tasks::start_content_generation(state, proxy.clone(), target) {
        Ok(handle) => {
            with_state_and_notify(state, proxy, |s| {
                s.status_message = "Generating...".to_string();
            });
            Some(handle)
        }
        Err(e) => {
            proxy.send_event(UserEvent::ShowError(e.to_string()));
            None
        }
    }
}

/// Builds the shell description of the current selection and sends it as a
/// `ShellScript` event.
pub fn shell_command<P: EventProxy>(state: &mut AppState, proxy: &P) -> Option<String> {
    let selected = state.tree.get_selected();
    if selected.is_empty() {
        proxy.send_event(UserEvent::ShowError(CoreError::EmptySelection.to_string()));
        return None;
    }

    let script = shell_script(
        &selected,
        &state.config.output_file(),
        &state.exclusions.snapshot(),
        &state.ignore_rules(),
    );
    proxy.send_event(UserEvent::ShellScript(script.clone()));
    Some(script)
}

/// Stores (or clears) the default root and saves the configuration.
pub fn set_default_root<P: EventProxy>(
    state: &mut AppState,
    proxy: &P,
    root: Option<PathBuf>,
    config_file: Option<&Path>,
) {
    if let Some(root) = &root {
        if !root.is_dir() {
            proxy.send_event(UserEvent::ShowError(
                CoreError::RootNotFound(root.clone()).to_string(),
            ));
            return;
        }
    }

    state.config.default_root = root.map(|r| fs::canonicalize(&r).unwrap_or(r));
    if let Err(e) = settings::save_config(&state.config, config_file) {
        tracing::warn!("Failed to save config after changing the default root: {}", e);
        proxy.send_event(UserEvent::ShowError(format!("Could not save config: {e}")));
    }
    with_state_and_notify(state, proxy, |s| {
        s.status_message = match &s.config.default_root {
            Some(root) => format!("Default root: {}", root.display()),
            None => "Default root cleared".to_string(),
        };
    });
}
