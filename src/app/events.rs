//! Defines the events exchanged between background workers, the interactive
//! loop and whatever front end renders the state.

use std::path::PathBuf;

use super::view_model::UiState;
use crate::core::{GeneratedContent, GenerationProgress, SearchIndex, TreeChange};

/// Everything that travels over the event channel.
///
/// Worker results (`IndexReady`, `IndexFailed`, `ContentGenerated`,
/// `GenerationFailed`) are consumed by [`handle_user_event`](super::handle_user_event);
/// the rest are for presentation.
#[derive(Debug)]
pub enum UserEvent {
    /// A complete state update to re-render the UI.
    StateUpdate(Box<UiState>),
    /// Fine-grained tree mutations, in the order they happened.
    TreeChanged(Vec<TreeChange>),
    /// A finished index build, tagged with the generation it was started for.
    IndexReady {
        generation: u64,
        index: Box<SearchIndex>,
    },
    IndexFailed {
        generation: u64,
        message: String,
    },
    /// Per-file progress of a running generation.
    GenerationProgress(GenerationProgress),
    /// A finished generation; `written_to` is set when an output file was written.
    ContentGenerated {
        content: Box<GeneratedContent>,
        written_to: Option<PathBuf>,
    },
    GenerationFailed(String),
    /// A shell description of the current selection.
    ShellScript(String),
    /// An error message to be displayed to the user.
    ShowError(String),
    /// A non-fatal problem, e.g. a search hit that is no longer in the tree.
    ShowWarning(String),
}
