//! The interactive controller: state, commands, background tasks and the
//! view model a front end renders.

pub mod commands;
pub mod events;
pub mod helpers;
pub mod proxy;
pub mod state;
pub mod tasks;
pub mod view_model;

use events::UserEvent;
use helpers::with_state_and_notify;
use proxy::EventProxy;
use state::AppState;

/// Applies worker results to the state.
///
/// Index results are applied only when they belong to the most recently
/// requested build; anything older is dropped. Presentation events are handed
/// back unchanged for the front end.
pub fn handle_user_event<P: EventProxy>(
    state: &mut AppState,
    proxy: &P,
    event: UserEvent,
) -> Option<UserEvent> {
    match event {
        UserEvent::IndexReady { generation, index } => {
            if generation != state.index_generation {
                tracing::warn!(
                    "Discarding stale index build #{} (latest is #{})",
                    generation,
                    state.index_generation
                );
                return None;
            }
            with_state_and_notify(state, proxy, |s| {
                tracing::info!("Applied index build #{}: {} entries", generation, index.len());
                s.index = *index;
                s.applied_index_generation = generation;
                s.refresh_search_results();
            });
            None
        }
        UserEvent::IndexFailed {
            generation,
            message,
        } => {
            if generation != state.index_generation {
                tracing::warn!("Ignoring failure of stale index build #{}", generation);
                return None;
            }
            with_state_and_notify(state, proxy, |s| {
                s.applied_index_generation = generation;
                s.status_message = format!("ERROR: {message}");
            });
            proxy.send_event(UserEvent::ShowError(message));
            None
        }
        UserEvent::ContentGenerated {
            content,
            written_to,
        } => {
            with_state_and_notify(state, proxy, |s| {
                s.is_generating = false;
                s.status_message = match &written_to {
                    Some(path) => format!("Saved: {}", path.display()),
                    None => format!(
                        "Copied: {} files . ~{} tokens . {:.1} KB",
                        content.stats.files,
                        content.stats.estimated_tokens,
                        content.stats.kilobytes()
                    ),
                };
                s.last_generated = Some(*content);
            });
            None
        }
        UserEvent::GenerationFailed(message) => {
            with_state_and_notify(state, proxy, |s| {
                s.is_generating = false;
                s.status_message = format!("ERROR: {message}");
            });
            proxy.send_event(UserEvent::ShowError(message));
            None
        }
        other => Some(other),
    }
}
