//! Contains helper functions to reduce boilerplate code in other `app` modules.

use super::events::UserEvent;
use super::proxy::EventProxy;
use super::state::AppState;
use super::view_model::generate_ui_state;

/// Performs a mutation on the `AppState`, forwards any recorded tree changes
/// and then sends a `StateUpdate` event to the UI.
pub fn with_state_and_notify<F, R, P: EventProxy>(state: &mut AppState, proxy: &P, update_fn: F) -> R
where
    F: FnOnce(&mut AppState) -> R,
{
    let result = update_fn(state);
    notify(state, proxy);
    result
}

/// Sends pending tree changes and a fresh `StateUpdate`.
pub fn notify<P: EventProxy>(state: &mut AppState, proxy: &P) {
    let changes = state.tree.take_changes();
    if !changes.is_empty() {
        proxy.send_event(UserEvent::TreeChanged(changes));
    }

    let ui_state = generate_ui_state(state);
    proxy.send_event(UserEvent::StateUpdate(Box::new(ui_state)));
}
