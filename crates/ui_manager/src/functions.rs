//! # UI Function Library
//!
//! Free-function conveniences over the manager/policy/layout chain, mirroring
//! what gameplay code actually wants to say: "push this widget onto that
//! layer for this player". Every function resolves the player's root layout
//! through the current policy and degrades to a quiet no-op (or `None`) when
//! any link of the chain is missing.

use crate::manager::UiManager;
use std::sync::Arc;
use tracing::{debug, warn};
use ui_extension_system::{PlayerId, UiTag, WidgetClass, WidgetRef};
use ui_layout::{AsyncWidgetLayerState, LoadHandle, SoftClassRef, UiLayout};

/// The player's root layout under the current policy, if any.
pub fn get_ui_layout(manager: &UiManager, player: PlayerId) -> Option<Arc<UiLayout>> {
    manager.current_policy()?.get_root_layout(player)
}

/// Pushes an already-loaded widget class onto a layer of the player's root
/// layout. Returns `None` when the player has no layout or the layer is not
/// registered.
pub fn push_content_to_layer_for_player(
    manager: &UiManager,
    player: PlayerId,
    layer: &UiTag,
    widget_class: &WidgetClass,
) -> Option<WidgetRef> {
    let layout = get_ui_layout(manager, player)?;
    layout.push_widget_to_layer(layer, widget_class, |_| {})
}

/// Streams a widget class in and pushes it onto a layer of the player's root
/// layout, suspending the player's input until the push completes or is
/// cancelled. Returns the load handle, or `None` when the reference is null
/// or the player has no layout.
pub fn push_streamed_content_to_layer_for_player(
    manager: &UiManager,
    player: PlayerId,
    layer: UiTag,
    widget_class: &SoftClassRef,
) -> Option<LoadHandle> {
    if widget_class.is_null() {
        warn!("Refusing to stream a null widget class reference");
        return None;
    }

    let layout = get_ui_layout(manager, player)?;
    let handle = layout.push_widget_to_layer_async(
        layer,
        true,
        widget_class,
        |state, _widget| {
            if state == AsyncWidgetLayerState::AfterPush {
                debug!("Streamed content push finished");
            }
        },
    );
    Some(handle)
}

/// Removes a widget from whichever layer of the player's root layout holds
/// it. Requests against an unknown widget change nothing.
pub fn pop_content_from_layer(manager: &UiManager, player: PlayerId, widget: &WidgetRef) {
    if let Some(layout) = get_ui_layout(manager, player) {
        layout.find_and_remove_widget(widget);
    }
}
