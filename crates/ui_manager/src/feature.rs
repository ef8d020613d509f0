//! # Feature Actions
//!
//! Game features contribute UI declaratively: a [`FeatureAction`] is an
//! async-activated unit the feature framework drives, and
//! [`AddWidgetsAction`] is the stock implementation that pushes layout
//! widgets onto layers and registers slot widgets as player-scoped
//! extensions, unwinding both on deactivation.

use crate::functions;
use crate::manager::UiManager;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, warn};
use ui_extension_system::{
    player_context, ExtensionHandle, LocalPlayer, PlayerId, UiExtensionSystem, UiTag, WidgetClass,
    WidgetRef,
};

/// Errors surfaced by feature-action lifecycle calls.
#[derive(Debug, thiserror::Error)]
pub enum FeatureError {
    #[error("Feature initialization error: {0}")]
    Initialization(String),
    #[error("Feature execution error: {0}")]
    Execution(String),
}

/// The services a feature action operates against.
#[derive(Clone)]
pub struct FeatureContext {
    pub extension_system: Arc<UiExtensionSystem>,
    pub manager: Arc<UiManager>,
}

/// An activatable unit of game-feature behavior.
///
/// Activation applies the feature's effects; deactivation must reverse them.
/// Errors are logged by the feature framework but do not prevent other
/// actions from running.
#[async_trait]
pub trait FeatureAction: Send + Sync + 'static {
    fn name(&self) -> &str;

    async fn on_activate(&mut self, context: &FeatureContext) -> Result<(), FeatureError>;

    async fn on_deactivate(&mut self, _context: &FeatureContext) -> Result<(), FeatureError> {
        Ok(())
    }
}

/// A layout widget to push onto a layer of each player's root layout.
#[derive(Debug, Clone)]
pub struct LayoutEntry {
    /// The layer to insert the widget in.
    pub layer: UiTag,
    /// The layout widget to spawn.
    pub layout_class: WidgetClass,
}

/// A widget to contribute to a named UI slot.
#[derive(Debug, Clone)]
pub struct SlotEntry {
    /// The slot where this widget should be placed.
    pub slot: UiTag,
    /// The widget to spawn.
    pub widget_class: WidgetClass,
}

#[derive(Default)]
struct PerPlayerData {
    layouts_added: Vec<WidgetRef>,
    extension_handles: Vec<ExtensionHandle>,
}

/// Adds layout widgets and slot widgets for every tracked player, and takes
/// them all back out on deactivation.
pub struct AddWidgetsAction {
    layout: Vec<LayoutEntry>,
    widgets: Vec<SlotEntry>,
    active: DashMap<PlayerId, PerPlayerData>,
}

impl AddWidgetsAction {
    pub fn new(layout: Vec<LayoutEntry>, widgets: Vec<SlotEntry>) -> Self {
        Self {
            layout,
            widgets,
            active: DashMap::new(),
        }
    }

    /// Applies this action's entries for one player. Called for every
    /// already-present player on activation, and again by the host whenever
    /// a player joins while the feature is active.
    pub fn add_widgets_for_player(&self, context: &FeatureContext, player: &Arc<LocalPlayer>) {
        if self.active.contains_key(&player.id()) {
            warn!(
                "Feature widgets already added for player [{}]; replacing them",
                player.controller_id()
            );
            self.remove_widgets_for_player(context, player.id());
        }

        let mut data = PerPlayerData::default();

        for entry in &self.layout {
            if let Some(widget) = functions::push_content_to_layer_for_player(
                &context.manager,
                player.id(),
                &entry.layer,
                &entry.layout_class,
            ) {
                data.layouts_added.push(widget);
            } else {
                debug!(
                    "Layer [{}] absent for player [{}]; layout entry skipped",
                    entry.layer,
                    player.controller_id()
                );
            }
        }

        for entry in &self.widgets {
            let handle = context.extension_system.register_extension_as_widget_for_context(
                &entry.slot,
                Arc::downgrade(&player_context(player)),
                entry.widget_class.clone(),
                None,
            );
            data.extension_handles.push(handle);
        }

        self.active.insert(player.id(), data);
    }

    /// Reverses [`add_widgets_for_player`](Self::add_widgets_for_player).
    pub fn remove_widgets_for_player(&self, context: &FeatureContext, player: PlayerId) {
        let Some((_, data)) = self.active.remove(&player) else {
            return;
        };

        for widget in &data.layouts_added {
            functions::pop_content_from_layer(&context.manager, player, widget);
        }

        for handle in &data.extension_handles {
            handle.unregister();
        }
    }

    pub fn active_player_count(&self) -> usize {
        self.active.len()
    }

    fn reset(&self, context: &FeatureContext) {
        let players: Vec<PlayerId> = self.active.iter().map(|entry| *entry.key()).collect();
        for player in players {
            self.remove_widgets_for_player(context, player);
        }
    }
}

#[async_trait]
impl FeatureAction for AddWidgetsAction {
    fn name(&self) -> &str {
        "add_widgets"
    }

    async fn on_activate(&mut self, context: &FeatureContext) -> Result<(), FeatureError> {
        let Some(policy) = context.manager.current_policy() else {
            return Err(FeatureError::Execution("no UI policy installed".into()));
        };

        for player in policy.players() {
            self.add_widgets_for_player(context, &player);
        }

        Ok(())
    }

    async fn on_deactivate(&mut self, context: &FeatureContext) -> Result<(), FeatureError> {
        self.reset(context);
        Ok(())
    }
}
