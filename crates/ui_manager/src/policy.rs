//! # UI Policy
//!
//! A [`UiPolicy`] owns the root layout of every local player: it creates a
//! layout (and its root widget) when a player joins, attaches and detaches
//! it from the viewport as the player comes and goes, and arbitrates which
//! player's layout is in control when the interaction mode only allows one
//! at a time.
//!
//! The viewport itself belongs to the host; the policy only reports attach
//! and detach through the consumed [`ViewportSink`] capability.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};
use ui_extension_system::{LocalPlayer, PlayerId, WidgetClass, WidgetHost, WidgetRef};
use ui_layout::{AssetLoader, InputSuspendController, UiLayout};

use crate::settings::UiSettings;

/// How the UI behaves towards other players in multiplayer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MultiplayerInteractionMode {
    /// Fullscreen viewport for the primary player only, regardless of the
    /// other players' existence.
    #[default]
    PrimaryOnly,

    /// Fullscreen viewport for one player, but players can swap control over
    /// whose is displayed and whose is dormant.
    SingleToggle,

    /// Viewports displayed simultaneously for every player.
    Simultaneous,
}

/// Where root layouts get attached for display. The host supplies the real
/// screen; [`NullViewportSink`] suffices for headless runs and tests.
pub trait ViewportSink: Send + Sync {
    fn add_layout_to_viewport(&self, player: &Arc<LocalPlayer>, root_widget: &WidgetRef);

    fn remove_layout_from_viewport(&self, player: &Arc<LocalPlayer>, root_widget: &WidgetRef);
}

/// A viewport with no screen behind it.
#[derive(Default)]
pub struct NullViewportSink;

impl NullViewportSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self)
    }
}

impl ViewportSink for NullViewportSink {
    fn add_layout_to_viewport(&self, player: &Arc<LocalPlayer>, _root_widget: &WidgetRef) {
        debug!("Viewport attach for player [{}]", player.controller_id());
    }

    fn remove_layout_from_viewport(&self, player: &Arc<LocalPlayer>, _root_widget: &WidgetRef) {
        debug!("Viewport detach for player [{}]", player.controller_id());
    }
}

/// Static configuration of a policy.
#[derive(Debug, Clone)]
pub struct PolicyConfig {
    pub interaction_mode: MultiplayerInteractionMode,
    /// The root layout widget class instantiated per player.
    pub layout_class: WidgetClass,
}

impl PolicyConfig {
    /// Builds the default policy configuration from the settings record. The
    /// caller resolves the settings' layout class path to a concrete class.
    pub fn from_settings(settings: &UiSettings, layout_class: WidgetClass) -> Self {
        Self {
            interaction_mode: settings.general.multiplayer_interaction_mode,
            layout_class,
        }
    }
}

/// Display information for the root portion of one player's UI.
struct RootViewportLayoutInfo {
    player: Arc<LocalPlayer>,
    layout: Arc<UiLayout>,
    root_widget: WidgetRef,
    added_to_viewport: bool,
}

/// Per-player root-layout lifecycle and primary-control arbitration.
pub struct UiPolicy {
    config: PolicyConfig,
    host: Arc<dyn WidgetHost>,
    input: Arc<InputSuspendController>,
    loader: Arc<dyn AssetLoader>,
    viewport: Arc<dyn ViewportSink>,
    root_layouts: Mutex<Vec<RootViewportLayoutInfo>>,
}

impl UiPolicy {
    pub fn new(
        config: PolicyConfig,
        host: Arc<dyn WidgetHost>,
        input: Arc<InputSuspendController>,
        loader: Arc<dyn AssetLoader>,
        viewport: Arc<dyn ViewportSink>,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            host,
            input,
            loader,
            viewport,
            root_layouts: Mutex::new(Vec::new()),
        })
    }

    pub fn interaction_mode(&self) -> MultiplayerInteractionMode {
        self.config.interaction_mode
    }

    // ========================================================================
    // Player Notifications
    // ========================================================================

    /// Creates the player's root layout on first sight, or re-attaches the
    /// existing one.
    pub fn notify_player_added(&self, player: &Arc<LocalPlayer>) {
        let existing = {
            let mut infos = self.root_layouts.lock();
            infos
                .iter_mut()
                .find(|info| info.player.id() == player.id())
                .map(|info| {
                    info.added_to_viewport = true;
                    info.root_widget.clone()
                })
        };

        match existing {
            Some(root_widget) => self.add_layout_to_viewport(player, &root_widget),
            None => self.create_layout_widget(player),
        }
    }

    /// Detaches the player's root layout, transferring control back to the
    /// primary player when a secondary layout was in control.
    pub fn notify_player_removed(&self, player: &Arc<LocalPlayer>) {
        let (detached, control_transfer) = {
            let mut infos = self.root_layouts.lock();
            let Some(position) = infos.iter().position(|info| info.player.id() == player.id())
            else {
                return;
            };

            let detached = {
                let info = &mut infos[position];
                let widget = info.added_to_viewport.then(|| info.root_widget.clone());
                info.added_to_viewport = false;
                widget
            };

            let mut control_transfer = None;
            if self.config.interaction_mode == MultiplayerInteractionMode::SingleToggle
                && !player.is_primary_player()
                && !infos[position].layout.is_dormant()
            {
                let secondary = infos[position].layout.clone();
                let primary = infos
                    .iter()
                    .find(|info| info.player.is_primary_player())
                    .map(|info| info.layout.clone());
                control_transfer = Some((secondary, primary));
            }

            (detached, control_transfer)
        };

        if let Some(root_widget) = detached {
            self.remove_layout_from_viewport(player, &root_widget);
        }

        if let Some((secondary, primary)) = control_transfer {
            // A secondary player's root is leaving while in control; hand
            // control back to the primary player's root.
            secondary.set_dormant(true);
            if let Some(primary) = primary {
                primary.set_dormant(false);
            }
        }
    }

    /// Removes and releases the player's root layout entirely.
    pub fn notify_player_destroyed(&self, player: &Arc<LocalPlayer>) {
        self.notify_player_removed(player);

        let released = {
            let mut infos = self.root_layouts.lock();
            infos
                .iter()
                .position(|info| info.player.id() == player.id())
                .map(|position| infos.remove(position))
        };

        if let Some(info) = released {
            info!(
                "Player [{}]'s root layout released",
                info.player.controller_id()
            );
        }
    }

    // ========================================================================
    // Control Transfer
    // ========================================================================

    /// Wakes a dormant layout and puts whichever layout currently has
    /// control to sleep. Only meaningful under
    /// [`MultiplayerInteractionMode::SingleToggle`].
    pub fn request_primary_control(&self, layout: &Arc<UiLayout>) {
        if self.config.interaction_mode != MultiplayerInteractionMode::SingleToggle
            || !layout.is_dormant()
        {
            return;
        }

        let active = self
            .root_layouts
            .lock()
            .iter()
            .find(|info| !info.layout.is_dormant())
            .map(|info| info.layout.clone());

        if let Some(active) = active {
            active.set_dormant(true);
        }

        layout.set_dormant(false);
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    pub fn get_root_layout(&self, player: PlayerId) -> Option<Arc<UiLayout>> {
        self.root_layouts
            .lock()
            .iter()
            .find(|info| info.player.id() == player)
            .map(|info| info.layout.clone())
    }

    /// Every player this policy currently tracks.
    pub fn players(&self) -> Vec<Arc<LocalPlayer>> {
        self.root_layouts
            .lock()
            .iter()
            .map(|info| info.player.clone())
            .collect()
    }

    pub fn root_layout_count(&self) -> usize {
        self.root_layouts.lock().len()
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn create_layout_widget(&self, player: &Arc<LocalPlayer>) {
        let root_widget = self
            .host
            .create_widget(Some(player.id()), &self.config.layout_class);
        let layout = UiLayout::new(player.clone(), self.input.clone(), self.loader.clone());

        self.root_layouts.lock().push(RootViewportLayoutInfo {
            player: player.clone(),
            layout,
            root_widget: root_widget.clone(),
            added_to_viewport: true,
        });

        self.add_layout_to_viewport(player, &root_widget);
    }

    fn add_layout_to_viewport(&self, player: &Arc<LocalPlayer>, root_widget: &WidgetRef) {
        info!(
            "Adding player [{}]'s root layout [{}] to the viewport",
            player.controller_id(),
            root_widget.class().name()
        );
        self.viewport.add_layout_to_viewport(player, root_widget);
    }

    fn remove_layout_from_viewport(&self, player: &Arc<LocalPlayer>, root_widget: &WidgetRef) {
        info!(
            "Removing player [{}]'s root layout [{}] from the viewport",
            player.controller_id(),
            root_widget.class().name()
        );
        self.viewport.remove_layout_from_viewport(player, root_widget);
    }
}
