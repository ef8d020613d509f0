//! # UI Manager
//!
//! The orchestration tier of the Prism UI stack: a process-wide
//! [`UiManager`] owns the current [`UiPolicy`], the policy owns one
//! [`ui_layout::UiLayout`] per local player, and game features contribute
//! widgets through [`FeatureAction`]s and the function library.
//!
//! ## Core Pieces
//!
//! - [`UiManager`] - owns the installed policy and fans player lifecycle
//!   notifications out to it
//! - [`UiPolicy`] - per-player root-layout creation, viewport attach/detach
//!   and primary-control arbitration
//! - [`functions`] - push/pop/lookup conveniences resolving the
//!   manager -> policy -> layout chain
//! - [`AddWidgetsAction`] - declarative layout and slot contributions with
//!   handle cleanup on deactivation
//! - [`UiSettings`] - the TOML settings record loaded once at startup
//!
//! ## Quick Start Example
//!
//! ```rust
//! use std::sync::Arc;
//! use ui_extension_system::{base_widget_class, LocalPlayer, NullWidgetHost, WidgetClass};
//! use ui_layout::{DeferredAssetLoader, InputSuspendController};
//! use ui_manager::*;
//!
//! let settings = UiSettings::default();
//! let policy = UiPolicy::new(
//!     PolicyConfig::from_settings(
//!         &settings,
//!         WidgetClass::subclass_of("OverlayLayout", &base_widget_class()),
//!     ),
//!     NullWidgetHost::new(),
//!     Arc::new(InputSuspendController::new()),
//!     DeferredAssetLoader::new(),
//!     NullViewportSink::new(),
//! );
//!
//! let manager = UiManager::new();
//! manager.initialize(policy);
//!
//! let player = LocalPlayer::new(0, true);
//! manager.notify_player_added(&player);
//! assert!(functions::get_ui_layout(&manager, player.id()).is_some());
//! ```

pub mod feature;
pub mod functions;
pub mod manager;
pub mod policy;
pub mod settings;

pub use feature::{
    AddWidgetsAction, FeatureAction, FeatureContext, FeatureError, LayoutEntry, SlotEntry,
};
pub use manager::UiManager;
pub use policy::{
    MultiplayerInteractionMode, NullViewportSink, PolicyConfig, UiPolicy, ViewportSink,
};
pub use settings::{
    DialogSettings, GeneralSettings, LoadingScreenSettings, SettingsError, UiSettings,
};
