//! # UI Layout
//!
//! Per-player layered UI for the Prism UI stack: a [`UiLayout`] owns named
//! layer stacks (HUD, menus, modals) and pushes widgets onto them, either
//! synchronously from an already-loaded class or asynchronously through a
//! soft-reference loader, with the owning player's input suspended for the
//! duration of the load.
//!
//! ## Core Pieces
//!
//! - [`UiLayout`] - named layer registry with the sync and async push
//!   operations
//! - [`InputSuspendController`] / [`SuspendToken`] - uniquely-tokenized
//!   input suspension that composes across overlapping operations
//! - [`AssetLoader`] / [`LoadHandle`] - the consumed soft-reference loader
//!   capability with at-most-once complete-or-cancel delivery
//! - [`WidgetStack`] / [`ActivatableWidgetStack`] - the layer container seam
//! - [`CreateWidgetAsyncAction`] / [`PushContentToLayerAction`] - one-shot
//!   cancellable wrappers for fire-and-forget gameplay code
//!
//! ## Quick Start Example
//!
//! ```rust
//! use std::sync::Arc;
//! use ui_extension_system::{base_widget_class, LocalPlayer, NullWidgetHost, UiTag};
//! use ui_layout::*;
//!
//! let player = LocalPlayer::new(0, true);
//! let input = Arc::new(InputSuspendController::new());
//! let loader = DeferredAssetLoader::new();
//! let layout = UiLayout::new(player.clone(), input.clone(), loader.clone());
//!
//! let host = NullWidgetHost::new();
//! let menu_layer = UiTag::parse("UI.Layer.Menu").unwrap();
//! layout.register_layer(
//!     menu_layer.clone(),
//!     ActivatableWidgetStack::new(host, Some(player.id())),
//! );
//!
//! let class_ref = SoftClassRef::new("/Game/UI/W_PauseMenu");
//! loader.register_class(&class_ref, base_widget_class());
//!
//! // Input stays suspended until the streamed class lands on the layer.
//! let handle = layout.push_widget_to_layer_async(menu_layer, true, &class_ref, |_, _| {});
//! assert!(input.is_input_suspended(player.id()));
//!
//! loader.pump();
//! assert!(handle.is_completed());
//! assert!(!input.is_input_suspended(player.id()));
//! ```
//!
//! ## Suspension Discipline
//!
//! Every async push that asks for input suspension takes a unique token
//! before the load starts and releases it on exactly one of completion or
//! cancellation; layer transitions additionally push and pop their own
//! tokens, so input stays blocked while any operation is still in flight.

pub mod actions;
pub mod input;
pub mod layout;
pub mod loader;
pub mod stack;

pub use actions::{ActionState, CreateWidgetAsyncAction, PushContentToLayerAction};
pub use input::{InputSuspendController, SuspendToken};
pub use layout::{AsyncWidgetLayerState, UiLayout};
pub use loader::{
    AssetLoader, DeferredAssetLoader, LoadCallback, LoadHandle, SoftClassRef, StreamingAssetLoader,
};
pub use stack::{ActivatableWidgetStack, TransitionListener, WidgetStack};
