//! # UI Extension System
//!
//! A tag-addressed extension registry for game UI: features publish widgets
//! or data objects ("extensions") at hierarchical tags, and UI slots
//! ("extension points") subscribe to those tags, so disparate features can
//! inject content into named locations without compile-time knowledge of
//! each other.
//!
//! ## Core Pieces
//!
//! - [`UiExtensionSystem`] - the registry: two tag-keyed maps cross-notifying
//!   on every registration event
//! - [`ExtensionHandle`] / [`ExtensionPointHandle`] - safe unregistration
//!   decoupled from entry ownership
//! - [`ExtensionPointSlot`] - a consumer that materializes matched
//!   extensions as child widgets
//! - [`UiTag`] - hierarchical dotted identifiers with upward matching
//! - [`WidgetClass`] - class identity for contract validation
//!
//! ## Quick Start Example
//!
//! ```rust
//! use ui_extension_system::*;
//!
//! let system = create_ui_extension_system();
//! let score_tag = UiTag::parse("HUD.Slot.Score").unwrap();
//!
//! // A feature contributes its widget class to the score slot.
//! let handle = system.register_extension_as_widget(
//!     &score_tag,
//!     WidgetClass::subclass_of("ScoreWidget", &base_widget_class()),
//!     None,
//! );
//!
//! // A layout binds a slot to the same tag and materializes the widget.
//! let host = NullWidgetHost::new();
//! let player = LocalPlayer::new(0, true);
//! let mut slot = ExtensionPointSlot::new(Some(score_tag), ExtensionPointMatch::ExactMatch);
//! slot.bind(&system, host.clone(), &player);
//! assert_eq!(slot.entry_count(), 1);
//!
//! // Tearing the feature down removes the child again.
//! handle.unregister();
//! assert_eq!(slot.entry_count(), 0);
//! ```
//!
//! ## Delivery Semantics
//!
//! Registration, unregistration and all resulting notifications run
//! synchronously inside the call; bucket snapshots are taken before callbacks
//! so re-entrant mutation is safe. Multiple extensions matching one point are
//! delivered in registration order - `priority` is metadata for the consumer,
//! not a delivery order.

pub mod class;
pub mod extension;
pub mod slot;
pub mod system;
pub mod tag;
pub mod types;
pub mod widget;


pub use class::{base_widget_class, ClassId, WidgetClass};
pub use extension::{
    ContextObject, ContextRef, ExtensionAction, ExtensionData, ExtensionHandle, ExtensionObject,
    ExtensionPointHandle, ExtensionPointMatch, ExtensionRequest,
};
pub use slot::{ExtensionPointSlot, WidgetClassResolver, WidgetConfigurator};
pub use system::{create_ui_extension_system, UiExtensionSystem};
pub use tag::{TagError, UiTag};
pub use types::{player_context, LocalPlayer, PlayerId};
pub use widget::{NullWidget, NullWidgetHost, Widget, WidgetHost, WidgetRef};
