//! # Extension Registry Core
//!
//! [`UiExtensionSystem`] is the hub that matches extension points against
//! extensions. It owns two parallel tag-keyed maps and cross-notifies on
//! every registration event: a new point is immediately backfilled with the
//! already-registered extensions it matches, and a new (or removed) extension
//! is immediately announced to every matching point.
//!
//! ## Matching
//!
//! The two directions deliberately walk the hierarchy differently:
//!
//! - Backfilling a new point walks upward from the *point's* tag (itself,
//!   then each ancestor); an `ExactMatch` point stops after its own tag.
//! - Announcing an extension walks upward from the *extension's* tag; at the
//!   first level every point in the bucket is eligible, at ancestor levels
//!   only `PartialMatch` points are.
//!
//! A point thus declares how broadly it listens, while an extension always
//! reaches up through its own chain. Do not symmetrize this: consumers rely
//! on the directional rule.
//!
//! ## Delivery
//!
//! Buckets are value-copied before callbacks run and no map lock is held
//! while user code executes, so a callback may freely register or unregister
//! entries - including itself - without skipping or duplicating any other
//! delivery in the same pass.

use crate::extension::{
    ContextRef, ExtensionAction, ExtensionCallback, ExtensionData, ExtensionHandle,
    ExtensionPointHandle, ExtensionPointMatch, ExtensionRequest, UiExtension, UiExtensionPoint,
};
use crate::class::WidgetClass;
use crate::tag::UiTag;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Creates a new extension system ready for registration.
///
/// # Examples
///
/// ```rust
/// use ui_extension_system::*;
///
/// let system = create_ui_extension_system();
///
/// let point = system.register_extension_point(
///     &UiTag::parse("HUD.Slot.Score").unwrap(),
///     ExtensionPointMatch::ExactMatch,
///     vec![base_widget_class()],
///     |action, request| {
///         println!("{:?}: {}", action, request.data);
///     },
/// );
///
/// let widget = system.register_extension_as_widget(
///     &UiTag::parse("HUD.Slot.Score").unwrap(),
///     base_widget_class(),
///     None,
/// );
///
/// widget.unregister();
/// point.unregister();
/// ```
pub fn create_ui_extension_system() -> Arc<UiExtensionSystem> {
    Arc::new(UiExtensionSystem::new())
}

type ExtensionPointList = Vec<Arc<UiExtensionPoint>>;
type ExtensionList = Vec<Arc<UiExtension>>;

/// The registry that manages UI extension points and the extensions attached
/// to them.
///
/// Registration and unregistration are synchronous: all matching
/// notifications for an event are delivered before the call returns. Buckets
/// whose last entry is removed are pruned from the map.
pub struct UiExtensionSystem {
    /// Extension points keyed by the tag they listen on.
    extension_points: DashMap<UiTag, ExtensionPointList>,
    /// Extensions keyed by the tag they target.
    extensions: DashMap<UiTag, ExtensionList>,
}

impl std::fmt::Debug for UiExtensionSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UiExtensionSystem")
            .field("extension_points", &self.extension_point_count())
            .field("extensions", &self.extension_count())
            .finish()
    }
}

impl UiExtensionSystem {
    pub fn new() -> Self {
        Self {
            extension_points: DashMap::new(),
            extensions: DashMap::new(),
        }
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Registers an extension point listening on `tag` for any context.
    ///
    /// Every already-registered matching extension is delivered to `callback`
    /// as [`ExtensionAction::Added`] before this returns.
    ///
    /// An empty `allowed_classes` list is rejected: a warning is logged and
    /// the returned handle is invalid.
    pub fn register_extension_point(
        self: &Arc<Self>,
        tag: &UiTag,
        match_mode: ExtensionPointMatch,
        allowed_classes: Vec<WidgetClass>,
        callback: impl Fn(ExtensionAction, &ExtensionRequest) + Send + Sync + 'static,
    ) -> ExtensionPointHandle {
        self.register_extension_point_for_context(tag, None, match_mode, allowed_classes, callback)
    }

    /// Registers an extension point scoped to a context object.
    ///
    /// Only extensions registered with the identical context object pass the
    /// point's contract; `None` listens for context-free extensions.
    pub fn register_extension_point_for_context(
        self: &Arc<Self>,
        tag: &UiTag,
        context: Option<ContextRef>,
        match_mode: ExtensionPointMatch,
        allowed_classes: Vec<WidgetClass>,
        callback: impl Fn(ExtensionAction, &ExtensionRequest) + Send + Sync + 'static,
    ) -> ExtensionPointHandle {
        if allowed_classes.is_empty() {
            warn!("Trying to register an invalid extension point.");
            return ExtensionPointHandle::invalid();
        }

        let entry = Arc::new(UiExtensionPoint {
            tag: tag.clone(),
            context,
            match_mode,
            allowed_classes,
            callback: Box::new(callback) as ExtensionCallback,
            alive: AtomicBool::new(true),
        });

        self.extension_points
            .entry(tag.clone())
            .or_default()
            .push(entry.clone());

        info!("Extension point [{}] registered", tag);

        self.notify_extension_point_of_extensions(&entry);

        ExtensionPointHandle::new(self, entry)
    }

    /// Registers a widget class as an extension targeting `tag`, for any
    /// context.
    pub fn register_extension_as_widget(
        self: &Arc<Self>,
        tag: &UiTag,
        widget_class: WidgetClass,
        priority: Option<i32>,
    ) -> ExtensionHandle {
        self.register_extension_as_data(tag, None, ExtensionData::Class(widget_class), priority)
    }

    /// Registers a widget class as an extension for a specific context,
    /// typically a local player. Points scoped to the same context receive
    /// it; context-free points do not.
    pub fn register_extension_as_widget_for_context(
        self: &Arc<Self>,
        tag: &UiTag,
        context: ContextRef,
        widget_class: WidgetClass,
        priority: Option<i32>,
    ) -> ExtensionHandle {
        self.register_extension_as_data(
            tag,
            Some(context),
            ExtensionData::Class(widget_class),
            priority,
        )
    }

    /// Registers an extension for any extension point that can make use of
    /// it. Every currently-matching point is notified with
    /// [`ExtensionAction::Added`] before this returns.
    pub fn register_extension_as_data(
        self: &Arc<Self>,
        tag: &UiTag,
        context: Option<ContextRef>,
        data: ExtensionData,
        priority: Option<i32>,
    ) -> ExtensionHandle {
        let entry = Arc::new(UiExtension {
            tag: tag.clone(),
            context,
            data,
            priority,
            alive: AtomicBool::new(true),
        });

        self.extensions
            .entry(tag.clone())
            .or_default()
            .push(entry.clone());

        if entry.context.is_some() {
            info!("Extension [{}] for context @ [{}] registered", entry.data, tag);
        } else {
            info!("Extension [{}] @ [{}] registered", entry.data, tag);
        }

        self.notify_extension_points_of_extension(ExtensionAction::Added, &entry);

        ExtensionHandle::new(self, entry)
    }

    // ========================================================================
    // Unregistration
    // ========================================================================

    /// Unregisters an extension through its handle.
    ///
    /// Every currently-matching point is notified with
    /// [`ExtensionAction::Removed`] before the entry leaves its bucket, so
    /// consumers can tear down derived state. Unregistering an already
    /// invalid handle logs and returns harmlessly.
    ///
    /// Handles issued by a different extension system are a programming
    /// error: debug builds assert, release builds log and refuse.
    pub fn unregister_extension(self: &Arc<Self>, handle: &ExtensionHandle) {
        let Some(entry) = handle.entry() else {
            warn!("Trying to unregister an invalid handle.");
            return;
        };

        if !handle.issued_by(self) {
            debug_assert!(
                false,
                "trying to unregister an extension that's not from this extension system"
            );
            error!("Extension handle was issued by a different extension system.");
            return;
        }

        // Claim the entry exactly once; the loser of a double-unregister
        // takes the invalid-handle path.
        if !entry.alive.swap(false, Ordering::AcqRel) {
            warn!("Trying to unregister an invalid handle.");
            return;
        }

        if entry.context.is_some() {
            info!(
                "Extension [{}] for context @ [{}] unregistered",
                entry.data, entry.tag
            );
        } else {
            info!("Extension [{}] @ [{}] unregistered", entry.data, entry.tag);
        }

        self.notify_extension_points_of_extension(ExtensionAction::Removed, entry);

        if let Some(mut bucket) = self.extensions.get_mut(&entry.tag) {
            bucket.retain(|candidate| !Arc::ptr_eq(candidate, entry));
        }
        self.extensions
            .remove_if(&entry.tag, |_, bucket| bucket.is_empty());
    }

    /// Unregisters an extension point through its handle.
    ///
    /// Points hold the callbacks, so removal is silent: no notification is
    /// sent to extensions. Invalid handles log and return harmlessly.
    pub fn unregister_extension_point(self: &Arc<Self>, handle: &ExtensionPointHandle) {
        let Some(entry) = handle.entry() else {
            warn!("Trying to unregister an invalid handle.");
            return;
        };

        if !handle.issued_by(self) {
            debug_assert!(
                false,
                "trying to unregister an extension point that's not from this extension system"
            );
            error!("Extension point handle was issued by a different extension system.");
            return;
        }

        if !entry.alive.swap(false, Ordering::AcqRel) {
            warn!("Trying to unregister an invalid handle.");
            return;
        }

        info!("Extension point [{}] unregistered", entry.tag);

        if let Some(mut bucket) = self.extension_points.get_mut(&entry.tag) {
            bucket.retain(|candidate| !Arc::ptr_eq(candidate, entry));
        }
        self.extension_points
            .remove_if(&entry.tag, |_, bucket| bucket.is_empty());
    }

    // ========================================================================
    // Matching and Notification
    // ========================================================================

    /// Backfills a newly-registered point with the extensions it matches.
    ///
    /// Walks upward from the point's own tag; an `ExactMatch` point examines
    /// only its own tag level.
    fn notify_extension_point_of_extensions(self: &Arc<Self>, point: &Arc<UiExtensionPoint>) {
        for tag in point.tag.self_and_ancestors() {
            // Copy in case there are removals while handling callbacks.
            let snapshot: Option<ExtensionList> =
                self.extensions.get(&tag).map(|bucket| bucket.value().clone());

            if let Some(extensions) = snapshot {
                for extension in &extensions {
                    if point.does_extension_pass_contract(extension) {
                        let request = self.create_extension_request(extension);
                        (point.callback)(ExtensionAction::Added, &request);
                    }
                }
            }

            if point.match_mode == ExtensionPointMatch::ExactMatch {
                break;
            }
        }
    }

    /// Announces a new or removed extension to every matching point.
    ///
    /// Walks upward from the extension's own tag. At the extension's own tag
    /// every point in the bucket is eligible regardless of its match mode; at
    /// ancestor tags only `PartialMatch` points are.
    fn notify_extension_points_of_extension(
        self: &Arc<Self>,
        action: ExtensionAction,
        extension: &Arc<UiExtension>,
    ) {
        let mut on_initial_tag = true;

        for tag in extension.tag.self_and_ancestors() {
            // Copy in case there are removals while handling callbacks.
            let snapshot: Option<ExtensionPointList> =
                self.extension_points.get(&tag).map(|bucket| bucket.value().clone());

            if let Some(points) = snapshot {
                for point in &points {
                    if on_initial_tag || point.match_mode == ExtensionPointMatch::PartialMatch {
                        if point.does_extension_pass_contract(extension) {
                            let request = self.create_extension_request(extension);
                            (point.callback)(action, &request);
                        }
                    }
                }
            }

            on_initial_tag = false;
        }

        debug!(
            "Notified extension points of [{}] @ [{}] ({:?})",
            extension.data, extension.tag, action
        );
    }

    fn create_extension_request(self: &Arc<Self>, extension: &Arc<UiExtension>) -> ExtensionRequest {
        ExtensionRequest {
            handle: ExtensionHandle::new(self, extension.clone()),
            tag: extension.tag.clone(),
            priority: extension.priority,
            data: extension.data.clone(),
            context: extension
                .context
                .as_ref()
                .and_then(|context| context.upgrade()),
        }
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    /// Number of live extensions across all tag buckets.
    pub fn extension_count(&self) -> usize {
        self.extensions.iter().map(|bucket| bucket.len()).sum()
    }

    /// Number of live extension points across all tag buckets.
    pub fn extension_point_count(&self) -> usize {
        self.extension_points.iter().map(|bucket| bucket.len()).sum()
    }

    /// Enumerates every class reference the registry is currently holding:
    /// allow-lists on points and the effective class of each extension's
    /// data. Hosts with a tracing collector (or a debug overlay) can walk
    /// this instead of the registry's internals.
    pub fn referenced_classes(&self) -> Vec<WidgetClass> {
        let mut classes = Vec::new();

        for bucket in self.extension_points.iter() {
            for point in bucket.value() {
                classes.extend(point.allowed_classes.iter().cloned());
            }
        }

        for bucket in self.extensions.iter() {
            for extension in bucket.value() {
                classes.push(extension.data.effective_class().clone());
            }
        }

        classes
    }
}

impl Default for UiExtensionSystem {
    fn default() -> Self {
        Self::new()
    }
}
