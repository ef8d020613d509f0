//! # Extension Point Types
//!
//! The record and handle types behind the extension registry:
//!
//! - [`UiExtension`] / [`UiExtensionPoint`] - the entries the registry owns,
//!   keyed by tag
//! - [`ExtensionHandle`] / [`ExtensionPointHandle`] - safe, copyable
//!   references used to unregister entries independently of their lifetime
//! - [`ExtensionRequest`] - the immutable snapshot delivered to point
//!   callbacks
//!
//! Entries are reference counted: the registry's bucket holds one strong
//! reference, handles and in-flight notification snapshots hold more. An
//! atomic `alive` flag is flipped inside unregistration, so handle validity
//! always reflects whether the entry is still present in its registry.

use crate::class::WidgetClass;
use crate::system::UiExtensionSystem;
use crate::tag::UiTag;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

// ============================================================================
// Match and Action Enums
// ============================================================================

/// How broadly an extension point listens on the tag hierarchy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExtensionPointMatch {
    /// Only extensions broadcast at exactly the point's own tag.
    /// (e.g. a point at `A.B` matches a broadcast of `A.B` but not `A.B.C`)
    #[default]
    ExactMatch,

    /// Extensions rooted anywhere under the point's tag.
    /// (e.g. a point at `A.B` matches a broadcast of `A.B` as well as `A.B.C`)
    PartialMatch,
}

/// Whether a notification reports an extension arriving or leaving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExtensionAction {
    Added,
    Removed,
}

// ============================================================================
// Extension Data
// ============================================================================

/// Strong reference to a context object; `None` on an entry means
/// "any context".
pub type ContextObject = Arc<dyn Any + Send + Sync>;

/// Weak reference form the registry stores. The referent disappearing is a
/// valid state, not a fault.
pub type ContextRef = Weak<dyn Any + Send + Sync>;

/// A data object attached to an extension, exposing its runtime class.
pub trait ExtensionObject: Send + Sync {
    fn class(&self) -> &WidgetClass;

    fn as_any(&self) -> &dyn Any;
}

/// What an extension carries: either literally a widget class, or a data
/// object whose runtime class is consulted for the contract check.
#[derive(Clone)]
pub enum ExtensionData {
    Class(WidgetClass),
    Object(Arc<dyn ExtensionObject>),
}

impl ExtensionData {
    /// The class the contract check runs against: the class itself, or the
    /// data object's runtime class.
    pub fn effective_class(&self) -> &WidgetClass {
        match self {
            ExtensionData::Class(class) => class,
            ExtensionData::Object(object) => object.class(),
        }
    }

    /// Returns the widget class if the data literally is one.
    pub fn as_widget_class(&self) -> Option<&WidgetClass> {
        match self {
            ExtensionData::Class(class) => Some(class),
            ExtensionData::Object(_) => None,
        }
    }

    pub fn as_object(&self) -> Option<&Arc<dyn ExtensionObject>> {
        match self {
            ExtensionData::Class(_) => None,
            ExtensionData::Object(object) => Some(object),
        }
    }
}

impl fmt::Display for ExtensionData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtensionData::Class(class) => write!(f, "{}", class.name()),
            ExtensionData::Object(object) => write!(f, "{} (instance)", object.class().name()),
        }
    }
}

impl fmt::Debug for ExtensionData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ExtensionData({})", self)
    }
}

// ============================================================================
// Registry Entries
// ============================================================================

/// Callback invoked when an extension is delivered to or removed from a point.
pub(crate) type ExtensionCallback = Box<dyn Fn(ExtensionAction, &ExtensionRequest) + Send + Sync>;

/// Data of what has been added to an extension point.
pub(crate) struct UiExtension {
    pub(crate) tag: UiTag,
    pub(crate) context: Option<ContextRef>,
    pub(crate) data: ExtensionData,
    pub(crate) priority: Option<i32>,
    pub(crate) alive: AtomicBool,
}

/// Data of the extension point itself.
pub(crate) struct UiExtensionPoint {
    pub(crate) tag: UiTag,
    pub(crate) context: Option<ContextRef>,
    pub(crate) match_mode: ExtensionPointMatch,
    pub(crate) allowed_classes: Vec<WidgetClass>,
    pub(crate) callback: ExtensionCallback,
    pub(crate) alive: AtomicBool,
}

impl UiExtensionPoint {
    /// Tests whether the extension and the point match up; if they do, this
    /// point should learn about this extension.
    ///
    /// Contexts must both be unset or reference the identical object, and the
    /// extension's effective class must be a subclass of, or implement, at
    /// least one allowed class.
    pub(crate) fn does_extension_pass_contract(&self, extension: &UiExtension) -> bool {
        let contexts_match = match (&self.context, &extension.context) {
            (None, None) => true,
            (Some(mine), Some(theirs)) => mine.ptr_eq(theirs),
            _ => false,
        };

        if !contexts_match {
            return false;
        }

        let class = extension.data.effective_class();
        self.allowed_classes
            .iter()
            .any(|allowed| class.is_child_of(allowed) || class.implements_interface(allowed))
    }
}

// ============================================================================
// Handles
// ============================================================================

/// Handle to a registered extension.
///
/// Copyable and comparable by entry identity. `is_valid` is true exactly
/// while the entry is still present in the owning registry; unregistering
/// through a handle whose registry has been torn down is a safe no-op, as is
/// unregistering twice.
#[derive(Clone, Default)]
pub struct ExtensionHandle {
    source: Weak<UiExtensionSystem>,
    entry: Option<Arc<UiExtension>>,
}

impl ExtensionHandle {
    pub(crate) fn new(source: &Arc<UiExtensionSystem>, entry: Arc<UiExtension>) -> Self {
        Self {
            source: Arc::downgrade(source),
            entry: Some(entry),
        }
    }

    /// The null handle returned when a registration is rejected.
    pub fn invalid() -> Self {
        Self::default()
    }

    pub fn is_valid(&self) -> bool {
        self.entry
            .as_ref()
            .map_or(false, |entry| entry.alive.load(Ordering::Acquire))
    }

    /// Forwards to the owning registry if it is still alive.
    pub fn unregister(&self) {
        if let Some(source) = self.source.upgrade() {
            source.unregister_extension(self);
        }
    }

    pub(crate) fn entry(&self) -> Option<&Arc<UiExtension>> {
        self.entry.as_ref()
    }

    pub(crate) fn issued_by(&self, system: &Arc<UiExtensionSystem>) -> bool {
        self.source
            .upgrade()
            .map_or(false, |source| Arc::ptr_eq(&source, system))
    }
}

impl PartialEq for ExtensionHandle {
    fn eq(&self, other: &Self) -> bool {
        match (&self.entry, &other.entry) {
            (None, None) => true,
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Eq for ExtensionHandle {}

impl std::hash::Hash for ExtensionHandle {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        match &self.entry {
            Some(entry) => (Arc::as_ptr(entry) as usize).hash(state),
            None => 0usize.hash(state),
        }
    }
}

impl fmt::Debug for ExtensionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.entry {
            Some(entry) => write!(
                f,
                "ExtensionHandle({}, valid: {})",
                entry.tag,
                self.is_valid()
            ),
            None => write!(f, "ExtensionHandle(invalid)"),
        }
    }
}

/// Handle to a registered extension point. Same semantics as
/// [`ExtensionHandle`].
#[derive(Clone, Default)]
pub struct ExtensionPointHandle {
    source: Weak<UiExtensionSystem>,
    entry: Option<Arc<UiExtensionPoint>>,
}

impl ExtensionPointHandle {
    pub(crate) fn new(source: &Arc<UiExtensionSystem>, entry: Arc<UiExtensionPoint>) -> Self {
        Self {
            source: Arc::downgrade(source),
            entry: Some(entry),
        }
    }

    /// The null handle returned when a registration is rejected.
    pub fn invalid() -> Self {
        Self::default()
    }

    pub fn is_valid(&self) -> bool {
        self.entry
            .as_ref()
            .map_or(false, |entry| entry.alive.load(Ordering::Acquire))
    }

    /// Forwards to the owning registry if it is still alive.
    pub fn unregister(&self) {
        if let Some(source) = self.source.upgrade() {
            source.unregister_extension_point(self);
        }
    }

    pub(crate) fn entry(&self) -> Option<&Arc<UiExtensionPoint>> {
        self.entry.as_ref()
    }

    pub(crate) fn issued_by(&self, system: &Arc<UiExtensionSystem>) -> bool {
        self.source
            .upgrade()
            .map_or(false, |source| Arc::ptr_eq(&source, system))
    }
}

impl PartialEq for ExtensionPointHandle {
    fn eq(&self, other: &Self) -> bool {
        match (&self.entry, &other.entry) {
            (None, None) => true,
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Eq for ExtensionPointHandle {}

impl std::hash::Hash for ExtensionPointHandle {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        match &self.entry {
            Some(entry) => (Arc::as_ptr(entry) as usize).hash(state),
            None => 0usize.hash(state),
        }
    }
}

impl fmt::Debug for ExtensionPointHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.entry {
            Some(entry) => write!(
                f,
                "ExtensionPointHandle({}, valid: {})",
                entry.tag,
                self.is_valid()
            ),
            None => write!(f, "ExtensionPointHandle(invalid)"),
        }
    }
}

// ============================================================================
// Request Snapshot
// ============================================================================

/// Immutable snapshot of an extension passed to point callbacks.
///
/// Decoupled from the registry's internal storage so callbacks survive
/// concurrent registration and unregistration during a notification pass.
#[derive(Clone)]
pub struct ExtensionRequest {
    pub handle: ExtensionHandle,
    pub tag: UiTag,
    pub priority: Option<i32>,
    pub data: ExtensionData,
    pub context: Option<ContextObject>,
}

impl fmt::Debug for ExtensionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionRequest")
            .field("tag", &self.tag)
            .field("priority", &self.priority)
            .field("data", &self.data)
            .field("has_context", &self.context.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::{base_widget_class, WidgetClass};

    fn extension_with(data: ExtensionData, context: Option<ContextRef>) -> UiExtension {
        UiExtension {
            tag: UiTag::parse("HUD.Slot").unwrap(),
            context,
            data,
            priority: None,
            alive: AtomicBool::new(true),
        }
    }

    fn point_with(allowed: Vec<WidgetClass>, context: Option<ContextRef>) -> UiExtensionPoint {
        UiExtensionPoint {
            tag: UiTag::parse("HUD.Slot").unwrap(),
            context,
            match_mode: ExtensionPointMatch::ExactMatch,
            allowed_classes: allowed,
            callback: Box::new(|_, _| {}),
            alive: AtomicBool::new(true),
        }
    }

    #[test]
    fn contract_accepts_subclass_of_allowed() {
        let base = base_widget_class();
        let button = WidgetClass::subclass_of("ButtonWidget", &base);
        let point = point_with(vec![base], None);
        let extension = extension_with(ExtensionData::Class(button), None);
        assert!(point.does_extension_pass_contract(&extension));
    }

    #[test]
    fn contract_rejects_unrelated_class() {
        let bar = WidgetClass::new("Bar");
        let foo = WidgetClass::new("Foo");
        let point = point_with(vec![bar], None);
        let extension = extension_with(ExtensionData::Class(foo), None);
        assert!(!point.does_extension_pass_contract(&extension));
    }

    #[test]
    fn contract_accepts_interface_implementer() {
        let focusable = WidgetClass::interface("Focusable");
        let widget = WidgetClass::implementing("FocusableWidget", None, vec![focusable.clone()]);
        let point = point_with(vec![focusable], None);
        let extension = extension_with(ExtensionData::Class(widget), None);
        assert!(point.does_extension_pass_contract(&extension));
    }

    #[test]
    fn contract_requires_matching_context() {
        let class = base_widget_class();
        let ctx_a: ContextObject = Arc::new(1u32);
        let ctx_b: ContextObject = Arc::new(2u32);

        let scoped_point = point_with(vec![class.clone()], Some(Arc::downgrade(&ctx_a)));
        let global_ext = extension_with(ExtensionData::Class(class.clone()), None);
        let scoped_ext = extension_with(
            ExtensionData::Class(class.clone()),
            Some(Arc::downgrade(&ctx_a)),
        );
        let other_ext = extension_with(ExtensionData::Class(class), Some(Arc::downgrade(&ctx_b)));

        assert!(!scoped_point.does_extension_pass_contract(&global_ext));
        assert!(scoped_point.does_extension_pass_contract(&scoped_ext));
        assert!(!scoped_point.does_extension_pass_contract(&other_ext));
    }

    #[test]
    fn invalid_handles_compare_equal() {
        assert_eq!(ExtensionHandle::invalid(), ExtensionHandle::invalid());
        assert!(!ExtensionHandle::invalid().is_valid());
        // Safe on a null handle.
        ExtensionHandle::invalid().unregister();
    }
}
