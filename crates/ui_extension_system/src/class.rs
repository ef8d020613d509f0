//! # Widget Class Identity
//!
//! The registry validates extensions against a point's allow-list by class
//! identity rather than engine reflection: a [`WidgetClass`] is a named
//! descriptor with an optional parent chain and a list of implemented
//! interfaces. `is_child_of` and `implements_interface` are the two
//! predicates the contract check is built from.
//!
//! Interfaces are ordinary descriptors used on the interface side of
//! `implements_interface`; a class inherits the interfaces of its ancestors.

use compact_str::CompactString;
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Unique identity for a widget or data class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClassId(pub Uuid);

impl ClassId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClassId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug)]
struct ClassInner {
    id: ClassId,
    name: CompactString,
    parent: Option<WidgetClass>,
    interfaces: Vec<WidgetClass>,
}

/// A cheaply-clonable class descriptor.
///
/// Equality and hashing use the class identity, so two descriptors created
/// with the same name are still distinct classes.
///
/// # Examples
///
/// ```rust
/// use ui_extension_system::{base_widget_class, WidgetClass};
///
/// let button = WidgetClass::subclass_of("ButtonWidget", &base_widget_class());
/// let fancy = WidgetClass::subclass_of("FancyButtonWidget", &button);
/// assert!(fancy.is_child_of(&base_widget_class()));
/// assert!(!button.is_child_of(&fancy));
/// ```
#[derive(Clone)]
pub struct WidgetClass(Arc<ClassInner>);

impl WidgetClass {
    /// Creates a root class with no parent and no interfaces.
    pub fn new(name: impl Into<CompactString>) -> Self {
        Self::implementing(name, None, Vec::new())
    }

    /// Creates a class derived from `parent`.
    pub fn subclass_of(name: impl Into<CompactString>, parent: &WidgetClass) -> Self {
        Self::implementing(name, Some(parent), Vec::new())
    }

    /// Creates an interface descriptor. Interfaces carry no parent chain of
    /// their own beyond what `implements_interface` compares by identity.
    pub fn interface(name: impl Into<CompactString>) -> Self {
        Self::new(name)
    }

    /// Creates a class with an explicit parent and implemented interfaces.
    pub fn implementing(
        name: impl Into<CompactString>,
        parent: Option<&WidgetClass>,
        interfaces: Vec<WidgetClass>,
    ) -> Self {
        Self(Arc::new(ClassInner {
            id: ClassId::new(),
            name: name.into(),
            parent: parent.cloned(),
            interfaces,
        }))
    }

    pub fn id(&self) -> ClassId {
        self.0.id
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn parent(&self) -> Option<&WidgetClass> {
        self.0.parent.as_ref()
    }

    /// True if `self` is `other` or any ancestor of `self` is `other`.
    pub fn is_child_of(&self, other: &WidgetClass) -> bool {
        let mut current = Some(self);
        while let Some(class) = current {
            if class.id() == other.id() {
                return true;
            }
            current = class.parent();
        }
        false
    }

    /// True if `self` or any of its ancestors lists `iface` as implemented.
    pub fn implements_interface(&self, iface: &WidgetClass) -> bool {
        let mut current = Some(self);
        while let Some(class) = current {
            if class.0.interfaces.iter().any(|i| i.id() == iface.id()) {
                return true;
            }
            current = class.parent();
        }
        false
    }
}

impl PartialEq for WidgetClass {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for WidgetClass {}

impl std::hash::Hash for WidgetClass {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl fmt::Debug for WidgetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WidgetClass")
            .field("name", &self.name())
            .field("id", &self.id())
            .finish()
    }
}

impl fmt::Display for WidgetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

lazy_static! {
    static ref BASE_WIDGET_CLASS: WidgetClass = WidgetClass::new("Widget");
}

/// The process-wide base class every concrete widget class derives from.
///
/// Extension point slots always accept this class, so plain widget-class
/// extensions match without any extra allow-list configuration.
pub fn base_widget_class() -> WidgetClass {
    BASE_WIDGET_CLASS.clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_walk_covers_self_and_ancestors() {
        let base = base_widget_class();
        let button = WidgetClass::subclass_of("ButtonWidget", &base);
        let bound = WidgetClass::subclass_of("BoundActionButtonWidget", &button);

        assert!(bound.is_child_of(&bound));
        assert!(bound.is_child_of(&button));
        assert!(bound.is_child_of(&base));
        assert!(!button.is_child_of(&bound));
    }

    #[test]
    fn unrelated_classes_do_not_match() {
        let foo = WidgetClass::new("Foo");
        let bar = WidgetClass::new("Bar");
        assert!(!foo.is_child_of(&bar));
    }

    #[test]
    fn same_name_is_not_same_class() {
        let a = WidgetClass::new("Foo");
        let b = WidgetClass::new("Foo");
        assert_ne!(a, b);
        assert!(!a.is_child_of(&b));
    }

    #[test]
    fn interfaces_are_inherited() {
        let focusable = WidgetClass::interface("Focusable");
        let base = WidgetClass::implementing("FocusableWidget", None, vec![focusable.clone()]);
        let derived = WidgetClass::subclass_of("FocusableButton", &base);

        assert!(base.implements_interface(&focusable));
        assert!(derived.implements_interface(&focusable));
        assert!(!derived.is_child_of(&focusable));
    }
}
