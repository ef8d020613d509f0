//! # Widget Host Capability
//!
//! The rendering toolkit is an external collaborator: the registry and its
//! consumers only ever see widgets through the opaque [`Widget`] trait and
//! instantiate them through a [`WidgetHost`]. [`NullWidgetHost`] is the
//! toolkit-free provider used by tests and headless runs.

use crate::class::WidgetClass;
use crate::types::PlayerId;
use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// An instantiated widget, opaque to this layer.
pub trait Widget: Send + Sync {
    fn class(&self) -> &WidgetClass;

    /// The player this instance was created for, when the host tracks one.
    fn owner(&self) -> Option<PlayerId> {
        None
    }

    fn as_any(&self) -> &dyn Any;
}

/// Shared handle to a live widget instance.
pub type WidgetRef = Arc<dyn Widget>;

impl fmt::Debug for dyn Widget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Widget({})", self.class().name())
    }
}

/// Instantiation capability provided by the host toolkit.
///
/// Dropping the returned [`WidgetRef`] releases the instance; there is no
/// separate destroy call at this seam.
pub trait WidgetHost: Send + Sync {
    /// Creates a widget of `class`, optionally owned by a player.
    fn create_widget(&self, owner: Option<PlayerId>, class: &WidgetClass) -> WidgetRef;
}

/// A widget provider with no rendering backend.
///
/// Instances are plain records carrying their class; the host counts how many
/// it has created, which is all headless consumers need to observe.
#[derive(Default)]
pub struct NullWidgetHost {
    created: AtomicUsize,
}

impl NullWidgetHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Total number of widgets this host has instantiated.
    pub fn created_count(&self) -> usize {
        self.created.load(Ordering::Relaxed)
    }
}

/// The record [`NullWidgetHost`] hands out.
pub struct NullWidget {
    class: WidgetClass,
    owner: Option<PlayerId>,
}

impl Widget for NullWidget {
    fn class(&self) -> &WidgetClass {
        &self.class
    }

    fn owner(&self) -> Option<PlayerId> {
        self.owner
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl WidgetHost for NullWidgetHost {
    fn create_widget(&self, owner: Option<PlayerId>, class: &WidgetClass) -> WidgetRef {
        self.created.fetch_add(1, Ordering::Relaxed);
        Arc::new(NullWidget {
            class: class.clone(),
            owner,
        })
    }
}
