//! # Layer Containers
//!
//! A layout's layers are widget stacks: push-on, pop-off containers the host
//! toolkit provides. The [`WidgetStack`] trait is the seam; the concrete
//! [`ActivatableWidgetStack`] keeps an ordered stack of instances and reports
//! transition begin/end around every change, which the layout turns into
//! input suspensions.

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;
use ui_extension_system::{PlayerId, WidgetClass, WidgetHost, WidgetRef};

/// Receives `true` when a stack transition begins and `false` when it ends.
pub type TransitionListener = Box<dyn Fn(bool) + Send + Sync>;

/// A named layer's widget container.
pub trait WidgetStack: Send + Sync {
    /// Instantiates `class`, runs `init` on the new widget before it is
    /// attached, then appends it to the stack.
    fn add_widget(&self, class: &WidgetClass, init: &mut dyn FnMut(&WidgetRef)) -> WidgetRef;

    /// Removes an instance if present; unknown instances are ignored.
    fn remove_widget(&self, widget: &WidgetRef);

    fn widget_count(&self) -> usize;

    /// The most recently pushed widget still on the stack.
    fn top_widget(&self) -> Option<WidgetRef>;

    /// Installs the transition listener. A stack keeps at most one.
    fn bind_transition_events(&self, listener: TransitionListener);
}

/// An ordered widget stack backed by a [`WidgetHost`].
///
/// Transitions are instantaneous (the transition runs with zero duration so
/// focus hand-off stays reliable on gamepads), so the listener always sees a
/// balanced begin/end pair within one push or pop.
pub struct ActivatableWidgetStack {
    host: Arc<dyn WidgetHost>,
    owner: Option<PlayerId>,
    widgets: Mutex<Vec<WidgetRef>>,
    transition_listener: Mutex<Option<TransitionListener>>,
}

impl ActivatableWidgetStack {
    pub fn new(host: Arc<dyn WidgetHost>, owner: Option<PlayerId>) -> Arc<Self> {
        Arc::new(Self {
            host,
            owner,
            widgets: Mutex::new(Vec::new()),
            transition_listener: Mutex::new(None),
        })
    }

    fn notify_transition(&self, transitioning: bool) {
        // Run outside the widget lock; the layout reacts by suspending input.
        let listener = self.transition_listener.lock();
        if let Some(listener) = listener.as_ref() {
            listener(transitioning);
        }
    }
}

impl WidgetStack for ActivatableWidgetStack {
    fn add_widget(&self, class: &WidgetClass, init: &mut dyn FnMut(&WidgetRef)) -> WidgetRef {
        self.notify_transition(true);

        let widget = self.host.create_widget(self.owner, class);
        init(&widget);
        self.widgets.lock().push(widget.clone());
        debug!("Widget [{}] pushed onto stack", class.name());

        self.notify_transition(false);
        widget
    }

    fn remove_widget(&self, widget: &WidgetRef) {
        let removed = {
            let mut widgets = self.widgets.lock();
            let before = widgets.len();
            widgets.retain(|candidate| !Arc::ptr_eq(candidate, widget));
            widgets.len() != before
        };

        if removed {
            self.notify_transition(true);
            debug!("Widget [{}] removed from stack", widget.class().name());
            self.notify_transition(false);
        }
    }

    fn widget_count(&self) -> usize {
        self.widgets.lock().len()
    }

    fn top_widget(&self) -> Option<WidgetRef> {
        self.widgets.lock().last().cloned()
    }

    fn bind_transition_events(&self, listener: TransitionListener) {
        *self.transition_listener.lock() = Some(listener);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use ui_extension_system::{base_widget_class, NullWidgetHost};

    #[test]
    fn push_runs_init_before_attach() {
        let stack = ActivatableWidgetStack::new(NullWidgetHost::new(), None);
        let seen_during_init = Arc::new(AtomicUsize::new(usize::MAX));

        let observer = stack.clone();
        let seen = seen_during_init.clone();
        let widget = stack.add_widget(&base_widget_class(), &mut |_| {
            seen.store(observer.widget_count(), Ordering::Relaxed);
        });

        assert_eq!(seen_during_init.load(Ordering::Relaxed), 0);
        assert_eq!(stack.widget_count(), 1);
        assert!(Arc::ptr_eq(
            &stack.top_widget().expect("stack has a top widget"),
            &widget
        ));
    }

    #[test]
    fn remove_ignores_unknown_widgets() {
        let host = NullWidgetHost::new();
        let stack = ActivatableWidgetStack::new(host.clone(), None);
        let pushed = stack.add_widget(&base_widget_class(), &mut |_| {});
        let foreign = host.create_widget(None, &base_widget_class());

        stack.remove_widget(&foreign);
        assert_eq!(stack.widget_count(), 1);

        stack.remove_widget(&pushed);
        assert_eq!(stack.widget_count(), 0);
    }

    #[test]
    fn transitions_are_balanced_around_changes() {
        let stack = ActivatableWidgetStack::new(NullWidgetHost::new(), None);
        let depth = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        stack.bind_transition_events({
            let depth = depth.clone();
            let peak = peak.clone();
            Box::new(move |transitioning| {
                if transitioning {
                    let now = depth.fetch_add(1, Ordering::Relaxed) + 1;
                    peak.fetch_max(now, Ordering::Relaxed);
                } else {
                    depth.fetch_sub(1, Ordering::Relaxed);
                }
            })
        });

        let widget = stack.add_widget(&base_widget_class(), &mut |_| {});
        stack.remove_widget(&widget);

        assert_eq!(depth.load(Ordering::Relaxed), 0);
        assert_eq!(peak.load(Ordering::Relaxed), 1);
    }
}
