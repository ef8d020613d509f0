//! # Extension Point Slot
//!
//! A slot binds a location in a layout to a tag and auto-populates from the
//! registry: matched widget-class extensions are instantiated directly as
//! children, and matched data extensions go through an optional resolver
//! callback that maps the data object to a widget class (returning `None`
//! legitimately means "not applicable, skip").
//!
//! A bound slot owns two registrations: one listening tag-globally and one
//! scoped to the owning local player, so both context-free and per-player
//! extensions land in it.

use crate::class::{base_widget_class, WidgetClass};
use crate::extension::{
    ExtensionAction, ExtensionData, ExtensionHandle, ExtensionPointHandle, ExtensionPointMatch,
    ExtensionRequest,
};
use crate::system::UiExtensionSystem;
use crate::tag::UiTag;
use crate::types::{player_context, LocalPlayer, PlayerId};
use crate::widget::{WidgetHost, WidgetRef};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

/// Maps a data extension to the widget class that should display it.
pub type WidgetClassResolver = dyn Fn(&ExtensionData) -> Option<WidgetClass> + Send + Sync;

/// Runs against a freshly created child widget and the data it displays.
pub type WidgetConfigurator = dyn Fn(&WidgetRef, &ExtensionData) + Send + Sync;

struct SlotRuntime {
    host: Arc<dyn WidgetHost>,
    owner: PlayerId,
    has_data_classes: bool,
    resolver: Option<Arc<WidgetClassResolver>>,
    configurator: Option<Arc<WidgetConfigurator>>,
    mapping: DashMap<ExtensionHandle, WidgetRef>,
}

impl SlotRuntime {
    fn on_extension(&self, action: ExtensionAction, request: &ExtensionRequest) {
        match action {
            ExtensionAction::Added => self.add_entry(request),
            ExtensionAction::Removed => {
                if self.mapping.remove(&request.handle).is_some() {
                    debug!("Slot entry for [{}] removed", request.tag);
                }
            }
        }
    }

    fn add_entry(&self, request: &ExtensionRequest) {
        if let Some(class) = request.data.as_widget_class() {
            let widget = self.host.create_widget(Some(self.owner), class);
            self.mapping.insert(request.handle.clone(), widget);
        } else if self.has_data_classes {
            let Some(resolver) = &self.resolver else {
                return;
            };

            // If the data is irrelevant the resolver can just return no class.
            let Some(class) = resolver(&request.data) else {
                return;
            };

            let widget = self.host.create_widget(Some(self.owner), &class);
            self.mapping.insert(request.handle.clone(), widget.clone());

            if let Some(configure) = &self.configurator {
                configure(&widget, &request.data);
            }
        }
    }
}

/// A slot that defines a location in a layout where content can be added
/// later.
///
/// State machine: unbound until [`bind`](Self::bind) registers the two
/// extension points; [`reset`](Self::reset) (or drop) unregisters both,
/// clears the entry map and discards created children, returning to unbound.
/// A slot configured without a tag stays a runtime no-op.
pub struct ExtensionPointSlot {
    tag: Option<UiTag>,
    match_mode: ExtensionPointMatch,
    data_classes: Vec<WidgetClass>,
    resolver: Option<Arc<WidgetClassResolver>>,
    configurator: Option<Arc<WidgetConfigurator>>,
    runtime: Option<Arc<SlotRuntime>>,
    handles: Vec<ExtensionPointHandle>,
}

impl ExtensionPointSlot {
    pub fn new(tag: Option<UiTag>, match_mode: ExtensionPointMatch) -> Self {
        Self {
            tag,
            match_mode,
            data_classes: Vec::new(),
            resolver: None,
            configurator: None,
            runtime: None,
            handles: Vec::new(),
        }
    }

    /// Additional data classes this slot accepts beyond plain widgets.
    pub fn with_data_classes(mut self, classes: Vec<WidgetClass>) -> Self {
        self.data_classes = classes;
        self
    }

    pub fn with_resolver(
        mut self,
        resolver: impl Fn(&ExtensionData) -> Option<WidgetClass> + Send + Sync + 'static,
    ) -> Self {
        self.resolver = Some(Arc::new(resolver));
        self
    }

    pub fn with_configurator(
        mut self,
        configurator: impl Fn(&WidgetRef, &ExtensionData) + Send + Sync + 'static,
    ) -> Self {
        self.configurator = Some(Arc::new(configurator));
        self
    }

    /// Registers this slot's extension points and backfills existing
    /// extensions. Rebinding tears the previous registration down first.
    pub fn bind(
        &mut self,
        system: &Arc<UiExtensionSystem>,
        host: Arc<dyn WidgetHost>,
        player: &Arc<LocalPlayer>,
    ) {
        self.reset();

        let Some(tag) = self.tag.clone() else {
            debug!("Extension point slot has no tag; leaving unbound");
            return;
        };

        let mut allowed = vec![base_widget_class()];
        allowed.extend(self.data_classes.iter().cloned());

        let runtime = Arc::new(SlotRuntime {
            host,
            owner: player.id(),
            has_data_classes: !self.data_classes.is_empty(),
            resolver: self.resolver.clone(),
            configurator: self.configurator.clone(),
            mapping: DashMap::new(),
        });

        let on_extension = {
            let runtime = runtime.clone();
            move |action: ExtensionAction, request: &ExtensionRequest| {
                runtime.on_extension(action, request);
            }
        };
        self.handles.push(system.register_extension_point(
            &tag,
            self.match_mode,
            allowed.clone(),
            on_extension,
        ));

        let on_extension = {
            let runtime = runtime.clone();
            move |action: ExtensionAction, request: &ExtensionRequest| {
                runtime.on_extension(action, request);
            }
        };
        self.handles.push(system.register_extension_point_for_context(
            &tag,
            Some(Arc::downgrade(&player_context(player))),
            self.match_mode,
            allowed,
            on_extension,
        ));

        self.runtime = Some(runtime);
    }

    /// Unregisters both extension points and discards every created child.
    pub fn reset(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.mapping.clear();
        }

        for handle in self.handles.drain(..) {
            handle.unregister();
        }
    }

    pub fn is_bound(&self) -> bool {
        self.runtime.is_some()
    }

    /// Number of children currently materialized in this slot.
    pub fn entry_count(&self) -> usize {
        self.runtime
            .as_ref()
            .map_or(0, |runtime| runtime.mapping.len())
    }

    /// The child widget created for a specific extension, if any.
    pub fn widget_for(&self, handle: &ExtensionHandle) -> Option<WidgetRef> {
        self.runtime
            .as_ref()
            .and_then(|runtime| runtime.mapping.get(handle).map(|entry| entry.value().clone()))
    }
}

impl Drop for ExtensionPointSlot {
    fn drop(&mut self) {
        self.reset();
    }
}
