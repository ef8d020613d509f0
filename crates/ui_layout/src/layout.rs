//! # Per-Player UI Layout
//!
//! A [`UiLayout`] is the primary game UI surface for a single player: a set
//! of named layers (HUD, menus, modals) that widgets are pushed onto, either
//! synchronously from an already-loaded class or asynchronously through the
//! soft-reference loader. Each player in a split-screen game receives their
//! own layout.
//!
//! The async path owns the input-suspension discipline: when requested, a
//! unique suspend token is taken before the load starts and released on
//! exactly one of completion or cancellation. Layer transitions additionally
//! push and pop their own tokens so input stays blocked across overlapping
//! operations.

use crate::input::{InputSuspendController, SuspendToken};
use crate::loader::{AssetLoader, LoadHandle, SoftClassRef};
use crate::stack::WidgetStack;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};
use ui_extension_system::{LocalPlayer, UiTag, WidgetClass, WidgetRef};

/// The state of an async widget push reported to its `on_state` callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AsyncWidgetLayerState {
    /// The load was cancelled; no widget exists.
    Canceled,

    /// The widget is created but not yet attached to its layer.
    Initialize,

    /// The widget (if the layer existed) is attached.
    AfterPush,
}

const PUSHING_WIDGET_REASON: &str = "PushingWidgetToLayer";
const STACK_TRANSITION_REASON: &str = "GlobalStackTransition";

/// The layered UI layout owned by one player.
pub struct UiLayout {
    player: Arc<LocalPlayer>,
    input: Arc<InputSuspendController>,
    loader: Arc<dyn AssetLoader>,
    layers: DashMap<UiTag, Arc<dyn WidgetStack>>,
    transition_tokens: Mutex<Vec<SuspendToken>>,
    dormant: AtomicBool,
}

impl UiLayout {
    pub fn new(
        player: Arc<LocalPlayer>,
        input: Arc<InputSuspendController>,
        loader: Arc<dyn AssetLoader>,
    ) -> Arc<Self> {
        Arc::new(Self {
            player,
            input,
            loader,
            layers: DashMap::new(),
            transition_tokens: Mutex::new(Vec::new()),
            dormant: AtomicBool::new(false),
        })
    }

    pub fn player(&self) -> &Arc<LocalPlayer> {
        &self.player
    }

    // ========================================================================
    // Layers
    // ========================================================================

    /// Registers a layer that widgets can be pushed onto, wiring its
    /// transition events into the input-suspension stack.
    pub fn register_layer(self: &Arc<Self>, layer: UiTag, stack: Arc<dyn WidgetStack>) {
        let layout = Arc::downgrade(self);
        stack.bind_transition_events(Box::new(move |transitioning| {
            if let Some(layout) = layout.upgrade() {
                layout.on_widget_stack_transitioning(transitioning);
            }
        }));

        self.layers.insert(layer, stack);
    }

    /// The layer container for the given tag, if registered.
    pub fn get_layer(&self, layer: &UiTag) -> Option<Arc<dyn WidgetStack>> {
        self.layers.get(layer).map(|entry| entry.value().clone())
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    fn on_widget_stack_transitioning(&self, transitioning: bool) {
        if transitioning {
            let token = self
                .input
                .suspend_input_for_player(self.player.id(), STACK_TRANSITION_REASON);
            self.transition_tokens.lock().push(token);
        } else {
            let token = self.transition_tokens.lock().pop();
            match token {
                Some(token) => self.input.resume_input_for_player(self.player.id(), &token),
                None => warn!("Stack transition ended with no suspension outstanding"),
            }
        }
    }

    // ========================================================================
    // Pushing Widgets
    // ========================================================================

    /// Pushes an already-loaded widget class onto a layer.
    ///
    /// Returns `None` when the layer is not registered - e.g. not part of
    /// this player's configuration - which callers may treat as
    /// failure-to-display rather than an error.
    pub fn push_widget_to_layer(
        &self,
        layer: &UiTag,
        class: &WidgetClass,
        mut init: impl FnMut(&WidgetRef),
    ) -> Option<WidgetRef> {
        let stack = self.get_layer(layer)?;
        Some(stack.add_widget(class, &mut init))
    }

    /// Resolves a soft class reference and pushes the widget onto a layer.
    ///
    /// With `suspend_input`, the owning player's input is suspended under a
    /// unique token for the duration of the load; the token is released on
    /// exactly one of completion or cancellation.
    ///
    /// `on_state` sees `Initialize` with the created widget before it is
    /// attached, then `AfterPush` (with `None` if the layer was absent or the
    /// path resolved to no class). Cancelling the returned handle yields a
    /// single `Canceled` callback instead, and nothing is pushed.
    pub fn push_widget_to_layer_async(
        self: &Arc<Self>,
        layer: UiTag,
        suspend_input: bool,
        class_ref: &SoftClassRef,
        on_state: impl Fn(AsyncWidgetLayerState, Option<&WidgetRef>) + Send + Sync + 'static,
    ) -> LoadHandle {
        let token = suspend_input.then(|| {
            self.input
                .suspend_input_for_player(self.player.id(), PUSHING_WIDGET_REASON)
        });
        let token_slot = Arc::new(Mutex::new(token));
        let on_state = Arc::new(on_state);

        let handle = {
            let layout = Arc::downgrade(self);
            let input = self.input.clone();
            let player = self.player.id();
            let token_slot = token_slot.clone();
            let on_state = on_state.clone();

            self.loader.request_load(
                class_ref,
                Box::new(move |class| {
                    if let Some(token) = token_slot.lock().take() {
                        input.resume_input_for_player(player, &token);
                    }

                    let Some(layout) = layout.upgrade() else {
                        return;
                    };

                    let widget = class.and_then(|class| {
                        layout.push_widget_to_layer(&layer, &class, |widget| {
                            on_state(AsyncWidgetLayerState::Initialize, Some(widget));
                        })
                    });

                    on_state(AsyncWidgetLayerState::AfterPush, widget.as_ref());
                }),
            )
        };

        // Resume input if this load ends up cancelled instead.
        let input = self.input.clone();
        let player = self.player.id();
        handle.bind_cancel_callback(Box::new(move || {
            if let Some(token) = token_slot.lock().take() {
                input.resume_input_for_player(player, &token);
            }
            on_state(AsyncWidgetLayerState::Canceled, None);
        }));

        handle
    }

    /// Finds the widget on whichever layer holds it and removes it.
    pub fn find_and_remove_widget(&self, widget: &WidgetRef) {
        // We're not sure what layer the widget is on, so go searching.
        let stacks: Vec<Arc<dyn WidgetStack>> = self
            .layers
            .iter()
            .map(|entry| entry.value().clone())
            .collect();

        for stack in stacks {
            stack.remove_widget(widget);
        }
    }

    // ========================================================================
    // Dormancy
    // ========================================================================

    /// A dormant layout is collapsed and responds only to persistent actions
    /// registered by the owning player.
    pub fn set_dormant(&self, dormant: bool) {
        let was = self.dormant.swap(dormant, Ordering::AcqRel);
        if was != dormant {
            info!(
                "{} layout dormancy changed for [{}] from [{}] to [{}]",
                if self.player.is_primary_player() {
                    "[Primary]"
                } else {
                    "[Non-Primary]"
                },
                self.player.controller_id(),
                if was { "Dormant" } else { "Not-Dormant" },
                if dormant { "Dormant" } else { "Not-Dormant" },
            );
        }
    }

    pub fn is_dormant(&self) -> bool {
        self.dormant.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for UiLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UiLayout")
            .field("player", &self.player.id())
            .field("layers", &self.layers.len())
            .field("dormant", &self.is_dormant())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::DeferredAssetLoader;
    use crate::stack::ActivatableWidgetStack;
    use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
    use ui_extension_system::{base_widget_class, NullWidgetHost};

    fn tag(raw: &str) -> UiTag {
        UiTag::parse(raw).expect("test tag must be well-formed")
    }

    fn fixture() -> (
        Arc<UiLayout>,
        Arc<InputSuspendController>,
        Arc<DeferredAssetLoader>,
        Arc<NullWidgetHost>,
    ) {
        let player = LocalPlayer::new(0, true);
        let input = Arc::new(InputSuspendController::new());
        let loader = DeferredAssetLoader::new();
        let layout = UiLayout::new(player, input.clone(), loader.clone());
        (layout, input, loader, NullWidgetHost::new())
    }

    #[test]
    fn sync_push_to_missing_layer_returns_none() {
        let (layout, _input, _loader, _host) = fixture();

        let widget = layout.push_widget_to_layer(&tag("UI.Layer.Menu"), &base_widget_class(), |_| {});
        assert!(widget.is_none());
    }

    #[test]
    fn sync_push_suspends_input_during_the_transition() {
        let (layout, input, _loader, host) = fixture();
        let player = layout.player().id();
        let layer = tag("UI.Layer.Menu");
        layout.register_layer(layer.clone(), ActivatableWidgetStack::new(host, Some(player)));

        // The transition token is held exactly while the stack changes, so
        // the init callback observes a suspended player.
        let suspended_during_init = Arc::new(AtomicBool::new(false));
        let widget = layout.push_widget_to_layer(&layer, &base_widget_class(), {
            let input = input.clone();
            let observed = suspended_during_init.clone();
            move |_| {
                observed.store(input.is_input_suspended(player), AtomicOrdering::Relaxed);
            }
        });

        assert!(widget.is_some());
        assert!(suspended_during_init.load(AtomicOrdering::Relaxed));
        assert!(!input.is_input_suspended(player));
    }

    #[test]
    fn async_push_holds_the_token_until_completion() {
        let (layout, input, loader, host) = fixture();
        let player = layout.player().id();
        let layer = tag("UI.Layer.Menu");
        layout.register_layer(
            layer.clone(),
            ActivatableWidgetStack::new(host, Some(player)),
        );

        let class_ref = SoftClassRef::new("/Game/UI/W_PauseMenu");
        loader.register_class(&class_ref, base_widget_class());

        let states = Arc::new(Mutex::new(Vec::new()));
        let handle = layout.push_widget_to_layer_async(layer.clone(), true, &class_ref, {
            let states = states.clone();
            move |state, widget| {
                states.lock().push((state, widget.is_some()));
            }
        });

        assert!(input.is_input_suspended(player));
        assert!(states.lock().is_empty());

        loader.pump();

        assert!(handle.is_completed());
        assert!(!input.is_input_suspended(player));
        assert_eq!(
            *states.lock(),
            vec![
                (AsyncWidgetLayerState::Initialize, true),
                (AsyncWidgetLayerState::AfterPush, true),
            ]
        );
        let stack = layout.get_layer(&layer).expect("layer is registered");
        assert_eq!(stack.widget_count(), 1);
    }

    #[test]
    fn cancelled_async_push_yields_one_canceled_and_resumes_once() {
        let (layout, input, loader, host) = fixture();
        let player = layout.player().id();
        let layer = tag("UI.Layer.Menu");
        layout.register_layer(
            layer.clone(),
            ActivatableWidgetStack::new(host, Some(player)),
        );

        let class_ref = SoftClassRef::new("/Game/UI/W_PauseMenu");
        loader.register_class(&class_ref, base_widget_class());

        let states = Arc::new(Mutex::new(Vec::new()));
        let handle = layout.push_widget_to_layer_async(layer.clone(), true, &class_ref, {
            let states = states.clone();
            move |state, widget| {
                states.lock().push((state, widget.is_some()));
            }
        });

        handle.cancel();
        handle.cancel();
        loader.pump();

        assert_eq!(*states.lock(), vec![(AsyncWidgetLayerState::Canceled, false)]);
        assert_eq!(input.suspension_count(player), 0);
        let stack = layout.get_layer(&layer).expect("layer is registered");
        assert_eq!(stack.widget_count(), 0);
    }

    #[test]
    fn async_push_to_missing_layer_still_releases_the_token() {
        let (layout, input, loader, _host) = fixture();
        let player = layout.player().id();

        let class_ref = SoftClassRef::new("/Game/UI/W_PauseMenu");
        loader.register_class(&class_ref, base_widget_class());

        let states = Arc::new(Mutex::new(Vec::new()));
        let handle =
            layout.push_widget_to_layer_async(tag("UI.Layer.Menu"), true, &class_ref, {
                let states = states.clone();
                move |state, widget| {
                    states.lock().push((state, widget.is_some()));
                }
            });

        loader.pump();

        assert!(handle.is_completed());
        assert_eq!(*states.lock(), vec![(AsyncWidgetLayerState::AfterPush, false)]);
        assert!(!input.is_input_suspended(player));
    }

    #[test]
    fn async_push_without_suspension_never_touches_input() {
        let (layout, input, loader, host) = fixture();
        let player = layout.player().id();
        let layer = tag("UI.Layer.HUD");
        layout.register_layer(
            layer.clone(),
            ActivatableWidgetStack::new(host, Some(player)),
        );

        let class_ref = SoftClassRef::new("/Game/UI/W_HUD");
        loader.register_class(&class_ref, base_widget_class());

        layout.push_widget_to_layer_async(layer, false, &class_ref, |_, _| {});
        assert!(!input.is_input_suspended(player));
    }

    #[test]
    fn find_and_remove_searches_every_layer() {
        let (layout, _input, _loader, host) = fixture();
        let player = layout.player().id();
        let hud = tag("UI.Layer.HUD");
        let menu = tag("UI.Layer.Menu");
        layout.register_layer(hud.clone(), ActivatableWidgetStack::new(host.clone(), Some(player)));
        layout.register_layer(menu.clone(), ActivatableWidgetStack::new(host, Some(player)));

        let widget = layout
            .push_widget_to_layer(&menu, &base_widget_class(), |_| {})
            .expect("menu layer is registered");

        layout.find_and_remove_widget(&widget);
        let stack = layout.get_layer(&menu).expect("layer is registered");
        assert_eq!(stack.widget_count(), 0);
    }

    #[test]
    fn dormancy_flag_round_trips() {
        let (layout, _input, _loader, _host) = fixture();

        assert!(!layout.is_dormant());
        layout.set_dormant(true);
        assert!(layout.is_dormant());
        layout.set_dormant(true);
        layout.set_dormant(false);
        assert!(!layout.is_dormant());
    }
}
