//! # One-Shot Widget Actions
//!
//! Cancellable wrappers around the async pipeline for fire-and-forget use
//! from gameplay code: [`CreateWidgetAsyncAction`] streams in a widget class
//! and instantiates it, [`PushContentToLayerAction`] streams a class and
//! pushes it onto a layout layer. Both run the same lifecycle:
//!
//! ```text
//! Created --activate()--> Loading --+--> Complete
//!                                   +--> Canceled
//! ```
//!
//! A finished action broadcasts nothing further and can be dropped.
//! Cancellation is cooperative and idempotent; when input was suspended, the
//! token is resumed on exactly one of completion or cancellation. Dropping an
//! action mid-load cancels it, so owner teardown cannot leak a suspension.

use crate::input::{InputSuspendController, SuspendToken};
use crate::layout::{AsyncWidgetLayerState, UiLayout};
use crate::loader::{AssetLoader, LoadHandle, SoftClassRef};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, error, warn};
use ui_extension_system::{LocalPlayer, UiTag, WidgetHost, WidgetRef};

const CREATING_WIDGET_REASON: &str = "CreatingWidgetAsync";

/// Lifecycle of a one-shot action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionState {
    Created,
    Loading,
    Complete,
    Canceled,
}

impl ActionState {
    /// A finished action has nothing left to do.
    pub fn is_finished(self) -> bool {
        matches!(self, ActionState::Complete | ActionState::Canceled)
    }
}

type CompletionListener = Box<dyn Fn(&WidgetRef) + Send + Sync>;
type PushListener = Box<dyn Fn(Option<&WidgetRef>) + Send + Sync>;

/// Resolves a soft class reference and instantiates the widget, with no
/// layer involved.
///
/// Construction fails (with an error log, mirroring a blueprint-node misuse)
/// when the class reference is null; nothing is returned and nothing runs.
pub struct CreateWidgetAsyncAction {
    player: Arc<LocalPlayer>,
    input: Arc<InputSuspendController>,
    loader: Arc<dyn AssetLoader>,
    host: Arc<dyn WidgetHost>,
    class_ref: SoftClassRef,
    suspend_input: bool,
    state: Arc<Mutex<ActionState>>,
    suspend_token: Arc<Mutex<Option<SuspendToken>>>,
    load_handle: Mutex<Option<LoadHandle>>,
    complete_listeners: Arc<Mutex<Vec<CompletionListener>>>,
}

impl CreateWidgetAsyncAction {
    pub fn new(
        player: Arc<LocalPlayer>,
        input: Arc<InputSuspendController>,
        loader: Arc<dyn AssetLoader>,
        host: Arc<dyn WidgetHost>,
        class_ref: SoftClassRef,
        suspend_input: bool,
    ) -> Option<Arc<Self>> {
        if class_ref.is_null() {
            error!("create_widget_async was passed a null widget class reference");
            return None;
        }

        Some(Arc::new(Self {
            player,
            input,
            loader,
            host,
            class_ref,
            suspend_input,
            state: Arc::new(Mutex::new(ActionState::Created)),
            suspend_token: Arc::new(Mutex::new(None)),
            load_handle: Mutex::new(None),
            complete_listeners: Arc::new(Mutex::new(Vec::new())),
        }))
    }

    /// Adds a listener for the created widget. Listeners registered after
    /// the action finished never fire.
    pub fn on_complete(&self, listener: impl Fn(&WidgetRef) + Send + Sync + 'static) {
        self.complete_listeners.lock().push(Box::new(listener));
    }

    /// Suspends input if requested and starts the load. Activating twice is
    /// a no-op.
    pub fn activate(&self) {
        {
            let mut state = self.state.lock();
            if *state != ActionState::Created {
                warn!("Ignoring activate on an action in state {:?}", *state);
                return;
            }
            *state = ActionState::Loading;
        }

        if self.suspend_input {
            let token = self
                .input
                .suspend_input_for_player(self.player.id(), CREATING_WIDGET_REASON);
            *self.suspend_token.lock() = Some(token);
        }

        let handle = {
            let state = self.state.clone();
            let token_slot = self.suspend_token.clone();
            let input = self.input.clone();
            let player = self.player.id();
            let host = self.host.clone();
            let listeners = self.complete_listeners.clone();

            self.loader.request_load(
                &self.class_ref,
                Box::new(move |class| {
                    if let Some(token) = token_slot.lock().take() {
                        input.resume_input_for_player(player, &token);
                    }

                    // A path that resolved to no class finishes quietly with
                    // no broadcast.
                    if let Some(class) = class {
                        let widget = host.create_widget(Some(player), &class);
                        let listeners = std::mem::take(&mut *listeners.lock());
                        for listener in &listeners {
                            listener(&widget);
                        }
                    } else {
                        debug!("Widget class load resolved to nothing; no widget created");
                    }

                    *state.lock() = ActionState::Complete;
                }),
            )
        };

        // Resume input if this load ends up cancelled instead.
        let state = self.state.clone();
        let token_slot = self.suspend_token.clone();
        let input = self.input.clone();
        let player = self.player.id();
        handle.bind_cancel_callback(Box::new(move || {
            if let Some(token) = token_slot.lock().take() {
                input.resume_input_for_player(player, &token);
            }
            *state.lock() = ActionState::Canceled;
        }));

        *self.load_handle.lock() = Some(handle);
    }

    /// Cancels the in-flight load. Cancelling twice, or after natural
    /// completion, is a no-op.
    pub fn cancel(&self) {
        let handle = self.load_handle.lock().take();
        if let Some(handle) = handle {
            handle.cancel();
        }
    }

    pub fn state(&self) -> ActionState {
        *self.state.lock()
    }
}

impl Drop for CreateWidgetAsyncAction {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Resolves a soft class reference and pushes the widget onto a layer of the
/// owning player's layout.
///
/// The push itself (and the suspend-token discipline) is delegated to
/// [`UiLayout::push_widget_to_layer_async`]; this wrapper adds the one-shot
/// state machine and the before/after broadcast points.
pub struct PushContentToLayerAction {
    layout: Arc<UiLayout>,
    layer: UiTag,
    class_ref: SoftClassRef,
    suspend_input: bool,
    state: Arc<Mutex<ActionState>>,
    before_push: Arc<Mutex<Vec<CompletionListener>>>,
    after_push: Arc<Mutex<Vec<PushListener>>>,
    load_handle: Mutex<Option<LoadHandle>>,
}

impl PushContentToLayerAction {
    pub fn new(
        layout: Arc<UiLayout>,
        layer: UiTag,
        class_ref: SoftClassRef,
        suspend_input: bool,
    ) -> Option<Arc<Self>> {
        if class_ref.is_null() {
            error!("push_content_to_layer was passed a null widget class reference");
            return None;
        }

        Some(Arc::new(Self {
            layout,
            layer,
            class_ref,
            suspend_input,
            state: Arc::new(Mutex::new(ActionState::Created)),
            before_push: Arc::new(Mutex::new(Vec::new())),
            after_push: Arc::new(Mutex::new(Vec::new())),
            load_handle: Mutex::new(None),
        }))
    }

    /// Sees the created widget before it is attached to its layer.
    pub fn on_before_push(&self, listener: impl Fn(&WidgetRef) + Send + Sync + 'static) {
        self.before_push.lock().push(Box::new(listener));
    }

    /// Sees the attached widget, or `None` when the layer was absent or the
    /// path resolved to no class. Never fires on cancellation.
    pub fn on_after_push(&self, listener: impl Fn(Option<&WidgetRef>) + Send + Sync + 'static) {
        self.after_push.lock().push(Box::new(listener));
    }

    /// Starts the load-and-push. Activating twice is a no-op.
    pub fn activate(&self) {
        {
            let mut state = self.state.lock();
            if *state != ActionState::Created {
                warn!("Ignoring activate on an action in state {:?}", *state);
                return;
            }
            *state = ActionState::Loading;
        }

        let state = self.state.clone();
        let before = self.before_push.clone();
        let after = self.after_push.clone();

        let handle = self.layout.push_widget_to_layer_async(
            self.layer.clone(),
            self.suspend_input,
            &self.class_ref,
            move |layer_state, widget| match layer_state {
                AsyncWidgetLayerState::Initialize => {
                    if let Some(widget) = widget {
                        let listeners = std::mem::take(&mut *before.lock());
                        for listener in &listeners {
                            listener(widget);
                        }
                    }
                }
                AsyncWidgetLayerState::AfterPush => {
                    let listeners = std::mem::take(&mut *after.lock());
                    for listener in &listeners {
                        listener(widget);
                    }
                    *state.lock() = ActionState::Complete;
                }
                AsyncWidgetLayerState::Canceled => {
                    *state.lock() = ActionState::Canceled;
                }
            },
        );

        *self.load_handle.lock() = Some(handle);
    }

    /// Cancels the in-flight load-and-push. Idempotent.
    pub fn cancel(&self) {
        let handle = self.load_handle.lock().take();
        if let Some(handle) = handle {
            handle.cancel();
        }
    }

    pub fn state(&self) -> ActionState {
        *self.state.lock()
    }
}

impl Drop for PushContentToLayerAction {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::DeferredAssetLoader;
    use crate::stack::ActivatableWidgetStack;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use ui_extension_system::{base_widget_class, NullWidgetHost, UiTag};

    fn fixture() -> (
        Arc<LocalPlayer>,
        Arc<InputSuspendController>,
        Arc<DeferredAssetLoader>,
        Arc<NullWidgetHost>,
    ) {
        (
            LocalPlayer::new(0, true),
            Arc::new(InputSuspendController::new()),
            DeferredAssetLoader::new(),
            NullWidgetHost::new(),
        )
    }

    #[test]
    fn null_class_ref_yields_no_action() {
        let (player, input, loader, host) = fixture();

        assert!(CreateWidgetAsyncAction::new(
            player.clone(),
            input.clone(),
            loader.clone(),
            host,
            SoftClassRef::null(),
            true,
        )
        .is_none());

        let layout = UiLayout::new(player, input, loader);
        assert!(PushContentToLayerAction::new(
            layout,
            UiTag::parse("UI.Layer.Menu").unwrap(),
            SoftClassRef::null(),
            true,
        )
        .is_none());
    }

    #[test]
    fn create_action_completes_and_broadcasts_once() {
        let (player, input, loader, host) = fixture();
        let class_ref = SoftClassRef::new("/Game/UI/W_Reticle");
        loader.register_class(&class_ref, base_widget_class());

        let action = CreateWidgetAsyncAction::new(
            player.clone(),
            input.clone(),
            loader.clone(),
            host.clone(),
            class_ref,
            true,
        )
        .expect("a non-null class reference creates the action");

        let completions = Arc::new(AtomicUsize::new(0));
        action.on_complete({
            let completions = completions.clone();
            move |_| {
                completions.fetch_add(1, Ordering::Relaxed);
            }
        });

        action.activate();
        assert_eq!(action.state(), ActionState::Loading);
        assert!(input.is_input_suspended(player.id()));

        loader.pump();
        assert_eq!(action.state(), ActionState::Complete);
        assert_eq!(completions.load(Ordering::Relaxed), 1);
        assert_eq!(host.created_count(), 1);
        assert!(!input.is_input_suspended(player.id()));
    }

    #[test]
    fn cancelled_create_action_resumes_input_without_broadcast() {
        let (player, input, loader, host) = fixture();
        let class_ref = SoftClassRef::new("/Game/UI/W_Reticle");
        loader.register_class(&class_ref, base_widget_class());

        let action = CreateWidgetAsyncAction::new(
            player.clone(),
            input.clone(),
            loader.clone(),
            host.clone(),
            class_ref,
            true,
        )
        .expect("a non-null class reference creates the action");

        let completions = Arc::new(AtomicUsize::new(0));
        action.on_complete({
            let completions = completions.clone();
            move |_| {
                completions.fetch_add(1, Ordering::Relaxed);
            }
        });

        action.activate();
        assert_eq!(input.suspension_count(player.id()), 1);

        action.cancel();
        action.cancel();
        loader.pump();

        assert_eq!(action.state(), ActionState::Canceled);
        assert!(action.state().is_finished());
        assert_eq!(completions.load(Ordering::Relaxed), 0);
        assert_eq!(host.created_count(), 0);
        assert_eq!(input.suspension_count(player.id()), 0);
    }

    #[test]
    fn unresolved_path_finishes_without_widget() {
        let (player, input, loader, host) = fixture();

        let action = CreateWidgetAsyncAction::new(
            player.clone(),
            input.clone(),
            loader.clone(),
            host.clone(),
            SoftClassRef::new("/Game/UI/Missing"),
            true,
        )
        .expect("a non-null class reference creates the action");

        let completions = Arc::new(AtomicUsize::new(0));
        action.on_complete({
            let completions = completions.clone();
            move |_| {
                completions.fetch_add(1, Ordering::Relaxed);
            }
        });

        action.activate();
        loader.pump();

        assert_eq!(action.state(), ActionState::Complete);
        assert_eq!(completions.load(Ordering::Relaxed), 0);
        assert_eq!(host.created_count(), 0);
        assert!(!input.is_input_suspended(player.id()));
    }

    #[test]
    fn push_action_attaches_widget_to_layer() {
        let (player, input, loader, host) = fixture();
        let layout = UiLayout::new(player.clone(), input.clone(), loader.clone());
        let layer = UiTag::parse("UI.Layer.Menu").unwrap();
        layout.register_layer(
            layer.clone(),
            ActivatableWidgetStack::new(host.clone(), Some(player.id())),
        );

        let class_ref = SoftClassRef::new("/Game/UI/W_PauseMenu");
        loader.register_class(&class_ref, base_widget_class());

        let action = PushContentToLayerAction::new(layout.clone(), layer.clone(), class_ref, true)
            .expect("a non-null class reference creates the action");

        let before = Arc::new(AtomicUsize::new(0));
        let after = Arc::new(AtomicUsize::new(0));
        action.on_before_push({
            let before = before.clone();
            move |_| {
                before.fetch_add(1, Ordering::Relaxed);
            }
        });
        action.on_after_push({
            let after = after.clone();
            move |widget| {
                assert!(widget.is_some());
                after.fetch_add(1, Ordering::Relaxed);
            }
        });

        action.activate();
        loader.pump();

        assert_eq!(action.state(), ActionState::Complete);
        assert_eq!(before.load(Ordering::Relaxed), 1);
        assert_eq!(after.load(Ordering::Relaxed), 1);
        let stack = layout.get_layer(&layer).expect("layer is registered");
        assert_eq!(stack.widget_count(), 1);
        assert!(!input.is_input_suspended(player.id()));
    }

    #[test]
    fn cancelled_push_action_pushes_nothing() {
        let (player, input, loader, host) = fixture();
        let layout = UiLayout::new(player.clone(), input.clone(), loader.clone());
        let layer = UiTag::parse("UI.Layer.Menu").unwrap();
        layout.register_layer(
            layer.clone(),
            ActivatableWidgetStack::new(host, Some(player.id())),
        );

        let class_ref = SoftClassRef::new("/Game/UI/W_PauseMenu");
        loader.register_class(&class_ref, base_widget_class());

        let action = PushContentToLayerAction::new(layout.clone(), layer.clone(), class_ref, true)
            .expect("a non-null class reference creates the action");

        let after = Arc::new(AtomicUsize::new(0));
        action.on_after_push({
            let after = after.clone();
            move |_| {
                after.fetch_add(1, Ordering::Relaxed);
            }
        });

        action.activate();
        action.cancel();
        loader.pump();

        assert_eq!(action.state(), ActionState::Canceled);
        assert_eq!(after.load(Ordering::Relaxed), 0);
        let stack = layout.get_layer(&layer).expect("layer is registered");
        assert_eq!(stack.widget_count(), 0);
        assert!(!input.is_input_suspended(player.id()));
    }

    #[test]
    fn dropping_a_loading_action_resumes_input() {
        let (player, input, loader, host) = fixture();
        let class_ref = SoftClassRef::new("/Game/UI/W_Reticle");
        loader.register_class(&class_ref, base_widget_class());

        let action = CreateWidgetAsyncAction::new(
            player.clone(),
            input.clone(),
            loader.clone(),
            host,
            class_ref,
            true,
        )
        .expect("a non-null class reference creates the action");

        action.activate();
        assert!(input.is_input_suspended(player.id()));

        drop(action);
        assert!(!input.is_input_suspended(player.id()));
    }
}
