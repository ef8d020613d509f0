//! # Soft Class References and Async Loading
//!
//! Widget classes referenced by configuration are not loaded until needed:
//! a [`SoftClassRef`] names a class by asset path and an [`AssetLoader`]
//! resolves it asynchronously. The returned [`LoadHandle`] enforces the
//! contract every consumer of this seam relies on: the completion callback
//! and the cancel callbacks fire at most once, and never both.
//!
//! Two loaders ship with this crate:
//!
//! - [`DeferredAssetLoader`] queues requests until the host pumps it, which
//!   matches a per-frame streaming tick and keeps tests deterministic.
//! - [`StreamingAssetLoader`] resolves on a spawned tokio task after a
//!   configurable latency.

use compact_str::CompactString;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use ui_extension_system::WidgetClass;
use uuid::Uuid;

/// A lazily-resolved reference to a widget class, by asset path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SoftClassRef(CompactString);

impl SoftClassRef {
    pub fn new(path: impl Into<CompactString>) -> Self {
        Self(path.into())
    }

    /// The null reference; actions refuse to start a load against it.
    pub fn null() -> Self {
        Self::default()
    }

    pub fn is_null(&self) -> bool {
        self.0.is_empty()
    }

    pub fn path(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SoftClassRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Completion callback for a load request. Receives `None` when the path
/// resolved to no class.
pub type LoadCallback = Box<dyn FnOnce(Option<WidgetClass>) + Send>;

type CancelCallback = Box<dyn FnOnce() + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoadStatus {
    Pending,
    Completed,
    Canceled,
}

struct LoadInner {
    status: LoadStatus,
    on_complete: Option<LoadCallback>,
    on_cancel: Vec<CancelCallback>,
}

/// Handle to an in-flight load request.
///
/// [`cancel`](Self::cancel) is cooperative and idempotent: cancelling twice,
/// or after natural completion, is a no-op. Loader implementations drive the
/// handle through [`complete`](Self::complete), which refuses to fire once
/// the handle has left the pending state - the at-most-once guarantee lives
/// here rather than in each loader.
#[derive(Clone)]
pub struct LoadHandle {
    id: Uuid,
    inner: Arc<Mutex<LoadInner>>,
}

impl LoadHandle {
    /// Creates a pending handle wrapping the consumer's completion callback.
    pub fn pending(on_complete: LoadCallback) -> Self {
        Self {
            id: Uuid::new_v4(),
            inner: Arc::new(Mutex::new(LoadInner {
                status: LoadStatus::Pending,
                on_complete: Some(on_complete),
                on_cancel: Vec::new(),
            })),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Completes the load, invoking the consumer callback unless the handle
    /// was cancelled first. For loader implementations.
    pub fn complete(&self, class: Option<WidgetClass>) {
        let callback = {
            let mut inner = self.inner.lock();
            if inner.status != LoadStatus::Pending {
                return;
            }
            inner.status = LoadStatus::Completed;
            inner.on_cancel.clear();
            inner.on_complete.take()
        };

        if let Some(callback) = callback {
            callback(class);
        }
    }

    /// Cancels the load. The completion callback is dropped unfired and
    /// every bound cancel callback runs exactly once.
    pub fn cancel(&self) {
        let callbacks = {
            let mut inner = self.inner.lock();
            if inner.status != LoadStatus::Pending {
                return;
            }
            inner.status = LoadStatus::Canceled;
            inner.on_complete = None;
            std::mem::take(&mut inner.on_cancel)
        };

        for callback in callbacks {
            callback();
        }
    }

    /// Binds a callback to run if this load is cancelled. Binding after
    /// cancellation fires immediately; binding after completion is dropped.
    pub fn bind_cancel_callback(&self, callback: CancelCallback) {
        let fire_now = {
            let mut inner = self.inner.lock();
            match inner.status {
                LoadStatus::Pending => {
                    inner.on_cancel.push(callback);
                    None
                }
                LoadStatus::Canceled => Some(callback),
                LoadStatus::Completed => None,
            }
        };

        if let Some(callback) = fire_now {
            callback();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.inner.lock().status == LoadStatus::Pending
    }

    pub fn is_canceled(&self) -> bool {
        self.inner.lock().status == LoadStatus::Canceled
    }

    pub fn is_completed(&self) -> bool {
        self.inner.lock().status == LoadStatus::Completed
    }
}

impl fmt::Debug for LoadHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LoadHandle({}, {:?})", self.id, self.inner.lock().status)
    }
}

/// The soft-reference loader capability.
pub trait AssetLoader: Send + Sync {
    /// Starts resolving `class_ref`. Implementations complete or cancel the
    /// returned handle; they never invoke `on_complete` directly.
    fn request_load(&self, class_ref: &SoftClassRef, on_complete: LoadCallback) -> LoadHandle;
}

/// A loader driven by the host's tick: requests queue until
/// [`pump`](Self::pump) flushes them.
///
/// The class table is filled up front with [`register_class`](Self::register_class);
/// unknown paths complete with `None`.
#[derive(Default)]
pub struct DeferredAssetLoader {
    classes: DashMap<CompactString, WidgetClass>,
    pending: Mutex<Vec<(SoftClassRef, LoadHandle)>>,
}

impl DeferredAssetLoader {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Teaches the loader which class a path resolves to.
    pub fn register_class(&self, class_ref: &SoftClassRef, class: WidgetClass) {
        self.classes
            .insert(CompactString::new(class_ref.path()), class);
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Completes every queued load. Returns how many were flushed; cancelled
    /// handles count but fire nothing.
    pub fn pump(&self) -> usize {
        let queued = std::mem::take(&mut *self.pending.lock());
        let flushed = queued.len();

        for (class_ref, handle) in queued {
            let class = self
                .classes
                .get(class_ref.path())
                .map(|entry| entry.value().clone());
            handle.complete(class);
        }

        flushed
    }
}

impl AssetLoader for DeferredAssetLoader {
    fn request_load(&self, class_ref: &SoftClassRef, on_complete: LoadCallback) -> LoadHandle {
        let handle = LoadHandle::pending(on_complete);
        debug!("Queued load for [{}]", class_ref);
        self.pending
            .lock()
            .push((class_ref.clone(), handle.clone()));
        handle
    }
}

/// A loader that resolves on a spawned tokio task after `latency`.
///
/// Requires a running tokio runtime.
pub struct StreamingAssetLoader {
    classes: DashMap<CompactString, WidgetClass>,
    latency: Duration,
}

impl StreamingAssetLoader {
    pub fn new(latency: Duration) -> Arc<Self> {
        Arc::new(Self {
            classes: DashMap::new(),
            latency,
        })
    }

    pub fn register_class(&self, class_ref: &SoftClassRef, class: WidgetClass) {
        self.classes
            .insert(CompactString::new(class_ref.path()), class);
    }
}

impl AssetLoader for StreamingAssetLoader {
    fn request_load(&self, class_ref: &SoftClassRef, on_complete: LoadCallback) -> LoadHandle {
        let handle = LoadHandle::pending(on_complete);
        let class = self
            .classes
            .get(class_ref.path())
            .map(|entry| entry.value().clone());

        let latency = self.latency;
        let task_handle = handle.clone();
        tokio::spawn(async move {
            tokio::time::sleep(latency).await;
            task_handle.complete(class);
        });

        handle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use ui_extension_system::base_widget_class;

    #[test]
    fn deferred_loads_complete_on_pump() {
        let loader = DeferredAssetLoader::new();
        let class_ref = SoftClassRef::new("/Game/UI/W_PauseMenu");
        loader.register_class(&class_ref, base_widget_class());

        let resolved = Arc::new(Mutex::new(None));
        let handle = loader.request_load(&class_ref, {
            let resolved = resolved.clone();
            Box::new(move |class| *resolved.lock() = class)
        });

        assert!(handle.is_pending());
        assert_eq!(loader.pump(), 1);
        assert!(handle.is_completed());
        assert_eq!(resolved.lock().as_ref(), Some(&base_widget_class()));
    }

    #[test]
    fn unknown_path_completes_with_none() {
        let loader = DeferredAssetLoader::new();
        let completions = Arc::new(AtomicUsize::new(0));

        let handle = loader.request_load(&SoftClassRef::new("/Game/UI/Missing"), {
            let completions = completions.clone();
            Box::new(move |class| {
                assert!(class.is_none());
                completions.fetch_add(1, Ordering::Relaxed);
            })
        });

        loader.pump();
        assert!(handle.is_completed());
        assert_eq!(completions.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn cancel_fires_cancel_callbacks_and_suppresses_completion() {
        let loader = DeferredAssetLoader::new();
        let completions = Arc::new(AtomicUsize::new(0));
        let cancels = Arc::new(AtomicUsize::new(0));

        let handle = loader.request_load(&SoftClassRef::new("/Game/UI/W_Menu"), {
            let completions = completions.clone();
            Box::new(move |_| {
                completions.fetch_add(1, Ordering::Relaxed);
            })
        });
        handle.bind_cancel_callback({
            let cancels = cancels.clone();
            Box::new(move || {
                cancels.fetch_add(1, Ordering::Relaxed);
            })
        });

        handle.cancel();
        handle.cancel();
        loader.pump();

        assert!(handle.is_canceled());
        assert_eq!(completions.load(Ordering::Relaxed), 0);
        assert_eq!(cancels.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn cancel_after_completion_is_a_noop() {
        let loader = DeferredAssetLoader::new();
        let cancels = Arc::new(AtomicUsize::new(0));

        let handle = loader.request_load(&SoftClassRef::new("/Game/UI/W_Menu"), Box::new(|_| {}));
        handle.bind_cancel_callback({
            let cancels = cancels.clone();
            Box::new(move || {
                cancels.fetch_add(1, Ordering::Relaxed);
            })
        });

        loader.pump();
        handle.cancel();

        assert!(handle.is_completed());
        assert_eq!(cancels.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn soft_class_ref_serializes_as_its_path() {
        let class_ref = SoftClassRef::new("/Game/UI/W_HUD");
        let json = serde_json::to_string(&class_ref).unwrap();
        assert_eq!(json, "\"/Game/UI/W_HUD\"");
        let back: SoftClassRef = serde_json::from_str(&json).unwrap();
        assert_eq!(back, class_ref);
    }

    #[tokio::test]
    async fn streaming_loader_resolves_in_the_background() {
        let loader = StreamingAssetLoader::new(Duration::from_millis(1));
        let class_ref = SoftClassRef::new("/Game/UI/W_HUD");
        loader.register_class(&class_ref, base_widget_class());

        let (tx, rx) = tokio::sync::oneshot::channel();
        let tx = Mutex::new(Some(tx));
        let handle = loader.request_load(
            &class_ref,
            Box::new(move |class| {
                if let Some(tx) = tx.lock().take() {
                    let _ = tx.send(class);
                }
            }),
        );

        let resolved = rx.await.expect("load task dropped the completion");
        assert!(handle.is_completed());
        assert_eq!(resolved, Some(base_widget_class()));
    }
}
