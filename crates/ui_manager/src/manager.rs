//! # UI Manager
//!
//! The process-wide owner of the current [`UiPolicy`]. Player lifecycle
//! notifications arrive here from the host and are delegated to whichever
//! policy is installed; with no policy installed they are dropped, which is
//! the dedicated-server configuration.

use crate::policy::UiPolicy;
use lazy_static::lazy_static;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::info;
use ui_extension_system::LocalPlayer;

lazy_static! {
    static ref GLOBAL_UI_MANAGER: Arc<UiManager> = Arc::new(UiManager {
        policy: Mutex::new(None),
    });
}

/// Owns the current UI policy and fans player notifications out to it.
pub struct UiManager {
    policy: Mutex<Option<Arc<UiPolicy>>>,
}

impl UiManager {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            policy: Mutex::new(None),
        })
    }

    /// The process-wide manager instance the function library and gameplay
    /// code reach for when no explicit manager is threaded through.
    pub fn global() -> Arc<UiManager> {
        GLOBAL_UI_MANAGER.clone()
    }

    /// Installs `policy` unless one is already active. Boot-time entry
    /// point; later swaps go through [`switch_to_policy`](Self::switch_to_policy).
    pub fn initialize(&self, policy: Arc<UiPolicy>) {
        if self.policy.lock().is_none() {
            self.switch_to_policy(Some(policy));
        }
    }

    /// Replaces the current policy. The outgoing policy keeps its layouts
    /// alive for as long as callers hold them.
    pub fn switch_to_policy(&self, policy: Option<Arc<UiPolicy>>) {
        let mut current = self.policy.lock();

        let unchanged = match (&*current, &policy) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        };

        if !unchanged {
            info!(
                "Switching UI policy ({} -> {})",
                if current.is_some() { "set" } else { "none" },
                if policy.is_some() { "set" } else { "none" },
            );
            *current = policy;
        }
    }

    pub fn current_policy(&self) -> Option<Arc<UiPolicy>> {
        self.policy.lock().clone()
    }

    /// Uninstalls the current policy.
    pub fn shutdown(&self) {
        self.switch_to_policy(None);
    }

    // ========================================================================
    // Player Notifications
    // ========================================================================

    pub fn notify_player_added(&self, player: &Arc<LocalPlayer>) {
        if let Some(policy) = self.current_policy() {
            policy.notify_player_added(player);
        }
    }

    pub fn notify_player_removed(&self, player: &Arc<LocalPlayer>) {
        if let Some(policy) = self.current_policy() {
            policy.notify_player_removed(player);
        }
    }

    pub fn notify_player_destroyed(&self, player: &Arc<LocalPlayer>) {
        if let Some(policy) = self.current_policy() {
            policy.notify_player_destroyed(player);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{MultiplayerInteractionMode, NullViewportSink, PolicyConfig};
    use ui_extension_system::{base_widget_class, NullWidgetHost, WidgetClass};
    use ui_layout::{DeferredAssetLoader, InputSuspendController};

    fn test_policy() -> Arc<UiPolicy> {
        UiPolicy::new(
            PolicyConfig {
                interaction_mode: MultiplayerInteractionMode::PrimaryOnly,
                layout_class: WidgetClass::subclass_of("OverlayLayout", &base_widget_class()),
            },
            NullWidgetHost::new(),
            Arc::new(InputSuspendController::new()),
            DeferredAssetLoader::new(),
            NullViewportSink::new(),
        )
    }

    #[test]
    fn notifications_without_a_policy_are_dropped() {
        let manager = UiManager::new();
        let player = LocalPlayer::new(0, true);

        manager.notify_player_added(&player);
        manager.notify_player_removed(&player);
        manager.notify_player_destroyed(&player);
        assert!(manager.current_policy().is_none());
    }

    #[test]
    fn initialize_does_not_replace_an_active_policy() {
        let manager = UiManager::new();
        let first = test_policy();
        let second = test_policy();

        manager.initialize(first.clone());
        manager.initialize(second);

        let current = manager.current_policy().expect("a policy is installed");
        assert!(Arc::ptr_eq(&current, &first));
    }

    #[test]
    fn notifications_reach_the_installed_policy() {
        let manager = UiManager::new();
        let policy = test_policy();
        manager.initialize(policy.clone());

        let player = LocalPlayer::new(0, true);
        manager.notify_player_added(&player);
        assert_eq!(policy.root_layout_count(), 1);

        manager.notify_player_destroyed(&player);
        assert_eq!(policy.root_layout_count(), 0);
    }

    #[test]
    fn shutdown_uninstalls_the_policy() {
        let manager = UiManager::new();
        manager.initialize(test_policy());
        manager.shutdown();
        assert!(manager.current_policy().is_none());
    }
}
