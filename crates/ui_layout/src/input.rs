//! # Input Suspension Protocol
//!
//! While a widget is streaming in, the owning player's input is suspended so
//! they cannot interact mid-transition. Every suspension is identified by a
//! unique token (reason + monotonic serial), so overlapping async operations
//! compose: each one resumes exactly its own suspension and input stays
//! blocked until the last token is gone.
//!
//! The counter lives on the controller instead of in global state; hosts own
//! one controller per UI stack.

use compact_str::CompactString;
use dashmap::DashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};
use ui_extension_system::PlayerId;

/// A uniquely-tagged input-suspension lock.
///
/// Tokens compare by their serial, which the controller never reuses.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SuspendToken {
    reason: CompactString,
    serial: u64,
}

impl SuspendToken {
    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn serial(&self) -> u64 {
        self.serial
    }
}

impl fmt::Display for SuspendToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.reason, self.serial)
    }
}

/// Tracks active input suspensions per player.
///
/// Input counts as suspended for a player while at least one of their tokens
/// is outstanding. Resuming an unknown or already-resumed token is harmless.
#[derive(Debug, Default)]
pub struct InputSuspendController {
    suspensions: AtomicU64,
    active: DashMap<PlayerId, Vec<SuspendToken>>,
}

impl InputSuspendController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Suspends input for a player and returns the unique token that undoes
    /// exactly this suspension.
    pub fn suspend_input_for_player(&self, player: PlayerId, reason: &str) -> SuspendToken {
        let serial = self.suspensions.fetch_add(1, Ordering::Relaxed) + 1;
        let token = SuspendToken {
            reason: CompactString::new(reason),
            serial,
        };

        self.active.entry(player).or_default().push(token.clone());
        debug!("Input suspended for player [{}] ({})", player, token);

        token
    }

    /// Releases one suspension. A token that is not outstanding (resumed
    /// twice, or issued for another player) is a no-op.
    pub fn resume_input_for_player(&self, player: PlayerId, token: &SuspendToken) {
        let mut found = false;

        if let Some(mut tokens) = self.active.get_mut(&player) {
            let before = tokens.len();
            tokens.retain(|candidate| candidate != token);
            found = tokens.len() != before;
        }
        self.active.remove_if(&player, |_, tokens| tokens.is_empty());

        if found {
            debug!("Input resumed for player [{}] ({})", player, token);
        } else {
            warn!(
                "Ignoring resume for player [{}] with unknown token ({})",
                player, token
            );
        }
    }

    /// True while any suspension is outstanding for the player.
    pub fn is_input_suspended(&self, player: PlayerId) -> bool {
        self.active
            .get(&player)
            .map_or(false, |tokens| !tokens.is_empty())
    }

    /// Number of outstanding suspensions for the player.
    pub fn suspension_count(&self, player: PlayerId) -> usize {
        self.active.get(&player).map_or(0, |tokens| tokens.len())
    }
}
