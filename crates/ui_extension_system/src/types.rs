//! # Player Context Types
//!
//! Minimal player identity used to scope per-player UI state: suspend tokens,
//! layouts and context-bound extension points all key off [`PlayerId`].
//! [`LocalPlayer`] is the shared context record a slot registers its
//! player-scoped extension point against.

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Unique identifier for a local player.
///
/// A wrapper around UUID that keeps player identity distinct from the other
/// id types in the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub Uuid);

impl PlayerId {
    /// Creates a new random player ID using UUID v4.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parses a player ID from a string representation.
    pub fn from_str(s: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(s).map(Self)
    }
}

impl std::str::FromStr for PlayerId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str(s)
    }
}

impl Default for PlayerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A local player attached to this game instance.
///
/// Held behind `Arc` so it can double as the context object of
/// player-scoped registrations; the registry compares context objects by
/// pointer identity, which `Arc` gives us for free.
#[derive(Debug)]
pub struct LocalPlayer {
    id: PlayerId,
    controller_id: i32,
    primary: bool,
}

impl LocalPlayer {
    pub fn new(controller_id: i32, primary: bool) -> Arc<Self> {
        Arc::new(Self {
            id: PlayerId::new(),
            controller_id,
            primary,
        })
    }

    pub fn id(&self) -> PlayerId {
        self.id
    }

    pub fn controller_id(&self) -> i32 {
        self.controller_id
    }

    pub fn is_primary_player(&self) -> bool {
        self.primary
    }
}

/// Upcasts a player to the `Any` form context objects are stored as.
pub fn player_context(player: &Arc<LocalPlayer>) -> Arc<dyn Any + Send + Sync> {
    player.clone()
}
