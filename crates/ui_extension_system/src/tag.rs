//! # Hierarchical UI Tags
//!
//! Tags are dotted identifiers (`HUD.Slot.Scoreboard`) used to address
//! extension points, extensions and layout layers. Matching between points and
//! extensions walks the tag chain upward one segment at a time, so
//! `HUD.Slot.Scoreboard` is reachable from `HUD.Slot` and `HUD`.
//!
//! A [`UiTag`] is valid by construction: [`UiTag::parse`] rejects empty
//! strings and empty segments, which means every tag handed to the registry
//! is already well-formed.

use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Errors produced when parsing a [`UiTag`] from a raw string.
#[derive(Debug, thiserror::Error)]
pub enum TagError {
    #[error("tag is empty")]
    Empty,
    #[error("tag '{0}' contains an empty segment")]
    EmptySegment(String),
}

/// A hierarchical dotted identifier.
///
/// Two tags are equal iff their string forms are identical. The parent of
/// `A.B.C` is `A.B`; a single-segment tag has no parent.
///
/// # Examples
///
/// ```rust
/// use ui_extension_system::UiTag;
///
/// let tag = UiTag::parse("HUD.Slot.Scoreboard").unwrap();
/// assert_eq!(tag.parent().unwrap().as_str(), "HUD.Slot");
/// assert!(UiTag::parse("HUD..Slot").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UiTag(CompactString);

impl UiTag {
    /// Parses and validates a tag from its dotted string form.
    pub fn parse(raw: &str) -> Result<Self, TagError> {
        if raw.is_empty() {
            return Err(TagError::Empty);
        }

        if raw.split('.').any(str::is_empty) {
            return Err(TagError::EmptySegment(raw.to_string()));
        }

        Ok(Self(CompactString::new(raw)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the direct parent tag, or `None` at the root.
    pub fn parent(&self) -> Option<UiTag> {
        self.0
            .rfind('.')
            .map(|idx| Self(CompactString::new(&self.0[..idx])))
    }

    /// Walks the chain upward: the tag itself, its parent, and so on to root.
    pub fn self_and_ancestors(&self) -> TagChain {
        TagChain {
            next: Some(self.clone()),
        }
    }
}

impl fmt::Display for UiTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UiTag {
    type Err = TagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Iterator over a tag and its ancestors, narrowest first.
pub struct TagChain {
    next: Option<UiTag>,
}

impl Iterator for TagChain {
    type Item = UiTag;

    fn next(&mut self) -> Option<UiTag> {
        let current = self.next.take()?;
        self.next = current.parent();
        Some(current)
    }
}
