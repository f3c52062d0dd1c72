//! Room model
//!
//! A [`Room`] is one provisioned chat room or space as known to the engine,
//! either reported by the platform or created by a reconciliation pass.

use bridge_naming::{alias_key, normalize, RoomType};
use serde::{Deserialize, Serialize};

/// Provisioned chat room or space
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    /// Platform-assigned, stable identifier
    pub room_id: String,
    /// Platform alias, possibly carrying `#` sigil and `:server` suffix
    pub canonical_alias: Option<String>,
    /// Display name
    pub name: Option<String>,
    /// Topic
    pub topic: Option<String>,
    /// Whether this room is a space
    pub is_space: bool,
    /// Ordered child room references
    pub contained_room_ids: Vec<String>,
    /// Resolved children, filled by [`crate::RoomSpaceCache::resolve_children`]
    #[serde(skip)]
    pub contained_rooms: Vec<Room>,
}

impl Room {
    /// Create room with only an id
    #[inline]
    #[must_use]
    pub fn new(room_id: impl Into<String>) -> Self {
        Self {
            room_id: room_id.into(),
            canonical_alias: None,
            name: None,
            topic: None,
            is_space: false,
            contained_room_ids: Vec::new(),
            contained_rooms: Vec::new(),
        }
    }

    /// With canonical alias
    #[inline]
    #[must_use]
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.canonical_alias = Some(alias.into());
        self
    }

    /// With display name
    #[inline]
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// With topic
    #[inline]
    #[must_use]
    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    /// Mark as space
    #[inline]
    #[must_use]
    pub fn as_space(mut self) -> Self {
        self.is_space = true;
        self
    }

    /// With child room ids
    #[inline]
    #[must_use]
    pub fn with_children(mut self, children: Vec<String>) -> Self {
        self.contained_room_ids = children;
        self
    }

    /// Canonical alias key: sigil and server stripped, lower-cased
    #[must_use]
    pub fn canonical_key(&self) -> Option<String> {
        self.canonical_alias
            .as_deref()
            .map(canonical_key)
            .filter(|k| !k.is_empty())
    }

    /// Pseudo alias: normalized canonical alias, falling back to the name
    #[must_use]
    pub fn pseudo_alias(&self) -> Option<String> {
        self.canonical_alias
            .as_deref()
            .map(alias_key)
            .or_else(|| self.name.as_deref().map(normalize))
            .filter(|k| !k.is_empty())
    }

    /// Room type recovered from the pseudo alias
    #[must_use]
    pub fn room_type(&self) -> Option<RoomType> {
        self.pseudo_alias().and_then(|key| RoomType::from_alias(&key))
    }

    /// Record a child id, keeping the list free of duplicates
    ///
    /// Returns `true` if the id was not already present.
    pub fn add_child_id(&mut self, child_id: &str) -> bool {
        if self.contains_child(child_id) {
            false
        } else {
            self.contained_room_ids.push(child_id.to_string());
            true
        }
    }

    /// Check whether `child_id` is a known child
    #[inline]
    #[must_use]
    pub fn contains_child(&self, child_id: &str) -> bool {
        self.contained_room_ids.iter().any(|id| id == child_id)
    }
}

/// Canonical alias key for lookups
///
/// Unlike [`alias_key`] separators are kept; only the sigil and server suffix
/// are removed and the result lower-cased.
#[must_use]
pub fn canonical_key(raw: &str) -> String {
    let trimmed = raw.trim();
    let without_sigil = trimmed.strip_prefix('#').unwrap_or(trimmed);
    let localpart = without_sigil
        .split_once(':')
        .map_or(without_sigil, |(local, _)| local);
    localpart.to_lowercase()
}
