//! Room/space cache with alias indexes
//!
//! Provides [`RoomSpaceCache`], the engine's authoritative local view of the
//! rooms it has seen or provisioned.

use crate::room::{canonical_key, Room};
use bridge_naming::alias_key;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Concurrent room cache keyed by id, canonical alias and pseudo alias
///
/// The room map is a `DashMap`. Each alias index sits behind its own mutex so
/// the "check, remove, insert" re-indexing sequence is atomic per index.
/// Writers (`upsert`, `delete`) additionally hold `writes` so the room map and
/// both indexes change together; readers never take it.
#[derive(Debug, Default)]
pub struct RoomSpaceCache {
    /// room_id -> room
    rooms: DashMap<String, Room>,

    /// canonical alias key -> room_id
    by_canonical: Mutex<HashMap<String, String>>,

    /// pseudo alias -> room_id
    by_pseudo: Mutex<HashMap<String, String>>,

    /// Serializes writers
    writes: Mutex<()>,
}

/// Set of room ids captured at a point in time
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoomSnapshot(HashSet<String>);

impl RoomSnapshot {
    /// Empty baseline (first cycle)
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Check membership
    #[inline]
    #[must_use]
    pub fn contains(&self, room_id: &str) -> bool {
        self.0.contains(room_id)
    }

    /// Number of rooms in snapshot
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if snapshot is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<String> for RoomSnapshot {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Statistics for cache monitoring
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Rooms by id
    pub rooms: usize,
    /// Rooms that are spaces
    pub spaces: usize,
    /// Entries in the canonical alias index
    pub canonical_aliases: usize,
    /// Entries in the pseudo alias index
    pub pseudo_aliases: usize,
}

impl RoomSpaceCache {
    /// Create empty cache
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a room and re-index both alias maps
    ///
    /// Any alias entries previously pointing at this room id are removed
    /// before the new ones are inserted. If another room already held the
    /// same alias, the newer room wins.
    pub fn upsert(&self, room: Room) {
        let room_id = room.room_id.clone();
        let canonical = room.canonical_key();
        let pseudo = room.pseudo_alias();

        let _writer = self.writes.lock();
        let previous = self.rooms.insert(room_id.clone(), room);
        let (old_canonical, old_pseudo) = previous
            .as_ref()
            .map_or((None, None), |p| (p.canonical_key(), p.pseudo_alias()));

        reindex(&self.by_canonical, &room_id, old_canonical, canonical);
        reindex(&self.by_pseudo, &room_id, old_pseudo, pseudo);
    }

    /// Get room by id
    #[inline]
    #[must_use]
    pub fn get(&self, room_id: &str) -> Option<Room> {
        self.rooms.get(room_id).map(|entry| entry.value().clone())
    }

    /// Check if room id is cached
    #[inline]
    #[must_use]
    pub fn contains(&self, room_id: &str) -> bool {
        self.rooms.contains_key(room_id)
    }

    /// Lookup by canonical alias (sigil and server suffix tolerated)
    #[must_use]
    pub fn get_by_canonical_alias(&self, alias: &str) -> Option<Room> {
        let key = canonical_key(alias);
        let room_id = self.by_canonical.lock().get(&key).cloned()?;
        self.get(&room_id)
    }

    /// Lookup by pseudo alias (normalized before lookup)
    #[must_use]
    pub fn get_by_pseudo_alias(&self, alias: &str) -> Option<Room> {
        let key = alias_key(alias);
        let room_id = self.by_pseudo.lock().get(&key).cloned()?;
        self.get(&room_id)
    }

    /// Remove room from all three indexes
    ///
    /// Alias maps are scanned by value since the caller only supplies the id.
    pub fn delete(&self, room_id: &str) -> Option<Room> {
        let _writer = self.writes.lock();
        let removed = self.rooms.remove(room_id).map(|(_, room)| room);
        self.by_canonical.lock().retain(|_, id| id != room_id);
        self.by_pseudo.lock().retain(|_, id| id != room_id);
        if removed.is_some() {
            tracing::debug!(room_id, "Removed room from cache");
        }
        removed
    }

    /// Copy of every cached room
    #[must_use]
    pub fn full_snapshot(&self) -> Vec<Room> {
        self.rooms.iter().map(|entry| entry.value().clone()).collect()
    }

    /// Ids of every cached room
    #[must_use]
    pub fn snapshot_ids(&self) -> RoomSnapshot {
        self.rooms.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Rooms present now but absent from `last_snapshot`
    ///
    /// An empty baseline reports every cached room as added.
    #[must_use]
    pub fn recently_added_since(&self, last_snapshot: &RoomSnapshot) -> Vec<Room> {
        self.rooms
            .iter()
            .filter(|entry| !last_snapshot.contains(entry.key()))
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Copy of `room` with `contained_rooms` resolved from the cache
    ///
    /// Children not yet cached are skipped; order follows `contained_room_ids`.
    #[must_use]
    pub fn resolve_children(&self, room: &Room) -> Room {
        let mut resolved = room.clone();
        resolved.contained_rooms = room
            .contained_room_ids
            .iter()
            .filter_map(|id| self.get(id))
            .collect();
        resolved
    }

    /// Record `child_id` under the cached parent (no-op if parent unknown)
    ///
    /// Returns `true` if the link was new.
    pub fn link_child(&self, parent_id: &str, child_id: &str) -> bool {
        self.rooms
            .get_mut(parent_id)
            .is_some_and(|mut parent| parent.add_child_id(child_id))
    }

    /// Number of cached rooms
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    /// Check if cache is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// Cache statistics
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            rooms: self.rooms.len(),
            spaces: self.rooms.iter().filter(|e| e.value().is_space).count(),
            canonical_aliases: self.by_canonical.lock().len(),
            pseudo_aliases: self.by_pseudo.lock().len(),
        }
    }
}

fn reindex(
    index: &Mutex<HashMap<String, String>>,
    room_id: &str,
    old_key: Option<String>,
    new_key: Option<String>,
) {
    let mut map = index.lock();
    if let Some(old) = old_key {
        if map.get(&old).is_some_and(|id| id == room_id) {
            map.remove(&old);
        }
    }
    if let Some(new) = new_key {
        if let Some(displaced) = map.insert(new.clone(), room_id.to_string()) {
            if displaced != room_id {
                tracing::debug!(alias = %new, room_id, displaced = %displaced, "Alias re-pointed to newer room");
            }
        }
    }
}
