//! In-process chat platform
//!
//! A complete [`ChatPlatform`] and [`UserDirectory`] held in memory. Every
//! call is appended to a journal, and failures can be injected per operation
//! or per alias fragment. Backs the `simulate` command and the test suites.

use crate::error::{PlatformError, PlatformResult};
use crate::traits::{ChatPlatform, UserDirectory};
use crate::types::{RoomCreationSpec, UserAccount};
use async_trait::async_trait;
use bridge_cache::{canonical_key, Room};
use bridge_naming::alias_key;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Platform operation, used to select journal entries and failure rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ListRooms,
    CreateSpace,
    CreateRoomInSpace,
    AddChildToSpace,
    ListRoomMembers,
    AddRoomMember,
    DeleteRoom,
    ListAllAccounts,
}

/// One journaled call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformCall {
    ListRooms {
        alias_filter: Option<String>,
    },
    CreateSpace {
        alias: String,
    },
    CreateRoomInSpace {
        alias: String,
        parent_space_id: String,
        is_space: bool,
    },
    AddChildToSpace {
        parent_id: String,
        child_id: String,
    },
    ListRoomMembers {
        room_id: String,
    },
    AddRoomMember {
        room_id: String,
        user_id: String,
    },
    DeleteRoom {
        room_id: String,
    },
    ListAllAccounts,
}

impl PlatformCall {
    #[must_use]
    pub fn operation(&self) -> Operation {
        match self {
            PlatformCall::ListRooms { .. } => Operation::ListRooms,
            PlatformCall::CreateSpace { .. } => Operation::CreateSpace,
            PlatformCall::CreateRoomInSpace { .. } => Operation::CreateRoomInSpace,
            PlatformCall::AddChildToSpace { .. } => Operation::AddChildToSpace,
            PlatformCall::ListRoomMembers { .. } => Operation::ListRoomMembers,
            PlatformCall::AddRoomMember { .. } => Operation::AddRoomMember,
            PlatformCall::DeleteRoom { .. } => Operation::DeleteRoom,
            PlatformCall::ListAllAccounts => Operation::ListAllAccounts,
        }
    }

    /// Whether this call created a room or space
    #[must_use]
    pub fn is_create(&self) -> bool {
        matches!(
            self,
            PlatformCall::CreateSpace { .. } | PlatformCall::CreateRoomInSpace { .. }
        )
    }
}

#[derive(Debug)]
struct FailureRule {
    operation: Operation,
    /// Only calls whose target contains this fragment fail
    target_fragment: Option<String>,
    /// `None` fails forever
    remaining: Option<u32>,
    error: PlatformError,
}

impl FailureRule {
    fn matches(&self, operation: Operation, targets: &[&str]) -> bool {
        self.operation == operation
            && self
                .target_fragment
                .as_deref()
                .map_or(true, |fragment| targets.iter().any(|t| t.contains(fragment)))
    }
}

#[derive(Debug, Clone)]
struct StoredRoom {
    seq: u64,
    room: Room,
    members: BTreeSet<String>,
}

/// Chat platform and user directory held in memory
#[derive(Debug)]
pub struct InMemoryPlatform {
    server_name: String,

    /// room id -> room, members and creation order
    rooms: DashMap<String, StoredRoom>,

    /// canonical alias key -> room id
    aliases: DashMap<String, String>,

    accounts: RwLock<Vec<UserAccount>>,
    journal: Mutex<Vec<PlatformCall>>,
    failures: Mutex<Vec<FailureRule>>,
    latency: Mutex<Option<Duration>>,
    seq: AtomicU64,
}

impl Default for InMemoryPlatform {
    fn default() -> Self {
        Self::new("localhost")
    }
}

impl InMemoryPlatform {
    #[must_use]
    pub fn new(server_name: impl Into<String>) -> Self {
        Self {
            server_name: server_name.into(),
            rooms: DashMap::new(),
            aliases: DashMap::new(),
            accounts: RwLock::new(Vec::new()),
            journal: Mutex::new(Vec::new()),
            failures: Mutex::new(Vec::new()),
            latency: Mutex::new(None),
            seq: AtomicU64::new(0),
        }
    }

    #[inline]
    #[must_use]
    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    // =========================================================================
    // Seeding
    // =========================================================================

    /// Insert a room as if created out of band; not journaled
    pub fn seed_room(&self, room: Room) {
        if let Some(key) = room.canonical_key() {
            self.aliases.insert(key, room.room_id.clone());
        }
        let seq = self.seq.fetch_add(1, Ordering::SeqCst);
        self.rooms.insert(
            room.room_id.clone(),
            StoredRoom {
                seq,
                room,
                members: BTreeSet::new(),
            },
        );
    }

    /// Delete a room out of band; not journaled
    pub fn remove_room_externally(&self, room_id: &str) -> Option<Room> {
        self.remove_room(room_id)
    }

    pub fn add_account(&self, account: UserAccount) {
        self.accounts.write().push(account);
    }

    // =========================================================================
    // Failure injection
    // =========================================================================

    /// Fail the next `times` calls of `operation`
    pub fn fail_next(&self, operation: Operation, times: u32, error: PlatformError) {
        self.failures.lock().push(FailureRule {
            operation,
            target_fragment: None,
            remaining: Some(times),
            error,
        });
    }

    /// Fail every call of `operation` whose alias or room id contains `fragment`
    pub fn fail_matching(&self, operation: Operation, fragment: impl Into<String>, error: PlatformError) {
        self.failures.lock().push(FailureRule {
            operation,
            target_fragment: Some(fragment.into()),
            remaining: None,
            error,
        });
    }

    pub fn clear_failures(&self) {
        self.failures.lock().clear();
    }

    /// Delay every call, for exercising call timeouts
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.lock() = latency;
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    #[must_use]
    pub fn calls(&self) -> Vec<PlatformCall> {
        self.journal.lock().clone()
    }

    pub fn clear_calls(&self) {
        self.journal.lock().clear();
    }

    #[must_use]
    pub fn count(&self, operation: Operation) -> usize {
        self.journal
            .lock()
            .iter()
            .filter(|c| c.operation() == operation)
            .count()
    }

    /// Number of journaled create calls
    #[must_use]
    pub fn create_count(&self) -> usize {
        self.journal.lock().iter().filter(|c| c.is_create()).count()
    }

    /// All rooms in creation order
    #[must_use]
    pub fn rooms(&self) -> Vec<Room> {
        let mut stored: Vec<_> = self.rooms.iter().map(|e| e.value().clone()).collect();
        stored.sort_by_key(|s| s.seq);
        stored.into_iter().map(|s| s.room).collect()
    }

    #[must_use]
    pub fn room(&self, room_id: &str) -> Option<Room> {
        self.rooms.get(room_id).map(|s| s.room.clone())
    }

    /// Room by local alias, with or without sigil and server
    #[must_use]
    pub fn room_by_alias(&self, alias: &str) -> Option<Room> {
        let room_id = self.aliases.get(&canonical_key(alias))?.value().clone();
        self.room(&room_id)
    }

    #[must_use]
    pub fn members(&self, room_id: &str) -> Vec<String> {
        self.rooms
            .get(room_id)
            .map(|s| s.members.iter().cloned().collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    // =========================================================================
    // Internals
    // =========================================================================

    async fn enter(&self, call: PlatformCall, targets: &[&str]) -> PlatformResult<()> {
        let latency = *self.latency.lock();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let operation = call.operation();
        self.journal.lock().push(call);

        let mut failures = self.failures.lock();
        let Some(index) = failures.iter().position(|r| r.matches(operation, targets)) else {
            return Ok(());
        };
        let error = failures[index].error.clone();
        if let Some(remaining) = failures[index].remaining.as_mut() {
            *remaining = remaining.saturating_sub(1);
            if *remaining == 0 {
                failures.remove(index);
            }
        }
        Err(error)
    }

    fn create(&self, owner_id: &str, spec: &RoomCreationSpec) -> PlatformResult<Room> {
        let key = canonical_key(&spec.alias);
        if self.aliases.contains_key(&key) {
            return Err(PlatformError::AliasInUse(spec.alias.clone()));
        }

        let room_id = format!("!{}:{}", uuid::Uuid::new_v4().simple(), self.server_name);
        let mut room = Room::new(room_id.clone())
            .with_alias(format!("#{}:{}", spec.alias, self.server_name))
            .with_name(spec.name.clone())
            .with_topic(spec.topic.clone());
        room.is_space = spec.is_space;

        self.aliases.insert(key, room_id.clone());
        let seq = self.seq.fetch_add(1, Ordering::SeqCst);
        self.rooms.insert(
            room_id,
            StoredRoom {
                seq,
                room: room.clone(),
                members: BTreeSet::from([owner_id.to_string()]),
            },
        );
        Ok(room)
    }

    fn link(&self, parent_id: &str, child_id: &str) -> PlatformResult<()> {
        if !self.rooms.contains_key(child_id) {
            return Err(PlatformError::RoomNotFound(child_id.to_string()));
        }
        let mut parent = self
            .rooms
            .get_mut(parent_id)
            .ok_or_else(|| PlatformError::RoomNotFound(parent_id.to_string()))?;
        if !parent.room.is_space {
            return Err(PlatformError::Rejected {
                operation: "add_child_to_space".to_string(),
                reason: format!("{parent_id} is not a space"),
            });
        }
        parent.room.add_child_id(child_id);
        Ok(())
    }

    fn remove_room(&self, room_id: &str) -> Option<Room> {
        let (_, stored) = self.rooms.remove(room_id)?;
        self.aliases.retain(|_, id| id.as_str() != room_id);
        for mut entry in self.rooms.iter_mut() {
            entry.room.contained_room_ids.retain(|id| id != room_id);
        }
        Some(stored.room)
    }
}

#[async_trait]
impl ChatPlatform for InMemoryPlatform {
    async fn list_rooms(&self, alias_filter: Option<&str>) -> PlatformResult<Vec<Room>> {
        self.enter(
            PlatformCall::ListRooms {
                alias_filter: alias_filter.map(str::to_string),
            },
            &[alias_filter.unwrap_or_default()],
        )
        .await?;

        let rooms = self.rooms();
        Ok(match alias_filter.map(alias_key) {
            None => rooms,
            Some(filter) => rooms
                .into_iter()
                .filter(|r| r.pseudo_alias().is_some_and(|key| key.contains(&filter)))
                .collect(),
        })
    }

    async fn create_space(&self, owner_id: &str, spec: &RoomCreationSpec) -> PlatformResult<Room> {
        self.enter(
            PlatformCall::CreateSpace {
                alias: spec.alias.clone(),
            },
            &[&spec.alias],
        )
        .await?;

        let mut space_spec = spec.clone();
        space_spec.is_space = true;
        let room = self.create(owner_id, &space_spec)?;
        tracing::debug!(room_id = %room.room_id, alias = %spec.alias, "Created space");
        Ok(room)
    }

    async fn create_room_in_space(
        &self,
        owner_id: &str,
        spec: &RoomCreationSpec,
        parent_space_id: &str,
    ) -> PlatformResult<Room> {
        self.enter(
            PlatformCall::CreateRoomInSpace {
                alias: spec.alias.clone(),
                parent_space_id: parent_space_id.to_string(),
                is_space: spec.is_space,
            },
            &[&spec.alias, parent_space_id],
        )
        .await?;

        if !self.rooms.contains_key(parent_space_id) {
            return Err(PlatformError::RoomNotFound(parent_space_id.to_string()));
        }
        let room = self.create(owner_id, spec)?;
        self.link(parent_space_id, &room.room_id)?;
        tracing::debug!(
            room_id = %room.room_id,
            parent = %parent_space_id,
            alias = %spec.alias,
            "Created room in space"
        );
        Ok(room)
    }

    async fn add_child_to_space(&self, parent_id: &str, child_id: &str) -> PlatformResult<()> {
        self.enter(
            PlatformCall::AddChildToSpace {
                parent_id: parent_id.to_string(),
                child_id: child_id.to_string(),
            },
            &[parent_id, child_id],
        )
        .await?;
        self.link(parent_id, child_id)
    }

    async fn list_room_members(&self, room_id: &str) -> PlatformResult<Vec<String>> {
        self.enter(
            PlatformCall::ListRoomMembers {
                room_id: room_id.to_string(),
            },
            &[room_id],
        )
        .await?;
        self.rooms
            .get(room_id)
            .map(|s| s.members.iter().cloned().collect())
            .ok_or_else(|| PlatformError::RoomNotFound(room_id.to_string()))
    }

    async fn add_room_member(&self, room_id: &str, user_id: &str) -> PlatformResult<()> {
        self.enter(
            PlatformCall::AddRoomMember {
                room_id: room_id.to_string(),
                user_id: user_id.to_string(),
            },
            &[room_id, user_id],
        )
        .await?;
        let mut stored = self
            .rooms
            .get_mut(room_id)
            .ok_or_else(|| PlatformError::RoomNotFound(room_id.to_string()))?;
        stored.members.insert(user_id.to_string());
        Ok(())
    }

    async fn delete_room(&self, room_id: &str, reason: &str) -> PlatformResult<()> {
        self.enter(
            PlatformCall::DeleteRoom {
                room_id: room_id.to_string(),
            },
            &[room_id],
        )
        .await?;
        match self.remove_room(room_id) {
            Some(_) => {
                tracing::debug!(room_id, reason, "Deleted room");
                Ok(())
            }
            None => Err(PlatformError::RoomNotFound(room_id.to_string())),
        }
    }
}

#[async_trait]
impl UserDirectory for InMemoryPlatform {
    async fn list_all_accounts(&self) -> PlatformResult<Vec<UserAccount>> {
        self.enter(PlatformCall::ListAllAccounts, &[]).await?;
        Ok(self.accounts.read().clone())
    }
}
