//! Per-level replica reconciliation
//!
//! One generic resolve-or-create step, parameterized by [`LevelSpec`], used for
//! every level of the topology tree:
//!
//! 1. Resolve the participant's space: the known room if given, else the cache
//!    by pseudo alias, else the platform by alias, else create it.
//! 2. Work out which of the level's fixed sub-rooms already sit in the space.
//! 3. Create the missing ones, in enumeration order, and cache them.
//! 4. Link the space under its parent when the parent does not list it yet.
//! 5. Hand back the resolved space so the caller can recurse.

use crate::config::ReconcileConfig;
use crate::error::{ReconcileError, ReconcileResult};
use crate::level::LevelSpec;
use crate::stats::ProvisioningStats;
use bridge_cache::{Room, RoomSpaceCache};
use bridge_naming::{normalize, RoomIdentityFactory, RoomType};
use bridge_platform::{ChatPlatform, RoomCreationSpec};
use bridge_topology::ParticipantRef;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Outcome of resolving one participant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedReplica {
    /// The participant's space, children as cached after this step
    pub room: Room,
    /// Whether the space itself was created by this step
    pub created: bool,
    /// Sub-rooms created by this step
    pub sub_rooms_created: usize,
    /// Sub-rooms that failed to provision
    pub sub_room_failures: usize,
    /// Room the next level down is nested under
    pub child_parent_id: String,
}

/// Resolves and provisions the rooms of one participant at a time
#[derive(Clone)]
pub struct ReplicaReconciler {
    platform: Arc<dyn ChatPlatform>,
    rooms: Arc<RoomSpaceCache>,
    factory: RoomIdentityFactory,
    config: ReconcileConfig,
    stats: Arc<Mutex<ProvisioningStats>>,
}

impl std::fmt::Debug for ReplicaReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplicaReconciler")
            .field("factory", &self.factory)
            .field("rooms", &self.rooms.len())
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

impl ReplicaReconciler {
    #[must_use]
    pub fn new(
        platform: Arc<dyn ChatPlatform>,
        rooms: Arc<RoomSpaceCache>,
        factory: RoomIdentityFactory,
        config: ReconcileConfig,
    ) -> Self {
        Self {
            platform,
            rooms,
            factory,
            config,
            stats: Arc::new(Mutex::new(ProvisioningStats::default())),
        }
    }

    /// Counters accumulated so far
    #[must_use]
    pub fn stats(&self) -> ProvisioningStats {
        *self.stats.lock()
    }

    /// Resolve (or create) the space and sub-rooms of one participant
    ///
    /// # Errors
    ///
    /// Fails if the space cannot be resolved or created, or if the sub-room the
    /// next level is nested under cannot be provisioned. Other sub-room
    /// failures are logged and counted in the result.
    pub async fn resolve_or_create(
        &self,
        spec: LevelSpec,
        parent_space_id: Option<&str>,
        known_room: Option<&Room>,
        participant: ParticipantRef<'_>,
    ) -> ReconcileResult<ResolvedReplica> {
        let name = participant.participant_name.to_string();
        if parent_space_id.is_none() && !spec.is_root() {
            return Err(ReconcileError::MissingParent {
                participant: name,
                level: spec.level.to_string(),
            });
        }

        let (room, created) = match known_room {
            Some(room) => (room.clone(), false),
            None => self.find_or_create_space(spec, parent_space_id, participant).await?,
        };

        let mut resolved = ResolvedReplica {
            child_parent_id: room.room_id.clone(),
            room,
            created,
            sub_rooms_created: 0,
            sub_room_failures: 0,
        };

        self.provision_sub_rooms(spec, participant, &mut resolved).await?;

        if let Some(parent_id) = parent_space_id {
            self.link_under_parent(parent_id, &resolved.room.room_id).await;
        }

        if let Some(room) = self.rooms.get(&resolved.room.room_id) {
            resolved.room = room;
        }
        tracing::debug!(
            participant = %name,
            level = %spec.level,
            room_id = %resolved.room.room_id,
            created = resolved.created,
            sub_rooms_created = resolved.sub_rooms_created,
            "Resolved participant space"
        );
        Ok(resolved)
    }

    /// Steps 1 and 2 of resolution when no known room was supplied
    async fn find_or_create_space(
        &self,
        spec: LevelSpec,
        parent_space_id: Option<&str>,
        participant: ParticipantRef<'_>,
    ) -> ReconcileResult<(Room, bool)> {
        let alias = self
            .factory
            .build_alias(&participant.participant_name.to_string(), spec.space_type)?;

        if let Some(room) = self.rooms.get_by_pseudo_alias(&alias) {
            return Ok((room, false));
        }

        if let Some(room) = self.lookup_on_platform(&alias).await? {
            return Ok((room, false));
        }

        let creation = self.creation_spec(participant, spec.space_type)?;
        let owner = self.config.service_account.as_str();
        let result = match parent_space_id {
            Some(parent) => {
                self.platform
                    .create_room_in_space(owner, &creation, parent)
                    .await
            }
            None => self.platform.create_space(owner, &creation).await,
        };
        let room = match result {
            Ok(room) => room,
            Err(e) => {
                self.stats.lock().failures += 1;
                return Err(e.into());
            }
        };

        tracing::info!(
            participant = %participant.participant_name,
            alias = %alias,
            room_id = %room.room_id,
            "Created participant space"
        );
        self.stats.lock().record_created(true);
        self.rooms.upsert(room.clone());
        Ok((room, true))
    }

    /// Platform-side alias lookup; a hit is adopted into the cache
    async fn lookup_on_platform(&self, alias: &str) -> ReconcileResult<Option<Room>> {
        let candidates = self.platform.list_rooms(Some(alias)).await?;
        let found = candidates
            .into_iter()
            .find(|room| room.pseudo_alias().as_deref() == Some(alias));

        if let Some(room) = &found {
            tracing::info!(alias, room_id = %room.room_id, "Adopted existing room from platform");
            self.stats.lock().adopted += 1;
            self.rooms.upsert(room.clone());
        }
        Ok(found)
    }

    async fn provision_sub_rooms(
        &self,
        spec: LevelSpec,
        participant: ParticipantRef<'_>,
        resolved: &mut ResolvedReplica,
    ) -> ReconcileResult<()> {
        let space_id = resolved.room.room_id.clone();
        let mut present = self.existing_sub_rooms(&resolved.room, participant);

        for &room_type in spec.sub_rooms {
            if present.contains_key(&room_type) {
                continue;
            }
            let may_exist = !resolved.created;
            match self
                .provision_sub_room(&space_id, participant, room_type, may_exist)
                .await
            {
                Ok((room_id, created)) => {
                    if created {
                        resolved.sub_rooms_created += 1;
                    }
                    present.insert(room_type, room_id);
                }
                Err(e) => {
                    tracing::error!(
                        participant = %participant.participant_name,
                        room_type = %room_type,
                        error = %e,
                        "Failed to provision sub-room"
                    );
                    self.stats.lock().failures += 1;
                    resolved.sub_room_failures += 1;
                }
            }
        }

        if let Some(container) = spec.child_container {
            resolved.child_parent_id = present.remove(&container).ok_or_else(|| {
                ReconcileError::MissingSubRoom {
                    participant: participant.participant_name.to_string(),
                    room_type: container,
                }
            })?;
        }
        Ok(())
    }

    /// Sub-rooms already nested in `space`, keyed by type
    ///
    /// A child counts only when its alias names this participant.
    fn existing_sub_rooms(
        &self,
        space: &Room,
        participant: ParticipantRef<'_>,
    ) -> HashMap<RoomType, String> {
        let expected_rest = normalize(&participant.participant_name.to_string());
        self.rooms
            .resolve_children(space)
            .contained_rooms
            .into_iter()
            .filter_map(|child| {
                let key = child.pseudo_alias()?;
                let (room_type, rest) = RoomType::classify(&key)?;
                (rest == expected_rest).then(|| (room_type, child.room_id.clone()))
            })
            .collect()
    }

    /// Returns the sub-room id and whether it was created
    ///
    /// A space created in this pass has no children, so lookups are skipped
    /// unless `may_exist`.
    async fn provision_sub_room(
        &self,
        space_id: &str,
        participant: ParticipantRef<'_>,
        room_type: RoomType,
        may_exist: bool,
    ) -> ReconcileResult<(String, bool)> {
        let creation = self.creation_spec(participant, room_type)?;

        if may_exist {
            // Known but not listed under this space: adopt it and link.
            let existing = match self.rooms.get_by_pseudo_alias(&creation.alias) {
                Some(room) => Some(room),
                None => self.lookup_on_platform(&creation.alias).await?,
            };
            if let Some(existing) = existing {
                self.link_under_parent(space_id, &existing.room_id).await;
                return Ok((existing.room_id, false));
            }
        }

        let room = self
            .platform
            .create_room_in_space(&self.config.service_account, &creation, space_id)
            .await?;
        tracing::debug!(
            participant = %participant.participant_name,
            room_type = %room_type,
            room_id = %room.room_id,
            "Created sub-room"
        );
        self.stats.lock().record_created(room.is_space || room_type.is_space());
        let room_id = room.room_id.clone();
        self.rooms.upsert(room);
        self.rooms.link_child(space_id, &room_id);
        Ok((room_id, true))
    }

    /// Link `child_id` under `parent_id` unless the cached parent already lists it
    ///
    /// Link failures are logged; the room itself stays usable.
    async fn link_under_parent(&self, parent_id: &str, child_id: &str) {
        let already_linked = self
            .rooms
            .get(parent_id)
            .is_some_and(|parent| parent.contains_child(child_id));
        if already_linked {
            return;
        }

        match self.platform.add_child_to_space(parent_id, child_id).await {
            Ok(()) => {
                self.rooms.link_child(parent_id, child_id);
                self.stats.lock().child_links += 1;
            }
            Err(e) => {
                tracing::warn!(parent = parent_id, child = child_id, error = %e, "Failed to link child");
                self.stats.lock().failures += 1;
            }
        }
    }

    fn creation_spec(
        &self,
        participant: ParticipantRef<'_>,
        room_type: RoomType,
    ) -> ReconcileResult<RoomCreationSpec> {
        let name = participant.participant_name.to_string();
        let alias = self.factory.build_alias(&name, room_type)?;
        let mut spec = RoomCreationSpec::new(
            self.factory.display_name(participant.display_name, room_type),
            alias,
        )
        .with_topic(self.factory.topic(&name, room_type))
        .with_preset(self.config.room_preset)
        .with_initial_state(self.config.initial_state.clone());
        if room_type.is_space() {
            spec = spec.as_space();
        }
        Ok(spec)
    }
}
