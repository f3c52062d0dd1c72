//! Top-level reconciliation driver
//!
//! Each cycle pulls the discovered topology, refreshes the room cache from the
//! platform and, when a full resync is due, walks every subsystem tree parent
//! first through [`ReplicaReconciler`].

use crate::config::ReconcileConfig;
use crate::error::ReconcileResult;
use crate::level::LevelSpec;
use crate::replica::{ReplicaReconciler, ResolvedReplica};
use crate::stats::ProvisioningStats;
use bridge_cache::{Room, RoomSpaceCache};
use bridge_naming::{RoomIdentityFactory, RoomType};
use bridge_platform::ChatPlatform;
use bridge_topology::{ParticipantRef, ProcessingPlantSummary, TopologyCache, TopologyFeed};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;

/// Whether a cycle walked the topology or only refreshed the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleKind {
    Full,
    Delta,
}

/// Changes applied by [`ReconciliationDriver::synchronise_external_into_cache`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExternalSync {
    pub added: usize,
    pub removed: usize,
    pub total: usize,
}

/// Result of walking one subsystem tree
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WalkOutcome {
    /// Participants whose space was resolved
    pub resolved: usize,
    /// Spaces and sub-rooms created
    pub created: usize,
    /// Levels or sub-rooms that failed
    pub failures: usize,
}

impl WalkOutcome {
    fn record(&mut self, replica: &ResolvedReplica) {
        self.resolved += 1;
        self.created += usize::from(replica.created) + replica.sub_rooms_created;
        self.failures += replica.sub_room_failures;
    }

    fn merge(&mut self, other: WalkOutcome) {
        self.resolved += other.resolved;
        self.created += other.created;
        self.failures += other.failures;
    }
}

/// Summary of one [`ReconciliationDriver::run_cycle`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub kind: CycleKind,
    pub started_at: DateTime<Utc>,
    /// Subsystem instances reported by the feed, `None` if the feed failed
    pub discovered: Option<usize>,
    pub new_participants: usize,
    pub external: ExternalSync,
    pub subsystems_walked: usize,
    pub walk: WalkOutcome,
}

/// Drives topology replication cycles
pub struct ReconciliationDriver {
    platform: Arc<dyn ChatPlatform>,
    feed: Arc<dyn TopologyFeed>,
    rooms: Arc<RoomSpaceCache>,
    topology: Arc<TopologyCache>,
    factory: RoomIdentityFactory,
    replica: ReplicaReconciler,
    config: ReconcileConfig,
    last_full_resync: Mutex<Option<DateTime<Utc>>>,
}

impl std::fmt::Debug for ReconciliationDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconciliationDriver")
            .field("replica", &self.replica)
            .field("last_full_resync", &*self.last_full_resync.lock())
            .finish_non_exhaustive()
    }
}

impl ReconciliationDriver {
    #[must_use]
    pub fn new(
        platform: Arc<dyn ChatPlatform>,
        feed: Arc<dyn TopologyFeed>,
        rooms: Arc<RoomSpaceCache>,
        topology: Arc<TopologyCache>,
        factory: RoomIdentityFactory,
        config: ReconcileConfig,
    ) -> Self {
        let replica = ReplicaReconciler::new(
            Arc::clone(&platform),
            Arc::clone(&rooms),
            factory.clone(),
            config.clone(),
        );
        Self {
            platform,
            feed,
            rooms,
            topology,
            factory,
            replica,
            config,
            last_full_resync: Mutex::new(None),
        }
    }

    #[inline]
    #[must_use]
    pub fn rooms(&self) -> &Arc<RoomSpaceCache> {
        &self.rooms
    }

    #[inline]
    #[must_use]
    pub fn topology(&self) -> &Arc<TopologyCache> {
        &self.topology
    }

    /// Provisioning counters since start-up
    #[must_use]
    pub fn stats(&self) -> ProvisioningStats {
        self.replica.stats()
    }

    #[must_use]
    pub fn last_full_resync(&self) -> Option<DateTime<Utc>> {
        *self.last_full_resync.lock()
    }

    /// Run one cycle
    ///
    /// A full walk runs when none has run yet, when the resync interval has
    /// elapsed, or when discovery reported participants not seen before.
    /// Otherwise only the external room list is folded into the cache.
    ///
    /// # Errors
    ///
    /// Fails only if the external room list cannot be fetched. Per-branch
    /// failures are logged and counted in the report.
    #[tracing::instrument(skip_all, fields(now = %now))]
    pub async fn run_cycle(&self, now: DateTime<Utc>) -> ReconcileResult<CycleReport> {
        let discovered = self.discover(now).await;

        let kind = if self.full_resync_due(now) {
            CycleKind::Full
        } else {
            CycleKind::Delta
        };

        let external = self.synchronise_external_into_cache().await?;

        let mut report = CycleReport {
            kind,
            started_at: now,
            discovered,
            new_participants: 0,
            external,
            subsystems_walked: 0,
            walk: WalkOutcome::default(),
        };

        if kind == CycleKind::Full {
            report.new_participants = self.topology.take_newly_discovered().len();
            for summary in self.topology.subsystems() {
                let known = self.known_subsystem_room(&summary);
                let walk = self
                    .create_participant_spaces_and_rooms_if_not_there(&summary, known.as_ref())
                    .await;
                if walk.failures == 0 {
                    self.topology.mark_synchronised(&summary, now);
                }
                report.walk.merge(walk);
                report.subsystems_walked += 1;
            }
            *self.last_full_resync.lock() = Some(now);
        }

        tracing::info!(
            kind = ?report.kind,
            subsystems = report.subsystems_walked,
            created = report.walk.created,
            failures = report.walk.failures,
            external_added = report.external.added,
            external_removed = report.external.removed,
            "Reconciliation cycle complete"
        );
        Ok(report)
    }

    /// Fold the feed into the topology cache; a failing feed keeps the last view
    async fn discover(&self, now: DateTime<Utc>) -> Option<usize> {
        match self.feed.current_topology().await {
            Ok(plants) => {
                let count = plants.len();
                for plant in plants {
                    self.topology.record_discovery(plant, now);
                }
                Some(count)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Topology feed failed, using last known topology");
                None
            }
        }
    }

    fn full_resync_due(&self, now: DateTime<Utc>) -> bool {
        if self.topology.has_newly_discovered() {
            return true;
        }
        match *self.last_full_resync.lock() {
            None => true,
            Some(last) => (now - last)
                .to_std()
                .is_ok_and(|elapsed| elapsed > self.config.full_resync_interval()),
        }
    }

    fn known_subsystem_room(&self, summary: &ProcessingPlantSummary) -> Option<Room> {
        let alias = self
            .factory
            .build_alias(&summary.participant_name.to_string(), RoomType::Subsystem)
            .ok()?;
        self.rooms.get_by_pseudo_alias(&alias)
    }

    /// Make the cache mirror the platform's room list
    ///
    /// Rooms the platform no longer reports are dropped; every reported room
    /// is upserted.
    ///
    /// # Errors
    ///
    /// Fails if the platform cannot list rooms; the cache is left untouched.
    pub async fn synchronise_external_into_cache(&self) -> ReconcileResult<ExternalSync> {
        let external = self.platform.list_rooms(None).await?;
        let external_ids: HashSet<&str> = external.iter().map(|r| r.room_id.as_str()).collect();

        let mut sync = ExternalSync {
            total: external.len(),
            ..ExternalSync::default()
        };

        for cached in self.rooms.full_snapshot() {
            if !external_ids.contains(cached.room_id.as_str()) {
                tracing::info!(room_id = %cached.room_id, "Room deleted externally, dropping from cache");
                self.rooms.delete(&cached.room_id);
                sync.removed += 1;
            }
        }

        for room in external {
            if !self.rooms.contains(&room.room_id) {
                sync.added += 1;
            }
            self.rooms.upsert(room);
        }

        Ok(sync)
    }

    /// Walk one subsystem tree parent first, provisioning whatever is missing
    ///
    /// A failing level abandons only the subtree beneath it.
    pub async fn create_participant_spaces_and_rooms_if_not_there(
        &self,
        summary: &ProcessingPlantSummary,
        known_subsystem_room: Option<&Room>,
    ) -> WalkOutcome {
        let mut outcome = WalkOutcome::default();

        let Some(subsystem) = self
            .resolve_level(
                LevelSpec::SUBSYSTEM,
                None,
                known_subsystem_room,
                summary.as_participant(),
                &mut outcome,
            )
            .await
        else {
            return outcome;
        };

        for workshop in &summary.workshops {
            let Some(workshop_space) = self
                .resolve_level(
                    LevelSpec::WORKSHOP,
                    Some(subsystem.child_parent_id.as_str()),
                    None,
                    workshop.as_participant(),
                    &mut outcome,
                )
                .await
            else {
                continue;
            };

            for wup in &workshop.wups {
                let Some(wup_space) = self
                    .resolve_level(
                        LevelSpec::WUP,
                        Some(workshop_space.child_parent_id.as_str()),
                        None,
                        wup.as_participant(),
                        &mut outcome,
                    )
                    .await
                else {
                    continue;
                };

                for endpoint in &wup.endpoints {
                    self.resolve_level(
                        LevelSpec::ENDPOINT,
                        Some(wup_space.child_parent_id.as_str()),
                        None,
                        endpoint.as_participant(),
                        &mut outcome,
                    )
                    .await;
                }
            }
        }

        outcome
    }

    async fn resolve_level(
        &self,
        spec: LevelSpec,
        parent_space_id: Option<&str>,
        known_room: Option<&Room>,
        participant: ParticipantRef<'_>,
        outcome: &mut WalkOutcome,
    ) -> Option<ResolvedReplica> {
        match self
            .replica
            .resolve_or_create(spec, parent_space_id, known_room, participant)
            .await
        {
            Ok(resolved) => {
                outcome.record(&resolved);
                Some(resolved)
            }
            Err(e) => {
                tracing::error!(
                    participant = %participant.participant_name,
                    level = %spec.level,
                    error = %e,
                    retryable = e.is_retryable(),
                    "Failed to reconcile level, skipping subtree"
                );
                outcome.failures += 1;
                None
            }
        }
    }

    /// Room a forwarder posts into for `participant_name`
    ///
    /// # Errors
    ///
    /// Fails if `participant_name` is blank.
    pub fn resolve_target_room(
        &self,
        participant_name: &str,
        room_type: RoomType,
    ) -> ReconcileResult<Option<String>> {
        let alias = self.factory.build_alias(participant_name, room_type)?;
        Ok(self.rooms.get_by_pseudo_alias(&alias).map(|room| room.room_id))
    }
}
