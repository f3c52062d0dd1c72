//! Room membership reconciliation
//!
//! Keeps every known user joined to every operationally visible room. Runs
//! incrementally (new users, new rooms) each cycle and as a brute-force remap
//! on a slower interval to heal anything the incremental passes missed.

use crate::config::ReconcileConfig;
use crate::error::ReconcileResult;
use bridge_cache::{Room, RoomSnapshot, RoomSpaceCache};
use bridge_naming::{alias_key, RoomType};
use bridge_platform::{ChatPlatform, UserDirectory};
use bridge_topology::TopologyCache;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Result of one membership operation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MembershipOutcome {
    /// Rooms inspected
    pub rooms: usize,
    /// Joins performed
    pub joined: usize,
    /// Users skipped because already present
    pub already_member: usize,
    /// Failed member listings or joins
    pub failures: usize,
}

impl MembershipOutcome {
    fn merge(&mut self, other: MembershipOutcome) {
        self.rooms += other.rooms;
        self.joined += other.joined;
        self.already_member += other.already_member;
        self.failures += other.failures;
    }
}

/// Summary of one [`MembershipReconciler::run_cycle`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MembershipReport {
    pub started_at: DateTime<Utc>,
    pub new_users: usize,
    pub departed_users: usize,
    pub new_rooms: usize,
    pub remapped: bool,
    pub outcome: MembershipOutcome,
}

/// Joins users to eligible rooms
pub struct MembershipReconciler {
    platform: Arc<dyn ChatPlatform>,
    directory: Arc<dyn UserDirectory>,
    rooms: Arc<RoomSpaceCache>,
    topology: Arc<TopologyCache>,
    config: ReconcileConfig,

    /// Users seen by the previous cycle
    known_users: Mutex<BTreeSet<String>>,

    /// Room ids at the end of the previous cycle
    last_snapshot: Mutex<RoomSnapshot>,

    last_remap: Mutex<Option<DateTime<Utc>>>,
}

impl std::fmt::Debug for MembershipReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MembershipReconciler")
            .field("known_users", &self.known_users.lock().len())
            .field("last_remap", &*self.last_remap.lock())
            .finish_non_exhaustive()
    }
}

impl MembershipReconciler {
    #[must_use]
    pub fn new(
        platform: Arc<dyn ChatPlatform>,
        directory: Arc<dyn UserDirectory>,
        rooms: Arc<RoomSpaceCache>,
        topology: Arc<TopologyCache>,
        config: ReconcileConfig,
    ) -> Self {
        Self {
            platform,
            directory,
            rooms,
            topology,
            config,
            known_users: Mutex::new(BTreeSet::new()),
            last_snapshot: Mutex::new(RoomSnapshot::empty()),
            last_remap: Mutex::new(None),
        }
    }

    /// Users known from the last cycle
    #[must_use]
    pub fn known_users(&self) -> Vec<String> {
        self.known_users.lock().iter().cloned().collect()
    }

    /// Whether a room with this alias gets automatic membership
    ///
    /// Subsystem space and its console, metrics, subscriptions and tasks
    /// rooms qualify. Endpoint rooms qualify only for HTTP, MLLP and file
    /// transport endpoints known to the topology cache. The components
    /// space, workshops and WUPs never do.
    #[must_use]
    pub fn eligible_for_auto_join(&self, room_alias: &str) -> bool {
        let key = alias_key(room_alias);
        let Some((room_type, participant)) = RoomType::classify(&key) else {
            return false;
        };
        match room_type {
            RoomType::Subsystem
            | RoomType::SubsystemConsole
            | RoomType::SubsystemMetrics
            | RoomType::SubsystemSubscriptions
            | RoomType::SubsystemTasks => true,
            RoomType::Endpoint
            | RoomType::EndpointConsole
            | RoomType::EndpointMetrics
            | RoomType::EndpointTasks => self
                .topology
                .endpoint_type(participant)
                .is_some_and(|kind| kind.is_operator_visible()),
            RoomType::SubsystemComponents
            | RoomType::Workshop
            | RoomType::Wup
            | RoomType::WupConsole
            | RoomType::WupMetrics
            | RoomType::WupSubscriptions
            | RoomType::WupTasks => false,
        }
    }

    fn eligible<'a>(&self, rooms: impl IntoIterator<Item = &'a Room>) -> Vec<&'a Room> {
        rooms
            .into_iter()
            .filter(|room| {
                room.pseudo_alias()
                    .is_some_and(|alias| self.eligible_for_auto_join(&alias))
            })
            .collect()
    }

    /// Join each of `new_users` to every eligible cached room
    pub async fn add_new_users_to_existing_rooms(&self, new_users: &[String]) -> MembershipOutcome {
        if new_users.is_empty() {
            return MembershipOutcome::default();
        }
        let snapshot = self.rooms.full_snapshot();
        let rooms = self.eligible(&snapshot);
        tracing::debug!(users = new_users.len(), rooms = rooms.len(), "Joining new users");
        self.join_all(new_users, &rooms).await
    }

    /// Join every known user to each eligible room in `new_rooms`
    pub async fn add_all_users_to_new_rooms(&self, new_rooms: &[Room]) -> MembershipOutcome {
        let users = self.known_users();
        let rooms = self.eligible(new_rooms);
        if rooms.is_empty() || users.is_empty() {
            return MembershipOutcome::default();
        }
        tracing::debug!(users = users.len(), rooms = rooms.len(), "Populating new rooms");
        self.join_all(&users, &rooms).await
    }

    /// Join every known user to every eligible room
    pub async fn full_remap(&self) -> MembershipOutcome {
        let users = self.known_users();
        let snapshot = self.rooms.full_snapshot();
        let rooms = self.eligible(&snapshot);
        tracing::info!(users = users.len(), rooms = rooms.len(), "Running full membership remap");
        self.join_all(&users, &rooms).await
    }

    async fn join_all(&self, users: &[String], rooms: &[&Room]) -> MembershipOutcome {
        let mut outcome = MembershipOutcome::default();
        for room in rooms {
            outcome.merge(self.join_room(users, room).await);
        }
        outcome
    }

    async fn join_room(&self, users: &[String], room: &Room) -> MembershipOutcome {
        let mut outcome = MembershipOutcome {
            rooms: 1,
            ..MembershipOutcome::default()
        };

        let members: BTreeSet<String> = match self.platform.list_room_members(&room.room_id).await {
            Ok(members) => members.into_iter().collect(),
            Err(e) => {
                tracing::warn!(room_id = %room.room_id, error = %e, "Failed to list room members");
                outcome.failures += 1;
                return outcome;
            }
        };

        for user in users {
            if *user == self.config.service_account {
                continue;
            }
            if members.contains(user) {
                outcome.already_member += 1;
                continue;
            }
            match self.platform.add_room_member(&room.room_id, user).await {
                Ok(()) => {
                    tracing::debug!(room_id = %room.room_id, user = %user, "Joined user to room");
                    outcome.joined += 1;
                }
                Err(e) => {
                    tracing::warn!(room_id = %room.room_id, user = %user, error = %e, "Failed to join user");
                    outcome.failures += 1;
                }
            }
        }
        outcome
    }

    /// Run one membership cycle
    ///
    /// New rooms (since the previous snapshot) get every previously known
    /// user; new users get every eligible room. A full remap runs once its
    /// interval has elapsed.
    ///
    /// # Errors
    ///
    /// Fails if the user directory cannot be read; no state is changed.
    #[tracing::instrument(skip_all, fields(now = %now))]
    pub async fn run_cycle(&self, now: DateTime<Utc>) -> ReconcileResult<MembershipReport> {
        let accounts = self.directory.list_all_accounts().await?;
        let current: BTreeSet<String> = accounts
            .into_iter()
            .filter(|account| !account.deactivated && account.name != self.config.service_account)
            .map(|account| account.name)
            .collect();

        let (new_users, departed_users) = {
            let known = self.known_users.lock();
            let new: Vec<String> = current.difference(&known).cloned().collect();
            (new, known.difference(&current).count())
        };

        let snapshot = self.rooms.snapshot_ids();
        let new_rooms = {
            let last = self.last_snapshot.lock();
            self.rooms.recently_added_since(&last)
        };

        let mut outcome = self.add_all_users_to_new_rooms(&new_rooms).await;
        outcome.merge(self.add_new_users_to_existing_rooms(&new_users).await);

        *self.known_users.lock() = current;
        *self.last_snapshot.lock() = snapshot;

        let remapped = self.remap_due(now);
        if remapped {
            outcome.merge(self.full_remap().await);
        }

        let report = MembershipReport {
            started_at: now,
            new_users: new_users.len(),
            departed_users,
            new_rooms: new_rooms.len(),
            remapped,
            outcome,
        };
        tracing::info!(
            new_users = report.new_users,
            new_rooms = report.new_rooms,
            joined = report.outcome.joined,
            failures = report.outcome.failures,
            remapped,
            "Membership cycle complete"
        );
        Ok(report)
    }

    /// The first cycle only arms the timer; it already joins everything
    fn remap_due(&self, now: DateTime<Utc>) -> bool {
        let mut last = self.last_remap.lock();
        let due = match *last {
            None => false,
            Some(previous) => (now - previous)
                .to_std()
                .is_ok_and(|elapsed| elapsed > self.config.membership_remap_interval()),
        };
        if due || last.is_none() {
            *last = Some(now);
        }
        due
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_platform::InMemoryPlatform;
    use proptest::prelude::*;

    fn reconciler() -> MembershipReconciler {
        let platform = Arc::new(InMemoryPlatform::new("example.org"));
        MembershipReconciler::new(
            platform.clone(),
            platform,
            Arc::new(RoomSpaceCache::new()),
            Arc::new(TopologyCache::new()),
            ReconcileConfig::default(),
        )
    }

    fn alias(room_type: RoomType, participant: &str) -> String {
        format!("#{}-{participant}:example.org", room_type.alias_prefix())
    }

    proptest! {
        #[test]
        fn eligibility_follows_room_type(
            participant in "org[a-z0-9]{0,5}(\\.[a-z][a-z0-9]{0,6}){0,3}",
        ) {
            let membership = reconciler();
            for room_type in RoomType::ALL {
                let expected = matches!(
                    room_type,
                    RoomType::Subsystem
                        | RoomType::SubsystemConsole
                        | RoomType::SubsystemMetrics
                        | RoomType::SubsystemSubscriptions
                        | RoomType::SubsystemTasks
                );
                prop_assert_eq!(
                    membership.eligible_for_auto_join(&alias(room_type, &participant)),
                    expected,
                    "{}",
                    room_type
                );
            }
        }
    }

    #[test]
    fn foreign_rooms_are_not_eligible() {
        let membership = reconciler();
        assert!(!membership.eligible_for_auto_join("#general:example.org"));
        assert!(!membership.eligible_for_auto_join(""));
    }
}
