//! Administrative bulk deletion of provisioned rooms
//!
//! Not part of the steady-state loop. Deletes the deepest levels first so a
//! space is never removed while it still holds provisioned children.

use bridge_cache::{Room, RoomSpaceCache};
use bridge_naming::{alias_key, RoomType};
use bridge_platform::ChatPlatform;
use serde::Serialize;
use std::cmp::Reverse;
use std::sync::Arc;

/// Purge selection and mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurgeOptions {
    /// Alias prefix to match; `None` selects every engine-managed room
    pub prefix: Option<String>,
    /// Plan only, delete nothing
    pub dry_run: bool,
    /// Reason passed to the platform
    pub reason: String,
}

impl Default for PurgeOptions {
    fn default() -> Self {
        Self {
            prefix: None,
            dry_run: true,
            reason: "purged by ops bridge".to_string(),
        }
    }
}

impl PurgeOptions {
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    #[must_use]
    pub fn execute(mut self) -> Self {
        self.dry_run = false;
        self
    }
}

/// What a purge did, by alias
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PurgeReport {
    pub dry_run: bool,
    /// Selected rooms in deletion order
    pub planned: Vec<String>,
    pub deleted: Vec<String>,
    /// Alias and error
    pub failed: Vec<(String, String)>,
    /// Matched the prefix but not recognisably engine-managed
    pub skipped: Vec<String>,
}

/// Deletes provisioned rooms from the platform and the cache
pub struct PurgeTask {
    platform: Arc<dyn ChatPlatform>,
    rooms: Arc<RoomSpaceCache>,
}

impl std::fmt::Debug for PurgeTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PurgeTask")
            .field("rooms", &self.rooms.len())
            .finish_non_exhaustive()
    }
}

impl PurgeTask {
    #[must_use]
    pub fn new(platform: Arc<dyn ChatPlatform>, rooms: Arc<RoomSpaceCache>) -> Self {
        Self { platform, rooms }
    }

    /// Selected rooms in deletion order, plus prefix matches that are skipped
    #[must_use]
    pub fn plan(&self, options: &PurgeOptions) -> (Vec<(String, Room)>, Vec<String>) {
        let prefix = options.prefix.as_deref().map(alias_key);
        let mut selected = Vec::new();
        let mut skipped = Vec::new();

        for room in self.rooms.full_snapshot() {
            let Some(alias) = room.pseudo_alias() else {
                continue;
            };
            if prefix.as_ref().is_some_and(|p| !alias.starts_with(p.as_str())) {
                continue;
            }
            match RoomType::from_alias(&alias) {
                Some(room_type) => selected.push((room_type, alias, room)),
                None if prefix.is_some() => skipped.push(alias),
                None => {}
            }
        }

        // Deepest level first; sub-rooms before the space that holds them
        selected.sort_by(|(a_type, a_alias, _), (b_type, b_alias, _)| {
            let key = |t: &RoomType| (Reverse(t.level().depth()), t.is_space());
            key(a_type).cmp(&key(b_type)).then_with(|| a_alias.cmp(b_alias))
        });
        skipped.sort();

        let ordered = selected
            .into_iter()
            .map(|(_, alias, room)| (alias, room))
            .collect();
        (ordered, skipped)
    }

    /// Run the purge
    pub async fn run(&self, options: &PurgeOptions) -> PurgeReport {
        let (selected, skipped) = self.plan(options);
        let mut report = PurgeReport {
            dry_run: options.dry_run,
            planned: selected.iter().map(|(alias, _)| alias.clone()).collect(),
            skipped,
            ..PurgeReport::default()
        };

        if options.dry_run {
            tracing::info!(planned = report.planned.len(), "Purge dry run");
            return report;
        }

        for (alias, room) in selected {
            match self.platform.delete_room(&room.room_id, &options.reason).await {
                Ok(()) => {
                    self.rooms.delete(&room.room_id);
                    report.deleted.push(alias);
                }
                Err(e) => {
                    tracing::error!(alias = %alias, room_id = %room.room_id, error = %e, "Failed to delete room");
                    report.failed.push((alias, e.to_string()));
                }
            }
        }

        tracing::info!(
            deleted = report.deleted.len(),
            failed = report.failed.len(),
            "Purge complete"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_platform::InMemoryPlatform;

    fn seeded() -> (Arc<InMemoryPlatform>, Arc<RoomSpaceCache>) {
        let platform = Arc::new(InMemoryPlatform::default());
        let rooms = Arc::new(RoomSpaceCache::new());
        for (id, alias, space) in [
            ("!s", "#subsystem-a:localhost", true),
            ("!sc", "#subsystem-console-a:localhost", false),
            ("!w", "#wup-a-w:localhost", true),
            ("!wt", "#wup-tasks-a-w:localhost", false),
            ("!e", "#endpoint-a-w-e:localhost", true),
            ("!x", "#lobby:localhost", false),
        ] {
            let mut room = Room::new(id).with_alias(alias);
            room.is_space = space;
            platform.seed_room(room.clone());
            rooms.upsert(room);
        }
        (platform, rooms)
    }

    #[test]
    fn plan_orders_deepest_first() {
        let (platform, rooms) = seeded();
        let task = PurgeTask::new(platform, rooms);
        let (ordered, skipped) = task.plan(&PurgeOptions::default());
        let aliases: Vec<_> = ordered.into_iter().map(|(alias, _)| alias).collect();
        assert_eq!(
            aliases,
            vec![
                "endpoint-a-w-e",
                "wup-tasks-a-w",
                "wup-a-w",
                "subsystem-console-a",
                "subsystem-a",
            ]
        );
        assert!(skipped.is_empty());
    }

    #[tokio::test]
    async fn dry_run_deletes_nothing() {
        let (platform, rooms) = seeded();
        let task = PurgeTask::new(platform.clone(), Arc::clone(&rooms));
        let report = task.run(&PurgeOptions::default()).await;

        assert!(report.dry_run);
        assert_eq!(report.planned.len(), 5);
        assert!(report.deleted.is_empty());
        assert_eq!(platform.room_count(), 6);
        assert_eq!(rooms.len(), 6);
    }

    #[tokio::test]
    async fn prefix_purge_removes_from_platform_and_cache() {
        let (platform, rooms) = seeded();
        let task = PurgeTask::new(platform.clone(), Arc::clone(&rooms));
        let report = task
            .run(&PurgeOptions::default().with_prefix("wup").execute())
            .await;

        assert_eq!(report.deleted, vec!["wup-tasks-a-w", "wup-a-w"]);
        assert!(report.failed.is_empty());
        assert!(rooms.get("!w").is_none());
        assert!(rooms.get_by_pseudo_alias("wup-tasks-a-w").is_none());
        assert!(platform.room("!wt").is_none());
        assert!(platform.room("!s").is_some());
    }

    #[tokio::test]
    async fn unmanaged_prefix_match_is_skipped() {
        let (platform, rooms) = seeded();
        let task = PurgeTask::new(platform, rooms);
        let report = task.run(&PurgeOptions::default().with_prefix("lob")).await;
        assert!(report.planned.is_empty());
        assert_eq!(report.skipped, vec!["lobby"]);
    }
}
