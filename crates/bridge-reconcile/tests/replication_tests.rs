//! Functional tests for topology replication.
//!
//! These drive full and delta cycles against the in-memory platform:
//! - A single-branch topology provisions exactly the fixed room set.
//! - Repeated cycles over an unchanged topology create nothing.
//! - Parents are provisioned before their children.
//! - External deletions are folded into the cache.
//! - A failing branch never blocks its siblings.

use async_trait::async_trait;
use bridge_cache::RoomSpaceCache;
use bridge_naming::{RoomIdentityFactory, RoomType};
use bridge_platform::{Operation, PlatformCall, PlatformError};
use bridge_reconcile::{CycleKind, ReconciliationDriver};
use bridge_test_utils::{
    at, name, plant_with_endpoint, scenario_plant, Harness, SCENARIO_ROOM_COUNT, SERVER,
};
use bridge_topology::{
    EndpointType, ProcessingPlantSummary, StaticTopologyFeed, TopologyCache, TopologyError,
    TopologyFeed, TopologyResult, WorkshopSummary,
};
use mockall::mock;
use pretty_assertions::assert_eq;
use std::sync::Arc;

mock! {
    Feed {}

    #[async_trait]
    impl TopologyFeed for Feed {
        async fn current_topology(&self) -> TopologyResult<Vec<ProcessingPlantSummary>>;
    }
}

/// Tenet: one cycle over the single-branch scenario provisions every space and
/// sub-room exactly once, each linked under its parent.
#[tokio::test]
async fn scenario_first_cycle_provisions_full_tree() {
    let h = Harness::scenario();

    let report = h.driver.run_cycle(at(0)).await.unwrap();
    assert_eq!(report.kind, CycleKind::Full);
    assert_eq!(report.subsystems_walked, 1);
    assert_eq!(report.walk.failures, 0);
    assert_eq!(report.walk.created, SCENARIO_ROOM_COUNT);

    assert_eq!(h.platform.create_count(), SCENARIO_ROOM_COUNT);
    assert_eq!(h.platform.count(Operation::CreateSpace), 1);
    assert_eq!(h.platform.room_count(), SCENARIO_ROOM_COUNT);

    let stats = h.driver.stats();
    // subsystem, components, workshop, wup, endpoint
    assert_eq!(stats.spaces_created, 5);
    assert_eq!(stats.rooms_created, 11);

    let children_of = |alias: &str| h.platform.room_by_alias(alias).unwrap();
    let expect_children = |parent: &str, children: &[&str]| {
        let parent_room = children_of(parent);
        assert!(parent_room.is_space, "{parent} should be a space");
        for child in children {
            assert!(
                parent_room.contains_child(&h.room_id(child)),
                "{child} should be linked under {parent}"
            );
        }
        assert_eq!(parent_room.contained_room_ids.len(), children.len(), "{parent}");
    };

    expect_children(
        "subsystem-orga-svcx",
        &[
            "subsystem-console-orga-svcx",
            "subsystem-metrics-orga-svcx",
            "subsystem-subscriptions-orga-svcx",
            "subsystem-tasks-orga-svcx",
            "subsystem-components-orga-svcx",
        ],
    );
    expect_children("subsystem-components-orga-svcx", &["workshop-orga-svcx-wka"]);
    expect_children("workshop-orga-svcx-wka", &["wup-orga-svcx-wka-wupa"]);
    expect_children(
        "wup-orga-svcx-wka-wupa",
        &[
            "wup-console-orga-svcx-wka-wupa",
            "wup-metrics-orga-svcx-wka-wupa",
            "wup-subscriptions-orga-svcx-wka-wupa",
            "wup-tasks-orga-svcx-wka-wupa",
            "endpoint-orga-svcx-wka-wupa-epa",
        ],
    );
    expect_children(
        "endpoint-orga-svcx-wka-wupa-epa",
        &[
            "endpoint-console-orga-svcx-wka-wupa-epa",
            "endpoint-metrics-orga-svcx-wka-wupa-epa",
            "endpoint-tasks-orga-svcx-wka-wupa-epa",
        ],
    );
}

/// Tenet: a second full walk over an unchanged topology and room set makes no
/// create calls.
#[tokio::test]
async fn second_full_cycle_is_idempotent() {
    let h = Harness::scenario();
    h.driver.run_cycle(at(0)).await.unwrap();
    h.platform.clear_calls();

    let report = h.driver.run_cycle(at(700)).await.unwrap();
    assert_eq!(report.kind, CycleKind::Full);
    assert_eq!(report.walk.created, 0);
    assert_eq!(report.walk.resolved, 4);
    assert_eq!(h.platform.create_count(), 0);
    assert_eq!(h.platform.count(Operation::AddChildToSpace), 0);
}

/// Tenet: without new participants and inside the resync interval only the
/// external room list is refreshed.
#[tokio::test]
async fn quiet_cycle_is_delta_only() {
    let h = Harness::scenario();
    h.driver.run_cycle(at(0)).await.unwrap();
    h.platform.clear_calls();

    let report = h.driver.run_cycle(at(30)).await.unwrap();
    assert_eq!(report.kind, CycleKind::Delta);
    assert_eq!(report.subsystems_walked, 0);
    assert_eq!(report.external.total, SCENARIO_ROOM_COUNT);
    assert_eq!(report.external.added, 0);
    assert_eq!(
        h.platform.calls(),
        vec![PlatformCall::ListRooms { alias_filter: None }]
    );
}

/// Tenet: the full walk waits until the resync interval has strictly elapsed.
#[tokio::test]
async fn full_cycle_waits_past_interval() {
    let h = Harness::scenario();
    h.driver.run_cycle(at(0)).await.unwrap();

    let report = h.driver.run_cycle(at(600)).await.unwrap();
    assert_eq!(report.kind, CycleKind::Delta);

    let report = h.driver.run_cycle(at(601)).await.unwrap();
    assert_eq!(report.kind, CycleKind::Full);
    assert_eq!(h.driver.last_full_resync(), Some(at(601)));
}

/// Tenet: newly discovered participants force a full walk before the interval.
#[tokio::test]
async fn new_participants_force_full_cycle() {
    let h = Harness::scenario();
    h.driver.run_cycle(at(0)).await.unwrap();

    h.feed
        .push(plant_with_endpoint("orgB.svcY", EndpointType::MllpClient));
    let report = h.driver.run_cycle(at(30)).await.unwrap();

    assert_eq!(report.kind, CycleKind::Full);
    assert_eq!(report.new_participants, 4);
    assert_eq!(report.walk.created, SCENARIO_ROOM_COUNT);
    assert_eq!(h.platform.room_count(), 2 * SCENARIO_ROOM_COUNT);
}

/// Tenet: no room is created inside a parent that has not been created first.
#[tokio::test]
async fn parents_are_created_before_children() {
    let h = Harness::scenario();
    h.driver.run_cycle(at(0)).await.unwrap();

    let mut created: Vec<String> = Vec::new();
    for call in h.platform.calls() {
        match call {
            PlatformCall::CreateSpace { alias } => created.push(alias),
            PlatformCall::CreateRoomInSpace {
                alias,
                parent_space_id,
                ..
            } => {
                let parent = h.platform.room(&parent_space_id).unwrap();
                let parent_alias = parent.canonical_key().unwrap();
                assert!(
                    created.contains(&parent_alias),
                    "{alias} created before its parent {parent_alias}"
                );
                created.push(alias);
            }
            _ => {}
        }
    }
    assert_eq!(created.len(), SCENARIO_ROOM_COUNT);
}

/// Tenet: a room deleted on the platform disappears from every cache index
/// after one external sync, and the next full walk recreates it.
#[tokio::test]
async fn external_deletion_converges() {
    let h = Harness::scenario();
    h.driver.run_cycle(at(0)).await.unwrap();

    let console_id = h.room_id("subsystem-console-orga-svcx");
    h.platform.remove_room_externally(&console_id).unwrap();

    let sync = h.driver.synchronise_external_into_cache().await.unwrap();
    assert_eq!(sync.removed, 1);
    assert!(h.rooms.get(&console_id).is_none());
    assert!(h.rooms.get_by_pseudo_alias("subsystem-console-orga-svcx").is_none());
    assert!(h
        .rooms
        .get_by_canonical_alias("#subsystem-console-orga-svcx:example.org")
        .is_none());

    h.platform.clear_calls();
    let report = h.driver.run_cycle(at(700)).await.unwrap();
    assert_eq!(report.walk.created, 1);
    assert_eq!(h.platform.create_count(), 1);
    assert_ne!(h.room_id("subsystem-console-orga-svcx"), console_id);
}

/// Tenet: a failing subsystem does not block its sibling, and is provisioned
/// once the platform recovers.
#[tokio::test]
async fn failing_subsystem_is_isolated() {
    let h = Harness::new(vec![
        scenario_plant(),
        plant_with_endpoint("orgB.svcBad", EndpointType::HttpClient),
    ]);
    h.platform.fail_matching(
        Operation::CreateSpace,
        "svcbad",
        PlatformError::Unavailable("503".into()),
    );

    let report = h.driver.run_cycle(at(0)).await.unwrap();
    assert_eq!(report.subsystems_walked, 2);
    assert_eq!(report.walk.failures, 1);
    assert_eq!(h.platform.room_count(), SCENARIO_ROOM_COUNT);
    assert!(h.platform.room_by_alias("subsystem-orga-svcx").is_some());
    assert!(h.platform.room_by_alias("subsystem-orgb-svcbad").is_none());

    h.platform.clear_failures();
    let report = h.driver.run_cycle(at(700)).await.unwrap();
    assert_eq!(report.walk.failures, 0);
    assert_eq!(h.platform.room_count(), 2 * SCENARIO_ROOM_COUNT);
}

/// Tenet: a failing workshop abandons only its own subtree.
#[tokio::test]
async fn failing_workshop_spares_siblings() {
    let plant = scenario_plant().with_workshop(WorkshopSummary::new(
        name("orgA.svcX.wkB"),
        "Workshop B",
        "c-1",
    ));
    let h = Harness::new(vec![plant]);
    h.platform.fail_matching(
        Operation::CreateRoomInSpace,
        "workshop-orga-svcx-wkb",
        PlatformError::Unavailable("503".into()),
    );

    let report = h.driver.run_cycle(at(0)).await.unwrap();
    assert_eq!(report.walk.failures, 1);
    assert_eq!(h.platform.room_count(), SCENARIO_ROOM_COUNT);
    assert!(h.platform.room_by_alias("endpoint-tasks-orga-svcx-wka-wupa-epa").is_some());

    let subsystem = h.topology.participant("orgA.svcX").unwrap();
    assert!(subsystem.last_synchronisation_instant.is_none());
}

/// Tenet: a clean walk stamps every participant as synchronised.
#[tokio::test]
async fn clean_walk_marks_participants_synchronised() {
    let h = Harness::scenario();
    h.driver.run_cycle(at(0)).await.unwrap();

    let endpoint = h.topology.participant("orgA.svcX.wkA.wupA.epA").unwrap();
    assert_eq!(endpoint.last_synchronisation_instant, Some(at(0)));
    assert_eq!(h.driver.last_full_resync(), Some(at(0)));
}

/// Tenet: a restarted engine with empty caches adopts what already exists.
#[tokio::test]
async fn restart_adopts_existing_rooms() {
    let h = Harness::scenario();
    h.driver.run_cycle(at(0)).await.unwrap();
    h.platform.clear_calls();

    let restarted = ReconciliationDriver::new(
        h.platform.clone(),
        Arc::new(StaticTopologyFeed::new(vec![scenario_plant()])),
        Arc::new(RoomSpaceCache::new()),
        Arc::new(TopologyCache::new()),
        RoomIdentityFactory::with_server_name(SERVER),
        h.config.clone(),
    );
    let report = restarted.run_cycle(at(10)).await.unwrap();

    assert_eq!(report.external.added, SCENARIO_ROOM_COUNT);
    assert_eq!(report.walk.created, 0);
    assert_eq!(h.platform.create_count(), 0);
}

/// Tenet: forwarders resolve the room to post into by participant and type.
#[tokio::test]
async fn target_room_resolution() {
    let h = Harness::scenario();
    h.driver.run_cycle(at(0)).await.unwrap();

    let metrics = h
        .driver
        .resolve_target_room("orgA.svcX.wkA.wupA", RoomType::WupMetrics)
        .unwrap();
    assert_eq!(metrics, Some(h.room_id("wup-metrics-orga-svcx-wka-wupa")));

    let unknown = h
        .driver
        .resolve_target_room("orgZ.none", RoomType::SubsystemConsole)
        .unwrap();
    assert_eq!(unknown, None);

    assert!(h.driver.resolve_target_room("  ", RoomType::Subsystem).is_err());
}

/// Tenet: a failing discovery feed keeps the last known topology.
#[tokio::test]
async fn feed_failure_keeps_last_topology() {
    let mut feed = MockFeed::new();
    let mut seq = mockall::Sequence::new();
    feed.expect_current_topology()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|| Ok(vec![scenario_plant()]));
    feed.expect_current_topology()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|| Err(TopologyError::Unavailable("discovery offline".into())));

    let h = Harness::scenario();
    let driver = ReconciliationDriver::new(
        h.platform.clone(),
        Arc::new(feed),
        Arc::new(RoomSpaceCache::new()),
        Arc::new(TopologyCache::new()),
        RoomIdentityFactory::with_server_name(SERVER),
        h.config.clone(),
    );

    let first = driver.run_cycle(at(0)).await.unwrap();
    assert_eq!(first.discovered, Some(1));

    let second = driver.run_cycle(at(700)).await.unwrap();
    assert_eq!(second.discovered, None);
    assert_eq!(second.kind, CycleKind::Full);
    assert_eq!(second.subsystems_walked, 1);
    assert_eq!(second.walk.created, 0);
}

/// Tenet: when the platform cannot list rooms the cycle fails as a whole and
/// creates nothing.
#[tokio::test]
async fn unlistable_platform_fails_cycle() {
    let h = Harness::scenario();
    h.platform
        .fail_next(Operation::ListRooms, 1, PlatformError::Unavailable("503".into()));

    let err = h.driver.run_cycle(at(0)).await.unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(h.platform.create_count(), 0);
    assert_eq!(h.driver.last_full_resync(), None);
}
