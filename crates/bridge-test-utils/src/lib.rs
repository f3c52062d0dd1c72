//! Testing utilities for the ops bridge workspace
//!
//! Shared topology fixtures and a fully wired in-memory harness.

#![allow(missing_docs)]
#![allow(clippy::missing_panics_doc)]

use bridge_cache::RoomSpaceCache;
use bridge_naming::{ParticipantName, RoomIdentityFactory};
use bridge_platform::{InMemoryPlatform, UserAccount};
use bridge_reconcile::{MembershipReconciler, PurgeTask, ReconcileConfig, ReconciliationDriver};
use bridge_topology::{
    EndpointSummary, EndpointType, ProcessingPlantSummary, StaticTopologyFeed, TopologyCache,
    WorkshopSummary, WupSummary,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::Arc;

pub const SERVER: &str = "example.org";
pub const SERVICE_ACCOUNT: &str = "@ops-bridge:example.org";

/// Rooms the single-branch scenario provisions: spaces plus sub-rooms
pub const SCENARIO_ROOM_COUNT: usize = 1 + 1 + 4 + 1 + 1 + 4 + 1 + 3;

pub fn name(s: &str) -> ParticipantName {
    ParticipantName::parse(s).unwrap()
}

pub fn user(local: &str) -> String {
    format!("@{local}:{SERVER}")
}

/// Fixed instant plus `secs`
pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::seconds(secs)
}

/// `orgA.svcX` / `wkA` / `wupA` / `epA`, one endpoint of the given kind
pub fn plant_with_endpoint(subsystem: &str, endpoint_type: EndpointType) -> ProcessingPlantSummary {
    let workshop = format!("{subsystem}.wkA");
    let wup = format!("{workshop}.wupA");
    let endpoint = format!("{wup}.epA");
    ProcessingPlantSummary::new(name(subsystem), format!("{subsystem} plant"), "c-1").with_workshop(
        WorkshopSummary::new(name(&workshop), "Workshop A", "c-1").with_wup(
            WupSummary::new(name(&wup), "WUP A", "c-1").with_endpoint(EndpointSummary::new(
                name(&endpoint),
                "Endpoint A",
                "c-1",
                endpoint_type,
            )),
        ),
    )
}

/// The single-branch scenario topology with an HTTP server endpoint
pub fn scenario_plant() -> ProcessingPlantSummary {
    plant_with_endpoint("orgA.svcX", EndpointType::HttpServer)
}

/// In-memory platform, caches and engine components wired together
pub struct Harness {
    pub platform: Arc<InMemoryPlatform>,
    pub feed: Arc<StaticTopologyFeed>,
    pub rooms: Arc<RoomSpaceCache>,
    pub topology: Arc<TopologyCache>,
    pub config: ReconcileConfig,
    pub driver: ReconciliationDriver,
    pub membership: MembershipReconciler,
}

impl Harness {
    pub fn new(plants: Vec<ProcessingPlantSummary>) -> Self {
        Self::with_config(
            plants,
            ReconcileConfig::default().with_service_account(SERVICE_ACCOUNT),
        )
    }

    pub fn scenario() -> Self {
        Self::new(vec![scenario_plant()])
    }

    pub fn with_config(plants: Vec<ProcessingPlantSummary>, config: ReconcileConfig) -> Self {
        let platform = Arc::new(InMemoryPlatform::new(SERVER));
        let feed = Arc::new(StaticTopologyFeed::new(plants));
        let rooms = Arc::new(RoomSpaceCache::new());
        let topology = Arc::new(TopologyCache::new());

        let driver = ReconciliationDriver::new(
            platform.clone(),
            feed.clone(),
            Arc::clone(&rooms),
            Arc::clone(&topology),
            RoomIdentityFactory::with_server_name(SERVER),
            config.clone(),
        );
        let membership = MembershipReconciler::new(
            platform.clone(),
            platform.clone(),
            Arc::clone(&rooms),
            Arc::clone(&topology),
            config.clone(),
        );

        Self {
            platform,
            feed,
            rooms,
            topology,
            config,
            driver,
            membership,
        }
    }

    pub fn add_user(&self, local: &str) -> String {
        let id = user(local);
        self.platform.add_account(UserAccount::new(id.clone()));
        id
    }

    pub fn purge_task(&self) -> PurgeTask {
        PurgeTask::new(self.platform.clone(), Arc::clone(&self.rooms))
    }

    /// Room id for a local alias, panicking if absent
    pub fn room_id(&self, alias: &str) -> String {
        self.platform
            .room_by_alias(alias)
            .unwrap_or_else(|| panic!("no room with alias {alias}"))
            .room_id
    }
}
