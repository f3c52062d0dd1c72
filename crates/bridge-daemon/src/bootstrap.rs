//! Wiring of caches, engine components and daemons

use crate::config::BridgeConfig;
use crate::supervisor::{DaemonSchedule, Supervisor, TopologySyncDaemon, UserSyncDaemon};
use bridge_cache::RoomSpaceCache;
use bridge_naming::RoomIdentityFactory;
use bridge_platform::{ChatPlatform, TimeoutPlatform, UserDirectory};
use bridge_reconcile::{MembershipReconciler, PurgeTask, ReconciliationDriver};
use bridge_topology::{TopologyCache, TopologyFeed};
use std::sync::Arc;

/// Every long-lived component of a running bridge
#[derive(Debug)]
pub struct Bridge {
    config: BridgeConfig,
    rooms: Arc<RoomSpaceCache>,
    topology: Arc<TopologyCache>,
    driver: Arc<ReconciliationDriver>,
    membership: Arc<MembershipReconciler>,
    purge: PurgeTask,
}

impl Bridge {
    /// Build the engine around the given collaborators
    ///
    /// Platform calls are bounded by `config.call_timeout_secs`.
    #[must_use]
    pub fn new<P>(
        config: BridgeConfig,
        platform: P,
        directory: Arc<dyn UserDirectory>,
        feed: Arc<dyn TopologyFeed>,
    ) -> Self
    where
        P: ChatPlatform + 'static,
    {
        let platform: Arc<dyn ChatPlatform> =
            Arc::new(TimeoutPlatform::new(platform, config.call_timeout()));
        let rooms = Arc::new(RoomSpaceCache::new());
        let topology = Arc::new(TopologyCache::new());
        let reconcile = config.to_reconcile_config();

        let driver = Arc::new(ReconciliationDriver::new(
            Arc::clone(&platform),
            feed,
            Arc::clone(&rooms),
            Arc::clone(&topology),
            RoomIdentityFactory::with_server_name(config.server_name.clone()),
            reconcile.clone(),
        ));
        let membership = Arc::new(MembershipReconciler::new(
            Arc::clone(&platform),
            directory,
            Arc::clone(&rooms),
            Arc::clone(&topology),
            reconcile,
        ));
        let purge = PurgeTask::new(platform, Arc::clone(&rooms));

        Self {
            config,
            rooms,
            topology,
            driver,
            membership,
            purge,
        }
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &BridgeConfig {
        &self.config
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

    #[inline]
    #[must_use]
    pub fn driver(&self) -> &Arc<ReconciliationDriver> {
        &self.driver
    }

    #[inline]
    #[must_use]
    pub fn membership(&self) -> &Arc<MembershipReconciler> {
        &self.membership
    }

    #[inline]
    #[must_use]
    pub fn purge(&self) -> &PurgeTask {
        &self.purge
    }

    /// Spawn the topology-sync and user-sync daemons
    #[must_use]
    pub fn start(&self) -> Supervisor {
        let mut supervisor = Supervisor::new();
        let reset_threshold = self.config.watchdog_reset();
        let initial_delay = self.config.initial_delay();

        supervisor.spawn(
            Arc::new(TopologySyncDaemon::new(Arc::clone(&self.driver))),
            DaemonSchedule {
                initial_delay,
                period: self.config.topology_sync_period(),
                reset_threshold,
            },
        );
        supervisor.spawn(
            Arc::new(UserSyncDaemon::new(Arc::clone(&self.membership))),
            DaemonSchedule {
                initial_delay,
                period: self.config.user_sync_period(),
                reset_threshold,
            },
        );
        supervisor
    }
}
