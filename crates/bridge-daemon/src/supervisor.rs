//! Supervised periodic daemons
//!
//! One ticker task per daemon. Each tick consults the daemon's [`Watchdog`];
//! a permitted run is spawned as its own task so a hung run never blocks the
//! ticker.

use crate::watchdog::{StartDecision, Watchdog};
use async_trait::async_trait;
use bridge_reconcile::{MembershipReconciler, ReconcileResult, ReconciliationDriver};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// A unit of periodic work
#[async_trait]
pub trait ManagedDaemon: Send + Sync + 'static {
    fn name(&self) -> &str;

    /// Run one cycle to completion
    async fn run_once(&self, now: chrono::DateTime<Utc>) -> ReconcileResult<()>;
}

/// Topology replication cycles
#[derive(Debug)]
pub struct TopologySyncDaemon {
    driver: Arc<ReconciliationDriver>,
}

impl TopologySyncDaemon {
    #[must_use]
    pub fn new(driver: Arc<ReconciliationDriver>) -> Self {
        Self { driver }
    }
}

#[async_trait]
impl ManagedDaemon for TopologySyncDaemon {
    fn name(&self) -> &str {
        "topology-sync"
    }

    async fn run_once(&self, now: chrono::DateTime<Utc>) -> ReconcileResult<()> {
        self.driver.run_cycle(now).await.map(|_| ())
    }
}

/// User and membership cycles
#[derive(Debug)]
pub struct UserSyncDaemon {
    membership: Arc<MembershipReconciler>,
}

impl UserSyncDaemon {
    #[must_use]
    pub fn new(membership: Arc<MembershipReconciler>) -> Self {
        Self { membership }
    }
}

#[async_trait]
impl ManagedDaemon for UserSyncDaemon {
    fn name(&self) -> &str {
        "user-sync"
    }

    async fn run_once(&self, now: chrono::DateTime<Utc>) -> ReconcileResult<()> {
        self.membership.run_cycle(now).await.map(|_| ())
    }
}

/// Timer settings for one daemon
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DaemonSchedule {
    pub initial_delay: Duration,
    pub period: Duration,
    pub reset_threshold: Duration,
}

/// Owns the ticker tasks and their shutdown signal
#[derive(Debug)]
pub struct Supervisor {
    shutdown: watch::Sender<bool>,
    tickers: Vec<JoinHandle<()>>,
    watchdogs: Vec<Arc<Watchdog>>,
}

impl Default for Supervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl Supervisor {
    #[must_use]
    pub fn new() -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            shutdown,
            tickers: Vec::new(),
            watchdogs: Vec::new(),
        }
    }

    /// Start ticking `daemon`; must be called inside a tokio runtime
    pub fn spawn(&mut self, daemon: Arc<dyn ManagedDaemon>, schedule: DaemonSchedule) -> Arc<Watchdog> {
        let watchdog = Arc::new(Watchdog::new(daemon.name(), schedule.reset_threshold));
        let shutdown = self.shutdown.subscribe();

        tracing::info!(
            daemon = %daemon.name(),
            period_secs = schedule.period.as_secs(),
            initial_delay_secs = schedule.initial_delay.as_secs(),
            "Starting daemon"
        );

        self.tickers.push(tokio::spawn(tick_loop(
            daemon,
            Arc::clone(&watchdog),
            schedule,
            shutdown,
        )));
        self.watchdogs.push(Arc::clone(&watchdog));
        watchdog
    }

    #[must_use]
    pub fn watchdogs(&self) -> &[Arc<Watchdog>] {
        &self.watchdogs
    }

    /// Stop the tickers; in-flight runs are left to finish on their own
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for ticker in self.tickers {
            if let Err(e) = ticker.await {
                tracing::error!(error = %e, "Ticker task failed");
            }
        }
        tracing::info!("Supervisor stopped");
    }
}

async fn tick_loop(
    daemon: Arc<dyn ManagedDaemon>,
    watchdog: Arc<Watchdog>,
    schedule: DaemonSchedule,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut interval = tokio::time::interval_at(Instant::now() + schedule.initial_delay, schedule.period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
                continue;
            }
        }

        let ticket = match watchdog.on_tick(Instant::now()) {
            StartDecision::Start(ticket) | StartDecision::Override { ticket, .. } => ticket,
            StartDecision::Skip { .. } => continue,
        };

        let daemon = Arc::clone(&daemon);
        let watchdog = Arc::clone(&watchdog);
        tokio::spawn(async move {
            let run = {
                let daemon = Arc::clone(&daemon);
                tokio::spawn(async move { daemon.run_once(Utc::now()).await })
            };
            // A panicking run still completes
            match run.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::error!(
                    daemon = %daemon.name(),
                    error = %e,
                    retryable = e.is_retryable(),
                    "Daemon run failed"
                ),
                Err(e) => tracing::error!(daemon = %daemon.name(), error = %e, "Daemon run panicked"),
            }
            watchdog.on_complete(ticket);
        });
    }

    tracing::debug!(daemon = %daemon.name(), "Ticker stopped");
}
