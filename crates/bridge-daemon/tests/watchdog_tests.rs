//! Watchdog and supervisor timing under a paused clock.
//!
//! - A tick inside the reset window is skipped while a run is in flight.
//! - A tick after the reset window starts an overlapping run.
//! - A superseded run's completion leaves the newer run's state alone.

use async_trait::async_trait;
use bridge_daemon::{DaemonSchedule, ManagedDaemon, RunState, StartDecision, Supervisor, Watchdog};
use bridge_platform::PlatformError;
use bridge_reconcile::{ReconcileError, ReconcileResult};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{self, Instant};

const RESET: Duration = Duration::from_secs(1800);

/// Tenet: a tick while running inside the reset window is skipped.
#[tokio::test(start_paused = true)]
async fn tick_within_window_is_skipped() {
    let dog = Watchdog::new("topology-sync", RESET);
    assert!(matches!(dog.on_tick(Instant::now()), StartDecision::Start(_)));

    time::advance(Duration::from_secs(1000)).await;
    let decision = dog.on_tick(Instant::now());
    assert_eq!(
        decision,
        StartDecision::Skip {
            running_for: Duration::from_secs(1000)
        }
    );
    assert_eq!(dog.state(), RunState::Running);
    assert_eq!(dog.generation(), 1);
}

/// Tenet: a run older than the reset threshold is overridden.
#[tokio::test(start_paused = true)]
async fn tick_after_window_overrides() {
    let dog = Watchdog::new("topology-sync", RESET);
    dog.on_tick(Instant::now());

    time::advance(RESET).await;
    assert!(matches!(dog.on_tick(Instant::now()), StartDecision::Skip { .. }));

    time::advance(Duration::from_secs(1)).await;
    let decision = dog.on_tick(Instant::now());
    let StartDecision::Override { ticket, stalled_for } = decision else {
        panic!("expected override, got {decision:?}");
    };
    assert_eq!(ticket.generation(), 2);
    assert_eq!(stalled_for, RESET + Duration::from_secs(1));
    assert_eq!(dog.overrides(), 1);
}

/// Tenet: completion of a superseded run does not reset the newer run.
#[tokio::test(start_paused = true)]
async fn superseded_completion_keeps_state() {
    let dog = Watchdog::new("user-sync", RESET);
    let stale = dog.on_tick(Instant::now()).ticket().unwrap();

    time::advance(RESET + Duration::from_secs(60)).await;
    let fresh = dog.on_tick(Instant::now()).ticket().unwrap();

    assert!(!dog.on_complete(stale));
    assert_eq!(dog.state(), RunState::Running);

    time::advance(Duration::from_secs(10)).await;
    assert!(matches!(dog.on_tick(Instant::now()), StartDecision::Skip { .. }));

    assert!(dog.on_complete(fresh));
    assert_eq!(dog.state(), RunState::Idle);
}

#[derive(Default)]
struct CountingDaemon {
    runs: AtomicUsize,
    hang: bool,
    fail: bool,
    panic: bool,
}

#[async_trait]
impl ManagedDaemon for CountingDaemon {
    fn name(&self) -> &str {
        "counting"
    }

    async fn run_once(&self, _now: DateTime<Utc>) -> ReconcileResult<()> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        if self.hang {
            std::future::pending::<()>().await;
        }
        if self.panic {
            panic!("run blew up");
        }
        if self.fail {
            return Err(ReconcileError::Platform(PlatformError::Unavailable(
                "down".into(),
            )));
        }
        Ok(())
    }
}

fn schedule(reset_secs: u64) -> DaemonSchedule {
    DaemonSchedule {
        initial_delay: Duration::from_secs(5),
        period: Duration::from_secs(30),
        reset_threshold: Duration::from_secs(reset_secs),
    }
}

/// Tenet: a finishing daemon runs on every tick, failures included.
#[tokio::test(start_paused = true)]
async fn supervisor_runs_each_tick() {
    let daemon = Arc::new(CountingDaemon {
        fail: true,
        ..CountingDaemon::default()
    });
    let mut supervisor = Supervisor::new();
    let dog = supervisor.spawn(daemon.clone(), schedule(1800));

    // Ticks at 5, 35 and 65 seconds
    time::sleep(Duration::from_secs(66)).await;
    assert_eq!(daemon.runs.load(Ordering::SeqCst), 3);
    assert_eq!(dog.state(), RunState::Idle);
    assert_eq!(dog.generation(), 3);

    supervisor.shutdown().await;
}

/// Tenet: a panicking run still returns the daemon to idle.
#[tokio::test(start_paused = true)]
async fn panicking_run_returns_to_idle() {
    let daemon = Arc::new(CountingDaemon {
        panic: true,
        ..CountingDaemon::default()
    });
    let mut supervisor = Supervisor::new();
    let dog = supervisor.spawn(daemon.clone(), schedule(1800));

    // Ticks at 5, 35, 65 and 95 seconds all run
    time::sleep(Duration::from_secs(100)).await;
    assert_eq!(daemon.runs.load(Ordering::SeqCst), 4);
    assert_eq!(dog.state(), RunState::Idle);
    assert_eq!(dog.generation(), 4);
    assert_eq!(dog.overrides(), 0);

    supervisor.shutdown().await;
}

/// Tenet: a hung run blocks ticks until the reset threshold, then is overridden.
#[tokio::test(start_paused = true)]
async fn supervisor_overrides_hung_run() {
    let daemon = Arc::new(CountingDaemon {
        hang: true,
        ..CountingDaemon::default()
    });
    let mut supervisor = Supervisor::new();
    let dog = supervisor.spawn(daemon.clone(), schedule(100));

    // Start at 5; ticks at 35, 65 and 95 fall inside the window
    time::sleep(Duration::from_secs(96)).await;
    assert_eq!(daemon.runs.load(Ordering::SeqCst), 1);
    assert_eq!(dog.overrides(), 0);

    // Tick at 125 sees a run 120 seconds old
    time::sleep(Duration::from_secs(30)).await;
    assert_eq!(daemon.runs.load(Ordering::SeqCst), 2);
    assert_eq!(dog.overrides(), 1);
    assert_eq!(dog.state(), RunState::Running);

    supervisor.shutdown().await;
}

/// Tenet: shutdown stops the tickers.
#[tokio::test(start_paused = true)]
async fn shutdown_stops_ticking() {
    let daemon = Arc::new(CountingDaemon::default());
    let mut supervisor = Supervisor::new();
    supervisor.spawn(daemon.clone(), schedule(1800));

    time::sleep(Duration::from_secs(6)).await;
    assert_eq!(daemon.runs.load(Ordering::SeqCst), 1);

    supervisor.shutdown().await;
    time::sleep(Duration::from_secs(300)).await;
    assert_eq!(daemon.runs.load(Ordering::SeqCst), 1);
}
