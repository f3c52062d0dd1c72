//! Run-state watchdog for a periodic daemon
//!
//! A tick while a run is in flight is skipped, unless that run started longer
//! ago than the reset threshold; then the watchdog assumes it hung and lets a
//! new, overlapping run start. The hung run is not cancelled. Each start bumps
//! a generation so a late completion of a superseded run cannot mark the
//! newer run finished.

use parking_lot::Mutex;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

/// Whether a daemon has a run in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunState {
    Idle,
    Running,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WatchdogError {
    #[error("Illegal run state transition: {from:?} -> {to:?}")]
    IllegalTransition { from: RunState, to: RunState },
}

/// Validates a run state transition
///
/// `Running -> Running` is the watchdog override.
///
/// # Errors
///
/// Returns [`WatchdogError::IllegalTransition`] for any pair not in
/// [`allowed_transitions`].
pub fn validate_transition(from: RunState, to: RunState) -> Result<(), WatchdogError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(WatchdogError::IllegalTransition { from, to })
    }
}

#[must_use]
pub fn allowed_transitions(from: RunState) -> Vec<RunState> {
    use RunState::{Idle, Running};
    match from {
        Idle => vec![Running],
        Running => vec![Idle, Running],
    }
}

/// Proof of a permitted start, handed back on completion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunTicket {
    generation: u64,
}

impl RunTicket {
    #[inline]
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// What to do with a timer tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartDecision {
    /// Daemon was idle
    Start(RunTicket),
    /// Previous run exceeded the reset threshold and is superseded
    Override { ticket: RunTicket, stalled_for: Duration },
    /// Previous run is still inside the reset window
    Skip { running_for: Duration },
}

impl StartDecision {
    #[must_use]
    pub fn ticket(&self) -> Option<RunTicket> {
        match self {
            StartDecision::Start(ticket) | StartDecision::Override { ticket, .. } => Some(*ticket),
            StartDecision::Skip { .. } => None,
        }
    }
}

#[derive(Debug)]
struct Inner {
    state: RunState,
    generation: u64,
    started_at: Option<Instant>,
    overrides: u64,
}

/// Per-daemon run state
#[derive(Debug)]
pub struct Watchdog {
    name: String,
    reset_threshold: Duration,
    inner: Mutex<Inner>,
}

impl Watchdog {
    #[must_use]
    pub fn new(name: impl Into<String>, reset_threshold: Duration) -> Self {
        Self {
            name: name.into(),
            reset_threshold,
            inner: Mutex::new(Inner {
                state: RunState::Idle,
                generation: 0,
                started_at: None,
                overrides: 0,
            }),
        }
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn state(&self) -> RunState {
        self.inner.lock().state
    }

    /// Generation of the most recent start
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.inner.lock().generation
    }

    /// Number of times a stalled run was superseded
    #[must_use]
    pub fn overrides(&self) -> u64 {
        self.inner.lock().overrides
    }

    /// Decide whether the tick at `now` starts a run
    pub fn on_tick(&self, now: Instant) -> StartDecision {
        let mut inner = self.inner.lock();
        match inner.state {
            RunState::Idle => {
                let ticket = Self::start(&mut inner, RunState::Running, now);
                StartDecision::Start(ticket)
            }
            RunState::Running => {
                let running_for = inner
                    .started_at
                    .map_or(Duration::ZERO, |started| now.saturating_duration_since(started));
                if running_for > self.reset_threshold {
                    tracing::warn!(
                        daemon = %self.name,
                        stalled_secs = running_for.as_secs(),
                        "Run exceeded reset threshold, starting another"
                    );
                    inner.overrides += 1;
                    let ticket = Self::start(&mut inner, RunState::Running, now);
                    StartDecision::Override {
                        ticket,
                        stalled_for: running_for,
                    }
                } else {
                    tracing::debug!(daemon = %self.name, running_secs = running_for.as_secs(), "Run in flight, skipping tick");
                    StartDecision::Skip { running_for }
                }
            }
        }
    }

    fn start(inner: &mut Inner, to: RunState, now: Instant) -> RunTicket {
        debug_assert!(validate_transition(inner.state, to).is_ok());
        inner.state = to;
        inner.generation += 1;
        inner.started_at = Some(now);
        RunTicket {
            generation: inner.generation,
        }
    }

    /// Record completion of the run holding `ticket`
    ///
    /// Returns `false` when the run was superseded; the state is then left to
    /// the newer run.
    pub fn on_complete(&self, ticket: RunTicket) -> bool {
        let mut inner = self.inner.lock();
        if ticket.generation != inner.generation {
            tracing::debug!(
                daemon = %self.name,
                completed = ticket.generation,
                current = inner.generation,
                "Superseded run completed"
            );
            return false;
        }
        if let Err(e) = validate_transition(inner.state, RunState::Idle) {
            tracing::error!(daemon = %self.name, error = %e, "Unexpected completion");
            return false;
        }
        inner.state = RunState::Idle;
        inner.started_at = None;
        true
    }
}
