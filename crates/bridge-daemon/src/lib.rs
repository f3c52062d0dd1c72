//! Bridge Daemon
//!
//! Runs the reconciliation engine as supervised periodic daemons.
//!
//! # Core Concepts
//!
//! - [`BridgeConfig`]: TOML configuration with validated defaults
//! - [`Watchdog`]: per-daemon run state with stalled-run override
//! - [`Supervisor`]: one ticker task per [`ManagedDaemon`]
//! - [`Bridge`]: caches, engine components and daemons wired together

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod bootstrap;
mod config;
mod supervisor;
mod watchdog;

pub use bootstrap::Bridge;
pub use config::{BridgeConfig, ConfigError};
pub use supervisor::{DaemonSchedule, ManagedDaemon, Supervisor, TopologySyncDaemon, UserSyncDaemon};
pub use watchdog::{
    allowed_transitions, validate_transition, RunState, RunTicket, StartDecision, Watchdog,
    WatchdogError,
};
