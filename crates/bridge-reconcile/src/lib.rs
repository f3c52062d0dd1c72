//! Bridge Reconcile
//!
//! The topology replication and reconciliation engine.
//!
//! # Core Concepts
//!
//! - [`ReplicaReconciler`]: resolve-or-create for one participant, any level
//! - [`ReconciliationDriver`]: full and delta cycles over every subsystem
//! - [`MembershipReconciler`]: joins users to operationally visible rooms
//! - [`PurgeTask`]: administrative bulk delete, deepest level first
//!
//! # Failure handling
//!
//! Errors are caught at the finest level that still makes sense (subsystem,
//! workshop, WUP, endpoint, single sub-room), logged through `tracing` and
//! counted in the cycle report. A failed branch is retried on the next cycle.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod config;
mod driver;
mod error;
mod level;
mod membership;
mod purge;
mod replica;
mod stats;

pub use config::ReconcileConfig;
pub use driver::{CycleKind, CycleReport, ExternalSync, ReconciliationDriver, WalkOutcome};
pub use error::{ReconcileError, ReconcileResult};
pub use level::LevelSpec;
pub use membership::{MembershipOutcome, MembershipReconciler, MembershipReport};
pub use purge::{PurgeOptions, PurgeReport, PurgeTask};
pub use replica::{ReplicaReconciler, ResolvedReplica};
pub use stats::ProvisioningStats;
