//! Error types for reconciliation
//!
//! Errors never escape a cycle: the driver catches them per subsystem,
//! workshop, WUP and endpoint, logs them and moves on to the next branch.

use bridge_naming::{NamingError, RoomType};
use bridge_platform::PlatformError;
use bridge_topology::TopologyError;

/// Reconciliation error
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    /// Participant name could not be turned into an alias
    #[error("naming error: {0}")]
    Naming(#[from] NamingError),

    /// External platform call failed
    #[error("platform call failed: {0}")]
    Platform(#[from] PlatformError),

    /// Discovery feed failed
    #[error("topology feed failed: {0}")]
    Topology(#[from] TopologyError),

    /// Non-root level resolved without a parent space
    #[error("{participant}: no parent space for {level} level")]
    MissingParent { participant: String, level: String },

    /// A sub-room the children depend on could not be provisioned
    #[error("{participant}: required sub-room {room_type} missing")]
    MissingSubRoom {
        participant: String,
        room_type: RoomType,
    },
}

impl ReconcileError {
    /// Whether a later cycle is expected to succeed
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            ReconcileError::Platform(e) => e.is_retryable(),
            ReconcileError::Topology(e) => e.is_retryable(),
            ReconcileError::MissingSubRoom { .. } => true,
            ReconcileError::Naming(_) | ReconcileError::MissingParent { .. } => false,
        }
    }
}

/// Result alias for reconciliation
pub type ReconcileResult<T> = Result<T, ReconcileError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryability_follows_source() {
        let transient = ReconcileError::from(PlatformError::Unavailable("503".into()));
        assert!(transient.is_retryable());

        let permanent = ReconcileError::from(PlatformError::AliasInUse("x".into()));
        assert!(!permanent.is_retryable());

        let naming = ReconcileError::from(NamingError::InvalidArgument("empty".into()));
        assert!(!naming.is_retryable());
    }

    #[test]
    fn missing_sub_room_names_prefix() {
        let err = ReconcileError::MissingSubRoom {
            participant: "orgA.svcX".into(),
            room_type: RoomType::SubsystemComponents,
        };
        assert_eq!(
            err.to_string(),
            "orgA.svcX: required sub-room subsystem-components missing"
        );
    }
}
