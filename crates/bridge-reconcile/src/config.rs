//! Engine configuration

use bridge_platform::RoomPreset;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

/// Reconciliation settings shared by the driver and membership reconciler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// Account that owns created rooms; never joined by membership passes
    pub service_account: String,
    /// Full topology walk at least this often
    pub full_resync_interval_secs: u64,
    /// Brute-force membership remap interval
    pub membership_remap_interval_secs: u64,
    /// Visibility preset for created rooms
    pub room_preset: RoomPreset,
    /// State events attached to every created room
    pub initial_state: Vec<serde_json::Value>,
}

impl ReconcileConfig {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_service_account(mut self, account: impl Into<String>) -> Self {
        self.service_account = account.into();
        self
    }

    #[must_use]
    pub fn with_full_resync_interval(mut self, secs: u64) -> Self {
        self.full_resync_interval_secs = secs;
        self
    }

    #[must_use]
    pub fn with_membership_remap_interval(mut self, secs: u64) -> Self {
        self.membership_remap_interval_secs = secs;
        self
    }

    #[must_use]
    pub fn with_room_preset(mut self, preset: RoomPreset) -> Self {
        self.room_preset = preset;
        self
    }

    #[inline]
    #[must_use]
    pub fn full_resync_interval(&self) -> Duration {
        Duration::from_secs(self.full_resync_interval_secs)
    }

    #[inline]
    #[must_use]
    pub fn membership_remap_interval(&self) -> Duration {
        Duration::from_secs(self.membership_remap_interval_secs)
    }
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            service_account: "@ops-bridge:localhost".to_string(),
            full_resync_interval_secs: 600,
            membership_remap_interval_secs: 900,
            room_preset: RoomPreset::PrivateChat,
            initial_state: default_initial_state(),
        }
    }
}

/// Guests may not join; history visible to members since creation
fn default_initial_state() -> Vec<serde_json::Value> {
    vec![
        json!({
            "type": "m.room.guest_access",
            "state_key": "",
            "content": { "guest_access": "forbidden" }
        }),
        json!({
            "type": "m.room.history_visibility",
            "state_key": "",
            "content": { "history_visibility": "shared" }
        }),
    ]
}
