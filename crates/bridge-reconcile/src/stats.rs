//! Provisioning counters

use serde::Serialize;

/// Cumulative provisioning counters since start-up
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProvisioningStats {
    /// Level spaces and the components space
    pub spaces_created: u64,
    /// Console, metrics, subscriptions and tasks rooms
    pub rooms_created: u64,
    /// Child links added to a parent space
    pub child_links: u64,
    /// Rooms found on the platform rather than in the cache
    pub adopted: u64,
    /// Failed create or link calls
    pub failures: u64,
}

impl ProvisioningStats {
    /// Spaces plus rooms
    #[inline]
    #[must_use]
    pub fn total_created(&self) -> u64 {
        self.spaces_created + self.rooms_created
    }

    pub(crate) fn record_created(&mut self, is_space: bool) {
        if is_space {
            self.spaces_created += 1;
        } else {
            self.rooms_created += 1;
        }
    }
}
