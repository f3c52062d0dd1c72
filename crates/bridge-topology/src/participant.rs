//! Participants and fulfillment tracking

use bridge_naming::{ParticipantName, TopologyLevel};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Fulfillment status, a pure function of expected vs actual instance counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FulfillmentStatus {
    /// Fewer instances discovered than expected
    PartiallyFulfilled,
    /// Exactly the expected number discovered
    FullyFulfilled,
    /// More instances discovered than expected
    OverFulfilled,
}

impl FulfillmentStatus {
    /// Derive status from counts
    #[must_use]
    pub fn from_counts(expected: u32, actual: u32) -> Self {
        match expected.cmp(&actual) {
            std::cmp::Ordering::Greater => FulfillmentStatus::PartiallyFulfilled,
            std::cmp::Ordering::Equal => FulfillmentStatus::FullyFulfilled,
            std::cmp::Ordering::Less => FulfillmentStatus::OverFulfilled,
        }
    }
}

/// Expected vs discovered redundant instances
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FulfillmentState {
    pub expected_fulfiller_count: u32,
    fulfillers: BTreeSet<String>,
}

impl FulfillmentState {
    #[must_use]
    pub fn new(expected_fulfiller_count: u32) -> Self {
        Self {
            expected_fulfiller_count,
            fulfillers: BTreeSet::new(),
        }
    }

    /// Number of distinct component ids seen; never decreases
    #[must_use]
    pub fn actual_fulfiller_count(&self) -> u32 {
        u32::try_from(self.fulfillers.len()).unwrap_or(u32::MAX)
    }

    /// Component ids fulfilling this participant
    #[must_use]
    pub fn fulfillers(&self) -> &BTreeSet<String> {
        &self.fulfillers
    }

    /// Record a fulfilling component; returns `true` if it was new
    pub fn record_fulfiller(&mut self, component_id: &str) -> bool {
        self.fulfillers.insert(component_id.to_string())
    }

    #[must_use]
    pub fn status(&self) -> FulfillmentStatus {
        FulfillmentStatus::from_counts(self.expected_fulfiller_count, self.actual_fulfiller_count())
    }
}

/// A named component at one of the four topology levels
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub participant_name: ParticipantName,
    pub display_name: String,
    pub node_type: TopologyLevel,
    pub fulfillment: FulfillmentState,
    /// Last time rooms for this participant were fully reconciled
    pub last_synchronisation_instant: Option<DateTime<Utc>>,
    /// Last time the participant was reported by discovery
    pub last_activity_instant: DateTime<Utc>,
}

impl Participant {
    #[must_use]
    pub fn new(
        participant_name: ParticipantName,
        display_name: impl Into<String>,
        node_type: TopologyLevel,
        expected_fulfiller_count: u32,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            participant_name,
            display_name: display_name.into(),
            node_type,
            fulfillment: FulfillmentState::new(expected_fulfiller_count),
            last_synchronisation_instant: None,
            last_activity_instant: now,
        }
    }

    #[inline]
    #[must_use]
    pub fn fulfillment_status(&self) -> FulfillmentStatus {
        self.fulfillment.status()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn status_from_counts() {
        assert_eq!(FulfillmentStatus::from_counts(2, 0), FulfillmentStatus::PartiallyFulfilled);
        assert_eq!(FulfillmentStatus::from_counts(2, 1), FulfillmentStatus::PartiallyFulfilled);
        assert_eq!(FulfillmentStatus::from_counts(2, 2), FulfillmentStatus::FullyFulfilled);
        assert_eq!(FulfillmentStatus::from_counts(2, 3), FulfillmentStatus::OverFulfilled);
    }

    #[test]
    fn duplicate_fulfiller_not_counted() {
        let mut state = FulfillmentState::new(2);
        assert!(state.record_fulfiller("c-1"));
        assert!(!state.record_fulfiller("c-1"));
        assert_eq!(state.actual_fulfiller_count(), 1);
    }

    proptest! {
        #[test]
        fn prop_fulfillment_is_monotonic(
            expected in 1u32..6,
            ids in proptest::collection::vec(0u8..10, 0..30),
        ) {
            let mut state = FulfillmentState::new(expected);
            let mut previous = 0;
            for id in ids {
                state.record_fulfiller(&format!("c-{id}"));
                let actual = state.actual_fulfiller_count();
                prop_assert!(actual >= previous);
                let full = state.status() == FulfillmentStatus::FullyFulfilled;
                prop_assert_eq!(full, actual == expected);
                previous = actual;
            }
        }
    }
}
