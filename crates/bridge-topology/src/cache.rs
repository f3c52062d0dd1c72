//! Discovered topology cache
//!
//! Holds the latest summary per subsystem plus one [`Participant`] record per
//! participant name at every level. Records are updated in place on each
//! discovery and never removed.

use crate::participant::Participant;
use crate::summary::{EndpointType, ParticipantRef, ProcessingPlantSummary};
use bridge_naming::{normalize, TopologyLevel};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;

/// Result of recording one discovered subsystem
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryOutcome {
    /// Participant names seen for the first time
    pub new_participants: Vec<String>,
    /// Participants that gained a fulfilling component
    pub new_fulfillers: usize,
}

/// Store of discovered subsystems and participants
#[derive(Debug, Default)]
pub struct TopologyCache {
    /// subsystem participant name -> latest summary
    plants: DashMap<String, ProcessingPlantSummary>,

    /// participant name -> participant
    participants: DashMap<String, Participant>,

    /// normalized endpoint name -> transport kind
    endpoint_types: DashMap<String, EndpointType>,

    /// Names discovered since the driver last drained them
    newly_discovered: Mutex<Vec<String>>,
}

impl TopologyCache {
    /// Create empty cache
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a discovered subsystem instance and everything below it
    pub fn record_discovery(
        &self,
        summary: ProcessingPlantSummary,
        now: DateTime<Utc>,
    ) -> DiscoveryOutcome {
        let mut outcome = DiscoveryOutcome::default();

        for participant in summary.participants() {
            let expected = if participant.level == TopologyLevel::Subsystem {
                summary.replication_count
            } else {
                1
            };
            let (is_new, gained) = self.upsert_participant(participant, expected, now);
            if is_new {
                outcome.new_participants.push(participant.participant_name.to_string());
            }
            if gained {
                outcome.new_fulfillers += 1;
            }
        }

        for workshop in &summary.workshops {
            for wup in &workshop.wups {
                for endpoint in &wup.endpoints {
                    self.endpoint_types.insert(
                        normalize(&endpoint.participant_name.to_string()),
                        endpoint.endpoint_type,
                    );
                }
            }
        }

        if !outcome.new_participants.is_empty() {
            tracing::info!(
                subsystem = %summary.participant_name,
                count = outcome.new_participants.len(),
                "Discovered new participants"
            );
            self.newly_discovered
                .lock()
                .extend(outcome.new_participants.iter().cloned());
        }

        self.plants
            .insert(summary.participant_name.to_string(), summary);

        outcome
    }

    fn upsert_participant(
        &self,
        participant: ParticipantRef<'_>,
        expected: u32,
        now: DateTime<Utc>,
    ) -> (bool, bool) {
        let key = participant.participant_name.to_string();
        let mut is_new = false;
        let mut entry = self.participants.entry(key).or_insert_with(|| {
            is_new = true;
            Participant::new(
                participant.participant_name.clone(),
                participant.display_name,
                participant.level,
                expected,
                now,
            )
        });

        let record = entry.value_mut();
        record.fulfillment.expected_fulfiller_count = expected;
        record.display_name = participant.display_name.to_string();
        record.last_activity_instant = now;
        let gained = record.fulfillment.record_fulfiller(participant.component_id);
        (is_new, gained)
    }

    /// Latest summary of every known subsystem, ordered by name
    #[must_use]
    pub fn subsystems(&self) -> Vec<ProcessingPlantSummary> {
        let mut plants: Vec<_> = self.plants.iter().map(|e| e.value().clone()).collect();
        plants.sort_by(|a, b| a.participant_name.cmp(&b.participant_name));
        plants
    }

    /// Latest summary for one subsystem
    #[must_use]
    pub fn subsystem(&self, participant_name: &str) -> Option<ProcessingPlantSummary> {
        self.plants.get(participant_name).map(|e| e.value().clone())
    }

    /// Participant record by name
    #[must_use]
    pub fn participant(&self, participant_name: &str) -> Option<Participant> {
        self.participants
            .get(participant_name)
            .map(|e| e.value().clone())
    }

    /// Number of known participants
    #[inline]
    #[must_use]
    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    /// Whether participants were discovered since the last drain
    #[must_use]
    pub fn has_newly_discovered(&self) -> bool {
        !self.newly_discovered.lock().is_empty()
    }

    /// Drain names discovered since the last call
    pub fn take_newly_discovered(&self) -> Vec<String> {
        std::mem::take(&mut *self.newly_discovered.lock())
    }

    /// Transport kind of an endpoint, looked up by normalized participant name
    #[must_use]
    pub fn endpoint_type(&self, normalized_name: &str) -> Option<EndpointType> {
        self.endpoint_types.get(normalized_name).map(|e| *e.value())
    }

    /// Stamp every participant of a subsystem tree as synchronised
    pub fn mark_synchronised(&self, summary: &ProcessingPlantSummary, now: DateTime<Utc>) {
        for participant in summary.participants() {
            if let Some(mut record) = self
                .participants
                .get_mut(&participant.participant_name.to_string())
            {
                record.last_synchronisation_instant = Some(now);
            }
        }
    }

    /// Participants with no discovery activity within `older_than`
    ///
    /// Report only: stale participants are never removed.
    #[must_use]
    pub fn stale_participants(&self, now: DateTime<Utc>, older_than: Duration) -> Vec<Participant> {
        let cutoff = now - older_than;
        let mut stale: Vec<_> = self
            .participants
            .iter()
            .filter(|e| e.value().last_activity_instant < cutoff)
            .map(|e| e.value().clone())
            .collect();
        stale.sort_by(|a, b| a.participant_name.cmp(&b.participant_name));
        stale
    }
}
