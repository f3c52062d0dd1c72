//! Topology summaries
//!
//! Read-only snapshot of one discovered subsystem and everything below it, as
//! supplied by the discovery feed on each cycle.

use bridge_naming::{ParticipantName, TopologyLevel};
use serde::{Deserialize, Serialize};

/// Endpoint transport kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointType {
    HttpServer,
    HttpClient,
    MllpServer,
    MllpClient,
    FileShareSource,
    FileShareSink,
    #[serde(other)]
    Other,
}

impl EndpointType {
    /// HTTP, MLLP and file-transport endpoints are shown to operators
    #[must_use]
    pub const fn is_operator_visible(self) -> bool {
        !matches!(self, EndpointType::Other)
    }
}

/// Subsystem (processing plant) summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingPlantSummary {
    pub participant_name: ParticipantName,
    pub display_name: String,
    /// Id of the running instance that reported this summary
    pub component_id: String,
    /// Expected number of redundant instances
    #[serde(default = "default_replication_count")]
    pub replication_count: u32,
    #[serde(default)]
    pub workshops: Vec<WorkshopSummary>,
}

fn default_replication_count() -> u32 {
    1
}

/// Workshop summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkshopSummary {
    pub participant_name: ParticipantName,
    pub display_name: String,
    pub component_id: String,
    #[serde(default)]
    pub wups: Vec<WupSummary>,
}

/// Work unit processor summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WupSummary {
    pub participant_name: ParticipantName,
    pub display_name: String,
    pub component_id: String,
    #[serde(default)]
    pub endpoints: Vec<EndpointSummary>,
}

/// Endpoint summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointSummary {
    pub participant_name: ParticipantName,
    pub display_name: String,
    pub component_id: String,
    pub endpoint_type: EndpointType,
}

/// Borrowed view over any summary level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParticipantRef<'a> {
    pub participant_name: &'a ParticipantName,
    pub display_name: &'a str,
    pub component_id: &'a str,
    pub level: TopologyLevel,
}

impl ProcessingPlantSummary {
    /// Create subsystem summary without workshops
    #[must_use]
    pub fn new(
        participant_name: ParticipantName,
        display_name: impl Into<String>,
        component_id: impl Into<String>,
    ) -> Self {
        Self {
            participant_name,
            display_name: display_name.into(),
            component_id: component_id.into(),
            replication_count: 1,
            workshops: Vec::new(),
        }
    }

    /// With expected redundant instance count
    #[must_use]
    pub fn with_replication_count(mut self, count: u32) -> Self {
        self.replication_count = count;
        self
    }

    /// With workshop
    #[must_use]
    pub fn with_workshop(mut self, workshop: WorkshopSummary) -> Self {
        self.workshops.push(workshop);
        self
    }

    /// Borrowed participant view
    #[must_use]
    pub fn as_participant(&self) -> ParticipantRef<'_> {
        ParticipantRef {
            participant_name: &self.participant_name,
            display_name: &self.display_name,
            component_id: &self.component_id,
            level: TopologyLevel::Subsystem,
        }
    }

    /// Every participant in the tree, parent first
    #[must_use]
    pub fn participants(&self) -> Vec<ParticipantRef<'_>> {
        let mut out = vec![self.as_participant()];
        for workshop in &self.workshops {
            out.push(workshop.as_participant());
            for wup in &workshop.wups {
                out.push(wup.as_participant());
                out.extend(wup.endpoints.iter().map(EndpointSummary::as_participant));
            }
        }
        out
    }
}

impl WorkshopSummary {
    #[must_use]
    pub fn new(
        participant_name: ParticipantName,
        display_name: impl Into<String>,
        component_id: impl Into<String>,
    ) -> Self {
        Self {
            participant_name,
            display_name: display_name.into(),
            component_id: component_id.into(),
            wups: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_wup(mut self, wup: WupSummary) -> Self {
        self.wups.push(wup);
        self
    }

    #[must_use]
    pub fn as_participant(&self) -> ParticipantRef<'_> {
        ParticipantRef {
            participant_name: &self.participant_name,
            display_name: &self.display_name,
            component_id: &self.component_id,
            level: TopologyLevel::Workshop,
        }
    }
}

impl WupSummary {
    #[must_use]
    pub fn new(
        participant_name: ParticipantName,
        display_name: impl Into<String>,
        component_id: impl Into<String>,
    ) -> Self {
        Self {
            participant_name,
            display_name: display_name.into(),
            component_id: component_id.into(),
            endpoints: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_endpoint(mut self, endpoint: EndpointSummary) -> Self {
        self.endpoints.push(endpoint);
        self
    }

    #[must_use]
    pub fn as_participant(&self) -> ParticipantRef<'_> {
        ParticipantRef {
            participant_name: &self.participant_name,
            display_name: &self.display_name,
            component_id: &self.component_id,
            level: TopologyLevel::WorkUnitProcessor,
        }
    }
}

impl EndpointSummary {
    #[must_use]
    pub fn new(
        participant_name: ParticipantName,
        display_name: impl Into<String>,
        component_id: impl Into<String>,
        endpoint_type: EndpointType,
    ) -> Self {
        Self {
            participant_name,
            display_name: display_name.into(),
            component_id: component_id.into(),
            endpoint_type,
        }
    }

    #[must_use]
    pub fn as_participant(&self) -> ParticipantRef<'_> {
        ParticipantRef {
            participant_name: &self.participant_name,
            display_name: &self.display_name,
            component_id: &self.component_id,
            level: TopologyLevel::Endpoint,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> ParticipantName {
        ParticipantName::parse(s).unwrap()
    }

    fn plant() -> ProcessingPlantSummary {
        ProcessingPlantSummary::new(name("orgA.svcX"), "Svc X", "c-1").with_workshop(
            WorkshopSummary::new(name("orgA.svcX.wkA"), "Workshop A", "c-2").with_wup(
                WupSummary::new(name("orgA.svcX.wkA.wupA"), "WUP A", "c-3").with_endpoint(
                    EndpointSummary::new(
                        name("orgA.svcX.wkA.wupA.epA"),
                        "Endpoint A",
                        "c-4",
                        EndpointType::HttpServer,
                    ),
                ),
            ),
        )
    }

    #[test]
    fn participants_are_parent_first() {
        let plant = plant();
        let levels: Vec<_> = plant.participants().iter().map(|p| p.level).collect();
        assert_eq!(levels, TopologyLevel::ALL.to_vec());
    }

    #[test]
    fn json_round_trip_with_defaults() {
        let json = r#"{
            "participant_name": "orgA.svcX",
            "display_name": "Svc X",
            "component_id": "c-1",
            "workshops": [{
                "participant_name": "orgA.svcX.wkA",
                "display_name": "Workshop A",
                "component_id": "c-2",
                "wups": [{
                    "participant_name": "orgA.svcX.wkA.wupA",
                    "display_name": "WUP A",
                    "component_id": "c-3",
                    "endpoints": [{
                        "participant_name": "orgA.svcX.wkA.wupA.epA",
                        "display_name": "Endpoint A",
                        "component_id": "c-4",
                        "endpoint_type": "http_server"
                    }]
                }]
            }]
        }"#;
        let parsed: ProcessingPlantSummary = serde_json::from_str(json).unwrap();
        assert_eq!(parsed, plant());
        assert_eq!(parsed.replication_count, 1);
    }

    #[test]
    fn unknown_endpoint_type_maps_to_other() {
        let parsed: EndpointType = serde_json::from_str("\"carrier_pigeon\"").unwrap();
        assert_eq!(parsed, EndpointType::Other);
        assert!(!parsed.is_operator_visible());
        assert!(EndpointType::MllpClient.is_operator_visible());
    }

    #[test]
    fn empty_participant_name_rejected() {
        let json = r#"{"participant_name": "", "display_name": "x", "component_id": "c"}"#;
        assert!(serde_json::from_str::<ProcessingPlantSummary>(json).is_err());
    }
}
