//! Discovery feed boundary
//!
//! The feed supplies the source-of-truth topology at the start of each
//! reconciliation cycle.

use crate::error::{TopologyError, TopologyResult};
use crate::summary::ProcessingPlantSummary;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::path::Path;

/// Source of discovered subsystem summaries
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TopologyFeed: Send + Sync {
    /// Every subsystem instance currently reported by discovery
    async fn current_topology(&self) -> TopologyResult<Vec<ProcessingPlantSummary>>;
}

/// Feed backed by a fixed, replaceable list of summaries
///
/// Loaded from a JSON array of subsystem summaries; used by the simulate
/// command and by tests.
#[derive(Debug, Default)]
pub struct StaticTopologyFeed {
    plants: RwLock<Vec<ProcessingPlantSummary>>,
}

impl StaticTopologyFeed {
    #[must_use]
    pub fn new(plants: Vec<ProcessingPlantSummary>) -> Self {
        Self {
            plants: RwLock::new(plants),
        }
    }

    /// Parse a JSON array of subsystem summaries
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::Parse`] if the document is not a valid array.
    pub fn from_json_str(json: &str) -> TopologyResult<Self> {
        let plants: Vec<ProcessingPlantSummary> = serde_json::from_str(json)?;
        Ok(Self::new(plants))
    }

    /// Load summaries from a JSON file
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::Io`] if the file cannot be read and
    /// [`TopologyError::Parse`] if it is malformed.
    pub fn from_path(path: impl AsRef<Path>) -> TopologyResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| TopologyError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let feed = Self::from_json_str(&json)?;
        tracing::debug!(path = %path.display(), subsystems = feed.len(), "Loaded static topology");
        Ok(feed)
    }

    /// Replace the reported topology
    pub fn replace(&self, plants: Vec<ProcessingPlantSummary>) {
        *self.plants.write() = plants;
    }

    /// Add one subsystem instance
    pub fn push(&self, plant: ProcessingPlantSummary) {
        self.plants.write().push(plant);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.plants.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plants.read().is_empty()
    }
}

#[async_trait]
impl TopologyFeed for StaticTopologyFeed {
    async fn current_topology(&self) -> TopologyResult<Vec<ProcessingPlantSummary>> {
        Ok(self.plants.read().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const TOPOLOGY: &str = r#"[{
        "participant_name": "orgA.svcX",
        "display_name": "Svc X",
        "component_id": "c-1",
        "replication_count": 2,
        "workshops": []
    }]"#;

    #[tokio::test]
    async fn static_feed_from_json() {
        let feed = StaticTopologyFeed::from_json_str(TOPOLOGY).unwrap();
        let plants = feed.current_topology().await.unwrap();
        assert_eq!(plants.len(), 1);
        assert_eq!(plants[0].replication_count, 2);
    }

    #[tokio::test]
    async fn static_feed_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(TOPOLOGY.as_bytes()).unwrap();

        let feed = StaticTopologyFeed::from_path(file.path()).unwrap();
        assert_eq!(feed.len(), 1);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = StaticTopologyFeed::from_path("/nonexistent/topology.json").unwrap_err();
        assert!(matches!(err, TopologyError::Io { .. }));
        assert!(!err.is_retryable());
    }

    #[test]
    fn malformed_document_is_parse_error() {
        let err = StaticTopologyFeed::from_json_str("{\"not\": \"an array\"}").unwrap_err();
        assert!(matches!(err, TopologyError::Parse(_)));
    }

    #[tokio::test]
    async fn mocked_feed_surfaces_unavailable() {
        let mut feed = MockTopologyFeed::new();
        feed.expect_current_topology()
            .times(1)
            .returning(|| Err(TopologyError::Unavailable("discovery offline".into())));

        let err = feed.current_topology().await.unwrap_err();
        assert!(err.is_retryable());
    }
}
