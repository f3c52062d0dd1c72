//! Error types for topology discovery

use std::path::PathBuf;

/// Topology feed error
#[derive(Debug, thiserror::Error)]
pub enum TopologyError {
    /// Topology file could not be read
    #[error("failed to read topology from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Topology document is malformed
    #[error("malformed topology: {0}")]
    Parse(#[from] serde_json::Error),

    /// Discovery source could not be reached
    #[error("topology feed unavailable: {0}")]
    Unavailable(String),
}

impl TopologyError {
    /// Whether the next cycle may succeed without operator action
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, TopologyError::Unavailable(_))
    }
}

/// Result alias for topology operations
pub type TopologyResult<T> = Result<T, TopologyError>;
