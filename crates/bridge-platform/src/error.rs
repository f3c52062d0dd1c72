//! Platform error taxonomy

/// Error returned by chat-platform and user-directory calls
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlatformError {
    /// Call exceeded its time budget
    #[error("{operation} timed out after {timeout_secs}s")]
    Timeout {
        operation: &'static str,
        timeout_secs: u64,
    },

    /// Referenced room does not exist
    #[error("room not found: {0}")]
    RoomNotFound(String),

    /// Alias already bound to another room
    #[error("alias already in use: {0}")]
    AliasInUse(String),

    /// Platform refused the request
    #[error("{operation} rejected: {reason}")]
    Rejected { operation: String, reason: String },

    /// Platform could not be reached
    #[error("platform unavailable: {0}")]
    Unavailable(String),
}

impl PlatformError {
    /// Transport-level failures are retried on the next cycle
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PlatformError::Timeout { .. } | PlatformError::Unavailable(_)
        )
    }
}

/// Result alias for platform calls
pub type PlatformResult<T> = Result<T, PlatformError>;
