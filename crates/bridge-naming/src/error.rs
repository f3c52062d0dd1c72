//! Error types for room naming

/// Naming errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NamingError {
    /// Argument rejected (e.g. empty participant name)
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Empty segment in a dotted name
    #[error("participant name contains empty segment")]
    EmptySegment,

    /// Segment with forbidden characters
    #[error("invalid segment: {0} (must not contain whitespace or dots)")]
    InvalidSegment(String),
}
