//! Participant names for addressing topology components
//!
//! Provides [`ParticipantName`] for the dotted, hierarchical names carried by
//! every discovered subsystem, workshop, work unit processor and endpoint.

use crate::error::NamingError;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Hierarchical participant name
///
/// Segments are joined with `.` and keep their original casing; the
/// normalized form is only produced when building aliases.
///
/// # Examples
/// - `["orgA", "svcX"]` → `orgA.svcX`
/// - `["orgA", "svcX", "wkA", "wupA"]` → `orgA.svcX.wkA.wupA`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ParticipantName(Vec<String>);

impl ParticipantName {
    /// Parse and validate a participant name
    ///
    /// # Errors
    /// - `NamingError::InvalidArgument` if the name is empty or blank
    /// - `NamingError::EmptySegment` if it contains `..` or a leading/trailing dot
    /// - `NamingError::InvalidSegment` if a segment contains whitespace
    pub fn parse(name: &str) -> Result<Self, NamingError> {
        name.parse()
    }
}

fn validate_segment(seg: &str) -> Result<String, NamingError> {
    if seg.is_empty() {
        Err(NamingError::EmptySegment)
    } else if seg.contains(char::is_whitespace) {
        Err(NamingError::InvalidSegment(seg.to_string()))
    } else {
        Ok(seg.to_string())
    }
}

impl Display for ParticipantName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

impl FromStr for ParticipantName {
    type Err = NamingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Err(NamingError::InvalidArgument(
                "participant name must not be empty".to_string(),
            ));
        }

        let segments = s
            .split('.')
            .map(validate_segment)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self(segments))
    }
}

impl TryFrom<String> for ParticipantName {
    type Error = NamingError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ParticipantName> for String {
    fn from(name: ParticipantName) -> Self {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(segments: &[&str]) -> ParticipantName {
        ParticipantName(segments.iter().map(ToString::to_string).collect())
    }

    #[test]
    fn parse_dotted_name() {
        let name = ParticipantName::parse("orgA.svcX.wkA").unwrap();
        assert_eq!(name, named(&["orgA", "svcX", "wkA"]));
        assert_eq!(name.to_string(), "orgA.svcX.wkA");
    }

    #[test]
    fn parse_keeps_other_separators() {
        let name = ParticipantName::parse("org_a.svc/x:1").unwrap();
        assert_eq!(name, named(&["org_a", "svc/x:1"]));
    }

    #[test]
    fn parse_rejects_empty() {
        assert!(matches!(
            ParticipantName::parse(""),
            Err(NamingError::InvalidArgument(_))
        ));
        assert!(matches!(
            ParticipantName::parse("   "),
            Err(NamingError::InvalidArgument(_))
        ));
    }

    #[test]
    fn parse_rejects_empty_segment() {
        assert!(matches!(
            ParticipantName::parse("a..b"),
            Err(NamingError::EmptySegment)
        ));
        assert!(matches!(
            ParticipantName::parse(".a"),
            Err(NamingError::EmptySegment)
        ));
    }

    #[test]
    fn parse_rejects_whitespace() {
        assert!(matches!(
            ParticipantName::parse("org a.svc"),
            Err(NamingError::InvalidSegment(_))
        ));
    }

    #[test]
    fn serde_as_string() {
        let name = ParticipantName::parse("orgA.svcX").unwrap();
        let value: String = name.clone().into();
        assert_eq!(value, "orgA.svcX");
        assert_eq!(ParticipantName::try_from(value).unwrap(), name);
    }
}
