//! Room identity factory
//!
//! Pure functions mapping a participant name and a room type to the alias,
//! display name and topic of the room that mirrors it.

use crate::error::NamingError;
use crate::room_type::RoomType;

/// Flatten separators and lower-case
///
/// `.`, `_`, `/` and `:` all become `-`, so `"Org.Sub_A"` and `"org-sub-a"`
/// produce the same key.
#[must_use]
pub fn normalize(value: &str) -> String {
    value
        .trim()
        .chars()
        .map(|c| match c {
            '.' | '_' | '/' | ':' => '-',
            other => other.to_ascii_lowercase(),
        })
        .collect()
}

/// Cache key for an alias as reported by the platform
///
/// Strips a leading `#` sigil and a trailing `:server` suffix before
/// normalizing. Engine-built aliases never contain `:` once normalized, so the
/// first colon always starts the server part.
#[must_use]
pub fn alias_key(raw: &str) -> String {
    let trimmed = raw.trim();
    let without_sigil = trimmed.strip_prefix('#').unwrap_or(trimmed);
    let localpart = match without_sigil.split_once(':') {
        Some((local, _server)) => local,
        None => without_sigil,
    };
    normalize(localpart)
}

/// Builds deterministic identities for mirrored rooms
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoomIdentityFactory {
    server_name: Option<String>,
}

impl RoomIdentityFactory {
    /// Create factory without a server name
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create factory producing fully-qualified aliases for `server_name`
    #[inline]
    #[must_use]
    pub fn with_server_name(server_name: impl Into<String>) -> Self {
        Self {
            server_name: Some(server_name.into()),
        }
    }

    /// Configured server name
    #[inline]
    #[must_use]
    pub fn server_name(&self) -> Option<&str> {
        self.server_name.as_deref()
    }

    /// Build the pseudo alias for a participant room
    ///
    /// # Errors
    /// `NamingError::InvalidArgument` if `participant_name` is empty or blank
    pub fn build_alias(
        &self,
        participant_name: &str,
        room_type: RoomType,
    ) -> Result<String, NamingError> {
        build_alias(participant_name, room_type)
    }

    /// Build the platform-facing canonical alias (`#alias:server`)
    ///
    /// Without a server name the sigil-prefixed alias is returned as-is.
    ///
    /// # Errors
    /// `NamingError::InvalidArgument` if `participant_name` is empty or blank
    pub fn canonical_alias(
        &self,
        participant_name: &str,
        room_type: RoomType,
    ) -> Result<String, NamingError> {
        let alias = build_alias(participant_name, room_type)?;
        Ok(match &self.server_name {
            Some(server) => format!("#{alias}:{server}"),
            None => format!("#{alias}"),
        })
    }

    /// Display name shown in the chat client
    #[must_use]
    pub fn display_name(&self, participant_display_name: &str, room_type: RoomType) -> String {
        let label = room_type.label();
        if label.is_empty() {
            participant_display_name.to_string()
        } else {
            format!("{participant_display_name} {label}")
        }
    }

    /// Room topic
    #[must_use]
    pub fn topic(&self, participant_name: &str, room_type: RoomType) -> String {
        match room_type {
            RoomType::Subsystem => format!("Subsystem {participant_name}"),
            RoomType::SubsystemComponents => format!("Components of {participant_name}"),
            RoomType::Workshop => format!("Workshop {participant_name}"),
            RoomType::Wup => format!("Work unit processor {participant_name}"),
            RoomType::Endpoint => format!("Endpoint {participant_name}"),
            other => format!(
                "{} for {participant_name}",
                other.label().to_ascii_lowercase()
            ),
        }
    }
}

/// Build the pseudo alias for a participant room
///
/// # Errors
/// `NamingError::InvalidArgument` if `participant_name` is empty or blank
pub fn build_alias(participant_name: &str, room_type: RoomType) -> Result<String, NamingError> {
    if participant_name.trim().is_empty() {
        return Err(NamingError::InvalidArgument(
            "participant name must not be empty".to_string(),
        ));
    }
    Ok(format!(
        "{}-{}",
        room_type.alias_prefix(),
        normalize(participant_name)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn build_alias_flattens_separators() {
        let alias = build_alias("orgA.svcX", RoomType::SubsystemConsole).unwrap();
        assert_eq!(alias, "subsystem-console-orga-svcx");

        let alias = build_alias("Org.Sub_A/b:c", RoomType::Wup).unwrap();
        assert_eq!(alias, "wup-org-sub-a-b-c");
    }

    #[test]
    fn build_alias_rejects_empty() {
        assert!(matches!(
            build_alias("", RoomType::Subsystem),
            Err(NamingError::InvalidArgument(_))
        ));
        assert!(build_alias("  ", RoomType::Endpoint).is_err());
    }

    #[test]
    fn normalization_equivalence() {
        assert_eq!(normalize("Org.Sub_A"), normalize("org-sub-a"));
    }

    #[test]
    fn alias_key_strips_sigil_and_server() {
        assert_eq!(
            alias_key("#subsystem-orga-svcx:chat.example.org"),
            "subsystem-orga-svcx"
        );
        assert_eq!(alias_key("#Subsystem-OrgA"), "subsystem-orga");
        assert_eq!(alias_key("subsystem-orga"), "subsystem-orga");
    }

    #[test]
    fn canonical_alias_with_server() {
        let factory = RoomIdentityFactory::with_server_name("chat.example.org");
        let alias = factory
            .canonical_alias("orgA.svcX", RoomType::Subsystem)
            .unwrap();
        assert_eq!(alias, "#subsystem-orga-svcx:chat.example.org");
        assert_eq!(alias_key(&alias), "subsystem-orga-svcx");

        let bare = RoomIdentityFactory::new()
            .canonical_alias("orgA", RoomType::Workshop)
            .unwrap();
        assert_eq!(bare, "#workshop-orga");
    }

    #[test]
    fn display_names_and_topics() {
        let factory = RoomIdentityFactory::new();
        assert_eq!(factory.display_name("Svc X", RoomType::Subsystem), "Svc X");
        assert_eq!(
            factory.display_name("Svc X", RoomType::SubsystemMetrics),
            "Svc X Metrics"
        );
        assert_eq!(
            factory.topic("orgA.svcX", RoomType::WupTasks),
            "tasks for orgA.svcX"
        );
    }

    fn name_strategy() -> impl Strategy<Value = String> {
        "[A-Za-z][A-Za-z0-9_/:]{0,8}(\\.[A-Za-z0-9_/:]{1,8}){0,3}"
    }

    proptest! {
        #[test]
        fn prop_build_alias_is_deterministic(name in name_strategy(), idx in 0usize..16) {
            let rt = RoomType::ALL[idx];
            let a = build_alias(&name, rt).unwrap();
            let b = build_alias(&name, rt).unwrap();
            prop_assert_eq!(a, b);
        }

        #[test]
        fn prop_alias_survives_normalization(name in name_strategy(), idx in 0usize..16) {
            let rt = RoomType::ALL[idx];
            let alias = build_alias(&name, rt).unwrap();
            prop_assert_eq!(normalize(&alias), alias.clone());
            prop_assert_eq!(alias_key(&format!("#{alias}:server.test")), alias.clone());
            prop_assert_eq!(build_alias(&name.to_uppercase(), rt).unwrap(), alias);
        }

        #[test]
        fn prop_alias_classifies_to_its_type(name in name_strategy(), idx in 0usize..16) {
            let rt = RoomType::ALL[idx];
            let alias = build_alias(&name, rt).unwrap();
            let (classified, rest) = RoomType::classify(&alias).unwrap();
            // A name may itself start with a sub-room label, in which case the
            // more specific type wins; the full alias still round-trips.
            prop_assert_eq!(format!("{}-{}", classified.alias_prefix(), rest), alias);
        }
    }
}
