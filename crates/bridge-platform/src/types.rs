//! Request and account types shared across the platform boundary

use serde::{Deserialize, Serialize};

/// Visibility preset applied at creation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomPreset {
    PublicChat,
    #[default]
    PrivateChat,
}

/// Everything the platform needs to create a room or space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomCreationSpec {
    /// Display name
    pub name: String,
    /// Local alias, without `#` sigil or server suffix
    pub alias: String,
    pub topic: String,
    pub preset: RoomPreset,
    pub is_space: bool,
    /// Platform-specific state events, passed through unchanged
    #[serde(default)]
    pub initial_state: Vec<serde_json::Value>,
}

impl RoomCreationSpec {
    #[must_use]
    pub fn new(name: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: alias.into(),
            topic: String::new(),
            preset: RoomPreset::default(),
            is_space: false,
            initial_state: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = topic.into();
        self
    }

    #[must_use]
    pub fn with_preset(mut self, preset: RoomPreset) -> Self {
        self.preset = preset;
        self
    }

    #[must_use]
    pub fn as_space(mut self) -> Self {
        self.is_space = true;
        self
    }

    #[must_use]
    pub fn with_initial_state(mut self, events: Vec<serde_json::Value>) -> Self {
        self.initial_state = events;
        self
    }
}

/// Account reported by the user directory
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserAccount {
    /// Fully qualified user id
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub deactivated: bool,
}

impl UserAccount {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: None,
            deactivated: false,
        }
    }

    #[must_use]
    pub fn deactivated(mut self) -> Self {
        self.deactivated = true;
        self
    }
}
