//! Room types and topology levels
//!
//! Every provisioned room belongs to exactly one [`RoomType`]. Each type owns a
//! fixed alias prefix; the four [`TopologyLevel`]s each own a space type and a
//! fixed, ordered set of sub-room types.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// The four levels of the discovered topology tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TopologyLevel {
    /// Top-level deployable component (processing plant)
    Subsystem,
    /// Grouping of work unit processors
    Workshop,
    /// Single processing unit
    WorkUnitProcessor,
    /// Network-facing connection point owned by a WUP
    Endpoint,
}

impl TopologyLevel {
    /// All levels, parent first
    pub const ALL: [TopologyLevel; 4] = [
        TopologyLevel::Subsystem,
        TopologyLevel::Workshop,
        TopologyLevel::WorkUnitProcessor,
        TopologyLevel::Endpoint,
    ];

    /// Room type of the space representing a participant at this level
    #[must_use]
    pub const fn space_type(self) -> RoomType {
        match self {
            TopologyLevel::Subsystem => RoomType::Subsystem,
            TopologyLevel::Workshop => RoomType::Workshop,
            TopologyLevel::WorkUnitProcessor => RoomType::Wup,
            TopologyLevel::Endpoint => RoomType::Endpoint,
        }
    }

    /// Fixed sub-rooms provisioned inside this level's space, in creation order
    #[must_use]
    pub const fn sub_room_types(self) -> &'static [RoomType] {
        match self {
            TopologyLevel::Subsystem => &[
                RoomType::SubsystemConsole,
                RoomType::SubsystemMetrics,
                RoomType::SubsystemSubscriptions,
                RoomType::SubsystemTasks,
                RoomType::SubsystemComponents,
            ],
            TopologyLevel::Workshop => &[],
            TopologyLevel::WorkUnitProcessor => &[
                RoomType::WupConsole,
                RoomType::WupMetrics,
                RoomType::WupSubscriptions,
                RoomType::WupTasks,
            ],
            TopologyLevel::Endpoint => &[
                RoomType::EndpointConsole,
                RoomType::EndpointMetrics,
                RoomType::EndpointTasks,
            ],
        }
    }

    /// Depth in the tree (subsystem = 0)
    #[must_use]
    pub const fn depth(self) -> u8 {
        match self {
            TopologyLevel::Subsystem => 0,
            TopologyLevel::Workshop => 1,
            TopologyLevel::WorkUnitProcessor => 2,
            TopologyLevel::Endpoint => 3,
        }
    }
}

impl Display for TopologyLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let s = match self {
            TopologyLevel::Subsystem => "subsystem",
            TopologyLevel::Workshop => "workshop",
            TopologyLevel::WorkUnitProcessor => "wup",
            TopologyLevel::Endpoint => "endpoint",
        };
        f.write_str(s)
    }
}

/// Room type (closed set)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RoomType {
    Subsystem,
    SubsystemConsole,
    SubsystemMetrics,
    SubsystemSubscriptions,
    SubsystemTasks,
    /// Organizational container for a subsystem's workshops
    SubsystemComponents,
    Workshop,
    Wup,
    WupConsole,
    WupMetrics,
    WupSubscriptions,
    WupTasks,
    Endpoint,
    EndpointConsole,
    EndpointMetrics,
    EndpointTasks,
}

impl RoomType {
    /// Every room type
    pub const ALL: [RoomType; 16] = [
        RoomType::Subsystem,
        RoomType::SubsystemConsole,
        RoomType::SubsystemMetrics,
        RoomType::SubsystemSubscriptions,
        RoomType::SubsystemTasks,
        RoomType::SubsystemComponents,
        RoomType::Workshop,
        RoomType::Wup,
        RoomType::WupConsole,
        RoomType::WupMetrics,
        RoomType::WupSubscriptions,
        RoomType::WupTasks,
        RoomType::Endpoint,
        RoomType::EndpointConsole,
        RoomType::EndpointMetrics,
        RoomType::EndpointTasks,
    ];

    /// Fixed alias prefix (joined to the normalized participant name with `-`)
    #[must_use]
    pub const fn alias_prefix(self) -> &'static str {
        match self {
            RoomType::Subsystem => "subsystem",
            RoomType::SubsystemConsole => "subsystem-console",
            RoomType::SubsystemMetrics => "subsystem-metrics",
            RoomType::SubsystemSubscriptions => "subsystem-subscriptions",
            RoomType::SubsystemTasks => "subsystem-tasks",
            RoomType::SubsystemComponents => "subsystem-components",
            RoomType::Workshop => "workshop",
            RoomType::Wup => "wup",
            RoomType::WupConsole => "wup-console",
            RoomType::WupMetrics => "wup-metrics",
            RoomType::WupSubscriptions => "wup-subscriptions",
            RoomType::WupTasks => "wup-tasks",
            RoomType::Endpoint => "endpoint",
            RoomType::EndpointConsole => "endpoint-console",
            RoomType::EndpointMetrics => "endpoint-metrics",
            RoomType::EndpointTasks => "endpoint-tasks",
        }
    }

    /// Topology level this room type belongs to
    #[must_use]
    pub const fn level(self) -> TopologyLevel {
        match self {
            RoomType::Subsystem
            | RoomType::SubsystemConsole
            | RoomType::SubsystemMetrics
            | RoomType::SubsystemSubscriptions
            | RoomType::SubsystemTasks
            | RoomType::SubsystemComponents => TopologyLevel::Subsystem,
            RoomType::Workshop => TopologyLevel::Workshop,
            RoomType::Wup
            | RoomType::WupConsole
            | RoomType::WupMetrics
            | RoomType::WupSubscriptions
            | RoomType::WupTasks => TopologyLevel::WorkUnitProcessor,
            RoomType::Endpoint
            | RoomType::EndpointConsole
            | RoomType::EndpointMetrics
            | RoomType::EndpointTasks => TopologyLevel::Endpoint,
        }
    }

    /// Whether rooms of this type are spaces (can nest children)
    #[must_use]
    pub const fn is_space(self) -> bool {
        matches!(
            self,
            RoomType::Subsystem
                | RoomType::SubsystemComponents
                | RoomType::Workshop
                | RoomType::Wup
                | RoomType::Endpoint
        )
    }

    /// Human-facing label for the room's purpose
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            RoomType::Subsystem | RoomType::Workshop | RoomType::Wup | RoomType::Endpoint => "",
            RoomType::SubsystemConsole | RoomType::WupConsole | RoomType::EndpointConsole => {
                "Console"
            }
            RoomType::SubsystemMetrics | RoomType::WupMetrics | RoomType::EndpointMetrics => {
                "Metrics"
            }
            RoomType::SubsystemSubscriptions | RoomType::WupSubscriptions => "Subscriptions",
            RoomType::SubsystemTasks | RoomType::WupTasks | RoomType::EndpointTasks => "Tasks",
            RoomType::SubsystemComponents => "Components",
        }
    }

    /// Classify a normalized alias key by its most specific prefix
    ///
    /// Returns the room type together with the remainder of the key (the
    /// normalized participant name). `subsystem-console-x` resolves to
    /// [`RoomType::SubsystemConsole`], not [`RoomType::Subsystem`].
    #[must_use]
    pub fn classify(alias_key: &str) -> Option<(RoomType, &str)> {
        RoomType::ALL
            .iter()
            .filter_map(|rt| {
                alias_key
                    .strip_prefix(rt.alias_prefix())
                    .and_then(|rest| rest.strip_prefix('-'))
                    .filter(|rest| !rest.is_empty())
                    .map(|rest| (*rt, rest))
            })
            .max_by_key(|(rt, _)| rt.alias_prefix().len())
    }

    /// Room type for a normalized alias key
    #[inline]
    #[must_use]
    pub fn from_alias(alias_key: &str) -> Option<RoomType> {
        Self::classify(alias_key).map(|(rt, _)| rt)
    }
}

impl Display for RoomType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.alias_prefix())
    }
}
