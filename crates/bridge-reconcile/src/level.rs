//! Per-level provisioning shape

use bridge_naming::{RoomType, TopologyLevel};

/// What a reconciliation pass provisions for one topology level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelSpec {
    pub level: TopologyLevel,
    /// Type of the space representing the participant
    pub space_type: RoomType,
    /// Sub-rooms created inside the space, in creation order
    pub sub_rooms: &'static [RoomType],
    /// Sub-room that parents the next level down, if not the space itself
    pub child_container: Option<RoomType>,
}

impl LevelSpec {
    pub const SUBSYSTEM: LevelSpec = LevelSpec::for_level(TopologyLevel::Subsystem);
    pub const WORKSHOP: LevelSpec = LevelSpec::for_level(TopologyLevel::Workshop);
    pub const WUP: LevelSpec = LevelSpec::for_level(TopologyLevel::WorkUnitProcessor);
    pub const ENDPOINT: LevelSpec = LevelSpec::for_level(TopologyLevel::Endpoint);

    #[must_use]
    pub const fn for_level(level: TopologyLevel) -> Self {
        let child_container = match level {
            TopologyLevel::Subsystem => Some(RoomType::SubsystemComponents),
            TopologyLevel::Workshop
            | TopologyLevel::WorkUnitProcessor
            | TopologyLevel::Endpoint => None,
        };
        LevelSpec {
            level,
            space_type: level.space_type(),
            sub_rooms: level.sub_room_types(),
            child_container,
        }
    }

    /// Root levels are created as top-level spaces
    #[inline]
    #[must_use]
    pub const fn is_root(&self) -> bool {
        matches!(self.level, TopologyLevel::Subsystem)
    }
}
