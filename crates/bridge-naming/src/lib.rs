//! Bridge Naming
//!
//! Deterministic identities for the rooms and spaces that mirror a discovered
//! component topology.
//!
//! # Core Concepts
//!
//! - [`ParticipantName`]: dotted hierarchical component name
//! - [`RoomType`]: closed set of room kinds, each with a fixed alias prefix
//! - [`TopologyLevel`]: the four tree levels and their fixed sub-room sets
//! - [`RoomIdentityFactory`]: alias, display name and topic construction
//!
//! # Example
//!
//! ```rust
//! use bridge_naming::{build_alias, RoomType};
//!
//! let alias = build_alias("orgA.svcX", RoomType::SubsystemConsole).unwrap();
//! assert_eq!(alias, "subsystem-console-orga-svcx");
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod error;
mod factory;
mod participant;
mod room_type;

pub use error::NamingError;
pub use factory::{alias_key, build_alias, normalize, RoomIdentityFactory};
pub use participant::ParticipantName;
pub use room_type::{RoomType, TopologyLevel};
