//! Bridge Cache
//!
//! Thread-safe store of the chat rooms and spaces the engine knows about.
//!
//! - [`Room`]: one provisioned room or space
//! - [`RoomSpaceCache`]: rooms indexed by id, canonical alias and pseudo alias
//! - [`RoomSnapshot`]: room-id set for delta detection between cycles

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod cache;
mod room;

pub use cache::{CacheStats, RoomSnapshot, RoomSpaceCache};
pub use room::{canonical_key, Room};
