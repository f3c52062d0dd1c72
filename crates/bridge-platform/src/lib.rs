//! Bridge Platform
//!
//! Boundaries to the external collaborators of the engine.
//!
//! - [`ChatPlatform`]: administrative room, space and membership calls
//! - [`UserDirectory`]: account listing
//! - [`TimeoutPlatform`]: per-call time budget around any platform
//! - [`InMemoryPlatform`]: complete in-process platform with a call journal

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod error;
mod memory;
mod timeout;
mod traits;
mod types;

pub use error::{PlatformError, PlatformResult};
pub use memory::{InMemoryPlatform, Operation, PlatformCall};
pub use timeout::{TimeoutPlatform, DEFAULT_CALL_TIMEOUT};
pub use traits::{ChatPlatform, UserDirectory};
pub use types::{RoomCreationSpec, RoomPreset, UserAccount};
