//! Bridge Topology
//!
//! Store of the component topology reported by discovery.
//!
//! # Core Concepts
//!
//! - [`ProcessingPlantSummary`] and its children: immutable per-cycle input
//! - [`Participant`]: one named component with fulfillment tracking
//! - [`TopologyCache`]: participants and subsystems, updated in place
//! - [`TopologyFeed`]: async source of summaries, with a static JSON feed

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod cache;
mod error;
mod feed;
mod participant;
mod summary;

pub use cache::{DiscoveryOutcome, TopologyCache};
pub use error::{TopologyError, TopologyResult};
pub use feed::{StaticTopologyFeed, TopologyFeed};
pub use participant::{FulfillmentState, FulfillmentStatus, Participant};
pub use summary::{
    EndpointSummary, EndpointType, ParticipantRef, ProcessingPlantSummary, WorkshopSummary,
    WupSummary,
};
