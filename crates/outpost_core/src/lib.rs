//! # Outpost Core
//!
//! Buildable structure simulation for a team-based shooter: the spawn
//! points, turrets, power relays, healing stations and barriers that two
//! factions construct, maintain and lose over a match.
//!
//! This crate contains **only** simulation logic:
//! - No rendering
//! - No file IO (layouts go through [`layout::LayoutStore`])
//! - No physics (traces and entity queries go through [`world::World`])
//! - Randomness only from a seeded RNG owned by the [`simulation::Simulation`]
//!
//! ## Crate Structure
//!
//! - [`archetype`] - Structure kinds and their factions
//! - [`data`] - Attribute tables and server tunables (RON loadable)
//! - [`structure`] - Structure entities and the generational store
//! - [`network`] - Power, network-node, core and territory resolution
//! - [`budget`] - Build-point budget and deconstruction planning
//! - [`placement`] - Placement validation
//! - [`behavior`] - Per-archetype think/pain/die/use behaviors
//! - [`construction`] - Building, deconstruction and revert
//! - [`history`] - Bounded build log
//! - [`layout`] - Layout and exclusion-zone persistence
//! - [`simulation`] - The tick driver and public entry points

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod archetype;
pub mod behavior;
pub mod budget;
pub mod combat;
pub mod construction;
pub mod context;
pub mod data;
pub mod error;
pub mod events;
pub mod faction;
pub mod history;
pub mod layout;
pub mod level;
pub mod math;
pub mod network;
pub mod placement;
pub mod simulation;
pub mod structure;
pub mod world;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::archetype::Archetype;
    pub use crate::data::{ArchetypeTable, BuildConfig, BuildableData};
    pub use crate::error::{Result, SimError};
    pub use crate::events::{BuildableEvent, GlobalAlert, Notice};
    pub use crate::faction::Faction;
    pub use crate::history::{BuildActor, BuildFate, BuildRecord};
    pub use crate::layout::{LayoutChoice, LayoutRecord, LayoutStore};
    pub use crate::level::ExclusionZone;
    pub use crate::math::{Aabb, Vec3};
    pub use crate::placement::{BuildError, BuildWarning, PlacementVerdict};
    pub use crate::simulation::{BuildOutcome, Simulation, TickEvents};
    pub use crate::structure::{Health, Phase, Structure, StructureId};
    pub use crate::world::{ActorId, ActorSnapshot, EntityRef, World};
}
