//! Engine collaborators consumed by the structure simulation.
//!
//! The simulation never owns geometry or players. It asks the host engine
//! through [`SpatialIndex`] for traces and box queries and through
//! [`ActorRegistry`] for player state and player mutations. [`World`] is
//! the union of both and is what every entry point receives.

use serde::{Deserialize, Serialize};

use crate::archetype::Archetype;
use crate::faction::Faction;
use crate::math::{Aabb, Vec3};
use crate::structure::StructureId;

/// Identifier of a player-controlled actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActorId(pub u32);

/// Anything a trace or box query can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityRef {
    /// Static world geometry.
    World,
    /// A moving brush (door, platform).
    Mover(u32),
    /// A dead player body.
    Corpse(u32),
    /// A live or dead player.
    Actor(ActorId),
    /// A structure.
    Structure(StructureId),
}

/// Build permission flags of a surface or volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BuildFlags {
    /// Aliens may not build here.
    pub no_alien_build: bool,
    /// Humans may not build here.
    pub no_human_build: bool,
    /// Nobody may build here.
    pub no_build: bool,
}

impl BuildFlags {
    /// Whether these flags forbid `faction` from building.
    #[must_use]
    pub const fn forbids(&self, faction: Faction) -> bool {
        self.no_build
            || match faction {
                Faction::Aliens => self.no_alien_build,
                Faction::Humans => self.no_human_build,
                Faction::None => false,
            }
    }

    /// Union of two flag sets.
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self {
            no_alien_build: self.no_alien_build || other.no_alien_build,
            no_human_build: self.no_human_build || other.no_human_build,
            no_build: self.no_build || other.no_build,
        }
    }
}

/// Result of a swept box trace.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trace {
    /// Fraction of the sweep completed, 1.0 when nothing was hit.
    pub fraction: f32,
    /// Final position of the box.
    pub end_pos: Vec3,
    /// Surface normal of the hit plane.
    pub normal: Vec3,
    /// What was hit, if anything.
    pub entity: Option<EntityRef>,
    /// The start position was inside something.
    pub start_solid: bool,
    /// The whole sweep was inside something.
    pub all_solid: bool,
    /// Build flags of the hit surface.
    pub surface: BuildFlags,
}

impl Trace {
    /// A trace that hit nothing.
    #[must_use]
    pub fn clear(end_pos: Vec3) -> Self {
        Self {
            fraction: 1.0,
            end_pos,
            normal: Vec3::ZERO,
            entity: None,
            start_solid: false,
            all_solid: false,
            surface: BuildFlags::default(),
        }
    }

    /// Whether the trace stopped on something.
    #[must_use]
    pub fn hit(&self) -> bool {
        self.fraction < 1.0 || self.start_solid
    }
}

/// Which contents a trace collides with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceMask {
    /// Everything a player body collides with.
    PlayerSolid,
    /// Everything a bullet collides with.
    Shot,
}

/// Timed and persistent actor states the simulation toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StatusEffect {
    /// Poison boost from a booster.
    Boosted,
    /// Movement penalty on enemy territory.
    CreepSlowed,
    /// Poisoned by a boosted alien.
    Poisoned,
    /// A medkit is healing the actor.
    MedkitActive,
    /// Inside a hovel.
    Sheltered,
}

/// Items the simulation hands out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Item {
    /// Single-use medkit.
    Medkit,
    /// Full ammunition and energy refill.
    FullAmmo,
}

/// Cause of damage dealt by a structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MeansOfDeath {
    /// Overmind attack aura.
    Overmind,
    /// Acid tube spray.
    AcidTube,
    /// Reactor zap.
    Reactor,
    /// Tesla generator zap.
    Tesla,
    /// Machine gun turret bullet.
    MachineGun,
    /// Death blast of a structure.
    Blast(Archetype),
    /// Anti spawn-block kill.
    SpawnBlock,
}

/// Who dealt damage and how.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DamageSource {
    /// Structure responsible for the damage.
    pub structure: Option<StructureId>,
    /// Cause of the damage.
    pub means: MeansOfDeath,
}

/// Read-only view of an actor at the time of a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct ActorSnapshot {
    /// Actor identifier.
    pub id: ActorId,
    /// Player name for the build log.
    pub name: String,
    /// Team.
    pub faction: Faction,
    /// Retribution penalty; any positive value makes the actor hostile to everyone.
    pub penalty: i32,
    /// Position.
    pub origin: Vec3,
    /// Velocity in units per second.
    pub velocity: Vec3,
    /// Acceleration in units per second squared.
    pub acceleration: Vec3,
    /// Rate of change of acceleration.
    pub jerk: Vec3,
    /// Top speed of the actor's class, when the host knows it.
    pub max_speed: Option<f32>,
    /// Local bounding box minimum.
    pub mins: Vec3,
    /// Local bounding box maximum.
    pub maxs: Vec3,
    /// Current health.
    pub health: i32,
    /// Maximum health.
    pub max_health: i32,
    /// Structures ignore this actor.
    pub no_target: bool,
    /// The player is paused and may not be targeted.
    pub paused: bool,
    /// Standing on something.
    pub grounded: bool,
    /// Inside a hovel.
    pub sheltered: bool,
    /// Already hit by a trapper blob.
    pub blob_locked: bool,
    /// Carries poison.
    pub poisoned: bool,
    /// A medkit is running.
    pub medkit_active: bool,
    /// Carries a medkit.
    pub has_medkit: bool,
    /// Playing a builder class.
    pub is_builder: bool,
    /// Trusted builder whose structures are protected.
    pub designated_builder: bool,
    /// View angles.
    pub view_angles: Vec3,
    /// Normal of the surface the actor stands on.
    pub surface_normal: Vec3,
}

impl ActorSnapshot {
    /// Whether the actor is alive.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        self.health > 0
    }

    /// Whether the actor is a spectator.
    #[must_use]
    pub const fn is_spectator(&self) -> bool {
        matches!(self.faction, Faction::None)
    }

    /// Whether structures of `faction` should attack this actor.
    #[must_use]
    pub fn is_hostile_to(&self, faction: Faction) -> bool {
        (self.faction != faction && self.faction != Faction::None) || self.penalty > 0
    }

    /// Absolute bounds.
    #[must_use]
    pub fn bounds(&self) -> Aabb {
        Aabb::at(self.origin, self.mins, self.maxs)
    }
}

/// Geometry and entity queries against the host engine.
pub trait SpatialIndex {
    /// Sweep a box from `start` to `end`.
    fn trace(
        &self,
        start: Vec3,
        mins: Vec3,
        maxs: Vec3,
        end: Vec3,
        skip: Option<EntityRef>,
        mask: TraceMask,
    ) -> Trace;

    /// Build flags of volumes containing `point`.
    fn point_contents(&self, point: Vec3, skip: Option<EntityRef>) -> BuildFlags;

    /// Linked structures and all actors whose bounds touch `bounds`.
    fn entities_in_box(&self, bounds: Aabb) -> Vec<EntityRef>;

    /// Insert or update a structure's collision box.
    fn link(&mut self, id: StructureId, bounds: Aabb, solid: bool);

    /// Remove a structure's collision box.
    fn unlink(&mut self, id: StructureId);

    /// Fire any world triggers overlapping a structure.
    fn touch_triggers(&mut self, id: StructureId, bounds: Aabb);

    /// Remove a corpse.
    fn free_corpse(&mut self, id: u32);
}

/// Access to player state and player mutations.
pub trait ActorRegistry {
    /// Snapshot of one actor.
    fn actor(&self, id: ActorId) -> Option<ActorSnapshot>;

    /// Snapshots of every connected actor in a stable order.
    fn actors(&self) -> Vec<ActorSnapshot>;

    /// Deal damage.
    fn damage_actor(&mut self, id: ActorId, amount: i32, source: DamageSource);

    /// Set a status; timed statuses start at `now`.
    fn apply_status(&mut self, id: ActorId, status: StatusEffect, now: u32);

    /// Clear a status.
    fn clear_status(&mut self, id: ActorId, status: StatusEffect);

    /// Hand over an item.
    fn give_item(&mut self, id: ActorId, item: Item);

    /// Restore health, clamped by the actor's maximum.
    fn heal(&mut self, id: ActorId, amount: i32);

    /// Add to the actor's velocity.
    fn add_velocity(&mut self, id: ActorId, delta: Vec3);

    /// Move the actor and set its view.
    fn teleport(&mut self, id: ActorId, origin: Vec3, angles: Vec3);

    /// Toggle collision with the actor's body.
    fn set_tangible(&mut self, id: ActorId, tangible: bool);

    /// Increase the actor's retribution penalty.
    fn add_penalty(&mut self, id: ActorId, amount: i32);

    /// Reset the retribution penalty.
    fn clear_retribution(&mut self, id: ActorId);
}

/// Everything the simulation needs from the host engine.
pub trait World: SpatialIndex + ActorRegistry {}

impl<T: SpatialIndex + ActorRegistry> World for T {}
