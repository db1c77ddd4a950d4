//! Structure entities and their generational store.

use serde::{Deserialize, Serialize};
use slotmap::{new_key_type, SlotMap};

use crate::archetype::Archetype;
use crate::faction::Faction;
use crate::math::{Aabb, Vec3};
use crate::world::ActorId;

new_key_type! {
    /// Generational handle of a structure. Stale handles never alias a newer structure.
    pub struct StructureId;
}

/// Health bounded by the archetype maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Health {
    /// Current health points.
    pub current: i32,
    /// Maximum health points.
    pub max: i32,
}

impl Health {
    /// Full health.
    #[must_use]
    pub const fn new(max: i32) -> Self {
        Self { current: max, max }
    }

    /// Health starting at `current`, clamped to `[0, max]`.
    #[must_use]
    pub fn with_current(current: i32, max: i32) -> Self {
        Self {
            current: current.clamp(0, max),
            max,
        }
    }

    /// Check if the structure is dead.
    #[must_use]
    pub const fn is_dead(&self) -> bool {
        self.current <= 0
    }

    /// Check if at full health.
    #[must_use]
    pub const fn is_full(&self) -> bool {
        self.current >= self.max
    }

    /// Apply damage, returning the damage actually dealt.
    pub fn apply_damage(&mut self, amount: i32) -> i32 {
        let actual = amount.clamp(0, self.current);
        self.current -= actual;
        actual
    }

    /// Heal, returning the amount actually restored.
    pub fn heal(&mut self, amount: i32) -> i32 {
        let actual = amount.clamp(0, self.max - self.current);
        self.current += actual;
        actual
    }
}

/// Lifecycle phase. Selects which think runs when `next_think` comes due.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Archetype steady-state behavior.
    Operating,
    /// Rebuilt by a revert, waiting for its volume to clear.
    Reverting,
    /// Dead, counting down to the death blast.
    AwaitingBlast,
    /// Blasted and melting, dealing selective damage while it shrinks.
    Melting,
    /// Blasted and receding without damage.
    Receding,
    /// About to be removed.
    Vanishing,
}

impl Phase {
    /// Whether the die transition has already happened.
    #[must_use]
    pub const fn is_dying(&self) -> bool {
        !matches!(self, Self::Operating | Self::Reverting)
    }
}

/// A placed structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct Structure {
    /// Own handle.
    pub id: StructureId,
    /// Kind of structure.
    pub archetype: Archetype,
    /// Position.
    pub origin: Vec3,
    /// Orientation.
    pub angles: Vec3,
    /// Normal of the surface it stands on.
    pub normal: Vec3,
    /// Turret aim, or a copy of the yaw for non-turrets.
    pub turret_angles: Vec3,
    /// Current local bounding box minimum.
    pub mins: Vec3,
    /// Current local bounding box maximum.
    pub maxs: Vec3,
    /// Health.
    pub health: Health,
    /// Health at the previous attack check.
    pub last_health: i32,
    /// Finished building.
    pub spawned: bool,
    /// Time construction started.
    pub build_time: u32,
    /// Lifecycle phase.
    pub phase: Phase,
    /// When the phase think next runs.
    pub next_think: Option<u32>,
    /// Powered (humans) or connected to the core (aliens).
    pub powered: bool,
    /// A network node assists this structure.
    pub dcc: bool,
    /// Marked for deconstruction.
    pub marked: bool,
    /// Time the mark was set.
    pub mark_time: u32,
    /// Collides with traces.
    pub solid: bool,
    /// Resting on a surface.
    pub grounded: bool,
    /// Cached power source or territory source.
    pub parent: Option<StructureId>,
    /// Cached network node.
    pub network_node: Option<StructureId>,
    /// Cached core.
    pub core_node: Option<StructureId>,
    /// Current target.
    pub target: Option<ActorId>,
    /// Actor sheltering inside or being healed.
    pub occupant: Option<ActorId>,
    /// Attack sequence running, or healing.
    pub active: bool,
    /// General purpose timestamp: attack start or cooldown end.
    pub timestamp: u32,
    /// Next time a weapon may fire.
    pub next_fire: u32,
    /// Last time damage was taken.
    pub last_damage_time: u32,
    /// Milliseconds accumulated toward the next one-second step.
    pub second_accumulator: u32,
    /// Barricade collision box is reduced.
    pub shrunk: bool,
    /// Last time the barricade shrink state changed.
    pub shrink_time: u32,
    /// Grabbed by an alien until this time.
    pub grabbed_until: u32,
    /// Time the spawn exit became blocked by an actor, 0 if clear.
    pub spawn_block_since: u32,
    /// Overmind: next allowed "no spawns" alert.
    pub spawns_alert_at: u32,
    /// Overmind: next allowed "dying" alert.
    pub dying_alert_at: u32,
    /// Overmind: next allowed "under attack" alert.
    pub attack_alert_at: u32,
    /// Repeater: time it was first seen with no dependents.
    pub idle_since: Option<u32>,
    /// Build log entry that created it.
    pub build_log_id: Option<u32>,
    /// Actor that built it.
    pub builder: Option<ActorId>,
    /// Built by a designated builder.
    pub protected: bool,
    /// Last attacker, for death accounting.
    pub last_attacker: Option<ActorId>,
}

impl Structure {
    /// Fresh structure with the given box and maximum health.
    #[must_use]
    pub fn new(archetype: Archetype, origin: Vec3, mins: Vec3, maxs: Vec3, max_health: i32) -> Self {
        Self {
            id: StructureId::default(),
            archetype,
            origin,
            angles: Vec3::ZERO,
            normal: Vec3::Z,
            turret_angles: Vec3::ZERO,
            mins,
            maxs,
            health: Health::new(max_health),
            last_health: max_health,
            spawned: false,
            build_time: 0,
            phase: Phase::Operating,
            next_think: None,
            powered: false,
            dcc: false,
            marked: false,
            mark_time: 0,
            solid: true,
            grounded: true,
            parent: None,
            network_node: None,
            core_node: None,
            target: None,
            occupant: None,
            active: false,
            timestamp: 0,
            next_fire: 0,
            last_damage_time: 0,
            second_accumulator: 0,
            shrunk: false,
            shrink_time: 0,
            grabbed_until: 0,
            spawn_block_since: 0,
            spawns_alert_at: 0,
            dying_alert_at: 0,
            attack_alert_at: 0,
            idle_since: None,
            build_log_id: None,
            builder: None,
            protected: false,
            last_attacker: None,
        }
    }

    /// Owning faction.
    #[must_use]
    pub const fn faction(&self) -> Faction {
        self.archetype.faction()
    }

    /// Alive with health above zero.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        !self.health.is_dead()
    }

    /// Alive and finished building.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.spawned && self.is_alive()
    }

    /// Absolute bounds.
    #[must_use]
    pub fn bounds(&self) -> Aabb {
        Aabb::at(self.origin, self.mins, self.maxs)
    }
}

/// All structures in entity-index order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StructureStore {
    slots: SlotMap<StructureId, Structure>,
}

impl StructureStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a structure and assign its handle.
    pub fn insert(&mut self, structure: Structure) -> StructureId {
        self.slots.insert_with_key(|id| Structure { id, ..structure })
    }

    /// Remove a structure.
    pub fn remove(&mut self, id: StructureId) -> Option<Structure> {
        self.slots.remove(id)
    }

    /// Get a structure.
    #[must_use]
    pub fn get(&self, id: StructureId) -> Option<&Structure> {
        self.slots.get(id)
    }

    /// Get a structure mutably.
    pub fn get_mut(&mut self, id: StructureId) -> Option<&mut Structure> {
        self.slots.get_mut(id)
    }

    /// Whether the handle is still valid.
    #[must_use]
    pub fn contains(&self, id: StructureId) -> bool {
        self.slots.contains_key(id)
    }

    /// Number of structures, dying ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Check if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Handles in iteration order, for loops that mutate the store.
    #[must_use]
    pub fn ids(&self) -> Vec<StructureId> {
        self.slots.keys().collect()
    }

    /// Iterate in entity-index order.
    pub fn iter(&self) -> impl Iterator<Item = &Structure> {
        self.slots.values()
    }

    /// Iterate mutably in entity-index order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Structure> {
        self.slots.values_mut()
    }

    /// Live structures of one archetype.
    pub fn alive_of(&self, archetype: Archetype) -> impl Iterator<Item = &Structure> {
        self.iter()
            .filter(move |s| s.archetype == archetype && s.is_alive())
    }
}
