//! Scenario fixtures.
//!
//! Actors stand on the floor of a [`TestWorld`] at height 0 and structures
//! are placed as layout items dropped onto that floor.

use outpost_core::archetype::Archetype;
use outpost_core::data::ArchetypeTable;
use outpost_core::faction::Faction;
use outpost_core::layout::LayoutRecord;
use outpost_core::math::{Vec3, UP};
use outpost_core::placement::{HUMAN_MAXS, HUMAN_MINS};
use outpost_core::simulation::{Simulation, TickEvents, FRAME_MSEC};
use outpost_core::structure::StructureId;
use outpost_core::world::{ActorId, ActorSnapshot};

use crate::world::TestWorld;

/// Origin of an actor standing on the floor at `(x, y)`.
#[must_use]
pub fn standing(x: f32, y: f32) -> Vec3 {
    Vec3::new(x, y, -HUMAN_MINS.z)
}

/// A healthy, grounded actor at `origin`.
#[must_use]
pub fn actor(id: u32, faction: Faction, origin: Vec3) -> ActorSnapshot {
    ActorSnapshot {
        id: ActorId(id),
        name: format!("player{id}"),
        faction,
        penalty: 0,
        origin,
        velocity: Vec3::ZERO,
        acceleration: Vec3::ZERO,
        jerk: Vec3::ZERO,
        max_speed: None,
        mins: HUMAN_MINS,
        maxs: HUMAN_MAXS,
        health: 100,
        max_health: 100,
        no_target: false,
        paused: false,
        grounded: true,
        sheltered: false,
        blob_locked: false,
        poisoned: false,
        medkit_active: false,
        has_medkit: false,
        is_builder: false,
        designated_builder: false,
        view_angles: Vec3::ZERO,
        surface_normal: UP,
    }
}

/// A builder standing at `(x, y)` and looking along `yaw` degrees.
#[must_use]
pub fn builder(id: u32, faction: Faction, x: f32, y: f32, yaw: f32) -> ActorSnapshot {
    let mut a = actor(id, faction, standing(x, y));
    a.is_builder = true;
    a.view_angles = Vec3::new(0.0, yaw, 0.0);
    a
}

/// Layout record of `archetype` resting on the floor at `(x, y)`.
#[must_use]
pub fn record(table: &ArchetypeTable, archetype: Archetype, x: f32, y: f32) -> LayoutRecord {
    let mins = table.get(archetype).mins;
    LayoutRecord {
        archetype,
        origin: Vec3::new(x, y, -mins.z),
        angles: Vec3::ZERO,
        normal: UP,
        turret_angles: Vec3::ZERO,
    }
}

/// A simulation and the world it runs against.
#[derive(Debug, Clone)]
pub struct Scenario {
    /// The simulation under test.
    pub sim: Simulation,
    /// Its host world.
    pub world: TestWorld,
}

impl Scenario {
    /// Empty simulation over a flat floor.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            sim: Simulation::with_seed(seed),
            world: TestWorld::with_floor(),
        }
    }

    /// Place a finished structure on the floor at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if the spot is obstructed.
    pub fn place(&mut self, archetype: Archetype, x: f32, y: f32) -> StructureId {
        let record = record(self.sim.table(), archetype, x, y);
        self.sim
            .instant_build(&mut self.world, &record)
            .unwrap_or_else(|| panic!("{archetype} could not be placed at ({x}, {y})"))
    }

    /// A powered human base: reactor at the origin and a telenode east of it.
    pub fn human_base(&mut self) -> HumanBase {
        HumanBase {
            reactor: self.place(Archetype::Reactor, 0.0, 0.0),
            spawn: self.place(Archetype::HumanSpawn, 150.0, 0.0),
        }
    }

    /// An alien base: overmind at `(x, 0)` and an egg next to it.
    pub fn alien_base(&mut self, x: f32) -> AlienBase {
        AlienBase {
            overmind: self.place(Archetype::Overmind, x, 0.0),
            spawn: self.place(Archetype::AlienSpawn, x + 120.0, 0.0),
        }
    }

    /// Add an actor to the world and return its snapshot.
    pub fn add_actor(&mut self, snapshot: ActorSnapshot) -> ActorSnapshot {
        self.world.add_actor(snapshot.clone());
        snapshot
    }

    /// Run one frame.
    pub fn step(&mut self) -> TickEvents {
        self.sim.tick(&mut self.world, FRAME_MSEC)
    }

    /// Run frames until at least `msec` have passed, collecting events.
    pub fn run(&mut self, msec: u32) -> TickEvents {
        let mut all = TickEvents::default();
        let mut elapsed = 0;
        while elapsed < msec {
            let tick = self.step();
            all.events.extend(tick.events);
            all.completed.extend(tick.completed);
            all.removed.extend(tick.removed);
            elapsed += FRAME_MSEC;
        }
        all
    }
}

/// Handles of a human base.
#[derive(Debug, Clone, Copy)]
pub struct HumanBase {
    /// The reactor.
    pub reactor: StructureId,
    /// The telenode.
    pub spawn: StructureId,
}

/// Handles of an alien base.
#[derive(Debug, Clone, Copy)]
pub struct AlienBase {
    /// The overmind.
    pub overmind: StructureId,
    /// The egg.
    pub spawn: StructureId,
}
