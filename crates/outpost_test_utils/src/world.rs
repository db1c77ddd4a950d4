//! In-memory host world.
//!
//! Geometry is an optional infinite floor plus solid boxes. Traces sweep
//! an axis-aligned box against the floor, the boxes, every solid linked
//! structure and every tangible live actor. Player mutations are applied
//! to the stored snapshots and also recorded so tests can assert on them.

use std::collections::{BTreeMap, BTreeSet};

use outpost_core::math::{Aabb, Vec3};
use outpost_core::structure::StructureId;
use outpost_core::world::{
    ActorId, ActorRegistry, ActorSnapshot, BuildFlags, DamageSource, EntityRef, Item,
    SpatialIndex, StatusEffect, Trace, TraceMask,
};

/// Traces stop this far short of the surface they hit.
const SURFACE_CLIP: f32 = 0.031_25;

/// Overlap smaller than this does not count as starting inside.
const OVERLAP_EPSILON: f32 = 0.01;

/// Horizontal extent of the floor.
const FLOOR_EXTENT: f32 = 100_000.0;

/// Depth of the floor slab.
const FLOOR_DEPTH: f32 = 1000.0;

#[derive(Debug, Clone)]
struct Solid {
    bounds: Aabb,
    entity: EntityRef,
    surface: BuildFlags,
}

#[derive(Debug, Clone)]
struct TestActor {
    snapshot: ActorSnapshot,
    tangible: bool,
    statuses: BTreeSet<StatusEffect>,
}

/// Damage dealt to an actor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DamageRecord {
    /// Victim.
    pub actor: ActorId,
    /// Amount dealt.
    pub amount: i32,
    /// Who dealt it.
    pub source: DamageSource,
}

/// Host world for tests.
#[derive(Debug, Clone, Default)]
pub struct TestWorld {
    floor: Option<(f32, BuildFlags)>,
    walls: Vec<(Aabb, BuildFlags)>,
    volumes: Vec<(Aabb, BuildFlags)>,
    links: BTreeMap<StructureId, (Aabb, bool)>,
    actors: BTreeMap<ActorId, TestActor>,
    corpses: BTreeMap<u32, Aabb>,
    /// Damage dealt to actors, in order.
    pub damage_log: Vec<DamageRecord>,
    /// Items handed out, in order.
    pub items_given: Vec<(ActorId, Item)>,
    /// Structures that fired world triggers, in order.
    pub triggers_touched: Vec<StructureId>,
}

impl TestWorld {
    /// Empty space with no floor.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A flat, buildable floor at height 0.
    #[must_use]
    pub fn with_floor() -> Self {
        let mut world = Self::new();
        world.floor = Some((0.0, BuildFlags::default()));
        world
    }

    /// Set the permission flags of the floor surface.
    pub fn set_floor_flags(&mut self, flags: BuildFlags) {
        if let Some((_, f)) = self.floor.as_mut() {
            *f = flags;
        }
    }

    /// Add a solid world box.
    pub fn add_wall(&mut self, bounds: Aabb) {
        self.walls.push((bounds, BuildFlags::default()));
    }

    /// Add a non-solid volume carrying build flags.
    pub fn add_volume(&mut self, bounds: Aabb, flags: BuildFlags) {
        self.volumes.push((bounds, flags));
    }

    /// Add a corpse occupying `bounds`.
    pub fn add_corpse(&mut self, id: u32, bounds: Aabb) {
        self.corpses.insert(id, bounds);
    }

    /// Whether a corpse still exists.
    #[must_use]
    pub fn has_corpse(&self, id: u32) -> bool {
        self.corpses.contains_key(&id)
    }

    /// Add or replace an actor.
    pub fn add_actor(&mut self, snapshot: ActorSnapshot) {
        self.actors.insert(
            snapshot.id,
            TestActor {
                snapshot,
                tangible: true,
                statuses: BTreeSet::new(),
            },
        );
    }

    /// Remove an actor.
    pub fn remove_actor(&mut self, id: ActorId) {
        self.actors.remove(&id);
    }

    /// Edit a stored actor.
    pub fn actor_mut(&mut self, id: ActorId) -> Option<&mut ActorSnapshot> {
        self.actors.get_mut(&id).map(|a| &mut a.snapshot)
    }

    /// Whether an actor currently has a status.
    #[must_use]
    pub fn has_status(&self, id: ActorId, status: StatusEffect) -> bool {
        self.actors
            .get(&id)
            .is_some_and(|a| a.statuses.contains(&status))
    }

    /// Whether an actor collides.
    #[must_use]
    pub fn is_tangible(&self, id: ActorId) -> bool {
        self.actors.get(&id).is_some_and(|a| a.tangible)
    }

    /// Linked box of a structure.
    #[must_use]
    pub fn linked(&self, id: StructureId) -> Option<(Aabb, bool)> {
        self.links.get(&id).copied()
    }

    /// Total damage dealt to one actor.
    #[must_use]
    pub fn damage_to(&self, id: ActorId) -> i32 {
        self.damage_log
            .iter()
            .filter(|d| d.actor == id)
            .map(|d| d.amount)
            .sum()
    }

    fn solids(&self, skip: Option<EntityRef>) -> Vec<Solid> {
        let mut solids = Vec::new();
        if let Some((z, surface)) = self.floor {
            solids.push(Solid {
                bounds: Aabb::new(
                    Vec3::new(-FLOOR_EXTENT, -FLOOR_EXTENT, z - FLOOR_DEPTH),
                    Vec3::new(FLOOR_EXTENT, FLOOR_EXTENT, z),
                ),
                entity: EntityRef::World,
                surface,
            });
        }
        for &(bounds, surface) in &self.walls {
            solids.push(Solid {
                bounds,
                entity: EntityRef::World,
                surface,
            });
        }
        for (&id, &(bounds, solid)) in &self.links {
            if solid {
                solids.push(Solid {
                    bounds,
                    entity: EntityRef::Structure(id),
                    surface: BuildFlags::default(),
                });
            }
        }
        for a in self.actors.values() {
            if a.tangible && a.snapshot.is_alive() && !a.snapshot.sheltered {
                solids.push(Solid {
                    bounds: a.snapshot.bounds(),
                    entity: EntityRef::Actor(a.snapshot.id),
                    surface: BuildFlags::default(),
                });
            }
        }
        for (&id, &bounds) in &self.corpses {
            solids.push(Solid {
                bounds,
                entity: EntityRef::Corpse(id),
                surface: BuildFlags::default(),
            });
        }
        solids.retain(|s| Some(s.entity) != skip);
        solids
    }
}

fn strictly_inside(bounds: &Aabb, point: Vec3) -> bool {
    (0..3).all(|a| point[a] > bounds.mins[a] + OVERLAP_EPSILON && point[a] < bounds.maxs[a] - OVERLAP_EPSILON)
}

enum Sweep {
    StartSolid,
    Hit { t: f32, normal: Vec3 },
}

/// Sweep the point `start` to `start + delta` against `bounds`, already
/// grown by the moving box.
fn sweep(start: Vec3, delta: Vec3, bounds: &Aabb) -> Option<Sweep> {
    if strictly_inside(bounds, start) {
        return Some(Sweep::StartSolid);
    }

    let mut enter = f32::NEG_INFINITY;
    let mut exit = f32::INFINITY;
    let mut normal = Vec3::ZERO;

    for axis in 0..3 {
        let (lo, hi, s, d) = (bounds.mins[axis], bounds.maxs[axis], start[axis], delta[axis]);
        if d.abs() < f32::EPSILON {
            if s <= lo || s >= hi {
                return None;
            }
            continue;
        }
        let t_lo = (lo - s) / d;
        let t_hi = (hi - s) / d;
        let (near, far, side) = if t_lo < t_hi {
            (t_lo, t_hi, -1.0)
        } else {
            (t_hi, t_lo, 1.0)
        };
        if near > enter {
            enter = near;
            normal = Vec3::ZERO;
            normal[axis] = side;
        }
        exit = exit.min(far);
        if enter >= exit {
            return None;
        }
    }

    if !(0.0..=1.0).contains(&enter) {
        return None;
    }
    Some(Sweep::Hit { t: enter, normal })
}

impl SpatialIndex for TestWorld {
    fn trace(
        &self,
        start: Vec3,
        mins: Vec3,
        maxs: Vec3,
        end: Vec3,
        skip: Option<EntityRef>,
        _mask: TraceMask,
    ) -> Trace {
        let delta = end - start;
        let length = delta.length();
        let mut best: Option<(f32, Vec3, &Solid)> = None;
        let solids = self.solids(skip);

        for solid in &solids {
            let grown = Aabb::new(solid.bounds.mins - maxs, solid.bounds.maxs - mins);
            match sweep(start, delta, &grown) {
                Some(Sweep::StartSolid) => {
                    return Trace {
                        fraction: 0.0,
                        end_pos: start,
                        normal: Vec3::ZERO,
                        entity: Some(solid.entity),
                        start_solid: true,
                        all_solid: strictly_inside(&grown, end),
                        surface: solid.surface,
                    };
                }
                Some(Sweep::Hit { t, normal }) => {
                    if best.map_or(true, |(bt, _, _)| t < bt) {
                        best = Some((t, normal, solid));
                    }
                }
                None => {}
            }
        }

        match best {
            Some((t, normal, solid)) => {
                let clip = if length > 0.0 { SURFACE_CLIP / length } else { 0.0 };
                let fraction = (t - clip).max(0.0);
                Trace {
                    fraction,
                    end_pos: start + delta * fraction,
                    normal,
                    entity: Some(solid.entity),
                    start_solid: false,
                    all_solid: false,
                    surface: solid.surface,
                }
            }
            None => Trace::clear(end),
        }
    }

    fn point_contents(&self, point: Vec3, _skip: Option<EntityRef>) -> BuildFlags {
        self.volumes
            .iter()
            .filter(|(bounds, _)| bounds.contains(point))
            .fold(BuildFlags::default(), |acc, &(_, flags)| acc.union(flags))
    }

    fn entities_in_box(&self, bounds: Aabb) -> Vec<EntityRef> {
        let structures = self
            .links
            .iter()
            .filter(|(_, (b, _))| b.intersects(&bounds))
            .map(|(&id, _)| EntityRef::Structure(id));
        let actors = self
            .actors
            .values()
            .filter(|a| !a.snapshot.sheltered && a.snapshot.bounds().intersects(&bounds))
            .map(|a| EntityRef::Actor(a.snapshot.id));
        structures.chain(actors).collect()
    }

    fn link(&mut self, id: StructureId, bounds: Aabb, solid: bool) {
        self.links.insert(id, (bounds, solid));
    }

    fn unlink(&mut self, id: StructureId) {
        self.links.remove(&id);
    }

    fn touch_triggers(&mut self, id: StructureId, _bounds: Aabb) {
        self.triggers_touched.push(id);
    }

    fn free_corpse(&mut self, id: u32) {
        self.corpses.remove(&id);
    }
}

impl ActorRegistry for TestWorld {
    fn actor(&self, id: ActorId) -> Option<ActorSnapshot> {
        self.actors.get(&id).map(|a| a.snapshot.clone())
    }

    fn actors(&self) -> Vec<ActorSnapshot> {
        self.actors.values().map(|a| a.snapshot.clone()).collect()
    }

    fn damage_actor(&mut self, id: ActorId, amount: i32, source: DamageSource) {
        if let Some(a) = self.actors.get_mut(&id) {
            a.snapshot.health -= amount;
            self.damage_log.push(DamageRecord {
                actor: id,
                amount,
                source,
            });
        }
    }

    fn apply_status(&mut self, id: ActorId, status: StatusEffect, _now: u32) {
        if let Some(a) = self.actors.get_mut(&id) {
            a.statuses.insert(status);
            match status {
                StatusEffect::Poisoned => a.snapshot.poisoned = true,
                StatusEffect::MedkitActive => a.snapshot.medkit_active = true,
                StatusEffect::Sheltered => a.snapshot.sheltered = true,
                StatusEffect::Boosted | StatusEffect::CreepSlowed => {}
            }
        }
    }

    fn clear_status(&mut self, id: ActorId, status: StatusEffect) {
        if let Some(a) = self.actors.get_mut(&id) {
            a.statuses.remove(&status);
            match status {
                StatusEffect::Poisoned => a.snapshot.poisoned = false,
                StatusEffect::MedkitActive => a.snapshot.medkit_active = false,
                StatusEffect::Sheltered => a.snapshot.sheltered = false,
                StatusEffect::Boosted | StatusEffect::CreepSlowed => {}
            }
        }
    }

    fn give_item(&mut self, id: ActorId, item: Item) {
        if let Some(a) = self.actors.get_mut(&id) {
            if item == Item::Medkit {
                a.snapshot.has_medkit = true;
            }
            self.items_given.push((id, item));
        }
    }

    fn heal(&mut self, id: ActorId, amount: i32) {
        if let Some(a) = self.actors.get_mut(&id) {
            a.snapshot.health = (a.snapshot.health + amount).min(a.snapshot.max_health);
        }
    }

    fn add_velocity(&mut self, id: ActorId, delta: Vec3) {
        if let Some(a) = self.actors.get_mut(&id) {
            a.snapshot.velocity += delta;
        }
    }

    fn teleport(&mut self, id: ActorId, origin: Vec3, angles: Vec3) {
        if let Some(a) = self.actors.get_mut(&id) {
            a.snapshot.origin = origin;
            a.snapshot.view_angles = angles;
        }
    }

    fn set_tangible(&mut self, id: ActorId, tangible: bool) {
        if let Some(a) = self.actors.get_mut(&id) {
            a.tangible = tangible;
        }
    }

    fn add_penalty(&mut self, id: ActorId, amount: i32) {
        if let Some(a) = self.actors.get_mut(&id) {
            a.snapshot.penalty += amount;
        }
    }

    fn clear_retribution(&mut self, id: ActorId) {
        if let Some(a) = self.actors.get_mut(&id) {
            a.snapshot.penalty = 0;
        }
    }
}
