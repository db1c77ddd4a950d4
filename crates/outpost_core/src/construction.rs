//! Building, deconstruction, map spawning and revert.
//!
//! Every structure enters the world through [`build`]. Player builds, map
//! spawns, layout items and reverted structures only differ in how the
//! normal is chosen and what happens right after.

use rand::Rng;

use crate::archetype::Archetype;
use crate::behavior::alien::Barricade;
use crate::behavior::LETHAL_DAMAGE;
use crate::combat::damage_structure;
use crate::context::Ctx;
use crate::events::BuildableEvent;
use crate::faction::Faction;
use crate::history::{BuildActor, BuildFate, BuildRecord};
use crate::layout::LayoutRecord;
use crate::level::PendingSpawn;
use crate::math::{Aabb, Vec3, PITCH, UP, YAW};
use crate::network;
use crate::structure::{Health, Phase, Structure, StructureId};
use crate::world::{ActorId, ActorSnapshot, EntityRef, StatusEffect, TraceMask};

/// How far map and layout structures are dropped onto their surface.
pub const MAP_DROP_DISTANCE: f32 = 4096.0;

/// Delay before a queued layout item is spawned.
pub const LAYOUT_SPAWN_DELAY: u32 = 200;

/// Poll period of a reverted structure waiting for its volume to clear.
pub const REVERT_THINK_INTERVAL: u32 = 50;

/// Strength of the push given to actors inside a reverted structure.
pub const REVERT_NUDGE: f32 = 150.0;

/// A dead structure this close to a revert target is the one being reverted.
pub const REVERT_FIT_DISTANCE: f32 = 10.0;

/// Who is building.
#[derive(Debug, Clone, Copy)]
pub enum Builder<'a> {
    /// A player standing on a surface with the given normal.
    Actor(&'a ActorSnapshot),
    /// The map or a layout file.
    Layout(&'a LayoutRecord),
}

/// Create a structure of `archetype` at `origin`.
///
/// Player builds free the planned removals first, are logged and start at
/// one health point unless cheats are on. Layout builds are lifted one
/// unit off their surface so they can be dropped onto it.
pub fn build(
    ctx: &mut Ctx<'_>,
    builder: Builder<'_>,
    archetype: Archetype,
    origin: Vec3,
    angles: Vec3,
) -> StructureId {
    let now = ctx.now();
    let row = ctx.data(archetype).clone();

    let (normal, mut turret_angles) = match builder {
        Builder::Actor(actor) => {
            let normal = if actor.surface_normal == Vec3::ZERO {
                UP
            } else {
                actor.surface_normal
            };
            (normal, Vec3::ZERO)
        }
        Builder::Layout(record) => {
            let normal = if record.normal == Vec3::ZERO {
                UP
            } else {
                record.normal
            };
            (normal, record.turret_angles)
        }
    };
    let origin = match builder {
        Builder::Actor(_) => origin,
        Builder::Layout(_) => origin + normal,
    };
    let mut angles = angles;
    angles[PITCH] = 0.0;
    turret_angles[YAW] = angles[YAW];

    let log_id = match builder {
        Builder::Actor(actor) => {
            let id = ctx.history.next_id();
            ctx.history.push(BuildRecord {
                id: Some(id),
                actor: BuildActor::Player {
                    id: actor.id,
                    name: actor.name.clone(),
                },
                archetype,
                origin,
                angles,
                normal,
                turret_angles,
                fate: BuildFate::Built,
                marked: Vec::new(),
            });
            Some(id)
        }
        Builder::Layout(_) => None,
    };
    if log_id.is_some() {
        free_marked(ctx);
    }

    let mut s = Structure::new(archetype, origin, row.mins, row.maxs, row.health);
    s.health = Health::with_current(1, row.health);
    s.angles = angles;
    s.normal = normal;
    s.turret_angles = turret_angles;
    s.build_time = now;
    s.next_think = Some(now);
    s.build_log_id = log_id;

    if let Builder::Actor(actor) = builder {
        s.builder = Some(actor.id);
        s.protected = actor.designated_builder;
        if ctx.config.cheats {
            s.health = Health::new(row.health);
            s.build_time = now.saturating_sub(row.build_time);
        }
    }
    if archetype == Archetype::Reactor {
        s.powered = true;
        s.active = true;
    }

    let id = ctx.structures.insert(s);

    let powered = archetype.faction() == Faction::Aliens
        || archetype == Archetype::Reactor
        || network::find_power(ctx.structures, ctx.table, id);
    let dcc = network::find_network_node(ctx.structures, id);
    if let Some(s) = ctx.get_mut(id) {
        s.powered = powered;
        s.dcc = dcc;
    }
    if archetype == Archetype::Barricade {
        Barricade::shrink(ctx, id, true);
    }

    ctx.link(id);
    ctx.level.recalculate(ctx.structures, ctx.table, ctx.config);
    ctx.emit(BuildableEvent::Constructed {
        structure: id,
        archetype,
        origin,
    });

    if let Builder::Actor(actor) = builder {
        tracing::info!(time = now, structure = ?id, %archetype, builder = %actor.name, "Building");
        ctx.team_message(
            archetype.faction(),
            format!("{} is being built by {}", archetype.display_name(), actor.name),
        );
    } else {
        tracing::debug!(time = now, structure = ?id, %archetype, "Layout structure placed");
    }
    id
}

/// Remove every structure on the level's removal list.
///
/// Each removal is logged under the newest build entry. Does nothing when
/// mark deconstruction is disabled.
pub fn free_marked(ctx: &mut Ctx<'_>) {
    if !ctx.config.mark_deconstruct {
        return;
    }
    let removals = std::mem::take(&mut ctx.level.removal_list);
    for id in removals {
        let Some(s) = ctx.get(id) else {
            continue;
        };
        let archetype = s.archetype;
        let record = BuildRecord::of(s, None, BuildActor::MarkDecon, BuildFate::Deconstructed);
        ctx.history.attach_marked(record);
        tracing::info!(time = ctx.now(), structure = ?id, %archetype, "Deconstructed");
        remove_structure(ctx, id);
    }
}

/// Drop a structure from the world and the store.
pub fn remove_structure(ctx: &mut Ctx<'_>, id: StructureId) {
    ctx.unlink(id);
    let Some(s) = ctx.structures.remove(id) else {
        return;
    };
    if let Some(actor) = s.occupant {
        ctx.world.clear_status(actor, StatusEffect::Sheltered);
    }
    ctx.level.painted.retain(|_, turret| *turret != id);
    ctx.level.removal_list.retain(|&r| r != id);
    ctx.level.recalculate(ctx.structures, ctx.table, ctx.config);
    ctx.emit(BuildableEvent::Removed {
        structure: id,
        archetype: s.archetype,
    });
}

/// Build a layout item immediately and drop it onto its surface.
///
/// The structure is finished at full health and rests flush on the
/// surface, without the clearance a player placement leaves. Returns
/// `None` and discards the structure when it starts inside something solid.
pub fn instant_build(ctx: &mut Ctx<'_>, record: &LayoutRecord) -> Option<StructureId> {
    let id = build(
        ctx,
        Builder::Layout(record),
        record.archetype,
        record.origin,
        record.angles,
    );

    let s = ctx.get_mut(id)?;
    s.spawned = true;
    s.health = Health::new(s.health.max);
    let (origin, mins, maxs, normal) = (s.origin, s.mins, s.maxs, s.normal);

    let tr = ctx.world.trace(
        origin,
        mins,
        maxs,
        origin - normal * MAP_DROP_DISTANCE,
        Some(EntityRef::Structure(id)),
        TraceMask::PlayerSolid,
    );
    if tr.start_solid {
        tracing::warn!(archetype = %record.archetype, ?origin, "Layout structure starts solid, discarded");
        remove_structure(ctx, id);
        return None;
    }

    let s = ctx.get_mut(id)?;
    if tr.fraction < 1.0 {
        s.normal = tr.normal;
        s.grounded = true;
    } else {
        s.grounded = false;
    }
    s.origin = tr.end_pos;
    ctx.link(id);
    Some(id)
}

/// Queue a layout item to spawn after [`LAYOUT_SPAWN_DELAY`].
pub fn queue_layout_item(ctx: &mut Ctx<'_>, record: LayoutRecord) {
    let due = ctx.now() + LAYOUT_SPAWN_DELAY;
    ctx.level.pending_spawns.push(PendingSpawn { record, due });
}

/// Spawn every queued layout item that is due, in queue order.
pub fn spawn_pending(ctx: &mut Ctx<'_>) {
    let now = ctx.now();
    let (due, waiting): (Vec<PendingSpawn>, Vec<PendingSpawn>) =
        std::mem::take(&mut ctx.level.pending_spawns)
            .into_iter()
            .partition(|p| p.due <= now);
    ctx.level.pending_spawns = waiting;
    for pending in due {
        instant_build(ctx, &pending.record);
    }
}

/// Whether a logged structure could be put back without overwriting anything.
///
/// Only the dead remains of the same structure may stand in the way.
#[must_use]
pub fn revert_can_fit(ctx: &Ctx<'_>, record: &BuildRecord) -> bool {
    let row = ctx.data(record.archetype);
    let bounds = Aabb::at(record.origin, row.mins, row.maxs);
    ctx.world.entities_in_box(bounds).into_iter().all(|e| match e {
        EntityRef::Structure(id) => ctx.get(id).is_some_and(|s| {
            s.archetype == record.archetype
                && s.origin.distance(record.origin) < REVERT_FIT_DISTANCE
                && !s.is_alive()
        }),
        _ => true,
    })
}

/// Put a logged structure back.
///
/// Structures in the volume are removed and actors there are intangible
/// while the new structure is placed. The structure starts non-solid in
/// the [`Phase::Reverting`] phase until its volume is clear.
pub fn spawn_reverted(ctx: &mut Ctx<'_>, record: &BuildRecord, mark: bool) -> Option<StructureId> {
    let row = ctx.data(record.archetype);
    let bounds = Aabb::at(record.origin, row.mins, row.maxs);

    let mut intangible: Vec<ActorId> = Vec::new();
    for e in ctx.world.entities_in_box(bounds) {
        match e {
            EntityRef::Structure(id) => remove_structure(ctx, id),
            EntityRef::Actor(actor) => {
                ctx.world.set_tangible(actor, false);
                intangible.push(actor);
            }
            _ => {}
        }
    }
    ctx.level.removal_list.clear();

    let built = instant_build(ctx, &LayoutRecord::from(record));
    if let Some(id) = built {
        let now = ctx.now();
        if let Some(s) = ctx.get_mut(id) {
            s.solid = false;
            s.phase = Phase::Reverting;
            s.next_think = Some(now);
            s.marked = mark;
            if mark {
                s.mark_time = now;
            }
        }
        ctx.link(id);
        tracing::info!(time = now, structure = ?id, archetype = %record.archetype, "Reverted");
    }

    for actor in intangible {
        ctx.world.set_tangible(actor, true);
    }
    built
}

/// Poll of a reverted structure: push occupants out, then become solid.
pub fn revert_think(ctx: &mut Ctx<'_>, id: StructureId) {
    let now = ctx.now();
    let Some(bounds) = ctx.get(id).map(Structure::bounds) else {
        return;
    };

    ctx.unlink(id);
    let occupants: Vec<ActorId> = ctx
        .world
        .entities_in_box(bounds)
        .into_iter()
        .filter_map(|e| match e {
            EntityRef::Actor(a) => Some(a),
            _ => None,
        })
        .collect();
    ctx.link(id);

    for &actor in &occupants {
        let push = Vec3::new(
            ctx.rng.gen_range(-1.0..=1.0) * REVERT_NUDGE,
            ctx.rng.gen_range(-1.0..=1.0) * REVERT_NUDGE,
            ctx.rng.gen_range(0.0..=1.0) * REVERT_NUDGE,
        );
        ctx.world.add_velocity(actor, push);
    }

    if !occupants.is_empty() {
        ctx.schedule(id, now + REVERT_THINK_INTERVAL);
        return;
    }

    let Some(s) = ctx.get_mut(id) else {
        return;
    };
    s.solid = true;
    s.phase = Phase::Operating;
    let archetype = s.archetype;
    ctx.link(id);
    let next = now + ctx.data(archetype).think_interval;
    ctx.schedule(id, next);
    tracing::debug!(time = now, structure = ?id, %archetype, "Reverted structure committed");
}

/// Detonate every live structure of `faction`.
pub fn self_destruct(ctx: &mut Ctx<'_>, faction: Faction) {
    let doomed: Vec<StructureId> = ctx
        .structures
        .iter()
        .filter(|s| s.faction() == faction && s.is_alive())
        .map(|s| s.id)
        .collect();
    tracing::info!(time = ctx.now(), ?faction, count = doomed.len(), "Base self-destruct");
    for id in doomed {
        damage_structure(ctx, id, LETHAL_DAMAGE, None);
    }
}

