//! Damage application and line-of-sight helpers.

use crate::behavior::behavior_for;
use crate::context::Ctx;
use crate::faction::Faction;
use crate::math::{Aabb, Vec3};
use crate::structure::StructureId;
use crate::world::{ActorId, ActorSnapshot, DamageSource, EntityRef, MeansOfDeath, TraceMask};

/// Whether a line from `from` to `to` is not blocked by world geometry.
#[must_use]
pub fn clear_line(ctx: &Ctx<'_>, from: Vec3, to: Vec3, skip: Option<EntityRef>) -> bool {
    let tr = ctx
        .world
        .trace(from, Vec3::ZERO, Vec3::ZERO, to, skip, TraceMask::Shot);
    !matches!(tr.entity, Some(EntityRef::World | EntityRef::Mover(_)))
}

/// Whether a structure can see an actor.
#[must_use]
pub fn visible(ctx: &Ctx<'_>, id: StructureId, actor: &ActorSnapshot) -> bool {
    ctx.get(id).is_some_and(|s| {
        clear_line(ctx, s.origin, actor.origin, Some(EntityRef::Structure(id)))
    })
}

/// Whether an actor is a valid target for structures of `faction`.
#[must_use]
pub fn targetable(ctx: &Ctx<'_>, actor: &ActorSnapshot, faction: Faction) -> bool {
    !actor.no_target && !ctx.config.practise && actor.is_hostile_to(faction)
}

/// Damage a structure, running its pain or die behavior.
///
/// Dead and dying structures ignore further damage.
pub fn damage_structure(
    ctx: &mut Ctx<'_>,
    id: StructureId,
    amount: i32,
    attacker: Option<EntityRef>,
) {
    let now = ctx.now();
    let Some(s) = ctx.get_mut(id) else {
        return;
    };
    if s.phase.is_dying() || !s.is_alive() || amount <= 0 {
        return;
    }
    s.health.apply_damage(amount);
    s.last_damage_time = now;
    if let Some(EntityRef::Actor(actor)) = attacker {
        s.last_attacker = Some(actor);
    }
    let archetype = s.archetype;
    let dead = !s.is_alive();

    let behavior = behavior_for(archetype);
    if dead {
        tracing::info!(time = now, structure = ?id, %archetype, "Structure destroyed");
        behavior.die(ctx, id, attacker);
    } else {
        behavior.pain(ctx, id, attacker, amount);
    }
}

/// Distance from `point` to the nearest point of `bounds`.
#[must_use]
pub fn distance_to_box(point: Vec3, bounds: &Aabb) -> f32 {
    (point.clamp(bounds.mins, bounds.maxs) - point).length()
}

fn falloff(damage: i32, distance: f32, radius: f32) -> i32 {
    (damage as f32 * (1.0 - distance / radius)) as i32
}

/// Damage actors hostile to `spare` within `radius` of `origin`.
///
/// Damage falls off linearly with distance and needs a clear line.
pub fn selective_radius_damage(
    ctx: &mut Ctx<'_>,
    origin: Vec3,
    source: DamageSource,
    damage: i32,
    radius: f32,
    spare: Faction,
) {
    let view: &Ctx<'_> = ctx;
    let targets: Vec<(ActorId, i32)> = view
        .world
        .entities_in_box(Aabb::around(origin, radius))
        .into_iter()
        .filter_map(|e| match e {
            EntityRef::Actor(id) => view.world.actor(id),
            _ => None,
        })
        .filter(|a| a.is_alive() && a.is_hostile_to(spare))
        .filter_map(|a| {
            let distance = distance_to_box(origin, &a.bounds());
            if distance >= radius || !clear_line(view, origin, a.origin, None) {
                return None;
            }
            Some((a.id, falloff(damage, distance, radius)))
        })
        .collect();

    for (id, points) in targets {
        if points > 0 {
            ctx.world.damage_actor(id, points, source);
        }
    }
}

/// Damage every actor and structure within `radius` of `origin`.
pub fn radius_damage(
    ctx: &mut Ctx<'_>,
    origin: Vec3,
    source: DamageSource,
    damage: i32,
    radius: f32,
) {
    let view: &Ctx<'_> = ctx;
    let hits: Vec<(EntityRef, i32)> = view
        .world
        .entities_in_box(Aabb::around(origin, radius))
        .into_iter()
        .filter(|&e| Some(e) != source.structure.map(EntityRef::Structure))
        .filter_map(|e| {
            let (bounds, center) = match e {
                EntityRef::Actor(id) => {
                    let a = view.world.actor(id).filter(ActorSnapshot::is_alive)?;
                    (a.bounds(), a.origin)
                }
                EntityRef::Structure(id) => {
                    let s = view.get(id).filter(|s| s.is_alive())?;
                    (s.bounds(), s.origin)
                }
                _ => return None,
            };
            let distance = distance_to_box(origin, &bounds);
            if distance >= radius || !clear_line(view, origin, center, Some(e)) {
                return None;
            }
            Some((e, falloff(damage, distance, radius)))
        })
        .collect();

    let attacker = source.structure.map(EntityRef::Structure);
    for (e, points) in hits {
        if points <= 0 {
            continue;
        }
        match e {
            EntityRef::Actor(id) => ctx.world.damage_actor(id, points, source),
            EntityRef::Structure(id) => damage_structure(ctx, id, points, attacker),
            _ => {}
        }
    }
}

/// Damage source for a structure's own weapon.
#[must_use]
pub const fn from_structure(id: StructureId, means: MeansOfDeath) -> DamageSource {
    DamageSource {
        structure: Some(id),
        means,
    }
}
