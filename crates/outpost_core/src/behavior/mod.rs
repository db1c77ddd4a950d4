//! Per-archetype behavior.
//!
//! Every archetype is bound to exactly one [`Behavior`] through
//! [`behavior_for`]. The tick driver calls [`frame`] on every structure
//! each tick and [`run_think`] when a structure's `next_think` comes due.
//! The lifecycle [`Phase`] decides whether the steady-state think, the
//! revert poll or a decay step runs.
//!
//! ## Module Structure
//!
//! - [`alien`] - Egg, barricade, booster, acid tube, hive, trapper, overmind, hovel
//! - [`human`] - Telenode, turrets, armoury, defense computer, medistat, reactor, repeater
//! - [`decay`] - Die transitions and the blast, melt and recede phases

pub mod alien;
pub mod decay;
pub mod human;

use rand::Rng;

use crate::archetype::Archetype;
use crate::combat::{damage_structure, targetable};
use crate::construction;
use crate::context::Ctx;
use crate::events::{BuildableEvent, Notice};
use crate::faction::Faction;
use crate::history::{BuildActor, BuildFate, BuildRecord};
use crate::math::{Aabb, Vec3};
use crate::placement::{check_spawn_point, SpawnExit};
use crate::structure::{Phase, StructureId};
use crate::world::{ActorId, ActorSnapshot, DamageSource, EntityRef, MeansOfDeath};

/// Damage that kills any structure or actor outright.
pub const LETHAL_DAMAGE: i32 = 10000;

/// Aliens only regenerate this long after the last damage taken.
pub const ALIEN_REGEN_DAMAGE_TIME: u32 = 2000;

/// How long a grab slows a turret down.
pub const LEVEL1_GRAB_TIME: u32 = 300;

/// Hostility penalty for destroying a friendly structure.
pub const TEAMKILL_PENALTY: i32 = 15;

/// Blocked spawns push the blocker away after this long.
pub const SPAWN_BLOCK_PUSH_TIME: u32 = 5000;

/// Blocked spawns kill the blocker after this long.
pub const SPAWN_BLOCK_KILL_TIME: u32 = 10000;

/// Think, pain, die, use and touch callbacks of one archetype.
///
/// Every callback defaults to doing nothing so an archetype only overrides
/// what it reacts to.
pub trait Behavior: Sync {
    /// Steady-state think, called when `next_think` comes due.
    fn think(&self, _ctx: &mut Ctx<'_>, _id: StructureId) {}

    /// Called after non-lethal damage.
    fn pain(&self, _ctx: &mut Ctx<'_>, _id: StructureId, _attacker: Option<EntityRef>, _amount: i32) {}

    /// Called once when health reaches zero.
    fn die(&self, ctx: &mut Ctx<'_>, id: StructureId, attacker: Option<EntityRef>);

    /// Called when an actor uses the structure.
    fn activate(&self, _ctx: &mut Ctx<'_>, _id: StructureId, _actor: ActorId) {}

    /// Called when an actor touches the structure.
    fn touch(&self, _ctx: &mut Ctx<'_>, _id: StructureId, _actor: ActorId) {}
}

/// The behavior bound to `archetype`.
#[must_use]
pub fn behavior_for(archetype: Archetype) -> &'static dyn Behavior {
    match archetype {
        Archetype::AlienSpawn => &alien::Egg,
        Archetype::Barricade => &alien::Barricade,
        Archetype::Booster => &alien::Booster,
        Archetype::AcidTube => &alien::AcidTube,
        Archetype::Hive => &alien::Hive,
        Archetype::Trapper => &alien::Trapper,
        Archetype::Overmind => &alien::Overmind,
        Archetype::Hovel => &alien::Hovel,
        Archetype::HumanSpawn => &human::Telenode,
        Archetype::MgTurret => &human::MgTurret,
        Archetype::TeslaGen => &human::TeslaGen,
        Archetype::Armoury => &human::Armoury,
        Archetype::Dcc => &human::Dcc,
        Archetype::Medistat => &human::Medistat,
        Archetype::Reactor => &human::Reactor,
        Archetype::Repeater => &human::Repeater,
    }
}

/// Run whatever think the structure's phase selects.
pub fn run_think(ctx: &mut Ctx<'_>, id: StructureId) {
    let Some(s) = ctx.get_mut(id) else {
        return;
    };
    s.next_think = None;
    let (phase, archetype) = (s.phase, s.archetype);

    match phase {
        Phase::Operating => behavior_for(archetype).think(ctx, id),
        Phase::Reverting => construction::revert_think(ctx, id),
        Phase::AwaitingBlast | Phase::Melting | Phase::Receding | Phase::Vanishing => {
            decay::advance(ctx, id);
        }
    }
}

/// General per-tick step shared by every structure.
///
/// Finishes construction when the build time has passed, grows health
/// while building, regenerates alien health out of combat and fires world
/// triggers the structure overlaps.
pub fn frame(ctx: &mut Ctx<'_>, id: StructureId, msec: u32) {
    let now = ctx.now();
    let Some(s) = ctx.structures.get(id) else {
        return;
    };
    let row = ctx.table.get(s.archetype);
    let (build_time, regen, growth) = (row.build_time, row.regen, row.growth_per_second());

    let Some(s) = ctx.structures.get_mut(id) else {
        return;
    };
    if s.phase.is_dying() {
        return;
    }

    if !s.spawned && s.is_alive() && s.build_time + build_time < now {
        s.spawned = true;
        tracing::debug!(time = now, structure = ?id, archetype = %s.archetype, "Construction finished");
    }

    s.second_accumulator += msec;
    if s.second_accumulator >= 1000 {
        s.second_accumulator -= 1000;
        if !s.spawned && s.is_alive() {
            s.health.heal(growth);
        } else if s.faction() == Faction::Aliens
            && s.is_alive()
            && !s.health.is_full()
            && regen > 0
            && s.last_damage_time + ALIEN_REGEN_DAMAGE_TIME < now
        {
            s.health.heal(regen);
        }
    }

    if s.spawned && s.is_alive() {
        let bounds = s.bounds();
        ctx.world.touch_triggers(id, bounds);
    }
}

/// Kill a structure outright.
pub fn suicide(ctx: &mut Ctx<'_>, id: StructureId) {
    damage_structure(ctx, id, LETHAL_DAMAGE, None);
}

/// Attacking actor behind a damage source, if any.
pub(crate) fn attacking_actor(ctx: &Ctx<'_>, attacker: Option<EntityRef>) -> Option<ActorSnapshot> {
    match attacker {
        Some(EntityRef::Actor(a)) => ctx.actor(a),
        _ => None,
    }
}

/// Log a death, emit the destroyed event and settle teammate kills.
pub(crate) fn record_death(ctx: &mut Ctx<'_>, id: StructureId, attacker: Option<EntityRef>) {
    let Some(s) = ctx.get(id) else {
        return;
    };
    let (archetype, faction) = (s.archetype, s.faction());
    let player = attacking_actor(ctx, attacker);

    let fate = match &player {
        Some(a) if a.faction == faction => BuildFate::TeamKilled,
        _ => BuildFate::Destroyed,
    };
    let actor = player.as_ref().map_or(BuildActor::World, |a| BuildActor::Player {
        id: a.id,
        name: a.name.clone(),
    });

    let log_id = ctx.history.next_id();
    let record = ctx
        .get(id)
        .map(|s| BuildRecord::of(s, Some(log_id), actor, fate));
    if let Some(record) = record {
        ctx.history.push(record);
    }
    ctx.level.recalculate(ctx.structures, ctx.table, ctx.config);

    ctx.emit(BuildableEvent::Destroyed {
        structure: id,
        archetype,
        fate,
    });

    if let (BuildFate::TeamKilled, Some(a)) = (fate, &player) {
        tracing::info!(structure = ?id, %archetype, attacker = %a.name, "Destroyed by teammate");
        ctx.team_message(
            faction,
            format!("{} DESTROYED by teammate {}", archetype.display_name(), a.name),
        );
        ctx.world.add_penalty(a.id, TEAMKILL_PENALTY);
    }
}

/// Tell a core's team that a teammate is shooting it.
pub(crate) fn teammate_damage_notice(ctx: &mut Ctx<'_>, id: StructureId, attacker: Option<EntityRef>) {
    let Some(s) = ctx.get(id) else {
        return;
    };
    if !s.archetype.is_core() || !s.is_alive() {
        return;
    }
    let (archetype, faction) = (s.archetype, s.faction());
    if let Some(a) = attacking_actor(ctx, attacker).filter(|a| a.faction == faction) {
        ctx.team_message(
            faction,
            format!("{} DAMAGED by TEAMMATE {}", archetype.display_name(), a.name),
        );
    }
}

/// Switch a dead structure into its first decay phase.
pub(crate) fn begin_decay(ctx: &mut Ctx<'_>, id: StructureId, phase: Phase, delay: u32) {
    let now = ctx.now();
    if let Some(s) = ctx.get_mut(id) {
        s.phase = phase;
        s.next_think = Some(now + delay);
        s.target = None;
    }
}

/// Hostile, targetable actors inside the box of half-extent `range`.
pub(crate) fn hostiles_in_box(ctx: &Ctx<'_>, origin: Vec3, range: f32, faction: Faction) -> Vec<ActorSnapshot> {
    ctx.world
        .entities_in_box(Aabb::around(origin, range))
        .into_iter()
        .filter_map(|e| match e {
            EntityRef::Actor(a) => ctx.world.actor(a),
            _ => None,
        })
        .filter(|a| targetable(ctx, a, faction))
        .collect()
}

/// Keep a spawn's exit clear.
///
/// Structures in the way are destroyed, world geometry destroys the spawn
/// itself and actors are pushed and eventually killed when anti spawn-block
/// is enabled. Corpses are removed. Returns `false` if the spawn died.
pub(crate) fn guard_spawn_exit(ctx: &mut Ctx<'_>, id: StructureId) -> bool {
    let now = ctx.now();
    let Some(s) = ctx.get(id) else {
        return false;
    };
    if !s.spawned || !s.grounded {
        return true;
    }
    let (origin, normal, archetype) = (s.origin, s.normal, s.archetype);

    let blocker = match check_spawn_point(ctx, Some(EntityRef::Structure(id)), origin, normal, archetype) {
        SpawnExit::Clear(_) => {
            if let Some(s) = ctx.get_mut(id) {
                s.spawn_block_since = 0;
            }
            return true;
        }
        SpawnExit::Blocked(blocker) => blocker,
    };

    match blocker {
        EntityRef::Structure(other) => {
            tracing::debug!(time = now, structure = ?id, blocker = ?other, "Spawn exit blocked by structure");
            damage_structure(ctx, other, LETHAL_DAMAGE, None);
        }
        EntityRef::World | EntityRef::Mover(_) => {
            tracing::debug!(time = now, structure = ?id, "Spawn exit blocked by world");
            suicide(ctx, id);
            return false;
        }
        EntityRef::Actor(actor) => {
            let strength = ctx.config.anti_spawn_block;
            if strength > 0 {
                repel_blocker(ctx, id, actor, strength);
            }
        }
        EntityRef::Corpse(corpse) => ctx.world.free_corpse(corpse),
    }
    true
}

fn repel_blocker(ctx: &mut Ctx<'_>, id: StructureId, actor: ActorId, strength: u32) {
    let now = ctx.now();
    let Some(since) = ctx.get(id).map(|s| s.spawn_block_since) else {
        return;
    };

    if since != 0 && now - since > SPAWN_BLOCK_KILL_TIME {
        ctx.world.damage_actor(
            actor,
            LETHAL_DAMAGE,
            DamageSource {
                structure: Some(id),
                means: MeansOfDeath::SpawnBlock,
            },
        );
        if let Some(s) = ctx.get_mut(id) {
            s.spawn_block_since += 2000;
        }
    } else if since != 0 && now - since > SPAWN_BLOCK_PUSH_TIME {
        let strength = strength as f32;
        let push = Vec3::new(
            ctx.rng.gen_range(-1.0..=1.0) * strength,
            ctx.rng.gen_range(-1.0..=1.0) * strength,
            strength,
        );
        ctx.world.add_velocity(actor, push);
        ctx.notify(actor, Notice::SpawnBlocking);
    } else if since == 0 {
        if let Some(s) = ctx.get_mut(id) {
            s.spawn_block_since = now;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_archetype_has_a_behavior() {
        for archetype in Archetype::ALL {
            let _ = behavior_for(archetype);
        }
    }
}
