//! Die transitions and the decay sequence.
//!
//! A dead structure waits for its blast, blasts, then either melts,
//! recedes or vanishes before it is removed. Each step is a phase think
//! scheduled through `next_think`.

use crate::archetype::Archetype;
use crate::combat::{from_structure, radius_damage, selective_radius_damage};
use crate::construction::remove_structure;
use crate::context::Ctx;
use crate::events::BuildableEvent;
use crate::faction::Faction;
use crate::math::UP;
use crate::structure::{Phase, StructureId};
use crate::world::{EntityRef, MeansOfDeath};

use super::{begin_decay, record_death};

/// Delay between death and blast for spawned structures.
pub const DETONATION_DELAY: u32 = 5000;

/// Step between melt and recede ticks.
pub const DECAY_STEP: u32 = 500;

/// How long melting and receding last after the blast.
pub const DECAY_DURATION: u32 = 10000;

/// Delay between vanishing and removal.
pub const VANISH_DELAY: u32 = 100;

/// Die transition shared by alien structures.
pub fn alien_die(ctx: &mut Ctx<'_>, id: StructureId, attacker: Option<EntityRef>) {
    record_death(ctx, id, attacker);
    let spawned = ctx.get(id).is_some_and(|s| s.spawned);
    let delay = if spawned { DETONATION_DELAY } else { 0 };
    begin_decay(ctx, id, Phase::AwaitingBlast, delay);
}

/// Die transition shared by human structures.
///
/// The structure stops providing power at once. Unfinished structures
/// vanish without a blast.
pub fn human_die(ctx: &mut Ctx<'_>, id: StructureId, attacker: Option<EntityRef>) {
    record_death(ctx, id, attacker);
    let Some(s) = ctx.get_mut(id) else {
        return;
    };
    s.powered = false;
    s.protected = false;
    s.target = None;
    let spawned = s.spawned;

    if spawned {
        begin_decay(ctx, id, Phase::AwaitingBlast, DETONATION_DELAY);
    } else {
        make_inert(ctx, id);
        vanish_after(ctx, id, VANISH_DELAY);
    }
}

/// Run the decay step the structure's phase selects.
pub fn advance(ctx: &mut Ctx<'_>, id: StructureId) {
    let Some(phase) = ctx.get(id).map(|s| s.phase) else {
        return;
    };
    match phase {
        Phase::AwaitingBlast => blast(ctx, id),
        Phase::Melting => shrink_creep(ctx, id, true),
        Phase::Receding => shrink_creep(ctx, id, false),
        Phase::Vanishing => remove_structure(ctx, id),
        Phase::Operating | Phase::Reverting => {}
    }
}

/// Stop colliding and tell the spatial index.
pub(crate) fn make_inert(ctx: &mut Ctx<'_>, id: StructureId) {
    let now = ctx.now();
    if let Some(s) = ctx.get_mut(id) {
        s.solid = false;
        s.timestamp = now;
    }
    ctx.link(id);
}

fn vanish_after(ctx: &mut Ctx<'_>, id: StructureId, delay: u32) {
    let now = ctx.now();
    if let Some(s) = ctx.get_mut(id) {
        s.phase = Phase::Vanishing;
        s.next_think = Some(now + delay);
    }
}

/// Alien splash sparing aliens, from the structure's own table row.
pub(crate) fn alien_splash(ctx: &mut Ctx<'_>, id: StructureId) {
    let Some(archetype) = ctx.get(id).map(|s| s.archetype) else {
        return;
    };
    alien_splash_as(ctx, id, MeansOfDeath::Blast(archetype));
}

/// [`alien_splash`] credited to `means`.
pub(crate) fn alien_splash_as(ctx: &mut Ctx<'_>, id: StructureId, means: MeansOfDeath) {
    let Some(s) = ctx.get(id) else {
        return;
    };
    let origin = s.origin;
    let row = ctx.data(s.archetype);
    let (damage, radius) = (row.splash_damage, row.splash_radius);
    selective_radius_damage(
        ctx,
        origin,
        from_structure(id, means),
        damage,
        radius,
        Faction::Aliens,
    );
}

fn blast(ctx: &mut Ctx<'_>, id: StructureId) {
    let Some(s) = ctx.get(id) else {
        return;
    };
    let (origin, normal, archetype) = (s.origin, s.normal, s.archetype);
    tracing::debug!(time = ctx.now(), structure = ?id, %archetype, "Blast");

    if archetype.faction() == Faction::Humans {
        ctx.emit(BuildableEvent::Explosion {
            structure: id,
            origin,
            normal: UP,
        });
        let row = ctx.data(archetype);
        let (damage, radius) = (row.splash_damage, row.splash_radius);
        make_inert(ctx, id);
        radius_damage(
            ctx,
            origin,
            from_structure(id, MeansOfDeath::Blast(archetype)),
            damage,
            radius,
        );
        vanish_after(ctx, id, VANISH_DELAY);
        return;
    }

    alien_splash(ctx, id);
    ctx.emit(BuildableEvent::Explosion {
        structure: id,
        origin,
        normal,
    });
    make_inert(ctx, id);

    let next = if matches!(archetype, Archetype::AlienSpawn | Archetype::Overmind) {
        Phase::Melting
    } else {
        Phase::Receding
    };
    begin_decay(ctx, id, next, DECAY_STEP);
}

fn shrink_creep(ctx: &mut Ctx<'_>, id: StructureId, melting: bool) {
    if melting {
        alien_splash(ctx, id);
    }
    let now = ctx.now();
    let Some(s) = ctx.get_mut(id) else {
        return;
    };
    if s.timestamp + DECAY_DURATION > now {
        s.next_think = Some(now + DECAY_STEP);
    } else {
        remove_structure(ctx, id);
    }
}
