//! Alien structures.
//!
//! Every alien structure except the core and the eggs needs creep under it
//! and dies when the creep goes away. The overmind powers the base; without
//! it structures stop attacking.

use crate::archetype::Archetype;
use crate::combat::{clear_line, from_structure, selective_radius_damage, targetable, visible};
use crate::context::Ctx;
use crate::events::{BuildableEvent, GlobalAlert, Notice, Weapon};
use crate::faction::Faction;
use crate::math::{vec_to_angles, Aabb, Vec3, ROLL};
use crate::network;
use crate::placement::{hovel_blocked, shelter_exit};
use crate::structure::{Phase, StructureId};
use crate::world::{ActorId, ActorSnapshot, EntityRef, MeansOfDeath, StatusEffect, TraceMask};

use super::decay::{alien_die, alien_splash, alien_splash_as, make_inert, DECAY_STEP};
use super::{
    begin_decay, guard_spawn_exit, hostiles_in_box, record_death, suicide, teammate_damage_notice,
    Behavior,
};

/// Spawn-alert cooldown of the overmind.
pub const OVERMIND_SPAWNS_PERIOD: u32 = 30000;

/// Dying-alert cooldown of the overmind.
pub const OVERMIND_DYING_PERIOD: u32 = 5000;

/// Attack-alert cooldown of the overmind.
pub const OVERMIND_ATTACK_PERIOD: u32 = 10000;

/// Barricades shrink to this share of their height.
pub const BARRICADE_SHRINKPROP: f32 = 0.25;

/// A shrunk barricade stays down at least this long.
pub const BARRICADE_SHRINKTIMEOUT: u32 = 500;

/// Step height used by the barricade pass-over test.
pub const STEPSIZE: f32 = 18.0;

/// Speed of the trapper's lock blob.
pub const LOCKBLOB_SPEED: f32 = 650.0;

/// Minimum cosine between a trapper's normal and its target.
pub const LOCKBLOB_DOT: f32 = 0.85;

/// Intercept search resolution in milliseconds.
pub const TRAPPER_ACCURACY: i32 = 10;

/// How far above a hovel its occupant is kept.
const HOVEL_OCCUPANT_LIFT: f32 = 128.0;

/// Refresh the powered flag and apply the creep rule.
///
/// Returns `false` if the structure died for lack of creep.
fn creep_or_die(ctx: &mut Ctx<'_>, id: StructureId) -> bool {
    let powered = network::is_core_built(ctx.structures, Faction::Aliens);
    if let Some(s) = ctx.get_mut(id) {
        s.powered = powered;
    }
    if network::find_creep(ctx.structures, ctx.table, id) {
        return true;
    }
    tracing::debug!(time = ctx.now(), structure = ?id, "No creep, dying");
    suicide(ctx, id);
    false
}

fn reschedule(ctx: &mut Ctx<'_>, id: StructureId) {
    let Some(archetype) = ctx.get(id).map(|s| s.archetype) else {
        return;
    };
    let at = ctx.now() + ctx.data(archetype).think_interval;
    ctx.schedule(id, at);
}

fn friendly(actor: &ActorSnapshot) -> bool {
    actor.is_alive() && !actor.is_spectator() && !actor.is_hostile_to(Faction::Aliens)
}

// ============================================================================
// Egg
// ============================================================================

/// Alien spawn point.
pub struct Egg;

impl Behavior for Egg {
    fn think(&self, ctx: &mut Ctx<'_>, id: StructureId) {
        if !guard_spawn_exit(ctx, id) {
            return;
        }
        network::creep_slow(ctx, id);
        reschedule(ctx, id);
    }

    fn die(&self, ctx: &mut Ctx<'_>, id: StructureId, attacker: Option<EntityRef>) {
        alien_die(ctx, id, attacker);
    }
}

// ============================================================================
// Overmind
// ============================================================================

/// Alien core.
pub struct Overmind;

impl Behavior for Overmind {
    fn think(&self, ctx: &mut Ctx<'_>, id: StructureId) {
        let now = ctx.now();
        let Some(s) = ctx.get(id) else {
            return;
        };
        let (origin, active) = (s.origin, s.is_active());
        let row = ctx.data(Archetype::Overmind);
        let (range, damage, radius) = (row.range, row.splash_damage, row.splash_radius);

        if active {
            for _ in hostiles_in_box(ctx, origin, range, Faction::Aliens) {
                if let Some(s) = ctx.get_mut(id) {
                    s.timestamp = now;
                }
                selective_radius_damage(
                    ctx,
                    origin,
                    from_structure(id, MeansOfDeath::Overmind),
                    damage,
                    radius,
                    Faction::Aliens,
                );
            }
            self.alerts(ctx, id);
        } else if let Some(s) = ctx.get_mut(id) {
            s.spawns_alert_at = now + OVERMIND_SPAWNS_PERIOD;
        }

        network::creep_slow(ctx, id);
        reschedule(ctx, id);
    }

    fn pain(&self, ctx: &mut Ctx<'_>, id: StructureId, attacker: Option<EntityRef>, _amount: i32) {
        teammate_damage_notice(ctx, id, attacker);
    }

    fn die(&self, ctx: &mut Ctx<'_>, id: StructureId, attacker: Option<EntityRef>) {
        alien_die(ctx, id, attacker);
    }
}

impl Overmind {
    fn alerts(&self, ctx: &mut Ctx<'_>, id: StructureId) {
        let now = ctx.now();
        let spawns = ctx.level.alien_spawns;
        if spawns > 0 {
            ctx.level.overmind_muted = false;
        }

        let Some(s) = ctx.get(id) else {
            return;
        };
        let spawns_due = !ctx.level.overmind_muted && spawns <= 0 && now > s.spawns_alert_at;
        let dying_due =
            (s.health.current as f32) < s.health.max as f32 / 10.0 && now > s.dying_alert_at;
        let attack_due = s.health.current < s.last_health && now > s.attack_alert_at;
        let health = s.health.current;

        if spawns_due {
            if let Some(s) = ctx.get_mut(id) {
                s.spawns_alert_at = now + OVERMIND_SPAWNS_PERIOD;
            }
            ctx.broadcast(GlobalAlert::OvermindSpawns);
            let have_builder = ctx
                .world
                .actors()
                .iter()
                .any(|a| a.faction == Faction::Aliens && a.is_alive() && a.is_builder);
            if !have_builder {
                ctx.level.overmind_muted = true;
            }
        }
        if dying_due {
            if let Some(s) = ctx.get_mut(id) {
                s.dying_alert_at = now + OVERMIND_DYING_PERIOD;
            }
            ctx.broadcast(GlobalAlert::OvermindDying);
        }
        if attack_due {
            if let Some(s) = ctx.get_mut(id) {
                s.attack_alert_at = now + OVERMIND_ATTACK_PERIOD;
            }
            ctx.broadcast(GlobalAlert::OvermindAttack);
        }
        if let Some(s) = ctx.get_mut(id) {
            s.last_health = health;
        }
    }
}

// ============================================================================
// Barricade
// ============================================================================

/// Alien wall that lets friends step over it.
pub struct Barricade;

impl Barricade {
    /// Shrink or try to restore a barricade.
    ///
    /// Dead or unfinished barricades always shrink. Restoring waits for the
    /// shrink timeout and only happens when the full box is free.
    pub fn shrink(ctx: &mut Ctx<'_>, id: StructureId, shrink: bool) {
        let now = ctx.now();
        let stock_maxs = ctx.data(Archetype::Barricade).maxs;
        let stock_mins = ctx.data(Archetype::Barricade).mins;
        let shrunk_height = (stock_maxs.z * BARRICADE_SHRINKPROP).trunc();

        let Some(s) = ctx.get_mut(id) else {
            return;
        };
        let shrink = shrink || !s.is_active();

        if shrink && s.shrunk {
            s.shrink_time = now;
            return;
        }
        if !shrink && (!s.shrunk || now < s.shrink_time + BARRICADE_SHRINKTIMEOUT) {
            return;
        }

        s.mins = stock_mins;
        s.maxs = stock_maxs;

        if shrink {
            s.maxs.z = shrunk_height;
            s.shrunk = true;
            s.shrink_time = now;
        } else {
            let (origin, mins, maxs) = (s.origin, s.mins, s.maxs);
            let tr = ctx.world.trace(
                origin,
                mins,
                maxs,
                origin,
                Some(EntityRef::Structure(id)),
                TraceMask::PlayerSolid,
            );
            let Some(s) = ctx.get_mut(id) else {
                return;
            };
            if tr.hit() {
                s.maxs.z = shrunk_height;
                return;
            }
            s.shrunk = false;
            s.shrink_time = 0;
        }

        if ctx.get(id).is_some_and(|s| s.spawned) {
            ctx.link(id);
        }
    }
}

impl Behavior for Barricade {
    fn think(&self, ctx: &mut Ctx<'_>, id: StructureId) {
        if !creep_or_die(ctx, id) {
            return;
        }
        network::creep_slow(ctx, id);
        reschedule(ctx, id);
        let powered = ctx.get(id).is_some_and(|s| s.powered);
        Self::shrink(ctx, id, !powered);
    }

    fn die(&self, ctx: &mut Ctx<'_>, id: StructureId, attacker: Option<EntityRef>) {
        alien_die(ctx, id, attacker);
        Self::shrink(ctx, id, true);
    }

    fn touch(&self, ctx: &mut Ctx<'_>, id: StructureId, actor: ActorId) {
        let Some(a) = ctx.actor(actor) else {
            return;
        };
        if a.is_hostile_to(Faction::Aliens) {
            return;
        }
        let Some(s) = ctx.get(id) else {
            return;
        };
        let feet = a.origin.z + a.mins.z;
        let threshold = s.origin.z - STEPSIZE + (s.maxs.z * BARRICADE_SHRINKPROP).trunc();
        if feet < threshold {
            return;
        }
        Self::shrink(ctx, id, true);
    }
}

// ============================================================================
// Booster
// ============================================================================

/// Grants a timed boost to nearby friends.
pub struct Booster;

impl Behavior for Booster {
    fn think(&self, ctx: &mut Ctx<'_>, id: StructureId) {
        if !creep_or_die(ctx, id) {
            return;
        }
        network::creep_slow(ctx, id);
        reschedule(ctx, id);

        let Some(s) = ctx.get(id) else {
            return;
        };
        if !s.is_active() || !s.powered {
            return;
        }
        let origin = s.origin;
        let range = ctx.data(Archetype::Booster).range;

        let view: &Ctx<'_> = ctx;
        let boosted: Vec<ActorId> = view
            .world
            .entities_in_box(Aabb::around(origin, range))
            .into_iter()
            .filter_map(|e| match e {
                EntityRef::Actor(a) => view.world.actor(a),
                _ => None,
            })
            .filter(|a| friendly(a) && a.origin.distance(origin) <= range && visible(view, id, a))
            .map(|a| a.id)
            .collect();

        let now = ctx.now();
        for actor in boosted {
            ctx.world.apply_status(actor, StatusEffect::Boosted, now);
        }
    }

    fn die(&self, ctx: &mut Ctx<'_>, id: StructureId, attacker: Option<EntityRef>) {
        alien_die(ctx, id, attacker);
    }

    fn touch(&self, ctx: &mut Ctx<'_>, id: StructureId, actor: ActorId) {
        if !ctx.get(id).is_some_and(|s| s.is_active()) {
            return;
        }
        if !network::find_core(ctx.structures, id) {
            return;
        }
        if ctx.actor(actor).is_some_and(|a| friendly(&a)) {
            let now = ctx.now();
            ctx.world.apply_status(actor, StatusEffect::Boosted, now);
        }
    }
}

// ============================================================================
// Acid tube
// ============================================================================

/// Sprays acid on enemies for a fixed time once one comes close.
pub struct AcidTube;

impl AcidTube {
    fn spray(ctx: &mut Ctx<'_>, id: StructureId) {
        let now = ctx.now();
        let Some(s) = ctx.get(id) else {
            return;
        };
        if s.spawned {
            let interval = ctx.data(Archetype::AcidTube).fire_interval;
            if let Some(s) = ctx.get_mut(id) {
                s.active = s.timestamp + interval > now;
            }
            alien_splash_as(ctx, id, MeansOfDeath::AcidTube);
        }
        network::creep_slow(ctx, id);
        reschedule(ctx, id);
    }
}

impl Behavior for AcidTube {
    fn think(&self, ctx: &mut Ctx<'_>, id: StructureId) {
        if ctx.get(id).is_some_and(|s| s.active) {
            Self::spray(ctx, id);
            return;
        }
        if !creep_or_die(ctx, id) {
            return;
        }

        let now = ctx.now();
        let Some(s) = ctx.get(id) else {
            return;
        };
        let (origin, normal, spawned) = (s.origin, s.normal, s.spawned);
        let range = ctx.data(Archetype::AcidTube).range;

        if spawned && network::find_core(ctx.structures, id) {
            let view: &Ctx<'_> = ctx;
            let trigger = hostiles_in_box(view, origin, range, Faction::Aliens)
                .into_iter()
                .find(|a| !a.paused && visible(view, id, a));
            if trigger.is_some() {
                if let Some(s) = ctx.get_mut(id) {
                    s.timestamp = now;
                    s.active = true;
                }
                ctx.emit(BuildableEvent::AcidSpray {
                    structure: id,
                    normal,
                });
                ctx.schedule(id, now + 100);
                return;
            }
        }

        network::creep_slow(ctx, id);
        reschedule(ctx, id);
    }

    fn die(&self, ctx: &mut Ctx<'_>, id: StructureId, attacker: Option<EntityRef>) {
        alien_die(ctx, id, attacker);
    }
}

// ============================================================================
// Hive
// ============================================================================

/// Launches one swarm at a target, then waits for it to return.
pub struct Hive;

impl Behavior for Hive {
    fn think(&self, ctx: &mut Ctx<'_>, id: StructureId) {
        let now = ctx.now();
        reschedule(ctx, id);
        if !creep_or_die(ctx, id) {
            return;
        }

        let Some(s) = ctx.get_mut(id) else {
            return;
        };
        if s.timestamp < now {
            s.active = false;
        }
        let (origin, spawned, active) = (s.origin, s.spawned, s.active);
        let row = ctx.data(Archetype::Hive);
        let (range, repeat) = (row.range, row.fire_interval);

        if spawned && !active && network::find_core(ctx.structures, id) {
            let view: &Ctx<'_> = ctx;
            let target = hostiles_in_box(view, origin, range, Faction::Aliens)
                .into_iter()
                .find(|a| a.is_alive() && !a.paused && visible(view, id, a));
            if let Some(target) = target {
                let aim = (target.origin - origin).normalize_or_zero();
                if let Some(s) = ctx.get_mut(id) {
                    s.active = true;
                    s.target = Some(target.id);
                    s.timestamp = now + repeat;
                    s.turret_angles = vec_to_angles(aim);
                }
                ctx.emit(BuildableEvent::FireWeapon {
                    structure: id,
                    weapon: Weapon::Hive,
                    aim,
                    target: Some(target.id),
                });
                return;
            }
        }

        network::creep_slow(ctx, id);
    }

    fn die(&self, ctx: &mut Ctx<'_>, id: StructureId, attacker: Option<EntityRef>) {
        alien_die(ctx, id, attacker);
    }
}

// ============================================================================
// Trapper
// ============================================================================

/// Fires lock blobs at enemies in front of it.
pub struct Trapper;

/// Aim direction for a projectile of `speed` fired from `from` at `target`.
///
/// Binary searches the flight time in milliseconds until the projectile
/// distance and the distance to the extrapolated target agree within
/// [`TRAPPER_ACCURACY`]. The target moves with its velocity, half its
/// acceleration and a third of its jerk. The search window is sized by the
/// target's class top speed, or its current speed when that is unknown.
#[must_use]
pub fn predict_intercept(from: Vec3, target: &ActorSnapshot, speed: f32, range: f32) -> Vec3 {
    let target_speed = target
        .max_speed
        .unwrap_or_else(|| target.velocity.length());
    let mut low = 0i32;
    let mut high = (((range * speed + range * target_speed) / (speed * speed)) * 1000.0) as i32;

    let half_acceleration = target.acceleration * 0.5;
    let third_jerk = target.jerk / 3.0;
    let mut direction = target.origin - from;

    while high - low > TRAPPER_ACCURACY {
        let partition = (high + low) / 2;
        let time = partition as f32 / 1000.0;
        let projectile = speed * time;

        direction = target.origin
            + target.velocity * time
            + half_acceleration * (time * time)
            + third_jerk * (time * time * time)
            - from;
        let distance = direction.length();

        if projectile < distance {
            low = partition;
        } else if projectile > distance {
            high = partition;
        } else {
            break;
        }
    }

    direction.normalize_or_zero()
}

impl Trapper {
    fn check_target(ctx: &Ctx<'_>, id: StructureId, target: Option<ActorId>) -> bool {
        let Some(target) = target.and_then(|t| ctx.actor(t)) else {
            return false;
        };
        let Some(s) = ctx.get(id) else {
            return false;
        };
        let range = ctx.data(Archetype::Trapper).range;

        if !targetable(ctx, &target, Faction::Aliens)
            || target.is_spectator()
            || !target.is_alive()
            || target.blob_locked
        {
            return false;
        }
        let offset = target.origin - s.origin;
        if offset.length() > range {
            return false;
        }
        if offset.normalize_or_zero().dot(s.normal) < LOCKBLOB_DOT {
            return false;
        }
        clear_line(ctx, s.origin, target.origin, Some(EntityRef::Structure(id)))
    }

    fn find_enemy(ctx: &Ctx<'_>, id: StructureId) -> Option<ActorId> {
        ctx.world
            .actors()
            .into_iter()
            .map(|a| a.id)
            .find(|&a| Self::check_target(ctx, id, Some(a)))
    }
}

impl Behavior for Trapper {
    fn think(&self, ctx: &mut Ctx<'_>, id: StructureId) {
        let now = ctx.now();
        network::creep_slow(ctx, id);
        reschedule(ctx, id);
        if !creep_or_die(ctx, id) {
            return;
        }

        let Some(s) = ctx.get(id) else {
            return;
        };
        if !s.spawned || !network::find_core(ctx.structures, id) {
            return;
        }

        let current = ctx.get(id).and_then(|s| s.target);
        let target = if Self::check_target(ctx, id, current) {
            current
        } else {
            Self::find_enemy(ctx, id)
        };
        if let Some(s) = ctx.get_mut(id) {
            s.target = target;
        }

        let Some(target) = target.and_then(|t| ctx.actor(t)) else {
            return;
        };
        let Some(s) = ctx.get(id) else {
            return;
        };
        if s.next_fire >= now {
            return;
        }
        let origin = s.origin;
        let row = ctx.data(Archetype::Trapper);
        let (range, interval) = (row.range, row.fire_interval);

        let aim = predict_intercept(origin, &target, LOCKBLOB_SPEED, range);
        if let Some(s) = ctx.get_mut(id) {
            s.turret_angles = vec_to_angles(aim);
            s.next_fire = now + interval;
        }
        ctx.emit(BuildableEvent::FireWeapon {
            structure: id,
            weapon: Weapon::LockBlob,
            aim,
            target: Some(target.id),
        });
    }

    fn die(&self, ctx: &mut Ctx<'_>, id: StructureId, attacker: Option<EntityRef>) {
        alien_die(ctx, id, attacker);
    }
}

// ============================================================================
// Hovel
// ============================================================================

/// Shelter a builder can hide in.
pub struct Hovel;

impl Hovel {
    /// Let the occupant out.
    ///
    /// Returns `false` and tells the occupant when the exit is blocked.
    pub fn leave(ctx: &mut Ctx<'_>, id: StructureId, actor: ActorId) -> bool {
        let Some(s) = ctx.get(id) else {
            return false;
        };
        if s.occupant != Some(actor) {
            return false;
        }
        let (origin, angles, normal) = (s.origin, s.angles, s.normal);
        let Some(snapshot) = ctx.actor(actor) else {
            return false;
        };

        match shelter_exit(ctx, origin, angles, normal, &snapshot) {
            Some(exit) if !exit.blocked => {
                ctx.world.teleport(actor, exit.origin, exit.angles);
                ctx.world.add_velocity(actor, exit.velocity);
                ctx.world.clear_status(actor, StatusEffect::Sheltered);
                if let Some(s) = ctx.get_mut(id) {
                    s.active = false;
                    s.occupant = None;
                }
                true
            }
            _ => {
                ctx.notify(actor, Notice::HovelBlocked);
                false
            }
        }
    }
}

impl Behavior for Hovel {
    fn think(&self, ctx: &mut Ctx<'_>, id: StructureId) {
        let powered = network::is_core_built(ctx.structures, Faction::Aliens);
        if let Some(s) = ctx.get_mut(id) {
            s.powered = powered;
        }
        network::creep_slow(ctx, id);
        reschedule(ctx, id);
    }

    fn die(&self, ctx: &mut Ctx<'_>, id: StructureId, attacker: Option<EntityRef>) {
        record_death(ctx, id, attacker);
        alien_splash(ctx, id);

        let Some(s) = ctx.get(id) else {
            return;
        };
        let (origin, normal, mut angles, occupant) = (s.origin, s.normal, s.angles, s.occupant);
        ctx.emit(BuildableEvent::Explosion {
            structure: id,
            origin,
            normal,
        });
        make_inert(ctx, id);
        begin_decay(ctx, id, Phase::Melting, DECAY_STEP);

        if let Some(actor) = occupant {
            angles[ROLL] = 0.0;
            ctx.world.teleport(actor, origin + normal, angles);
            ctx.world.clear_status(actor, StatusEffect::Sheltered);
        }
        if let Some(s) = ctx.get_mut(id) {
            s.active = false;
            s.occupant = None;
        }
    }

    fn activate(&self, ctx: &mut Ctx<'_>, id: StructureId, actor: ActorId) {
        let Some(s) = ctx.get(id) else {
            return;
        };
        if !s.spawned || !network::find_core(ctx.structures, id) {
            return;
        }
        let Some(s) = ctx.get(id) else {
            return;
        };
        let (origin, angles, normal, occupied, alive) =
            (s.origin, s.angles, s.normal, s.active, s.is_alive());

        if occupied {
            ctx.notify(actor, Notice::HovelOccupied);
            return;
        }
        let Some(snapshot) = ctx.actor(actor) else {
            return;
        };
        if !snapshot.is_builder || !snapshot.is_alive() || !alive {
            return;
        }
        if hovel_blocked(ctx, origin, angles, normal, &snapshot) {
            ctx.notify(actor, Notice::HovelBlocked);
            return;
        }

        if let Some(s) = ctx.get_mut(id) {
            s.active = true;
            s.occupant = Some(actor);
        }
        let now = ctx.now();
        ctx.world.apply_status(actor, StatusEffect::Sheltered, now);
        ctx.world.teleport(
            actor,
            origin + normal * HOVEL_OCCUPANT_LIFT,
            vec_to_angles(-normal),
        );
    }
}
