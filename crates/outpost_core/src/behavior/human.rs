//! Human structures.
//!
//! Human structures need power from the reactor or a repeater to do
//! anything. Spawns and the reactor work without it.

use crate::archetype::Archetype;
use crate::combat::{from_structure, selective_radius_damage};
use crate::context::Ctx;
use crate::events::{BuildableEvent, GlobalAlert, Notice, Weapon};
use crate::faction::Faction;
use crate::math::{
    angle_normalize_180, angle_subtract, angle_vectors, rotate_point_around_vector, vec_to_angles,
    Aabb, Vec3, PITCH, UP, YAW,
};
use crate::network::{self, POWER_REFRESH};
use crate::structure::StructureId;
use crate::world::{ActorId, ActorSnapshot, EntityRef, Item, MeansOfDeath, StatusEffect, TraceMask};

use super::decay::human_die;
use super::{guard_spawn_exit, hostiles_in_box, suicide, teammate_damage_notice, Behavior};

/// Turret turn rate in degrees per think.
pub const MGTURRET_ANGULARSPEED: f32 = 8.0;

/// Turret turn rate with a defense computer.
pub const MGTURRET_DCC_ANGULARSPEED: f32 = 10.0;

/// Turret turn rate while grabbed.
pub const MGTURRET_GRAB_ANGULARSPEED: f32 = 3.0;

/// Turret pitch limit in degrees.
pub const MGTURRET_VERTICALCAP: f32 = 30.0;

/// Pitch an unpowered barrel sags per think.
pub const MGTURRET_DROOPSCALE: f32 = 0.5;

/// Cooldown of the human base attack alert.
pub const DCC_ATTACK_PERIOD: u32 = 10000;

/// A repeater without dependents removes itself after this long.
pub const REPEATER_INACTIVE_TIME: u32 = 90000;

/// Height above a medistat pad that counts as standing on it.
const MEDISTAT_PLAYER_HEIGHT: f32 = 60.0;

fn reschedule(ctx: &mut Ctx<'_>, id: StructureId) {
    let Some(archetype) = ctx.get(id).map(|s| s.archetype) else {
        return;
    };
    let at = ctx.now() + ctx.data(archetype).think_interval;
    ctx.schedule(id, at);
}

fn refresh_power(ctx: &mut Ctx<'_>, id: StructureId) -> bool {
    network::find_power(ctx.structures, ctx.table, id)
}

/// Raise the human base attack alert if `id` lost health since last think.
fn base_attack_alert(ctx: &mut Ctx<'_>, id: StructureId) {
    let now = ctx.now();
    let Some(s) = ctx.get(id) else {
        return;
    };
    let health = s.health.current;
    if health < s.last_health
        && now > ctx.level.human_base_attack_at
        && network::is_network_node_built(ctx.structures)
    {
        ctx.level.human_base_attack_at = now + DCC_ATTACK_PERIOD;
        ctx.broadcast(GlobalAlert::DccAttack);
    }
    if let Some(s) = ctx.get_mut(id) {
        s.last_health = health;
    }
}

fn friendly(actor: &ActorSnapshot) -> bool {
    !actor.is_spectator() && !actor.is_hostile_to(Faction::Humans)
}

// ============================================================================
// Telenode
// ============================================================================

/// Human spawn point.
pub struct Telenode;

impl Behavior for Telenode {
    fn think(&self, ctx: &mut Ctx<'_>, id: StructureId) {
        let Some(s) = ctx.get_mut(id) else {
            return;
        };
        s.powered = true;
        if s.spawned {
            if !guard_spawn_exit(ctx, id) {
                return;
            }
            base_attack_alert(ctx, id);
        }
        reschedule(ctx, id);
    }

    fn die(&self, ctx: &mut Ctx<'_>, id: StructureId, attacker: Option<EntityRef>) {
        human_die(ctx, id, attacker);
    }
}

// ============================================================================
// Machine gun turret
// ============================================================================

/// Tracking machine gun.
///
/// Turrets linked to a defense computer spread out: each claims its target
/// and others prefer unclaimed ones.
pub struct MgTurret;

impl MgTurret {
    fn check_target(ctx: &Ctx<'_>, id: StructureId, target: Option<ActorId>, ignore_painted: bool) -> bool {
        let Some(target) = target.and_then(|t| ctx.actor(t)) else {
            return false;
        };
        let Some(s) = ctx.get(id) else {
            return false;
        };
        let range = ctx.data(Archetype::MgTurret).range;

        if target.no_target || ctx.config.practise || target.paused || target.sheltered {
            return false;
        }
        if !target.is_alive() || s.origin.distance(target.origin) > range {
            return false;
        }

        if s.dcc && !ignore_painted {
            let claimed = ctx
                .level
                .painted
                .get(&target.id)
                .and_then(|&turret| ctx.get(turret))
                .is_some_and(|t| t.id != id && t.powered);
            if claimed {
                return false;
            }
        }

        let tr = ctx.world.trace(
            s.origin,
            Vec3::ZERO,
            Vec3::ZERO,
            target.origin,
            Some(EntityRef::Structure(id)),
            TraceMask::Shot,
        );
        match tr.entity {
            Some(EntityRef::Actor(hit)) => ctx
                .actor(hit)
                .is_some_and(|a| a.is_hostile_to(Faction::Humans)),
            _ => false,
        }
    }

    fn find_enemy(ctx: &Ctx<'_>, id: StructureId) -> Option<ActorId> {
        let s = ctx.get(id)?;
        let range = ctx.data(Archetype::MgTurret).range;
        let candidates: Vec<ActorId> = ctx
            .world
            .entities_in_box(Aabb::around(s.origin, range))
            .into_iter()
            .filter_map(|e| match e {
                EntityRef::Actor(a) => ctx.actor(a),
                _ => None,
            })
            .filter(|a| a.is_hostile_to(Faction::Humans))
            .map(|a| a.id)
            .collect();

        let first = candidates
            .iter()
            .copied()
            .find(|&a| Self::check_target(ctx, id, Some(a), false));
        if first.is_some() || !s.dcc {
            return first;
        }
        candidates
            .into_iter()
            .find(|&a| Self::check_target(ctx, id, Some(a), true))
    }

    /// Turn the barrel towards the target.
    ///
    /// Returns `true` once the barrel points at the target within tolerance.
    fn track(ctx: &mut Ctx<'_>, id: StructureId, target: &ActorSnapshot) -> bool {
        let now = ctx.now();
        let Some(s) = ctx.get_mut(id) else {
            return false;
        };
        let speed = if s.grabbed_until > now {
            MGTURRET_GRAB_ANGULARSPEED
        } else if s.dcc {
            MGTURRET_DCC_ANGULARSPEED
        } else {
            MGTURRET_ANGULARSPEED
        };
        let tolerance = speed / 1.5;

        let to_target = (target.origin - s.origin).normalize_or_zero();
        let axis = s.normal.cross(UP).normalize_or_zero();
        let rotation = s.normal.dot(UP).clamp(-1.0, 1.0).acos().to_degrees();
        let adjusted = rotate_point_around_vector(axis, to_target, rotation);
        let wanted = vec_to_angles(adjusted);

        let diff_pitch = angle_subtract(s.turret_angles[PITCH], wanted[PITCH]);
        let diff_yaw = angle_subtract(s.turret_angles[YAW], wanted[YAW]);

        s.turret_angles[PITCH] = step_towards(s.turret_angles[PITCH], wanted[PITCH], diff_pitch, speed, tolerance);

        let mut cap = s.turret_angles[PITCH].abs();
        if cap > 180.0 {
            cap -= 360.0;
        }
        if cap < -MGTURRET_VERTICALCAP {
            s.turret_angles[PITCH] = -360.0 + MGTURRET_VERTICALCAP;
        }

        s.turret_angles[YAW] = step_towards(s.turret_angles[YAW], wanted[YAW], diff_yaw, speed, tolerance);

        (wanted[YAW] - s.turret_angles[YAW]).abs() <= tolerance
            && (wanted[PITCH] - s.turret_angles[PITCH]).abs() <= tolerance
    }

    /// World-space direction of the barrel.
    fn barrel(normal: Vec3, turret_angles: Vec3) -> Vec3 {
        let axis = normal.cross(UP).normalize_or_zero();
        let rotation = normal.dot(UP).clamp(-1.0, 1.0).acos().to_degrees();
        let (local, _, _) = angle_vectors(turret_angles);
        rotate_point_around_vector(axis, local, -rotation)
    }

    fn release_paint(ctx: &mut Ctx<'_>, id: StructureId, target: Option<ActorId>) {
        if let Some(target) = target {
            if ctx.level.painted.get(&target) == Some(&id) {
                ctx.level.painted.remove(&target);
            }
        }
    }
}

fn step_towards(current: f32, wanted: f32, diff: f32, speed: f32, tolerance: f32) -> f32 {
    if diff < -tolerance {
        current + speed
    } else if diff > tolerance {
        current - speed
    } else {
        wanted
    }
}

impl Behavior for MgTurret {
    fn think(&self, ctx: &mut Ctx<'_>, id: StructureId) {
        let now = ctx.now();
        reschedule(ctx, id);

        let powered = refresh_power(ctx, id);
        let Some(s) = ctx.get_mut(id) else {
            return;
        };
        s.powered = powered;

        if !powered {
            if s.spawned {
                let droop = angle_normalize_180(s.turret_angles[PITCH]);
                if droop < MGTURRET_VERTICALCAP {
                    s.turret_angles[PITCH] = (droop + MGTURRET_DROOPSCALE).min(MGTURRET_VERTICALCAP);
                    return;
                }
            }
            ctx.schedule(id, now + POWER_REFRESH);
            return;
        }
        if !s.spawned {
            return;
        }

        let dcc = network::find_network_node(ctx.structures, id);
        if let Some(s) = ctx.get_mut(id) {
            s.dcc = dcc;
        }

        let current = ctx.get(id).and_then(|s| s.target);
        let target = if Self::check_target(ctx, id, current, false) {
            current
        } else {
            Self::release_paint(ctx, id, current);
            Self::find_enemy(ctx, id)
        };
        if let Some(s) = ctx.get_mut(id) {
            s.target = target;
        }

        let Some(target) = target.and_then(|t| ctx.actor(t)) else {
            return;
        };
        ctx.level.painted.insert(target.id, id);

        if !Self::track(ctx, id, &target) {
            return;
        }
        let Some(s) = ctx.get(id) else {
            return;
        };
        if s.next_fire >= now {
            return;
        }
        let aim = Self::barrel(s.normal, s.turret_angles);
        let row = ctx.data(Archetype::MgTurret);
        let (damage, interval) = (row.damage, row.fire_interval);

        ctx.emit(BuildableEvent::FireWeapon {
            structure: id,
            weapon: Weapon::MachineGun,
            aim,
            target: Some(target.id),
        });
        ctx.world
            .damage_actor(target.id, damage, from_structure(id, MeansOfDeath::MachineGun));
        if let Some(s) = ctx.get_mut(id) {
            s.next_fire = now + interval;
        }
    }

    fn die(&self, ctx: &mut Ctx<'_>, id: StructureId, attacker: Option<EntityRef>) {
        let target = ctx.get(id).and_then(|s| s.target);
        Self::release_paint(ctx, id, target);
        human_die(ctx, id, attacker);
    }
}

// ============================================================================
// Tesla generator
// ============================================================================

/// Zaps every enemy in range at once.
pub struct TeslaGen;

impl Behavior for TeslaGen {
    fn think(&self, ctx: &mut Ctx<'_>, id: StructureId) {
        let now = ctx.now();
        reschedule(ctx, id);

        let powered = refresh_power(ctx, id);
        let dcc = powered && network::find_network_node(ctx.structures, id);
        let Some(s) = ctx.get_mut(id) else {
            return;
        };
        s.powered = powered;
        s.dcc = dcc;
        if !powered || !dcc {
            ctx.schedule(id, now + POWER_REFRESH);
            return;
        }
        if !s.spawned || s.next_fire >= now {
            return;
        }
        let origin = s.origin;
        let row = ctx.data(Archetype::TeslaGen);
        let (range, damage, interval) = (row.range, row.damage, row.fire_interval);

        let targets: Vec<ActorId> = hostiles_in_box(ctx, origin, range, Faction::Humans)
            .into_iter()
            .filter(|a| a.is_alive() && !a.paused && a.origin.distance(origin) <= range)
            .map(|a| a.id)
            .collect();

        for &target in &targets {
            ctx.emit(BuildableEvent::TeslaTrail {
                structure: id,
                target,
            });
            ctx.world
                .damage_actor(target, damage, from_structure(id, MeansOfDeath::Tesla));
        }
        if !targets.is_empty() {
            if let Some(s) = ctx.get_mut(id) {
                s.next_fire = now + interval;
            }
        }
    }

    fn die(&self, ctx: &mut Ctx<'_>, id: StructureId, attacker: Option<EntityRef>) {
        human_die(ctx, id, attacker);
    }
}

// ============================================================================
// Armoury
// ============================================================================

/// Equipment shop.
pub struct Armoury;

impl Behavior for Armoury {
    fn think(&self, ctx: &mut Ctx<'_>, id: StructureId) {
        let now = ctx.now();
        ctx.schedule(id, now + POWER_REFRESH);
        let powered = refresh_power(ctx, id);
        if let Some(s) = ctx.get_mut(id) {
            s.powered = powered;
        }
    }

    fn die(&self, ctx: &mut Ctx<'_>, id: StructureId, attacker: Option<EntityRef>) {
        human_die(ctx, id, attacker);
    }

    fn activate(&self, ctx: &mut Ctx<'_>, id: StructureId, actor: ActorId) {
        let Some(s) = ctx.get(id) else {
            return;
        };
        if !s.spawned {
            return;
        }
        let powered = s.powered;
        if ctx.actor(actor).map_or(true, |a| a.is_hostile_to(Faction::Humans)) {
            return;
        }
        let notice = if powered {
            Notice::ArmouryMenu
        } else {
            Notice::NotPowered
        };
        ctx.notify(actor, notice);
    }
}

// ============================================================================
// Defense computer
// ============================================================================

/// Network node that upgrades turrets and enables teslas.
pub struct Dcc;

impl Behavior for Dcc {
    fn think(&self, ctx: &mut Ctx<'_>, id: StructureId) {
        let now = ctx.now();
        ctx.schedule(id, now + POWER_REFRESH);
        let powered = refresh_power(ctx, id);
        if let Some(s) = ctx.get_mut(id) {
            s.powered = powered;
        }
    }

    fn die(&self, ctx: &mut Ctx<'_>, id: StructureId, attacker: Option<EntityRef>) {
        human_die(ctx, id, attacker);
    }
}

// ============================================================================
// Medistat
// ============================================================================

/// Heals the wounded friend closest to the pad center, one at a time,
/// and hands out medkits.
pub struct Medistat;

impl Medistat {
    fn pad(origin: Vec3, mins: Vec3, maxs: Vec3) -> Aabb {
        let mut low = origin + mins;
        let mut high = origin + maxs;
        low.z += mins.z.abs() + maxs.z;
        high.z += MEDISTAT_PLAYER_HEIGHT;
        Aabb::new(low, high)
    }
}

impl Behavior for Medistat {
    fn think(&self, ctx: &mut Ctx<'_>, id: StructureId) {
        let now = ctx.now();
        reschedule(ctx, id);

        let powered = refresh_power(ctx, id);
        let Some(s) = ctx.get_mut(id) else {
            return;
        };
        s.powered = powered;
        if !powered {
            s.active = false;
            s.target = None;
            ctx.schedule(id, now + POWER_REFRESH);
            return;
        }
        if !s.spawned {
            return;
        }
        let origin = s.origin;
        let pad = Self::pad(origin, s.mins, s.maxs);
        let current = s.target;

        let view: &Ctx<'_> = ctx;
        let on_pad: Vec<ActorSnapshot> = view
            .world
            .entities_in_box(pad)
            .into_iter()
            .filter_map(|e| match e {
                EntityRef::Actor(a) => view.actor(a),
                _ => None,
            })
            .filter(friendly)
            .collect();

        let wounded = |a: &ActorSnapshot| a.is_alive() && a.health < a.max_health;
        let occupied = on_pad.iter().any(|a| Some(a.id) == current && wounded(a));

        let mut target = current;
        let mut active = ctx.get(id).is_some_and(|s| s.active);
        if !occupied {
            target = on_pad
                .iter()
                .filter(|&a| wounded(a))
                .min_by(|a, b| {
                    a.origin
                        .distance_squared(origin)
                        .total_cmp(&b.origin.distance_squared(origin))
                        .then(a.id.cmp(&b.id))
                })
                .map(|a| a.id);
            if target.is_some() {
                active = true;
            }
            for a in on_pad.iter().filter(|&a| !wounded(a) && !a.has_medkit) {
                ctx.world.give_item(a.id, Item::Medkit);
            }
        }
        if target.is_none() {
            active = false;
        }
        if let Some(s) = ctx.get_mut(id) {
            s.target = target;
            s.active = active;
        }

        let Some(patient) = target.and_then(|t| ctx.actor(t)) else {
            return;
        };
        ctx.world.clear_status(patient.id, StatusEffect::Poisoned);
        ctx.world.clear_status(patient.id, StatusEffect::MedkitActive);
        ctx.world.heal(patient.id, 1);
        if patient.health + 1 >= patient.max_health {
            if !patient.has_medkit {
                ctx.world.give_item(patient.id, Item::Medkit);
            }
            ctx.world.clear_retribution(patient.id);
        }
    }

    fn die(&self, ctx: &mut Ctx<'_>, id: StructureId, attacker: Option<EntityRef>) {
        human_die(ctx, id, attacker);
    }
}

// ============================================================================
// Reactor
// ============================================================================

/// Human core. Powers the base and zaps enemies next to it.
pub struct Reactor;

impl Behavior for Reactor {
    fn think(&self, ctx: &mut Ctx<'_>, id: StructureId) {
        let now = ctx.now();
        let Some(s) = ctx.get_mut(id) else {
            return;
        };
        s.powered = true;
        let (origin, active) = (s.origin, s.is_active());
        let row = ctx.data(Archetype::Reactor);
        let (range, damage) = (row.range, row.damage);

        if active {
            let enemies: Vec<ActorId> = hostiles_in_box(ctx, origin, range, Faction::Humans)
                .into_iter()
                .filter(|a| !a.paused)
                .map(|a| a.id)
                .collect();
            for target in enemies {
                if let Some(s) = ctx.get_mut(id) {
                    s.timestamp = now;
                }
                selective_radius_damage(
                    ctx,
                    origin,
                    from_structure(id, MeansOfDeath::Reactor),
                    damage,
                    range,
                    Faction::Humans,
                );
                ctx.emit(BuildableEvent::TeslaTrail {
                    structure: id,
                    target,
                });
            }
            base_attack_alert(ctx, id);
        }
        reschedule(ctx, id);
    }

    fn pain(&self, ctx: &mut Ctx<'_>, id: StructureId, attacker: Option<EntityRef>, _amount: i32) {
        teammate_damage_notice(ctx, id, attacker);
    }

    fn die(&self, ctx: &mut Ctx<'_>, id: StructureId, attacker: Option<EntityRef>) {
        human_die(ctx, id, attacker);
    }
}

// ============================================================================
// Repeater
// ============================================================================

/// Power relay. Removes itself when nothing depends on it for too long.
pub struct Repeater;

impl Behavior for Repeater {
    fn think(&self, ctx: &mut Ctx<'_>, id: StructureId) {
        let now = ctx.now();
        let Some(s) = ctx.get(id) else {
            return;
        };
        let powered = s.spawned && network::relay_powered(ctx.structures, ctx.table, id);
        let dependents = network::dependents(ctx.structures, id);

        let Some(s) = ctx.get_mut(id) else {
            return;
        };
        s.powered = powered;
        ctx.schedule(id, now + POWER_REFRESH);

        if dependents > 0 {
            if let Some(s) = ctx.get_mut(id) {
                s.idle_since = None;
            }
            return;
        }
        match ctx.get(id).and_then(|s| s.idle_since) {
            None => {
                if let Some(s) = ctx.get_mut(id) {
                    s.idle_since = Some(now);
                }
            }
            Some(since) if now.saturating_sub(since) > REPEATER_INACTIVE_TIME => {
                tracing::debug!(time = now, structure = ?id, "Idle repeater removing itself");
                suicide(ctx, id);
            }
            Some(_) => {}
        }
    }

    fn die(&self, ctx: &mut Ctx<'_>, id: StructureId, attacker: Option<EntityRef>) {
        human_die(ctx, id, attacker);
    }

    fn activate(&self, ctx: &mut Ctx<'_>, id: StructureId, actor: ActorId) {
        if ctx.get(id).is_some_and(|s| s.is_active()) {
            ctx.world.give_item(actor, Item::FullAmmo);
        }
    }
}
