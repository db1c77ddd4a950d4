//! Placement validation.
//!
//! [`validate`] positions a requested structure in front of the builder,
//! runs every surface, permission, network, territory, uniqueness and
//! budget rule, and returns a [`PlacementVerdict`]. Rejections are values,
//! not errors: the caller maps them onto player notices.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::archetype::Archetype;
use crate::budget;
use crate::context::Ctx;
use crate::faction::Faction;
use crate::math::{angle_vectors, project_point_on_plane, vec_to_angles, Vec3, UP};
use crate::network;
use crate::structure::StructureId;
use crate::world::{ActorSnapshot, EntityRef, Trace, TraceMask};

/// Half-extent of the cube an alien needs to hatch.
pub const MAX_ALIEN_BBOX: f32 = 25.0;

/// Bounding box minimum of a human.
pub const HUMAN_MINS: Vec3 = Vec3::new(-15.0, -15.0, -24.0);

/// Bounding box maximum of a human.
pub const HUMAN_MAXS: Vec3 = Vec3::new(15.0, 15.0, 32.0);

/// How far above and below a shelter exit the landing spot is searched.
pub const HOVEL_TRACE_DEPTH: f32 = 128.0;

const ROOT3: f32 = 1.732_050_8;

/// Reason a structure cannot be placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuildError {
    /// The faction cannot afford the structure.
    InsufficientBudget,
    /// Something occupies the volume.
    NoRoom,
    /// The surface is too steep or is not world geometry.
    BadSurface,
    /// Surface flags, volume flags or an exclusion zone forbid building.
    NoPermission,
    /// No power reaches the spot.
    NoPower,
    /// The archetype needs a defense computer and none exists.
    NoNetworkNode,
    /// No creep reaches the spot.
    NoTerritory,
    /// The faction has no core.
    NoCore,
    /// Only one instance may exist and another is present.
    NotUnique,
    /// The structure to replace is occupied.
    Occupied,
    /// Units could not leave a spawn built here.
    SpawnExitBlocked,
    /// Units could not leave a shelter built here.
    ShelterExitBlocked,
    /// Another relay or a powered area already covers the spot.
    RedundantRelay,
    /// Building would remove the faction's last spawn.
    LastSpawn,
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::InsufficientBudget => "insufficient build points",
            Self::NoRoom => "there is no room to build here",
            Self::BadSurface => "the surface is too steep to build on",
            Self::NoPermission => "building is not allowed here",
            Self::NoPower => "there is no power here, build a repeater",
            Self::NoNetworkNode => "this structure needs a defense computer",
            Self::NoTerritory => "there is no creep here",
            Self::NoCore => "there is no core",
            Self::NotUnique => "only one of these may be built",
            Self::Occupied => "the structure to replace is occupied",
            Self::SpawnExitBlocked => "the spawn exit would be blocked",
            Self::ShelterExitBlocked => "the shelter exit would be blocked",
            Self::RedundantRelay => "there is already power here",
            Self::LastSpawn => "the last spawn cannot be removed",
        };
        f.write_str(text)
    }
}

/// Condition that does not stop a build but is reported to the builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuildWarning {
    /// A relay is built with no reactor to feed it.
    NoReactorForRelay,
}

/// Outcome of [`validate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacementVerdict {
    /// Candidate origin.
    pub origin: Vec3,
    /// Candidate angles, yaw only.
    pub angles: Vec3,
    /// Surface normal under the candidate.
    pub normal: Vec3,
    /// Every failed rule in evaluation order.
    pub reasons: Vec<BuildError>,
    /// Non-blocking condition.
    pub warning: Option<BuildWarning>,
    /// Marked structures to remove when the build commits.
    pub removals: Vec<StructureId>,
}

impl PlacementVerdict {
    /// The reported reason: the last rule that failed.
    #[must_use]
    pub fn reason(&self) -> Option<BuildError> {
        self.reasons.last().copied()
    }

    /// Whether the build may proceed.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.reasons.is_empty()
    }

    /// Whether `error` was one of the failed rules.
    #[must_use]
    pub fn failed(&self, error: BuildError) -> bool {
        self.reasons.contains(&error)
    }
}

/// Where a spawn would release a new unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpawnExit {
    /// The exit is free at this point.
    Clear(Vec3),
    /// Something stands in the way.
    Blocked(EntityRef),
}

/// Check the exit of a spawn of `archetype` at `origin` facing `normal`.
///
/// Archetypes that are not spawns are always clear.
#[must_use]
pub fn check_spawn_point(
    ctx: &Ctx<'_>,
    skip: Option<EntityRef>,
    origin: Vec3,
    normal: Vec3,
    archetype: Archetype,
) -> SpawnExit {
    let maxs = ctx.data(archetype).maxs;
    let (exit, mins, box_maxs) = match archetype {
        Archetype::AlienSpawn => {
            let displacement = (maxs.z + MAX_ALIEN_BBOX) * ROOT3;
            (
                origin + normal * displacement,
                Vec3::splat(-MAX_ALIEN_BBOX),
                Vec3::splat(MAX_ALIEN_BBOX),
            )
        }
        Archetype::HumanSpawn => {
            let lift = maxs.z + HUMAN_MINS.z.abs() + 1.0;
            (origin + Vec3::new(0.0, 0.0, lift), HUMAN_MINS, HUMAN_MAXS)
        }
        _ => return SpawnExit::Clear(origin),
    };

    let path = ctx
        .world
        .trace(origin, Vec3::ZERO, Vec3::ZERO, exit, skip, TraceMask::Shot);
    if let Some(blocker) = path.entity {
        return SpawnExit::Blocked(blocker);
    }

    let room = ctx
        .world
        .trace(exit, mins, box_maxs, exit, None, TraceMask::PlayerSolid);
    match room.entity {
        Some(blocker) => SpawnExit::Blocked(blocker),
        None => SpawnExit::Clear(exit),
    }
}

/// Landing spot for an actor leaving a shelter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShelterExit {
    /// Where the actor lands.
    pub origin: Vec3,
    /// View angles facing away from the shelter.
    pub angles: Vec3,
    /// Push given on exit.
    pub velocity: Vec3,
    /// The landing spot is obstructed.
    pub blocked: bool,
}

/// Compute the exit of a shelter at `origin` for `actor`.
///
/// Returns `None` when the passage between the shelter and its exit is
/// obstructed.
#[must_use]
pub fn shelter_exit(
    ctx: &Ctx<'_>,
    origin: Vec3,
    angles: Vec3,
    normal: Vec3,
    actor: &ActorSnapshot,
) -> Option<ShelterExit> {
    let hovel_maxs = ctx.data(Archetype::Hovel).maxs;
    let skip = Some(EntityRef::Actor(actor.id));
    let (forward, _, _) = angle_vectors(angles);
    let backward = -forward;

    let displacement = actor.maxs.max_element() + hovel_maxs.max_element() + 1.0;
    let mut exit = origin + backward * displacement;

    let passage = ctx
        .world
        .trace(origin, Vec3::ZERO, Vec3::ZERO, exit, skip, TraceMask::PlayerSolid);
    if passage.fraction < 1.0 {
        return None;
    }

    let view = vec_to_angles(backward);

    let ceiling = ctx.world.trace(
        exit,
        actor.mins,
        actor.maxs,
        exit + normal * HOVEL_TRACE_DEPTH,
        skip,
        TraceMask::PlayerSolid,
    );
    let start = exit + normal * (HOVEL_TRACE_DEPTH * ceiling.fraction - 1.0);
    let end = exit - normal * HOVEL_TRACE_DEPTH;
    let drop = ctx
        .world
        .trace(start, actor.mins, actor.maxs, end, skip, TraceMask::PlayerSolid);
    exit = drop.end_pos;

    let room = ctx
        .world
        .trace(exit, actor.mins, actor.maxs, exit, skip, TraceMask::PlayerSolid);

    Some(ShelterExit {
        origin: exit,
        angles: view,
        velocity: normal + backward * 200.0,
        blocked: room.hit(),
    })
}

/// Whether `actor` could not leave a shelter at `origin`.
#[must_use]
pub fn hovel_blocked(
    ctx: &Ctx<'_>,
    origin: Vec3,
    angles: Vec3,
    normal: Vec3,
    actor: &ActorSnapshot,
) -> bool {
    match shelter_exit(ctx, origin, angles, normal, actor) {
        Some(exit) => exit.blocked,
        None => true,
    }
}

/// Drop a box of `mins`/`maxs` onto the surface `distance` ahead of `actor`.
///
/// Returns the origin, the yaw-only angles and the trace that found the
/// surface.
#[must_use]
pub fn position_relative_to_actor(
    ctx: &Ctx<'_>,
    actor: &ActorSnapshot,
    mins: Vec3,
    maxs: Vec3,
    distance: f32,
) -> (Vec3, Vec3, Trace) {
    let normal = if actor.surface_normal == Vec3::ZERO {
        UP
    } else {
        actor.surface_normal
    };

    let (forward, _, _) = angle_vectors(actor.view_angles);
    let forward = project_point_on_plane(forward, normal).normalize_or_zero();

    let ahead = actor.origin + forward * distance;
    let start = ahead + normal * 32.0;
    let end = ahead - normal * 128.0;
    let surface = ctx.world.trace(
        start,
        mins,
        maxs,
        end,
        Some(EntityRef::Actor(actor.id)),
        TraceMask::PlayerSolid,
    );

    let origin = surface.end_pos + normal * 0.5;
    let angles = Vec3::new(0.0, actor.view_angles.y, 0.0);
    (origin, angles, surface)
}

/// Validate building `archetype` in front of `actor`.
///
/// Structures are unlinked from the spatial index for the geometry checks
/// and relinked before returning. The removal list of a successful verdict
/// is also stored on the level for [`crate::construction::free_marked`].
pub fn validate(
    ctx: &mut Ctx<'_>,
    actor: &ActorSnapshot,
    archetype: Archetype,
    max_distance: f32,
) -> PlacementVerdict {
    let faction = archetype.faction();
    let row = ctx.data(archetype).clone();
    let skip = Some(EntityRef::Actor(actor.id));

    ctx.unlink_all();

    let (origin, angles, surface) =
        position_relative_to_actor(ctx, actor, row.mins, row.maxs, max_distance);
    let room = ctx
        .world
        .trace(origin, row.mins, row.maxs, origin, skip, TraceMask::PlayerSolid);
    let path = ctx
        .world
        .trace(actor.origin, Vec3::ZERO, Vec3::ZERO, origin, skip, TraceMask::PlayerSolid);
    let normal = surface.normal;

    let mut reasons = Vec::new();
    let mut warning = None;

    let min_normal = row.min_normal;
    let slope_ok = normal.z >= min_normal || (row.allow_inverted && normal.z <= -min_normal);
    if !slope_ok || surface.entity != Some(EntityRef::World) {
        reasons.push(BuildError::BadSurface);
    }

    let contents = ctx.world.point_contents(origin, None);
    let forbidden = surface.surface.union(contents).forbids(faction);

    if ctx.level.in_exclusion_zone(origin) {
        reasons.push(BuildError::NoPermission);
    }

    match faction {
        Faction::Aliens => {
            if archetype == Archetype::Hovel && hovel_blocked(ctx, origin, angles, normal, actor) {
                reasons.push(BuildError::ShelterExitBlocked);
            }
            if row.creep_test && !network::is_creep_here(ctx.structures, ctx.table, origin) {
                reasons.push(BuildError::NoTerritory);
            }
            if forbidden {
                reasons.push(BuildError::NoPermission);
            }
            if archetype != Archetype::Overmind
                && !network::is_core_built(ctx.structures, Faction::Aliens)
            {
                reasons.push(BuildError::NoCore);
            }
            if row.unique
                && ctx
                    .structures
                    .iter()
                    .any(|s| s.archetype == archetype && !s.marked)
            {
                reasons.push(BuildError::NotUnique);
            }
        }
        Faction::Humans => {
            let powered = network::is_powered(ctx.structures, ctx.table, origin);
            if !powered && !archetype.is_power_source() {
                reasons.push(BuildError::NoPower);
            }
            if row.dcc_test && !network::is_network_node_built(ctx.structures) {
                reasons.push(BuildError::NoNetworkNode);
            }
            if archetype == Archetype::Repeater {
                let reactor_exists = ctx
                    .structures
                    .iter()
                    .any(|s| s.archetype == Archetype::Reactor);
                if reactor_exists {
                    if powered {
                        reasons.push(BuildError::RedundantRelay);
                    }
                } else {
                    let relay_radius = ctx.data(Archetype::Repeater).node_radius.unwrap_or(0.0);
                    let crowded = ctx.structures.iter().any(|s| {
                        s.archetype == Archetype::Repeater && s.origin.distance(origin) < relay_radius
                    });
                    if crowded {
                        reasons.push(BuildError::RedundantRelay);
                    } else if reasons.is_empty() {
                        warning = Some(BuildWarning::NoReactorForRelay);
                    }
                }
            }
            if forbidden {
                reasons.push(BuildError::NoPermission);
            }
            if row.unique
                && ctx
                    .structures
                    .iter()
                    .any(|s| s.archetype == Archetype::Reactor && !s.marked)
            {
                reasons.push(BuildError::NotUnique);
            }
        }
        Faction::None => {}
    }

    let mut removals = match budget::plan_budget(
        ctx.structures,
        ctx.table,
        ctx.level,
        ctx.config,
        archetype,
        origin,
    ) {
        Ok(plan) => plan.removals,
        Err(error) => {
            reasons.push(error);
            Vec::new()
        }
    };

    ctx.link_all();

    if reasons.is_empty() {
        for &id in &removals {
            ctx.unlink(id);
        }
        if let SpawnExit::Blocked(blocker) = check_spawn_point(ctx, None, origin, normal, archetype) {
            tracing::debug!(?blocker, %archetype, "Spawn exit blocked");
            reasons.push(BuildError::SpawnExitBlocked);
        }
        for &id in &removals {
            ctx.link(id);
        }
    }

    if reasons.is_empty() && (room.hit() || path.hit()) {
        reasons.push(BuildError::NoRoom);
    }

    if !reasons.is_empty() {
        removals.clear();
        warning = None;
    }
    ctx.level.removal_list.clone_from(&removals);

    PlacementVerdict {
        origin,
        angles,
        normal,
        reasons,
        warning,
        removals,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verdict(reasons: Vec<BuildError>) -> PlacementVerdict {
        PlacementVerdict {
            origin: Vec3::ZERO,
            angles: Vec3::ZERO,
            normal: UP,
            reasons,
            warning: None,
            removals: Vec::new(),
        }
    }

    #[test]
    fn test_last_failed_rule_is_reported() {
        let v = verdict(vec![BuildError::NoTerritory, BuildError::InsufficientBudget]);
        assert_eq!(v.reason(), Some(BuildError::InsufficientBudget));
        assert!(v.failed(BuildError::NoTerritory));
        assert!(!v.is_ok());
    }

    #[test]
    fn test_empty_verdict_is_ok() {
        let v = verdict(Vec::new());
        assert!(v.is_ok());
        assert_eq!(v.reason(), None);
    }

    #[test]
    fn test_error_messages_are_distinct() {
        let all = [
            BuildError::InsufficientBudget,
            BuildError::NoRoom,
            BuildError::BadSurface,
            BuildError::NoPermission,
            BuildError::NoPower,
            BuildError::NoNetworkNode,
            BuildError::NoTerritory,
            BuildError::NoCore,
            BuildError::NotUnique,
            BuildError::Occupied,
            BuildError::SpawnExitBlocked,
            BuildError::ShelterExitBlocked,
            BuildError::RedundantRelay,
            BuildError::LastSpawn,
        ];
        let mut texts: Vec<String> = all.iter().map(ToString::to_string).collect();
        texts.sort();
        texts.dedup();
        assert_eq!(texts.len(), all.len());
    }
}
