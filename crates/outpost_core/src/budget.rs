//! Build-point budget and deconstruction planning.
//!
//! Without mark mode a request either fits the remaining budget and the
//! free space or it is refused. With mark mode the planner may remove
//! structures the faction has marked, choosing them in a fixed order so
//! the result never depends on entity iteration order.

use std::cmp::Ordering;

use crate::archetype::Archetype;
use crate::data::{ArchetypeTable, BuildConfig};
use crate::level::Level;
use crate::math::{Aabb, Vec3};
use crate::placement::BuildError;
use crate::structure::{Structure, StructureId, StructureStore};

/// Structures to remove before a build commits, in removal order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeconstructionPlan {
    /// Structures to remove.
    pub removals: Vec<StructureId>,
    /// Build points the removals free.
    pub yielded: i32,
}

/// Stock bounds of `archetype` placed at `origin`.
fn stock_bounds(table: &ArchetypeTable, archetype: Archetype, origin: Vec3) -> Aabb {
    let row = table.get(archetype);
    Aabb::at(origin, row.mins, row.maxs)
}

fn collides(table: &ArchetypeTable, archetype: Archetype, origin: Vec3, s: &Structure) -> bool {
    stock_bounds(table, archetype, origin).intersects(&stock_bounds(table, s.archetype, s.origin))
}

/// Removal order between two marked structures for a request of
/// `requested` at `origin`.
///
/// Colliding structures come first, then structures of the requested
/// archetype, then same-archetype pairs by earliest mark, then the
/// archetype precedence table.
#[must_use]
pub fn compare_for_removal(
    table: &ArchetypeTable,
    requested: Archetype,
    origin: Vec3,
    a: &Structure,
    b: &Structure,
) -> Ordering {
    let a_hits = collides(table, requested, origin, a);
    let b_hits = collides(table, requested, origin, b);
    if a_hits != b_hits {
        return b_hits.cmp(&a_hits);
    }

    let a_same = a.archetype == requested;
    let b_same = b.archetype == requested;
    if a_same != b_same {
        return b_same.cmp(&a_same);
    }

    if a.archetype == b.archetype {
        return a.mark_time.cmp(&b.mark_time);
    }

    a.archetype
        .removal_precedence()
        .cmp(&b.archetype.removal_precedence())
}

/// Decide whether `archetype` fits the faction budget at `origin`.
///
/// # Errors
///
/// Returns the [`BuildError`] that prevents the build.
pub fn plan_budget(
    structures: &StructureStore,
    table: &ArchetypeTable,
    level: &Level,
    config: &BuildConfig,
    archetype: Archetype,
    origin: Vec3,
) -> Result<DeconstructionPlan, BuildError> {
    let faction = archetype.faction();
    let cost = table.get(archetype).build_points;
    let remaining = level.build_points(faction);

    if !config.mark_deconstruct {
        if remaining - cost < 0 {
            return Err(BuildError::InsufficientBudget);
        }
        if structures.iter().any(|s| collides(table, archetype, origin, s)) {
            return Err(BuildError::NoRoom);
        }
        return Ok(DeconstructionPlan::default());
    }

    let needed = cost - remaining;
    let target = if config.mark_deconstruct_full_cost {
        cost
    } else {
        needed
    };
    let unique = table.get(archetype).unique;
    let core = Archetype::core_of(faction);
    let relay_radius = table.get(Archetype::Repeater).node_radius.unwrap_or(0.0);

    let mut collisions = 0usize;
    let mut relays_in_range = 0usize;
    let mut candidates: Vec<(&Structure, bool)> = Vec::new();

    for s in structures.iter() {
        let collision = collides(table, archetype, origin, s);
        if collision {
            collisions += 1;
        }
        let relay_in_range = archetype == Archetype::Repeater
            && s.archetype == Archetype::Repeater
            && s.origin.distance(origin) < relay_radius;
        if relay_in_range {
            relays_in_range += 1;
        }

        if !s.is_alive() || s.faction() != faction {
            continue;
        }
        if s.archetype == Archetype::Hovel && s.occupant.is_some() {
            if archetype == Archetype::Hovel {
                return Err(BuildError::Occupied);
            }
            continue;
        }
        if Some(s.archetype) == core && archetype != s.archetype {
            continue;
        }
        if !s.marked {
            continue;
        }

        let mandatory = if collision || relay_in_range {
            if collision {
                collisions -= 1;
            }
            if relay_in_range {
                relays_in_range -= 1;
            }
            true
        } else {
            unique && s.archetype == archetype
        };
        candidates.push((s, mandatory));
    }

    if needed > 0 && candidates.is_empty() {
        return Err(BuildError::InsufficientBudget);
    }
    if collisions > 0 {
        return Err(BuildError::NoRoom);
    }
    if relays_in_range > 0 {
        return Err(BuildError::RedundantRelay);
    }

    candidates.sort_by(|(a, _), (b, _)| compare_for_removal(table, archetype, origin, a, b));

    let mut chosen = vec![false; candidates.len()];
    let mut yielded = 0;
    for (i, (s, mandatory)) in candidates.iter().enumerate() {
        if *mandatory {
            chosen[i] = true;
            yielded += table.get(s.archetype).build_points;
        }
    }
    for (i, (s, _)) in candidates.iter().enumerate() {
        if yielded >= target {
            break;
        }
        if !chosen[i] {
            chosen[i] = true;
            yielded += table.get(s.archetype).build_points;
        }
    }

    let removals: Vec<StructureId> = candidates
        .iter()
        .zip(&chosen)
        .filter(|(_, &c)| c)
        .map(|((s, _), _)| s.id)
        .collect();

    let spawns = level.spawns(faction);
    let spawn = Archetype::spawn_of(faction);
    let removed_spawns = removals
        .iter()
        .filter_map(|&id| structures.get(id))
        .filter(|s| Some(s.archetype) == spawn)
        .count() as i32;
    if !config.cheats && spawns > 0 && spawns - removed_spawns < 1 {
        return Err(BuildError::LastSpawn);
    }

    if yielded < needed {
        return Err(BuildError::InsufficientBudget);
    }

    Ok(DeconstructionPlan { removals, yielded })
}
