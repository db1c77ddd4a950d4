//! Power, network-node, core and territory resolution.
//!
//! Resolvers cache the source they find on the asking structure and trust
//! the cache while the cached source is still valid, so power flows
//! through a live network without a full search every refresh.

use std::collections::VecDeque;

use crate::archetype::Archetype;
use crate::combat::{targetable, visible};
use crate::context::Ctx;
use crate::data::ArchetypeTable;
use crate::faction::Faction;
use crate::math::{Aabb, Vec3};
use crate::structure::{Structure, StructureId, StructureStore};
use crate::world::{EntityRef, StatusEffect};

/// Interval at which unpowered structures recheck for power.
pub const POWER_REFRESH: u32 = 2000;

/// Search distance cap; sources further away are never considered.
const MAX_SEARCH_DISTANCE: f32 = 10000.0;

fn node_radius(table: &ArchetypeTable, s: &Structure) -> Option<f32> {
    table.get(s.archetype).node_radius
}

/// Nearest spawned, powered power source whose radius reaches `point`.
#[must_use]
pub fn nearest_power(
    structures: &StructureStore,
    table: &ArchetypeTable,
    point: Vec3,
) -> Option<StructureId> {
    let mut best: Option<(StructureId, f32)> = None;
    for s in structures.iter() {
        if !s.archetype.is_power_source() || !s.spawned || !s.powered {
            continue;
        }
        let Some(radius) = node_radius(table, s) else {
            continue;
        };
        let distance = point.distance(s.origin);
        let min = best.map_or(MAX_SEARCH_DISTANCE, |(_, d)| d);
        if distance < min && distance <= radius {
            best = Some((s.id, distance));
        }
    }
    best.map(|(id, _)| id)
}

/// Resolve power for a structure, caching its source.
///
/// Reactors are always powered. Aliens are never powered by this resolver.
pub fn find_power(structures: &mut StructureStore, table: &ArchetypeTable, id: StructureId) -> bool {
    let Some(s) = structures.get(id) else {
        return false;
    };
    if s.faction() != Faction::Humans {
        return false;
    }
    if s.archetype == Archetype::Reactor {
        return true;
    }
    if let Some(parent) = s.parent.and_then(|p| structures.get(p)) {
        if parent.powered {
            return true;
        }
    }
    let origin = s.origin;
    let source = nearest_power(structures, table, origin);
    if let Some(s) = structures.get_mut(id) {
        s.parent = source;
    }
    source.is_some()
}

/// Whether a human structure at `point` would be powered.
#[must_use]
pub fn is_powered(structures: &StructureStore, table: &ArchetypeTable, point: Vec3) -> bool {
    nearest_power(structures, table, point).is_some()
}

/// Nearest spawned, powered network node. Network nodes have unlimited reach.
#[must_use]
pub fn nearest_network_node(structures: &StructureStore, point: Vec3) -> Option<StructureId> {
    let mut best: Option<(StructureId, f32)> = None;
    for s in structures.iter() {
        if s.archetype != Archetype::Dcc || !s.spawned || !s.powered {
            continue;
        }
        let distance = point.distance(s.origin);
        if best.map_or(true, |(_, d)| distance < d) {
            best = Some((s.id, distance));
        }
    }
    best.map(|(id, _)| id)
}

/// Resolve the network node assisting a human structure, caching it.
pub fn find_network_node(structures: &mut StructureStore, id: StructureId) -> bool {
    let Some(s) = structures.get(id) else {
        return false;
    };
    if s.faction() != Faction::Humans {
        return false;
    }
    if s.network_node.and_then(|n| structures.get(n)).is_some_and(|n| n.powered) {
        return true;
    }
    let node = nearest_network_node(structures, s.origin);
    if let Some(s) = structures.get_mut(id) {
        s.network_node = node;
    }
    node.is_some()
}

/// Whether the humans have a working network node anywhere.
#[must_use]
pub fn is_network_node_built(structures: &StructureStore) -> bool {
    nearest_network_node(structures, Vec3::ZERO).is_some()
}

/// First spawned, live core of `faction`.
#[must_use]
pub fn core_of(structures: &StructureStore, faction: Faction) -> Option<StructureId> {
    let core = Archetype::core_of(faction)?;
    structures
        .iter()
        .find(|s| s.archetype == core && s.is_active())
        .map(|s| s.id)
}

/// Resolve the faction core for a structure, caching it.
pub fn find_core(structures: &mut StructureStore, id: StructureId) -> bool {
    let Some(s) = structures.get(id) else {
        return false;
    };
    if s.core_node.and_then(|c| structures.get(c)).is_some_and(Structure::is_alive) {
        return true;
    }
    let core = core_of(structures, s.faction());
    if let Some(s) = structures.get_mut(id) {
        s.core_node = core;
    }
    core.is_some()
}

/// Whether `faction` has a live, spawned core.
#[must_use]
pub fn is_core_built(structures: &StructureStore, faction: Faction) -> bool {
    core_of(structures, faction).is_some()
}

/// Nearest spawned territory source and whether its radius reaches `point`.
fn nearest_creep(
    structures: &StructureStore,
    table: &ArchetypeTable,
    point: Vec3,
) -> Option<StructureId> {
    let mut best: Option<(&Structure, f32)> = None;
    for s in structures.iter() {
        if !s.archetype.is_creep_source() || !s.spawned {
            continue;
        }
        let distance = point.distance(s.origin);
        let min = best.map_or(MAX_SEARCH_DISTANCE, |(_, d)| d);
        if distance < min {
            best = Some((s, distance));
        }
    }
    let (source, distance) = best?;
    let radius = table.get(source.archetype).territory_radius.unwrap_or(0.0);
    (distance <= radius).then_some(source.id)
}

/// Resolve territory for a structure, caching its source.
///
/// Structures not resting on a surface are exempt.
pub fn find_creep(structures: &mut StructureStore, table: &ArchetypeTable, id: StructureId) -> bool {
    let Some(s) = structures.get(id) else {
        return false;
    };
    if !s.grounded {
        return true;
    }
    if s.parent.is_some_and(|p| structures.contains(p)) {
        return true;
    }
    let source = nearest_creep(structures, table, s.origin);
    if let Some(s) = structures.get_mut(id) {
        s.parent = source;
    }
    source.is_some()
}

/// Whether `point` lies within territory.
#[must_use]
pub fn is_creep_here(structures: &StructureStore, table: &ArchetypeTable, point: Vec3) -> bool {
    nearest_creep(structures, table, point).is_some()
}

/// Flag visible, grounded hostile actors in a structure's creep box.
pub fn creep_slow(ctx: &mut Ctx<'_>, id: StructureId) {
    let Some(s) = ctx.get(id) else {
        return;
    };
    let faction = s.faction();
    let size = ctx.data(s.archetype).creep_size;
    let bounds = Aabb::around(s.origin, size);

    let view: &Ctx<'_> = ctx;
    let slowed: Vec<_> = view
        .world
        .entities_in_box(bounds)
        .into_iter()
        .filter_map(|e| match e {
            EntityRef::Actor(a) => view.world.actor(a),
            _ => None,
        })
        .filter(|a| targetable(view, a, faction) && a.grounded && visible(view, id, a))
        .map(|a| a.id)
        .collect();

    let now = ctx.now();
    for actor in slowed {
        ctx.world.apply_status(actor, StatusEffect::CreepSlowed, now);
    }
}

/// Whether a repeater is reachable from a live reactor through live relays.
///
/// Each hop must lie within the radius of the structure it connects to.
#[must_use]
pub fn relay_powered(structures: &StructureStore, table: &ArchetypeTable, id: StructureId) -> bool {
    let relays: Vec<&Structure> = structures
        .iter()
        .filter(|s| s.archetype == Archetype::Repeater && s.is_active())
        .collect();
    let mut reached = vec![false; relays.len()];
    let mut frontier: VecDeque<&Structure> = structures
        .iter()
        .filter(|s| s.archetype == Archetype::Reactor && s.is_active())
        .collect();

    while let Some(source) = frontier.pop_front() {
        if source.id == id {
            return true;
        }
        let Some(radius) = node_radius(table, source) else {
            continue;
        };
        for (i, relay) in relays.iter().enumerate() {
            if !reached[i] && relay.origin.distance(source.origin) <= radius {
                reached[i] = true;
                frontier.push_back(*relay);
            }
        }
    }
    false
}

/// Number of structures that use `id` as their cached source.
#[must_use]
pub fn dependents(structures: &StructureStore, id: StructureId) -> usize {
    structures.iter().filter(|s| s.parent == Some(id)).count()
}

/// Whether a spawned instance of `archetype` touches the box of half-extent
/// `range` around `point`. Human instances must also be powered.
#[must_use]
pub fn structure_in_range(
    structures: &StructureStore,
    point: Vec3,
    range: f32,
    archetype: Archetype,
) -> bool {
    let bounds = Aabb::around(point, range);
    structures.iter().any(|s| {
        s.archetype == archetype
            && s.is_active()
            && (s.faction() != Faction::Humans || s.powered)
            && bounds.intersects(&s.bounds())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn place(
        store: &mut StructureStore,
        table: &ArchetypeTable,
        archetype: Archetype,
        origin: Vec3,
    ) -> StructureId {
        let row = table.get(archetype);
        let mut s = Structure::new(archetype, origin, row.mins, row.maxs, row.health);
        s.spawned = true;
        s.powered = archetype == Archetype::Reactor || archetype.faction() == Faction::Aliens;
        store.insert(s)
    }

    fn set_powered(store: &mut StructureStore, id: StructureId, powered: bool) {
        if let Some(s) = store.get_mut(id) {
            s.powered = powered;
        }
    }

    // ========================================================================
    // Power
    // ========================================================================

    #[test]
    fn test_reactor_always_powered() {
        let table = ArchetypeTable::standard();
        let mut store = StructureStore::new();
        let reactor = place(&mut store, &table, Archetype::Reactor, Vec3::ZERO);
        assert!(find_power(&mut store, &table, reactor));
    }

    #[test]
    fn test_find_power_within_reactor_radius() {
        let table = ArchetypeTable::standard();
        let mut store = StructureStore::new();
        let reactor = place(&mut store, &table, Archetype::Reactor, Vec3::ZERO);
        let near = place(&mut store, &table, Archetype::MgTurret, Vec3::new(900.0, 0.0, 0.0));
        let far = place(&mut store, &table, Archetype::MgTurret, Vec3::new(1100.0, 0.0, 0.0));
        assert!(find_power(&mut store, &table, near));
        assert_eq!(store.get(near).and_then(|s| s.parent), Some(reactor));
        assert!(!find_power(&mut store, &table, far));
    }

    #[test]
    fn test_find_power_prefers_nearest_source() {
        let table = ArchetypeTable::standard();
        let mut store = StructureStore::new();
        place(&mut store, &table, Archetype::Reactor, Vec3::ZERO);
        let relay = place(&mut store, &table, Archetype::Repeater, Vec3::new(600.0, 0.0, 0.0));
        set_powered(&mut store, relay, true);
        let dcc = place(&mut store, &table, Archetype::Dcc, Vec3::new(700.0, 0.0, 0.0));
        assert!(find_power(&mut store, &table, dcc));
        assert_eq!(store.get(dcc).and_then(|s| s.parent), Some(relay));
    }

    #[test]
    fn test_cached_parent_losing_power_triggers_research() {
        let table = ArchetypeTable::standard();
        let mut store = StructureStore::new();
        let relay = place(&mut store, &table, Archetype::Repeater, Vec3::new(1500.0, 0.0, 0.0));
        set_powered(&mut store, relay, true);
        let turret = place(&mut store, &table, Archetype::MgTurret, Vec3::new(1800.0, 0.0, 0.0));
        assert!(find_power(&mut store, &table, turret));
        set_powered(&mut store, relay, false);
        assert!(!find_power(&mut store, &table, turret));
        assert_eq!(store.get(turret).and_then(|s| s.parent), None);
    }

    #[test]
    fn test_aliens_never_powered() {
        let table = ArchetypeTable::standard();
        let mut store = StructureStore::new();
        place(&mut store, &table, Archetype::Reactor, Vec3::ZERO);
        let egg = place(&mut store, &table, Archetype::AlienSpawn, Vec3::X);
        assert!(!find_power(&mut store, &table, egg));
    }

    #[test]
    fn test_is_powered_point_query() {
        let table = ArchetypeTable::standard();
        let mut store = StructureStore::new();
        place(&mut store, &table, Archetype::Reactor, Vec3::ZERO);
        assert!(is_powered(&store, &table, Vec3::new(0.0, 999.0, 0.0)));
        assert!(!is_powered(&store, &table, Vec3::new(0.0, 1001.0, 0.0)));
    }

    // ========================================================================
    // Relay chain
    // ========================================================================

    #[test]
    fn test_relay_chain_needs_live_reactor() {
        let table = ArchetypeTable::standard();
        let mut store = StructureStore::new();
        let reactor = place(&mut store, &table, Archetype::Reactor, Vec3::ZERO);
        let first = place(&mut store, &table, Archetype::Repeater, Vec3::new(900.0, 0.0, 0.0));
        let second = place(&mut store, &table, Archetype::Repeater, Vec3::new(1350.0, 0.0, 0.0));
        let isolated = place(&mut store, &table, Archetype::Repeater, Vec3::new(3000.0, 0.0, 0.0));

        assert!(relay_powered(&store, &table, first));
        assert!(relay_powered(&store, &table, second));
        assert!(!relay_powered(&store, &table, isolated));

        if let Some(r) = store.get_mut(reactor) {
            r.health.apply_damage(10_000);
        }
        assert!(!relay_powered(&store, &table, first));
        assert!(!relay_powered(&store, &table, second));
    }

    #[test]
    fn test_relay_chain_breaks_at_dead_link() {
        let table = ArchetypeTable::standard();
        let mut store = StructureStore::new();
        place(&mut store, &table, Archetype::Reactor, Vec3::ZERO);
        let first = place(&mut store, &table, Archetype::Repeater, Vec3::new(900.0, 0.0, 0.0));
        let second = place(&mut store, &table, Archetype::Repeater, Vec3::new(1350.0, 0.0, 0.0));
        if let Some(r) = store.get_mut(first) {
            r.health.apply_damage(10_000);
        }
        assert!(!relay_powered(&store, &table, second));
    }

    // ========================================================================
    // Network node and core
    // ========================================================================

    #[test]
    fn test_network_node_unlimited_range() {
        let table = ArchetypeTable::standard();
        let mut store = StructureStore::new();
        assert!(!is_network_node_built(&store));
        let dcc = place(&mut store, &table, Archetype::Dcc, Vec3::new(5000.0, 0.0, 0.0));
        set_powered(&mut store, dcc, true);
        let tesla = place(&mut store, &table, Archetype::TeslaGen, Vec3::ZERO);
        assert!(find_network_node(&mut store, tesla));
        assert!(is_network_node_built(&store));
        set_powered(&mut store, dcc, false);
        assert!(!find_network_node(&mut store, tesla));
    }

    #[test]
    fn test_core_requires_spawned_and_alive() {
        let table = ArchetypeTable::standard();
        let mut store = StructureStore::new();
        let om = place(&mut store, &table, Archetype::Overmind, Vec3::ZERO);
        let egg = place(&mut store, &table, Archetype::AlienSpawn, Vec3::X * 100.0);
        assert!(find_core(&mut store, egg));
        assert!(is_core_built(&store, Faction::Aliens));
        assert!(!is_core_built(&store, Faction::Humans));
        if let Some(s) = store.get_mut(om) {
            s.health.apply_damage(10_000);
        }
        assert!(!find_core(&mut store, egg));
    }

    // ========================================================================
    // Territory
    // ========================================================================

    #[test]
    fn test_creep_radius() {
        let table = ArchetypeTable::standard();
        let mut store = StructureStore::new();
        assert!(!is_creep_here(&store, &table, Vec3::ZERO));
        let egg = place(&mut store, &table, Archetype::AlienSpawn, Vec3::ZERO);
        assert!(is_creep_here(&store, &table, Vec3::new(700.0, 0.0, 0.0)));
        assert!(!is_creep_here(&store, &table, Vec3::new(701.0, 0.0, 0.0)));

        let acid = place(&mut store, &table, Archetype::AcidTube, Vec3::new(300.0, 0.0, 0.0));
        assert!(find_creep(&mut store, &table, acid));
        assert_eq!(store.get(acid).and_then(|s| s.parent), Some(egg));
    }

    #[test]
    fn test_creep_cache_invalidated_on_removal() {
        let table = ArchetypeTable::standard();
        let mut store = StructureStore::new();
        let egg = place(&mut store, &table, Archetype::AlienSpawn, Vec3::ZERO);
        let acid = place(&mut store, &table, Archetype::AcidTube, Vec3::new(300.0, 0.0, 0.0));
        assert!(find_creep(&mut store, &table, acid));
        store.remove(egg);
        assert!(!find_creep(&mut store, &table, acid));
    }

    #[test]
    fn test_airborne_structures_exempt_from_creep() {
        let table = ArchetypeTable::standard();
        let mut store = StructureStore::new();
        let acid = place(&mut store, &table, Archetype::AcidTube, Vec3::ZERO);
        if let Some(s) = store.get_mut(acid) {
            s.grounded = false;
        }
        assert!(find_creep(&mut store, &table, acid));
    }

    // ========================================================================
    // Range query and dependents
    // ========================================================================

    #[test]
    fn test_structure_in_range_requires_power_for_humans() {
        let table = ArchetypeTable::standard();
        let mut store = StructureStore::new();
        let medi = place(&mut store, &table, Archetype::Medistat, Vec3::new(100.0, 0.0, 0.0));
        assert!(!structure_in_range(&store, Vec3::ZERO, 100.0, Archetype::Medistat));
        set_powered(&mut store, medi, true);
        assert!(structure_in_range(&store, Vec3::ZERO, 100.0, Archetype::Medistat));
        assert!(!structure_in_range(&store, Vec3::ZERO, 50.0, Archetype::Medistat));
        place(&mut store, &table, Archetype::Booster, Vec3::new(0.0, 150.0, 0.0));
        assert!(structure_in_range(&store, Vec3::ZERO, 150.0, Archetype::Booster));
    }

    #[test]
    fn test_dependents_counts_cached_parents() {
        let table = ArchetypeTable::standard();
        let mut store = StructureStore::new();
        let reactor = place(&mut store, &table, Archetype::Reactor, Vec3::ZERO);
        let a = place(&mut store, &table, Archetype::MgTurret, Vec3::X * 100.0);
        let b = place(&mut store, &table, Archetype::Armoury, Vec3::Y * 100.0);
        assert_eq!(dependents(&store, reactor), 0);
        find_power(&mut store, &table, a);
        find_power(&mut store, &table, b);
        assert_eq!(dependents(&store, reactor), 2);
    }
}
