//! Property-based tests for placement, budgeting and persistence.

use outpost_core::archetype::Archetype;
use outpost_core::budget::plan_budget;
use outpost_core::data::{ArchetypeTable, BuildConfig};
use outpost_core::faction::Faction;
use outpost_core::history::BuildFate;
use outpost_core::layout::LayoutRecord;
use outpost_core::level::Level;
use outpost_core::math::{Vec3, UP};
use outpost_core::structure::{Structure, StructureStore};
use outpost_test_utils::determinism::strategies::{arb_archetype, arb_damage, arb_layout_record};
use outpost_test_utils::fixtures::Scenario;
use proptest::prelude::*;

fn human_archetype() -> impl Strategy<Value = Archetype> {
    let humans: Vec<Archetype> = Archetype::ALL
        .into_iter()
        .filter(|a| a.faction() == Faction::Humans)
        .collect();
    proptest::sample::select(humans)
}

/// A spawned human structure on a small grid, optionally marked.
fn arb_candidate() -> impl Strategy<Value = (Archetype, (i32, i32), bool)> {
    (human_archetype(), (-6i32..6, -6i32..6), any::<bool>())
}

fn store_from(
    table: &ArchetypeTable,
    candidates: &[(Archetype, (i32, i32), bool)],
    order: impl Iterator<Item = usize>,
) -> StructureStore {
    let mut store = StructureStore::new();
    for i in order {
        let (archetype, (gx, gy), marked) = candidates[i];
        let row = table.get(archetype);
        let origin = Vec3::new(gx as f32 * 60.0, gy as f32 * 60.0, -row.mins.z);
        let mut s = Structure::new(archetype, origin, row.mins, row.maxs, row.health);
        s.spawned = true;
        s.marked = marked;
        s.mark_time = i as u32 * 10;
        store.insert(s);
    }
    store
}

type RemovalKey = (Archetype, u32);

fn plan_keys(
    store: &StructureStore,
    table: &ArchetypeTable,
    config: &BuildConfig,
    archetype: Archetype,
    origin: Vec3,
) -> Result<Vec<RemovalKey>, outpost_core::placement::BuildError> {
    let mut level = Level::default();
    level.recalculate(store, table, config);
    let plan = plan_budget(store, table, &level, config, archetype, origin)?;
    let mut keys: Vec<RemovalKey> = plan
        .removals
        .iter()
        .filter_map(|&id| store.get(id))
        .map(|s| (s.archetype, s.mark_time))
        .collect();
    keys.sort();
    Ok(keys)
}

proptest! {
    /// The removal plan only depends on the structures, never on the order
    /// they were created in.
    #[test]
    fn prop_plan_ignores_creation_order(
        candidates in proptest::collection::vec(arb_candidate(), 0..12),
        requested in human_archetype(),
        gx in -6i32..6,
        gy in -6i32..6,
    ) {
        let table = ArchetypeTable::standard();
        let config = BuildConfig {
            mark_deconstruct: true,
            ..BuildConfig::default()
        };
        let origin = Vec3::new(gx as f32 * 60.0, gy as f32 * 60.0, 20.0);

        let forward = store_from(&table, &candidates, 0..candidates.len());
        let backward = store_from(&table, &candidates, (0..candidates.len()).rev());
        prop_assert_eq!(
            plan_keys(&forward, &table, &config, requested, origin),
            plan_keys(&backward, &table, &config, requested, origin)
        );
    }

    /// Planned removals are always marked structures of the requesting
    /// faction and free at least what the build is short of.
    #[test]
    fn prop_plan_removes_only_marked(
        candidates in proptest::collection::vec(arb_candidate(), 0..12),
        requested in human_archetype(),
    ) {
        let table = ArchetypeTable::standard();
        let config = BuildConfig {
            mark_deconstruct: true,
            human_build_points: 30,
            ..BuildConfig::default()
        };
        let store = store_from(&table, &candidates, 0..candidates.len());
        let mut level = Level::default();
        level.recalculate(&store, &table, &config);
        let origin = Vec3::new(1000.0, 1000.0, 20.0);

        if let Ok(plan) = plan_budget(&store, &table, &level, &config, requested, origin) {
            let needed = table.get(requested).build_points - level.human_build_points;
            prop_assert!(plan.yielded >= needed);
            for id in &plan.removals {
                let s = store.get(*id).unwrap();
                prop_assert!(s.marked);
                prop_assert_eq!(s.faction(), Faction::Humans);
            }
        }
    }

    /// Health never leaves `[0, max]` and a structure dies at most once.
    #[test]
    fn prop_damage_keeps_health_in_bounds(
        hits in proptest::collection::vec(arb_damage(), 1..12),
    ) {
        let mut scenario = Scenario::new(1);
        let id = scenario.place(Archetype::Reactor, 0.0, 0.0);
        let max = scenario.sim.structure(id).unwrap().health.max;

        let mut dealt = 0;
        for amount in &hits {
            scenario.sim.damage(&mut scenario.world, id, *amount, None);
            dealt += amount;
            let health = scenario.sim.structure(id).unwrap().health;
            prop_assert!(health.current >= 0 && health.current <= max);
            prop_assert_eq!(health.current, (max - dealt).max(0));
        }

        let deaths = scenario
            .sim
            .history()
            .iter()
            .filter(|r| r.fate == BuildFate::Destroyed)
            .count();
        prop_assert_eq!(deaths, usize::from(dealt >= max));
    }

    /// Layout items dropped onto the floor never overlap each other.
    #[test]
    fn prop_layout_items_never_overlap(
        items in proptest::collection::vec(
            (arb_archetype(), -300i32..300, -300i32..300),
            1..10,
        ),
    ) {
        let mut scenario = Scenario::new(1);
        for (archetype, x, y) in items {
            let record = LayoutRecord {
                archetype,
                origin: Vec3::new(x as f32, y as f32, 100.0),
                angles: Vec3::ZERO,
                normal: UP,
                turret_angles: Vec3::ZERO,
            };
            scenario.sim.instant_build(&mut scenario.world, &record);
        }

        let boxes: Vec<_> = scenario
            .sim
            .structures()
            .iter()
            .map(|s| s.bounds().expand(-0.01))
            .collect();
        for (i, a) in boxes.iter().enumerate() {
            prop_assert!(a.mins.z >= -0.01);
            for b in &boxes[i + 1..] {
                prop_assert!(!a.intersects(b), "{:?} overlaps {:?}", a, b);
            }
        }
    }

    /// A layout line reads back as the record it was written from.
    #[test]
    fn prop_layout_line_reads_back(record in arb_layout_record()) {
        let parsed = LayoutRecord::parse_line(1, &record.to_line()).unwrap();
        prop_assert_eq!(parsed.archetype, record.archetype);
        prop_assert!(parsed.origin.distance(record.origin) < 1e-3);
        prop_assert!(parsed.angles.distance(record.angles) < 1e-3);
        prop_assert!(parsed.normal.distance(record.normal) < 1e-3);
    }
}
