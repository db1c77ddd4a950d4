//! Saving, selecting and loading layouts through an in-memory store.

use outpost_core::archetype::Archetype;
use outpost_core::construction::LAYOUT_SPAWN_DELAY;
use outpost_core::error::SimError;
use outpost_core::faction::Faction;
use outpost_core::layout::{self, LayoutChoice, LayoutRecord, LayoutStore};
use outpost_core::math::Vec3;
use outpost_core::simulation::{BuildOutcome, Simulation};
use outpost_test_utils::fixtures::{builder, record, Scenario};
use outpost_test_utils::MemoryLayoutStore;

const MAP: &str = "arachnid";

fn saved_base(store: &mut MemoryLayoutStore, name: &str) -> Vec<LayoutRecord> {
    let mut scenario = Scenario::new(1);
    scenario
        .sim
        .load_map(&mut scenario.world, &*store, MAP)
        .unwrap();
    scenario.human_base();
    scenario.place(Archetype::MgTurret, 0.0, 200.0);
    scenario.sim.save_layout(store, name).unwrap();
    scenario
        .sim
        .structures()
        .iter()
        .map(LayoutRecord::of)
        .collect()
}

// =============================================================================
// Round trip
// =============================================================================

#[test]
fn test_saved_layout_rebuilds_same_base() {
    let mut store = MemoryLayoutStore::new();
    let original = saved_base(&mut store, "base");

    let mut scenario = Scenario::new(2);
    scenario.sim.request_layouts("base");
    let choice = scenario
        .sim
        .load_map(&mut scenario.world, &store, MAP)
        .unwrap();
    assert_eq!(choice, LayoutChoice::Named("base".to_string()));
    assert!(scenario.sim.structures().is_empty());

    scenario.run(LAYOUT_SPAWN_DELAY + 100);
    let rebuilt: Vec<LayoutRecord> = scenario
        .sim
        .structures()
        .iter()
        .map(LayoutRecord::of)
        .collect();
    assert_eq!(rebuilt.len(), original.len());
    for (a, b) in original.iter().zip(&rebuilt) {
        assert_eq!(a.archetype, b.archetype);
        assert!(a.origin.distance(b.origin) < 0.1, "{a:?} vs {b:?}");
    }
    assert!(scenario.sim.structures().iter().all(|s| s.spawned));
    assert!(scenario.sim.level().layout_request.is_empty());
}

/// Load `name` into a fresh scenario and return the origin of its turret.
fn loaded_turret_origin(store: &MemoryLayoutStore, name: &str) -> (Scenario, Vec3) {
    let mut scenario = Scenario::new(3);
    scenario.sim.request_layouts(name);
    scenario
        .sim
        .load_map(&mut scenario.world, store, MAP)
        .unwrap();
    scenario.run(LAYOUT_SPAWN_DELAY + 100);
    let origin = scenario
        .sim
        .structures()
        .iter()
        .find(|s| s.archetype == Archetype::MgTurret)
        .unwrap()
        .origin;
    (scenario, origin)
}

#[test]
fn test_player_built_structure_settles_once_on_reload() {
    let mut store = MemoryLayoutStore::new();
    let mut scenario = Scenario::new(1);
    scenario
        .sim
        .load_map(&mut scenario.world, &store, MAP)
        .unwrap();
    scenario.human_base();
    let b = scenario.add_actor(builder(1, Faction::Humans, 0.0, 200.0, 0.0));
    let BuildOutcome::Built(turret) =
        scenario
            .sim
            .build_if_valid(&mut scenario.world, &b, Archetype::MgTurret, 100.0)
    else {
        panic!("turret refused");
    };
    let built = scenario.sim.structure(turret).unwrap().origin;
    scenario.sim.save_layout(&mut store, "built").unwrap();

    // Placement leaves half a unit of clearance; the layout drop removes it.
    let (mut reloaded, settled) = loaded_turret_origin(&store, "built");
    assert!((built.x - settled.x).abs() < 0.01 && (built.y - settled.y).abs() < 0.01);
    assert!((built.z - settled.z - 0.5).abs() < 0.01, "{built:?} vs {settled:?}");

    reloaded.sim.save_layout(&mut store, "again").unwrap();
    let (_, again) = loaded_turret_origin(&store, "again");
    assert!(settled.distance(again) < 0.01, "{settled:?} vs {again:?}");
}

#[test]
fn test_dead_structures_are_not_saved() {
    let mut store = MemoryLayoutStore::new();
    let mut scenario = Scenario::new(1);
    scenario
        .sim
        .load_map(&mut scenario.world, &store, MAP)
        .unwrap();
    let base = scenario.human_base();
    scenario.sim.damage(
        &mut scenario.world,
        base.spawn,
        outpost_core::behavior::LETHAL_DAMAGE,
        None,
    );
    scenario.sim.save_layout(&mut store, "ruins").unwrap();

    let source = store.read(&layout::layout_path(MAP, "ruins")).unwrap().unwrap();
    let records = layout::parse_layout(&source);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].archetype, Archetype::Reactor);
}

#[test]
fn test_save_without_map() {
    let mut store = MemoryLayoutStore::new();
    let sim = Simulation::with_seed(1);
    assert!(matches!(
        sim.save_layout(&mut store, "base"),
        Err(SimError::NoMapLoaded)
    ));
    assert!(store.is_empty());
}

// =============================================================================
// Selection
// =============================================================================

#[test]
fn test_missing_request_falls_back_to_builtin() {
    let store = MemoryLayoutStore::new();
    let mut scenario = Scenario::new(1);
    scenario.sim.request_layouts("nope gone");
    let choice = scenario
        .sim
        .load_map(&mut scenario.world, &store, MAP)
        .unwrap();
    assert_eq!(choice, LayoutChoice::Builtin);
}

#[test]
fn test_listing_puts_builtin_first() {
    let mut store = MemoryLayoutStore::new();
    saved_base(&mut store, "beta");
    saved_base(&mut store, "alpha");

    let mut scenario = Scenario::new(1);
    scenario
        .sim
        .load_map(&mut scenario.world, &store, MAP)
        .unwrap();
    assert_eq!(
        scenario.sim.list_layouts(&store).unwrap(),
        vec!["*BUILTIN*", "alpha", "beta"]
    );
}

#[test]
fn test_random_pick_is_seeded() {
    let mut store = MemoryLayoutStore::new();
    for name in ["one", "two", "three", "four"] {
        saved_base(&mut store, name);
    }

    let pick = |seed: u64| {
        let mut scenario = Scenario::new(seed);
        scenario.sim.request_layouts("one two three four");
        scenario
            .sim
            .load_map(&mut scenario.world, &store, MAP)
            .unwrap()
    };
    for seed in 0..8 {
        let first = pick(seed);
        assert!(matches!(first, LayoutChoice::Named(_)));
        assert_eq!(first, pick(seed));
    }
}

// =============================================================================
// Loading
// =============================================================================

#[test]
fn test_bad_lines_are_skipped() {
    let mut store = MemoryLayoutStore::new();
    let table = outpost_core::data::ArchetypeTable::standard();
    let reactor = record(&table, Archetype::Reactor, 0.0, 0.0).to_line();
    store.insert(
        &layout::layout_path(MAP, "messy"),
        &format!("not a record\n\n{reactor}\n99 0 0 0 0 0 0 0 0 1 0 0 0\n"),
    );

    let mut scenario = Scenario::new(1);
    scenario.sim.request_layouts("messy");
    scenario
        .sim
        .load_map(&mut scenario.world, &store, MAP)
        .unwrap();
    scenario.run(LAYOUT_SPAWN_DELAY + 100);
    assert_eq!(scenario.sim.structures().len(), 1);
}

#[test]
fn test_overlapping_layout_item_is_discarded() {
    let mut store = MemoryLayoutStore::new();
    let table = outpost_core::data::ArchetypeTable::standard();
    let records = [
        record(&table, Archetype::Reactor, 0.0, 0.0),
        record(&table, Archetype::Armoury, 20.0, 0.0),
    ];
    store.insert(&layout::layout_path(MAP, "cramped"), &layout::format_layout(&records));

    let mut scenario = Scenario::new(1);
    scenario.sim.request_layouts("cramped");
    scenario
        .sim
        .load_map(&mut scenario.world, &store, MAP)
        .unwrap();
    let tick = scenario.run(LAYOUT_SPAWN_DELAY + 100);

    assert_eq!(scenario.sim.structures().len(), 1);
    assert_eq!(tick.removed.len(), 1);
}

#[test]
fn test_builtin_items_queued_by_host() {
    let store = MemoryLayoutStore::new();
    let mut scenario = Scenario::new(1);
    let choice = scenario
        .sim
        .load_map(&mut scenario.world, &store, MAP)
        .unwrap();
    assert_eq!(choice, LayoutChoice::Builtin);

    let table = scenario.sim.table().clone();
    scenario
        .sim
        .queue_layout_item(&mut scenario.world, record(&table, Archetype::Overmind, 0.0, 0.0));
    scenario.run(LAYOUT_SPAWN_DELAY - 100);
    assert!(scenario.sim.structures().is_empty());
    scenario.run(200);
    assert_eq!(scenario.sim.structures().len(), 1);
}
