//! Saving through the directory store and checking what was written.

use std::fs;

use outpost_core::archetype::Archetype;
use outpost_core::data::ArchetypeTable;
use outpost_core::faction::Faction;
use outpost_core::layout::{self, LayoutChoice, LayoutStore};
use outpost_core::level::PendingZone;
use outpost_core::simulation::{BuildOutcome, Simulation};
use outpost_test_utils::fixtures::{builder, Scenario};
use outpost_test_utils::{MemoryLayoutStore, TestWorld};
use outpost_tools::validate::{check_exclusion_zones, check_layout};
use outpost_tools::DirectoryStore;

fn scratch(name: &str) -> DirectoryStore {
    let root = std::env::temp_dir().join(format!("outpost_layout_files_{name}_{}", std::process::id()));
    let _ = fs::remove_dir_all(&root);
    DirectoryStore::new(root)
}

#[test]
fn test_saved_base_checks_clean() {
    let mut store = scratch("saved_base");
    let mut scenario = Scenario::new(11);
    scenario
        .sim
        .load_map(&mut scenario.world, &MemoryLayoutStore::new(), "arachnid")
        .unwrap();
    scenario.human_base();
    scenario.place(Archetype::MgTurret, 0.0, 200.0);

    scenario.sim.save_layout(&mut store, "turrets").unwrap();

    let names = layout::list_layouts(&store, "arachnid").unwrap();
    assert_eq!(names, vec!["*BUILTIN*".to_string(), "turrets".to_string()]);

    let source = store
        .read(&layout::layout_path("arachnid", "turrets"))
        .unwrap()
        .unwrap();
    let report = check_layout(&source, &ArchetypeTable::standard());
    assert!(report.is_clean(), "{:?}", report.problems);
    assert_eq!(report.count(Faction::Humans), 3);

    let _ = fs::remove_dir_all(store.root());
}

#[test]
fn test_saved_layout_loads_into_new_map() {
    let mut store = scratch("reload");
    let mut first = Scenario::new(2);
    first
        .sim
        .load_map(&mut first.world, &store, "nexus")
        .unwrap();
    first.human_base();
    first.sim.save_layout(&mut store, "base").unwrap();

    let mut second = Scenario::new(3);
    second.sim.request_layouts("base");
    let choice = second
        .sim
        .load_map(&mut second.world, &store, "nexus")
        .unwrap();
    assert_eq!(choice, LayoutChoice::Named("base".to_string()));
    second.run(500);
    assert_eq!(second.sim.structures().len(), 2);
    assert!(second
        .sim
        .structures()
        .iter()
        .all(|s| s.spawned && s.health.is_full()));

    let _ = fs::remove_dir_all(store.root());
}

#[test]
fn test_exclusion_zones_written_by_simulation_check_clean() {
    let mut store = scratch("zones");
    let mut scenario = Scenario {
        sim: Simulation::with_seed(5),
        world: TestWorld::with_floor(),
    };
    scenario
        .sim
        .load_map(&mut scenario.world, &store, "tremor")
        .unwrap();
    scenario.sim.arm_exclusion_zone(Some(PendingZone {
        radius: 80.0,
        height: 40.0,
    }));
    let b = scenario.add_actor(builder(1, Faction::Aliens, 0.0, 0.0, 0.0));
    let outcome = scenario
        .sim
        .build_if_valid(&mut scenario.world, &b, Archetype::Overmind, 200.0);
    assert!(matches!(outcome, BuildOutcome::ZonePlaced(_)), "{outcome:?}");
    assert!(scenario.sim.structures().is_empty());
    scenario.sim.save_exclusion_zones(&mut store).unwrap();

    let source = store
        .read(&layout::exclusion_path("tremor"))
        .unwrap()
        .unwrap();
    assert!(check_exclusion_zones(&source).is_empty());
    let zones = layout::load_exclusion_zones(&store, "tremor").unwrap();
    assert_eq!(zones.len(), 1);
    assert!((zones[0].radius - 80.0).abs() < 1e-3);

    let _ = fs::remove_dir_all(store.root());
}
