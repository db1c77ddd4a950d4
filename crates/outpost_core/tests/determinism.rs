//! Determinism of full scenarios.
//!
//! A busy scenario with combat, construction and decay must hash the same
//! on every run and survive a serialization round trip.

use outpost_core::archetype::Archetype;
use outpost_core::behavior::LETHAL_DAMAGE;
use outpost_core::faction::Faction;
use outpost_core::simulation::Simulation;
use outpost_test_utils::determinism::{
    find_first_divergence, verify_serialization_determinism, verify_simulation_determinism,
};
use outpost_test_utils::fixtures::{actor, builder, standing, Scenario};

/// Two bases with a raider in each, an armoury under construction and a
/// dying egg.
fn skirmish() -> Scenario {
    let mut scenario = Scenario::new(42);
    scenario.human_base();
    scenario.place(Archetype::MgTurret, 0.0, 200.0);
    let aliens = scenario.alien_base(1500.0);
    scenario.place(Archetype::AcidTube, 1400.0, 150.0);

    scenario.add_actor(actor(20, Faction::Aliens, standing(90.0, 150.0)));
    scenario.add_actor(actor(21, Faction::Humans, standing(1350.0, 150.0)));
    let b = scenario.add_actor(builder(22, Faction::Humans, -200.0, 0.0, 180.0));
    scenario
        .sim
        .build_if_valid(&mut scenario.world, &b, Archetype::Armoury, 100.0);
    scenario
        .sim
        .damage(&mut scenario.world, aliens.spawn, LETHAL_DAMAGE, None);
    scenario
}

#[test]
fn test_skirmish_is_deterministic() {
    assert!(verify_simulation_determinism(skirmish, 300));
}

#[test]
fn test_skirmish_never_diverges() {
    assert_eq!(find_first_divergence(skirmish, 300), None);
}

#[test]
fn test_skirmish_survives_serialization() {
    assert!(verify_serialization_determinism(skirmish, 100));
}

#[test]
fn test_restored_copy_matches() {
    let mut scenario = skirmish();
    let bytes = scenario.sim.serialize().unwrap();
    let restored = Simulation::deserialize(&bytes).unwrap();
    assert_eq!(scenario.sim.state_hash(), restored.state_hash());
    assert_eq!(restored.structures().len(), 7);

    scenario.run(1000);
    assert_eq!(scenario.sim.structures().len(), 7);
}
