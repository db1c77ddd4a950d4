//! Putting logged structures back.

use outpost_core::archetype::Archetype;
use outpost_core::behavior::LETHAL_DAMAGE;
use outpost_core::faction::Faction;
use outpost_core::history::{BuildFate, BuildRecord};
use outpost_core::math::Vec3;
use outpost_core::structure::Phase;
use outpost_core::world::{ActorRegistry, World};
use outpost_test_utils::fixtures::{actor, standing, Scenario};

/// A human base with a destroyed armoury north of the reactor.
fn ruined_armoury() -> (Scenario, BuildRecord) {
    let mut scenario = Scenario::new(3);
    scenario.human_base();
    let armoury = scenario.place(Archetype::Armoury, 0.0, 200.0);
    scenario
        .sim
        .damage(&mut scenario.world, armoury, LETHAL_DAMAGE, None);
    let record = scenario.sim.history().front().unwrap().clone();
    assert_eq!(record.fate, BuildFate::Destroyed);
    assert_eq!(record.archetype, Archetype::Armoury);
    (scenario, record)
}

#[test]
fn test_revert_over_own_remains() {
    let (mut scenario, record) = ruined_armoury();
    assert!(scenario.sim.revert_can_fit(&mut scenario.world, &record));

    let id = scenario
        .sim
        .spawn_reverted(&mut scenario.world, &record, false)
        .unwrap();
    let reverted = scenario.sim.structure(id).unwrap();
    assert_eq!(reverted.phase, Phase::Reverting);
    assert!(!reverted.solid);
    assert!(reverted.spawned);
    assert!(reverted.health.is_full());
    assert_eq!(scenario.sim.structures().len(), 3);

    scenario.step();
    let settled = scenario.sim.structure(id).unwrap();
    assert_eq!(settled.phase, Phase::Operating);
    assert!(settled.solid);
    assert!(settled.origin.distance(record.origin) < 0.1);
}

#[test]
fn test_revert_blocked_by_live_structure() {
    let (mut scenario, record) = ruined_armoury();
    scenario.run(6000);
    assert_eq!(scenario.sim.structures().len(), 2);

    scenario.place(Archetype::Medistat, 0.0, 200.0);
    assert!(!scenario.sim.revert_can_fit(&mut scenario.world, &record));
}

#[test]
fn test_reverted_structure_waits_for_occupants() {
    let (mut scenario, record) = ruined_armoury();
    let squatter = scenario.add_actor(actor(8, Faction::Humans, standing(0.0, 200.0)));

    let id = scenario
        .sim
        .spawn_reverted(&mut scenario.world, &record, true)
        .unwrap();
    assert!(scenario.world.is_tangible(squatter.id));
    assert!(scenario.sim.structure(id).unwrap().marked);

    scenario.step();
    assert!(!scenario.sim.structure(id).unwrap().solid);
    let pushed = scenario.world.actor(squatter.id).unwrap();
    assert_ne!(pushed.velocity, Vec3::ZERO);

    scenario.world.remove_actor(squatter.id);
    scenario.run(200);
    let settled = scenario.sim.structure(id).unwrap();
    assert!(settled.solid);
    assert_eq!(settled.phase, Phase::Operating);
}

#[test]
fn test_log_names_survive_by_id() {
    let (scenario, record) = ruined_armoury();
    let id = record.id.unwrap();
    assert_eq!(scenario.sim.build_log_name(id), "<world>");
    assert_eq!(
        scenario.sim.build_log_name(id + 1000),
        outpost_core::history::EXPIRED_NAME
    );
}
