//! Human power network, the reactor and the support structures.

use outpost_core::archetype::Archetype;
use outpost_core::behavior::LETHAL_DAMAGE;
use outpost_core::events::{BuildableEvent, Notice};
use outpost_core::faction::Faction;
use outpost_core::math::Vec3;
use outpost_core::world::{ActorId, ActorRegistry, ActorSnapshot, EntityRef, Item, World};
use outpost_test_utils::fixtures::{actor, standing, Scenario};

fn notices_for(events: &[BuildableEvent], id: ActorId) -> Vec<Notice> {
    events
        .iter()
        .filter_map(|e| match e {
            BuildableEvent::Notify { actor, notice } if *actor == id => Some(*notice),
            _ => None,
        })
        .collect()
}

// =============================================================================
// Power
// =============================================================================

#[test]
fn test_reactor_death_unpowers_dependents() {
    let mut scenario = Scenario::new(1);
    let base = scenario.human_base();
    let armoury = scenario.place(Archetype::Armoury, 0.0, 200.0);
    let shopper = scenario.add_actor(actor(2, Faction::Humans, standing(0.0, 300.0)));
    let probe = Vec3::new(0.0, 200.0, 0.0);

    assert!(scenario.sim.structure(armoury).unwrap().powered);
    assert!(scenario.sim.structure_in_range(probe, 300.0, Archetype::Armoury));
    scenario.sim.activate(&mut scenario.world, armoury, shopper.id);
    assert_eq!(
        notices_for(&scenario.sim.take_events(), shopper.id),
        vec![Notice::ArmouryMenu]
    );

    scenario
        .sim
        .damage(&mut scenario.world, base.reactor, LETHAL_DAMAGE, None);
    assert!(!scenario.sim.structure(base.reactor).unwrap().powered);
    scenario.run(2500);

    assert!(!scenario.sim.structure(armoury).unwrap().powered);
    assert!(!scenario.sim.structure_in_range(probe, 300.0, Archetype::Armoury));
    scenario.sim.activate(&mut scenario.world, armoury, shopper.id);
    assert_eq!(
        notices_for(&scenario.sim.take_events(), shopper.id),
        vec![Notice::NotPowered]
    );
}

#[test]
fn test_armoury_ignores_enemies() {
    let mut scenario = Scenario::new(1);
    scenario.human_base();
    let armoury = scenario.place(Archetype::Armoury, 0.0, 200.0);
    let alien = scenario.add_actor(actor(5, Faction::Aliens, standing(0.0, 300.0)));

    scenario.sim.activate(&mut scenario.world, armoury, alien.id);
    assert!(notices_for(&scenario.sim.take_events(), alien.id).is_empty());
}

#[test]
fn test_structure_in_range_needs_power_for_humans() {
    let mut scenario = Scenario::new(1);
    let medistat = scenario.place(Archetype::Medistat, 0.0, 0.0);
    assert!(!scenario.sim.structure(medistat).unwrap().powered);
    assert!(!scenario
        .sim
        .structure_in_range(Vec3::ZERO, 200.0, Archetype::Medistat));

    let mut aliens = Scenario::new(1);
    aliens.alien_base(0.0);
    assert!(aliens
        .sim
        .structure_in_range(Vec3::new(120.0, 0.0, 0.0), 50.0, Archetype::AlienSpawn));
}

// =============================================================================
// Reactor
// =============================================================================

#[test]
fn test_reactor_zaps_nearby_enemy() {
    let mut scenario = Scenario::new(1);
    let base = scenario.human_base();
    let alien = scenario.add_actor(actor(9, Faction::Aliens, standing(80.0, 0.0)));

    let events = scenario.run(300).events;
    assert!(scenario.world.damage_to(alien.id) > 0);
    assert!(events.iter().any(|e| matches!(
        e,
        BuildableEvent::TeslaTrail { structure, target }
            if *structure == base.reactor && *target == alien.id
    )));
}

#[test]
fn test_teammate_damage_is_reported() {
    let mut scenario = Scenario::new(1);
    let base = scenario.human_base();
    let rogue = scenario.add_actor(actor(3, Faction::Humans, standing(0.0, 600.0)));

    scenario
        .sim
        .damage(&mut scenario.world, base.reactor, 10, Some(EntityRef::Actor(rogue.id)));
    let events = scenario.sim.take_events();
    assert!(events.iter().any(|e| matches!(
        e,
        BuildableEvent::TeamMessage { faction: Faction::Humans, message }
            if message.contains("DAMAGED by TEAMMATE player3")
    )));
    let reactor = scenario.sim.structure(base.reactor).unwrap();
    assert_eq!(reactor.health.current, reactor.health.max - 10);
}

// =============================================================================
// Support structures
// =============================================================================

#[test]
fn test_medistat_heals_and_hands_out_medkits() {
    let mut scenario = Scenario::new(1);
    scenario.human_base();
    scenario.place(Archetype::Medistat, 0.0, 200.0);

    let mut patient = actor(4, Faction::Humans, standing(0.0, 200.0));
    patient.health = 50;
    let patient = scenario.add_actor(patient);
    let healthy = scenario.add_actor(actor(6, Faction::Humans, standing(20.0, 210.0)));

    scenario.run(1000);

    let healed = scenario.world.actor(patient.id).unwrap();
    assert!(healed.health > 50);
    assert!(healed.health <= healed.max_health);
    assert!(scenario
        .world
        .items_given
        .contains(&(healthy.id, Item::Medkit)));
}

fn wounded(id: u32, x: f32, y: f32) -> ActorSnapshot {
    let mut patient = actor(id, Faction::Humans, standing(x, y));
    patient.health = 50;
    patient
}

#[test]
fn test_medistat_heals_patient_nearest_center() {
    let mut scenario = Scenario::new(1);
    scenario.human_base();
    scenario.place(Archetype::Medistat, 0.0, 200.0);

    let centred = scenario.add_actor(wounded(4, 0.0, 200.0));
    let edge = scenario.add_actor(wounded(5, 25.0, 200.0));

    scenario.run(500);

    assert!(scenario.world.actor(centred.id).unwrap().health > 50);
    assert_eq!(scenario.world.actor(edge.id).unwrap().health, 50);
}

#[test]
fn test_medistat_breaks_distance_ties_by_actor_id() {
    let mut scenario = Scenario::new(1);
    scenario.human_base();
    scenario.place(Archetype::Medistat, 0.0, 200.0);

    let high = scenario.add_actor(wounded(9, 20.0, 200.0));
    let low = scenario.add_actor(wounded(4, -20.0, 200.0));

    scenario.run(500);

    assert!(scenario.world.actor(low.id).unwrap().health > 50);
    assert_eq!(scenario.world.actor(high.id).unwrap().health, 50);
}

#[test]
fn test_repeater_hands_out_ammo() {
    let mut scenario = Scenario::new(1);
    let repeater = scenario.place(Archetype::Repeater, 0.0, 0.0);
    let soldier = scenario.add_actor(actor(2, Faction::Humans, standing(0.0, 100.0)));

    scenario.sim.activate(&mut scenario.world, repeater, soldier.id);
    assert_eq!(scenario.world.items_given, vec![(soldier.id, Item::FullAmmo)]);
}

#[test]
fn test_idle_repeater_removes_itself() {
    let mut scenario = Scenario::new(1);
    let repeater = scenario.place(Archetype::Repeater, 0.0, 0.0);

    let early = scenario.run(60_000);
    assert!(early.removed.is_empty());

    let late = scenario.run(40_000);
    assert!(late.events.iter().any(|e| matches!(
        e,
        BuildableEvent::Destroyed { structure, .. } if *structure == repeater
    )));
    assert_eq!(late.removed, vec![repeater]);
    assert!(scenario.sim.structures().is_empty());
}
