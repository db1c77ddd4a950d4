//! Death, blast and removal of structures.

use outpost_core::archetype::Archetype;
use outpost_core::behavior::decay::{DECAY_DURATION, DETONATION_DELAY};
use outpost_core::behavior::{LETHAL_DAMAGE, TEAMKILL_PENALTY};
use outpost_core::events::BuildableEvent;
use outpost_core::faction::Faction;
use outpost_core::history::{BuildActor, BuildFate};
use outpost_core::simulation::BuildOutcome;
use outpost_core::structure::Phase;
use outpost_core::world::{ActorRegistry, EntityRef, World};
use outpost_test_utils::fixtures::{actor, builder, standing, Scenario};

fn explosions(events: &[BuildableEvent]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, BuildableEvent::Explosion { .. }))
        .count()
}

// =============================================================================
// Human structures
// =============================================================================

#[test]
fn test_telenode_blasts_then_vanishes() {
    let mut scenario = Scenario::new(1);
    let base = scenario.human_base();
    assert_eq!(scenario.sim.level().human_spawns, 1);

    scenario
        .sim
        .damage(&mut scenario.world, base.spawn, LETHAL_DAMAGE, None);
    let s = scenario.sim.structure(base.spawn).unwrap();
    assert_eq!(s.phase, Phase::AwaitingBlast);
    assert!(!s.is_alive());
    assert_eq!(scenario.sim.level().human_spawns, 0);

    let entry = scenario.sim.history().front().unwrap();
    assert_eq!(entry.fate, BuildFate::Destroyed);
    assert_eq!(entry.actor, BuildActor::World);

    let waiting = scenario.run(DETONATION_DELAY - 200);
    assert!(waiting.events.iter().any(|e| matches!(
        e,
        BuildableEvent::Destroyed { structure, fate: BuildFate::Destroyed, .. }
            if *structure == base.spawn
    )));
    assert_eq!(explosions(&waiting.events), 0);

    let after = scenario.run(1000);
    assert_eq!(explosions(&after.events), 1);
    assert_eq!(after.removed, vec![base.spawn]);
    assert!(scenario.sim.structure(base.spawn).is_none());
    assert!(scenario.world.linked(base.spawn).is_none());
    assert!(scenario.sim.structure(base.reactor).unwrap().is_alive());
}

#[test]
fn test_dead_structure_ignores_damage() {
    let mut scenario = Scenario::new(1);
    let base = scenario.human_base();
    scenario
        .sim
        .damage(&mut scenario.world, base.spawn, LETHAL_DAMAGE, None);
    let history_len = scenario.sim.history().len();

    scenario
        .sim
        .damage(&mut scenario.world, base.spawn, LETHAL_DAMAGE, None);
    assert_eq!(scenario.sim.history().len(), history_len);
    let destroyed = scenario
        .sim
        .take_events()
        .iter()
        .filter(|e| matches!(e, BuildableEvent::Destroyed { .. }))
        .count();
    assert_eq!(destroyed, 1);
}

#[test]
fn test_unfinished_structure_vanishes_without_blast() {
    let mut scenario = Scenario::new(1);
    scenario.human_base();
    let b = scenario.add_actor(builder(1, Faction::Humans, 0.0, 200.0, 0.0));
    let BuildOutcome::Built(turret) =
        scenario
            .sim
            .build_if_valid(&mut scenario.world, &b, Archetype::MgTurret, 100.0)
    else {
        panic!("turret refused");
    };

    scenario.step();
    scenario.sim.damage(&mut scenario.world, turret, 50, None);
    assert!(!scenario.sim.structure(turret).unwrap().solid);

    let events = scenario.run(300);
    assert_eq!(explosions(&events.events), 0);
    assert_eq!(events.removed, vec![turret]);
}

#[test]
fn test_construction_finishes_after_build_time() {
    let mut scenario = Scenario::new(1);
    scenario.human_base();
    let b = scenario.add_actor(builder(1, Faction::Humans, 0.0, 200.0, 0.0));
    let BuildOutcome::Built(turret) =
        scenario
            .sim
            .build_if_valid(&mut scenario.world, &b, Archetype::MgTurret, 100.0)
    else {
        panic!("turret refused");
    };

    let halfway = scenario.run(5000);
    assert!(halfway.completed.is_empty());
    let growing = scenario.sim.structure(turret).unwrap().health;
    assert!(growing.current > 1 && growing.current < growing.max);

    let done = scenario.run(6000);
    assert_eq!(done.completed, vec![turret]);
    assert!(scenario.sim.structure(turret).unwrap().spawned);
}

#[test]
fn test_teamkill_is_logged_and_penalised() {
    let mut scenario = Scenario::new(1);
    let base = scenario.human_base();
    let rogue = scenario.add_actor(actor(7, Faction::Humans, standing(600.0, 600.0)));

    scenario.sim.damage(
        &mut scenario.world,
        base.spawn,
        LETHAL_DAMAGE,
        Some(EntityRef::Actor(rogue.id)),
    );

    let entry = scenario.sim.history().front().unwrap();
    assert_eq!(entry.fate, BuildFate::TeamKilled);
    assert_eq!(entry.actor.name(), "player7");
    assert_eq!(
        scenario.world.actor(rogue.id).unwrap().penalty,
        TEAMKILL_PENALTY
    );

    let events = scenario.sim.take_events();
    assert!(events.iter().any(|e| matches!(
        e,
        BuildableEvent::TeamMessage { faction: Faction::Humans, message }
            if message.contains("DESTROYED by teammate player7")
    )));
}

#[test]
fn test_self_destruct_kills_one_faction() {
    let mut scenario = Scenario::new(1);
    scenario.human_base();
    let aliens = scenario.alien_base(2000.0);

    scenario.sim.self_destruct(&mut scenario.world, Faction::Humans);
    let dead = scenario
        .sim
        .structures()
        .iter()
        .filter(|s| !s.is_alive())
        .count();
    assert_eq!(dead, 2);
    assert!(scenario.sim.structure(aliens.overmind).unwrap().is_alive());
}

// =============================================================================
// Alien structures
// =============================================================================

#[test]
fn test_egg_melts_before_removal() {
    let mut scenario = Scenario::new(1);
    let base = scenario.alien_base(0.0);
    scenario
        .sim
        .damage(&mut scenario.world, base.spawn, LETHAL_DAMAGE, None);

    scenario.run(DETONATION_DELAY + 200);
    let egg = scenario.sim.structure(base.spawn).unwrap();
    assert_eq!(egg.phase, Phase::Melting);
    assert!(!egg.solid);

    let rest = scenario.run(DECAY_DURATION + 1000);
    assert_eq!(rest.removed, vec![base.spawn]);
    assert!(scenario.sim.structure(base.overmind).unwrap().is_alive());
}

#[test]
fn test_alien_regenerates_out_of_combat() {
    let mut scenario = Scenario::new(1);
    let base = scenario.alien_base(0.0);
    scenario.sim.damage(&mut scenario.world, base.spawn, 100, None);
    let hurt = scenario.sim.structure(base.spawn).unwrap().health.current;

    scenario.run(6000);
    let later = scenario.sim.structure(base.spawn).unwrap().health.current;
    assert!(later > hurt);
}
