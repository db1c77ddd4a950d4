//! Simulation benchmarks for outpost_core.
//!
//! Run with: `cargo bench -p outpost_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use outpost_core::archetype::Archetype;
use outpost_core::budget::plan_budget;
use outpost_core::data::{ArchetypeTable, BuildConfig};
use outpost_core::faction::Faction;
use outpost_core::level::Level;
use outpost_core::math::Vec3;
use outpost_core::structure::{Structure, StructureStore};
use outpost_test_utils::fixtures::{actor, builder, standing, Scenario};

/// A human base ringed by turrets with raiders standing around it.
fn busy_base() -> Scenario {
    let mut scenario = Scenario::new(7);
    scenario.human_base();
    for i in 0..12 {
        let angle = i as f32 * std::f32::consts::TAU / 12.0;
        scenario.place(Archetype::MgTurret, angle.cos() * 400.0, angle.sin() * 400.0);
    }
    for i in 0..8 {
        let x = -600.0 + i as f32 * 150.0;
        scenario.add_actor(actor(100 + i, Faction::Aliens, standing(x, 500.0)));
    }
    scenario
}

fn marked_store(table: &ArchetypeTable, count: usize) -> StructureStore {
    let mut store = StructureStore::new();
    for i in 0..count {
        let archetype = if i % 3 == 0 {
            Archetype::Medistat
        } else {
            Archetype::MgTurret
        };
        let row = table.get(archetype);
        let origin = Vec3::new((i % 20) as f32 * 80.0, (i / 20) as f32 * 80.0, 20.0);
        let mut s = Structure::new(archetype, origin, row.mins, row.maxs, row.health);
        s.spawned = true;
        s.marked = i % 2 == 0;
        s.mark_time = i as u32;
        store.insert(s);
    }
    store
}

/// Runs simulation benchmarks for the outpost_core crate.
pub fn simulation_benchmark(c: &mut Criterion) {
    c.bench_function("tick_busy_base", |b| {
        b.iter_batched(
            busy_base,
            |mut scenario| {
                for _ in 0..10 {
                    black_box(scenario.step());
                }
            },
            BatchSize::SmallInput,
        );
    });

    let table = ArchetypeTable::standard();
    let config = BuildConfig {
        mark_deconstruct: true,
        human_build_points: 400,
        ..BuildConfig::default()
    };
    let store = marked_store(&table, 200);
    let mut level = Level::default();
    level.recalculate(&store, &table, &config);
    c.bench_function("plan_budget_200_marked", |b| {
        b.iter(|| {
            black_box(plan_budget(
                &store,
                &table,
                &level,
                &config,
                Archetype::Armoury,
                black_box(Vec3::new(400.0, 400.0, 20.0)),
            ))
        });
    });

    let mut scenario = busy_base();
    let b = scenario.add_actor(builder(1, Faction::Humans, 0.0, -300.0, 180.0));
    c.bench_function("can_build_turret", |bench| {
        bench.iter(|| {
            black_box(
                scenario
                    .sim
                    .can_build(&mut scenario.world, &b, Archetype::MgTurret, 100.0),
            )
        });
    });
}

criterion_group!(benches, simulation_benchmark);
criterion_main!(benches);
