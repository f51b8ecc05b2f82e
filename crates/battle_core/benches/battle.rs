//! Battle benchmarks for battle_core.
//!
//! Run with: `cargo bench -p battle_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use battle_core::battle::turn_order;
use battle_core::events::EventLog;
use battle_core::prelude::*;
use battle_test_utils::fixtures::{duel, sample_provider, sample_registry, skirmish};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

/// Full computer-versus-computer skirmish, setup to outcome.
pub fn battle_benchmark(c: &mut Criterion) {
    let provider = sample_provider();
    c.bench_function("skirmish_to_completion", |b| {
        b.iter(|| {
            let mut battle = Battle::new(skirmish(), provider.clone()).unwrap();
            battle.drive(&mut ImmediateSink).unwrap();
            black_box(battle.finish().unwrap().rounds)
        })
    });
}

pub fn turn_order_benchmark(c: &mut Criterion) {
    let field = skirmish().build_field(&sample_registry()).unwrap();
    c.bench_function("turn_order_with_spread", |b| {
        let mut rng = SeededRng::new(1);
        b.iter(|| black_box(turn_order(&field, 10, &mut rng)))
    });
}

pub fn attack_benchmark(c: &mut Criterion) {
    let registry = sample_registry();
    let config = BattleConfig::default();
    let template = duel(0, "ogre", "squire", Controller::Computer)
        .build_field(&registry)
        .unwrap();
    c.bench_function("resolve_attack", |b| {
        let mut rng = SeededRng::new(1);
        b.iter(|| {
            let mut field = template.clone();
            let mut log = EventLog::new();
            AttackResolver::new(&mut rng, &config, &registry)
                .resolve(&mut field, UnitId(1), UnitId(11), &mut log)
                .unwrap();
            black_box(log.len())
        })
    });
}

criterion_group!(benches, battle_benchmark, turn_order_benchmark, attack_benchmark);
criterion_main!(benches);
