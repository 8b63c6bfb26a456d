//! Damage pipeline and validator benchmarks.
//!
//! Run with: `cargo bench -p tactics_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tactics_core::config::{DamageConfig, GridConfig, RulesConfig};
use tactics_core::damage::{Combatant, DamageCalculator};
use tactics_core::prelude::*;

fn combatants() -> (Combatant, Combatant) {
    let attacker = Combatant {
        id: 1,
        team: TeamId(0),
        position: GridCoordinate::new(0, 0),
        facing: Facing::North,
    };
    let target = Combatant {
        id: 2,
        team: TeamId(1),
        position: GridCoordinate::new(3, 4),
        facing: Facing::West,
    };
    (attacker, target)
}

fn walled_grid() -> Grid {
    let mut grid = Grid::new(16, 16);
    for z in 1..4 {
        let _ = grid.set_obstacle(GridCoordinate::new(2, z), Some(Obstacle::solid(CoverQuality::Partial)));
    }
    grid
}

/// Full modifier chain, cache disabled versus a warm cache.
pub fn damage_benchmark(c: &mut Criterion) {
    let grid = walled_grid();
    let (attacker, target) = combatants();

    let mut uncached = DamageCalculator::new(DamageConfig {
        cache_ttl_ticks: None,
        ..DamageConfig::default()
    });
    let mut tick = 0_u64;
    c.bench_function("damage_chain_uncached", |b| {
        b.iter(|| {
            tick += 1;
            black_box(uncached.compute(black_box(10), &attacker, &target, &grid, tick))
        })
    });

    let mut cached = DamageCalculator::new(DamageConfig {
        cache_ttl_ticks: Some(u64::MAX),
        ..DamageConfig::default()
    });
    c.bench_function("damage_chain_cached", |b| {
        b.iter(|| black_box(cached.compute(black_box(10), &attacker, &target, &grid, 1)))
    });

    let analyzer = CoverAnalyzer::new();
    c.bench_function("cover_analysis", |b| {
        b.iter(|| {
            black_box(analyzer.analyze_cover(
                &grid,
                black_box(attacker.position),
                black_box(target.position),
            ))
        })
    });
}

/// Move and attack legality on a populated battlefield.
pub fn validation_benchmark(c: &mut Criterion) {
    let config = RulesConfig {
        grid: GridConfig {
            width: 16,
            height: 16,
        },
        ..RulesConfig::default()
    };
    let mut field = match Battlefield::new(config, TeamData::default_pair()) {
        Ok(field) => field,
        Err(error) => panic!("benchmark setup failed: {error}"),
    };
    let soldier = UnitTemplate::soldier();
    let mut blue = Vec::new();
    let mut red = Vec::new();
    for x in 0..8 {
        if let Ok(id) = field.spawn_unit(&soldier, TeamId(0), GridCoordinate::new(x, 6)) {
            blue.push(id);
        }
        if let Ok(id) = field.spawn_unit(&soldier, TeamId(1), GridCoordinate::new(x, 8)) {
            red.push(id);
        }
    }

    c.bench_function("legal_moves", |b| {
        b.iter(|| {
            for &unit in &blue {
                black_box(field.legal_moves(unit));
            }
        })
    });

    c.bench_function("validate_attack_all_pairs", |b| {
        b.iter(|| {
            for &attacker in &blue {
                for &target in &red {
                    let _ = black_box(field.validate_attack(attacker, target));
                }
            }
        })
    });
}

criterion_group!(benches, damage_benchmark, validation_benchmark);
criterion_main!(benches);
