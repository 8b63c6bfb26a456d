//! Test fixtures and helpers.
//!
//! Pre-built battlefields and rule sets for consistent testing.

use fixed::types::I32F32;
use tactics_core::config::{DamageConfig, GridConfig, RulesConfig};
use tactics_core::prelude::*;

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a fixed-point number from a float (for tests only).
///
/// Note: In real rules code, never use floats.
/// This is only for convenient test setup.
#[must_use]
pub fn fixed_f(n: f64) -> I32F32 {
    I32F32::from_num(n)
}

/// Rules with every damage stage disabled, so final damage equals base damage.
#[must_use]
pub fn plain_rules() -> RulesConfig {
    RulesConfig {
        damage: DamageConfig::disabled(),
        ..RulesConfig::default()
    }
}

/// Rules on a `width` x `height` grid with a seeded default damage chain.
#[must_use]
pub fn rules_with_grid(width: u32, height: u32, seed: u64) -> RulesConfig {
    let mut config = RulesConfig {
        grid: GridConfig { width, height },
        ..RulesConfig::default()
    };
    config.damage.seed = seed;
    config
}

/// Empty battlefield for the default blue/red pair.
///
/// # Panics
///
/// Panics if `config` is invalid.
#[must_use]
pub fn empty_battlefield(config: RulesConfig) -> Battlefield {
    Battlefield::new(config, TeamData::default_pair()).expect("fixture rules must be valid")
}

/// Handles of a two-unit duel.
#[derive(Debug, Clone, Copy)]
pub struct Duel {
    /// Team 0 unit.
    pub blue: UnitId,
    /// Team 1 unit.
    pub red: UnitId,
}

/// Two soldiers facing each other at the given cells.
///
/// # Panics
///
/// Panics if either cell cannot hold a unit.
#[must_use]
pub fn duel(config: RulesConfig, blue_at: GridCoordinate, red_at: GridCoordinate) -> (Battlefield, Duel) {
    let mut field = empty_battlefield(config);
    let soldier = UnitTemplate::soldier();
    let blue = field
        .spawn_unit(&soldier, TeamId(0), blue_at)
        .expect("blue spawn");
    let red = field
        .spawn_unit(&soldier, TeamId(1), red_at)
        .expect("red spawn");
    (field, Duel { blue, red })
}

/// Default battlefield with a soldier on every starting position.
///
/// # Panics
///
/// Panics if the default starting positions are unusable.
#[must_use]
pub fn skirmish(seed: u64) -> Battlefield {
    let mut config = RulesConfig::default();
    config.damage.seed = seed;
    let mut field = empty_battlefield(config);
    field
        .populate(&UnitTemplate::soldier())
        .expect("default starting positions are free");
    field
}

/// A soldier template with custom health and damage.
#[must_use]
pub fn soldier_with(max_health: u32, damage: u32) -> UnitTemplate {
    let mut template = UnitTemplate::soldier();
    template.max_health = max_health;
    if let Some(attack) = template.attack.as_mut() {
        attack.damage = damage;
    }
    template
}
