//! Damage calculation through an ordered modifier chain.
//!
//! A hit starts from the attacker's base damage and passes through up to
//! five stages, in order:
//!
//! 1. variation (random additive offset)
//! 2. critical hit (random multiplier)
//! 3. tactical position (flank, rear, elevation, cover)
//! 4. team (friendly fire scaling)
//! 5. environment (weather, terrain, distance falloff)
//!
//! Each stage folds into the running value as
//! `value = (value + additive) * multiplier`. The result is rounded,
//! clamped at zero and finally raised to the configured minimum. Stages
//! that change nothing are not recorded.
//!
//! Identical requests within a short tick window reuse the previous
//! result, so a UI preview and the actual hit agree.

use std::collections::HashMap;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::components::{TeamId, UnitId};
use crate::config::{
    CriticalConfig, DamageConfig, EnvironmentConfig, TacticalConfig, TeamModifierConfig,
    VariationConfig,
};
use crate::cover::{AttackAngle, CoverAnalyzer};
use crate::grid::{Facing, Grid, GridCoordinate};
use crate::math::{fixed_serde, percent, round_to_u32, Fixed};

/// Pipeline stage that produced a modifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModifierKind {
    /// Random additive offset.
    Variation,
    /// Critical hit multiplier.
    Critical,
    /// Flank, rear, elevation and cover.
    Tactical,
    /// Friendly fire.
    Team,
    /// Weather, terrain and distance.
    Environment,
}

/// One applied step of the modifier chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageModifier {
    /// Stage that produced this modifier.
    pub kind: ModifierKind,
    /// Multiplier applied after the additive part.
    #[serde(with = "fixed_serde")]
    pub multiplier: Fixed,
    /// Flat amount added before multiplying.
    pub additive: i32,
    /// Human-readable explanation.
    pub description: String,
}

impl DamageModifier {
    fn new(kind: ModifierKind, multiplier: Fixed, additive: i32, description: String) -> Self {
        Self {
            kind,
            multiplier,
            additive,
            description,
        }
    }

    /// Fold this modifier into a running damage value.
    #[must_use]
    pub fn apply(&self, value: Fixed) -> Fixed {
        value
            .saturating_add(Fixed::from_num(self.additive))
            .saturating_mul(self.multiplier)
    }

    /// True if applying this modifier changes nothing.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.additive == 0 && self.multiplier == Fixed::ONE
    }
}

/// Outcome of one damage calculation.
///
/// Invariant: `final_damage` equals [`Self::fold`] of `base_damage` over
/// `modifiers`, rounded, clamped at zero and raised to the minimum floor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageCalculationResult {
    /// Damage before any modifier.
    pub base_damage: u32,
    /// Applied modifiers, in chain order.
    pub modifiers: Vec<DamageModifier>,
    /// Damage to apply.
    pub final_damage: u32,
    /// A critical hit was rolled.
    pub critical: bool,
}

impl DamageCalculationResult {
    /// Fold `base` through `modifiers` without rounding.
    #[must_use]
    pub fn fold(base: u32, modifiers: &[DamageModifier]) -> Fixed {
        modifiers
            .iter()
            .fold(Fixed::saturating_from_num(base), |value, modifier| modifier.apply(value))
    }

    /// Multiplier of the first modifier of a kind, if recorded.
    #[must_use]
    pub fn multiplier_of(&self, kind: ModifierKind) -> Option<Fixed> {
        self.modifiers
            .iter()
            .find(|m| m.kind == kind)
            .map(|m| m.multiplier)
    }
}

/// Who is involved in a hit and where they stand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Combatant {
    /// Unit id.
    pub id: UnitId,
    /// Team.
    pub team: TeamId,
    /// Cell.
    pub position: GridCoordinate,
    /// Facing, used for flank and rear detection.
    pub facing: Facing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CacheKey {
    base: u32,
    attacker: UnitId,
    target: UnitId,
    attacker_position: GridCoordinate,
    target_position: GridCoordinate,
}

/// Cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Requests answered from the cache.
    pub hits: u64,
    /// Requests that ran the chain.
    pub misses: u64,
}

/// Position of the damage RNG stream.
///
/// Saved with battlefield snapshots so a restored match keeps rolling
/// the same numbers as the original.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RngState {
    /// ChaCha key.
    pub seed: [u8; 32],
    /// Stream number.
    pub stream: u64,
    /// Words consumed so far.
    pub word_pos: u128,
}

/// Seeded damage calculator with a short-lived result cache.
#[derive(Debug, Clone)]
pub struct DamageCalculator {
    config: DamageConfig,
    rng: ChaCha8Rng,
    cover: CoverAnalyzer,
    cache: HashMap<CacheKey, (u64, DamageCalculationResult)>,
    cache_revision: Option<u64>,
    stats: CacheStats,
}

impl DamageCalculator {
    /// Create a calculator seeded from the configuration.
    #[must_use]
    pub fn new(config: DamageConfig) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            config,
            cover: CoverAnalyzer::default(),
            cache: HashMap::new(),
            cache_revision: None,
            stats: CacheStats::default(),
        }
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &DamageConfig {
        &self.config
    }

    /// Replace the configuration. The cache is cleared; the RNG stream continues.
    pub fn set_config(&mut self, config: DamageConfig) {
        self.config = config;
        self.clear_cache();
    }

    /// Where the RNG stream currently stands.
    #[must_use]
    pub fn rng_state(&self) -> RngState {
        RngState {
            seed: self.rng.get_seed(),
            stream: self.rng.get_stream(),
            word_pos: self.rng.get_word_pos(),
        }
    }

    /// Continue the RNG stream from a saved position.
    pub fn set_rng_state(&mut self, state: RngState) {
        let mut rng = ChaCha8Rng::from_seed(state.seed);
        rng.set_stream(state.stream);
        rng.set_word_pos(state.word_pos);
        self.rng = rng;
    }

    /// Cache counters.
    #[must_use]
    pub const fn cache_stats(&self) -> CacheStats {
        self.stats
    }

    /// Number of cached results.
    #[must_use]
    pub fn cached_entries(&self) -> usize {
        self.cache.len()
    }

    /// Drop every cached result.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// Drop cached results involving a unit, as attacker or target.
    pub fn invalidate_unit(&mut self, unit: UnitId) {
        self.cache
            .retain(|key, _| key.attacker != unit && key.target != unit);
    }

    /// Compute the damage `attacker` deals to `target`.
    pub fn compute(
        &mut self,
        base_damage: u32,
        attacker: &Combatant,
        target: &Combatant,
        grid: &Grid,
        tick: u64,
    ) -> DamageCalculationResult {
        let key = CacheKey {
            base: base_damage,
            attacker: attacker.id,
            target: target.id,
            attacker_position: attacker.position,
            target_position: target.position,
        };

        if let Some(ttl) = self.config.cache_ttl_ticks {
            if self.cache_revision != Some(grid.revision()) {
                self.cache.clear();
                self.cache_revision = Some(grid.revision());
            }
            self.cache
                .retain(|_, (stored, _)| tick.saturating_sub(*stored) < ttl);
            if let Some((_, cached)) = self.cache.get(&key) {
                self.stats.hits += 1;
                return cached.clone();
            }
        }

        self.stats.misses += 1;
        let result = self.run_chain(base_damage, attacker, target, grid);
        tracing::debug!(
            attacker = attacker.id,
            target = target.id,
            base = base_damage,
            final_damage = result.final_damage,
            critical = result.critical,
            "Computed damage"
        );

        if self.config.cache_ttl_ticks.is_some() {
            self.cache.insert(key, (tick, result.clone()));
        }
        result
    }

    fn run_chain(
        &mut self,
        base_damage: u32,
        attacker: &Combatant,
        target: &Combatant,
        grid: &Grid,
    ) -> DamageCalculationResult {
        let mut modifiers = Vec::new();
        let mut critical = false;

        if let Some(variation) = self.config.variation.clone() {
            modifiers.push(self.variation(&variation));
        }
        if let Some(config) = self.config.critical.clone() {
            if let Some(modifier) = self.critical(&config) {
                critical = true;
                modifiers.push(modifier);
            }
        }
        if let Some(tactical) = &self.config.tactical {
            modifiers.push(self.tactical(tactical, attacker, target, grid));
        }
        if let Some(team) = &self.config.team {
            modifiers.push(team_modifier(team, attacker, target));
        }
        if let Some(environment) = &self.config.environment {
            modifiers.push(environment_modifier(environment, attacker, target, grid));
        }
        modifiers.retain(|m| !m.is_noop());

        let mut final_damage = round_to_u32(DamageCalculationResult::fold(base_damage, &modifiers));
        if let Some(minimum) = self.config.minimum_damage {
            final_damage = final_damage.max(minimum);
        }

        DamageCalculationResult {
            base_damage,
            modifiers,
            final_damage,
            critical,
        }
    }

    fn variation(&mut self, config: &VariationConfig) -> DamageModifier {
        let (low, high) = (config.min.min(config.max), config.min.max(config.max));
        let offset = self.rng.gen_range(low..=high);
        DamageModifier::new(
            ModifierKind::Variation,
            Fixed::ONE,
            offset,
            format!("variation {offset:+}"),
        )
    }

    fn critical(&mut self, config: &CriticalConfig) -> Option<DamageModifier> {
        let roll = self.rng.gen_range(0..100u32);
        if roll >= config.chance_percent {
            return None;
        }
        let low = config.multiplier_percent.saturating_sub(config.variation_percent);
        let high = config.multiplier_percent.saturating_add(config.variation_percent);
        let rolled = self.rng.gen_range(low..=high);
        let multiplier = percent(to_i32(rolled));
        Some(DamageModifier::new(
            ModifierKind::Critical,
            multiplier,
            0,
            format!("critical hit {rolled}%"),
        ))
    }

    fn tactical(
        &self,
        config: &TacticalConfig,
        attacker: &Combatant,
        target: &Combatant,
        grid: &Grid,
    ) -> DamageModifier {
        let position =
            self.cover
                .tactical_position(grid, attacker.position, target.position, target.facing);

        let angle_bonus = match position.angle {
            AttackAngle::Front => 0,
            AttackAngle::Flank => config.flank_bonus_percent,
            AttackAngle::Rear => config.rear_bonus_percent,
        };
        let elevation_bonus = config
            .elevation_bonus_percent
            .saturating_mul(position.elevation_advantage);
        let cover_reduction = config.cover_reduction_percent(position.cover);
        let total = 100i32
            .saturating_add(to_i32(angle_bonus))
            .saturating_add(to_i32(elevation_bonus))
            .saturating_sub(to_i32(cover_reduction))
            .max(to_i32(config.floor_percent));

        DamageModifier::new(
            ModifierKind::Tactical,
            percent(total),
            0,
            format!(
                "{:?} attack, {} elevation, {:?} cover",
                position.angle, position.elevation_advantage, position.cover
            )
            .to_lowercase(),
        )
    }
}

fn team_modifier(config: &TeamModifierConfig, attacker: &Combatant, target: &Combatant) -> DamageModifier {
    let multiplier = if attacker.team == target.team {
        percent(to_i32(config.friendly_fire_percent))
    } else {
        Fixed::ONE
    };
    DamageModifier::new(ModifierKind::Team, multiplier, 0, "friendly fire".to_string())
}

fn environment_modifier(
    config: &EnvironmentConfig,
    attacker: &Combatant,
    target: &Combatant,
    grid: &Grid,
) -> DamageModifier {
    let weather = percent(to_i32(config.weather.damage_percent()));
    let terrain_kind = grid.terrain(target.position);
    let terrain = percent(to_i32(config.terrain.percent_for(terrain_kind)));

    let distance = attacker.position.euclidean_distance(target.position);
    let deviation = distance
        .saturating_sub(Fixed::saturating_from_num(config.optimal_distance))
        .saturating_abs();
    let falloff = Fixed::ONE
        .saturating_sub(percent(to_i32(config.falloff_percent_per_cell)).saturating_mul(deviation))
        .max(percent(to_i32(config.min_falloff_percent)));

    DamageModifier::new(
        ModifierKind::Environment,
        weather.saturating_mul(terrain).saturating_mul(falloff),
        0,
        format!(
            "{:?} weather, {terrain_kind:?} terrain, {}% falloff",
            config.weather,
            round_to_u32(falloff.saturating_mul(Fixed::from_num(100)))
        )
        .to_lowercase(),
    )
}

fn to_i32(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}
