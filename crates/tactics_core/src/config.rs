//! Designer-tunable rules configuration.
//!
//! Every tunable of the rules engine lives here. Percentages are stored
//! as integers (`150` means 1.5x) and converted to fixed-point where
//! they are used. All structs deserialize from RON with per-field
//! defaults, so a partial file only overrides what it names.
//!
//! Optional damage stages are `Option`s: `None` disables the stage.

use serde::{Deserialize, Serialize};

use crate::cover::CoverQuality;
use crate::error::{Result, TacticsError};
use crate::grid::TerrainKind;

/// Complete rules configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RulesConfig {
    /// Battlefield dimensions.
    pub grid: GridConfig,
    /// Turn handling.
    pub turns: TurnConfig,
    /// Movement legality rules.
    pub movement: MovementRules,
    /// Attack legality rules.
    pub attack: AttackRules,
    /// Damage modifier chain.
    pub damage: DamageConfig,
    /// Health and regeneration.
    pub health: HealthConfig,
    /// Event queue limits.
    pub events: BroadcasterConfig,
}

impl RulesConfig {
    /// Parse a configuration from RON text.
    pub fn from_ron_str(text: &str) -> Result<Self> {
        let config: Self = ron::from_str(text).map_err(|e| TacticsError::DataParseError {
            path: "<inline>".to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject inconsistent values.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| Err(TacticsError::InvalidConfig(msg.to_string()));

        if self.grid.width == 0 || self.grid.height == 0 {
            return invalid("grid dimensions must be at least 1x1");
        }
        if self.grid.width > 256 || self.grid.height > 256 {
            return invalid("grid dimensions must not exceed 256x256");
        }
        if let Some(variation) = &self.damage.variation {
            if variation.min > variation.max {
                return invalid("damage variation min exceeds max");
            }
        }
        if let Some(critical) = &self.damage.critical {
            if critical.chance_percent > 100 {
                return invalid("critical chance above 100%");
            }
            if critical.variation_percent > critical.multiplier_percent {
                return invalid("critical variation larger than the critical multiplier");
            }
        }
        if self.events.max_queue == 0 {
            return invalid("event queue capacity must be at least 1");
        }
        if self.events.max_per_tick == 0 {
            return invalid("event processing budget must be at least 1");
        }
        if let Some(regen) = &self.health.regeneration {
            if regen.cap_percent > 100 {
                return invalid("regeneration cap above 100%");
            }
        }
        Ok(())
    }
}

/// Battlefield dimensions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Width in cells.
    pub width: u32,
    /// Height in cells.
    pub height: u32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            width: 4,
            height: 4,
        }
    }
}

/// Turn handling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TurnConfig {
    /// Only the active team may move and attack.
    pub enforce_turns: bool,
}

impl Default for TurnConfig {
    fn default() -> Self {
        Self {
            enforce_turns: true,
        }
    }
}

/// Movement legality rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementRules {
    /// Largest Manhattan distance a single move may cover.
    pub max_move_distance: u32,
    /// Allow steps that change both axes.
    pub allow_diagonal: bool,
}

impl Default for MovementRules {
    fn default() -> Self {
        Self {
            max_move_distance: 1,
            allow_diagonal: false,
        }
    }
}

/// Attack legality rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttackRules {
    /// Global Euclidean range cap in percent of a cell, applied on top of unit range.
    pub max_range_percent: u32,
    /// Allow attacking along a diagonal.
    pub allow_diagonal: bool,
    /// Reject attacks against units of the attacker's team.
    pub prevent_friendly_fire: bool,
    /// Reject attacks through full-cover obstacles.
    pub check_line_of_sight: bool,
    /// Ticks between the attack and the damage keyframe (0 = immediate).
    pub impact_delay_ticks: u64,
}

impl Default for AttackRules {
    fn default() -> Self {
        Self {
            max_range_percent: 300,
            allow_diagonal: true,
            prevent_friendly_fire: true,
            check_line_of_sight: true,
            impact_delay_ticks: 0,
        }
    }
}

/// Uniform additive damage offset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariationConfig {
    /// Smallest offset (inclusive).
    pub min: i32,
    /// Largest offset (inclusive).
    pub max: i32,
}

/// Critical hit roll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriticalConfig {
    /// Chance of a critical hit.
    pub chance_percent: u32,
    /// Damage multiplier on a critical hit.
    pub multiplier_percent: u32,
    /// Uniform spread applied to the multiplier (plus or minus).
    pub variation_percent: u32,
}

/// Flank, rear, elevation and cover modifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TacticalConfig {
    /// Bonus when attacking the target's side.
    pub flank_bonus_percent: u32,
    /// Bonus when attacking the target's back.
    pub rear_bonus_percent: u32,
    /// Bonus per level of height advantage.
    pub elevation_bonus_percent: u32,
    /// Reduction for light cover.
    pub light_cover_percent: u32,
    /// Reduction for partial cover.
    pub partial_cover_percent: u32,
    /// Reduction for heavy cover.
    pub heavy_cover_percent: u32,
    /// Reduction for full cover.
    pub full_cover_percent: u32,
    /// Lowest allowed combined multiplier.
    pub floor_percent: u32,
}

impl TacticalConfig {
    /// Damage reduction for a cover tier.
    #[must_use]
    pub const fn cover_reduction_percent(&self, cover: CoverQuality) -> u32 {
        match cover {
            CoverQuality::None => 0,
            CoverQuality::Light => self.light_cover_percent,
            CoverQuality::Partial => self.partial_cover_percent,
            CoverQuality::Heavy => self.heavy_cover_percent,
            CoverQuality::Full => self.full_cover_percent,
        }
    }
}

impl Default for TacticalConfig {
    fn default() -> Self {
        Self {
            flank_bonus_percent: 25,
            rear_bonus_percent: 50,
            elevation_bonus_percent: 10,
            light_cover_percent: 10,
            partial_cover_percent: 25,
            heavy_cover_percent: 40,
            full_cover_percent: 60,
            floor_percent: 10,
        }
    }
}

/// Same-team damage handling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamModifierConfig {
    /// Damage multiplier when attacker and target share a team.
    pub friendly_fire_percent: u32,
}

/// Weather conditions for the environment stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Weather {
    /// No effect.
    #[default]
    Clear,
    /// Slightly reduced damage.
    Rain,
    /// Reduced visibility.
    Fog,
    /// Heavy interference.
    Storm,
}

impl Weather {
    /// Damage multiplier for this weather, in percent.
    #[must_use]
    pub const fn damage_percent(self) -> u32 {
        match self {
            Self::Clear => 100,
            Self::Rain => 90,
            Self::Fog => 85,
            Self::Storm => 75,
        }
    }
}

/// Terrain damage multipliers, keyed by the target's tile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainModifiers {
    /// Open ground.
    pub open_percent: u32,
    /// Forest.
    pub forest_percent: u32,
    /// Rough ground.
    pub rough_percent: u32,
    /// Water.
    pub water_percent: u32,
}

impl TerrainModifiers {
    /// Multiplier for a terrain kind.
    #[must_use]
    pub const fn percent_for(&self, terrain: TerrainKind) -> u32 {
        match terrain {
            TerrainKind::Open => self.open_percent,
            TerrainKind::Forest => self.forest_percent,
            TerrainKind::Rough => self.rough_percent,
            TerrainKind::Water => self.water_percent,
        }
    }
}

impl Default for TerrainModifiers {
    fn default() -> Self {
        Self {
            open_percent: 100,
            forest_percent: 85,
            rough_percent: 95,
            water_percent: 115,
        }
    }
}

/// Weather, terrain and distance falloff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    /// Current weather.
    pub weather: Weather,
    /// Terrain multipliers.
    pub terrain: TerrainModifiers,
    /// Distance (cells, Euclidean) at which no falloff applies.
    pub optimal_distance: u32,
    /// Damage lost per cell of deviation from the optimal distance.
    pub falloff_percent_per_cell: u32,
    /// Smallest falloff multiplier.
    pub min_falloff_percent: u32,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            weather: Weather::Clear,
            terrain: TerrainModifiers::default(),
            optimal_distance: 1,
            falloff_percent_per_cell: 10,
            min_falloff_percent: 50,
        }
    }
}

/// Damage modifier chain configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DamageConfig {
    /// Stage 1: random additive offset.
    pub variation: Option<VariationConfig>,
    /// Stage 2: critical hits.
    pub critical: Option<CriticalConfig>,
    /// Stage 3: flank/rear/elevation/cover.
    pub tactical: Option<TacticalConfig>,
    /// Stage 4: friendly fire scaling.
    pub team: Option<TeamModifierConfig>,
    /// Stage 5: weather/terrain/falloff.
    pub environment: Option<EnvironmentConfig>,
    /// Stage 6: absolute minimum damage.
    pub minimum_damage: Option<u32>,
    /// Reuse identical results for this many ticks. `None` disables the cache.
    pub cache_ttl_ticks: Option<u64>,
    /// Seed for the damage RNG.
    pub seed: u64,
}

impl DamageConfig {
    /// A chain with every stage disabled: final damage equals base damage.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            variation: None,
            critical: None,
            tactical: None,
            team: None,
            environment: None,
            minimum_damage: None,
            cache_ttl_ticks: None,
            seed: 0,
        }
    }
}

impl Default for DamageConfig {
    fn default() -> Self {
        Self {
            variation: Some(VariationConfig { min: -1, max: 1 }),
            critical: Some(CriticalConfig {
                chance_percent: 10,
                multiplier_percent: 150,
                variation_percent: 10,
            }),
            tactical: Some(TacticalConfig::default()),
            team: Some(TeamModifierConfig {
                friendly_fire_percent: 50,
            }),
            environment: Some(EnvironmentConfig::default()),
            minimum_damage: Some(1),
            cache_ttl_ticks: Some(2),
            seed: 0,
        }
    }
}

/// Time-gated health regeneration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegenerationConfig {
    /// Health restored per 100 ticks; fractions accumulate.
    pub per_hundred_ticks: u32,
    /// Ticks that must pass after the last damage before regeneration starts.
    pub delay_ticks: u64,
    /// Regeneration never raises health above this share of max.
    pub cap_percent: u32,
}

impl Default for RegenerationConfig {
    fn default() -> Self {
        Self {
            per_hundred_ticks: 25,
            delay_ticks: 60,
            cap_percent: 100,
        }
    }
}

/// Health configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct HealthConfig {
    /// Regeneration for every registered unit; `None` disables it.
    pub regeneration: Option<RegenerationConfig>,
}

/// Event queue limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BroadcasterConfig {
    /// Queue length at which the lowest-priority quartile is evicted.
    pub max_queue: usize,
    /// Events dispatched per tick.
    pub max_per_tick: usize,
    /// Identical events within this many ticks are dropped.
    pub dedupe_window_ticks: u64,
}

impl Default for BroadcasterConfig {
    fn default() -> Self {
        Self {
            max_queue: 64,
            max_per_tick: 16,
            dedupe_window_ticks: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(RulesConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_ron_overrides_only_named_fields() {
        let config = RulesConfig::from_ron_str(
            "(grid: (width: 6), movement: (allow_diagonal: true), damage: (minimum_damage: Some(2)))",
        )
        .unwrap();
        assert_eq!(config.grid.width, 6);
        assert_eq!(config.grid.height, 4);
        assert!(config.movement.allow_diagonal);
        assert_eq!(config.movement.max_move_distance, 1);
        assert_eq!(config.damage.minimum_damage, Some(2));
        assert!(config.damage.critical.is_some());
    }

    #[test]
    fn test_disabled_stages_from_ron() {
        let config = RulesConfig::from_ron_str("(damage: (critical: None, variation: None))").unwrap();
        assert!(config.damage.critical.is_none());
        assert!(config.damage.variation.is_none());
    }

    #[test]
    fn test_rejects_inverted_variation() {
        let mut config = RulesConfig::default();
        config.damage.variation = Some(VariationConfig { min: 3, max: -3 });
        assert!(matches!(
            config.validate(),
            Err(TacticsError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_rejects_zero_sized_grid() {
        let result = RulesConfig::from_ron_str("(grid: (width: 0))");
        assert!(result.is_err());
    }

    #[test]
    fn test_malformed_ron_reports_parse_error() {
        let result = RulesConfig::from_ron_str("(grid: (width: \"four\"))");
        assert!(matches!(result, Err(TacticsError::DataParseError { .. })));
    }
}
