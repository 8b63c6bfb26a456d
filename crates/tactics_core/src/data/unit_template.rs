//! Unit templates for data-driven unit definitions.

use serde::{Deserialize, Serialize};

use crate::components::{ActionPoints, AttackCapability};
use crate::error::{Result, TacticsError};
use crate::math::percent;

/// Weapon stats of a template.
///
/// Ranges are stored in percent of a cell (`150` = 1.5 cells).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackTemplate {
    /// Base damage per attack.
    pub damage: u32,

    /// Maximum Euclidean range.
    #[serde(default = "default_range_percent")]
    pub range_percent: u32,

    /// Minimum Euclidean range.
    #[serde(default)]
    pub min_range_percent: u32,

    /// Attacks allowed per turn.
    #[serde(default = "default_attacks_per_turn")]
    pub attacks_per_turn: u32,

    /// Ticks between attacks.
    #[serde(default)]
    pub cooldown_ticks: u64,
}

const fn default_range_percent() -> u32 {
    100
}

const fn default_attacks_per_turn() -> u32 {
    1
}

impl AttackTemplate {
    /// Build the runtime attack capability.
    #[must_use]
    pub fn to_capability(&self) -> AttackCapability {
        AttackCapability::new(self.damage, percent(clamp_i32(self.range_percent)))
            .with_min_range(percent(clamp_i32(self.min_range_percent)))
            .with_attacks_per_turn(self.attacks_per_turn)
            .with_cooldown(self.cooldown_ticks)
    }
}

/// Data-driven unit definition.
///
/// # Example RON
///
/// ```ron
/// UnitTemplate(
///     name: "archer",
///     max_health: 3,
///     attack: Some(AttackTemplate(
///         damage: 2,
///         range_percent: 300,
///         min_range_percent: 150,
///     )),
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitTemplate {
    /// Unique template name.
    pub name: String,

    /// Maximum health points.
    pub max_health: u32,

    /// Moves per turn.
    #[serde(default = "default_budget")]
    pub move_budget: u32,

    /// Actions per turn.
    #[serde(default = "default_budget")]
    pub act_budget: u32,

    /// Weapon, `None` for units that cannot attack.
    #[serde(default)]
    pub attack: Option<AttackTemplate>,
}

const fn default_budget() -> u32 {
    1
}

fn clamp_i32(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

impl UnitTemplate {
    /// Melee soldier: 3 health, hits adjacent cells for 1.
    #[must_use]
    pub fn soldier() -> Self {
        Self {
            name: "soldier".to_string(),
            max_health: 3,
            move_budget: 1,
            act_budget: 1,
            attack: Some(AttackTemplate {
                damage: 1,
                range_percent: 100,
                min_range_percent: 0,
                attacks_per_turn: 1,
                cooldown_ticks: 0,
            }),
        }
    }

    /// Parse a list of templates from RON text.
    pub fn list_from_ron_str(text: &str) -> Result<Vec<Self>> {
        ron::from_str(text).map_err(|e| TacticsError::DataParseError {
            path: "<inline>".to_string(),
            message: e.to_string(),
        })
    }

    /// Action budget for a fresh unit.
    #[must_use]
    pub const fn action_points(&self) -> ActionPoints {
        ActionPoints::new(self.move_budget, self.act_budget)
    }

    /// Validate template values. Returns a list of problems.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.max_health == 0 {
            errors.push(format!("template '{}' has zero max health", self.name));
        }
        if let Some(attack) = &self.attack {
            if attack.min_range_percent > attack.range_percent {
                errors.push(format!(
                    "template '{}' has a minimum range above its range",
                    self.name
                ));
            }
            if attack.attacks_per_turn == 0 {
                errors.push(format!("template '{}' can never attack", self.name));
            }
        }
        errors
    }
}
