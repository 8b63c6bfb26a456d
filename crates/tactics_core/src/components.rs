//! Unit component definitions.
//!
//! Components are plain data with small invariant-keeping helpers.
//! Health is not stored on the unit: it lives in the
//! [`HealthManager`](crate::health::HealthManager) registry keyed by
//! [`UnitId`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::grid::{Facing, GridCoordinate};
use crate::math::{fixed_serde, Fixed};

/// Unique identifier for units.
pub type UnitId = u32;

/// Team identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct TeamId(pub u8);

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "team {}", self.0)
    }
}

/// Per-turn movement and action budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionPoints {
    /// Moves allowed per turn.
    pub move_budget: u32,
    /// Actions (attacks) allowed per turn.
    pub act_budget: u32,
    /// Moves spent this turn.
    pub moves_used: u32,
    /// Actions spent this turn.
    pub acts_used: u32,
}

impl ActionPoints {
    /// Create a fresh budget.
    #[must_use]
    pub const fn new(move_budget: u32, act_budget: u32) -> Self {
        Self {
            move_budget,
            act_budget,
            moves_used: 0,
            acts_used: 0,
        }
    }

    /// Moves still available this turn.
    #[must_use]
    pub const fn moves_remaining(&self) -> u32 {
        self.move_budget.saturating_sub(self.moves_used)
    }

    /// Actions still available this turn.
    #[must_use]
    pub const fn acts_remaining(&self) -> u32 {
        self.act_budget.saturating_sub(self.acts_used)
    }

    /// Spend one move. Returns false if none remain.
    pub fn spend_move(&mut self) -> bool {
        if self.moves_remaining() == 0 {
            return false;
        }
        self.moves_used += 1;
        true
    }

    /// Spend one action. Returns false if none remain.
    pub fn spend_act(&mut self) -> bool {
        if self.acts_remaining() == 0 {
            return false;
        }
        self.acts_used += 1;
        true
    }

    /// Restore the full budget at a turn boundary.
    pub fn reset(&mut self) {
        self.moves_used = 0;
        self.acts_used = 0;
    }
}

impl Default for ActionPoints {
    fn default() -> Self {
        Self::new(1, 1)
    }
}

/// Attack statistics of a unit that can deal damage.
///
/// Invariant: `attacks_used <= attacks_per_turn`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttackCapability {
    /// Base damage per attack.
    pub damage: u32,
    /// Maximum Euclidean attack range in cells.
    #[serde(with = "fixed_serde")]
    pub range: Fixed,
    /// Minimum Euclidean range in cells (zero for melee).
    #[serde(with = "fixed_serde")]
    pub min_range: Fixed,
    /// Attacks allowed per turn.
    pub attacks_per_turn: u32,
    /// Attacks made this turn.
    pub attacks_used: u32,
    /// Ticks that must pass between two attacks.
    pub cooldown_ticks: u64,
    /// Tick of the most recent attack.
    pub last_attack_tick: Option<u64>,
}

impl AttackCapability {
    /// Create attack stats with one attack per turn and no cooldown.
    #[must_use]
    pub fn new(damage: u32, range: Fixed) -> Self {
        Self {
            damage,
            range,
            min_range: Fixed::ZERO,
            attacks_per_turn: 1,
            attacks_used: 0,
            cooldown_ticks: 0,
            last_attack_tick: None,
        }
    }

    /// Builder method to set attacks per turn.
    #[must_use]
    pub fn with_attacks_per_turn(mut self, attacks: u32) -> Self {
        self.attacks_per_turn = attacks;
        self
    }

    /// Builder method to set the cooldown.
    #[must_use]
    pub fn with_cooldown(mut self, ticks: u64) -> Self {
        self.cooldown_ticks = ticks;
        self
    }

    /// Builder method to set a minimum range.
    #[must_use]
    pub fn with_min_range(mut self, min_range: Fixed) -> Self {
        self.min_range = min_range;
        self
    }

    /// True while attacks remain this turn.
    #[must_use]
    pub const fn has_attacks_remaining(&self) -> bool {
        self.attacks_used < self.attacks_per_turn
    }

    /// Ticks left before the next attack is allowed.
    #[must_use]
    pub fn cooldown_remaining(&self, tick: u64) -> u64 {
        match self.last_attack_tick {
            Some(last) => last.saturating_add(self.cooldown_ticks).saturating_sub(tick),
            None => 0,
        }
    }

    /// Record an attack made at `tick`.
    pub fn record_attack(&mut self, tick: u64) {
        self.attacks_used = (self.attacks_used + 1).min(self.attacks_per_turn);
        self.last_attack_tick = Some(tick);
    }

    /// Reset per-turn counters.
    pub fn reset_turn(&mut self) {
        self.attacks_used = 0;
    }
}

/// A unit on the battlefield.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    /// Unique identifier.
    pub id: UnitId,
    /// Display name, usually the template name.
    pub name: String,
    /// Owning team.
    pub team: TeamId,
    /// Current cell.
    pub position: GridCoordinate,
    /// Direction the unit is looking.
    pub facing: Facing,
    /// Movement and action budget.
    pub action_points: ActionPoints,
    /// False once the unit has died; dead units no longer occupy tiles.
    pub alive: bool,
    /// Attack stats, if the unit can attack.
    pub attack: Option<AttackCapability>,
}

impl Unit {
    /// Start-of-turn reset of budgets and attack counters.
    pub fn reset_turn(&mut self) {
        self.action_points.reset();
        if let Some(attack) = self.attack.as_mut() {
            attack.reset_turn();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_points_spend_and_reset() {
        let mut ap = ActionPoints::new(2, 1);
        assert!(ap.spend_move());
        assert!(ap.spend_move());
        assert!(!ap.spend_move());
        assert!(ap.spend_act());
        assert!(!ap.spend_act());
        ap.reset();
        assert_eq!(ap.moves_remaining(), 2);
        assert_eq!(ap.acts_remaining(), 1);
    }

    #[test]
    fn test_attack_capability_per_turn_limit() {
        let mut attack = AttackCapability::new(3, Fixed::ONE).with_attacks_per_turn(2);
        attack.record_attack(1);
        assert!(attack.has_attacks_remaining());
        attack.record_attack(2);
        assert!(!attack.has_attacks_remaining());
        attack.record_attack(3);
        assert_eq!(attack.attacks_used, 2);
        attack.reset_turn();
        assert!(attack.has_attacks_remaining());
    }

    #[test]
    fn test_attack_cooldown() {
        let mut attack = AttackCapability::new(3, Fixed::ONE).with_cooldown(10);
        assert_eq!(attack.cooldown_remaining(0), 0);
        attack.record_attack(5);
        assert_eq!(attack.cooldown_remaining(5), 10);
        assert_eq!(attack.cooldown_remaining(12), 3);
        assert_eq!(attack.cooldown_remaining(15), 0);
        assert_eq!(attack.cooldown_remaining(40), 0);
    }

    #[test]
    fn test_huge_cooldown_saturates() {
        let mut attack = AttackCapability::new(3, Fixed::ONE).with_cooldown(u64::MAX);
        attack.record_attack(7);
        assert_eq!(attack.cooldown_remaining(7), u64::MAX - 7);
    }
}
