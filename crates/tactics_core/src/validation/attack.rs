//! Attack legality checks.

use thiserror::Error;

use super::BattlefieldView;
use crate::components::{TeamId, UnitId};
use crate::config::AttackRules;
use crate::cover::CoverAnalyzer;
use crate::grid::GridCoordinate;
use crate::math::{percent, Fixed};

/// Why an attack was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttackRejection {
    /// The attacker does not exist.
    #[error("attacker {0} does not exist")]
    UnknownAttacker(UnitId),
    /// The target does not exist.
    #[error("target {0} does not exist")]
    UnknownTarget(UnitId),
    /// The attacker is dead.
    #[error("attacker {0} is dead")]
    AttackerDead(UnitId),
    /// The target is already dead.
    #[error("target {0} is already dead")]
    TargetDead(UnitId),
    /// A unit tried to attack itself.
    #[error("a unit cannot attack itself")]
    SelfTarget,
    /// Another team is acting.
    #[error("it is not {0}'s turn")]
    NotYourTurn(TeamId),
    /// Attacker and target share a team while friendly fire is prevented.
    #[error("cannot attack allies")]
    FriendlyFire,
    /// One of the units stands outside the battlefield.
    #[error("position {0} is outside the battlefield")]
    OutOfBounds(GridCoordinate),
    /// Diagonal attacks are disabled.
    #[error("diagonal attacks are not allowed")]
    DiagonalNotAllowed,
    /// The target is beyond the attacker's reach.
    #[error("target is {distance} cells away, range is {range}")]
    OutOfRange {
        /// Euclidean distance.
        distance: Fixed,
        /// Effective range.
        range: Fixed,
    },
    /// The target is inside the attacker's minimum range.
    #[error("target is too close ({distance} cells, minimum {min_range})")]
    TooClose {
        /// Euclidean distance.
        distance: Fixed,
        /// Minimum range.
        min_range: Fixed,
    },
    /// A full-cover obstacle blocks the line of fire.
    #[error("line of sight is blocked")]
    LineOfSightBlocked,
    /// The attacker has no weapon.
    #[error("unit {0} cannot attack")]
    NoAttackCapability(UnitId),
    /// Every attack of this turn has been used.
    #[error("no attacks left this turn")]
    NoAttacksRemaining,
    /// The weapon is still cooling down.
    #[error("attack is cooling down ({0} ticks left)")]
    CoolingDown(u64),
    /// The action budget is exhausted.
    #[error("no action points left this turn")]
    NoActionPoints,
    /// The target has no health record and cannot be damaged.
    #[error("target {0} cannot be attacked")]
    TargetNotAttackable(UnitId),
}

/// `Ok(())` for a legal attack, otherwise the reason it is illegal.
pub type AttackValidationResult = Result<(), AttackRejection>;

/// Validates attack requests.
#[derive(Debug, Clone, Default)]
pub struct AttackValidator {
    rules: AttackRules,
    cover: CoverAnalyzer,
}

impl AttackValidator {
    /// Create a validator for the given rules.
    #[must_use]
    pub fn new(rules: AttackRules) -> Self {
        Self {
            rules,
            cover: CoverAnalyzer::default(),
        }
    }

    /// Active rules.
    #[must_use]
    pub const fn rules(&self) -> &AttackRules {
        &self.rules
    }

    /// Replace the rules.
    pub fn set_rules(&mut self, rules: AttackRules) {
        self.rules = rules;
    }

    /// Global range cap in cells.
    #[must_use]
    pub fn max_range(&self) -> Fixed {
        percent(i32::try_from(self.rules.max_range_percent).unwrap_or(i32::MAX))
    }

    /// Check whether `attacker` may attack `target`.
    pub fn validate(
        &self,
        view: &BattlefieldView<'_>,
        attacker: UnitId,
        target: UnitId,
    ) -> AttackValidationResult {
        // Basic state
        let source = view
            .units
            .get(&attacker)
            .ok_or(AttackRejection::UnknownAttacker(attacker))?;
        let victim = view
            .units
            .get(&target)
            .ok_or(AttackRejection::UnknownTarget(target))?;
        if !source.alive {
            return Err(AttackRejection::AttackerDead(attacker));
        }
        if !victim.alive {
            return Err(AttackRejection::TargetDead(target));
        }
        if attacker == target {
            return Err(AttackRejection::SelfTarget);
        }
        if let Some(active) = view.active_team {
            if source.team != active {
                return Err(AttackRejection::NotYourTurn(source.team));
            }
        }
        if self.rules.prevent_friendly_fire && source.team == victim.team {
            return Err(AttackRejection::FriendlyFire);
        }

        // Bounds
        for position in [source.position, victim.position] {
            if !view.grid.contains(position) {
                return Err(AttackRejection::OutOfBounds(position));
            }
        }

        // Distance
        if !self.rules.allow_diagonal && source.position.is_diagonal_to(victim.position) {
            return Err(AttackRejection::DiagonalNotAllowed);
        }
        let distance = source.position.euclidean_distance(victim.position);
        let (unit_range, min_range) = source
            .attack
            .as_ref()
            .map_or((self.max_range(), Fixed::ZERO), |a| (a.range, a.min_range));
        let range = unit_range.min(self.max_range());
        if distance > range {
            return Err(AttackRejection::OutOfRange { distance, range });
        }
        if distance < min_range {
            return Err(AttackRejection::TooClose {
                distance,
                min_range,
            });
        }

        // Obstacles
        if self.rules.check_line_of_sight
            && self
                .cover
                .line_of_sight_blocked(view.grid, source.position, victim.position)
        {
            return Err(AttackRejection::LineOfSightBlocked);
        }

        // Actor-specific
        let capability = source
            .attack
            .as_ref()
            .ok_or(AttackRejection::NoAttackCapability(attacker))?;
        if !capability.has_attacks_remaining() {
            return Err(AttackRejection::NoAttacksRemaining);
        }
        let cooldown = capability.cooldown_remaining(view.tick);
        if cooldown > 0 {
            return Err(AttackRejection::CoolingDown(cooldown));
        }
        if source.action_points.acts_remaining() == 0 {
            return Err(AttackRejection::NoActionPoints);
        }

        // Target-specific
        if !view.health.is_registered(target) {
            return Err(AttackRejection::TargetNotAttackable(target));
        }
        if !view.health.is_alive(target) {
            return Err(AttackRejection::TargetDead(target));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::components::{ActionPoints, AttackCapability, Unit};
    use crate::grid::{Facing, Grid, Obstacle};
    use crate::health::HealthManager;

    struct Fixture {
        grid: Grid,
        units: BTreeMap<UnitId, Unit>,
        health: HealthManager,
        active_team: Option<TeamId>,
        tick: u64,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                grid: Grid::new(4, 4),
                units: BTreeMap::new(),
                health: HealthManager::new(None),
                active_team: None,
                tick: 0,
            }
        }

        fn add(&mut self, id: UnitId, team: u8, x: i32, z: i32, range: i32) {
            self.units.insert(
                id,
                Unit {
                    id,
                    name: format!("unit-{id}"),
                    team: TeamId(team),
                    position: GridCoordinate::new(x, z),
                    facing: Facing::North,
                    action_points: ActionPoints::new(1, 1),
                    alive: true,
                    attack: Some(AttackCapability::new(2, Fixed::from_num(range))),
                },
            );
            self.health.register(id, 3);
        }

        fn unit(&mut self, id: UnitId) -> &mut Unit {
            self.units.get_mut(&id).unwrap()
        }

        fn view(&self) -> BattlefieldView<'_> {
            BattlefieldView {
                grid: &self.grid,
                units: &self.units,
                health: &self.health,
                active_team: self.active_team,
                tick: self.tick,
            }
        }
    }

    #[test]
    fn test_adjacent_enemy_is_valid() {
        let mut fx = Fixture::new();
        fx.add(1, 0, 0, 0, 1);
        fx.add(2, 1, 1, 0, 1);
        let validator = AttackValidator::default();
        assert_eq!(validator.validate(&fx.view(), 1, 2), Ok(()));
    }

    #[test]
    fn test_friendly_fire_reason() {
        let mut fx = Fixture::new();
        fx.add(1, 0, 0, 0, 1);
        fx.add(2, 0, 1, 0, 1);
        let validator = AttackValidator::default();
        let result = validator.validate(&fx.view(), 1, 2);
        assert_eq!(result, Err(AttackRejection::FriendlyFire));
        assert_eq!(result.unwrap_err().to_string(), "cannot attack allies");

        let mut rules = AttackRules::default();
        rules.prevent_friendly_fire = false;
        let permissive = AttackValidator::new(rules);
        assert_eq!(permissive.validate(&fx.view(), 1, 2), Ok(()));
    }

    #[test]
    fn test_basic_state_checks() {
        let mut fx = Fixture::new();
        fx.add(1, 0, 0, 0, 1);
        fx.add(2, 1, 1, 0, 1);
        let validator = AttackValidator::default();
        assert_eq!(
            validator.validate(&fx.view(), 7, 2),
            Err(AttackRejection::UnknownAttacker(7))
        );
        assert_eq!(
            validator.validate(&fx.view(), 1, 7),
            Err(AttackRejection::UnknownTarget(7))
        );
        assert_eq!(
            validator.validate(&fx.view(), 1, 1),
            Err(AttackRejection::SelfTarget)
        );
        fx.unit(2).alive = false;
        assert_eq!(
            validator.validate(&fx.view(), 1, 2),
            Err(AttackRejection::TargetDead(2))
        );
    }

    #[test]
    fn test_turn_enforcement() {
        let mut fx = Fixture::new();
        fx.add(1, 0, 0, 0, 1);
        fx.add(2, 1, 1, 0, 1);
        fx.active_team = Some(TeamId(1));
        let validator = AttackValidator::default();
        assert_eq!(
            validator.validate(&fx.view(), 1, 2),
            Err(AttackRejection::NotYourTurn(TeamId(0)))
        );
    }

    #[test]
    fn test_range_uses_euclidean_distance() {
        let mut fx = Fixture::new();
        fx.add(1, 0, 0, 0, 1);
        fx.add(2, 1, 1, 1, 1);
        let validator = AttackValidator::default();
        // sqrt(2) > 1
        assert!(matches!(
            validator.validate(&fx.view(), 1, 2),
            Err(AttackRejection::OutOfRange { .. })
        ));

        fx.unit(1).attack = Some(AttackCapability::new(2, Fixed::from_num(2)));
        assert_eq!(validator.validate(&fx.view(), 1, 2), Ok(()));
    }

    #[test]
    fn test_global_range_cap() {
        let mut fx = Fixture::new();
        fx.add(1, 0, 0, 0, 10);
        fx.add(2, 1, 0, 3, 1);
        let mut rules = AttackRules::default();
        rules.max_range_percent = 200;
        let validator = AttackValidator::new(rules);
        match validator.validate(&fx.view(), 1, 2) {
            Err(AttackRejection::OutOfRange { range, .. }) => assert_eq!(range, Fixed::from_num(2)),
            other => panic!("expected range rejection, got {other:?}"),
        }
    }

    #[test]
    fn test_min_range() {
        let mut fx = Fixture::new();
        fx.add(1, 0, 0, 0, 3);
        fx.add(2, 1, 1, 0, 1);
        fx.unit(1).attack = Some(AttackCapability::new(2, Fixed::from_num(3)).with_min_range(Fixed::from_num(2)));
        let validator = AttackValidator::default();
        assert!(matches!(
            validator.validate(&fx.view(), 1, 2),
            Err(AttackRejection::TooClose { .. })
        ));
    }

    #[test]
    fn test_min_range_is_inclusive_at_adjacent_distance() {
        let mut fx = Fixture::new();
        fx.add(1, 0, 1, 1, 2);
        fx.add(2, 1, 1, 2, 1);
        fx.unit(1).attack = Some(AttackCapability::new(2, Fixed::from_num(2)).with_min_range(Fixed::ONE));
        let validator = AttackValidator::default();
        assert_eq!(validator.validate(&fx.view(), 1, 2), Ok(()));
    }

    #[test]
    fn test_diagonal_toggle() {
        let mut fx = Fixture::new();
        fx.add(1, 0, 0, 0, 2);
        fx.add(2, 1, 1, 1, 1);
        let mut rules = AttackRules::default();
        rules.allow_diagonal = false;
        let validator = AttackValidator::new(rules);
        assert_eq!(
            validator.validate(&fx.view(), 1, 2),
            Err(AttackRejection::DiagonalNotAllowed)
        );
    }

    #[test]
    fn test_line_of_sight() {
        let mut fx = Fixture::new();
        fx.add(1, 0, 0, 0, 3);
        fx.add(2, 1, 2, 0, 1);
        fx.grid
            .set_obstacle(GridCoordinate::new(1, 0), Some(Obstacle::WALL))
            .unwrap();
        let validator = AttackValidator::default();
        assert_eq!(
            validator.validate(&fx.view(), 1, 2),
            Err(AttackRejection::LineOfSightBlocked)
        );

        let mut rules = AttackRules::default();
        rules.check_line_of_sight = false;
        assert_eq!(AttackValidator::new(rules).validate(&fx.view(), 1, 2), Ok(()));
    }

    #[test]
    fn test_actor_limits() {
        let mut fx = Fixture::new();
        fx.add(1, 0, 0, 0, 1);
        fx.add(2, 1, 1, 0, 1);
        let validator = AttackValidator::default();

        fx.unit(1).attack = None;
        assert_eq!(
            validator.validate(&fx.view(), 1, 2),
            Err(AttackRejection::NoAttackCapability(1))
        );

        let mut weapon = AttackCapability::new(2, Fixed::ONE).with_cooldown(5);
        weapon.record_attack(0);
        fx.unit(1).attack = Some(weapon);
        assert_eq!(
            validator.validate(&fx.view(), 1, 2),
            Err(AttackRejection::NoAttacksRemaining)
        );

        fx.unit(1).attack.as_mut().unwrap().reset_turn();
        fx.tick = 2;
        assert_eq!(
            validator.validate(&fx.view(), 1, 2),
            Err(AttackRejection::CoolingDown(3))
        );

        fx.tick = 10;
        fx.unit(1).action_points.spend_act();
        assert_eq!(
            validator.validate(&fx.view(), 1, 2),
            Err(AttackRejection::NoActionPoints)
        );
    }

    #[test]
    fn test_target_must_be_registered() {
        let mut fx = Fixture::new();
        fx.add(1, 0, 0, 0, 1);
        fx.add(2, 1, 1, 0, 1);
        fx.health.unregister(2);
        let validator = AttackValidator::default();
        assert_eq!(
            validator.validate(&fx.view(), 1, 2),
            Err(AttackRejection::TargetNotAttackable(2))
        );
    }
}
