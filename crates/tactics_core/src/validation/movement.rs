//! Movement legality checks.

use thiserror::Error;

use super::{BattlefieldView, ObstacleCache};
use crate::components::{TeamId, UnitId};
use crate::config::MovementRules;
use crate::grid::GridCoordinate;

/// Why a move was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoveRejection {
    /// The unit does not exist.
    #[error("unit {0} does not exist")]
    UnknownUnit(UnitId),
    /// The unit is dead.
    #[error("unit {0} is dead and cannot move")]
    UnitDead(UnitId),
    /// Another team is acting.
    #[error("it is not {0}'s turn")]
    NotYourTurn(TeamId),
    /// The unit already stands on the destination.
    #[error("unit is already at {0}")]
    AlreadyThere(GridCoordinate),
    /// The destination is off the battlefield.
    #[error("destination {0} is outside the battlefield")]
    OutOfBounds(GridCoordinate),
    /// The destination is too far away.
    #[error("destination is {distance} cells away, the limit is {max}")]
    TooFar {
        /// Manhattan distance requested.
        distance: u32,
        /// Configured limit.
        max: u32,
    },
    /// Diagonal steps are disabled.
    #[error("diagonal movement is not allowed")]
    DiagonalNotAllowed,
    /// An obstacle occupies the destination.
    #[error("destination {0} is blocked by an obstacle")]
    Blocked(GridCoordinate),
    /// Another unit occupies the destination.
    #[error("destination {at} is occupied by unit {occupant}")]
    Occupied {
        /// Destination.
        at: GridCoordinate,
        /// Unit standing there.
        occupant: UnitId,
    },
    /// The unit has no moves left this turn.
    #[error("no movement left this turn")]
    NoMovesRemaining,
}

/// `Ok(())` for a legal move, otherwise the reason it is illegal.
pub type MovementValidationResult = Result<(), MoveRejection>;

/// Validates move requests against grid, occupancy and budget rules.
#[derive(Debug, Clone, Default)]
pub struct MovementValidator {
    rules: MovementRules,
    obstacles: ObstacleCache,
}

impl MovementValidator {
    /// Create a validator for the given rules.
    #[must_use]
    pub fn new(rules: MovementRules) -> Self {
        Self {
            rules,
            obstacles: ObstacleCache::default(),
        }
    }

    /// Active rules.
    #[must_use]
    pub const fn rules(&self) -> &MovementRules {
        &self.rules
    }

    /// Replace the rules.
    pub fn set_rules(&mut self, rules: MovementRules) {
        self.rules = rules;
    }

    /// Check whether `unit` may move to `destination`.
    pub fn validate(
        &self,
        view: &BattlefieldView<'_>,
        unit: UnitId,
        destination: GridCoordinate,
    ) -> MovementValidationResult {
        // Basic state
        let mover = view.units.get(&unit).ok_or(MoveRejection::UnknownUnit(unit))?;
        if !mover.alive || !view.health.is_alive(unit) {
            return Err(MoveRejection::UnitDead(unit));
        }
        if let Some(active) = view.active_team {
            if mover.team != active {
                return Err(MoveRejection::NotYourTurn(mover.team));
            }
        }
        if mover.position == destination {
            return Err(MoveRejection::AlreadyThere(destination));
        }

        // Bounds
        if !view.grid.contains(destination) {
            return Err(MoveRejection::OutOfBounds(destination));
        }

        // Distance / adjacency: Manhattan only, Euclidean is irrelevant here.
        let distance = mover.position.manhattan_distance(destination);
        if distance > self.rules.max_move_distance {
            return Err(MoveRejection::TooFar {
                distance,
                max: self.rules.max_move_distance,
            });
        }
        if !self.rules.allow_diagonal && mover.position.is_diagonal_to(destination) {
            return Err(MoveRejection::DiagonalNotAllowed);
        }

        // Obstacles / occupancy
        if self.obstacles.is_blocked(view.grid, destination) {
            return Err(MoveRejection::Blocked(destination));
        }
        if let Some(occupant) = view.unit_at(destination) {
            return Err(MoveRejection::Occupied {
                at: destination,
                occupant: occupant.id,
            });
        }

        // Actor-specific
        if mover.action_points.moves_remaining() == 0 {
            return Err(MoveRejection::NoMovesRemaining);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::components::{ActionPoints, Unit};
    use crate::grid::{Facing, Grid, Obstacle};
    use crate::health::HealthManager;

    struct Fixture {
        grid: Grid,
        units: BTreeMap<UnitId, Unit>,
        health: HealthManager,
        active_team: Option<TeamId>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                grid: Grid::new(4, 4),
                units: BTreeMap::new(),
                health: HealthManager::new(None),
                active_team: None,
            }
        }

        fn add(&mut self, id: UnitId, team: u8, x: i32, z: i32) {
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
                    attack: None,
                },
            );
            self.health.register(id, 3);
        }

        fn view(&self) -> BattlefieldView<'_> {
            BattlefieldView {
                grid: &self.grid,
                units: &self.units,
                health: &self.health,
                active_team: self.active_team,
                tick: 0,
            }
        }
    }

    fn rules(max: u32, diagonal: bool) -> MovementRules {
        MovementRules {
            max_move_distance: max,
            allow_diagonal: diagonal,
        }
    }

    #[test]
    fn test_orthogonal_step_is_valid() {
        let mut fx = Fixture::new();
        fx.add(1, 0, 1, 1);
        let validator = MovementValidator::new(rules(1, false));
        assert_eq!(validator.validate(&fx.view(), 1, GridCoordinate::new(1, 2)), Ok(()));
    }

    #[test]
    fn test_unknown_and_dead_units() {
        let mut fx = Fixture::new();
        fx.add(1, 0, 1, 1);
        fx.units.get_mut(&1).unwrap().alive = false;
        let validator = MovementValidator::new(rules(1, false));
        assert_eq!(
            validator.validate(&fx.view(), 9, GridCoordinate::new(1, 2)),
            Err(MoveRejection::UnknownUnit(9))
        );
        assert_eq!(
            validator.validate(&fx.view(), 1, GridCoordinate::new(1, 2)),
            Err(MoveRejection::UnitDead(1))
        );
    }

    #[test]
    fn test_turn_enforcement() {
        let mut fx = Fixture::new();
        fx.add(1, 0, 1, 1);
        fx.active_team = Some(TeamId(1));
        let validator = MovementValidator::new(rules(1, false));
        assert_eq!(
            validator.validate(&fx.view(), 1, GridCoordinate::new(1, 2)),
            Err(MoveRejection::NotYourTurn(TeamId(0)))
        );
    }

    #[test]
    fn test_bounds_checked_before_distance() {
        let mut fx = Fixture::new();
        fx.add(1, 0, 0, 0);
        let validator = MovementValidator::new(rules(1, false));
        assert_eq!(
            validator.validate(&fx.view(), 1, GridCoordinate::new(-5, 0)),
            Err(MoveRejection::OutOfBounds(GridCoordinate::new(-5, 0)))
        );
    }

    #[test]
    fn test_manhattan_limit_ignores_euclidean() {
        let mut fx = Fixture::new();
        fx.add(1, 0, 0, 0);
        // Euclidean distance to (1, 1) is ~1.41 but Manhattan is 2.
        let validator = MovementValidator::new(rules(1, true));
        assert_eq!(
            validator.validate(&fx.view(), 1, GridCoordinate::new(1, 1)),
            Err(MoveRejection::TooFar {
                distance: 2,
                max: 1
            })
        );
    }

    #[test]
    fn test_diagonal_toggle() {
        let mut fx = Fixture::new();
        fx.add(1, 0, 0, 0);
        let disabled = MovementValidator::new(rules(2, false));
        assert_eq!(
            disabled.validate(&fx.view(), 1, GridCoordinate::new(1, 1)),
            Err(MoveRejection::DiagonalNotAllowed)
        );
        let enabled = MovementValidator::new(rules(2, true));
        assert_eq!(enabled.validate(&fx.view(), 1, GridCoordinate::new(1, 1)), Ok(()));
    }

    #[test]
    fn test_obstacle_and_occupancy() {
        let mut fx = Fixture::new();
        fx.add(1, 0, 0, 0);
        fx.add(2, 1, 0, 1);
        fx.grid
            .set_obstacle(GridCoordinate::new(1, 0), Some(Obstacle::WALL))
            .unwrap();
        let validator = MovementValidator::new(rules(1, false));
        assert_eq!(
            validator.validate(&fx.view(), 1, GridCoordinate::new(1, 0)),
            Err(MoveRejection::Blocked(GridCoordinate::new(1, 0)))
        );
        assert_eq!(
            validator.validate(&fx.view(), 1, GridCoordinate::new(0, 1)),
            Err(MoveRejection::Occupied {
                at: GridCoordinate::new(0, 1),
                occupant: 2
            })
        );
    }

    #[test]
    fn test_dead_units_do_not_occupy() {
        let mut fx = Fixture::new();
        fx.add(1, 0, 0, 0);
        fx.add(2, 1, 0, 1);
        fx.units.get_mut(&2).unwrap().alive = false;
        let validator = MovementValidator::new(rules(1, false));
        assert_eq!(validator.validate(&fx.view(), 1, GridCoordinate::new(0, 1)), Ok(()));
    }

    #[test]
    fn test_move_budget() {
        let mut fx = Fixture::new();
        fx.add(1, 0, 0, 0);
        fx.units.get_mut(&1).unwrap().action_points.spend_move();
        let validator = MovementValidator::new(rules(1, false));
        let result = validator.validate(&fx.view(), 1, GridCoordinate::new(0, 1));
        assert_eq!(result, Err(MoveRejection::NoMovesRemaining));
        assert_eq!(
            result.unwrap_err().to_string(),
            "no movement left this turn"
        );
    }
}
