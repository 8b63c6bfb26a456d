//! Cover and tactical position analysis.
//!
//! Cover is estimated by casting a fan of rays from the attacker's cell
//! centre towards points around the target cell. Each ray reports the
//! densest obstacle it crosses; the average density over all rays
//! selects a [`CoverQuality`] tier. Everything runs in fixed-point so
//! the result is reproducible.

use serde::{Deserialize, Serialize};

use crate::grid::{Facing, Grid, GridCoordinate};
use crate::math::Fixed;

/// Discrete cover tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum CoverQuality {
    /// Fully exposed.
    #[default]
    None,
    /// Low hedges, debris.
    Light,
    /// Half walls, crates.
    Partial,
    /// Sandbags, thick walls with gaps.
    Heavy,
    /// Completely hidden.
    Full,
}

impl CoverQuality {
    /// Occlusion density of an obstacle of this tier, in percent.
    #[must_use]
    pub const fn density_percent(self) -> u32 {
        match self {
            Self::None => 0,
            Self::Light => 25,
            Self::Partial => 50,
            Self::Heavy => 75,
            Self::Full => 100,
        }
    }

    /// Tier matching an averaged occlusion density.
    #[must_use]
    pub const fn from_density_percent(density: u32) -> Self {
        match density {
            0 => Self::None,
            1..=34 => Self::Light,
            35..=59 => Self::Partial,
            60..=89 => Self::Heavy,
            _ => Self::Full,
        }
    }
}

/// Which side of the target an attack comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum AttackAngle {
    /// The target is facing the attacker.
    #[default]
    Front,
    /// The attacker is to the target's side.
    Flank,
    /// The attacker is behind the target.
    Rear,
}

/// Tactical situation of one attacker against one target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct TacticalPosition {
    /// Cover protecting the target from this attacker.
    pub cover: CoverQuality,
    /// Direction of the attack relative to the target's facing.
    pub angle: AttackAngle,
    /// Attacker elevation minus target elevation, never negative.
    pub elevation_advantage: u32,
}

/// Ray-sampling cover analyzer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverAnalyzer {
    /// Offset of the outer sample points from the target centre, in percent of a cell.
    pub sample_spread_percent: u32,
}

impl Default for CoverAnalyzer {
    fn default() -> Self {
        Self {
            sample_spread_percent: 30,
        }
    }
}

impl CoverAnalyzer {
    /// Create an analyzer with the default sample spread.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Average occlusion density (0-100) between attacker and target.
    #[must_use]
    pub fn occlusion_percent(&self, grid: &Grid, from: GridCoordinate, to: GridCoordinate) -> u32 {
        if from == to || from.is_adjacent(to) {
            return 0;
        }

        let spread = Fixed::from_num(self.sample_spread_percent) / Fixed::from_num(100);
        let origin = (Fixed::from_num(from.x), Fixed::from_num(from.z));
        let (tx, tz) = (Fixed::from_num(to.x), Fixed::from_num(to.z));
        let samples = [
            (tx, tz),
            (tx + spread, tz),
            (tx - spread, tz),
            (tx, tz + spread),
            (tx, tz - spread),
        ];

        let total: u32 = samples
            .iter()
            .map(|&point| {
                grid.cells_along_ray(origin, point)
                    .into_iter()
                    .filter(|c| *c != from && *c != to)
                    .filter_map(|c| grid.obstacle(c))
                    .map(|o| o.cover.density_percent())
                    .max()
                    .unwrap_or(0)
            })
            .sum();

        total / samples.len() as u32
    }

    /// Cover quality protecting `to` from an attack originating at `from`.
    #[must_use]
    pub fn analyze_cover(&self, grid: &Grid, from: GridCoordinate, to: GridCoordinate) -> CoverQuality {
        CoverQuality::from_density_percent(self.occlusion_percent(grid, from, to))
    }

    /// True if a full-cover obstacle lies on the direct line between the cells.
    #[must_use]
    pub fn line_of_sight_blocked(&self, grid: &Grid, from: GridCoordinate, to: GridCoordinate) -> bool {
        grid.cells_between(from, to)
            .into_iter()
            .filter_map(|c| grid.obstacle(c))
            .any(|o| o.cover == CoverQuality::Full)
    }

    /// Full tactical picture for an attack.
    #[must_use]
    pub fn tactical_position(
        &self,
        grid: &Grid,
        attacker: GridCoordinate,
        target: GridCoordinate,
        target_facing: Facing,
    ) -> TacticalPosition {
        let angle = match Facing::towards(target, attacker) {
            Some(direction) if direction == target_facing => AttackAngle::Front,
            Some(direction) if direction == target_facing.opposite() => AttackAngle::Rear,
            Some(_) => AttackAngle::Flank,
            None => AttackAngle::Front,
        };
        let elevation_advantage = grid
            .elevation(attacker)
            .saturating_sub(grid.elevation(target))
            .max(0) as u32;

        TacticalPosition {
            cover: self.analyze_cover(grid, attacker, target),
            angle,
            elevation_advantage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Obstacle;

    #[test]
    fn test_no_obstacles_no_cover() {
        let grid = Grid::new(4, 4);
        let analyzer = CoverAnalyzer::new();
        let cover = analyzer.analyze_cover(&grid, GridCoordinate::new(0, 0), GridCoordinate::new(3, 3));
        assert_eq!(cover, CoverQuality::None);
    }

    #[test]
    fn test_full_wall_gives_full_cover() {
        let mut grid = Grid::new(4, 4);
        grid.set_obstacle(GridCoordinate::new(1, 0), Some(Obstacle::WALL))
            .unwrap();
        let analyzer = CoverAnalyzer::new();
        let from = GridCoordinate::new(0, 0);
        let to = GridCoordinate::new(2, 0);
        assert_eq!(analyzer.analyze_cover(&grid, from, to), CoverQuality::Full);
        assert!(analyzer.line_of_sight_blocked(&grid, from, to));
    }

    #[test]
    fn test_partial_obstacle_gives_partial_cover() {
        let mut grid = Grid::new(4, 4);
        grid.set_obstacle(
            GridCoordinate::new(1, 0),
            Some(Obstacle::solid(CoverQuality::Partial)),
        )
        .unwrap();
        let analyzer = CoverAnalyzer::new();
        let cover = analyzer.analyze_cover(&grid, GridCoordinate::new(0, 0), GridCoordinate::new(2, 0));
        assert_eq!(cover, CoverQuality::Partial);
        assert!(!analyzer.line_of_sight_blocked(&grid, GridCoordinate::new(0, 0), GridCoordinate::new(2, 0)));
    }

    #[test]
    fn test_adjacent_ignores_cover() {
        let mut grid = Grid::new(4, 4);
        grid.set_obstacle(GridCoordinate::new(2, 2), Some(Obstacle::WALL))
            .unwrap();
        let analyzer = CoverAnalyzer::new();
        assert_eq!(
            analyzer.analyze_cover(&grid, GridCoordinate::new(0, 0), GridCoordinate::new(1, 0)),
            CoverQuality::None
        );
    }

    #[test]
    fn test_density_tiers() {
        assert_eq!(CoverQuality::from_density_percent(0), CoverQuality::None);
        assert_eq!(CoverQuality::from_density_percent(20), CoverQuality::Light);
        assert_eq!(CoverQuality::from_density_percent(50), CoverQuality::Partial);
        assert_eq!(CoverQuality::from_density_percent(75), CoverQuality::Heavy);
        assert_eq!(CoverQuality::from_density_percent(100), CoverQuality::Full);
    }

    #[test]
    fn test_attack_angles() {
        let grid = Grid::new(4, 4);
        let analyzer = CoverAnalyzer::new();
        let target = GridCoordinate::new(1, 1);

        // Target faces north; attacker to the north is in front.
        let front = analyzer.tactical_position(&grid, GridCoordinate::new(1, 2), target, Facing::North);
        assert_eq!(front.angle, AttackAngle::Front);

        let rear = analyzer.tactical_position(&grid, GridCoordinate::new(1, 0), target, Facing::North);
        assert_eq!(rear.angle, AttackAngle::Rear);

        let flank = analyzer.tactical_position(&grid, GridCoordinate::new(2, 1), target, Facing::North);
        assert_eq!(flank.angle, AttackAngle::Flank);
    }

    #[test]
    fn test_elevation_advantage() {
        let mut grid = Grid::new(4, 4);
        grid.set_elevation(GridCoordinate::new(0, 0), 2).unwrap();
        let analyzer = CoverAnalyzer::new();
        let high = analyzer.tactical_position(&grid, GridCoordinate::new(0, 0), GridCoordinate::new(1, 0), Facing::North);
        assert_eq!(high.elevation_advantage, 2);
        let low = analyzer.tactical_position(&grid, GridCoordinate::new(1, 0), GridCoordinate::new(0, 0), Facing::North);
        assert_eq!(low.elevation_advantage, 0);
    }

    #[test]
    fn test_extreme_elevation_difference_saturates() {
        let mut grid = Grid::new(4, 4);
        grid.set_elevation(GridCoordinate::new(0, 0), i32::MAX).unwrap();
        grid.set_elevation(GridCoordinate::new(1, 0), i32::MIN).unwrap();
        let analyzer = CoverAnalyzer::new();
        let high = analyzer.tactical_position(&grid, GridCoordinate::new(0, 0), GridCoordinate::new(1, 0), Facing::North);
        assert_eq!(high.elevation_advantage, i32::MAX as u32);
        let low = analyzer.tactical_position(&grid, GridCoordinate::new(1, 0), GridCoordinate::new(0, 0), Facing::North);
        assert_eq!(low.elevation_advantage, 0);
    }
}
