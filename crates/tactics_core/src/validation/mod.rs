//! Movement and attack validators.
//!
//! Validators are pure predicate chains over a read-only
//! [`BattlefieldView`]. Checks run in a fixed order and stop at the
//! first failure:
//!
//! 1. basic state (existence, alive, turn, identity)
//! 2. bounds
//! 3. distance / adjacency
//! 4. obstacles / occupancy
//! 5. actor-specific limits
//! 6. target-specific limits
//!
//! A failure is a typed rejection whose `Display` is the reason shown
//! to the player. Validators never mutate game state; the only state
//! they hold is a cache of blocked tiles keyed on the grid revision.

mod attack;
mod movement;

use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet};

pub use attack::{AttackRejection, AttackValidationResult, AttackValidator};
pub use movement::{MoveRejection, MovementValidationResult, MovementValidator};

use crate::components::{TeamId, Unit, UnitId};
use crate::grid::{Grid, GridCoordinate};
use crate::health::HealthManager;

/// Read-only view of everything a validator needs.
#[derive(Debug, Clone, Copy)]
pub struct BattlefieldView<'a> {
    /// Battlefield grid.
    pub grid: &'a Grid,
    /// All units by id, dead ones included.
    pub units: &'a BTreeMap<UnitId, Unit>,
    /// Health registry.
    pub health: &'a HealthManager,
    /// Team allowed to act, `None` when turns are not enforced.
    pub active_team: Option<TeamId>,
    /// Current tick.
    pub tick: u64,
}

impl<'a> BattlefieldView<'a> {
    /// Living unit standing on a cell.
    #[must_use]
    pub fn unit_at(&self, coord: GridCoordinate) -> Option<&'a Unit> {
        self.units
            .values()
            .find(|u| u.alive && u.position == coord)
    }
}

/// Blocked-tile set cached per grid revision.
#[derive(Debug, Default)]
pub(crate) struct ObstacleCache {
    inner: RefCell<Option<(u64, HashSet<GridCoordinate>)>>,
}

impl ObstacleCache {
    /// True if the tile is blocked, refreshing the cache when the grid changed.
    pub(crate) fn is_blocked(&self, grid: &Grid, coord: GridCoordinate) -> bool {
        let mut slot = self.inner.borrow_mut();
        let stale = slot
            .as_ref()
            .map_or(true, |(revision, _)| *revision != grid.revision());
        if stale {
            let blocked: HashSet<GridCoordinate> = grid.blocked_tiles().into_iter().collect();
            tracing::trace!(
                revision = grid.revision(),
                blocked = blocked.len(),
                "Refreshed obstacle cache"
            );
            *slot = Some((grid.revision(), blocked));
        }
        slot.as_ref()
            .is_some_and(|(_, blocked)| blocked.contains(&coord))
    }
}

impl Clone for ObstacleCache {
    fn clone(&self) -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Obstacle;

    #[test]
    fn test_obstacle_cache_follows_revision() {
        let mut grid = Grid::new(4, 4);
        let cache = ObstacleCache::default();
        let cell = GridCoordinate::new(2, 2);
        assert!(!cache.is_blocked(&grid, cell));

        grid.set_obstacle(cell, Some(Obstacle::WALL)).unwrap();
        assert!(cache.is_blocked(&grid, cell));

        grid.set_obstacle(cell, None).unwrap();
        assert!(!cache.is_blocked(&grid, cell));
    }
}
