//! Battlefield grid model.
//!
//! The battlefield is a rectangular grid of tiles addressed by integer
//! `(x, z)` coordinates. Each tile carries a terrain kind, an elevation
//! level and an optional obstacle. Every obstacle change bumps the grid
//! revision so cached obstacle views can tell when they are stale.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::cover::CoverQuality;
use crate::error::{Result, TacticsError};
use crate::math::{fixed_sqrt, Fixed};

/// Integer cell address on the battlefield.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridCoordinate {
    /// Column.
    pub x: i32,
    /// Row.
    pub z: i32,
}

impl GridCoordinate {
    /// Create a coordinate.
    #[must_use]
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Offset between two coordinates as `(dx, dz)`.
    #[must_use]
    pub const fn delta_to(self, other: Self) -> (i32, i32) {
        (other.x - self.x, other.z - self.z)
    }

    /// Manhattan (taxicab) distance.
    #[must_use]
    pub fn manhattan_distance(self, other: Self) -> u32 {
        let (dx, dz) = self.delta_to(other);
        dx.unsigned_abs() + dz.unsigned_abs()
    }

    /// Chebyshev (king-move) distance.
    #[must_use]
    pub fn chebyshev_distance(self, other: Self) -> u32 {
        let (dx, dz) = self.delta_to(other);
        dx.unsigned_abs().max(dz.unsigned_abs())
    }

    /// Squared Euclidean distance (avoids sqrt for comparisons).
    #[must_use]
    pub fn distance_squared(self, other: Self) -> i64 {
        let (dx, dz) = self.delta_to(other);
        i64::from(dx) * i64::from(dx) + i64::from(dz) * i64::from(dz)
    }

    /// Euclidean distance in cells.
    #[must_use]
    pub fn euclidean_distance(self, other: Self) -> Fixed {
        fixed_sqrt(Fixed::saturating_from_num(self.distance_squared(other)))
    }

    /// True if `other` shares an edge with this cell.
    #[must_use]
    pub fn is_orthogonally_adjacent(self, other: Self) -> bool {
        self.manhattan_distance(other) == 1
    }

    /// True if `other` is one of the eight surrounding cells.
    #[must_use]
    pub fn is_adjacent(self, other: Self) -> bool {
        self != other && self.chebyshev_distance(other) == 1
    }

    /// True if the step to `other` changes both axes.
    #[must_use]
    pub fn is_diagonal_to(self, other: Self) -> bool {
        let (dx, dz) = self.delta_to(other);
        dx != 0 && dz != 0
    }

    /// True if the step to `other` lies on an exact 45-degree line.
    #[must_use]
    pub fn is_pure_diagonal_to(self, other: Self) -> bool {
        let (dx, dz) = self.delta_to(other);
        dx != 0 && dx.abs() == dz.abs()
    }

    /// Neighbouring cells, orthogonal first, optionally including diagonals.
    #[must_use]
    pub fn neighbors(self, include_diagonals: bool) -> Vec<Self> {
        let mut out = vec![
            Self::new(self.x, self.z + 1),
            Self::new(self.x + 1, self.z),
            Self::new(self.x, self.z - 1),
            Self::new(self.x - 1, self.z),
        ];
        if include_diagonals {
            out.extend([
                Self::new(self.x + 1, self.z + 1),
                Self::new(self.x + 1, self.z - 1),
                Self::new(self.x - 1, self.z - 1),
                Self::new(self.x - 1, self.z + 1),
            ]);
        }
        out
    }
}

impl fmt::Display for GridCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}

/// Cardinal facing of a unit. North is +z.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Facing {
    /// Towards +z.
    #[default]
    North,
    /// Towards +x.
    East,
    /// Towards -z.
    South,
    /// Towards -x.
    West,
}

impl Facing {
    /// Facing that best matches a step from `from` to `to`.
    ///
    /// The dominant axis wins; ties favour the z axis. Returns `None`
    /// when both cells are the same.
    #[must_use]
    pub fn towards(from: GridCoordinate, to: GridCoordinate) -> Option<Self> {
        let (dx, dz) = from.delta_to(to);
        if dx == 0 && dz == 0 {
            return None;
        }
        Some(if dz.abs() >= dx.abs() {
            if dz > 0 {
                Self::North
            } else {
                Self::South
            }
        } else if dx > 0 {
            Self::East
        } else {
            Self::West
        })
    }

    /// Unit step `(dx, dz)` in this direction.
    #[must_use]
    pub const fn step(self) -> (i32, i32) {
        match self {
            Self::North => (0, 1),
            Self::East => (1, 0),
            Self::South => (0, -1),
            Self::West => (-1, 0),
        }
    }

    /// The facing pointing the other way.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::North => Self::South,
            Self::East => Self::West,
            Self::South => Self::North,
            Self::West => Self::East,
        }
    }
}

/// Terrain classification of a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TerrainKind {
    /// Flat open ground.
    #[default]
    Open,
    /// Woodland; softens incoming damage.
    Forest,
    /// Broken ground.
    Rough,
    /// Shallow water; exposes whoever stands in it.
    Water,
}

/// Something standing on a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Obstacle {
    /// How much this obstacle occludes an attack passing through it.
    pub cover: CoverQuality,
    /// Whether units may enter the tile.
    pub blocks_movement: bool,
}

impl Obstacle {
    /// A wall: full cover, impassable.
    pub const WALL: Self = Self {
        cover: CoverQuality::Full,
        blocks_movement: true,
    };

    /// Create an impassable obstacle with the given cover.
    #[must_use]
    pub const fn solid(cover: CoverQuality) -> Self {
        Self {
            cover,
            blocks_movement: true,
        }
    }
}

/// Per-cell battlefield data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Tile {
    /// Terrain kind.
    pub terrain: TerrainKind,
    /// Height level; higher ground grants an attack bonus.
    pub elevation: i32,
    /// Optional obstacle occupying the tile.
    pub obstacle: Option<Obstacle>,
}

/// The battlefield grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    width: i32,
    height: i32,
    tiles: Vec<Tile>,
    revision: u64,
}

impl Grid {
    /// Create an open grid of the given size. Zero dimensions are raised to 1.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        let width = width.max(1) as i32;
        let height = height.max(1) as i32;
        Self {
            width,
            height,
            tiles: vec![Tile::default(); (width * height) as usize],
            revision: 0,
        }
    }

    /// Width in cells.
    #[must_use]
    pub const fn width(&self) -> i32 {
        self.width
    }

    /// Height in cells.
    #[must_use]
    pub const fn height(&self) -> i32 {
        self.height
    }

    /// Counter bumped on every obstacle change.
    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// True if the coordinate lies within the battlefield.
    #[must_use]
    pub const fn contains(&self, coord: GridCoordinate) -> bool {
        coord.x >= 0 && coord.z >= 0 && coord.x < self.width && coord.z < self.height
    }

    fn index(&self, coord: GridCoordinate) -> Option<usize> {
        self.contains(coord)
            .then(|| (coord.z * self.width + coord.x) as usize)
    }

    /// Tile at a coordinate.
    #[must_use]
    pub fn tile(&self, coord: GridCoordinate) -> Option<&Tile> {
        self.index(coord).map(|i| &self.tiles[i])
    }

    fn tile_mut(&mut self, coord: GridCoordinate) -> Result<&mut Tile> {
        let index = self.index(coord).ok_or(TacticsError::OutOfBounds(coord))?;
        Ok(&mut self.tiles[index])
    }

    /// Place or clear an obstacle.
    pub fn set_obstacle(&mut self, coord: GridCoordinate, obstacle: Option<Obstacle>) -> Result<()> {
        self.tile_mut(coord)?.obstacle = obstacle;
        self.revision += 1;
        Ok(())
    }

    /// Set the terrain of a tile.
    pub fn set_terrain(&mut self, coord: GridCoordinate, terrain: TerrainKind) -> Result<()> {
        self.tile_mut(coord)?.terrain = terrain;
        self.revision += 1;
        Ok(())
    }

    /// Set the elevation of a tile.
    pub fn set_elevation(&mut self, coord: GridCoordinate, elevation: i32) -> Result<()> {
        self.tile_mut(coord)?.elevation = elevation;
        self.revision += 1;
        Ok(())
    }

    /// Elevation level, zero outside the grid.
    #[must_use]
    pub fn elevation(&self, coord: GridCoordinate) -> i32 {
        self.tile(coord).map_or(0, |t| t.elevation)
    }

    /// Terrain kind, `Open` outside the grid.
    #[must_use]
    pub fn terrain(&self, coord: GridCoordinate) -> TerrainKind {
        self.tile(coord).map_or(TerrainKind::Open, |t| t.terrain)
    }

    /// Obstacle on a tile, if any.
    #[must_use]
    pub fn obstacle(&self, coord: GridCoordinate) -> Option<Obstacle> {
        self.tile(coord).and_then(|t| t.obstacle)
    }

    /// True if an obstacle prevents entering the tile.
    #[must_use]
    pub fn blocks_movement(&self, coord: GridCoordinate) -> bool {
        self.obstacle(coord).is_some_and(|o| o.blocks_movement)
    }

    /// All coordinates in row-major order.
    pub fn coordinates(&self) -> impl Iterator<Item = GridCoordinate> + '_ {
        (0..self.height).flat_map(move |z| (0..self.width).map(move |x| GridCoordinate::new(x, z)))
    }

    /// Coordinates of every tile whose obstacle blocks movement.
    #[must_use]
    pub fn blocked_tiles(&self) -> Vec<GridCoordinate> {
        self.coordinates()
            .filter(|c| self.blocks_movement(*c))
            .collect()
    }

    /// Cells crossed by a ray between two points in cell space.
    ///
    /// Cell `(x, z)` covers `[x - 0.5, x + 0.5)` on each axis. The ray is
    /// sampled at quarter-cell steps; consecutive duplicates are removed.
    #[must_use]
    pub fn cells_along_ray(&self, from: (Fixed, Fixed), to: (Fixed, Fixed)) -> Vec<GridCoordinate> {
        let dx = to.0 - from.0;
        let dz = to.1 - from.1;
        let span = dx.abs().max(dz.abs());
        let steps: i64 = (span * Fixed::from_num(4)).ceil().to_num::<i64>().max(1);
        let half = Fixed::ONE / Fixed::from_num(2);

        let mut cells: Vec<GridCoordinate> = Vec::with_capacity(steps as usize + 1);
        for i in 0..=steps {
            let px = from.0 + dx * Fixed::from_num(i) / Fixed::from_num(steps);
            let pz = from.1 + dz * Fixed::from_num(i) / Fixed::from_num(steps);
            let cell = GridCoordinate::new(
                (px + half).floor().to_num::<i32>(),
                (pz + half).floor().to_num::<i32>(),
            );
            if cells.last() != Some(&cell) {
                cells.push(cell);
            }
        }
        cells
    }

    /// Cells strictly between two cell centres.
    #[must_use]
    pub fn cells_between(&self, from: GridCoordinate, to: GridCoordinate) -> Vec<GridCoordinate> {
        self.cells_along_ray(
            (Fixed::from_num(from.x), Fixed::from_num(from.z)),
            (Fixed::from_num(to.x), Fixed::from_num(to.z)),
        )
        .into_iter()
        .filter(|c| *c != from && *c != to)
        .collect()
    }
}

impl Default for Grid {
    fn default() -> Self {
        Self::new(4, 4)
    }
}
