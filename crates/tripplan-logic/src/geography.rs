//! Sea grid, distances, and zone discretization.
//!
//! The planner only ever sees the `SeaMap` and `MapDiscretization` traits.
//! `GridMap` and `SquareDiscretization` are the plain rectangular
//! implementations used by the harness and the tests.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// A cell of the sea grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Tile {
    pub x: i32,
    pub y: i32,
}

impl Tile {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Chebyshev distance in cells, used for "within N tiles" lookups.
    pub fn cells_to(&self, other: Tile) -> i32 {
        let cells = self.x.abs_diff(other.x).max(self.y.abs_diff(other.y));
        i32::try_from(cells).unwrap_or(i32::MAX)
    }
}

impl std::fmt::Display for Tile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Distance and navigability oracle.
///
/// Distances are in kilometres. The triangle inequality is expected but may
/// be violated by tiny projection errors; callers tolerate that.
pub trait SeaMap {
    fn width(&self) -> i32;
    fn height(&self) -> i32;
    fn distance(&self, from: Tile, to: Tile) -> f64;
    fn is_water(&self, tile: Tile) -> bool;

    fn contains(&self, tile: Tile) -> bool {
        tile.x >= 0 && tile.y >= 0 && tile.x < self.width() && tile.y < self.height()
    }

    /// All navigable tiles, row-major.
    fn water_tiles(&self) -> Vec<Tile> {
        let mut tiles = Vec::new();
        for y in 0..self.height() {
            for x in 0..self.width() {
                let tile = Tile::new(x, y);
                if self.is_water(tile) {
                    tiles.push(tile);
                }
            }
        }
        tiles
    }
}

/// How `GridMap` turns cell offsets into kilometres.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    #[default]
    Euclidean,
    Manhattan,
}

/// Rectangular grid of square cells, some of which may be land.
#[derive(Debug, Clone)]
pub struct GridMap {
    width: i32,
    height: i32,
    cell_km: f64,
    metric: DistanceMetric,
    land: HashSet<Tile>,
}

impl GridMap {
    pub fn new(width: i32, height: i32, cell_km: f64, metric: DistanceMetric) -> Self {
        assert!(width > 0 && height > 0, "grid must have at least one cell");
        assert!(cell_km > 0.0, "cell size must be positive");
        Self {
            width,
            height,
            cell_km,
            metric,
            land: HashSet::new(),
        }
    }

    pub fn with_land(mut self, land: impl IntoIterator<Item = Tile>) -> Self {
        self.land.extend(land);
        self
    }
}

impl SeaMap for GridMap {
    fn width(&self) -> i32 {
        self.width
    }

    fn height(&self) -> i32 {
        self.height
    }

    fn distance(&self, from: Tile, to: Tile) -> f64 {
        let dx = (from.x - to.x) as f64;
        let dy = (from.y - to.y) as f64;
        let cells = match self.metric {
            DistanceMetric::Euclidean => (dx * dx + dy * dy).sqrt(),
            DistanceMetric::Manhattan => dx.abs() + dy.abs(),
        };
        cells * self.cell_km
    }

    fn is_water(&self, tile: Tile) -> bool {
        self.contains(tile) && !self.land.contains(&tile)
    }
}

/// Partition of the map into zones ("groups") that bound the search space of
/// FAD selection heuristics.
pub trait MapDiscretization {
    fn zone_count(&self) -> usize;
    fn zone_of(&self, tile: Tile) -> usize;
}

/// Splits the grid into `(vertical_splits + 1) × (horizontal_splits + 1)`
/// roughly equal rectangles, numbered row-major from the top-left.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SquareDiscretization {
    width: i32,
    height: i32,
    columns: i32,
    rows: i32,
}

impl SquareDiscretization {
    pub fn new(width: i32, height: i32, vertical_splits: u32, horizontal_splits: u32) -> Self {
        assert!(width > 0 && height > 0);
        Self {
            width,
            height,
            columns: (vertical_splits as i32 + 1).min(width),
            rows: (horizontal_splits as i32 + 1).min(height),
        }
    }

    pub fn for_map(map: &dyn SeaMap, vertical_splits: u32, horizontal_splits: u32) -> Self {
        Self::new(map.width(), map.height(), vertical_splits, horizontal_splits)
    }
}

impl MapDiscretization for SquareDiscretization {
    fn zone_count(&self) -> usize {
        (self.columns * self.rows) as usize
    }

    fn zone_of(&self, tile: Tile) -> usize {
        let x = tile.x.clamp(0, self.width - 1);
        let y = tile.y.clamp(0, self.height - 1);
        let column = x * self.columns / self.width;
        let row = y * self.rows / self.height;
        (row * self.columns + column) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_euclidean_distance_scales_with_cell_size() {
        let map = GridMap::new(10, 10, 10.0, DistanceMetric::Euclidean);
        assert!((map.distance(Tile::new(0, 0), Tile::new(3, 4)) - 50.0).abs() < 1e-9);
        assert_eq!(map.distance(Tile::new(2, 2), Tile::new(2, 2)), 0.0);
    }

    #[test]
    fn test_manhattan_distance() {
        let map = GridMap::new(10, 10, 1.0, DistanceMetric::Manhattan);
        assert_eq!(map.distance(Tile::new(0, 0), Tile::new(3, 4)), 7.0);
    }

    #[test]
    fn test_land_is_not_water() {
        let map = GridMap::new(3, 3, 1.0, DistanceMetric::Euclidean)
            .with_land([Tile::new(1, 1), Tile::new(2, 2)]);
        assert!(!map.is_water(Tile::new(1, 1)));
        assert!(map.is_water(Tile::new(0, 0)));
        assert!(!map.is_water(Tile::new(5, 0)));
        assert_eq!(map.water_tiles().len(), 7);
    }

    #[test]
    fn test_square_discretization_quadrants() {
        // 4x4 split once each way gives four 2x2 quadrants
        let zones = SquareDiscretization::new(4, 4, 1, 1);
        assert_eq!(zones.zone_count(), 4);
        assert_eq!(zones.zone_of(Tile::new(0, 0)), 0);
        assert_eq!(zones.zone_of(Tile::new(1, 1)), 0);
        assert_eq!(zones.zone_of(Tile::new(3, 0)), 1);
        assert_eq!(zones.zone_of(Tile::new(0, 3)), 2);
        assert_eq!(zones.zone_of(Tile::new(2, 2)), 3);
        assert_eq!(zones.zone_of(Tile::new(3, 3)), 3);
    }

    #[test]
    fn test_discretization_never_exceeds_grid() {
        let zones = SquareDiscretization::new(2, 2, 9, 9);
        assert_eq!(zones.zone_count(), 4);
    }

    #[test]
    fn test_cells_to_is_chebyshev() {
        assert_eq!(Tile::new(0, 0).cells_to(Tile::new(2, 5)), 5);
        assert_eq!(Tile::new(i32::MIN, 0).cells_to(Tile::new(i32::MAX, 0)), i32::MAX);
    }
}
