//! Occupancy grid
//!
//! A fixed N×N lattice of box cells on the ground plane. Each tick the
//! tracked spheres are tested against every cell and the result is exposed
//! as an [`Occupancy`] snapshot for the shape matcher.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::bounds::{Aabb, BoundingSphere};
use crate::cell_axis_offset;
use crate::consts::*;
use crate::error::SessionError;

/// Debug outline color of an occupied cell
pub const HELPER_COLOR_OCCUPIED: u32 = 0xff0000;
/// Debug outline color of an empty cell
pub const HELPER_COLOR_EMPTY: u32 = 0xffff00;

/// Cell coordinate: `row` is the first grid index (x axis), `col` the second (z axis)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    pub row: usize,
    pub col: usize,
}

impl CellCoord {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Apply a signed offset, None if it leaves `[0, size)`
    pub fn offset(self, dr: isize, dc: isize, size: usize) -> Option<Self> {
        let row = self.row.checked_add_signed(dr)?;
        let col = self.col.checked_add_signed(dc)?;
        (row < size && col < size).then_some(Self { row, col })
    }
}

/// Grid construction parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub size: usize,
    pub cell_size: f32,
    pub cell_height: f32,
    pub cell_gap: f32,
}

impl GridConfig {
    /// Reject lattices that would overlap, collapse, or blow up in size
    pub fn validate(&self) -> Result<(), SessionError> {
        let positive = |v: f32| v.is_finite() && v > 0.0;
        if self.size == 0 || self.size > MAX_GRID_SIZE {
            return Err(SessionError::InvalidLevelPack {
                reason: format!("grid size {} outside 1..={}", self.size, MAX_GRID_SIZE),
            });
        }
        if !positive(self.cell_size) || !positive(self.cell_height) || !positive(self.cell_gap) {
            return Err(SessionError::InvalidLevelPack {
                reason: format!(
                    "grid cell size {}, height {} and gap {} must be positive",
                    self.cell_size, self.cell_height, self.cell_gap
                ),
            });
        }
        Ok(())
    }
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            size: GRID_SIZE,
            cell_size: CELL_SIZE,
            cell_height: CELL_HEIGHT,
            cell_gap: CELL_GAP,
        }
    }
}

/// A single test volume
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cell {
    pub bounds: Aabb,
    pub occupied: bool,
}

#[derive(Debug, Clone)]
pub struct Grid {
    config: GridConfig,
    /// Row-major, `size * size` cells
    cells: Vec<Cell>,
}

impl Grid {
    pub fn new(config: GridConfig) -> Self {
        let n = config.size;
        let mut cells = Vec::with_capacity(n * n);
        for i in 0..n {
            for j in 0..n {
                let x = cell_axis_offset(i, n, config.cell_size, config.cell_gap);
                let z = cell_axis_offset(j, n, config.cell_size, config.cell_gap);
                let bounds = Aabb::from_center_size(
                    Vec3::new(x, 0.0, z),
                    Vec3::new(config.cell_size, config.cell_height, config.cell_size),
                );
                cells.push(Cell {
                    bounds,
                    occupied: false,
                });
            }
        }
        Self { config, cells }
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.config.size
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    pub fn cell(&self, coord: CellCoord) -> Option<&Cell> {
        if coord.row < self.size() && coord.col < self.size() {
            self.cells.get(coord.row * self.size() + coord.col)
        } else {
            None
        }
    }

    /// All cells with their coordinates, row-major
    pub fn cells(&self) -> impl Iterator<Item = (CellCoord, &Cell)> + '_ {
        let n = self.size();
        self.cells
            .iter()
            .enumerate()
            .map(move |(idx, cell)| (CellCoord::new(idx / n, idx % n), cell))
    }

    pub fn cell_center(&self, coord: CellCoord) -> Option<Vec3> {
        self.cell(coord).map(|c| c.bounds.center())
    }

    /// Recompute every cell: occupied iff any sphere overlaps its box
    pub fn update_occupancy(&mut self, spheres: &[BoundingSphere]) {
        for cell in &mut self.cells {
            cell.occupied = spheres.iter().any(|s| cell.bounds.intersects_sphere(s));
        }
    }

    /// Clear all occupancy flags
    pub fn reset(&mut self) {
        for cell in &mut self.cells {
            cell.occupied = false;
        }
    }

    pub fn occupied_count(&self) -> usize {
        self.cells.iter().filter(|c| c.occupied).count()
    }

    /// Snapshot of the current occupancy
    pub fn occupancy(&self) -> Occupancy {
        Occupancy {
            size: self.size(),
            cells: self.cells.iter().map(|c| c.occupied).collect(),
        }
    }

    /// Outline color a host draws for a cell (red when occupied)
    pub fn helper_color(&self, coord: CellCoord) -> u32 {
        match self.cell(coord) {
            Some(cell) if cell.occupied => HELPER_COLOR_OCCUPIED,
            _ => HELPER_COLOR_EMPTY,
        }
    }
}

/// Boolean occupancy of an N×N grid, row-major
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawOccupancy")]
pub struct Occupancy {
    size: usize,
    cells: Vec<bool>,
}

/// Unchecked wire form of [`Occupancy`]
#[derive(Deserialize)]
struct RawOccupancy {
    size: usize,
    cells: Vec<bool>,
}

impl TryFrom<RawOccupancy> for Occupancy {
    type Error = SessionError;

    fn try_from(raw: RawOccupancy) -> Result<Self, Self::Error> {
        let expected = raw.size.checked_mul(raw.size);
        if expected != Some(raw.cells.len()) {
            return Err(SessionError::InvalidSnapshot {
                reason: format!(
                    "occupancy of size {} has {} cells",
                    raw.size,
                    raw.cells.len()
                ),
            });
        }
        Ok(Self {
            size: raw.size,
            cells: raw.cells,
        })
    }
}

impl Occupancy {
    pub fn empty(size: usize) -> Self {
        Self {
            size,
            cells: vec![false; size * size],
        }
    }

    /// Occupancy with exactly the listed `(row, col)` cells set (out-of-range ones ignored)
    pub fn from_cells(size: usize, occupied: &[(usize, usize)]) -> Self {
        let mut occ = Self::empty(size);
        for &(row, col) in occupied {
            occ.set(CellCoord::new(row, col), true);
        }
        occ
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Bounds-checked read; anything outside the grid is empty
    #[inline]
    pub fn get(&self, row: isize, col: isize) -> bool {
        if row < 0 || col < 0 {
            return false;
        }
        let (row, col) = (row as usize, col as usize);
        row < self.size
            && col < self.size
            && self.cells.get(row * self.size + col).copied().unwrap_or(false)
    }

    #[inline]
    pub fn is_occupied(&self, coord: CellCoord) -> bool {
        self.get(coord.row as isize, coord.col as isize)
    }

    pub fn set(&mut self, coord: CellCoord, value: bool) {
        if coord.row < self.size && coord.col < self.size {
            if let Some(cell) = self.cells.get_mut(coord.row * self.size + coord.col) {
                *cell = value;
            }
        }
    }

    pub fn count(&self) -> usize {
        self.cells.iter().filter(|&&c| c).count()
    }

    /// Flat row-major bytes (1 = occupied), for hosts
    pub fn to_bytes(&self) -> Vec<u8> {
        self.cells.iter().map(|&c| c as u8).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sphere_at(grid: &Grid, row: usize, col: usize) -> BoundingSphere {
        let center = grid.cell_center(CellCoord::new(row, col)).unwrap();
        BoundingSphere::new(center + Vec3::Y * 0.5, SPHERE_RADIUS)
    }

    #[test]
    fn test_cell_centers() {
        let grid = Grid::new(GridConfig::default());
        // (S + G) = 3, (N - 1) / 2 = 2
        assert_eq!(grid.cell_center(CellCoord::new(0, 0)), Some(Vec3::new(-6.0, 0.0, -6.0)));
        assert_eq!(grid.cell_center(CellCoord::new(2, 2)), Some(Vec3::ZERO));
        assert_eq!(grid.cell_center(CellCoord::new(4, 1)), Some(Vec3::new(6.0, 0.0, -3.0)));
        assert_eq!(grid.cell_center(CellCoord::new(5, 0)), None);
    }

    #[test]
    fn test_cells_do_not_overlap() {
        let grid = Grid::new(GridConfig::default());
        let cells: Vec<_> = grid.cells().map(|(_, c)| c.bounds).collect();
        for (a_idx, a) in cells.iter().enumerate() {
            for b in cells.iter().skip(a_idx + 1) {
                let overlap = a.min.cmplt(b.max).all() && b.min.cmplt(a.max).all();
                assert!(!overlap);
            }
        }
    }

    #[test]
    fn test_update_occupancy_marks_cell() {
        let mut grid = Grid::new(GridConfig::default());
        let sphere = sphere_at(&grid, 1, 3);
        grid.update_occupancy(&[sphere]);

        assert_eq!(grid.occupied_count(), 1);
        assert!(grid.occupancy().is_occupied(CellCoord::new(1, 3)));
        assert_eq!(grid.helper_color(CellCoord::new(1, 3)), HELPER_COLOR_OCCUPIED);
        assert_eq!(grid.helper_color(CellCoord::new(0, 0)), HELPER_COLOR_EMPTY);
    }

    #[test]
    fn test_update_occupancy_clears_stale() {
        let mut grid = Grid::new(GridConfig::default());
        let sphere = sphere_at(&grid, 0, 0);
        grid.update_occupancy(&[sphere]);
        assert_eq!(grid.occupied_count(), 1);

        grid.update_occupancy(&[]);
        assert_eq!(grid.occupied_count(), 0);
    }

    #[test]
    fn test_sphere_between_cells_touches_none() {
        let mut grid = Grid::new(GridConfig::default());
        // Midway between (2,2) and (3,2): 1.5 from each center, 1.0 from each face
        let sphere = BoundingSphere::new(Vec3::new(1.5, 0.0, 0.0), 0.9);
        grid.update_occupancy(&[sphere]);
        assert_eq!(grid.occupied_count(), 0);
    }

    #[test]
    fn test_offset_bounds() {
        let c = CellCoord::new(0, 4);
        assert_eq!(c.offset(-1, 0, 5), None);
        assert_eq!(c.offset(0, 1, 5), None);
        assert_eq!(c.offset(2, -2, 5), Some(CellCoord::new(2, 2)));
    }

    #[test]
    fn test_occupancy_get_out_of_range() {
        let occ = Occupancy::from_cells(5, &[(0, 0), (4, 4), (9, 9)]);
        assert_eq!(occ.count(), 2);
        assert!(occ.get(0, 0));
        assert!(!occ.get(-1, 0));
        assert!(!occ.get(5, 4));
        assert_eq!(occ.to_bytes()[24], 1);
    }

    #[test]
    fn test_occupancy_json_checks_length() {
        let occ = Occupancy::from_cells(3, &[(1, 1)]);
        let json = serde_json::to_string(&occ).unwrap();
        assert_eq!(serde_json::from_str::<Occupancy>(&json).unwrap(), occ);

        assert!(serde_json::from_str::<Occupancy>(r#"{"size":5,"cells":[]}"#).is_err());
        assert!(serde_json::from_str::<Occupancy>(r#"{"size":2,"cells":[true,true,true]}"#).is_err());
    }

    #[test]
    fn test_grid_config_validation() {
        assert!(GridConfig::default().validate().is_ok());
        let bad = [
            GridConfig { size: 0, ..Default::default() },
            GridConfig { size: MAX_GRID_SIZE + 1, ..Default::default() },
            GridConfig { cell_gap: 0.0, ..Default::default() },
            GridConfig { cell_gap: -1.0, ..Default::default() },
            GridConfig { cell_size: f32::NAN, ..Default::default() },
            GridConfig { cell_height: 0.0, ..Default::default() },
        ];
        for config in bad {
            assert!(
                matches!(config.validate(), Err(SessionError::InvalidLevelPack { .. })),
                "{config:?}"
            );
        }
    }

    proptest! {
        #[test]
        fn prop_occupied_iff_intersects(
            x in -10.0f32..10.0,
            y in -3.0f32..3.0,
            z in -10.0f32..10.0,
            radius in 0.1f32..2.5,
        ) {
            let mut grid = Grid::new(GridConfig::default());
            let sphere = BoundingSphere::new(Vec3::new(x, y, z), radius);
            grid.update_occupancy(&[sphere]);
            for (coord, cell) in grid.cells() {
                // Distance from the center to a 1×1×1 box at the lattice
                // position, one axis at a time
                let cx = 3.0 * (coord.row as f32 - 2.0);
                let cz = 3.0 * (coord.col as f32 - 2.0);
                let dx = ((x - cx).abs() - 0.5).max(0.0);
                let dy = (y.abs() - 0.5).max(0.0);
                let dz = ((z - cz).abs() - 0.5).max(0.0);
                let d2 = dx * dx + dy * dy + dz * dz;
                let r2 = radius * radius;
                // Skip grazing contacts where rounding decides
                if (d2 - r2).abs() > 1e-4 {
                    prop_assert_eq!(cell.occupied, d2 < r2, "cell {:?}", coord);
                }
            }
        }

        #[test]
        fn prop_update_is_idempotent(
            points in proptest::collection::vec((-8.0f32..8.0, -1.0f32..2.0, -8.0f32..8.0), 0..10),
        ) {
            let spheres: Vec<_> = points
                .iter()
                .map(|&(x, y, z)| BoundingSphere::new(Vec3::new(x, y, z), SPHERE_RADIUS))
                .collect();
            let mut grid = Grid::new(GridConfig::default());
            grid.update_occupancy(&spheres);
            let first = grid.occupancy();
            grid.update_occupancy(&spheres);
            prop_assert_eq!(first, grid.occupancy());
        }
    }
}
