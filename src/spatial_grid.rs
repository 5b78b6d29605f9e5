/*
 * Spatial Grid Module
 *
 * This module overlays a uniform 3D grid on the flock's bounds and maps every
 * fish to the linear index of the cell containing it. The grid itself holds
 * no per-cell storage: membership lives in the sorted CellAssignment array and
 * the per-cell ranges built from it (see cell_sort and cell_ranges).
 *
 * Positions are centered at the origin. They are shifted by half the bounds
 * into [0, bounds] before dividing by the cell size, and each axis is clamped
 * to the grid so fish that drift outside still get a valid cell.
 */

use nannou::prelude::Vec3;
use rayon::prelude::*;

use crate::boid::FishInstance;

// Cell counts along each axis
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GridDims {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl GridDims {
    pub fn from_bounds(bounds: Vec3, cell_size: u32) -> Self {
        if cell_size == 0 {
            return Self::default();
        }
        let cell = cell_size as f32;
        // `as` saturates, so negative or NaN extents give zero cells
        Self {
            x: (bounds.x / cell).floor() as u32,
            y: (bounds.y / cell).floor() as u32,
            z: (bounds.z / cell).floor() as u32,
        }
    }

    // Saturates instead of wrapping so oversized grids fail allocation cleanly
    pub fn total_cells(&self) -> usize {
        (self.x as usize)
            .saturating_mul(self.y as usize)
            .saturating_mul(self.z as usize)
    }

    pub fn is_empty(&self) -> bool {
        self.total_cells() == 0
    }
}

/// Pairs a fish with the grid cell it occupies this frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct CellAssignment {
    pub entity_index: u32,
    pub cell_index: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SpatialGrid {
    pub dims: GridDims,
    pub cell_size: f32,
    half_bounds: Vec3,
}

impl SpatialGrid {
    pub fn new(bounds: Vec3, cell_size: u32) -> Self {
        Self {
            dims: GridDims::from_bounds(bounds, cell_size),
            cell_size: cell_size as f32,
            half_bounds: bounds * 0.5,
        }
    }

    #[inline]
    pub fn total_cells(&self) -> usize {
        self.dims.total_cells()
    }

    #[inline]
    pub fn half_bounds(&self) -> Vec3 {
        self.half_bounds
    }

    // World position to clamped 3D cell coordinate
    #[inline]
    pub fn cell_coord(&self, position: Vec3) -> [u32; 3] {
        let local = (position + self.half_bounds) / self.cell_size;
        [
            clamp_axis(local.x, self.dims.x),
            clamp_axis(local.y, self.dims.y),
            clamp_axis(local.z, self.dims.z),
        ]
    }

    #[inline]
    pub fn linearize(&self, [x, y, z]: [u32; 3]) -> u32 {
        x + y * self.dims.x + z * self.dims.x * self.dims.y
    }

    /// Linear cell index for a world position.
    ///
    /// Always in `[0, total_cells)` for a non-empty grid. For an empty grid
    /// every position maps to the degenerate index 0.
    #[inline]
    pub fn cell_index(&self, position: Vec3) -> u32 {
        if self.dims.is_empty() {
            return 0;
        }
        self.linearize(self.cell_coord(position))
    }

    // Write one assignment per fish. Each fish is independent, so this runs in parallel.
    pub fn assign_cells(&self, fish: &[FishInstance], assignments: &mut Vec<CellAssignment>) {
        fish.par_iter()
            .enumerate()
            .map(|(i, f)| CellAssignment {
                entity_index: i as u32,
                cell_index: self.cell_index(f.position),
            })
            .collect_into_vec(assignments);
    }

    // Visit the cell and its 26 neighbors, skipping those past the grid edges
    #[inline]
    pub fn for_each_neighbor_cell(&self, [cx, cy, cz]: [u32; 3], mut visit: impl FnMut(usize)) {
        if self.dims.is_empty() {
            return;
        }

        let (dim_x, dim_y, dim_z) = (self.dims.x as i64, self.dims.y as i64, self.dims.z as i64);

        for z_offset in -1..=1 {
            let z = cz as i64 + z_offset;
            if z < 0 || z >= dim_z {
                continue;
            }

            for y_offset in -1..=1 {
                let y = cy as i64 + y_offset;
                if y < 0 || y >= dim_y {
                    continue;
                }

                let row = (z * dim_y + y) * dim_x;
                for x_offset in -1..=1 {
                    let x = cx as i64 + x_offset;
                    if x < 0 || x >= dim_x {
                        continue;
                    }
                    visit((row + x) as usize);
                }
            }
        }
    }
}

#[inline]
fn clamp_axis(local: f32, cells: u32) -> u32 {
    let max = cells.saturating_sub(1) as i64;
    // NaN casts to 0
    (local.floor() as i64).clamp(0, max) as u32
}
