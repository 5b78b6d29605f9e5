/*
 * Flock Module
 *
 * One independently configured school of fish and every buffer sized by it:
 * the double-buffered fish store, the raw and sorted cell assignments, and
 * the per-cell range table.
 *
 * Each frame runs strictly in order:
 *   assign cells -> sort by cell -> build cell ranges -> steer and move
 * and each stage consumes the complete output of the one before it.
 *
 * Reconfiguration compares the caller's parameters with the snapshot applied
 * last frame. A new fish count reallocates and reseeds everything; new bounds
 * or cell size rebuild only the range table. Replacement buffers are allocated
 * in full before any existing one is touched, so a rejected or failed change
 * leaves the flock exactly as it was.
 */

use std::time::Instant;

use nannou::prelude::Vec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha12Rng;
use tracing::{debug, info, instrument, trace, warn};

use crate::boid::{FishInstance, FishStore};
use crate::cell_ranges::{self, CellRange};
use crate::cell_sort::{self, is_sorted_by_cell};
use crate::debug::StageTimings;
use crate::error::{FlockError, Result};
use crate::params::FlockParams;
use crate::physics::{self, Steering};
use crate::spatial_grid::{CellAssignment, SpatialGrid};

// What a reconfiguration did to the flock
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reconfiguration {
    Unchanged,
    // Only weights, speed or other per-frame values changed
    Updated,
    // Grid changed; range table reallocated, fish kept
    Regridded,
    // Fish count changed; every buffer reallocated and reseeded
    Reallocated,
}

// Everything sized by the fish count or the cell count
struct FlockBuffers {
    fish: FishStore,
    cell_data: Vec<CellAssignment>,
    sorted_cell_data: Vec<CellAssignment>,
    cell_ranges: Vec<CellRange>,
}

impl FlockBuffers {
    fn allocate(params: &FlockParams, rng: &mut ChaCha12Rng) -> Result<Self> {
        let count = params.instance_count;
        // Range sentinels and cell entries are 32-bit
        if count > i32::MAX as usize {
            return Err(FlockError::allocation(&params.name, "fish", count, None));
        }

        let cell_ranges = allocate_ranges(&params.name, params.total_cells())?;
        let cell_data = allocate_assignments(&params.name, count)?;
        let sorted_cell_data = allocate_assignments(&params.name, count)?;
        let fish = FishStore::seeded(&params.name, count, params.bounds, rng)?;

        Ok(Self {
            fish,
            cell_data,
            sorted_cell_data,
            cell_ranges,
        })
    }
}

fn allocate_ranges(flock: &str, total_cells: usize) -> Result<Vec<CellRange>> {
    if total_cells > u32::MAX as usize {
        return Err(FlockError::allocation(flock, "cell range", total_cells, None));
    }
    let mut ranges = Vec::new();
    ranges
        .try_reserve_exact(total_cells)
        .map_err(|e| FlockError::allocation(flock, "cell range", total_cells, Some(e)))?;
    ranges.resize(total_cells, CellRange::EMPTY);
    Ok(ranges)
}

fn allocate_assignments(flock: &str, count: usize) -> Result<Vec<CellAssignment>> {
    let mut assignments = Vec::new();
    assignments
        .try_reserve_exact(count)
        .map_err(|e| FlockError::allocation(flock, "cell assignment", count, Some(e)))?;
    Ok(assignments)
}

fn warn_if_empty_grid(grid: &SpatialGrid, params: &FlockParams) {
    if grid.total_cells() == 0 {
        warn!(
            flock = %params.name,
            cell_size = params.cell_size,
            "bounds smaller than one cell; fish share a degenerate cell and see no neighbors"
        );
    }
}

pub struct FlockInstance {
    params: FlockParams,
    grid: SpatialGrid,
    fish: FishStore,
    cell_data: Vec<CellAssignment>,
    sorted_cell_data: Vec<CellAssignment>,
    cell_ranges: Vec<CellRange>,
    rng: ChaCha12Rng,
    timings: StageTimings,
    // Last snapshot refused, so a setting left invalid is only warned about once
    rejected: Option<FlockParams>,
}

impl FlockInstance {
    pub fn new(params: FlockParams) -> Result<Self> {
        params.validate()?;

        let seed = params.seed.unwrap_or_else(|| rand::thread_rng().gen());
        let mut rng = ChaCha12Rng::seed_from_u64(seed);
        let buffers = FlockBuffers::allocate(&params, &mut rng)?;
        let grid = SpatialGrid::new(params.bounds, params.cell_size);

        info!(
            flock = %params.name,
            fish = params.instance_count,
            cells = grid.total_cells(),
            seed,
            "flock initialized"
        );
        warn_if_empty_grid(&grid, &params);

        Ok(Self {
            params,
            grid,
            fish: buffers.fish,
            cell_data: buffers.cell_data,
            sorted_cell_data: buffers.sorted_cell_data,
            cell_ranges: buffers.cell_ranges,
            rng,
            timings: StageTimings::default(),
            rejected: None,
        })
    }

    /// Apply a new parameter snapshot.
    ///
    /// Invalid parameters and failed allocations are logged and returned;
    /// the flock keeps its previous snapshot and buffers in that case.
    pub fn reconfigure(&mut self, params: &FlockParams) -> Result<Reconfiguration> {
        if *params == self.params {
            self.rejected = None;
            return Ok(Reconfiguration::Unchanged);
        }

        let outcome = self.try_reconfigure(params);
        match &outcome {
            Ok(_) => self.rejected = None,
            Err(err) if self.rejected.as_ref() == Some(params) => {
                debug!(flock = %self.params.name, error = %err, "snapshot still rejected");
            }
            Err(err) => {
                warn!(flock = %self.params.name, error = %err, "keeping previous flock state");
                self.rejected = Some(params.clone());
            }
        }
        outcome
    }

    fn try_reconfigure(&mut self, params: &FlockParams) -> Result<Reconfiguration> {
        params.validate()?;
        let changes = params.detect_changes(&self.params);

        let outcome = if changes.instance_count {
            let mut rng = match params.seed {
                Some(seed) if params.seed != self.params.seed => ChaCha12Rng::seed_from_u64(seed),
                _ => self.rng.clone(),
            };
            let buffers = FlockBuffers::allocate(params, &mut rng)?;

            info!(
                flock = %params.name,
                from = self.params.instance_count,
                to = params.instance_count,
                cells = params.total_cells(),
                "fish count changed, buffers reallocated"
            );

            self.fish = buffers.fish;
            self.cell_data = buffers.cell_data;
            self.sorted_cell_data = buffers.sorted_cell_data;
            self.cell_ranges = buffers.cell_ranges;
            self.rng = rng;
            Reconfiguration::Reallocated
        } else if changes.grid {
            self.cell_ranges = allocate_ranges(&params.name, params.total_cells())?;
            info!(
                flock = %params.name,
                cells = params.total_cells(),
                "grid changed, cell ranges reallocated"
            );
            Reconfiguration::Regridded
        } else {
            debug!(flock = %params.name, "flock parameters updated");
            Reconfiguration::Updated
        };

        if changes.instance_count || changes.grid {
            self.grid = SpatialGrid::new(params.bounds, params.cell_size);
            warn_if_empty_grid(&self.grid, params);
        }
        self.params = params.clone();
        Ok(outcome)
    }

    pub fn assign_cells(&mut self) {
        self.grid.assign_cells(self.fish.current(), &mut self.cell_data);
    }

    pub fn sort_cells(&mut self) {
        cell_sort::sort_cells(
            &self.cell_data,
            &mut self.sorted_cell_data,
            self.grid.total_cells(),
            self.params.sort,
        );
        debug_assert!(is_sorted_by_cell(&self.sorted_cell_data));
    }

    pub fn build_ranges(&mut self) {
        cell_ranges::build_ranges(&self.sorted_cell_data, &mut self.cell_ranges);
    }

    // Steer every fish from the current state into the back buffer, then publish it
    pub fn update(&mut self, delta_time: f32) {
        // Time never runs backwards
        let delta_time = if delta_time.is_finite() { delta_time.max(0.0) } else { 0.0 };
        let steering = Steering::from_params(&self.params);
        let (current, next) = self.fish.split();
        physics::update_fish(
            current,
            next,
            &self.grid,
            &self.sorted_cell_data,
            &self.cell_ranges,
            &steering,
            delta_time,
        );
        self.fish.swap();
    }

    // assign -> sort -> build, without moving any fish
    pub fn partition(&mut self) {
        let start = Instant::now();
        self.assign_cells();
        let assigned = Instant::now();
        self.sort_cells();
        let sorted = Instant::now();
        self.build_ranges();
        let built = Instant::now();

        self.timings.assign = assigned - start;
        self.timings.sort = sorted - assigned;
        self.timings.build = built - sorted;
    }

    // One frame with the current snapshot
    pub fn advance(&mut self, delta_time: f32) {
        self.partition();

        let start = Instant::now();
        self.update(delta_time);
        self.timings.update = start.elapsed();

        trace!(
            flock = %self.params.name,
            assign_us = self.timings.assign.as_micros() as u64,
            sort_us = self.timings.sort.as_micros() as u64,
            build_us = self.timings.build.as_micros() as u64,
            update_us = self.timings.update.as_micros() as u64,
            "frame complete"
        );
    }

    /// Take this frame's parameter snapshot and run one frame.
    ///
    /// The frame always runs. If the snapshot was rejected it runs on the
    /// previous parameters and the rejection is returned afterwards.
    #[instrument(skip_all, fields(flock = %self.params.name))]
    pub fn step(&mut self, params: &FlockParams, delta_time: f32) -> Result<Reconfiguration> {
        let outcome = self.reconfigure(params);
        self.advance(delta_time);
        outcome
    }

    // Snapshot refused on the last attempt, if it has not been fixed since
    pub fn rejected(&self) -> Option<&FlockParams> {
        self.rejected.as_ref()
    }

    pub fn name(&self) -> &str {
        &self.params.name
    }

    // Snapshot currently in effect
    pub fn params(&self) -> &FlockParams {
        &self.params
    }

    pub fn bounds(&self) -> Vec3 {
        self.params.bounds
    }

    pub fn fish(&self) -> &[FishInstance] {
        self.fish.current()
    }

    pub fn len(&self) -> usize {
        self.fish.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fish.is_empty()
    }

    pub fn grid(&self) -> &SpatialGrid {
        &self.grid
    }

    pub fn cell_assignments(&self) -> &[CellAssignment] {
        &self.cell_data
    }

    pub fn sorted_cells(&self) -> &[CellAssignment] {
        &self.sorted_cell_data
    }

    pub fn cell_ranges(&self) -> &[CellRange] {
        &self.cell_ranges
    }

    pub fn timings(&self) -> StageTimings {
        self.timings
    }

    /// Replace the fish with a hand-placed set of the configured size.
    pub fn set_fish(&mut self, fish: Vec<FishInstance>) -> Result<()> {
        if fish.len() != self.params.instance_count {
            return Err(FlockError::invalid(
                &self.params.name,
                format!("expected {} fish, got {}", self.params.instance_count, fish.len()),
            ));
        }
        self.fish = FishStore::from_fish(fish);
        Ok(())
    }
}
