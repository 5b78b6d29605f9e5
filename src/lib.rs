/*
 * Fish Flocking Simulation - Module Definitions
 *
 * Grid-partitioned boids for schools of fish. Every frame each flock:
 * 1. Assigns every fish to a cell of a uniform 3D grid over its bounds
 * 2. Sorts the (fish, cell) pairs by cell
 * 3. Builds the [start, end) span of every cell in the sorted pairs
 * 4. Steers every fish using only the fish in its 27 surrounding cells
 *
 * Rendering lives outside the library; consumers read positions, headings
 * and bounds from each flock after a step.
 */

// Re-export key components for easier access
pub use boid::{FishInstance, FishStore};
pub use cell_ranges::{CellRange, EMPTY_CELL};
pub use cell_sort::SortStrategy;
pub use debug::{FrameStats, StageTimings};
pub use error::{FlockError, Result};
pub use flock::{FlockInstance, Reconfiguration};
pub use params::{FishTypeConfig, FlockParams, SceneConfig};
pub use simulation::Simulation;
pub use spatial_grid::{CellAssignment, GridDims, SpatialGrid};

// Define modules
pub mod boid;
pub mod cell_ranges;
pub mod cell_sort;
pub mod debug;
pub mod error;
pub mod flock;
pub mod params;
pub mod physics;
pub mod simulation;
pub mod spatial_grid;
