/*
 * Physics Module
 *
 * This module computes one steering step for every fish. Each fish looks
 * only at the fish registered in its own cell and the 26 cells around it,
 * found through the cell ranges, and accumulates the three flocking rules:
 * 1. Separation: push away from neighbors that are too close
 * 2. Alignment: turn toward the average heading of neighbors
 * 3. Cohesion: turn toward the average position of neighbors
 *
 * Fish that leave the bounds are steered back toward the volume and their
 * position is hard-limited to a margin around it, so motion stays bounded.
 *
 * All reads come from the previous state and all writes go to a separate
 * buffer, so the pass runs in parallel across fish.
 */

use nannou::prelude::Vec3;
use rayon::prelude::*;

use crate::boid::FishInstance;
use crate::cell_ranges::{cell_entries, CellRange};
use crate::params::FlockParams;
use crate::spatial_grid::{CellAssignment, SpatialGrid};

// How far past the half extents a fish may drift before being clamped
pub const CONTAINMENT_MARGIN: f32 = 1.5;

// Strength of the pull back toward the volume, per unit of overshoot
const RETURN_STRENGTH: f32 = 1.0;

// Everything the steering pass needs, resolved once per frame
#[derive(Clone, Copy, Debug)]
pub struct Steering {
    pub interaction_radius_sq: f32,
    pub separation_radius_sq: f32,
    pub separation_weight: f32,
    pub alignment_weight: f32,
    pub cohesion_weight: f32,
    pub target: Option<Vec3>,
    pub target_weight: f32,
    pub fish_speed: f32,
    pub turn_rate: f32,
    pub half_bounds: Vec3,
}

impl Steering {
    pub fn from_params(params: &FlockParams) -> Self {
        let interaction = params.interaction_radius();
        let separation = params.separation_radius();
        Self {
            interaction_radius_sq: interaction * interaction,
            separation_radius_sq: separation * separation,
            separation_weight: params.separation_weight,
            alignment_weight: params.alignment_weight,
            cohesion_weight: params.cohesion_weight,
            target: params.target,
            target_weight: params.target_weight,
            fish_speed: params.fish_speed,
            turn_rate: params.turn_rate,
            half_bounds: params.bounds * 0.5,
        }
    }
}

// Neighborhood of one fish
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct NeighborSums {
    pub separation: Vec3,
    pub heading: Vec3,
    pub position: Vec3,
    pub count: u32,
}

/// Sum up the neighbors of fish `index` from the 27 surrounding cells.
///
/// Only fish within the interaction radius count; the separation sum only
/// includes those inside the (smaller) separation radius.
pub fn gather_neighbors(
    index: usize,
    fish: &[FishInstance],
    grid: &SpatialGrid,
    sorted: &[CellAssignment],
    ranges: &[CellRange],
    steering: &Steering,
) -> NeighborSums {
    let mut sums = NeighborSums::default();
    if ranges.is_empty() {
        return sums;
    }

    let me = fish[index];
    grid.for_each_neighbor_cell(grid.cell_coord(me.position), |cell| {
        for entry in cell_entries(sorted, ranges, cell) {
            let other_index = entry.entity_index as usize;
            if other_index == index {
                continue;
            }
            let Some(other) = fish.get(other_index) else {
                continue;
            };

            let offset = me.position - other.position;
            let d_squared = offset.length_squared();
            if d_squared > steering.interaction_radius_sq {
                continue;
            }

            if d_squared < steering.separation_radius_sq {
                sums.separation += offset;
            }
            sums.heading += other.direction;
            sums.position += other.position;
            sums.count += 1;
        }
    });

    sums
}

// Combine the weighted rules into one steering vector
pub fn steering_force(me: &FishInstance, sums: &NeighborSums, steering: &Steering) -> Vec3 {
    let mut force = Vec3::ZERO;

    if sums.count > 0 {
        let n = sums.count as f32;
        force += sums.separation * steering.separation_weight;
        force += (sums.heading / n) * steering.alignment_weight;
        force += (sums.position / n - me.position) * steering.cohesion_weight;
    }

    if let Some(target) = steering.target {
        force += (target - me.position).normalize_or_zero() * steering.target_weight;
    }

    force + containment_force(me.position, steering.half_bounds)
}

// Points back inside, proportional to how far each axis overshoots
pub fn containment_force(position: Vec3, half_bounds: Vec3) -> Vec3 {
    let overshoot = position.abs() - half_bounds;
    let outside = overshoot.max(Vec3::ZERO);
    -position.signum() * outside * RETURN_STRENGTH
}

/// Advance one fish by `dt` seconds.
///
/// The heading is blended toward the steering vector and renormalized; if
/// the blend cancels out the old heading is kept.
pub fn integrate(me: &FishInstance, force: Vec3, steering: &Steering, dt: f32) -> FishInstance {
    let blend = (steering.turn_rate * dt).max(0.0);
    let turned = (me.direction + force * blend).normalize_or_zero();
    let direction = if turned == Vec3::ZERO { me.direction } else { turned };

    let limit = steering.half_bounds * CONTAINMENT_MARGIN;
    let position = (me.position + direction * steering.fish_speed * dt).clamp(-limit, limit);

    FishInstance { position, direction }
}

// Full steering pass: read `current`, write `next`
pub fn update_fish(
    current: &[FishInstance],
    next: &mut [FishInstance],
    grid: &SpatialGrid,
    sorted: &[CellAssignment],
    ranges: &[CellRange],
    steering: &Steering,
    dt: f32,
) {
    next.par_iter_mut().enumerate().for_each(|(i, out)| {
        let me = &current[i];
        let sums = gather_neighbors(i, current, grid, sorted, ranges, steering);
        let force = steering_force(me, &sums, steering);
        *out = integrate(me, force, steering, dt);
    });
}
